//! `FixedModelRunner`: a scripted [`super::ModelRunner`] double used by unit
//! and end-to-end tests to drive exact posterior vectors through
//! [`crate::wakeword::WakewordTrigger`] without loading a `.tflite` file.
//!
//! Exported outside `#[cfg(test)]` under the `test-support` feature so the
//! `tests/` end-to-end suite can reuse it — a hand-rolled fake, not a
//! mocking framework.

use super::ModelRunner;
use crate::error::Result;
use std::collections::VecDeque;

/// Returns each vector in `script` in turn on successive `run()` calls;
/// once exhausted, repeats the last scripted vector (or all-zero if the
/// script was empty).
pub struct FixedModelRunner {
    input: Vec<f32>,
    output: Vec<f32>,
    script: VecDeque<Vec<f32>>,
    last: Vec<f32>,
}

impl FixedModelRunner {
    pub fn new(input_len: usize, output_len: usize, script: Vec<Vec<f32>>) -> Self {
        Self {
            input: vec![0.0; input_len],
            output: vec![0.0; output_len],
            last: vec![0.0; output_len],
            script: script.into(),
        }
    }

    /// The most recent input the trigger wrote, for assertions.
    pub fn last_input(&self) -> &[f32] {
        &self.input
    }
}

impl ModelRunner for FixedModelRunner {
    fn input_len(&self) -> usize {
        self.input.len()
    }

    fn output_len(&self) -> usize {
        self.output.len()
    }

    fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    fn output(&self) -> &[f32] {
        &self.output
    }

    fn run(&mut self) -> Result<()> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.output.copy_from_slice(&self.last);
        Ok(())
    }
}

/// A model runner whose `run()` just copies input straight to output,
/// truncating or zero-padding to `output_len`. Useful for the mel-filter
/// stage in tests where only the classifier's script matters.
pub struct PassthroughModelRunner {
    input: Vec<f32>,
    output: Vec<f32>,
}

impl PassthroughModelRunner {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Self {
            input: vec![0.0; input_len],
            output: vec![0.0; output_len],
        }
    }
}

impl ModelRunner for PassthroughModelRunner {
    fn input_len(&self) -> usize {
        self.input.len()
    }

    fn output_len(&self) -> usize {
        self.output.len()
    }

    fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    fn output(&self) -> &[f32] {
        &self.output
    }

    fn run(&mut self) -> Result<()> {
        let n = self.input.len().min(self.output.len());
        self.output[..n].copy_from_slice(&self.input[..n]);
        for v in self.output[n..].iter_mut() {
            *v = 0.0;
        }
        Ok(())
    }
}
