//! `TfliteModelRunner`: a [`super::ModelRunner`] backed by a `tflitec`
//! interpreter, generalized to an arbitrary single-input single-output
//! model (resize-input, allocate-tensors, copy, invoke, read-output).

use super::ModelRunner;
use crate::error::{PipelineError, Result};
use tflitec::interpreter::{Interpreter, Options};
use tflitec::tensor;

pub struct TfliteModelRunner {
    interpreter: Interpreter,
    input: Vec<f32>,
    output: Vec<f32>,
}

impl TfliteModelRunner {
    /// Load a `.tflite` model from `path`, a single-input single-output
    /// model whose tensor shapes are expected to hold `input_len` and
    /// `output_len` float32 elements respectively.
    ///
    /// Any failure here (missing file, unreadable model, shape mismatch) is
    /// a `CONFIG_ERROR` — model loading only ever happens at construction.
    pub fn new(path: &str, input_len: usize, output_len: usize) -> Result<Self> {
        let options = Options::default();
        let interpreter = Interpreter::new(path, Some(options))
            .map_err(|e| PipelineError::config(format!("failed to load model {path}: {e:?}")))?;

        interpreter
            .resize_input(0, tensor::Shape::new(vec![1, input_len as i32]))
            .map_err(|e| {
                PipelineError::config(format!("failed to resize input tensor for {path}: {e:?}"))
            })?;
        interpreter
            .allocate_tensors()
            .map_err(|e| PipelineError::config(format!("failed to allocate tensors for {path}: {e:?}")))?;

        let output_tensor = interpreter
            .output(0)
            .map_err(|e| PipelineError::config(format!("model {path} has no output tensor: {e:?}")))?;
        if output_tensor.shape().dimensions().iter().product::<usize>() != output_len {
            return Err(PipelineError::config(format!(
                "model {path} output size does not match expected {output_len}"
            )));
        }

        Ok(Self {
            interpreter,
            input: vec![0.0; input_len],
            output: vec![0.0; output_len],
        })
    }
}

impl ModelRunner for TfliteModelRunner {
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
        self.interpreter
            .copy(&self.input, 0)
            .map_err(|e| PipelineError::model(format!("failed to copy input tensor: {e:?}")))?;
        self.interpreter
            .invoke()
            .map_err(|e| PipelineError::model(format!("invoke failed: {e:?}")))?;
        let output_tensor = self
            .interpreter
            .output(0)
            .map_err(|e| PipelineError::model(format!("failed to read output tensor: {e:?}")))?;
        self.output.copy_from_slice(output_tensor.data::<f32>());
        Ok(())
    }
}
