//! Single-feature linear regression, `y = weight * x + bias`.
//!
//! Trained by stochastic gradient descent over the stored training set.
//! Small and allocation-free after construction, so a trained model can
//! be evaluated from interrupt context.

#[derive(Debug, Clone, PartialEq)]
pub struct LinReg {
    weight: f64,
    bias: f64,
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    learning_rate: f64,
}

impl LinReg {
    pub fn new(
        weight: f64,
        bias: f64,
        inputs: Vec<f64>,
        outputs: Vec<f64>,
        learning_rate: f64,
    ) -> Self {
        Self {
            weight,
            bias,
            inputs,
            outputs,
            learning_rate,
        }
    }

    /// Run `iterations` epochs over the training set.
    ///
    /// Returns `false` without touching the parameters when there is
    /// nothing to learn from (no iterations, empty or mismatched sets, a
    /// non-positive learning rate), and `false` after training if the
    /// parameters diverged.
    pub fn train(&mut self, iterations: usize) -> bool {
        if iterations == 0
            || self.inputs.is_empty()
            || self.inputs.len() != self.outputs.len()
            || self.learning_rate.is_nan()
            || self.learning_rate <= 0.0
        {
            return false;
        }
        for _ in 0..iterations {
            for (&x, &y) in self.inputs.iter().zip(&self.outputs) {
                let error = y - self.predict(x);
                self.bias += error * self.learning_rate;
                self.weight += error * self.learning_rate * x;
            }
        }
        self.weight.is_finite() && self.bias.is_finite()
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.weight * x + self.bias
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn inputs(&self) -> &[f64] {
        &self.inputs
    }
}
