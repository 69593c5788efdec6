use serde::{Deserialize, Serialize};

/// One training observation: feature vector and label.
///
/// For the fee pipeline the features are the previous block's base fee
/// (gwei) and its gas-used ratio; the label is the next block's base fee.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub x: Vec<f64>,
    pub y: f64,
}

/// A fitted linear model. Created whole by one successful solver run and
/// replaced whole by the next; never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub bias: f64,
    pub weights: Vec<f64>,
    pub mse: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub samples: usize,
    pub mse: Option<f64>,
    pub model_ready: bool,
    pub outcome: String,
}
