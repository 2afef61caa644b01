pub mod injuries;
pub mod predictor;

pub use predictor::predict;
