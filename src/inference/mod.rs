//! Inference-time bundle of a fitted preprocessor and a trained model

mod pipeline;

pub use pipeline::{InferencePipeline, NetworkModel};
