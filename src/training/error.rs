use std::fmt::Display;

use thiserror::Error;

use crate::core::SampleError;
use crate::error::ErrorClass;
use crate::utils::text::ascii_only;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainingError {
    /// The sample was rejected before anything was written.
    #[error("invalid training sample: {0}")]
    InvalidSample(#[from] SampleError),

    /// Any failure inside the pipeline. The message holds ASCII only.
    #[error("Retraining error: {0}")]
    Failure(String),
}

impl TrainingError {
    pub fn failure(cause: impl Display) -> Self {
        Self::Failure(ascii_only(&cause.to_string()))
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidSample(_) => ErrorClass::Invalid,
            Self::Failure(_) => ErrorClass::Internal,
        }
    }
}
