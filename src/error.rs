//! Pipeline-wide error type for callers that run several stages.

use crate::data::{LoaderError, ProcessorError};
use crate::stats::AggregateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Derive(#[from] ProcessorError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
