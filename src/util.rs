//! Defines the `Error` type for the ctbn library

use std::io;
use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, CtbnError>;

#[derive(Debug, Error)]
pub enum CtbnError {

    /// A variable, node, label or arc that was referenced does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A structurally wrong request, e.g. a reserved name or a table of the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation that the concrete engine does not provide
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// An operation that requires a state the object has not reached yet, e.g. a posterior
    /// queried before any inference was made
    #[error("Undefined state: {0}")]
    UndefinedState(String),

    /// Represents an incomplete instantiation where a complete instantiation was required.
    /// The value in the tuple is the names of the variables that were missing.
    #[error("Missing values for the following required variables: {0:?}")]
    IncompleteInstantiation(Vec<String>),

    /// A numerical failure (non-finite result, degenerate distribution parameters...)
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

}

impl CtbnError {

    /// `true` if this error belongs to the not-found class
    pub fn is_not_found(&self) -> bool {
        matches!(self, CtbnError::NotFound(_))
    }

    /// `true` if this error belongs to the invalid-argument class
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, CtbnError::InvalidArgument(_) | CtbnError::IncompleteInstantiation(_))
    }

}
