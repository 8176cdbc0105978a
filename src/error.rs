//! Error types for the schematization pipeline.

use geograph::{DcelError, HalfEdgeId};
use thiserror::Error;

use crate::subdivision::Phase;

/// Result type alias using [`SchematizeError`].
pub type Result<T> = std::result::Result<T, SchematizeError>;

#[derive(Error, Debug)]
pub enum SchematizeError {
    /// A pipeline step was invoked out of order.
    #[error("{step} requires phase {required:?}, but the subdivision is {actual:?}")]
    Phase {
        step: &'static str,
        required: Phase,
        actual: Phase,
    },

    /// A half-edge reached a step that needs its orientation class.
    #[error("{0} has no orientation class")]
    Unclassified(HalfEdgeId),

    /// The direction set cannot be used to build sectors.
    #[error("invalid direction set: {0}")]
    Directions(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Topology(#[from] DcelError),
}
