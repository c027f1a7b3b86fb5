//! Core error types

use thiserror::Error;

/// Errors from the pure pipeline stages
///
/// Graph construction and scoring are expected to succeed on any well-formed
/// message set; these errors signal malformed input and are unrecoverable
/// for the batch.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("similarity matrix is {rows}x{cols}, expected {expected}x{expected}")]
    MatrixShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("duplicate message id: {0}")]
    DuplicateMessageId(String),

    #[error("unknown node id: {0}")]
    UnknownNode(String),
}
