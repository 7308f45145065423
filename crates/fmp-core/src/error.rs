//! Error taxonomy for parsing, compilation, and grid generation.

use serde::Serialize;
use thiserror::Error;

/// Parse failure at a single mission-text line. Parsing stops at the first
/// offending line; there is no recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One out-of-region vertex. Violations are collected over the whole vertex
/// list and reported as a batch, never one at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub index: usize,
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Compiler precondition failure not tied to one geometric point.
    #[error("{message}")]
    Structural { message: String, line: Option<u32> },
    /// Every out-of-region vertex found in one validation pass.
    #[error("mission validation failed with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),
}

impl CompileError {
    pub fn structural(message: impl Into<String>) -> Self {
        CompileError::Structural {
            message: message.into(),
            line: None,
        }
    }

    pub fn structural_at(message: impl Into<String>, line: u32) -> Self {
        CompileError::Structural {
            message: message.into(),
            line: Some(line),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum GridError {
    #[error("Cell size must be positive")]
    InvalidCellSize,
    /// Rejected before any cell geometry is computed.
    #[error("Requested grid is too dense to generate reliably. Increase the cell size.")]
    TooLarge { cols: u64, rows: u64, limit: usize },
    #[error("Grid generation produced no cells")]
    Empty,
}

/// Region polygon unusable for geometric work.
#[derive(Debug, Clone, Error)]
#[error("invalid region polygon: {0}")]
pub struct RegionError(pub String);
