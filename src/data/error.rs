use std::num::ParseFloatError;

use thiserror::Error;

/// Failure while reading a spectrum source.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{name}: failed to read spectrum: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{name}, line {line}: not valid UTF-8 text")]
    Decode { name: String, line: usize },
    #[error("{name}, line {line}: live time '{value}' is not a number")]
    LiveTime {
        name: String,
        line: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("{name}, line {line}: live time must be a positive finite value, got {value}")]
    InvalidLiveTime { name: String, line: usize, value: f64 },
    #[error("{name}: source was closed before it could be parsed")]
    StreamClosedEarly { name: String },
    #[error("{name}: no spectrum data found after the header")]
    Empty { name: String },
    #[error("{name}: {source}")]
    Table {
        name: String,
        #[source]
        source: TableParseError,
    },
}

/// Failure while interpreting the whitespace-delimited count table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableParseError {
    #[error("line {line}, column {column}: '{token}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("line {line}: expected {expected} columns, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: row has an index column but no counts")]
    NoDataColumns { line: usize },
}

/// Two count sequences that cannot be aligned channel by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("spectrum lengths differ ({left} vs {right} channels)")]
pub struct DimensionMismatch {
    pub left: usize,
    pub right: usize,
}
