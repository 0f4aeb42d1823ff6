use std::fmt;

use serde::Serialize;

/// Fatal errors. Any of these aborts the whole run.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing rate file, empty zone table, etc.).
    ConfigValidation(String),
    /// A required column is absent from the shipment dataset or rate card.
    SchemaMismatch { source: String, column: String },
    /// A fee in the rate card is not a non-negative decimal amount.
    RateParse { zone: String, field: String, value: String },
    /// IO error (CSV reader, file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SchemaMismatch { source, column } => {
                write!(f, "{source}: missing required column '{column}'")
            }
            Self::RateParse { zone, field, value } => {
                write!(f, "rate card, zone '{zone}': cannot parse {field} fee '{value}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

/// Per-row errors. The row is skipped and reported; the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    /// The row's zone has no entry in the rate table.
    MissingZoneRate { zone: String },
    /// Weight is non-numeric, non-finite or negative.
    InvalidWeight { value: String },
    /// Billed amount is not a decimal amount with at most two places.
    InvalidAmount { value: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingZoneRate { zone } => write!(f, "no rate for zone '{zone}'"),
            Self::InvalidWeight { value } => write!(f, "invalid weight '{value}'"),
            Self::InvalidAmount { value } => write!(f, "invalid billed amount '{value}'"),
        }
    }
}

impl std::error::Error for RowError {}
