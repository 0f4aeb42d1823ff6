//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success, every priced order charged correctly     |
//! | 1    | General error (unspecified)                       |
//! | 2    | CLI usage error (bad args)                        |
//! | 3    | Over- or undercharged orders found                |
//! | 4    | Rows skipped, no discrepancies among the rest     |
//! | 5    | Invalid config or rate card                       |
//! | 6    | Runtime failure (I/O, missing column)             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use courier_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-6)
// =============================================================================

/// At least one priced order was billed above or below its expected charge.
pub const EXIT_RECON_DISCREPANCY: u8 = 3;

/// Every priced order matched, but some rows could not be priced.
pub const EXIT_RECON_SKIPPED: u8 = 4;

/// Config failed to parse or validate, or the rate card is malformed.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 5;

/// File could not be read/written, or the shipment data lacks a column.
pub const EXIT_RECON_RUNTIME: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::RateParse { .. } => {
            EXIT_RECON_INVALID_CONFIG
        }
        ReconError::SchemaMismatch { .. } | ReconError::Io(_) => EXIT_RECON_RUNTIME,
    }
}
