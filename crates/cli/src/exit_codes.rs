//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad format)   |
//! | 3-9     | run              | Input, schema and output failures        |
//! | 10-19   | ai               | AI provider/keychain codes               |
//!
//! Per-row generation failures never change the exit code; they are written
//! into the output cell instead.
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use outreach_engine::resolve::SchemaError;
use outreach_io::TableError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unsupported file format.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Run (3-9)
// =============================================================================

/// Input spreadsheet does not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Input spreadsheet exists but could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Required columns could not be resolved (missing label, too few columns).
pub const EXIT_SCHEMA: u8 = 5;

/// Output file could not be written, or would overwrite the input.
pub const EXIT_WRITE: u8 = 6;

// =============================================================================
// AI (10-19)
// =============================================================================

/// AI provider configured but API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Map a TableError to its exit code.
pub fn table_exit_code(err: &TableError) -> u8 {
    match err {
        TableError::NotFound(_) => EXIT_NOT_FOUND,
        TableError::Parse { .. } => EXIT_PARSE,
        TableError::Write { .. } => EXIT_WRITE,
        TableError::UnsupportedFormat(_) => EXIT_USAGE,
    }
}

/// Map a SchemaError to its exit code.
pub fn schema_exit_code(_err: &SchemaError) -> u8 {
    EXIT_SCHEMA
}
