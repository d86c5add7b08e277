//! Generate and verify BCrypt password hashes.
//!
//! The BCrypt primitive itself comes from the `bcrypt` crate. This crate adds a typed model of the
//! encoded hash string, a stateless [`HashChecker`] with strict error reporting, and a bounded
//! runner for checking many candidate passwords against many stored hashes.

pub mod checker;
pub mod common;
pub mod errors;
pub mod hash_format;
pub mod matrix;
pub mod settings;

pub use checker::{HashChecker, VerificationResult};
pub use common::{
    logging::setup_logging,
    max_concurrency::resolve_max_concurrency,
    password_input::{password_from_bytes, password_from_os, strip_line_ending},
};
pub use errors::{ERROR_EXIT_CODE, Error};
pub use hash_format::{Cost, DEFAULT_COST, HashFormatError, MAX_COST, MIN_COST, PasswordHash, VersionTag};
pub use matrix::{LabelledHash, MatrixCell, MatrixReport, RejectedHash, check_entries, check_matrix};
pub use settings::HashSettings;
