use crate::hash_format::{HashFormatError, MAX_COST, MIN_COST};

/// Errors raised while generating or checking BCrypt hashes.
/// None of these are transient: retrying with the same input fails the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested cost factor is outside the range the algorithm supports.
    #[error("Cost {cost} is outside the supported range {min}..={max}", min = MIN_COST, max = MAX_COST)]
    InvalidCost { cost: u32 },

    /// A stored hash does not parse into version tag, cost, salt and digest.
    #[error("Malformed hash '{hash}'")]
    MalformedHash {
        hash: String,
        #[source]
        reason: HashFormatError,
    },

    /// Password input was expected to be text but is not valid UTF-8.
    #[error("Password is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The underlying primitive failed, e.g. the OS entropy source was unavailable.
    #[error("BCrypt failure: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Concurrency limit must be a positive number")]
    InvalidConcurrency,

    #[error("Verification task failed: {0}")]
    WorkerJoin(#[from] tokio::task::JoinError),

    #[error("Failed to acquire semaphore permit: {0}")]
    WorkerPermit(#[from] tokio::sync::AcquireError),
}

/// Process exit code for a run that failed with a library error. Clap uses the same code for usage errors.
pub const ERROR_EXIT_CODE: u8 = 2;

impl Error {
    /// Exit code the CLI reports for this error. Exit codes 0 and 1 are reserved for match / no match.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidCost { .. }
            | Self::MalformedHash { .. }
            | Self::Encoding(_)
            | Self::Hashing(_)
            | Self::InvalidConcurrency
            | Self::WorkerJoin(_)
            | Self::WorkerPermit(_) => ERROR_EXIT_CODE,
        }
    }

    /// True for errors caused by the input hash string rather than by the password or the machine.
    pub fn is_malformed_hash(&self) -> bool {
        matches!(self, Self::MalformedHash { .. })
    }
}
