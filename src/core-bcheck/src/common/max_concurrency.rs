use std::num::NonZeroUsize;

use crate::errors::Error;

/// Used when the machine's available parallelism cannot be determined.
pub const DEFAULT: usize = 4;

/// The number of checks allowed in flight at once.
/// An explicit request must be positive; otherwise one check per available CPU.
pub fn resolve_max_concurrency(requested: Option<usize>) -> Result<usize, Error> {
    match requested {
        Some(0) => Err(Error::InvalidConcurrency),
        Some(n) => Ok(n),
        None => Ok(std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(DEFAULT)),
    }
}
