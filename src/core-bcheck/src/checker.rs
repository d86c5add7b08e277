use serde::Serialize;

use crate::{
    errors::Error,
    hash_format::{Cost, PasswordHash, VersionTag},
    settings::HashSettings,
};

/// Outcome of checking one password against one stored hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub matched: bool,
    pub hash: PasswordHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Generates and verifies BCrypt hashes.
///
/// Stateless: every call is independent, so one checker can be shared freely across threads.
/// Calls are CPU-bound and take time proportional to 2^cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashChecker;

impl HashChecker {
    pub fn new() -> Self {
        HashChecker
    }

    /// Hash a password under a fresh random salt.
    /// The cost is validated before any work happens.
    pub fn hash(&self, password: impl AsRef<[u8]>, cost: u32, version: VersionTag) -> Result<PasswordHash, Error> {
        let cost = Cost::new(cost)?;
        self.hash_with(password, &HashSettings::new(cost, version))
    }

    /// Same as `hash`, with the cost and version taken from already validated settings.
    pub fn hash_with(&self, password: impl AsRef<[u8]>, settings: &HashSettings) -> Result<PasswordHash, Error> {
        tracing::debug!(
            "Hashing {} byte password (version: {}, cost: {})",
            password.as_ref().len(),
            settings.version,
            settings.cost
        );
        let parts = bcrypt::hash_with_result(password.as_ref(), settings.cost.extract())?;
        PasswordHash::parse(&parts.format_for_version(settings.version.to_bcrypt()))
    }

    /// True iff the password produces the digest stored in `candidate`.
    /// A candidate that is not a well-formed, supported hash is an error, never `false`.
    pub fn verify(&self, password: impl AsRef<[u8]>, candidate: &str) -> Result<bool, Error> {
        let hash = PasswordHash::parse(candidate)?;
        self.verify_parsed(password, &hash)
    }

    /// Verify against an already parsed hash.
    /// The digest comparison is constant-time.
    pub fn verify_parsed(&self, password: impl AsRef<[u8]>, candidate: &PasswordHash) -> Result<bool, Error> {
        let matched = bcrypt::verify(password.as_ref(), &candidate.to_string())?;
        tracing::debug!(
            "Checked password against hash with salt {} (version: {}, cost: {}): {}",
            candidate.salt(),
            candidate.version(),
            candidate.cost(),
            if matched { "match" } else { "no match" }
        );
        Ok(matched)
    }

    pub fn check(&self, password: impl AsRef<[u8]>, candidate: &str) -> Result<VerificationResult, Error> {
        let hash = PasswordHash::parse(candidate)?;
        let matched = self.verify_parsed(password, &hash)?;
        Ok(VerificationResult {
            matched,
            hash,
            label: None,
        })
    }

    /// The stored hashes this password satisfies, in input order.
    /// Every candidate is parsed before any hashing, so one malformed entry fails the whole call.
    pub fn matching<I, S>(&self, password: impl AsRef<[u8]>, candidates: I) -> Result<Vec<VerificationResult>, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hashes = candidates
            .into_iter()
            .map(|c| PasswordHash::parse(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut matches = Vec::new();
        for hash in hashes {
            if self.verify_parsed(password.as_ref(), &hash)? {
                matches.push(VerificationResult {
                    matched: true,
                    hash,
                    label: None,
                });
            }
        }
        Ok(matches)
    }
}
