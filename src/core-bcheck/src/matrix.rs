//! Checking many candidate passwords against many stored hashes.
//!
//! Each (hash, password) pair is an independent blocking check. A semaphore bounds how many of them
//! are in flight; permits are acquired before a task is spawned, so excess work waits instead of
//! piling up on the blocking pool.

use std::{str::FromStr, sync::Arc};

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::{
    checker::HashChecker,
    errors::Error,
    hash_format::{HashFormatError, PasswordHash},
};

/// A stored hash with an optional human-readable name, e.g. the database it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledHash {
    pub label: Option<String>,
    pub hash: PasswordHash,
}

impl LabelledHash {
    /// Splits `LABEL=HASH` into its label and hash text. The bcrypt alphabet has no `=`, so the last one splits.
    fn split(s: &str) -> (Option<String>, &str) {
        match s.rsplit_once('=') {
            Some((label, hash)) => {
                let label = label.trim();
                ((!label.is_empty()).then(|| label.to_string()), hash.trim())
            }
            None => (None, s.trim()),
        }
    }
}

impl FromStr for LabelledHash {
    type Err = Error;

    /// Parses `LABEL=HASH` or a bare `HASH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, hash) = Self::split(s);
        Ok(LabelledHash {
            label,
            hash: PasswordHash::parse(hash)?,
        })
    }
}

/// One (hash, password) pair and whether they match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    /// Position of the stored hash in the input list.
    pub entry: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub hash: PasswordHash,
    pub password: String,
    pub matched: bool,
}

/// A stored hash entry that did not parse. It is reported, and every other entry is still checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedHash {
    pub entry: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub hash: String,
    pub reason: HashFormatError,
}

/// Every cell of a candidate matrix, hashes in input order and passwords in input order within each hash,
/// plus the entries that were rejected before checking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MatrixReport {
    pub cells: Vec<MatrixCell>,
    pub rejected: Vec<RejectedHash>,
}

impl MatrixReport {
    pub fn matches(&self) -> impl Iterator<Item = &MatrixCell> {
        self.cells.iter().filter(|cell| cell.matched)
    }

    pub fn any_match(&self) -> bool {
        self.cells.iter().any(|cell| cell.matched)
    }

    pub fn has_rejected(&self) -> bool {
        !self.rejected.is_empty()
    }

    /// Cells of the hash at input position `entry`, passwords in input order.
    pub fn cells_for(&self, entry: usize) -> impl Iterator<Item = &MatrixCell> {
        self.cells.iter().filter(move |cell| cell.entry == entry)
    }

    /// The rejection for input position `entry`, if that entry did not parse.
    pub fn rejected_at(&self, entry: usize) -> Option<&RejectedHash> {
        self.rejected.iter().find(|rejected| rejected.entry == entry)
    }
}

/// Check every password against every hash, running at most `max_concurrency` checks at once.
pub async fn check_matrix(
    checker: HashChecker,
    passwords: &[String],
    hashes: &[LabelledHash],
    max_concurrency: usize,
) -> Result<MatrixReport, Error> {
    let entries = hashes.iter().enumerate().collect::<Vec<_>>();
    run_checks(checker, passwords, &entries, max_concurrency).await
}

/// Like [`check_matrix`], but takes unparsed `[LABEL=]HASH` entries. An entry that does not parse is
/// recorded in [`MatrixReport::rejected`] and the remaining entries are checked as usual.
pub async fn check_entries<S: AsRef<str>>(
    checker: HashChecker,
    passwords: &[String],
    entries: &[S],
    max_concurrency: usize,
) -> Result<MatrixReport, Error> {
    let mut parsed = Vec::with_capacity(entries.len());
    let mut rejected = Vec::new();
    for (index, raw) in entries.iter().enumerate() {
        let (label, hash) = LabelledHash::split(raw.as_ref());
        match PasswordHash::parse(hash) {
            Ok(hash) => parsed.push((index, LabelledHash { label, hash })),
            Err(Error::MalformedHash { hash, reason }) => {
                tracing::warn!("Skipping entry {}: malformed hash '{}': {}", index, hash, reason);
                rejected.push(RejectedHash {
                    entry: index,
                    label,
                    hash,
                    reason,
                });
            }
            Err(other) => return Err(other),
        }
    }

    let entries = parsed.iter().map(|(index, entry)| (*index, entry)).collect::<Vec<_>>();
    let mut report = run_checks(checker, passwords, &entries, max_concurrency).await?;
    report.rejected = rejected;
    Ok(report)
}

async fn run_checks(
    checker: HashChecker,
    passwords: &[String],
    entries: &[(usize, &LabelledHash)],
    max_concurrency: usize,
) -> Result<MatrixReport, Error> {
    if max_concurrency == 0 {
        return Err(Error::InvalidConcurrency);
    }
    tracing::info!(
        "Checking {} password(s) against {} hash(es), up to {} at a time",
        passwords.len(),
        entries.len(),
        max_concurrency
    );

    // never closed, so acquiring only waits
    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut pending = Vec::with_capacity(passwords.len() * entries.len());

    for &(index, entry) in entries {
        for password in passwords {
            let permit = semaphore.clone().acquire_owned().await?;
            let hash = entry.hash.clone();
            let candidate = password.clone();
            let task = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                checker.verify_parsed(candidate.as_bytes(), &hash)
            });
            pending.push((index, entry, password, task));
        }
    }

    // Every task is awaited, even after a failure, so none outlives the call.
    let mut report = MatrixReport::default();
    let mut first_error = None;
    for (index, entry, password, task) in pending {
        let matched = match task.await {
            Ok(Ok(matched)) => matched,
            Ok(Err(error)) => {
                first_error.get_or_insert(error);
                continue;
            }
            Err(error) => {
                first_error.get_or_insert(Error::from(error));
                continue;
            }
        };
        if matched {
            tracing::info!(
                "Password matched hash {}",
                entry.label.as_deref().unwrap_or(entry.hash.salt())
            );
        }
        report.cells.push(MatrixCell {
            entry: index,
            label: entry.label.clone(),
            hash: entry.hash.clone(),
            password: password.clone(),
            matched,
        });
    }

    match first_error {
        Some(error) => Err(error),
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIGRATION_EXAMPLE: &str = "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie";

    #[test]
    fn test_labelled_hash_with_label() {
        let entry: LabelledHash = format!("legacy_app={MIGRATION_EXAMPLE}").parse().unwrap();
        assert_eq!(entry.label.as_deref(), Some("legacy_app"));
        assert_eq!(entry.hash.to_string(), MIGRATION_EXAMPLE);
    }

    #[test]
    fn test_labelled_hash_label_may_contain_equals() {
        let entry: LabelledHash = format!("env=prod={MIGRATION_EXAMPLE}").parse().unwrap();
        assert_eq!(entry.label.as_deref(), Some("env=prod"));
    }

    #[test]
    fn test_labelled_hash_without_label() {
        let entry: LabelledHash = MIGRATION_EXAMPLE.parse().unwrap();
        assert_eq!(entry.label, None);

        let entry: LabelledHash = format!("={MIGRATION_EXAMPLE}").parse().unwrap();
        assert_eq!(entry.label, None);
    }

    #[test]
    fn test_labelled_hash_malformed() {
        let result = "db=$2a$10$tooshort".parse::<LabelledHash>();
        assert!(matches!(result, Err(Error::MalformedHash { .. })));
    }

    #[tokio::test]
    async fn test_rejected_entries_keep_position() {
        let entries = [
            "short=$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZjcOvUS/zfUcHbz6JqHllgHQdxYy".to_string(),
            format!("legacy_app={MIGRATION_EXAMPLE}"),
        ];
        let passwords = ["correctbatteryhorsestapler".to_string()];
        let report = check_entries(HashChecker::new(), &passwords, &entries, 2).await.unwrap();

        assert!(report.has_rejected());
        let rejected = report.rejected_at(0).unwrap();
        assert_eq!(rejected.label.as_deref(), Some("short"));
        assert_eq!(rejected.reason, HashFormatError::Length(59));
        assert!(report.rejected_at(1).is_none());

        assert_eq!(report.cells.len(), 1);
        assert_eq!(report.cells[0].entry, 1);
        assert!(report.cells[0].matched);
        assert_eq!(report.cells_for(0).count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_entries_stay_separate() {
        let hash: LabelledHash = MIGRATION_EXAMPLE.parse().unwrap();
        let passwords = ["a".to_string(), "b".to_string()];
        let report = check_matrix(HashChecker::new(), &passwords, &[hash.clone(), hash], 1).await.unwrap();

        assert_eq!(report.cells.len(), 4);
        assert_eq!(report.cells_for(0).count(), 2);
        assert_eq!(report.cells_for(1).count(), 2);
        assert!(!report.has_rejected());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let result = check_matrix(HashChecker::new(), &[], &[], 0).await;
        assert!(matches!(result, Err(Error::InvalidConcurrency)));
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let report = check_matrix(HashChecker::new(), &[], &[], 2).await.unwrap();
        assert!(report.cells.is_empty());
        assert!(!report.any_match());
    }
}
