use std::{
    ffi::OsString,
    io::{Read, Write},
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use core_bcheck::{
    ERROR_EXIT_CODE, Error, HashChecker, HashSettings, MatrixReport, PasswordHash, VersionTag, check_entries,
    password_from_bytes, password_from_os, resolve_max_concurrency, strip_line_ending,
};

#[derive(Parser, Debug)]
#[command(name = "bcheck")]
#[command(about = "Generate BCrypt hashes and check passwords against stored hashes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    /// Log debug details to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a hash for a password, or verify a password against one stored hash.
    Check(CheckArgs),

    /// Check candidate passwords against a set of stored hashes.
    Match(MatchArgs),

    /// Show the fields encoded in a stored hash.
    Inspect {
        /// The stored hash.
        hash: String,
        /// Print the fields as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub password: PasswordSource,

    #[command(flatten)]
    pub mode: CheckMode,

    /// Cost factor for --generate (4..=31, default 10).
    #[arg(long, conflicts_with = "verify")]
    pub cost: Option<u32>,

    /// Version tag for --generate: 2a, 2b or 2y (default 2b).
    #[arg(long = "version", value_name = "TAG", conflicts_with = "verify")]
    pub version_tag: Option<VersionTag>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PasswordSource {
    /// The plaintext password.
    pub password: Option<OsString>,
    /// Read the password from stdin. One trailing newline is dropped.
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct CheckMode {
    /// Print a newly generated hash.
    #[arg(long)]
    pub generate: bool,
    /// Verify the password against this stored hash.
    #[arg(long, value_name = "HASH")]
    pub verify: Option<String>,
}

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// A candidate password. Repeat for several.
    #[arg(short, long = "password", value_name = "PASSWORD", required = true)]
    pub passwords: Vec<OsString>,
    /// A stored hash, optionally labelled as LABEL=HASH. Repeat for several.
    #[arg(long = "hash", value_name = "[LABEL=]HASH", required = true)]
    pub hashes: Vec<String>,
    /// Maximum number of checks run at once (default: available CPUs).
    #[arg(short, long)]
    pub jobs: Option<usize>,
    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// What a completed run found. Errors that stop a run are reported separately, see [`error_exit_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A hash was generated or inspected.
    Done,
    /// The password (or at least one candidate) matched.
    Matched,
    /// Nothing matched.
    NotMatched,
    /// `match` checked every valid hash, but at least one entry was malformed.
    Rejected,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Done | Self::Matched => 0,
            Self::NotMatched => 1,
            Self::Rejected => ERROR_EXIT_CODE,
        }
    }

    fn from_match(matched: bool) -> Self {
        if matched { Self::Matched } else { Self::NotMatched }
    }
}

/// Exit code for a run that failed: the library's code for its own errors, 2 for anything else (e.g. I/O).
pub fn error_exit_code(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<Error>()
        .map_or(ERROR_EXIT_CODE, Error::exit_code)
}

/// Execute a parsed command. Results are written to `out`; `stdin` is only read for `--password-stdin`.
pub async fn run<R: Read, W: Write>(cli: &Cli, stdin: R, out: &mut W) -> anyhow::Result<Outcome> {
    let checker = HashChecker::new();
    match &cli.command {
        Commands::Check(args) => {
            let password = read_password(&args.password, stdin)?;
            match &args.mode.verify {
                Some(stored) => verify(checker, &password, stored, args.json, out),
                None => generate(checker, &password, args, out),
            }
        }
        Commands::Match(args) => run_match(checker, args, out).await,
        Commands::Inspect { hash, json } => inspect(hash, *json, out),
    }
}

fn read_password<R: Read>(source: &PasswordSource, mut stdin: R) -> anyhow::Result<String> {
    if source.password_stdin {
        let mut bytes = Vec::new();
        stdin
            .read_to_end(&mut bytes)
            .context("Cannot read password from stdin")?;
        Ok(password_from_bytes(strip_line_ending(bytes))?)
    } else {
        let arg = source.password.clone().unwrap_or_default();
        Ok(password_from_os(arg)?)
    }
}

fn generate<W: Write>(checker: HashChecker, password: &str, args: &CheckArgs, out: &mut W) -> anyhow::Result<Outcome> {
    let settings = HashSettings::with_overrides(args.cost, args.version_tag)?;
    let hash = checker.hash_with(password, &settings)?;
    tracing::info!("Generated {} hash at cost {}", hash.version(), hash.cost());

    if args.json {
        let summary = serde_json::json!({
            "hash": hash,
            "version": hash.version(),
            "cost": hash.cost(),
        });
        writeln!(out, "{}", summary)?;
    } else {
        writeln!(out, "{}", hash)?;
    }
    Ok(Outcome::Done)
}

fn verify<W: Write>(checker: HashChecker, password: &str, stored: &str, json: bool, out: &mut W) -> anyhow::Result<Outcome> {
    let result = checker.check(password, stored)?;
    if json {
        writeln!(out, "{}", serde_json::to_string(&result)?)?;
    } else {
        writeln!(out, "{}", result.matched)?;
    }
    Ok(Outcome::from_match(result.matched))
}

async fn run_match<W: Write>(checker: HashChecker, args: &MatchArgs, out: &mut W) -> anyhow::Result<Outcome> {
    let passwords = args
        .passwords
        .iter()
        .cloned()
        .map(password_from_os)
        .collect::<Result<Vec<_>, _>>()?;
    let max_concurrency = resolve_max_concurrency(args.jobs)?;

    let report = check_entries(checker, &passwords, &args.hashes, max_concurrency).await?;

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_report(&report, args.hashes.len(), out)?;
    }

    if report.has_rejected() {
        Ok(Outcome::Rejected)
    } else {
        Ok(Outcome::from_match(report.any_match()))
    }
}

/// One block per `--hash` entry, in input order.
fn write_report<W: Write>(report: &MatrixReport, entries: usize, out: &mut W) -> std::io::Result<()> {
    for entry in 0..entries {
        if let Some(rejected) = report.rejected_at(entry) {
            write_header(rejected.label.as_deref(), &rejected.hash, out)?;
            writeln!(out, "  [ERROR] {}", rejected.reason)?;
            continue;
        }
        let mut cells = report.cells_for(entry).peekable();
        if let Some(head) = cells.peek() {
            write_header(head.label.as_deref(), &head.hash, out)?;
        }
        for cell in cells {
            let mark = if cell.matched { "MATCH" } else { "-----" };
            writeln!(out, "  [{mark}] {}", cell.password)?;
        }
    }
    Ok(())
}

fn write_header<W: Write>(label: Option<&str>, hash: &dyn std::fmt::Display, out: &mut W) -> std::io::Result<()> {
    match label {
        Some(label) => writeln!(out, "{label}: {hash}"),
        None => writeln!(out, "{hash}"),
    }
}

fn inspect<W: Write>(encoded: &str, json: bool, out: &mut W) -> anyhow::Result<Outcome> {
    let hash = PasswordHash::parse(encoded)?;
    if json {
        let fields = serde_json::json!({
            "version": hash.version(),
            "cost": hash.cost(),
            "rounds": hash.cost().rounds(),
            "salt": hash.salt(),
            "digest": hash.digest(),
        });
        writeln!(out, "{}", fields)?;
    } else {
        writeln!(out, "version: {}", hash.version())?;
        writeln!(out, "cost:    {} ({} rounds)", hash.cost().extract(), hash.cost().rounds())?;
        writeln!(out, "salt:    {}", hash.salt())?;
        writeln!(out, "digest:  {}", hash.digest())?;
    }
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Done.exit_code(), 0);
        assert_eq!(Outcome::Matched.exit_code(), 0);
        assert_eq!(Outcome::NotMatched.exit_code(), 1);
        assert_eq!(Outcome::Rejected.exit_code(), 2);
    }

    #[test]
    fn test_error_exit_code() {
        let error = anyhow::Error::from(Error::InvalidConcurrency);
        assert_eq!(error_exit_code(&error), 2);

        let error = anyhow::Error::from(std::io::Error::other("closed pipe"));
        assert_eq!(error_exit_code(&error), ERROR_EXIT_CODE);
    }
}
