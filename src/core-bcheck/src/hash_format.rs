//! The modular-crypt encoding of a BCrypt hash: `$<version>$<cost>$<salt><digest>`.

use std::{fmt, str::FromStr};

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Serialize, Serializer};

use crate::errors::Error;

/// Length of a complete encoded hash, e.g. `$2b$10$` followed by 53 characters.
pub const ENCODED_LEN: usize = 60;
/// Characters of the encoded salt.
pub const SALT_ENCODED_LEN: usize = 22;
/// Characters of the encoded digest.
pub const DIGEST_ENCODED_LEN: usize = 31;
/// Raw salt bytes.
pub const SALT_LEN: usize = 16;
/// Raw digest bytes. BCrypt drops the last byte of its 24-byte output.
pub const DIGEST_LEN: usize = 23;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
/// Matches the rounds Spring Security's `BCryptPasswordEncoder` uses by default.
pub const DEFAULT_COST: u32 = 10;

/// The BCrypt variant of base64: its own alphabet, no padding, no stray trailing bits.
const BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// Why a string is not a well-formed BCrypt hash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashFormatError {
    #[error("expected {len} characters, found {0}", len = ENCODED_LEN)]
    Length(usize),

    #[error("expected the layout '$<version>$<cost>$<salt><digest>'")]
    Layout,

    #[error("unsupported version tag '{0}' (supported: 2a, 2b, 2y)")]
    UnsupportedVersion(String),

    #[error("cost '{0}' is not a two-digit number")]
    CostDigits(String),

    #[error("cost {0} is outside {min}..={max}", min = MIN_COST, max = MAX_COST)]
    CostRange(u32),

    #[error("{field} is not valid bcrypt base64")]
    Base64 {
        field: &'static str,
        source: base64::DecodeError,
    },
}

/// Algorithm revision marker. Every supported tag computes the same digest for the same input,
/// so a hash verifies the same way regardless of which of these it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum VersionTag {
    #[serde(rename = "2a")]
    TwoA,
    #[default]
    #[serde(rename = "2b")]
    TwoB,
    #[serde(rename = "2y")]
    TwoY,
}

impl VersionTag {
    pub const ALL: [VersionTag; 3] = [VersionTag::TwoA, VersionTag::TwoB, VersionTag::TwoY];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoA => "2a",
            Self::TwoB => "2b",
            Self::TwoY => "2y",
        }
    }

    /// Exact match on the tag as it appears inside an encoded hash.
    fn from_tag(tag: &str) -> Result<Self, HashFormatError> {
        match tag {
            "2a" => Ok(Self::TwoA),
            "2b" => Ok(Self::TwoB),
            "2y" => Ok(Self::TwoY),
            other => Err(HashFormatError::UnsupportedVersion(other.to_string())),
        }
    }

    pub(crate) fn to_bcrypt(self) -> bcrypt::Version {
        match self {
            Self::TwoA => bcrypt::Version::TwoA,
            Self::TwoB => bcrypt::Version::TwoB,
            Self::TwoY => bcrypt::Version::TwoY,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VersionTag {
    type Err = HashFormatError;

    /// Accepts the bare tag (`2b`) or the tag wrapped in separators (`$2b$`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s.trim().trim_matches('$'))
    }
}

/// A cost factor known to be within `MIN_COST..=MAX_COST`. Hashing performs 2^cost rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cost(u32);

impl Cost {
    /// Create a new Cost if the value is in range. Returns an `InvalidCost` error otherwise.
    pub fn new(cost: u32) -> Result<Self, Error> {
        if Self::is_valid(&cost) {
            Ok(Cost(cost))
        } else {
            Err(Error::InvalidCost { cost })
        }
    }

    pub fn is_valid(cost: &u32) -> bool {
        (MIN_COST..=MAX_COST).contains(cost)
    }

    /// Number of key expansion rounds this cost performs.
    pub fn rounds(&self) -> u64 {
        1u64 << self.0
    }

    pub fn extract(self) -> u32 {
        self.0
    }
}

impl Default for Cost {
    fn default() -> Self {
        Cost(DEFAULT_COST)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A parsed BCrypt hash. Only exists for strings that split into exactly a supported version tag,
/// an in-range cost, a 16-byte salt and a 23-byte digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PasswordHash {
    version: VersionTag,
    cost: Cost,
    salt: String,
    digest: String,
    salt_bytes: [u8; SALT_LEN],
    digest_bytes: [u8; DIGEST_LEN],
}

impl PasswordHash {
    /// Parse an encoded hash, reporting a `MalformedHash` error that carries the offending string.
    pub fn parse(encoded: &str) -> Result<Self, Error> {
        Self::parse_fields(encoded).map_err(|reason| Error::MalformedHash {
            hash: encoded.to_string(),
            reason,
        })
    }

    fn parse_fields(encoded: &str) -> Result<Self, HashFormatError> {
        let mut parts = encoded.splitn(4, '$');
        let (Some(""), Some(tag), Some(cost), Some(rest)) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HashFormatError::Layout);
        };

        // The tag is checked first so foreign algorithm families are named as such,
        // rather than being reported for their (different) length.
        let version = VersionTag::from_tag(tag)?;

        if cost.len() != 2 || !cost.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HashFormatError::CostDigits(cost.to_string()));
        }
        let cost = cost
            .parse::<u32>()
            .map_err(|_| HashFormatError::CostDigits(cost.to_string()))?;
        let cost = Cost::new(cost).map_err(|_| HashFormatError::CostRange(cost))?;

        if encoded.len() != ENCODED_LEN {
            return Err(HashFormatError::Length(encoded.len()));
        }

        let (salt_raw, digest_raw) = rest.as_bytes().split_at(SALT_ENCODED_LEN);
        let salt_bytes = decode_exact::<SALT_LEN>("salt", salt_raw)?;
        let digest_bytes = decode_exact::<DIGEST_LEN>("digest", digest_raw)?;

        // Both halves decoded, so both are ASCII and the split point is a char boundary.
        let (salt, digest) = rest.split_at(SALT_ENCODED_LEN);

        Ok(PasswordHash {
            version,
            cost,
            salt: salt.to_string(),
            digest: digest.to_string(),
            salt_bytes,
            digest_bytes,
        })
    }

    pub fn version(&self) -> VersionTag {
        self.version
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// The 22-character encoded salt.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// The 31-character encoded digest.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn salt_bytes(&self) -> &[u8; SALT_LEN] {
        &self.salt_bytes
    }

    pub fn digest_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.digest_bytes
    }

    /// The same salt and digest under another tag of the family.
    pub fn with_version(&self, version: VersionTag) -> PasswordHash {
        PasswordHash {
            version,
            ..self.clone()
        }
    }
}

fn decode_exact<const N: usize>(field: &'static str, encoded: &[u8]) -> Result<[u8; N], HashFormatError> {
    let decoded = BCRYPT_BASE64
        .decode(encoded)
        .map_err(|source| HashFormatError::Base64 { field, source })?;
    let len = decoded.len();
    decoded.try_into().map_err(|_| HashFormatError::Length(len))
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}${}${}{}", self.version, self.cost, self.salt, self.digest)
    }
}

impl FromStr for PasswordHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PasswordHash::parse(s)
    }
}

impl Serialize for HashFormatError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for PasswordHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
