//! Behavioural tests for HashChecker
//!
//! Covers:
//! - Round trips: a generated hash verifies its own password and nothing else
//! - Salt randomness: identical inputs give different hashes that both verify
//! - Version tags: 2a / 2b / 2y hashes are interchangeable for verification
//! - Strictness: malformed or foreign hashes are errors, never a silent `false`

use core_bcheck::{Error, HashChecker, HashFormatError, HashSettings, PasswordHash, VersionTag};

/// Keeps the suite fast; the cost only scales the work, not the behaviour.
const TEST_COST: u32 = 4;

/// Laravel's factory hash for the password "password".
const LARAVEL_PASSWORD: &str = "$2y$10$92IXUNpkjO0rOQ5byMi.Ye4oKoEa3Ro9llC/.og/at2.uheWG/igi";

/// Hash for "correctbatteryhorsestapler" from the bcrypt-phc migration example.
const MIGRATION_EXAMPLE: &str = "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie";

#[test]
fn test_round_trip_for_all_versions() {
    let checker = HashChecker::new();
    for version in VersionTag::ALL {
        for password in ["", "a", "Admin123!", "pass word with spaces", "密碼🔐"] {
            let hash = checker.hash(password, TEST_COST, version).unwrap();
            assert!(
                checker.verify(password, &hash.to_string()).unwrap(),
                "'{password}' failed to verify against its own {version} hash"
            );
        }
    }
}

#[test]
fn test_different_password_rejected() {
    let checker = HashChecker::new();
    let hash = checker.hash("correct horse", TEST_COST, VersionTag::TwoB).unwrap();
    for other in ["correct horse ", "Correct horse", "correct hors", "battery staple"] {
        assert!(!checker.verify(other, &hash.to_string()).unwrap(), "'{other}' should not match");
    }
}

#[test]
fn test_fresh_salt_per_call() {
    let checker = HashChecker::new();
    let first = checker.hash("Admin123!", TEST_COST, VersionTag::TwoB).unwrap();
    let second = checker.hash("Admin123!", TEST_COST, VersionTag::TwoB).unwrap();

    assert_ne!(first.to_string(), second.to_string());
    assert_ne!(first.salt_bytes(), second.salt_bytes());
    assert!(checker.verify("Admin123!", &first.to_string()).unwrap());
    assert!(checker.verify("Admin123!", &second.to_string()).unwrap());
}

#[test]
fn test_version_tags_interchangeable() {
    let checker = HashChecker::new();
    for generated_as in VersionTag::ALL {
        let hash = checker.hash("Admin123!", TEST_COST, generated_as).unwrap();
        for checked_as in VersionTag::ALL {
            let retagged = hash.with_version(checked_as);
            assert!(
                checker.verify_parsed("Admin123!", &retagged).unwrap(),
                "{generated_as} hash did not verify once tagged {checked_as}"
            );
            assert!(!checker.verify_parsed("admin123!", &retagged).unwrap());
        }
    }
}

#[test]
fn test_known_hash_under_every_tag() {
    let checker = HashChecker::new();
    let hash = PasswordHash::parse(LARAVEL_PASSWORD).unwrap();
    for version in VersionTag::ALL {
        let retagged = hash.with_version(version);
        assert!(checker.verify("password", &retagged.to_string()).unwrap());
        assert!(!checker.verify("Admin123!", &retagged.to_string()).unwrap());
    }
}

#[test]
fn test_known_2b_hash() {
    let checker = HashChecker::new();
    assert!(checker.verify("correctbatteryhorsestapler", MIGRATION_EXAMPLE).unwrap());
    assert!(!checker.verify("correct battery horse staple", MIGRATION_EXAMPLE).unwrap());
}

#[test]
fn test_admin_scenario_at_cost_10() {
    let checker = HashChecker::new();
    let hash = checker.hash("Admin123!", 10, VersionTag::TwoB).unwrap();
    let encoded = hash.to_string();

    assert!(encoded.starts_with("$2b$10$"));
    assert!(checker.verify("Admin123!", &encoded).unwrap());
    // case-sensitive
    assert!(!checker.verify("admin123!", &encoded).unwrap());
}

#[test]
fn test_hash_with_default_settings() {
    let checker = HashChecker::new();
    let settings = HashSettings::with_overrides(Some(TEST_COST), None).unwrap();
    let hash = checker.hash_with("pw", &settings).unwrap();
    assert_eq!(hash.version(), VersionTag::TwoB);
    assert!(checker.verify("pw", &hash.to_string()).unwrap());
}

#[test]
fn test_malformed_is_error_not_false() {
    let checker = HashChecker::new();
    for candidate in [
        "not-a-valid-hash-string",
        "",
        "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZjcOvUS/zfUcHbz6JqHllgHQdxYy",
        "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie$",
    ] {
        match checker.verify("Admin123!", candidate) {
            Err(Error::MalformedHash { hash, .. }) => assert_eq!(hash, candidate),
            other => panic!("expected MalformedHash for '{candidate}', got {other:?}"),
        }
    }
}

#[test]
fn test_foreign_algorithm_rejected() {
    let checker = HashChecker::new();
    let argon2 = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$aGFzaGhhc2hoYXNoaGFzaA";
    match checker.verify("password", argon2) {
        Err(Error::MalformedHash {
            reason: HashFormatError::UnsupportedVersion(tag),
            ..
        }) => assert_eq!(tag, "argon2id"),
        other => panic!("expected UnsupportedVersion, got {other:?}"),
    }
}

#[test]
fn test_invalid_cost_at_generation() {
    let checker = HashChecker::new();
    for cost in [0, 3, 32, 100] {
        assert!(matches!(
            checker.hash("pw", cost, VersionTag::TwoA),
            Err(Error::InvalidCost { cost: c }) if c == cost
        ));
    }
}
