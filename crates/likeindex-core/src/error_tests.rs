//! Tests for `error` module

use super::error::*;

fn all_errors() -> Vec<Error> {
    let allocation = Vec::<u8>::new()
        .try_reserve(usize::MAX)
        .expect_err("reserving usize::MAX bytes must fail");
    vec![
        Error::Allocation(allocation),
        Error::CapacityExceeded(u32::MAX as usize + 1),
        Error::InvariantViolation("test".into()),
        Error::Config("test".into()),
        Error::HandleNotFound(7),
        Error::SourceChanged("test".into()),
    ]
}

// -------------------------------------------------------------------------
// Error code tests
// -------------------------------------------------------------------------

#[test]
fn test_error_codes_are_unique() {
    // Arrange
    let errors = all_errors();

    // Act
    let codes: Vec<&str> = errors.iter().map(Error::code).collect();

    // Assert
    let mut unique_codes = codes.clone();
    unique_codes.sort_unstable();
    unique_codes.dedup();
    assert_eq!(
        codes.len(),
        unique_codes.len(),
        "Error codes must be unique"
    );

    for code in &codes {
        assert!(
            code.starts_with("LIKEIDX-"),
            "Code {code} should start with LIKEIDX-"
        );
    }
}

#[test]
fn test_error_display_includes_code() {
    for err in all_errors() {
        let display = err.to_string();
        assert!(
            display.starts_with(&format!("[{}]", err.code())),
            "{display}"
        );
    }
}

#[test]
fn test_handle_not_found_display() {
    let err = Error::HandleNotFound(42);
    assert_eq!(err.to_string(), "[LIKEIDX-005] Index handle 42 not found");
}

// -------------------------------------------------------------------------
// Recoverability
// -------------------------------------------------------------------------

#[test]
fn test_only_invariant_violation_is_unrecoverable() {
    for err in all_errors() {
        let expected = !matches!(err, Error::InvariantViolation(_));
        assert_eq!(err.is_recoverable(), expected, "{err}");
    }
}

#[test]
fn test_try_reserve_error_converts() {
    fn reserve() -> Result<()> {
        let mut v: Vec<u64> = Vec::new();
        v.try_reserve(usize::MAX)?;
        Ok(())
    }

    let err = reserve().expect_err("must fail");
    assert_eq!(err.code(), "LIKEIDX-001");
    assert!(err.is_recoverable());
}
