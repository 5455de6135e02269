use strata_core::models::IdentifierError;
use strata_core::MigrationId;

#[test]
fn parses_canonical_identifier() {
    let id = MigrationId::parse("001-initial-schema").unwrap();
    assert_eq!(id.sequence(), 1);
    assert_eq!(id.as_str(), "001-initial-schema");
    assert_eq!(id.description(), "initial-schema");
}

#[test]
fn display_preserves_original_text() {
    let id = MigrationId::parse("042-add-orders").unwrap();
    assert_eq!(id.to_string(), "042-add-orders");
}

#[test]
fn orders_numerically_not_lexicographically() {
    let two = MigrationId::parse("002-seed-users").unwrap();
    let ten = MigrationId::parse("010-add-orders").unwrap();
    // "010..." < "002..." as text, but 10 > 2 as a sequence.
    assert!(two < ten);
}

#[test]
fn equal_sequences_order_by_full_text() {
    let a = MigrationId::parse("001-alpha").unwrap();
    let b = MigrationId::parse("001-beta").unwrap();
    assert!(a < b);
}

#[test]
fn unpadded_and_padded_sequences_parse_to_same_number() {
    let padded = MigrationId::parse("007-x7").unwrap();
    let unpadded = MigrationId::parse("7-x7").unwrap();
    assert_eq!(padded.sequence(), unpadded.sequence());
    assert_ne!(padded, unpadded);
}

#[test]
fn new_builds_zero_padded_form() {
    let id = MigrationId::new(3, "create-items").unwrap();
    assert_eq!(id.as_str(), "003-create-items");
    assert_eq!(id.sequence(), 3);
}

#[test]
fn rejects_empty() {
    assert_eq!(MigrationId::parse(""), Err(IdentifierError::Empty));
}

#[test]
fn rejects_missing_sequence() {
    assert!(matches!(
        MigrationId::parse("initial-schema"),
        Err(IdentifierError::MissingSequence { .. })
    ));
}

#[test]
fn rejects_sequence_only() {
    assert!(matches!(
        MigrationId::parse("001"),
        Err(IdentifierError::MissingDescription { .. })
    ));
    assert!(matches!(
        MigrationId::parse("001-"),
        Err(IdentifierError::MissingDescription { .. })
    ));
}

#[test]
fn rejects_uppercase_and_underscores() {
    assert!(matches!(
        MigrationId::parse("001-Initial"),
        Err(IdentifierError::InvalidCharacter { found: 'I', .. })
    ));
    assert!(matches!(
        MigrationId::parse("001-initial_schema"),
        Err(IdentifierError::InvalidCharacter { found: '_', .. })
    ));
}

#[test]
fn rejects_double_and_trailing_hyphens() {
    assert!(matches!(
        MigrationId::parse("001-initial--schema"),
        Err(IdentifierError::InvalidCharacter { found: '-', .. })
    ));
    assert!(matches!(
        MigrationId::parse("001-initial-"),
        Err(IdentifierError::InvalidCharacter { found: '-', .. })
    ));
}

#[test]
fn rejects_digits_not_followed_by_hyphen() {
    assert!(matches!(
        MigrationId::parse("001x-schema"),
        Err(IdentifierError::InvalidCharacter { found: 'x', .. })
    ));
}

#[test]
fn rejects_oversized_sequence() {
    assert!(matches!(
        MigrationId::parse("1234567890-too-big"),
        Err(IdentifierError::SequenceOutOfRange { .. })
    ));
}

#[test]
fn serde_roundtrips_as_plain_string() {
    let id = MigrationId::parse("001-initial-schema").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"001-initial-schema\"");
    let back: MigrationId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn serde_rejects_malformed_strings() {
    let result: Result<MigrationId, _> = serde_json::from_str("\"not-numbered\"");
    assert!(result.is_err());
}
