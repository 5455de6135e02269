//! Property tests: identifier parse/format roundtrip and ordering.

use proptest::prelude::*;

use strata_core::MigrationId;

proptest! {
    #[test]
    fn prop_new_parse_roundtrip(
        sequence in 0u32..100_000,
        slug in "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,3}"
    ) {
        let id = MigrationId::new(sequence, &slug).unwrap();
        let reparsed = MigrationId::parse(id.as_str()).unwrap();
        prop_assert_eq!(&reparsed, &id);
        prop_assert_eq!(reparsed.sequence(), sequence);
        prop_assert_eq!(reparsed.description(), slug);
    }

    #[test]
    fn prop_ordering_follows_sequence(
        a in 0u32..100_000,
        b in 0u32..100_000,
        slug_a in "[a-z]{1,8}",
        slug_b in "[a-z]{1,8}"
    ) {
        let id_a = MigrationId::new(a, &slug_a).unwrap();
        let id_b = MigrationId::new(b, &slug_b).unwrap();
        if a < b {
            prop_assert!(id_a < id_b);
        } else if a > b {
            prop_assert!(id_a > id_b);
        }
    }

    #[test]
    fn prop_serde_roundtrip(
        sequence in 0u32..100_000,
        slug in "[a-z]{1,12}"
    ) {
        let id = MigrationId::new(sequence, &slug).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let back: MigrationId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, id);
    }
}
