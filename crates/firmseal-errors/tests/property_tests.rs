//! Property-based tests for error construction.

use firmseal_errors::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_unsupported_message_names_value(value in "[a-z0-9]{1,12}") {
        let err = AlgorithmError::unsupported(AlgorithmKind::Hash, value.clone(), &["sha256", "sha512"]);
        let msg = err.to_string();
        let quoted = format!("'{}'", value);
        prop_assert!(msg.contains(&quoted));
        prop_assert!(msg.ends_with("(supported: sha256, sha512)"));
    }

    #[test]
    fn prop_unknown_id_is_four_hex_digits(id in any::<u16>()) {
        let msg = AlgorithmError::unknown_id(AlgorithmKind::Signature, id).to_string();
        let expected = format!("0x{id:04X}");
        prop_assert!(msg.ends_with(&expected));
    }

    #[test]
    fn prop_truncated_keeps_lengths(expected in 1usize..4096, actual in 0usize..4096) {
        let err: FirmSealError = FormatError::truncated("header", expected, actual).into();
        prop_assert_eq!(err.category(), ErrorCategory::Format);
        let msg = err.to_string();
        prop_assert!(msg.contains(&expected.to_string()));
        prop_assert!(msg.contains(&actual.to_string()));
    }
}
