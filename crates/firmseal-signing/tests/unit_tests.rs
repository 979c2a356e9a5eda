//! Unit tests for the public signing API.

use std::fs;

use firmseal_signing::keys;
use firmseal_signing::prelude::*;
use firmseal_test_helpers::fixtures;
use firmseal_test_helpers::prelude::*;

fn signer_with(hash: HashAlgorithm) -> FirmSealResult<FirmwareSigner> {
    FirmwareSigner::from_private_key(fixtures::rsa2048_private(), SignerConfig::with_hash(hash))
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_from_json_file() -> TestResult {
        let dir = temp_dir();
        let path = dir.path().join("signer.json");
        fs::write(&path, r#"{"hash_algorithm": "sha512", "key_size": 2048}"#)?;
        let config = SignerConfig::from_json_file(&path)?;
        assert_eq!(config, SignerConfig::with_hash(HashAlgorithm::Sha512).require_key_size(2048));
        Ok(())
    }

    #[test]
    fn test_missing_config_file() {
        let result = SignerConfig::from_json_file("/nonexistent/signer.json");
        assert!(result.is_err_and(|e| e.is_not_found()));
    }
}

mod signer_tests {
    use super::*;

    #[test]
    fn test_hash_length_follows_algorithm() -> TestResult {
        let data = firmware_blob(300, 1);
        assert_eq!(signer_with(HashAlgorithm::Sha256)?.compute_hash(&data).len(), 32);
        assert_eq!(signer_with(HashAlgorithm::Sha512)?.compute_hash(&data).len(), 64);
        Ok(())
    }

    #[test]
    fn test_crc32_check_value() -> TestResult {
        let signer = signer_with(HashAlgorithm::Sha256)?;
        assert_eq!(signer.compute_crc32(b"123456789"), 0xCBF4_3926);
        Ok(())
    }

    #[test]
    fn test_header_references_firmware() -> TestResult {
        let signer = signer_with(HashAlgorithm::Sha512)?;
        let firmware = firmware_blob(777, 2);
        let version = FirmwareVersion::new(4, 3, 2, 1);
        let image = signer.sign_firmware_at(&firmware, version, 1_700_000_123)?;

        let header = image.header();
        assert_eq!(header.version, version);
        assert_eq!(header.timestamp, 1_700_000_123);
        assert_eq!(header.firmware_size, 777);
        assert_eq!(header.hash_algorithm_id, HashAlgorithm::Sha512.id());
        assert_eq!(header.signature_algorithm_id, SignatureAlgorithm::Rsa2048.id());
        assert_eq!(header.signature_size, 256);
        assert_eq!(header.stored_digest(64), Some(signer.compute_hash(&firmware).as_slice()));
        assert_eq!(image.firmware(), firmware.as_slice());
        Ok(())
    }

    #[test]
    fn test_fingerprint_matches_keys_module() -> TestResult {
        let signer = signer_with(HashAlgorithm::Sha256)?;
        assert_eq!(signer.fingerprint()?, keys::public_key_fingerprint(&rsa2048_public())?);
        Ok(())
    }
}

mod verifier_tests {
    use super::*;

    #[test]
    fn test_blank_header_reports_each_unset_field() {
        let header = FirmwareHeader::new(FirmwareVersion::default());
        let checks = FirmwareVerifier::default().verify_header(&header);
        assert_eq!(
            checks.failed_fields(),
            vec!["version", "timestamp", "firmware_size", "signature_size"]
        );
        assert!(!checks.all_passed());
    }

    #[test]
    fn test_signed_header_passes_every_check() -> TestResult {
        let image = signer_with(HashAlgorithm::Sha256)?.sign_firmware(&firmware_blob(64, 3), "1.0.0".parse()?)?;
        let checks = FirmwareVerifier::default().verify_header(image.header());
        assert!(checks.all_passed(), "{:?}", checks.failed_fields());
        Ok(())
    }

    #[test]
    fn test_hash_and_crc_reject_other_firmware() -> TestResult {
        let firmware = firmware_blob(128, 4);
        let image = signer_with(HashAlgorithm::Sha256)?.sign_firmware(&firmware, "2.0.0".parse()?)?;
        let other = firmware_blob(128, 5);

        let verifier = FirmwareVerifier::default();
        assert!(verifier.verify_firmware_hash(image.header(), &firmware));
        assert!(verifier.verify_crc32(image.header(), &firmware));
        assert!(!verifier.verify_firmware_hash(image.header(), &other));
        assert!(!verifier.verify_crc32(image.header(), &other));
        Ok(())
    }

    #[test]
    fn test_signature_is_tri_state() -> TestResult {
        let firmware = firmware_blob(96, 6);
        let image = signer_with(HashAlgorithm::Sha256)?.sign_firmware(&firmware, "1.2.3".parse()?)?;

        let without_key = FirmwareVerifier::new(None);
        assert!(!without_key.has_public_key());
        assert_eq!(
            without_key.verify_signature(image.header(), &firmware, image.signature()),
            None
        );

        let right = FirmwareVerifier::new(Some(rsa2048_public()));
        assert_eq!(right.verify_signature(image.header(), &firmware, image.signature()), Some(true));

        let wrong = FirmwareVerifier::new(Some(rsa2048_other_public()));
        assert_eq!(wrong.verify_signature(image.header(), &firmware, image.signature()), Some(false));
        Ok(())
    }
}
