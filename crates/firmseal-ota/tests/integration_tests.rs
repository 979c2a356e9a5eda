//! End-to-end tests for building and verifying OTA packages.

use std::fs;
use std::path::Path;

use firmseal_errors::{AlgorithmError, FormatError, KeyError};
use firmseal_ota::archive::{self, BLOCK_SIZE};
use firmseal_ota::delta;
use firmseal_ota::manifest::MANIFEST_ENTRY;
use firmseal_ota::prelude::*;
use firmseal_test_helpers::prelude::*;
use tracing_test::traced_test;

const HEX_KEY_256: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

fn builder_with_files(
    dir: &Path,
    specs: &[(&str, usize, FileType, CompressionType)],
) -> FirmSealResult<OtaManifestBuilder> {
    let mut builder = OtaManifestBuilder::default();
    builder
        .set_version(FirmwareVersion::new(3, 1, 4, 1))
        .set_target_device("gateway-x1", "rev-c");
    for (i, (name, len, file_type, compression)) in specs.iter().enumerate() {
        let path = write_firmware(dir, name, *len, i as u32 + 1);
        builder.add_file(&path, *file_type, None, None, Some(*compression))?;
    }
    Ok(builder)
}

mod packaging {
    use super::*;

    #[test]
    fn test_archive_size_accounts_for_every_payload() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[
                ("boot.img", 700, FileType::Bootloader, CompressionType::None),
                ("kernel.img", 3000, FileType::Kernel, CompressionType::Gzip),
                ("rootfs.img", 1500, FileType::Rootfs, CompressionType::Bzip2),
                ("data.img", 10, FileType::Data, CompressionType::Lzma),
            ],
        )?;
        let output = builder.build(dir.path().join("update.ota"), &BuildOptions::default())?;
        let package = fs::read(&output.package_path)?;

        assert_eq!(output.manifest.files.len(), 4);
        assert_eq!(output.package_size, package.len() as u64);

        let entries = archive::read_archive(&package)?;
        let manifest_len = entries.first().map(|e| e.data.len() as u64).unwrap_or_default();
        let lens = std::iter::once(manifest_len)
            .chain(output.manifest.files.iter().map(|f| f.compressed_size));
        assert_eq!(package.len() as u64, archive::archive_size(lens));
        assert_eq!(package.len() as u64 % BLOCK_SIZE, 0);

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            [
                MANIFEST_ENTRY,
                "boot.img.compressed",
                "kernel.img.compressed",
                "rootfs.img.compressed",
                "data.img.compressed"
            ]
        );
        assert!(output.manifest.offsets_are_contiguous());
        assert_eq!(output.manifest.pre_install.required_free_space, 2 * (700 + 3000 + 1500 + 10));
        Ok(())
    }

    #[test]
    fn test_sibling_manifest_matches_output() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 256, FileType::Firmware, CompressionType::Zlib)],
        )?;
        let output = builder.build(dir.path().join("update.ota"), &BuildOptions::default())?;

        assert_eq!(output.manifest_path, dir.path().join("update.manifest.json"));
        let on_disk = OtaManifest::read_from(&output.manifest_path)?;
        assert_eq!(on_disk, output.manifest);
        assert_eq!(on_disk.firmware_version.version_string, "3.1.4.1");
        assert_eq!(on_disk.target_device.model, "gateway-x1");
        Ok(())
    }

    #[test]
    fn test_builder_is_reusable() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 128, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let first = builder.build(dir.path().join("a.ota"), &BuildOptions::default())?;
        let second = builder.build(dir.path().join("b.ota"), &BuildOptions::default())?;
        assert_eq!(first.manifest.files, second.manifest.files);
        assert_eq!(builder.files().count(), 1);
        Ok(())
    }

    #[test]
    fn test_stage_trace_with_sealing() -> TestResult {
        let dir = temp_dir();
        let keys = write_rsa2048_pair(dir.path());
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 512, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let options = BuildOptions::default()
            .encrypted_with(HEX_KEY_256)
            .signed_with(&keys.private_key);
        let output = builder.build(dir.path().join("update.ota"), &options)?;

        let names: Vec<&str> = output.stages.iter().map(BuildStage::name).collect();
        assert_eq!(
            names,
            [
                "compressed",
                "manifest_drafted",
                "manifest_hashed",
                "archived",
                "package_hashed",
                "encrypted",
                "signed"
            ]
        );
        Ok(())
    }
}

mod verification {
    use super::*;

    #[test]
    fn test_encrypted_signed_round_trip() -> TestResult {
        let dir = temp_dir();
        let keys = write_rsa2048_pair(dir.path());
        let builder = builder_with_files(
            dir.path(),
            &[
                ("app.bin", 2048, FileType::Firmware, CompressionType::Gzip),
                ("cfg.bin", 64, FileType::Data, CompressionType::None),
            ],
        )?;
        let options = BuildOptions::default()
            .encrypted_with(HEX_KEY_256)
            .signed_with(&keys.private_key);
        let output = builder.build(dir.path().join("update.ota"), &options)?;

        let encryption = output.manifest.encryption.clone();
        assert_eq!(encryption.as_ref().map(|e| e.mode), Some(CipherMode::Gcm));
        assert_eq!(encryption.map(|e| e.iv.len()), Some(32));
        let signature = output.manifest.signature.clone();
        assert_eq!(
            signature.map(|s| s.fingerprint),
            Some(firmseal_test_helpers::fixtures::RSA2048_FINGERPRINT.to_string())
        );

        let report = PackageVerifier::new()
            .with_public_key_file(&keys.public_key)?
            .with_decryption_key(HEX_KEY_256)
            .verify_file(&output.package_path)?;
        assert_eq!(report.signature_valid, Some(true));
        assert_eq!(report.decrypted, Some(true));
        assert!(report.archive_valid);
        assert!(report.manifest_matches);
        assert!(report.files.iter().all(FileCheck::is_valid));
        assert!(report.overall_valid);
        assert_eq!(report.exit_code(), 0);
        Ok(())
    }

    #[test]
    fn test_wrong_key_rejects_signature() -> TestResult {
        let dir = temp_dir();
        let keys = write_rsa2048_pair(dir.path());
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 300, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let output = builder.build(
            dir.path().join("update.ota"),
            &BuildOptions::default().signed_with(&keys.private_key),
        )?;

        let report = PackageVerifier::new()
            .with_public_key(rsa2048_other_public())
            .verify_file(&output.package_path)?;
        assert_eq!(report.signature_valid, Some(false));
        assert!(report.package_checksum_valid);
        assert!(!report.overall_valid);
        assert_eq!(report.exit_code(), 1);
        Ok(())
    }

    #[test]
    fn test_single_byte_tamper_breaks_package_checksum() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 1024, FileType::Firmware, CompressionType::None)],
        )?;
        let output = builder.build(dir.path().join("update.ota"), &BuildOptions::default())?;
        let mut package = fs::read(&output.package_path)?;

        let entries = archive::read_archive(&package)?;
        let manifest_len = entries.first().map(|e| e.data.len() as u64).unwrap_or_default();
        let payload_start = archive::archive_size([manifest_len]) - archive::END_MARKER_LEN + BLOCK_SIZE;
        let index = usize::try_from(payload_start)? + 100;
        if let Some(byte) = package.get_mut(index) {
            *byte ^= 0x01;
        }

        let report = PackageVerifier::new().verify(&package, &output.manifest)?;
        assert!(!report.package_checksum_valid);
        assert!(report.manifest_checksum_valid);
        assert_eq!(report.files.first().map(|f| f.checksum_valid), Some(false));
        assert!(!report.overall_valid);
        Ok(())
    }

    #[test]
    fn test_cbc_and_ctr_packages_decrypt() -> TestResult {
        for mode in [CipherMode::Cbc, CipherMode::Ctr] {
            let dir = temp_dir();
            let config = OtaBuilderConfig {
                cipher_mode: mode,
                encryption_algorithm: EncryptionAlgorithm::Aes128,
                ..OtaBuilderConfig::default()
            };
            let mut builder = OtaManifestBuilder::new(config);
            let path = write_firmware(dir.path(), "app.bin", 777, 9);
            builder.add_file(&path, FileType::Firmware, None, None, None)?;

            let output = builder.build(
                dir.path().join("update.ota"),
                &BuildOptions::default().encrypted_with("short passphrase"),
            )?;
            let report = PackageVerifier::new()
                .with_decryption_key("short passphrase")
                .verify_file(&output.package_path)?;
            assert!(report.overall_valid, "{mode} package failed verification");
        }
        Ok(())
    }
}

mod failures {
    use super::*;

    #[test]
    fn test_missing_file_fails_at_add() -> TestResult {
        let dir = temp_dir();
        let mut builder = OtaManifestBuilder::default();
        let result = builder.add_file(dir.path().join("absent.bin"), FileType::Firmware, None, None, None);
        assert!(result.is_err_and(|e| e.is_not_found()));
        assert_eq!(builder.files().count(), 0);
        Ok(())
    }

    #[test]
    fn test_no_files() -> TestResult {
        let dir = temp_dir();
        let result = OtaManifestBuilder::default().build(dir.path().join("empty.ota"), &BuildOptions::default());
        assert!(matches!(
            result,
            Err(FirmSealError::Format(FormatError::Manifest(_)))
        ));
        assert!(!dir.path().join("empty.ota").exists());
        Ok(())
    }

    #[test]
    fn test_encrypt_without_key() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 64, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let options = BuildOptions {
            encrypt: true,
            ..BuildOptions::default()
        };
        let result = builder.build(dir.path().join("update.ota"), &options);
        assert!(matches!(
            result,
            Err(FirmSealError::Key(KeyError::Missing {
                purpose: "package encryption"
            }))
        ));
        assert!(!dir.path().join("update.ota").exists());
        Ok(())
    }

    #[test]
    fn test_encrypt_with_blank_key() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 64, FileType::Firmware, CompressionType::Gzip)],
        )?;
        for key in ["", "   ", "\t\n"] {
            let options = BuildOptions::default().encrypted_with(key);
            let result = builder.build(dir.path().join("update.ota"), &options);
            assert!(
                matches!(
                    result,
                    Err(FirmSealError::Key(KeyError::Missing {
                        purpose: "package encryption"
                    }))
                ),
                "key {key:?}"
            );
        }
        assert!(!dir.path().join("update.ota").exists());
        Ok(())
    }

    #[test]
    fn test_sign_without_key() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 64, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let options = BuildOptions {
            sign: true,
            ..BuildOptions::default()
        };
        let result = builder.build(dir.path().join("update.ota"), &options);
        assert!(matches!(
            result,
            Err(FirmSealError::Key(KeyError::Missing {
                purpose: "package signing"
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_source_changed_after_add() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 64, FileType::Firmware, CompressionType::Gzip)],
        )?;
        fs::write(dir.path().join("app.bin"), b"replaced")?;
        let result = builder.build(dir.path().join("update.ota"), &BuildOptions::default());
        assert!(matches!(result, Err(FirmSealError::Integrity(_))));
        Ok(())
    }

    #[test]
    fn test_unsupported_names() {
        let compression = "zstd".parse::<CompressionType>();
        assert!(matches!(compression, Err(AlgorithmError::Unsupported { .. })));
        assert!(
            compression.is_err_and(|e| e.to_string().contains("none, gzip, zlib, lzma, bzip2"))
        );
        assert!("sha1".parse::<HashAlgorithm>().is_err());
        assert!("ofb".parse::<CipherMode>().is_err());
    }
}

mod delta_packages {
    use super::*;

    #[test]
    fn test_patch_payload_round_trip() -> TestResult {
        let dir = temp_dir();
        let old = firmware_blob(4096, 1);
        let mut new = old.clone();
        if let Some(window) = new.get_mut(1000..1010) {
            window.copy_from_slice(b"PATCHED!!!");
        }
        new.extend_from_slice(b"tail");

        let patch_path = dir.path().join("app.patch");
        fs::write(&patch_path, delta::create_patch(&old, &new))?;

        let mut builder = OtaManifestBuilder::default();
        builder
            .set_package_type(PackageType::Delta)
            .add_file(&patch_path, FileType::Patch, Some("/boot/app.bin"), Some("app"), None)?;
        let output = builder.build(dir.path().join("delta.ota"), &BuildOptions::default())?;
        assert_eq!(output.manifest.package_type, PackageType::Delta);

        let package = fs::read(&output.package_path)?;
        let entries = archive::read_archive(&package)?;
        let payload = entries
            .iter()
            .find(|e| e.name == "app.patch.compressed")
            .map(|e| e.data.clone())
            .unwrap_or_default();
        let patch = firmseal_ota::compression::decompress(&payload, CompressionType::Gzip)?;
        assert_eq!(delta::apply_patch(&old, &patch)?, new);
        Ok(())
    }
}

mod logging {
    use super::*;

    #[test]
    #[traced_test]
    fn test_build_logs_boundaries() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 100, FileType::Firmware, CompressionType::Gzip)],
        )?;
        builder.build(dir.path().join("update.ota"), &BuildOptions::default())?;
        assert!(logs_contain("Added file"));
        assert!(logs_contain("Building OTA package"));
        assert!(logs_contain("Manifest checksum embedded"));
        assert!(logs_contain("OTA package built"));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn test_missing_decryption_key_is_logged() -> TestResult {
        let dir = temp_dir();
        let builder = builder_with_files(
            dir.path(),
            &[("app.bin", 100, FileType::Firmware, CompressionType::Gzip)],
        )?;
        let output = builder.build(
            dir.path().join("update.ota"),
            &BuildOptions::default().encrypted_with(HEX_KEY_256),
        )?;
        let report = PackageVerifier::new().verify_file(&output.package_path)?;
        assert_eq!(report.decrypted, Some(false));
        assert!(logs_contain("no decryption key was supplied"));
        Ok(())
    }
}
