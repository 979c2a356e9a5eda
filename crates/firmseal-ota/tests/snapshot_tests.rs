//! Snapshot tests for manifest JSON and error messages.

use firmseal_errors::{FirmSealError, KeyError};
use firmseal_header::SignatureAlgorithm;
use firmseal_ota::delta;
use firmseal_ota::manifest::{EncryptionInfo, FileEntry, PackageSignature};
use firmseal_ota::prelude::*;
use insta::assert_snapshot;

#[test]
fn test_default_manifest_json() -> Result<(), serde_json::Error> {
    let json = serde_json::to_string(&OtaManifest::default())?;
    assert_snapshot!(json, @r#"{"version":"1.0.0","package_type":"full","firmware_version":{"major":1,"minor":0,"patch":0,"build":0,"version_string":"1.0.0.0"},"build_date":"","target_device":{"model":"unknown","hardware_version":"1.0"},"ab_update":{"enabled":true,"target_slot":"auto","verify_before_reboot":true,"fallback_enabled":true},"files":[],"checksums":{"algorithm":"sha256","package_checksum":"","manifest_checksum":""},"rollback_protection":{"enabled":true,"minimum_version":"1.0.0.0","security_patch_level":1},"pre_install":{"required_free_space":0,"battery_level":30},"post_install":{"reboot_required":true,"verification_timeout":60},"metadata":{"author":"OTA Builder","description":"Firmware OTA update package","tags":[]}}"#);
    Ok(())
}

#[test]
fn test_file_entry_json() -> Result<(), serde_json::Error> {
    let entry = FileEntry {
        name: "kernel.img".to_string(),
        path: "/boot/kernel.img".to_string(),
        size: 4096,
        checksum: "ab".repeat(4),
        file_type: FileType::Kernel,
        compression: CompressionType::Lzma,
        partition: "boot".to_string(),
        compressed_size: 1200,
        offset: 300,
    };
    assert_snapshot!(serde_json::to_string(&entry)?, @r#"{"name":"kernel.img","path":"/boot/kernel.img","size":4096,"checksum":"abababab","type":"kernel","compression":"lzma","partition":"boot","compressed_size":1200,"offset":300}"#);
    Ok(())
}

#[test]
fn test_encryption_info_json() -> Result<(), serde_json::Error> {
    let info = EncryptionInfo {
        enabled: true,
        algorithm: EncryptionAlgorithm::Aes128,
        mode: CipherMode::Ctr,
        iv: "00".repeat(16),
    };
    assert_snapshot!(serde_json::to_string(&info)?, @r#"{"enabled":true,"algorithm":"aes128","mode":"ctr","iv":"00000000000000000000000000000000"}"#);
    Ok(())
}

#[test]
fn test_package_signature_json() -> Result<(), serde_json::Error> {
    let signature = PackageSignature {
        algorithm: SignatureAlgorithm::Rsa2048,
        hash_algorithm: HashAlgorithm::Sha256,
        signature: "c2ln".to_string(),
        fingerprint: "ab".repeat(4),
        signing_date: "2026-01-01T00:00:00+00:00".to_string(),
    };
    assert_snapshot!(serde_json::to_string(&signature)?, @r#"{"algorithm":"rsa2048","hash_algorithm":"sha256","signature":"c2ln","fingerprint":"abababab","signing_date":"2026-01-01T00:00:00+00:00"}"#);
    Ok(())
}

#[test]
fn test_build_stage_json() -> Result<(), serde_json::Error> {
    let stage = BuildStage::PackageHashed {
        package_checksum: "cafe".to_string(),
        archive_size: 2048,
    };
    assert_snapshot!(serde_json::to_string(&stage)?, @r#"{"stage":"package_hashed","package_checksum":"cafe","archive_size":2048}"#);
    Ok(())
}

#[test]
fn test_unsupported_compression_message() {
    let message = "zstd"
        .parse::<CompressionType>()
        .map_or_else(|e| e.to_string(), |c| c.to_string());
    assert_snapshot!(message, @"Unsupported compression type 'zstd' (supported: none, gzip, zlib, lzma, bzip2)");
}

#[test]
fn test_unsupported_cipher_mode_message() {
    let message = "ofb"
        .parse::<CipherMode>()
        .map_or_else(|e| e.to_string(), |m| m.to_string());
    assert_snapshot!(message, @"Unsupported cipher mode 'ofb' (supported: gcm, cbc, ctr)");
}

#[test]
fn test_missing_key_message() {
    let error = FirmSealError::from(KeyError::Missing {
        purpose: "package encryption",
    });
    assert_snapshot!(error.to_string(), @"Key error: No key supplied for package encryption");
}

#[test]
fn test_unknown_patch_op_message() {
    let mut patch = delta::create_patch(b"", b"");
    if let Some(last) = patch.last_mut() {
        *last = 0x7F;
    }
    let message = delta::apply_patch(b"", &patch).map_or_else(|e| e.to_string(), |_| String::new());
    assert_snapshot!(message, @"Format error: Invalid delta patch: unknown op 0x7F at byte 56");
}
