//! Whole-package AES encryption.
//!
//! The encrypted form is `iv ‖ ciphertext`, with the 16-byte GCM tag
//! appended in GCM mode. The IV is always 16 random bytes, which GCM
//! accepts as a non-standard nonce length.

use core::fmt;
use std::str::FromStr;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, AeadCore, KeyInit};
use aes_gcm::aes::{Aes128, Aes256};
use aes_gcm::{AesGcm, Nonce};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ctr::cipher::StreamCipher;
use firmseal_errors::{
    AlgorithmError, AlgorithmKind, FirmSealError, FirmSealResult, FormatError, KeyError,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

/// IV length for every mode.
pub const IV_LEN: usize = 16;

/// GCM authentication tag length.
pub const GCM_TAG_LEN: usize = 16;

/// AES block length; CBC input must be a multiple of it.
pub const BLOCK_LEN: usize = 16;

/// AES key size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionAlgorithm {
    /// 128-bit key
    Aes128,
    /// 256-bit key
    #[default]
    Aes256,
}

impl EncryptionAlgorithm {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] = &["aes128", "aes256"];

    /// Lowercase algorithm name.
    pub fn name(self) -> &'static str {
        match self {
            EncryptionAlgorithm::Aes128 => "aes128",
            EncryptionAlgorithm::Aes256 => "aes256",
        }
    }

    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            EncryptionAlgorithm::Aes128 => 16,
            EncryptionAlgorithm::Aes256 => 32,
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aes128" => Ok(EncryptionAlgorithm::Aes128),
            "aes256" => Ok(EncryptionAlgorithm::Aes256),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::Encryption,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherMode {
    /// Galois/counter mode, authenticated
    #[default]
    Gcm,
    /// Cipher block chaining, no padding
    Cbc,
    /// Counter mode with a 128-bit big-endian counter
    Ctr,
}

impl CipherMode {
    /// Accepted names.
    pub const NAMES: &'static [&'static str] = &["gcm", "cbc", "ctr"];

    /// Lowercase mode name.
    pub fn name(self) -> &'static str {
        match self {
            CipherMode::Gcm => "gcm",
            CipherMode::Cbc => "cbc",
            CipherMode::Ctr => "ctr",
        }
    }

    /// Bytes the mode adds on top of the plaintext, IV included.
    pub fn overhead(self) -> usize {
        match self {
            CipherMode::Gcm => IV_LEN + GCM_TAG_LEN,
            CipherMode::Cbc | CipherMode::Ctr => IV_LEN,
        }
    }
}

impl fmt::Display for CipherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherMode {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcm" => Ok(CipherMode::Gcm),
            "cbc" => Ok(CipherMode::Cbc),
            "ctr" => Ok(CipherMode::Ctr),
            _ => Err(AlgorithmError::unsupported(
                AlgorithmKind::CipherMode,
                s,
                Self::NAMES,
            )),
        }
    }
}

/// AES key bytes sized for one [`EncryptionAlgorithm`], wiped on drop.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: Zeroizing<Vec<u8>>,
    algorithm: EncryptionAlgorithm,
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl EncryptionKey {
    /// Derive a key from user-supplied material.
    ///
    /// A hex string of exactly twice the key length is decoded. Anything
    /// else is taken as raw bytes, zero padded or truncated to the key
    /// length.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::EmptyMaterial`] if `material` is empty or only
    /// whitespace.
    pub fn from_material(material: &str, algorithm: EncryptionAlgorithm) -> Result<Self, KeyError> {
        if material.trim().is_empty() {
            return Err(KeyError::EmptyMaterial);
        }
        let key_len = algorithm.key_len();
        if material.len() == key_len.saturating_mul(2)
            && let Ok(bytes) = hex::decode(material)
        {
            return Ok(Self {
                bytes: Zeroizing::new(bytes),
                algorithm,
            });
        }

        let mut bytes = Zeroizing::new(material.as_bytes().to_vec());
        if bytes.len() != key_len {
            warn!(
                supplied = bytes.len(),
                required = key_len,
                %algorithm,
                "Encryption key is not {} hex digits; using raw bytes resized to the key length",
                key_len.saturating_mul(2)
            );
            bytes.resize(key_len, 0);
        }
        Ok(Self { bytes, algorithm })
    }

    /// Wrap key bytes that already have the exact length.
    ///
    /// # Errors
    ///
    /// Returns [`FirmSealError::Encryption`] if `bytes` has the wrong length.
    pub fn from_bytes(bytes: &[u8], algorithm: EncryptionAlgorithm) -> FirmSealResult<Self> {
        if bytes.len() != algorithm.key_len() {
            return Err(FirmSealError::encryption(format!(
                "{algorithm} needs a {}-byte key, got {}",
                algorithm.key_len(),
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
            algorithm,
        })
    }

    /// Key size this key was prepared for.
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encrypted package bytes and the IV they start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPackage {
    /// `iv ‖ ciphertext [‖ tag]`
    pub bytes: Vec<u8>,
    /// IV copied from the front of `bytes`
    pub iv: [u8; IV_LEN],
}

/// Encrypt `plaintext` under a fresh random IV.
///
/// # Errors
///
/// See [`encrypt_with_iv`].
pub fn encrypt(
    plaintext: &[u8],
    key: &EncryptionKey,
    mode: CipherMode,
) -> FirmSealResult<EncryptedPackage> {
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    let bytes = encrypt_with_iv(plaintext, key, mode, iv)?;
    Ok(EncryptedPackage { bytes, iv })
}

/// Encrypt `plaintext` under `iv`, returning `iv ‖ ciphertext [‖ tag]`.
///
/// # Errors
///
/// Returns [`FirmSealError::Encryption`] if CBC input is not block aligned
/// or the cipher rejects the key.
pub fn encrypt_with_iv(
    plaintext: &[u8],
    key: &EncryptionKey,
    mode: CipherMode,
    iv: [u8; IV_LEN],
) -> FirmSealResult<Vec<u8>> {
    if mode == CipherMode::Cbc && !plaintext.len().is_multiple_of(BLOCK_LEN) {
        return Err(FirmSealError::encryption(format!(
            "cbc input of {} bytes is not a multiple of the {BLOCK_LEN}-byte block",
            plaintext.len()
        )));
    }

    let body = match key.algorithm {
        EncryptionAlgorithm::Aes128 => seal::<Aes128Suite>(plaintext, key.as_bytes(), mode, &iv),
        EncryptionAlgorithm::Aes256 => seal::<Aes256Suite>(plaintext, key.as_bytes(), mode, &iv),
    }
    .map_err(|reason| FirmSealError::encryption(format!("{}-{mode}: {reason}", key.algorithm)))?;

    let mut out = Vec::with_capacity(IV_LEN.saturating_add(body.len()));
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Split the leading IV off an encrypted package.
///
/// # Errors
///
/// Returns [`FormatError::Truncated`] if `data` cannot hold an IV.
pub fn split_iv(data: &[u8]) -> Result<([u8; IV_LEN], &[u8]), FormatError> {
    data.split_first_chunk::<IV_LEN>()
        .map(|(iv, rest)| (*iv, rest))
        .ok_or(FormatError::truncated("encrypted package", IV_LEN, data.len()))
}

/// Decrypt `iv ‖ ciphertext [‖ tag]`.
///
/// # Errors
///
/// Returns a format error if the input is too short, or
/// [`FirmSealError::Encryption`] if the GCM tag does not authenticate or
/// CBC input is misaligned.
pub fn decrypt(data: &[u8], key: &EncryptionKey, mode: CipherMode) -> FirmSealResult<Vec<u8>> {
    let minimum = mode.overhead();
    if data.len() < minimum {
        return Err(FormatError::truncated("encrypted package", minimum, data.len()).into());
    }
    let (iv, body) = split_iv(data)?;
    if mode == CipherMode::Cbc && !body.len().is_multiple_of(BLOCK_LEN) {
        return Err(FirmSealError::encryption(format!(
            "cbc ciphertext of {} bytes is not block aligned",
            body.len()
        )));
    }

    match key.algorithm {
        EncryptionAlgorithm::Aes128 => open::<Aes128Suite>(body, key.as_bytes(), mode, &iv),
        EncryptionAlgorithm::Aes256 => open::<Aes256Suite>(body, key.as_bytes(), mode, &iv),
    }
    .map_err(|reason| FirmSealError::encryption(format!("{}-{mode}: {reason}", key.algorithm)))
}

/// Concrete cipher types for one AES key size.
trait AesSuite {
    type Gcm: KeyInit + Aead + AeadCore<NonceSize = U16>;
    type CbcEncryptor: KeyIvInit + BlockEncryptMut;
    type CbcDecryptor: KeyIvInit + BlockDecryptMut;
    type Ctr: KeyIvInit + StreamCipher;
}

struct Aes128Suite;
struct Aes256Suite;

impl AesSuite for Aes128Suite {
    type Gcm = AesGcm<Aes128, U16>;
    type CbcEncryptor = cbc::Encryptor<Aes128>;
    type CbcDecryptor = cbc::Decryptor<Aes128>;
    type Ctr = ctr::Ctr128BE<Aes128>;
}

impl AesSuite for Aes256Suite {
    type Gcm = AesGcm<Aes256, U16>;
    type CbcEncryptor = cbc::Encryptor<Aes256>;
    type CbcDecryptor = cbc::Decryptor<Aes256>;
    type Ctr = ctr::Ctr128BE<Aes256>;
}

fn seal<S: AesSuite>(
    plaintext: &[u8],
    key: &[u8],
    mode: CipherMode,
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>, String> {
    match mode {
        CipherMode::Gcm => {
            let cipher = S::Gcm::new_from_slice(key).map_err(|e| e.to_string())?;
            cipher
                .encrypt(Nonce::<U16>::from_slice(iv), plaintext)
                .map_err(|e| e.to_string())
        }
        CipherMode::Cbc => {
            let cipher = S::CbcEncryptor::new_from_slices(key, iv).map_err(|e| e.to_string())?;
            Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
        }
        CipherMode::Ctr => {
            let mut cipher = S::Ctr::new_from_slices(key, iv).map_err(|e| e.to_string())?;
            let mut buf = plaintext.to_vec();
            cipher.apply_keystream(&mut buf);
            Ok(buf)
        }
    }
}

fn open<S: AesSuite>(
    body: &[u8],
    key: &[u8],
    mode: CipherMode,
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>, String> {
    match mode {
        CipherMode::Gcm => {
            let cipher = S::Gcm::new_from_slice(key).map_err(|e| e.to_string())?;
            cipher
                .decrypt(Nonce::<U16>::from_slice(iv), body)
                .map_err(|e| format!("authentication failed ({e})"))
        }
        CipherMode::Cbc => {
            let cipher = S::CbcDecryptor::new_from_slices(key, iv).map_err(|e| e.to_string())?;
            cipher
                .decrypt_padded_vec_mut::<NoPadding>(body)
                .map_err(|e| e.to_string())
        }
        CipherMode::Ctr => {
            let mut cipher = S::Ctr::new_from_slices(key, iv).map_err(|e| e.to_string())?;
            let mut buf = body.to_vec();
            cipher.apply_keystream(&mut buf);
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_256: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn block_aligned() -> Vec<u8> {
        (0..1024u32).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_hex_material_is_decoded() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material(HEX_256, EncryptionAlgorithm::Aes256)?;
        assert_eq!(key.as_bytes().len(), 32);
        assert_eq!(key.as_bytes().first(), Some(&0x00));
        assert_eq!(key.as_bytes().last(), Some(&0x1f));
        Ok(())
    }

    #[test]
    fn test_short_raw_material_is_zero_padded() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material("secret", EncryptionAlgorithm::Aes128)?;
        assert_eq!(key.as_bytes(), b"secret\0\0\0\0\0\0\0\0\0\0");
        Ok(())
    }

    #[test]
    fn test_long_raw_material_is_truncated() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material("0123456789abcdefXYZ", EncryptionAlgorithm::Aes128)?;
        assert_eq!(key.as_bytes(), b"0123456789abcdef");
        Ok(())
    }

    #[test]
    fn test_non_hex_material_of_hex_length_falls_back_to_raw() -> FirmSealResult<()> {
        let material = "z".repeat(32);
        let key = EncryptionKey::from_material(&material, EncryptionAlgorithm::Aes128)?;
        assert_eq!(Some(key.as_bytes()), material.as_bytes().get(..16));
        Ok(())
    }

    #[test]
    fn test_blank_material_is_rejected() {
        for material in ["", "   ", "\t\n"] {
            let result = EncryptionKey::from_material(material, EncryptionAlgorithm::Aes256);
            assert!(matches!(result, Err(KeyError::EmptyMaterial)), "{material:?}");
        }
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(EncryptionKey::from_bytes(&[0u8; 16], EncryptionAlgorithm::Aes256).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 32], EncryptionAlgorithm::Aes256).is_ok());
    }

    #[test]
    fn test_all_modes_round_trip() -> FirmSealResult<()> {
        let data = block_aligned();
        for algorithm in [EncryptionAlgorithm::Aes128, EncryptionAlgorithm::Aes256] {
            let key = EncryptionKey::from_material("round-trip", algorithm)?;
            for mode in [CipherMode::Gcm, CipherMode::Cbc, CipherMode::Ctr] {
                let sealed = encrypt(&data, &key, mode)?;
                assert_eq!(sealed.bytes.len(), data.len() + mode.overhead());
                assert_eq!(sealed.bytes.get(..IV_LEN), Some(&sealed.iv[..]));
                assert_eq!(decrypt(&sealed.bytes, &key, mode)?, data, "{algorithm}-{mode}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_fixed_iv_is_deterministic() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material(HEX_256, EncryptionAlgorithm::Aes256)?;
        let iv = [7u8; IV_LEN];
        let a = encrypt_with_iv(b"same input", &key, CipherMode::Ctr, iv)?;
        let b = encrypt_with_iv(b"same input", &key, CipherMode::Ctr, iv)?;
        assert_eq!(a, b);
        assert_ne!(a.get(IV_LEN..), Some(&b"same input"[..]));
        Ok(())
    }

    #[test]
    fn test_gcm_rejects_tampering() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material(HEX_256, EncryptionAlgorithm::Aes256)?;
        let mut sealed = encrypt(&block_aligned(), &key, CipherMode::Gcm)?.bytes;
        if let Some(byte) = sealed.get_mut(IV_LEN + 3) {
            *byte ^= 0x01;
        }
        let result = decrypt(&sealed, &key, CipherMode::Gcm);
        assert!(matches!(result, Err(FirmSealError::Encryption(_))));
        Ok(())
    }

    #[test]
    fn test_gcm_rejects_wrong_key() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material("right", EncryptionAlgorithm::Aes128)?;
        let other = EncryptionKey::from_material("wrong", EncryptionAlgorithm::Aes128)?;
        let sealed = encrypt(b"payload", &key, CipherMode::Gcm)?;
        assert!(decrypt(&sealed.bytes, &other, CipherMode::Gcm).is_err());
        Ok(())
    }

    #[test]
    fn test_cbc_requires_alignment() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material("k", EncryptionAlgorithm::Aes128)?;
        let result = encrypt(&[0u8; 17], &key, CipherMode::Cbc);
        assert!(matches!(result, Err(FirmSealError::Encryption(_))));
        Ok(())
    }

    #[test]
    fn test_short_input_is_truncated_error() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material("k", EncryptionAlgorithm::Aes128)?;
        let result = decrypt(&[0u8; 20], &key, CipherMode::Gcm);
        assert!(matches!(
            result,
            Err(FirmSealError::Format(FormatError::Truncated { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_debug_hides_key() -> FirmSealResult<()> {
        let key = EncryptionKey::from_material(HEX_256, EncryptionAlgorithm::Aes256)?;
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("bytes"));
        assert!(rendered.contains("Aes256"));
        Ok(())
    }

    #[test]
    fn test_mode_names() {
        assert_eq!("GCM".parse::<CipherMode>().ok(), Some(CipherMode::Gcm));
        let err = "ecb".parse::<CipherMode>().err();
        assert!(err.is_some_and(|e| e.to_string().contains("gcm, cbc, ctr")));
    }
}
