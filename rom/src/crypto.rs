// Licensed under the Apache-2.0 license

//! Crypto engine and key material consumed by image verification.

use bee_image_header::{RsaPublicKey, CMAC_SIZE, SHA256_SIZE};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Crypto engine busy")]
    Busy,
    #[error("Crypto engine fault")]
    EngineFault,
    #[error("Key not supported by the engine")]
    UnsupportedKey,
}

/// Hardware SHA-256, AES-CMAC and RSA engines.
///
/// The SHA-256 interface is incremental so the payload can be streamed out
/// of flash without buffering it. Every call blocks until the engine is
/// done.
pub trait CryptoEngine {
    fn sha256_start(&self) -> Result<(), CryptoError>;

    fn sha256_update(&self, data: &[u8]) -> Result<(), CryptoError>;

    fn sha256_finish(&self) -> Result<[u8; SHA256_SIZE], CryptoError>;

    /// AES-CMAC over the concatenation of `chunks`.
    fn cmac16(&self, key: &[u8; CMAC_SIZE], chunks: &[&[u8]]) -> Result<[u8; CMAC_SIZE], CryptoError>;

    /// Returns `Ok(false)` for a well-formed signature that does not match.
    fn rsa_verify(
        &self,
        public_key: &RsaPublicKey,
        signature: &[u8],
        digest: &[u8; SHA256_SIZE],
    ) -> Result<bool, CryptoError>;
}

/// Provisioned secrets and policy values, typically backed by eFuse/OTP.
pub trait KeyStore {
    fn image_mac_key(&self) -> Option<[u8; CMAC_SIZE]>;

    /// SHA-256 of the trusted public key (modulus then exponent).
    fn public_key_hash(&self) -> Option<[u8; SHA256_SIZE]>;

    /// Lowest `secure_version` an image may carry.
    fn min_secure_version(&self) -> u8;
}

/// One-shot SHA-256 over the concatenation of `chunks`.
pub fn sha256_chunks(
    crypto: &dyn CryptoEngine,
    chunks: &[&[u8]],
) -> Result<[u8; SHA256_SIZE], CryptoError> {
    crypto.sha256_start()?;
    for chunk in chunks {
        crypto.sha256_update(chunk)?;
    }
    crypto.sha256_finish()
}
