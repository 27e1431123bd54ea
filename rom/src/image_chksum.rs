// Licensed under the Apache-2.0 license

//! Payload integrity and header authentication.

use bee_config::AuthMode;
use bee_image_header::{ImageHeader, IMG_HEADER_SIZE};
use constant_time_eq::constant_time_eq;
use crc::{Crc, CRC_16_MCRF4XX};
use romtime::HexWord;
use thiserror::Error;

use crate::crypto::{sha256_chunks, CryptoError};
use crate::flash::{FlashDrvError, FlashPartition};
use crate::RomEnv;

/// Reflected CCITT polynomial, initial value 0xFFFF, no final xor.
pub const IMAGE_CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Size of the flash reads feeding the checksum engines.
const CHUNK_SIZE: usize = 256;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Payload outside flash")]
    PayloadRange,
    #[error("Flash read failed: {0:?}")]
    Flash(FlashDrvError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("CRC16 mismatch")]
    CrcMismatch,
    #[error("SHA-256 mismatch")]
    DigestMismatch,
    #[error("Secure version below the provisioned minimum")]
    Rollback,
    #[error("Authentication requires SHA-256 integrity mode")]
    IntegrityMode,
    #[error("Key not provisioned")]
    MissingKey,
    #[error("Public key does not match the pinned hash")]
    KeyMismatch,
    #[error("Image MAC mismatch")]
    MacMismatch,
    #[error("Signature rejected")]
    BadSignature,
}

impl From<FlashDrvError> for VerifyError {
    fn from(err: FlashDrvError) -> Self {
        VerifyError::Flash(err)
    }
}

/// Recomputes the payload checksum of a structurally valid image and
/// compares it with the value recorded in its header.
///
/// Images with `integrity_check_en_in_boot` set carry a SHA-256 of the
/// payload, all others a CRC16.
pub fn check_image_chksum(env: &RomEnv, header_addr: u32, header: &ImageHeader) -> bool {
    match verify_image_chksum(env, header_addr, header) {
        Ok(()) => true,
        Err(err) => {
            romtime::println!(
                "[bee-rom] Checksum of image at {} failed: {}",
                HexWord(header_addr),
                err
            );
            false
        }
    }
}

pub fn verify_image_chksum(
    env: &RomEnv,
    header_addr: u32,
    header: &ImageHeader,
) -> Result<(), VerifyError> {
    let start = header_addr
        .checked_add(IMG_HEADER_SIZE as u32)
        .ok_or(VerifyError::PayloadRange)?;
    let len = header.payload_len();
    let region = env
        .layout
        .region_containing(header_addr, IMG_HEADER_SIZE as u32)
        .ok_or(VerifyError::PayloadRange)?;
    let partition = FlashPartition::new(env.flash, region)?;
    if !partition.contains(start, len) {
        return Err(VerifyError::PayloadRange);
    }

    let mut buf = [0u8; CHUNK_SIZE];
    if header.ctrl_flag().integrity_check_en_in_boot() {
        env.crypto.sha256_start()?;
        partition.read_chunked(start, len, &mut buf, |chunk| {
            env.crypto.sha256_update(chunk).map_err(VerifyError::from)
        })?;
        let digest = env.crypto.sha256_finish()?;
        if !constant_time_eq(&digest, &header.auth.image_hash) {
            return Err(VerifyError::DigestMismatch);
        }
    } else {
        let mut digest = IMAGE_CRC16.digest();
        partition.read_chunked(start, len, &mut buf, |chunk| {
            digest.update(chunk);
            Ok::<(), VerifyError>(())
        })?;
        if digest.finalize() != header.ctrl.crc16.get() {
            return Err(VerifyError::CrcMismatch);
        }
    }
    Ok(())
}

/// Authenticates the header according to the platform auth mode and
/// enforces the anti-rollback floor.
pub fn check_image_auth(env: &RomEnv, header: &ImageHeader) -> bool {
    match verify_image_auth(env, header) {
        Ok(()) => true,
        Err(err) => {
            romtime::println!(
                "[bee-rom] Authentication of image {} failed: {}",
                HexWord(header.image_id() as u32),
                err
            );
            false
        }
    }
}

/// The MAC and the signature both cover the header from the control block
/// to its end, followed by the payload digest.
pub fn verify_image_auth(env: &RomEnv, header: &ImageHeader) -> Result<(), VerifyError> {
    if header.ctrl.secure_version < env.keys.min_secure_version() {
        return Err(VerifyError::Rollback);
    }
    if env.platform.auth_mode == AuthMode::IntegrityOnly {
        return Ok(());
    }
    if !header.ctrl_flag().integrity_check_en_in_boot() {
        return Err(VerifyError::IntegrityMode);
    }
    let signed: [&[u8]; 2] = [header.signed_bytes(), &header.auth.image_hash];

    match env.platform.auth_mode {
        AuthMode::Cmac => {
            let key = env.keys.image_mac_key().ok_or(VerifyError::MissingKey)?;
            let mac = env.crypto.cmac16(&key, &signed)?;
            if !constant_time_eq(&mac, &header.auth.image_mac) {
                return Err(VerifyError::MacMismatch);
            }
        }
        AuthMode::Rsa => {
            let pinned = env.keys.public_key_hash().ok_or(VerifyError::MissingKey)?;
            let key_hash = sha256_chunks(env.crypto, &[header.pub_key.key_material()])?;
            if !constant_time_eq(&key_hash, &pinned) {
                return Err(VerifyError::KeyMismatch);
            }
            let digest = sha256_chunks(env.crypto, &signed)?;
            if !env
                .crypto
                .rsa_verify(&header.pub_key, header.auth.signature(), &digest)?
            {
                return Err(VerifyError::BadSignature);
            }
        }
        AuthMode::IntegrityOnly => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_parameters() {
        // Check value of CRC-16/MCRF4XX.
        assert_eq!(IMAGE_CRC16.checksum(b"123456789"), 0x6F91);
        assert_eq!(IMAGE_CRC16.checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_chunked_matches_one_shot() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 7) as u8).collect();
        let mut digest = IMAGE_CRC16.digest();
        for chunk in data.chunks(CHUNK_SIZE) {
            digest.update(chunk);
        }
        assert_eq!(digest.finalize(), IMAGE_CRC16.checksum(&data));
    }
}
