// Licensed under the Apache-2.0 license

use std::cell::RefCell;

use bee_image_gen::ImageSigner;
use bee_image_header::{
    ImageHeader, RsaPublicKey, CMAC_SIZE, RSA_3072_SIZE, RSA_EXPONENT_SIZE, RSA_KEY_SIZE,
    SHA256_SIZE,
};
use bee_rom_common::crypto::{CryptoEngine, CryptoError, KeyStore};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

fn sha256(chunks: &[&[u8]]) -> [u8; SHA256_SIZE] {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// Software engine. The MAC is HMAC-SHA256 truncated to 16 bytes and an
/// RSA signature is accepted when its leading 32 bytes are the SHA-256 of
/// modulus and digest. Both only need to agree with `FakeSigner`.
#[derive(Default)]
pub struct SoftCrypto {
    sha: RefCell<Option<Sha256>>,
}

pub fn soft_mac(key: &[u8; CMAC_SIZE], chunks: &[&[u8]]) -> [u8; CMAC_SIZE] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    for chunk in chunks {
        mac.update(chunk);
    }
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; CMAC_SIZE];
    out.copy_from_slice(&tag[..CMAC_SIZE]);
    out
}

pub fn soft_signature(public_key: &RsaPublicKey, digest: &[u8; SHA256_SIZE]) -> [u8; SHA256_SIZE] {
    sha256(&[public_key.modulus(), digest.as_slice()])
}

impl CryptoEngine for SoftCrypto {
    fn sha256_start(&self) -> Result<(), CryptoError> {
        let mut sha = self.sha.borrow_mut();
        if sha.is_some() {
            return Err(CryptoError::Busy);
        }
        *sha = Some(Sha256::new());
        Ok(())
    }

    fn sha256_update(&self, data: &[u8]) -> Result<(), CryptoError> {
        self.sha
            .borrow_mut()
            .as_mut()
            .ok_or(CryptoError::EngineFault)?
            .update(data);
        Ok(())
    }

    fn sha256_finish(&self) -> Result<[u8; SHA256_SIZE], CryptoError> {
        let sha = self.sha.borrow_mut().take().ok_or(CryptoError::EngineFault)?;
        Ok(sha.finalize().into())
    }

    fn cmac16(
        &self,
        key: &[u8; CMAC_SIZE],
        chunks: &[&[u8]],
    ) -> Result<[u8; CMAC_SIZE], CryptoError> {
        Ok(soft_mac(key, chunks))
    }

    fn rsa_verify(
        &self,
        public_key: &RsaPublicKey,
        signature: &[u8],
        digest: &[u8; SHA256_SIZE],
    ) -> Result<bool, CryptoError> {
        if signature.len() != RSA_KEY_SIZE {
            return Err(CryptoError::UnsupportedKey);
        }
        Ok(signature[..SHA256_SIZE] == soft_signature(public_key, digest))
    }
}

pub const TEST_MAC_KEY: [u8; CMAC_SIZE] = [
    0x2B, 0x7E, 0x15, 0x16, 0x28, 0xAE, 0xD2, 0xA6, 0xAB, 0xF7, 0x15, 0x88, 0x09, 0xCF, 0x4F, 0x3C,
];

/// Deterministic public key used by the signing tests.
pub fn test_public_key() -> RsaPublicKey {
    let mut key = RsaPublicKey([0; RSA_3072_SIZE + RSA_EXPONENT_SIZE]);
    for (i, byte) in key.0.iter_mut().enumerate() {
        *byte = (i as u8).wrapping_mul(31).wrapping_add(7);
    }
    key
}

/// SHA-256 of the key material, the value provisioned in eFuse.
pub fn public_key_hash(key: &RsaPublicKey) -> [u8; SHA256_SIZE] {
    sha256(&[key.key_material()])
}

/// Provisioned secrets. Defaults to the test MAC key, the test public key
/// and no rollback floor.
pub struct FakeKeys {
    pub mac_key: Option<[u8; CMAC_SIZE]>,
    pub pub_key_hash: Option<[u8; SHA256_SIZE]>,
    pub min_secure_version: u8,
}

impl Default for FakeKeys {
    fn default() -> Self {
        FakeKeys {
            mac_key: Some(TEST_MAC_KEY),
            pub_key_hash: Some(public_key_hash(&test_public_key())),
            min_secure_version: 0,
        }
    }
}

impl KeyStore for FakeKeys {
    fn image_mac_key(&self) -> Option<[u8; CMAC_SIZE]> {
        self.mac_key
    }

    fn public_key_hash(&self) -> Option<[u8; SHA256_SIZE]> {
        self.pub_key_hash
    }

    fn min_secure_version(&self) -> u8 {
        self.min_secure_version
    }
}

/// Produces headers `SoftCrypto` accepts.
pub enum FakeSigner {
    Mac([u8; CMAC_SIZE]),
    Rsa(RsaPublicKey),
}

impl FakeSigner {
    pub fn mac() -> Self {
        FakeSigner::Mac(TEST_MAC_KEY)
    }

    pub fn rsa() -> Self {
        FakeSigner::Rsa(test_public_key())
    }
}

impl ImageSigner for FakeSigner {
    fn sign(&self, header: &mut ImageHeader) {
        match self {
            FakeSigner::Mac(key) => {
                let signed: [&[u8]; 2] = [header.signed_bytes(), &header.auth.image_hash];
                header.auth.image_mac = soft_mac(key, &signed);
            }
            FakeSigner::Rsa(key) => {
                // The key sits inside the signed region.
                header.pub_key = key.clone();
                let signed: [&[u8]; 2] = [header.signed_bytes(), &header.auth.image_hash];
                let signature = soft_signature(key, &sha256(&signed));
                header.auth.signature[..SHA256_SIZE].copy_from_slice(&signature);
            }
        }
    }
}
