// Licensed under the Apache-2.0 license

#![cfg_attr(target_arch = "arm", no_std)]

pub mod boot;
pub mod flash;

use bee_image_header::{ImageId, IMG_IC_TYPE, UUID_SIZE};

/// How strongly the ROM authenticates an image beyond its integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// CRC16 or SHA-256 over the payload only.
    IntegrityOnly,
    /// AES-CMAC over the signed header region with the provisioned key.
    Cmac,
    /// RSA signature with a public key pinned by hash.
    Rsa,
}

/// Chip parameters the boot ROM validates images against.
/// These are the defaults for the reference part and can be overridden per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub ic_type: u8,
    /// Required alignment of an image header address in flash.
    pub header_align: u32,
    /// UUID burned into the mask ROM. Chained images must carry the same value.
    pub rom_uuid: [u8; UUID_SIZE],
    /// Images that hand off to the ROM through a `RomHeader`.
    pub chained_images: &'static [ImageId],
    pub auth_mode: AuthMode,
}

pub const DEFAULT_ROM_UUID: [u8; UUID_SIZE] = [
    0x52, 0x54, 0x4B, 0x42, 0x45, 0x45, 0x87, 0x52, 0xA1, 0x3C, 0x6E, 0x0D, 0x5B, 0x22, 0x19, 0xF4,
];

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            ic_type: IMG_IC_TYPE,
            header_align: 4,
            rom_uuid: DEFAULT_ROM_UUID,
            chained_images: &[ImageId::RomPatch, ImageId::AppPatch],
            auth_mode: AuthMode::IntegrityOnly,
        }
    }
}

impl PlatformConfig {
    pub fn is_chained(&self, id: ImageId) -> bool {
        self.chained_images.contains(&id)
    }
}
