// Licensed under the Apache-2.0 license

//! On-flash image header model for the bee boot ROM.
//!
//! Every bootable image starts with a fixed 1024-byte little-endian header.
//! The OTA descriptor uses the same header and stores the sub-image table
//! in its reserved tail.

#![cfg_attr(target_arch = "arm", no_std)]

mod flags;
mod header;
mod image_id;
mod reserved;

pub use flags::*;
pub use header::*;
pub use image_id::*;
pub use reserved::*;

pub const IMG_HEADER_SIZE: usize = 1024;
pub const OTA_HEADER_SIZE: u32 = 4096;

pub const CMAC_SIZE: usize = 16;
pub const SHA256_SIZE: usize = 32;
pub const UUID_SIZE: usize = 16;
pub const RSA_2048_SIZE: usize = 256;
pub const RSA_3072_SIZE: usize = 384;
pub const RSA_EXPONENT_SIZE: usize = 4;

/// Length in bytes of the RSA modulus and signature for this build.
#[cfg(not(feature = "rsa-3072"))]
pub const RSA_KEY_SIZE: usize = RSA_2048_SIZE;
#[cfg(feature = "rsa-3072")]
pub const RSA_KEY_SIZE: usize = RSA_3072_SIZE;

pub const IMG_IC_TYPE: u8 = 0x10;
pub const IMG_MAGIC_PATTERN: u32 = 0x5A5A_12A5;
pub const FSBL_EXT_PATTERN: u16 = 0x736C;

/// Byte offset of the control header. Everything from here to the end of
/// the header is covered by the image MAC and signature.
pub const CTRL_HEADER_OFFSET: usize = 432;

/// Flash content of an erased or unprogrammed word.
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;
