/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Common libraries for the bee boot ROM: image header checks, payload
    verification and OTA bank resolution.

--*/

#![cfg_attr(target_arch = "arm", no_std)]

pub mod boot_image;
pub use boot_image::*;
pub mod crypto;
pub use crypto::{CryptoEngine, CryptoError, KeyStore};
pub mod flash;
pub use flash::*;
pub mod image_check;
pub use image_check::*;
pub mod image_chksum;
pub use image_chksum::*;
pub mod image_info;
pub use image_info::*;
mod rom_env;
pub use rom_env::*;

pub use bee_config::boot::{record_boot_stage, BootStage};
