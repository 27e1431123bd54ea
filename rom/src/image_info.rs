// Licensed under the Apache-2.0 license

//! Locating images in the active and temporary OTA banks.
//!
//! Every lookup returns 0 when the image cannot be located. An erased
//! (all ones) table entry also reads as 0.

use core::mem::{offset_of, size_of};

use bee_config::flash::FlashBank;
use bee_image_header::{
    ImageHeader, ImageId, ImageTableEntry, ImageVersion, OtaImageTable, ERASED_WORD,
    OTA_HEADER_SIZE,
};
use romtime::HexWord;
use zerocopy::IntoBytes;

use crate::image_check::check_header_valid;
use crate::RomEnv;

fn normalize(value: u32) -> u32 {
    if value == ERASED_WORD {
        0
    } else {
        value
    }
}

pub fn is_ota_support_bank_switch(env: &RomEnv) -> bool {
    env.layout.supports_bank_switch()
}

/// Start address of the bank the device currently boots from, 0 when the
/// persisted selector cannot be read.
pub fn get_active_ota_bank_addr(env: &RomEnv) -> u32 {
    if !is_ota_support_bank_switch(env) {
        return env.layout.get_bank_addr(FlashBank::OtaBank0);
    }
    match env.bank_store.get_active_bank() {
        Ok(bank) => env.layout.get_bank_addr(bank.into()),
        Err(err) => {
            romtime::println!("[bee-rom] Active bank unavailable: {:?}", err);
            0
        }
    }
}

fn read_table_entry(env: &RomEnv, ota_addr: u32, image_id: ImageId) -> Option<ImageTableEntry> {
    let index = image_id.table_index()?;
    let offset = offset_of!(ImageHeader, reserved)
        + offset_of!(OtaImageTable, image_info)
        + index * size_of::<ImageTableEntry>();
    let addr = ota_addr.checked_add(offset as u32)?;
    let mut entry = ImageTableEntry::default();
    env.flash.read(entry.as_mut_bytes(), addr).ok()?;
    Some(entry)
}

/// Raw table address of `image_id` in the descriptor at `ota_addr`. The
/// descriptor is not validated.
pub fn get_image_addr_in_bank(env: &RomEnv, ota_addr: u32, image_id: ImageId) -> Option<u32> {
    read_table_entry(env, ota_addr, image_id).map(|entry| entry.addr.get())
}

/// Raw table size of `image_id` in the descriptor at `ota_addr`. The
/// descriptor is not validated.
pub fn get_image_size_in_bank(env: &RomEnv, ota_addr: u32, image_id: ImageId) -> Option<u32> {
    read_table_entry(env, ota_addr, image_id).map(|entry| entry.size.get())
}

/// Table entry of `image_id` from the descriptor at `ota_addr`, provided
/// the descriptor passes the structural check.
fn validated_entry(env: &RomEnv, ota_addr: u32, image_id: ImageId) -> Option<ImageTableEntry> {
    let descriptor = check_header_valid(env, ota_addr, ImageId::Ota).ok()?;
    descriptor.ota_table()?.entry(image_id).copied()
}

/// Header address of `image_id` in the active bank.
pub fn get_header_addr_by_img_id(env: &RomEnv, image_id: ImageId) -> u32 {
    if !image_id.in_ota_range() {
        return 0;
    }
    let ota_addr = get_active_ota_bank_addr(env);
    if ota_addr == 0 {
        return 0;
    }
    let addr = if image_id == ImageId::Ota {
        ota_addr
    } else {
        validated_entry(env, ota_addr, image_id).map_or(0, |entry| entry.addr.get())
    };
    normalize(addr)
}

/// Size of `image_id` in the active bank, header included.
pub fn get_active_bank_image_size_by_img_id(env: &RomEnv, image_id: ImageId) -> u32 {
    if !image_id.in_ota_range() {
        return 0;
    }
    if image_id == ImageId::Ota {
        return OTA_HEADER_SIZE;
    }
    let ota_addr = get_active_ota_bank_addr(env);
    if ota_addr == 0 {
        return 0;
    }
    normalize(validated_entry(env, ota_addr, image_id).map_or(0, |entry| entry.size.get()))
}

/// The bank that is not active. Without a readable selector bank 0 counts
/// as inactive.
fn temp_ota_bank_addr(env: &RomEnv) -> u32 {
    match env.bank_store.get_active_bank() {
        Ok(active) => env.layout.get_bank_addr(active.other().into()),
        Err(_) => env.layout.get_bank_addr(FlashBank::OtaBank0),
    }
}

/// Where an update of `image_id` is staged.
///
/// Without bank switching every sub-image is staged at the start of the
/// temporary area and the OTA descriptor has no staging slot. With bank
/// switching the inactive bank is used and sub-images are looked up in its
/// descriptor.
pub fn get_temp_ota_bank_addr_by_img_id(env: &RomEnv, image_id: ImageId) -> u32 {
    if !image_id.in_ota_range() {
        return 0;
    }
    let addr = if !is_ota_support_bank_switch(env) {
        if image_id == ImageId::Ota {
            return 0;
        }
        env.layout.get_bank_addr(FlashBank::OtaTmp)
    } else {
        let temp_bank = temp_ota_bank_addr(env);
        if image_id == ImageId::Ota {
            temp_bank
        } else {
            match validated_entry(env, temp_bank, image_id) {
                Some(entry) => entry.addr.get(),
                None => return 0,
            }
        }
    };
    normalize(addr)
}

/// Room available for staging `image_id`, mirroring
/// `get_temp_ota_bank_addr_by_img_id`. The descriptor itself always gets
/// `OTA_HEADER_SIZE`, whatever the inactive bank currently holds.
pub fn get_temp_ota_bank_size_by_img_id(env: &RomEnv, image_id: ImageId) -> u32 {
    if !image_id.in_ota_range() {
        return 0;
    }
    let size = if !is_ota_support_bank_switch(env) {
        if image_id == ImageId::Ota {
            return 0;
        }
        env.layout.get_bank_size(FlashBank::OtaTmp)
    } else if image_id == ImageId::Ota {
        OTA_HEADER_SIZE
    } else {
        let temp_bank = temp_ota_bank_addr(env);
        match validated_entry(env, temp_bank, image_id) {
            Some(entry) => entry.size.get(),
            None => return 0,
        }
    };
    normalize(size)
}

/// Version of `image_id` as recorded in its header in the active bank.
pub fn get_active_bank_image_version(env: &RomEnv, image_id: ImageId) -> Option<ImageVersion> {
    let addr = get_header_addr_by_img_id(env, image_id);
    if addr == 0 {
        return None;
    }
    let header = check_header_valid(env, addr, image_id).ok()?;
    let version = header.image_version();
    romtime::println!(
        "[bee-rom] {:?} at {} version {}",
        image_id,
        HexWord(addr),
        version
    );
    Some(version)
}
