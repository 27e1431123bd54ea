// Licensed under the Apache-2.0 license

//! Structural checks on image headers and the ROM handoff contract.

use core::ops::Range;

use bee_config::flash::FlashRegion;
use bee_image_header::{
    ImageHeader, ImageId, RomHeader, ERASED_WORD, IMG_HEADER_SIZE, IMG_MAGIC_PATTERN,
    OTA_HEADER_SIZE, ROM_HEADER_SIZE,
};
use romtime::HexWord;
use thiserror::Error;
use zerocopy::{FromZeros, IntoBytes};

use crate::flash::FlashPartition;
use crate::RomEnv;

/// Value reported for a passing check where a numeric status is expected.
pub const IMG_CHECK_PASS: u32 = 0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ImageCheckError {
    #[error("Invalid image header address")]
    HeaderAddr = 1,
    #[error("Image not ready")]
    NotReady = 2,
    #[error("ROM UUID mismatch")]
    RomUuid = 3,
    #[error("Magic pattern mismatch")]
    MagicPattern = 4,
    #[error("Image does not fit its slot")]
    Size = 5,
    #[error("Image id mismatch")]
    Id = 6,
    #[error("Entry point outside the execution region")]
    EntryReturn = 7,
    #[error("Image verification failed")]
    Verify = 8,
    #[error("Invalid execution base")]
    ExeBase = 9,
    #[error("IC type mismatch")]
    IcType = 10,
}

impl ImageCheckError {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<ImageCheckError> for u32 {
    fn from(err: ImageCheckError) -> u32 {
        err.code()
    }
}

/// Numeric status of a check, `IMG_CHECK_PASS` on success.
pub fn check_result_code<T>(result: &Result<T, ImageCheckError>) -> u32 {
    match result {
        Ok(_) => IMG_CHECK_PASS,
        Err(err) => err.code(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HeaderRole {
    Active,
    Candidate,
}

/// Reads the header at `addr` after sanity checking the address.
///
/// The address must be non-zero, not erased, aligned for the platform and
/// the whole header must sit inside one configured flash region.
pub fn read_header(env: &RomEnv, addr: u32) -> Result<ImageHeader, ImageCheckError> {
    read_header_in_region(env, addr).map(|(header, _)| header)
}

fn read_header_in_region<'a>(
    env: &RomEnv<'a>,
    addr: u32,
) -> Result<(ImageHeader, &'a FlashRegion), ImageCheckError> {
    let align = env.platform.header_align;
    if addr == 0 || addr == ERASED_WORD || (align != 0 && addr % align != 0) {
        return Err(ImageCheckError::HeaderAddr);
    }
    let region = env
        .layout
        .region_containing(addr, IMG_HEADER_SIZE as u32)
        .ok_or(ImageCheckError::HeaderAddr)?;
    let partition =
        FlashPartition::new(env.flash, region).map_err(|_| ImageCheckError::HeaderAddr)?;
    let mut header = ImageHeader::new_zeroed();
    partition
        .read(addr, header.as_mut_bytes())
        .map_err(|_| ImageCheckError::HeaderAddr)?;
    Ok((header, region))
}

/// Structural check of the header at `header_addr` against the expected
/// image id. Checks run in a fixed order and the first failure is
/// returned. On success the parsed header is handed back so later stages
/// do not read it again.
pub fn check_header_valid(
    env: &RomEnv,
    header_addr: u32,
    image_id: ImageId,
) -> Result<ImageHeader, ImageCheckError> {
    check_header(env, header_addr, image_id, HeaderRole::Active).inspect_err(|err| {
        romtime::println!(
            "[bee-rom] Header check of {:?} at {} failed: {}",
            image_id,
            HexWord(header_addr),
            err
        );
    })
}

/// Same as `check_header_valid` for an image that has been downloaded but
/// not committed yet. Such an image must also still be marked current.
pub fn check_candidate_header_valid(
    env: &RomEnv,
    header_addr: u32,
    image_id: ImageId,
) -> Result<ImageHeader, ImageCheckError> {
    check_header(env, header_addr, image_id, HeaderRole::Candidate).inspect_err(|err| {
        romtime::println!(
            "[bee-rom] Candidate check of {:?} at {} failed: {}",
            image_id,
            HexWord(header_addr),
            err
        );
    })
}

fn check_header(
    env: &RomEnv,
    header_addr: u32,
    image_id: ImageId,
    role: HeaderRole,
) -> Result<ImageHeader, ImageCheckError> {
    let (header, region) = read_header_in_region(env, header_addr)?;
    let flag = header.ctrl_flag();

    // Compressed images carry a second pair of copy-state bits for the
    // decompressed result.
    let compressed = header.is_compressed();
    if flag.not_ready() || (compressed && flag.compressed_not_ready()) {
        return Err(ImageCheckError::NotReady);
    }
    if role == HeaderRole::Candidate
        && (!flag.not_obsolete() || (compressed && !flag.compressed_not_obsolete()))
    {
        return Err(ImageCheckError::NotReady);
    }
    if header.magic_pattern.get() != IMG_MAGIC_PATTERN {
        return Err(ImageCheckError::MagicPattern);
    }
    if header.ctrl.ic_type != env.platform.ic_type {
        return Err(ImageCheckError::IcType);
    }
    if env.platform.is_chained(image_id) && header.uuid != env.platform.rom_uuid {
        return Err(ImageCheckError::RomUuid);
    }
    if header.image_id() != image_id as u16 {
        return Err(ImageCheckError::Id);
    }

    let total = header.total_len().ok_or(ImageCheckError::Size)?;
    if total > slot_size(env, header_addr, image_id, region)? {
        return Err(ImageCheckError::Size);
    }
    Ok(header)
}

/// Room available to an image starting at `header_addr`.
///
/// The OTA descriptor owns a fixed slot. Images in the temporary area may
/// extend to its end. Sub-images of an OTA bank are further bounded by the
/// size recorded in that bank's descriptor; an erased entry means the bank
/// does not hold the image at all.
fn slot_size(
    env: &RomEnv,
    header_addr: u32,
    image_id: ImageId,
    region: &FlashRegion,
) -> Result<u32, ImageCheckError> {
    let room = region.end() - header_addr;
    if image_id == ImageId::Ota {
        return Ok(room.min(OTA_HEADER_SIZE));
    }
    if *region == env.layout.ota_tmp || image_id.table_index().is_none() {
        return Ok(room);
    }
    let Ok(descriptor) = check_header(env, region.base, ImageId::Ota, HeaderRole::Active) else {
        return Ok(room);
    };
    match descriptor.ota_table().and_then(|table| table.entry(image_id)) {
        Some(entry) if !entry.is_erased() && entry.size.get() != 0 => {
            Ok(room.min(entry.size.get()))
        }
        _ => Err(ImageCheckError::Size),
    }
}

/// Checks that a chained image executes from its own payload.
///
/// XIP images run from `exe_base` to the end of the payload, so `exe_base`
/// must lie inside the payload. Loaded images are copied from
/// `[load_src, load_src + load_len)`, which must lie inside the payload as
/// well. Either way the source has to hold at least the handoff block.
pub fn check_exec_source(header: &ImageHeader, header_addr: u32) -> Result<(), ImageCheckError> {
    let payload_start = header_addr
        .checked_add(IMG_HEADER_SIZE as u32)
        .ok_or(ImageCheckError::ExeBase)?;
    let payload_end = payload_start
        .checked_add(header.payload_len())
        .ok_or(ImageCheckError::ExeBase)?;
    let (start, len) = if header.ctrl_flag().xip() {
        let start = header.exe_base.get();
        let len = payload_end
            .checked_sub(start)
            .ok_or(ImageCheckError::ExeBase)?;
        (start, len)
    } else {
        (header.load_src.get(), header.load_len.get())
    };
    let end = start.checked_add(len).ok_or(ImageCheckError::ExeBase)?;
    if start < payload_start || end > payload_end || len < ROM_HEADER_SIZE as u32 {
        return Err(ImageCheckError::ExeBase);
    }
    Ok(())
}

/// Validates the handoff block of a chained image.
///
/// `rom_header` is the block found at the start of the image's execution
/// region and `exec_region` the window the image runs from. Both entry
/// pointers may carry the Thumb bit.
pub fn image_entry_check(
    rom_header: &RomHeader,
    patch_header: &ImageHeader,
    exec_region: Option<Range<u32>>,
) -> Result<(), ImageCheckError> {
    let Some(region) = exec_region else {
        return Err(ImageCheckError::ExeBase);
    };
    if rom_header.uuid != patch_header.uuid {
        return Err(ImageCheckError::ExeBase);
    }
    for ptr in [rom_header.init_ptr.get(), rom_header.entry_ptr.get()] {
        if ptr == 0 || !region.contains(&(ptr & !1)) {
            return Err(ImageCheckError::EntryReturn);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_image_header::CtrlFlag;

    const UUID: [u8; 16] = [0x5A; 16];

    fn patch_header() -> ImageHeader {
        let mut header = ImageHeader::new_zeroed();
        header.uuid = UUID;
        header.load_dst = 0x0020_0000.into();
        header.load_len = 0x1000.into();
        header
    }

    fn rom_header(init: u32, entry: u32) -> RomHeader {
        RomHeader {
            uuid: UUID,
            init_ptr: init.into(),
            entry_ptr: entry.into(),
        }
    }

    #[test]
    fn test_entry_check_pass() {
        let header = patch_header();
        let region = header.exec_region(0x0080_4000);
        assert_eq!(
            image_entry_check(&rom_header(0x0020_0019, 0x0020_0101), &header, region),
            Ok(())
        );
    }

    #[test]
    fn test_entry_check_pointer_outside_window() {
        let header = patch_header();
        let region = header.exec_region(0x0080_4000);
        assert_eq!(
            image_entry_check(&rom_header(0x0020_1001, 0x0020_0101), &header, region.clone()),
            Err(ImageCheckError::EntryReturn)
        );
        assert_eq!(
            image_entry_check(&rom_header(0x0020_0019, 0x001F_FFFF), &header, region.clone()),
            Err(ImageCheckError::EntryReturn)
        );
        assert_eq!(
            image_entry_check(&rom_header(0, 0x0020_0101), &header, region),
            Err(ImageCheckError::EntryReturn)
        );
    }

    #[test]
    fn test_entry_check_thumb_bit_at_window_end() {
        let header = patch_header();
        let region = header.exec_region(0x0080_4000);
        // 0x0020_1000 | 1 still points one past the window once masked.
        assert_eq!(
            image_entry_check(&rom_header(0x0020_1001, 0x0020_0FFF), &header, region.clone()),
            Err(ImageCheckError::EntryReturn)
        );
        assert_eq!(
            image_entry_check(&rom_header(0x0020_0FFF, 0x0020_0FFF), &header, region),
            Ok(())
        );
    }

    #[test]
    fn test_entry_check_uuid_and_region() {
        let header = patch_header();
        let mut bad = rom_header(0x0020_0019, 0x0020_0101);
        bad.uuid[0] ^= 0xFF;
        assert_eq!(
            image_entry_check(&bad, &header, header.exec_region(0x0080_4000)),
            Err(ImageCheckError::ExeBase)
        );
        assert_eq!(
            image_entry_check(&rom_header(0x0020_0019, 0x0020_0101), &header, None),
            Err(ImageCheckError::ExeBase)
        );
    }

    #[test]
    fn test_entry_check_xip_window() {
        let mut header = patch_header();
        let mut flag = CtrlFlag::default();
        flag.set_xip(true);
        header.ctrl.set_ctrl_flag(flag);
        header.exe_base = 0x0080_4400.into();
        header.ctrl.payload_len = 0x800.into();
        let region = header.exec_region(0x0080_4000);
        assert_eq!(
            image_entry_check(&rom_header(0x0080_4419, 0x0080_4BF1), &header, region.clone()),
            Ok(())
        );
        // The load window is ignored for XIP images.
        assert_eq!(
            image_entry_check(&rom_header(0x0020_0019, 0x0080_4BF1), &header, region),
            Err(ImageCheckError::EntryReturn)
        );
    }

    fn chained_header(payload_len: u32) -> ImageHeader {
        let mut header = patch_header();
        header.ctrl.payload_len = payload_len.into();
        header
    }

    const ADDR: u32 = 0x0080_4000;
    const PAYLOAD: u32 = ADDR + IMG_HEADER_SIZE as u32;

    #[test]
    fn test_exec_source_xip() {
        let mut header = chained_header(0x800);
        let mut flag = CtrlFlag::default();
        flag.set_xip(true);
        header.ctrl.set_ctrl_flag(flag);

        for (exe_base, expected) in [
            (PAYLOAD, Ok(())),
            (PAYLOAD + 0x800 - ROM_HEADER_SIZE as u32, Ok(())),
            (PAYLOAD - 4, Err(ImageCheckError::ExeBase)),
            (ADDR - 0x800, Err(ImageCheckError::ExeBase)),
            (PAYLOAD + 0x800 - 4, Err(ImageCheckError::ExeBase)),
            (PAYLOAD + 0x1000, Err(ImageCheckError::ExeBase)),
        ] {
            header.exe_base = exe_base.into();
            assert_eq!(
                check_exec_source(&header, ADDR),
                expected,
                "exe_base {exe_base:#x}"
            );
        }
    }

    #[test]
    fn test_exec_source_load() {
        let mut header = chained_header(0x800);
        for (load_src, load_len, expected) in [
            (PAYLOAD, 0x800, Ok(())),
            (PAYLOAD + 0x100, 0x100, Ok(())),
            (ADDR - 0x800, 0x100, Err(ImageCheckError::ExeBase)),
            (PAYLOAD + 0x10, 0x800, Err(ImageCheckError::ExeBase)),
            (PAYLOAD, 0x10, Err(ImageCheckError::ExeBase)),
            (u32::MAX - 0x10, 0x100, Err(ImageCheckError::ExeBase)),
        ] {
            header.load_src = load_src.into();
            header.load_len = load_len.into();
            assert_eq!(
                check_exec_source(&header, ADDR),
                expected,
                "load_src {load_src:#x} load_len {load_len:#x}"
            );
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ImageCheckError::HeaderAddr.code(), 1);
        assert_eq!(ImageCheckError::Verify.code(), 8);
        assert_eq!(u32::from(ImageCheckError::IcType), 10);
        assert_eq!(check_result_code(&Ok::<(), _>(())), IMG_CHECK_PASS);
        assert_eq!(check_result_code::<()>(&Err(ImageCheckError::Size)), 5);
    }
}
