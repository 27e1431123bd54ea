// Licensed under the Apache-2.0 license

use bitfield::bitfield;
use core::mem::size_of;

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{ImageId, ERASED_WORD, FSBL_EXT_PATTERN, OTA_TABLE_ENTRIES, RESERVED_SIZE};

/// Location of one sub-image inside an OTA bank. `addr` is an absolute
/// flash address, `size` covers header and payload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ImageTableEntry {
    pub addr: U32,
    pub size: U32,
}

impl ImageTableEntry {
    pub fn is_erased(&self) -> bool {
        self.addr.get() == ERASED_WORD
    }
}

/// Reserved tail of the OTA descriptor.
#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct OtaImageTable {
    pub ver_val: U32,
    pub image_info: [ImageTableEntry; OTA_TABLE_ENTRIES],
}

impl OtaImageTable {
    pub fn entry(&self, id: ImageId) -> Option<&ImageTableEntry> {
        self.image_info.get(id.table_index()?)
    }

    pub fn entry_mut(&mut self, id: ImageId) -> Option<&mut ImageTableEntry> {
        self.image_info.get_mut(id.table_index()?)
    }
}

bitfield! {
    /// Control word of the flash security zone.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct FlashSecCtrl(u32);
    impl Debug;
    pub enable, set_enable: 0;
    pub u8, mode, set_mode: 2, 1;
    pub u8, key_select, set_key_select: 5, 3;
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FlashSecFormat {
    pub ctrl: U32,
    pub base_addr: U32,
    pub region_size: U32,
    pub iv_high: [u8; 4],
    pub iv_low: [u8; 4],
}

impl FlashSecFormat {
    pub fn ctrl(&self) -> FlashSecCtrl {
        FlashSecCtrl(self.ctrl.get())
    }
}

/// Reserved tail of an image built for a platform with the first-stage
/// loader extension.
#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FsblExtension {
    pub tool_version: U16,
    pub timestamp: U32,
    pub flash_sec_cfg: FlashSecFormat,
    pub fsbl_ext_img_id: U16,
    pub fsbl_ext_load_pattern: U16,
    pub reserved1: [u8; 62],
}

impl FsblExtension {
    pub fn is_present(&self) -> bool {
        self.fsbl_ext_load_pattern.get() == FSBL_EXT_PATTERN
    }
}

const _: () = assert!(size_of::<OtaImageTable>() == RESERVED_SIZE);
const _: () = assert!(size_of::<FsblExtension>() == RESERVED_SIZE);

/// The single valid interpretation of a header's reserved tail.
#[derive(Debug)]
pub enum ReservedRegion<'a> {
    Plain(&'a [u8; RESERVED_SIZE]),
    ImageTable(&'a OtaImageTable),
    FsblExtension(&'a FsblExtension),
}
