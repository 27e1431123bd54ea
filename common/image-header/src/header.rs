// Licensed under the Apache-2.0 license

use core::mem::{offset_of, size_of};
use core::ops::Range;

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{transmute_mut, transmute_ref};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{
    CtrlFlag, FsblExtension, HeaderSubVersion, ImageId, ImageSubVersion, ImageType, ImageVersion,
    OtaImageTable, ReservedRegion, CMAC_SIZE, CTRL_HEADER_OFFSET, IMG_HEADER_SIZE,
    RSA_3072_SIZE, RSA_EXPONENT_SIZE, RSA_KEY_SIZE, SHA256_SIZE, UUID_SIZE,
};

pub const RESERVED_SIZE: usize = 92;

#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct AuthHeader {
    pub image_mac: [u8; CMAC_SIZE],
    pub signature: [u8; RSA_3072_SIZE],
    pub image_hash: [u8; SHA256_SIZE],
}

impl AuthHeader {
    /// Signature bytes meaningful for the configured key class.
    pub fn signature(&self) -> &[u8] {
        &self.signature[..RSA_KEY_SIZE]
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct CtrlHeader {
    pub crc16: U16,
    pub ic_type: u8,
    pub secure_version: u8,
    pub ctrl_flag: U16,
    pub image_id: U16,
    pub payload_len: U32,
}

impl CtrlHeader {
    pub fn ctrl_flag(&self) -> CtrlFlag {
        CtrlFlag::from(self.ctrl_flag.get())
    }

    pub fn set_ctrl_flag(&mut self, flag: CtrlFlag) {
        self.ctrl_flag = u16::from(flag).into();
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct VersionFormat {
    pub ver: U32,
    pub commit_id: U32,
    pub customer_name: [u8; 8],
}

/// RSA public key blob: modulus followed by the public exponent. For
/// RSA-2048 the exponent sits right after the 256-byte modulus and the
/// tail is unused.
#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RsaPublicKey(pub [u8; RSA_3072_SIZE + RSA_EXPONENT_SIZE]);

impl RsaPublicKey {
    pub fn modulus(&self) -> &[u8] {
        &self.0[..RSA_KEY_SIZE]
    }

    pub fn exponent(&self) -> &[u8] {
        &self.0[RSA_KEY_SIZE..RSA_KEY_SIZE + RSA_EXPONENT_SIZE]
    }

    /// Bytes that identify the key: modulus then exponent.
    pub fn key_material(&self) -> &[u8] {
        &self.0[..RSA_KEY_SIZE + RSA_EXPONENT_SIZE]
    }
}

#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ImageHeader {
    pub auth: AuthHeader,
    pub ctrl: CtrlHeader,
    pub uuid: [u8; UUID_SIZE],
    pub exe_base: U32,
    pub load_src: U32,
    pub load_len: U32,
    pub image_base: U32,
    pub dev_id: U16,
    pub flash_layout_size_4k: U16,
    pub magic_pattern: U32,
    pub dec_key: [u8; 16],
    pub load_dst: U32,
    pub ex_info: [u8; 24],
    pub git_ver: VersionFormat,
    pub pub_key: RsaPublicKey,
    pub reserved: [u8; RESERVED_SIZE],
}

const _: () = assert!(size_of::<ImageHeader>() == IMG_HEADER_SIZE);
const _: () = assert!(offset_of!(ImageHeader, ctrl) == CTRL_HEADER_OFFSET);
const _: () = assert!(offset_of!(ImageHeader, reserved) == IMG_HEADER_SIZE - RESERVED_SIZE);

impl ImageHeader {
    pub fn ctrl_flag(&self) -> CtrlFlag {
        self.ctrl.ctrl_flag()
    }

    pub fn image_id(&self) -> u16 {
        self.ctrl.image_id.get()
    }

    pub fn payload_len(&self) -> u32 {
        self.ctrl.payload_len.get()
    }

    /// Header plus payload length, `None` when it does not fit in 32 bits.
    pub fn total_len(&self) -> Option<u32> {
        (IMG_HEADER_SIZE as u32).checked_add(self.payload_len())
    }

    /// Header bytes covered by the image MAC and signature.
    pub fn signed_bytes(&self) -> &[u8] {
        &self.as_bytes()[CTRL_HEADER_OFFSET..]
    }

    /// Compressed application image. Patches reuse the type field for the
    /// content of a combined update and are never compressed.
    pub fn is_compressed(&self) -> bool {
        let patch = [ImageId::RomPatch as u16, ImageId::AppPatch as u16].contains(&self.image_id());
        !patch && self.ctrl_flag().kind() == Some(ImageType::Compressed)
    }

    pub fn is_ota_descriptor(&self) -> bool {
        self.image_id() == ImageId::Ota as u16
    }

    /// Interprets the reserved tail according to the kind of image.
    pub fn reserved_region(&self) -> ReservedRegion<'_> {
        if self.is_ota_descriptor() {
            ReservedRegion::ImageTable(transmute_ref!(&self.reserved))
        } else if cfg!(feature = "fsbl-ext") {
            ReservedRegion::FsblExtension(transmute_ref!(&self.reserved))
        } else {
            ReservedRegion::Plain(&self.reserved)
        }
    }

    pub fn ota_table(&self) -> Option<&OtaImageTable> {
        match self.reserved_region() {
            ReservedRegion::ImageTable(table) => Some(table),
            _ => None,
        }
    }

    /// Mutable table view, used when composing an OTA descriptor.
    pub fn ota_table_mut(&mut self) -> &mut OtaImageTable {
        transmute_mut!(&mut self.reserved)
    }

    pub fn fsbl_extension_mut(&mut self) -> &mut FsblExtension {
        transmute_mut!(&mut self.reserved)
    }

    pub fn image_version(&self) -> ImageVersion {
        match self.ota_table() {
            Some(table) => ImageVersion::OtaHeader(HeaderSubVersion::from(table.ver_val.get())),
            None => ImageVersion::Image(ImageSubVersion::from(self.git_ver.ver.get())),
        }
    }

    /// Address window the image executes from once loaded.
    ///
    /// XIP images run in place, from `exe_base` to the end of their payload
    /// in flash. Other images are copied to `load_dst` and occupy
    /// `load_len` bytes there. Returns `None` for an empty or overflowing
    /// window.
    pub fn exec_region(&self, header_addr: u32) -> Option<Range<u32>> {
        let (start, end) = if self.ctrl_flag().xip() {
            let end = header_addr
                .checked_add(IMG_HEADER_SIZE as u32)?
                .checked_add(self.payload_len())?;
            (self.exe_base.get(), end)
        } else {
            let start = self.load_dst.get();
            (start, start.checked_add(self.load_len.get())?)
        };
        if start < end {
            Some(start..end)
        } else {
            None
        }
    }
}

/// Handoff block at the start of a chained image's execution region.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RomHeader {
    pub uuid: [u8; UUID_SIZE],
    pub init_ptr: U32,
    pub entry_ptr: U32,
}

pub const ROM_HEADER_SIZE: usize = size_of::<RomHeader>();
const _: () = assert!(ROM_HEADER_SIZE == 24);

/// Header leading the payload of a compressed application image. The
/// compressed stream follows at `DECODE_OFFSET`.
#[repr(C)]
#[derive(Clone, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct CompressImageHeader {
    pub ctrl: CtrlHeader,
    pub uuid: [u8; UUID_SIZE],
    pub version: U32,
    pub compress_algo: U32,
    pub sha256: [u8; SHA256_SIZE],
    pub reserved: [u8; 28],
}

pub const DECODE_OFFSET: usize = size_of::<CompressImageHeader>();
const _: () = assert!(DECODE_OFFSET == 96);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageTableEntry, IMG_MAGIC_PATTERN};
    use zerocopy::FromZeros;

    fn blank(id: ImageId) -> ImageHeader {
        let mut header = ImageHeader::new_zeroed();
        header.ctrl.image_id = (id as u16).into();
        header.magic_pattern = IMG_MAGIC_PATTERN.into();
        header
    }

    #[test]
    fn test_field_offsets() {
        assert_eq!(offset_of!(ImageHeader, uuid), 444);
        assert_eq!(offset_of!(ImageHeader, exe_base), 460);
        assert_eq!(offset_of!(ImageHeader, magic_pattern), 480);
        assert_eq!(offset_of!(ImageHeader, load_dst), 500);
        assert_eq!(offset_of!(ImageHeader, git_ver), 528);
        assert_eq!(offset_of!(ImageHeader, pub_key), 544);
        assert_eq!(offset_of!(CtrlHeader, image_id), 6);
    }

    #[test]
    fn test_little_endian_encoding() {
        let mut header = blank(ImageId::AppPatch);
        header.ctrl.payload_len = 0x1234_5678.into();
        let bytes = header.as_bytes();
        assert_eq!(&bytes[438..440], &[0x93, 0x27]);
        assert_eq!(&bytes[440..444], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(&bytes[480..484], &[0xA5, 0x12, 0x5A, 0x5A]);
    }

    #[test]
    fn test_reserved_region_selection() {
        let mut ota = blank(ImageId::Ota);
        ota.ota_table_mut().ver_val = 0x0001_0000.into();
        ota.ota_table_mut().image_info[2] = ImageTableEntry {
            addr: 0x0080_4000.into(),
            size: 0x2000.into(),
        };
        match ota.reserved_region() {
            ReservedRegion::ImageTable(table) => {
                let entry = table.entry(ImageId::AppPatch).unwrap();
                assert_eq!(entry.addr.get(), 0x0080_4000);
                assert_eq!(entry.size.get(), 0x2000);
            }
            _ => panic!("OTA descriptor must expose the image table"),
        }
        assert_eq!(&ota.reserved[20..24], &[0x00, 0x40, 0x80, 0x00]);

        let app = blank(ImageId::AppPatch);
        assert!(app.ota_table().is_none());
    }

    #[test]
    fn test_image_version_views() {
        let mut ota = blank(ImageId::Ota);
        ota.ota_table_mut().ver_val = 0x0203_0400.into();
        assert_eq!(
            ota.image_version(),
            ImageVersion::OtaHeader(HeaderSubVersion::from(0x0203_0400))
        );

        let mut app = blank(ImageId::AppPatch);
        app.git_ver.ver = 0x0000_1011.into();
        let ImageVersion::Image(v) = app.image_version() else {
            panic!("application images use the image version layout");
        };
        assert_eq!((v.major(), v.minor(), v.revision()), (1, 1, 1));
    }

    #[test]
    fn test_exec_region_load() {
        let mut header = blank(ImageId::AppPatch);
        header.load_dst = 0x0020_0000.into();
        header.load_len = 0x800.into();
        assert_eq!(header.exec_region(0x0080_4000), Some(0x0020_0000..0x0020_0800));

        header.load_len = 0.into();
        assert_eq!(header.exec_region(0x0080_4000), None);

        header.load_dst = 0xFFFF_F000.into();
        header.load_len = 0x2000.into();
        assert_eq!(header.exec_region(0x0080_4000), None);
    }

    #[test]
    fn test_exec_region_xip() {
        let mut header = blank(ImageId::AppPatch);
        let mut flag = CtrlFlag::default();
        flag.set_xip(true);
        header.ctrl.set_ctrl_flag(flag);
        header.exe_base = 0x0080_4400.into();
        header.ctrl.payload_len = 0x1000.into();
        assert_eq!(header.exec_region(0x0080_4000), Some(0x0080_4400..0x0080_5400));

        header.ctrl.payload_len = u32::MAX.into();
        assert_eq!(header.exec_region(0x0080_4000), None);
    }

    #[test]
    fn test_compress_header_layout() {
        assert_eq!(offset_of!(CompressImageHeader, uuid), 12);
        assert_eq!(offset_of!(CompressImageHeader, compress_algo), 32);
        assert_eq!(offset_of!(CompressImageHeader, sha256), 36);
        let mut raw = [0u8; DECODE_OFFSET];
        raw[6..8].copy_from_slice(&(ImageId::AppData1 as u16).to_le_bytes());
        raw[32] = 2;
        let header = CompressImageHeader::read_from_bytes(&raw).unwrap();
        assert_eq!(header.ctrl.image_id.get(), ImageId::AppData1 as u16);
        assert_eq!(header.compress_algo.get(), 2);
    }

    #[test]
    fn test_is_compressed() {
        let mut flag = CtrlFlag::default();
        flag.set_image_type(ImageType::Compressed as u8);
        let mut app = blank(ImageId::AppData1);
        assert!(!app.is_compressed());
        app.ctrl.set_ctrl_flag(flag);
        assert!(app.is_compressed());

        let mut patch = blank(ImageId::AppPatch);
        patch.ctrl.set_ctrl_flag(flag);
        assert!(!patch.is_compressed());
    }

    #[test]
    fn test_public_key_split() {
        let mut header = blank(ImageId::AppPatch);
        header.pub_key.0[RSA_KEY_SIZE] = 0x01;
        header.pub_key.0[RSA_KEY_SIZE + 2] = 0x01;
        assert_eq!(header.pub_key.modulus().len(), RSA_KEY_SIZE);
        assert_eq!(header.pub_key.exponent(), &[0x01, 0x00, 0x01, 0x00]);
        assert_eq!(header.auth.signature().len(), RSA_KEY_SIZE);
    }
}
