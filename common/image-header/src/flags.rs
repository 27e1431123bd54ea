// Licensed under the Apache-2.0 license

use bitfield::bitfield;
use core::fmt;

bitfield! {
    /// Packed `ctrl_flag` word of the control header.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct CtrlFlag(u16);
    impl Debug;
    pub xip, set_xip: 0;
    pub enc, set_enc: 1;
    pub load_when_boot, set_load_when_boot: 2;
    pub enc_load, set_enc_load: 3;
    pub u8, enc_key_select, set_enc_key_select: 6, 4;
    pub not_ready, set_not_ready: 7;
    pub not_obsolete, set_not_obsolete: 8;
    pub integrity_check_en_in_boot, set_integrity_check_en_in_boot: 9;
    pub compressed_not_ready, set_compressed_not_ready: 10;
    pub compressed_not_obsolete, set_compressed_not_obsolete: 11;
    rsvd, _: 12;
    pub u8, image_type, set_image_type: 15, 13;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncKeySelect {
    Scek = 0,
    ScekWithRtkConst = 1,
    Ocek = 2,
    OcekWithOemConst = 3,
    OnFlash = 4,
}

impl core::convert::TryFrom<u8> for EncKeySelect {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EncKeySelect::Scek),
            1 => Ok(EncKeySelect::ScekWithRtkConst),
            2 => Ok(EncKeySelect::Ocek),
            3 => Ok(EncKeySelect::OcekWithOemConst),
            4 => Ok(EncKeySelect::OnFlash),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Normal = 0,
    Compressed = 1,
}

impl core::convert::TryFrom<u8> for ImageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ImageType::Normal),
            1 => Ok(ImageType::Compressed),
            _ => Err(()),
        }
    }
}

impl CtrlFlag {
    pub fn key_select(&self) -> Option<EncKeySelect> {
        EncKeySelect::try_from(self.enc_key_select()).ok()
    }

    pub fn kind(&self) -> Option<ImageType> {
        ImageType::try_from(self.image_type()).ok()
    }
}

bitfield! {
    /// Version word of an OTA descriptor.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct HeaderSubVersion(u32);
    impl Debug;
    u8;
    rsvd, _: 7, 0;
    pub revision, set_revision: 15, 8;
    pub minor, set_minor: 23, 16;
    pub major, set_major: 31, 24;
}

bitfield! {
    /// Version word of a patch, application or data image.
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct ImageSubVersion(u32);
    impl Debug;
    pub u8, major, set_major: 3, 0;
    pub u8, minor, set_minor: 11, 4;
    pub u16, revision, set_revision: 26, 12;
    rsvd, _: 31, 27;
}

impl fmt::Display for HeaderSubVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.revision())
    }
}

impl fmt::Display for ImageSubVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.revision())
    }
}

macro_rules! raw_conversions {
    ($name:ident, $raw:ty) => {
        impl From<$raw> for $name {
            fn from(raw: $raw) -> Self {
                $name(raw)
            }
        }

        impl From<$name> for $raw {
            fn from(value: $name) -> $raw {
                value.0
            }
        }
    };
}

raw_conversions!(CtrlFlag, u16);
raw_conversions!(HeaderSubVersion, u32);
raw_conversions!(ImageSubVersion, u32);

/// Version of an image, decoded with the layout its kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVersion {
    OtaHeader(HeaderSubVersion),
    Image(ImageSubVersion),
}

impl fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageVersion::OtaHeader(v) => v.fmt(f),
            ImageVersion::Image(v) => v.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_flag_bit_positions() {
        let mut flag = CtrlFlag(0);
        flag.set_not_ready(true);
        assert_eq!(flag.0, 0x0080);

        let mut flag = CtrlFlag(0);
        flag.set_not_obsolete(true);
        flag.set_integrity_check_en_in_boot(true);
        assert_eq!(flag.0, 0x0300);

        let flag = CtrlFlag(0x0001);
        assert!(flag.xip());
        assert!(!flag.enc());
    }

    #[test]
    fn test_ctrl_flag_multi_bit_fields() {
        let mut flag = CtrlFlag(0);
        flag.set_enc_key_select(EncKeySelect::OnFlash as u8);
        flag.set_image_type(ImageType::Compressed as u8);
        assert_eq!(flag.0, 0x2040);
        assert_eq!(flag.key_select(), Some(EncKeySelect::OnFlash));
        assert_eq!(flag.kind(), Some(ImageType::Compressed));

        let flag = CtrlFlag(0xE000);
        assert_eq!(flag.image_type(), 7);
        assert_eq!(flag.kind(), None);
    }

    #[test]
    fn test_header_sub_version() {
        let v = HeaderSubVersion(0x0102_0300);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 2);
        assert_eq!(v.revision(), 3);
    }

    #[test]
    fn test_image_sub_version() {
        let mut v = ImageSubVersion(0);
        v.set_major(2);
        v.set_minor(0x35);
        v.set_revision(0x1234);
        assert_eq!(v.0, 0x0123_4352);
        assert_eq!(v.revision(), 0x1234);
        assert_eq!(v.minor(), 0x35);
        assert_eq!(v.major(), 2);
    }

    #[test]
    fn test_version_display() {
        let v = ImageVersion::OtaHeader(HeaderSubVersion(0x0102_0300));
        assert_eq!(v.to_string(), "1.2.3");
        let v = ImageVersion::Image(ImageSubVersion(0x0000_5021));
        assert_eq!(v.to_string(), "1.2.5");
    }
}
