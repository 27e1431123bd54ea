// Licensed under the Apache-2.0 license

/// Identifier stored in `ctrl.image_id` of every image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum ImageId {
    Sccd = 0x278D,
    Occd = 0x278E,
    FactoryCode = 0x278F,
    Ota = 0x2790,
    SecureBoot = 0x2791,
    RomPatch = 0x2792,
    AppPatch = 0x2793,
    AppData1 = 0x2794,
    AppData2 = 0x2795,
    AppData3 = 0x2796,
    AppData4 = 0x2797,
    AppData5 = 0x2798,
    AppConfigFile = 0x2799,
    UpperStack = 0x279A,
    BtStackPatch = 0x279B,
    UserData2 = 0xFFFD,
    UserData = 0xFFFE,
}

/// First id past the OTA-managed range.
pub const IMAGE_MAX: u16 = 0x279C;

/// Number of sub-image slots in an OTA descriptor table.
pub const OTA_TABLE_ENTRIES: usize = (IMAGE_MAX - ImageId::SecureBoot as u16) as usize;

impl ImageId {
    /// Ids the OTA bank resolver can address: the descriptor itself and
    /// every sub-image in its table.
    pub fn in_ota_range(self) -> bool {
        (ImageId::Ota as u16..IMAGE_MAX).contains(&(self as u16))
    }

    /// Slot of this image in the OTA descriptor table.
    pub fn table_index(self) -> Option<usize> {
        let id = self as u16;
        if (ImageId::SecureBoot as u16..IMAGE_MAX).contains(&id) {
            Some((id - ImageId::SecureBoot as u16) as usize)
        } else {
            None
        }
    }
}

impl From<ImageId> for u16 {
    fn from(id: ImageId) -> u16 {
        id as u16
    }
}

impl core::convert::TryFrom<u16> for ImageId {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x278D => Ok(ImageId::Sccd),
            0x278E => Ok(ImageId::Occd),
            0x278F => Ok(ImageId::FactoryCode),
            0x2790 => Ok(ImageId::Ota),
            0x2791 => Ok(ImageId::SecureBoot),
            0x2792 => Ok(ImageId::RomPatch),
            0x2793 => Ok(ImageId::AppPatch),
            0x2794 => Ok(ImageId::AppData1),
            0x2795 => Ok(ImageId::AppData2),
            0x2796 => Ok(ImageId::AppData3),
            0x2797 => Ok(ImageId::AppData4),
            0x2798 => Ok(ImageId::AppData5),
            0x2799 => Ok(ImageId::AppConfigFile),
            0x279A => Ok(ImageId::UpperStack),
            0x279B => Ok(ImageId::BtStackPatch),
            0xFFFD => Ok(ImageId::UserData2),
            0xFFFE => Ok(ImageId::UserData),
            _ => Err(()),
        }
    }
}
