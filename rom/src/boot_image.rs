/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_image.rs

Abstract:

    Boot image validation flow - locate, check, authenticate and validate
    the entry points of an image before the ROM hands off to it.

--*/

use core::ops::Range;

use bee_image_header::{ImageHeader, ImageId, RomHeader};
use romtime::HexWord;
use zerocopy::IntoBytes;

use crate::image_check::{
    check_candidate_header_valid, check_exec_source, check_header_valid, image_entry_check,
    ImageCheckError,
};
use crate::image_chksum::{check_image_auth, check_image_chksum};
use crate::image_info::{get_header_addr_by_img_id, get_temp_ota_bank_addr_by_img_id};
use crate::RomEnv;

/// An image found at `addr`, advanced one validation stage at a time. Each
/// stage consumes the previous one, so a later check can only run on an
/// image that passed every earlier check.
pub struct Image<S> {
    addr: u32,
    id: ImageId,
    state: S,
}

/// Located but not read yet.
pub struct Unchecked;

pub struct StructurallyValid {
    header: ImageHeader,
}

pub struct Authenticated {
    header: ImageHeader,
}

pub struct EntryValidated {
    header: ImageHeader,
    rom_header: Option<RomHeader>,
}

/// Outcome of a successful validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootableImage {
    pub id: ImageId,
    pub addr: u32,
    /// Header plus payload.
    pub size: u32,
    /// Execution window of a chained image, checked against its payload.
    pub exec_region: Option<Range<u32>>,
    /// Handoff pointers of a chained image.
    pub init_ptr: Option<u32>,
    pub entry_ptr: Option<u32>,
}

impl<S> Image<S> {
    pub fn addr(&self) -> u32 {
        self.addr
    }

    pub fn id(&self) -> ImageId {
        self.id
    }
}

impl Image<Unchecked> {
    pub fn at(addr: u32, id: ImageId) -> Self {
        Image {
            addr,
            id,
            state: Unchecked,
        }
    }

    /// Locates `id` in the active bank.
    pub fn locate(env: &RomEnv, id: ImageId) -> Result<Self, ImageCheckError> {
        match get_header_addr_by_img_id(env, id) {
            0 => Err(ImageCheckError::HeaderAddr),
            addr => Ok(Self::at(addr, id)),
        }
    }

    /// Locates the staged update of `id`.
    pub fn locate_candidate(env: &RomEnv, id: ImageId) -> Result<Self, ImageCheckError> {
        match get_temp_ota_bank_addr_by_img_id(env, id) {
            0 => Err(ImageCheckError::HeaderAddr),
            addr => Ok(Self::at(addr, id)),
        }
    }

    pub fn check_structure(self, env: &RomEnv) -> Result<Image<StructurallyValid>, ImageCheckError> {
        let header = check_header_valid(env, self.addr, self.id)?;
        Ok(self.advance(StructurallyValid { header }))
    }

    pub fn check_candidate_structure(
        self,
        env: &RomEnv,
    ) -> Result<Image<StructurallyValid>, ImageCheckError> {
        let header = check_candidate_header_valid(env, self.addr, self.id)?;
        Ok(self.advance(StructurallyValid { header }))
    }

    fn advance(self, state: StructurallyValid) -> Image<StructurallyValid> {
        Image {
            addr: self.addr,
            id: self.id,
            state,
        }
    }
}

impl Image<StructurallyValid> {
    pub fn header(&self) -> &ImageHeader {
        &self.state.header
    }

    pub fn authenticate(self, env: &RomEnv) -> Result<Image<Authenticated>, ImageCheckError> {
        let header = self.state.header;
        if !check_image_chksum(env, self.addr, &header) || !check_image_auth(env, &header) {
            return Err(ImageCheckError::Verify);
        }
        Ok(Image {
            addr: self.addr,
            id: self.id,
            state: Authenticated { header },
        })
    }
}

impl Image<Authenticated> {
    pub fn header(&self) -> &ImageHeader {
        &self.state.header
    }

    /// Checks the handoff block of chained images. Other images have no
    /// entry contract and pass unchanged.
    pub fn validate_entry(self, env: &RomEnv) -> Result<Image<EntryValidated>, ImageCheckError> {
        let header = self.state.header;
        if !env.platform.is_chained(self.id) {
            return Ok(Image {
                addr: self.addr,
                id: self.id,
                state: EntryValidated {
                    header,
                    rom_header: None,
                },
            });
        }

        let entry = check_exec_source(&header, self.addr).and_then(|()| {
            let rom_header_addr = if header.ctrl_flag().xip() {
                header.exe_base.get()
            } else {
                header.load_src.get()
            };
            let mut rom_header = RomHeader::default();
            env.flash
                .read(rom_header.as_mut_bytes(), rom_header_addr)
                .map_err(|_| ImageCheckError::ExeBase)?;
            image_entry_check(&rom_header, &header, header.exec_region(self.addr))?;
            Ok(rom_header)
        });
        let rom_header = entry.inspect_err(|err| {
            romtime::println!(
                "[bee-rom] Entry check of {:?} at {} failed: {}",
                self.id,
                HexWord(self.addr),
                err
            );
        })?;
        Ok(Image {
            addr: self.addr,
            id: self.id,
            state: EntryValidated {
                header,
                rom_header: Some(rom_header),
            },
        })
    }

    /// Size of an authenticated image, header included.
    pub fn size(&self) -> u32 {
        self.state.header.total_len().unwrap_or(0)
    }
}

impl Image<EntryValidated> {
    pub fn into_bootable(self) -> BootableImage {
        let header = &self.state.header;
        BootableImage {
            id: self.id,
            addr: self.addr,
            size: header.total_len().unwrap_or(0),
            exec_region: self
                .state
                .rom_header
                .and_then(|_| header.exec_region(self.addr)),
            init_ptr: self.state.rom_header.map(|h| h.init_ptr.get()),
            entry_ptr: self.state.rom_header.map(|h| h.entry_ptr.get()),
        }
    }
}

/// Runs the complete validation of `image_id` in the active bank.
pub fn boot_image(env: &RomEnv, image_id: ImageId) -> Result<BootableImage, ImageCheckError> {
    let image = Image::locate(env, image_id)?
        .check_structure(env)?
        .authenticate(env)?
        .validate_entry(env)?
        .into_bootable();
    romtime::println!(
        "[bee-rom] {:?} bootable at {} size {}",
        image_id,
        HexWord(image.addr),
        HexWord(image.size)
    );
    Ok(image)
}

/// Validates `image_id` in the active bank and returns its header address
/// and total size.
pub fn validate_and_locate(env: &RomEnv, image_id: ImageId) -> Result<(u32, u32), ImageCheckError> {
    boot_image(env, image_id).map(|image| (image.addr, image.size))
}

/// Validates a staged update of `image_id` before it is committed. The
/// entry stage is skipped since the image does not execute from the
/// staging location.
pub fn validate_candidate(env: &RomEnv, image_id: ImageId) -> Result<(u32, u32), ImageCheckError> {
    let image = Image::locate_candidate(env, image_id)?
        .check_candidate_structure(env)?
        .authenticate(env)?;
    romtime::println!(
        "[bee-rom] Candidate {:?} valid at {}",
        image_id,
        HexWord(image.addr())
    );
    Ok((image.addr(), image.size()))
}
