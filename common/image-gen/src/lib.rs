// Licensed under the Apache-2.0 license

//! Host-side construction of bee boot images and OTA descriptors.

use bee_image_header::{
    CtrlFlag, HeaderSubVersion, ImageHeader, ImageId, ImageSubVersion, ImageTableEntry, RomHeader,
    ERASED_WORD, IMG_HEADER_SIZE, IMG_IC_TYPE, IMG_MAGIC_PATTERN, OTA_HEADER_SIZE, SHA256_SIZE,
    UUID_SIZE,
};
use crc::{Crc, CRC_16_MCRF4XX};
use sha2::{Digest, Sha256};
use zerocopy::{FromZeros, IntoBytes};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Fills the authentication block of a header whose other fields are final.
pub trait ImageSigner {
    fn sign(&self, header: &mut ImageHeader);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    Crc16,
    Sha256,
}

pub fn payload_crc16(payload: &[u8]) -> u16 {
    CRC16.checksum(payload)
}

pub fn payload_sha256(payload: &[u8]) -> [u8; SHA256_SIZE] {
    Sha256::digest(payload).into()
}

/// Builds an image: header followed by payload.
pub struct ImageBuilder {
    header: ImageHeader,
    payload: Vec<u8>,
    integrity: Integrity,
}

impl ImageBuilder {
    /// Starts from a header that passes every structural check for `id`
    /// on the reference part: magic, IC type, id, payload length, and the
    /// image marked ready and current.
    pub fn new(id: ImageId, payload: &[u8]) -> Self {
        let mut header = ImageHeader::new_zeroed();
        header.magic_pattern = IMG_MAGIC_PATTERN.into();
        header.ctrl.ic_type = IMG_IC_TYPE;
        header.ctrl.image_id = (id as u16).into();
        header.ctrl.payload_len = (payload.len() as u32).into();
        let mut flag = CtrlFlag::default();
        flag.set_not_obsolete(true);
        header.ctrl.set_ctrl_flag(flag);
        ImageBuilder {
            header,
            payload: payload.to_vec(),
            integrity: Integrity::Crc16,
        }
    }

    pub fn integrity(mut self, integrity: Integrity) -> Self {
        self.integrity = integrity;
        self
    }

    pub fn ic_type(mut self, ic_type: u8) -> Self {
        self.header.ctrl.ic_type = ic_type;
        self
    }

    pub fn uuid(mut self, uuid: [u8; UUID_SIZE]) -> Self {
        self.header.uuid = uuid;
        self
    }

    pub fn secure_version(mut self, secure_version: u8) -> Self {
        self.header.ctrl.secure_version = secure_version;
        self
    }

    pub fn version(mut self, version: ImageSubVersion) -> Self {
        self.header.git_ver.ver = u32::from(version).into();
        self
    }

    /// Executes in place from `exe_base`.
    pub fn xip(mut self, exe_base: u32) -> Self {
        self.header.exe_base = exe_base.into();
        self.flags(|flag| flag.set_xip(true))
    }

    /// Copied from `src` in flash to `dst` before it runs.
    pub fn load(mut self, src: u32, dst: u32, len: u32) -> Self {
        self.header.load_src = src.into();
        self.header.load_dst = dst.into();
        self.header.load_len = len.into();
        self.flags(|flag| flag.set_load_when_boot(true))
    }

    pub fn flags(mut self, f: impl FnOnce(&mut CtrlFlag)) -> Self {
        let mut flag = self.header.ctrl_flag();
        f(&mut flag);
        self.header.ctrl.set_ctrl_flag(flag);
        self
    }

    /// Raw access for fields without a dedicated setter.
    pub fn header_mut(&mut self) -> &mut ImageHeader {
        &mut self.header
    }

    /// Records the payload checksum for the selected integrity mode and
    /// returns the final header.
    pub fn finalize(mut self, signer: Option<&dyn ImageSigner>) -> (ImageHeader, Vec<u8>) {
        let mut flag = self.header.ctrl_flag();
        flag.set_integrity_check_en_in_boot(self.integrity == Integrity::Sha256);
        self.header.ctrl.set_ctrl_flag(flag);
        self.header.ctrl.crc16 = payload_crc16(&self.payload).into();
        self.header.auth.image_hash = payload_sha256(&self.payload);
        if let Some(signer) = signer {
            signer.sign(&mut self.header);
        }
        (self.header, self.payload)
    }

    pub fn build(self) -> Vec<u8> {
        Self::to_bytes(self.finalize(None))
    }

    pub fn build_signed(self, signer: &dyn ImageSigner) -> Vec<u8> {
        Self::to_bytes(self.finalize(Some(signer)))
    }

    fn to_bytes((header, payload): (ImageHeader, Vec<u8>)) -> Vec<u8> {
        let mut image = Vec::with_capacity(IMG_HEADER_SIZE + payload.len());
        image.extend_from_slice(header.as_bytes());
        image.extend_from_slice(&payload);
        image
    }
}

/// Builds an OTA descriptor: a header carrying the sub-image table, padded
/// with erased bytes to `OTA_HEADER_SIZE`.
pub struct OtaHeaderBuilder {
    inner: ImageBuilder,
}

impl OtaHeaderBuilder {
    pub fn new() -> Self {
        let mut inner = ImageBuilder::new(ImageId::Ota, &[]);
        let erased = ImageTableEntry {
            addr: ERASED_WORD.into(),
            size: ERASED_WORD.into(),
        };
        inner.header_mut().ota_table_mut().image_info.fill(erased);
        OtaHeaderBuilder { inner }
    }

    pub fn version(mut self, version: HeaderSubVersion) -> Self {
        self.inner.header_mut().ota_table_mut().ver_val = u32::from(version).into();
        self
    }

    /// Records `id` at absolute address `addr` with `size` bytes of header
    /// and payload. Ids without a table slot are ignored.
    pub fn entry(mut self, id: ImageId, addr: u32, size: u32) -> Self {
        if let Some(entry) = self.inner.header_mut().ota_table_mut().entry_mut(id) {
            entry.addr = addr.into();
            entry.size = size.into();
        }
        self
    }

    pub fn integrity(mut self, integrity: Integrity) -> Self {
        self.inner = self.inner.integrity(integrity);
        self
    }

    pub fn header_mut(&mut self) -> &mut ImageHeader {
        self.inner.header_mut()
    }

    pub fn build(self) -> Vec<u8> {
        Self::pad(self.inner.build())
    }

    pub fn build_signed(self, signer: &dyn ImageSigner) -> Vec<u8> {
        Self::pad(self.inner.build_signed(signer))
    }

    fn pad(mut image: Vec<u8>) -> Vec<u8> {
        image.resize(OTA_HEADER_SIZE as usize, 0xFF);
        image
    }
}

impl Default for OtaHeaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of a chained image: the ROM handoff block followed by `body`.
pub fn chained_payload(uuid: [u8; UUID_SIZE], init_ptr: u32, entry_ptr: u32, body: &[u8]) -> Vec<u8> {
    let rom_header = RomHeader {
        uuid,
        init_ptr: init_ptr.into(),
        entry_ptr: entry_ptr.into(),
    };
    let mut payload = rom_header.as_bytes().to_vec();
    payload.extend_from_slice(body);
    payload
}
