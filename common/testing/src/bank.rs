// Licensed under the Apache-2.0 license

use bee_config::flash::SECTOR_SIZE;
use bee_image_gen::OtaHeaderBuilder;
use bee_image_header::{ImageId, OTA_HEADER_SIZE};

use crate::FakeFlash;

/// Lays out an OTA bank: the descriptor at the bank base, then each image
/// on the next sector boundary, with the descriptor table pointing at them.
pub struct BankBuilder {
    base: u32,
    next: u32,
    ota: OtaHeaderBuilder,
    images: Vec<(u32, Vec<u8>)>,
}

impl BankBuilder {
    pub fn new(base: u32) -> Self {
        BankBuilder {
            base,
            next: base + OTA_HEADER_SIZE,
            ota: OtaHeaderBuilder::new(),
            images: Vec::new(),
        }
    }

    /// Appends `image` (header and payload) and records it in the table.
    pub fn image(mut self, id: ImageId, image: Vec<u8>) -> Self {
        let addr = self.next;
        let len = image.len() as u32;
        self.ota = self.ota.entry(id, addr, len);
        self.next = (addr + len).next_multiple_of(SECTOR_SIZE);
        self.images.push((addr, image));
        self
    }

    /// Adjusts the descriptor before it is built.
    pub fn descriptor(mut self, f: impl FnOnce(OtaHeaderBuilder) -> OtaHeaderBuilder) -> Self {
        self.ota = f(self.ota);
        self
    }

    /// Address the next appended image will get.
    pub fn next_addr(&self) -> u32 {
        self.next
    }

    /// Writes descriptor and images to `flash`. Returns the image
    /// addresses in the order they were appended.
    pub fn program(self, flash: &FakeFlash) -> Vec<u32> {
        flash.program(self.base, &self.ota.build());
        self.images
            .into_iter()
            .map(|(addr, image)| {
                flash.program(addr, &image);
                addr
            })
            .collect()
    }
}
