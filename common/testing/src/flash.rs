// Licensed under the Apache-2.0 license

use std::cell::{Cell, RefCell};

use bee_config::flash::FlashLayout;
use bee_rom_common::flash::{FlashDrvError, FlashStorage};

/// Memory-backed NOR flash. Starts fully erased.
pub struct FakeFlash {
    base: u32,
    data: RefCell<Vec<u8>>,
    reads: Cell<usize>,
    fail_reads: Cell<bool>,
}

impl FakeFlash {
    pub fn new(base: u32, size: usize) -> Self {
        FakeFlash {
            base,
            data: RefCell::new(vec![0xFF; size]),
            reads: Cell::new(0),
            fail_reads: Cell::new(false),
        }
    }

    /// Device spanning from the lowest to the highest configured region.
    pub fn for_layout(layout: &FlashLayout) -> Self {
        let regions = [&layout.ota_bank_0, &layout.ota_bank_1, &layout.ota_tmp];
        let used = regions.iter().filter(|region| !region.is_empty());
        let base = used.clone().map(|region| region.base).min().unwrap_or(0);
        let end = used.map(|region| region.end()).max().unwrap_or(0);
        Self::new(base, (end - base) as usize)
    }

    fn offset(&self, addr: u32, len: usize) -> Option<usize> {
        let offset = addr.checked_sub(self.base)? as usize;
        (offset + len <= self.data.borrow().len()).then_some(offset)
    }

    /// Whether `len` bytes at `addr` lie on the device.
    pub fn contains(&self, addr: u32, len: usize) -> bool {
        self.offset(addr, len).is_some()
    }

    /// Writes `bytes` at `addr`, as the OTA updater or a programmer would.
    pub fn program(&self, addr: u32, bytes: &[u8]) {
        let offset = self
            .offset(addr, bytes.len())
            .unwrap_or_else(|| panic!("program outside flash at {addr:#x}"));
        self.data.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn erase(&self, addr: u32, len: usize) {
        self.program(addr, &vec![0xFF; len]);
    }

    /// Inverts the byte at `addr`.
    pub fn corrupt(&self, addr: u32) {
        let offset = self
            .offset(addr, 1)
            .unwrap_or_else(|| panic!("corrupt outside flash at {addr:#x}"));
        self.data.borrow_mut()[offset] ^= 0xFF;
    }

    pub fn contents(&self, addr: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        self.read(&mut buf, addr)
            .unwrap_or_else(|err| panic!("read outside flash at {addr:#x}: {err:?}"));
        buf
    }

    /// Number of driver reads since creation or the last reset.
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    pub fn reset_read_count(&self) {
        self.reads.set(0);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }
}

impl FlashStorage for FakeFlash {
    fn read(&self, buffer: &mut [u8], address: u32) -> Result<(), FlashDrvError> {
        self.reads.set(self.reads.get() + 1);
        if self.fail_reads.get() {
            return Err(FlashDrvError::FAIL);
        }
        let offset = self
            .offset(address, buffer.len())
            .ok_or(FlashDrvError::INVAL)?;
        buffer.copy_from_slice(&self.data.borrow()[offset..offset + buffer.len()]);
        Ok(())
    }

    fn base(&self) -> u32 {
        self.base
    }

    fn capacity(&self) -> u32 {
        self.data.borrow().len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_flash_program_and_read() {
        let flash = FakeFlash::new(0x1000, 0x100);
        assert_eq!(flash.contents(0x1000, 4), vec![0xFF; 4]);
        flash.program(0x1010, &[1, 2, 3]);
        flash.corrupt(0x1011);
        assert_eq!(flash.contents(0x1010, 3), vec![1, 0xFD, 3]);

        let mut buf = [0u8; 4];
        assert_eq!(flash.read(&mut buf, 0x10FE), Err(FlashDrvError::INVAL));
        assert_eq!(flash.read(&mut buf, 0x0FFF), Err(FlashDrvError::INVAL));
        assert_eq!(flash.read_count(), 4);
    }

    #[test]
    fn test_fake_flash_for_layout() {
        let layout = FlashLayout::dual_bank();
        let flash = FakeFlash::for_layout(&layout);
        assert_eq!(flash.base(), layout.ota_bank_0.base);
        assert_eq!(flash.base() + flash.capacity(), layout.ota_bank_1.end());
    }

    #[test]
    fn test_fake_flash_fail_injection() {
        let flash = FakeFlash::new(0, 16);
        flash.set_fail_reads(true);
        assert_eq!(flash.read(&mut [0u8; 4], 0), Err(FlashDrvError::FAIL));
    }
}
