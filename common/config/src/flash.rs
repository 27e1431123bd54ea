// Licensed under the Apache-2.0 license

pub const FLASH_BASE: u32 = 0x0080_0000;
pub const SECTOR_SIZE: u32 = 0x1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashBank {
    OtaBank0,
    OtaBank1,
    OtaTmp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    pub name: &'static str, // name of the region
    pub base: u32,          // absolute flash address
    pub size: u32,          // size in bytes, 0 when not configured
}

impl FlashRegion {
    pub const fn new(name: &'static str, base: u32, size: u32) -> Self {
        FlashRegion { name, base, size }
    }

    pub const fn unused(name: &'static str) -> Self {
        FlashRegion {
            name,
            base: 0,
            size: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn end(&self) -> u32 {
        self.base.saturating_add(self.size)
    }

    /// True when `[addr, addr + len)` lies entirely inside the region.
    pub fn contains(&self, addr: u32, len: u32) -> bool {
        if self.is_empty() || addr < self.base {
            return false;
        }
        match addr.checked_add(len) {
            Some(end) => end <= self.end(),
            None => false,
        }
    }
}

/// OTA partitioning of the NOR flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLayout {
    pub ota_bank_0: FlashRegion,
    pub ota_bank_1: FlashRegion,
    pub ota_tmp: FlashRegion,
}

pub const OTA_BANK_SIZE: u32 = 0x0007_B000;

impl FlashLayout {
    /// Two executable banks. An update is written to the inactive bank and
    /// the selector is flipped after it validates.
    pub const fn dual_bank() -> Self {
        FlashLayout {
            ota_bank_0: FlashRegion::new("ota_bank_0", FLASH_BASE + 0x2000, OTA_BANK_SIZE),
            ota_bank_1: FlashRegion::new(
                "ota_bank_1",
                FLASH_BASE + 0x2000 + OTA_BANK_SIZE,
                OTA_BANK_SIZE,
            ),
            ota_tmp: FlashRegion::unused("ota_tmp"),
        }
    }

    /// One executable bank plus a staging area that the updater copies
    /// from.
    pub const fn single_bank() -> Self {
        FlashLayout {
            ota_bank_0: FlashRegion::new("ota_bank_0", FLASH_BASE + 0x2000, OTA_BANK_SIZE),
            ota_bank_1: FlashRegion::unused("ota_bank_1"),
            ota_tmp: FlashRegion::new("ota_tmp", FLASH_BASE + 0x2000 + OTA_BANK_SIZE, OTA_BANK_SIZE),
        }
    }

    pub fn region(&self, bank: FlashBank) -> &FlashRegion {
        match bank {
            FlashBank::OtaBank0 => &self.ota_bank_0,
            FlashBank::OtaBank1 => &self.ota_bank_1,
            FlashBank::OtaTmp => &self.ota_tmp,
        }
    }

    pub fn get_bank_addr(&self, bank: FlashBank) -> u32 {
        self.region(bank).base
    }

    pub fn get_bank_size(&self, bank: FlashBank) -> u32 {
        self.region(bank).size
    }

    pub fn supports_bank_switch(&self) -> bool {
        !self.ota_bank_1.is_empty()
    }

    /// The configured region holding `[addr, addr + len)`, if any.
    pub fn region_containing(&self, addr: u32, len: u32) -> Option<&FlashRegion> {
        [&self.ota_bank_0, &self.ota_bank_1, &self.ota_tmp]
            .into_iter()
            .find(|region| region.contains(addr, len))
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::dual_bank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_contains() {
        let region = FlashRegion::new("r", 0x1000, 0x1000);
        assert!(region.contains(0x1000, 0x400));
        assert!(region.contains(0x1C00, 0x400));
        assert!(!region.contains(0x1C01, 0x400));
        assert!(!region.contains(0x0FFF, 4));
        assert!(!region.contains(0x1000, u32::MAX));
        assert!(!FlashRegion::unused("x").contains(0, 0));
    }

    #[test]
    fn test_dual_bank_layout() {
        let layout = FlashLayout::dual_bank();
        assert!(layout.supports_bank_switch());
        assert_eq!(layout.ota_bank_0.end(), layout.ota_bank_1.base);
        assert_eq!(
            layout.get_bank_addr(FlashBank::OtaBank1),
            FLASH_BASE + 0x2000 + OTA_BANK_SIZE
        );
        assert_eq!(layout.get_bank_size(FlashBank::OtaTmp), 0);
        assert_eq!(
            layout.region_containing(layout.ota_bank_1.base, 0x400).map(|r| r.name),
            Some("ota_bank_1")
        );
        assert!(layout.region_containing(FLASH_BASE, 0x400).is_none());
    }

    #[test]
    fn test_single_bank_layout() {
        let layout = FlashLayout::single_bank();
        assert!(!layout.supports_bank_switch());
        assert_eq!(
            layout.region_containing(layout.ota_tmp.base + 0x10, 0x400).map(|r| r.name),
            Some("ota_tmp")
        );
    }
}
