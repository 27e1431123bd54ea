// Licensed under the Apache-2.0 license

use bitfield::bitfield;

use crate::flash::FlashBank;

/// Firmware general purpose register, survives every reset but power loss.
pub const AON_REG_FW_GENERAL: u16 = 0x0;
/// OTA bank selector. Bit 0 set means bank 1 is active.
pub const AON_REG_OTA_BANK_SELECT: u16 = 0x4;

const BANK_SELECT_MASK: u16 = 0x0001;

/// Register access to the always-on domain.
pub trait AonRegisters {
    fn read16(&self, offset: u16) -> Result<u16, BootConfigError>;

    fn write16(&self, offset: u16, value: u16) -> Result<(), BootConfigError>;

    /// Read-modify-write of the bits selected by `mask`.
    fn update16(&self, offset: u16, mask: u16, value: u16) -> Result<(), BootConfigError> {
        let current = self.read16(offset)?;
        self.write16(offset, (current & !mask) | (value & mask))
    }
}

/// Persisted selection of the OTA bank the device boots from.
///
/// The selector is fixed for the duration of a validation pass; only the
/// OTA commit path changes it.
pub trait ActiveBankStore {
    /// Determines which bank should be booted.
    fn get_active_bank(&self) -> Result<BankId, BootConfigError>;

    /// Sets the bank to boot from on the next reset.
    fn set_active_bank(&self, bank: BankId) -> Result<(), BootConfigError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankId {
    Bank0 = 0x0000,
    Bank1 = 0x0001,
}

impl BankId {
    pub fn other(self) -> BankId {
        match self {
            BankId::Bank0 => BankId::Bank1,
            BankId::Bank1 => BankId::Bank0,
        }
    }
}

impl core::convert::TryFrom<u16> for BankId {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(BankId::Bank0),
            0x0001 => Ok(BankId::Bank1),
            _ => Err(()),
        }
    }
}

impl From<BankId> for FlashBank {
    fn from(bank: BankId) -> FlashBank {
        match bank {
            BankId::Bank0 => FlashBank::OtaBank0,
            BankId::Bank1 => FlashBank::OtaBank1,
        }
    }
}

// Define BootConfigError for error handling in the bank and stage stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootConfigError {
    InvalidPartition,
    StorageError,
    ReadFailed,
    WriteFailed,
}

/// Bank selector backed by the AON bank select register.
pub struct AonBankSelector<'a> {
    aon: &'a dyn AonRegisters,
}

impl<'a> AonBankSelector<'a> {
    pub fn new(aon: &'a dyn AonRegisters) -> Self {
        AonBankSelector { aon }
    }
}

impl ActiveBankStore for AonBankSelector<'_> {
    fn get_active_bank(&self) -> Result<BankId, BootConfigError> {
        let raw = self
            .aon
            .read16(AON_REG_OTA_BANK_SELECT)
            .map_err(|_| BootConfigError::ReadFailed)?;
        BankId::try_from(raw & BANK_SELECT_MASK).map_err(|_| BootConfigError::InvalidPartition)
    }

    fn set_active_bank(&self, bank: BankId) -> Result<(), BootConfigError> {
        self.aon
            .update16(AON_REG_OTA_BANK_SELECT, BANK_SELECT_MASK, bank as u16)
            .map_err(|_| BootConfigError::WriteFailed)
    }
}

bitfield! {
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct FwGeneralReg(u16);
    impl Debug;
    pub aon_boot_done, set_aon_boot_done: 0;
    pub pon_boot_done, set_pon_boot_done: 1;
    pub u8, stage_bits, _: 6, 2;
    pub rom_trace_prot, _: 7;
    pub disable_set_reg_by_otp, _: 8;
}

/// Progress markers the ROM leaves for the application and for post-mortem
/// debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    StartPlatformInit = 1,
    AonBootDone = 2,
    PonBootDone = 3,
}

/// Bit positions in the FW general register written by the mask ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomStageBit {
    StartToRunCCode = 3,
    AfterCheckPadBootFromFlash = 4,
    AfterLoadPatch = 5,
    AfterSetSecureReg = 6,
}

pub fn record_boot_stage(aon: &dyn AonRegisters, stage: BootStage) -> Result<(), BootConfigError> {
    match stage {
        BootStage::StartPlatformInit => {
            let bit = 1u16 << RomStageBit::AfterLoadPatch as u16;
            aon.update16(AON_REG_FW_GENERAL, bit, bit)
        }
        BootStage::AonBootDone => {
            let mut reg = FwGeneralReg(aon.read16(AON_REG_FW_GENERAL)?);
            reg.set_aon_boot_done(true);
            aon.write16(AON_REG_FW_GENERAL, reg.0)
        }
        BootStage::PonBootDone => {
            let mut reg = FwGeneralReg(aon.read16(AON_REG_FW_GENERAL)?);
            reg.set_pon_boot_done(true);
            aon.write16(AON_REG_FW_GENERAL, reg.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Regs {
        regs: RefCell<[u16; 4]>,
        fail: bool,
    }

    impl Regs {
        fn new() -> Self {
            Regs {
                regs: RefCell::new([0; 4]),
                fail: false,
            }
        }
    }

    impl AonRegisters for Regs {
        fn read16(&self, offset: u16) -> Result<u16, BootConfigError> {
            if self.fail {
                return Err(BootConfigError::StorageError);
            }
            Ok(self.regs.borrow()[offset as usize / 2])
        }

        fn write16(&self, offset: u16, value: u16) -> Result<(), BootConfigError> {
            self.regs.borrow_mut()[offset as usize / 2] = value;
            Ok(())
        }
    }

    #[test]
    fn test_bank_selector_round_trip() {
        let regs = Regs::new();
        regs.regs.borrow_mut()[2] = 0xAB00;
        let selector = AonBankSelector::new(&regs);
        assert_eq!(selector.get_active_bank(), Ok(BankId::Bank0));

        selector.set_active_bank(BankId::Bank1).unwrap();
        assert_eq!(selector.get_active_bank(), Ok(BankId::Bank1));
        // Neighbouring bits are preserved.
        assert_eq!(regs.regs.borrow()[2], 0xAB01);
    }

    #[test]
    fn test_bank_selector_read_failure() {
        let mut regs = Regs::new();
        regs.fail = true;
        let selector = AonBankSelector::new(&regs);
        assert_eq!(selector.get_active_bank(), Err(BootConfigError::ReadFailed));
    }

    #[test]
    fn test_record_boot_stages() {
        let regs = Regs::new();
        record_boot_stage(&regs, BootStage::StartPlatformInit).unwrap();
        assert_eq!(regs.regs.borrow()[0], 0x0020);

        record_boot_stage(&regs, BootStage::AonBootDone).unwrap();
        record_boot_stage(&regs, BootStage::PonBootDone).unwrap();
        let reg = FwGeneralReg(regs.regs.borrow()[0]);
        assert!(reg.aon_boot_done());
        assert!(reg.pon_boot_done());
        assert_eq!(reg.stage_bits(), 0x08);
    }

    #[test]
    fn test_bank_id() {
        assert_eq!(BankId::Bank0.other(), BankId::Bank1);
        assert_eq!(FlashBank::from(BankId::Bank1), FlashBank::OtaBank1);
        assert_eq!(BankId::try_from(2), Err(()));
    }
}
