// Licensed under the Apache-2.0 license

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use bee_config::boot::{ActiveBankStore, AonRegisters, BankId, BootConfigError};

/// AON register file. Unwritten registers read as zero.
#[derive(Default)]
pub struct FakeAon {
    regs: RefCell<HashMap<u16, u16>>,
    fail: Cell<bool>,
}

impl FakeAon {
    pub fn get(&self, offset: u16) -> u16 {
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    pub fn set(&self, offset: u16, value: u16) {
        self.regs.borrow_mut().insert(offset, value);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.set(fail);
    }
}

impl AonRegisters for FakeAon {
    fn read16(&self, offset: u16) -> Result<u16, BootConfigError> {
        if self.fail.get() {
            return Err(BootConfigError::StorageError);
        }
        Ok(self.get(offset))
    }

    fn write16(&self, offset: u16, value: u16) -> Result<(), BootConfigError> {
        if self.fail.get() {
            return Err(BootConfigError::StorageError);
        }
        self.set(offset, value);
        Ok(())
    }
}

/// Bank selector holding its value in memory. `None` models a selector
/// that cannot be read.
pub struct FixedBank {
    bank: Cell<Option<BankId>>,
}

impl FixedBank {
    pub fn new(bank: BankId) -> Self {
        FixedBank {
            bank: Cell::new(Some(bank)),
        }
    }

    pub fn unreadable() -> Self {
        FixedBank {
            bank: Cell::new(None),
        }
    }

    pub fn select(&self, bank: Option<BankId>) {
        self.bank.set(bank);
    }
}

impl ActiveBankStore for FixedBank {
    fn get_active_bank(&self) -> Result<BankId, BootConfigError> {
        self.bank.get().ok_or(BootConfigError::ReadFailed)
    }

    fn set_active_bank(&self, bank: BankId) -> Result<(), BootConfigError> {
        self.bank.set(Some(bank));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_config::boot::{AonBankSelector, AON_REG_OTA_BANK_SELECT};

    #[test]
    fn test_aon_backed_selector() {
        let aon = FakeAon::default();
        let selector = AonBankSelector::new(&aon);
        assert_eq!(selector.get_active_bank(), Ok(BankId::Bank0));
        selector.set_active_bank(BankId::Bank1).unwrap();
        assert_eq!(aon.get(AON_REG_OTA_BANK_SELECT), 1);
        aon.set_fail(true);
        assert_eq!(selector.get_active_bank(), Err(BootConfigError::ReadFailed));
    }

    #[test]
    fn test_fixed_bank() {
        let bank = FixedBank::unreadable();
        assert_eq!(bank.get_active_bank(), Err(BootConfigError::ReadFailed));
        bank.set_active_bank(BankId::Bank1).unwrap();
        assert_eq!(bank.get_active_bank(), Ok(BankId::Bank1));
    }
}
