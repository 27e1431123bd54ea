// Licensed under the Apache-2.0 license

//! Host stand-ins for the flash controller, crypto engines, eFuse key store
//! and AON registers, shared by the ROM tests and the image tools.

pub mod bank;
pub mod crypto;
pub mod flash;
pub mod regs;

pub use bank::*;
pub use crypto::*;
pub use flash::*;
pub use regs::*;

use bee_config::flash::FlashLayout;
use bee_config::{AuthMode, PlatformConfig};
use bee_rom_common::RomEnv;

/// Everything a `RomEnv` borrows, owned in one place.
pub struct TestRig {
    pub flash: FakeFlash,
    pub crypto: SoftCrypto,
    pub keys: FakeKeys,
    pub bank: FixedBank,
    pub layout: FlashLayout,
    pub platform: PlatformConfig,
}

impl TestRig {
    /// Blank flash covering every region of `layout`, bank 0 active.
    pub fn new(layout: FlashLayout) -> Self {
        TestRig {
            flash: FakeFlash::for_layout(&layout),
            crypto: SoftCrypto::default(),
            keys: FakeKeys::default(),
            bank: FixedBank::new(bee_config::boot::BankId::Bank0),
            layout,
            platform: PlatformConfig::default(),
        }
    }

    pub fn dual_bank() -> Self {
        Self::new(FlashLayout::dual_bank())
    }

    pub fn single_bank() -> Self {
        Self::new(FlashLayout::single_bank())
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.platform.auth_mode = auth_mode;
        self
    }

    pub fn env(&self) -> RomEnv<'_> {
        RomEnv::new(
            &self.flash,
            &self.crypto,
            &self.keys,
            &self.bank,
            &self.layout,
            &self.platform,
        )
    }
}
