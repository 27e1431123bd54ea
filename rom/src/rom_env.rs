/*++

Licensed under the Apache-2.0 license.

File Name:

    rom_env.rs

Abstract:

    ROM Environment - Bundles the collaborators every image check consumes

--*/

use bee_config::boot::ActiveBankStore;
use bee_config::flash::FlashLayout;
use bee_config::PlatformConfig;

use crate::crypto::{CryptoEngine, KeyStore};
use crate::flash::FlashStorage;

/// ROM Environment containing the flash driver, crypto engines, provisioned
/// keys, the persisted bank selector and the static configuration.
///
/// All collaborators are borrowed immutably so a single environment can be
/// shared by every validation stage.
pub struct RomEnv<'a> {
    pub flash: &'a dyn FlashStorage,
    pub crypto: &'a dyn CryptoEngine,
    pub keys: &'a dyn KeyStore,
    pub bank_store: &'a dyn ActiveBankStore,
    pub layout: &'a FlashLayout,
    pub platform: &'a PlatformConfig,
}

impl<'a> RomEnv<'a> {
    pub fn new(
        flash: &'a dyn FlashStorage,
        crypto: &'a dyn CryptoEngine,
        keys: &'a dyn KeyStore,
        bank_store: &'a dyn ActiveBankStore,
        layout: &'a FlashLayout,
        platform: &'a PlatformConfig,
    ) -> Self {
        Self {
            flash,
            crypto,
            keys,
            bank_store,
            layout,
            platform,
        }
    }
}
