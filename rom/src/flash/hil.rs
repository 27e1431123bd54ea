// Licensed under the Apache-2.0 license

//! Generic interface for flash storage access.

use core::result::Result;

/// Read access to the memory-mapped NOR flash the boot images live in. It is expected
/// that drivers for the flash controller would implement this trait.
///
/// Addresses are absolute bus addresses, the same values stored in image
/// headers and in the OTA descriptor table.
pub trait FlashStorage {
    /// Read from the flash storage, filling the provided buffer with data
    fn read(&self, buffer: &mut [u8], address: u32) -> Result<(), FlashDrvError>;

    /// Returns the first address mapped by the device.
    fn base(&self) -> u32;

    /// Returns the size of the flash storage in bytes.
    fn capacity(&self) -> u32;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FlashDrvError {
    // Reserved value, for when "no error" / "success" should be
    // encoded in the same numeric representation as FlashDrvError
    //
    // Ok(()) = 0,
    /// Generic failure condition
    FAIL = 1,
    /// An invalid parameter was passed
    INVAL = 6,
    /// Parameter passed was too large
    SIZE = 7,
}
