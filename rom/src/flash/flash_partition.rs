// Licensed under the Apache-2.0 license

use bee_config::flash::FlashRegion;

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Represents a configured region within the flash memory.
///
/// A `FlashPartition` provides a bounded read view of one OTA bank or the
/// temporary area. Each partition is associated with a base address and a
/// length, and every read is checked to stay inside the partition so
/// a corrupted header can never steer the ROM outside the region it was
/// found in.
///
/// # Fields
/// - `driver`: Reference to the flash storage controller driver.
/// - `base`: Absolute address of the first byte of the partition.
/// - `length`: The size of the partition in bytes.
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    base: u32,
    length: u32,
}

impl<'a> FlashPartition<'a> {
    /// Creates a new `FlashPartition` instance for a configured region.
    ///
    /// # Arguments
    ///
    /// * `driver` - Reference to the flash storage controller.
    /// * `region` - The region of the flash layout this partition covers.
    ///
    /// # Returns
    ///
    /// Returns `Ok(FlashPartition)` if the region is mapped by the device,
    /// otherwise returns `Err(FlashDrvError::SIZE)`.
    pub fn new(driver: &'a dyn FlashStorage, region: &FlashRegion) -> Result<Self, FlashDrvError> {
        let device_end = driver
            .base()
            .checked_add(driver.capacity())
            .ok_or(FlashDrvError::SIZE)?;
        let end = region
            .base
            .checked_add(region.size)
            .ok_or(FlashDrvError::SIZE)?;
        if region.base < driver.base() || end > device_end {
            return Err(FlashDrvError::SIZE);
        }
        Ok(FlashPartition {
            driver,
            base: region.base,
            length: region.size,
        })
    }

    /// Reads data from the partition into the provided buffer, starting at
    /// the absolute address `address`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` if the read operation is successful.
    /// Returns `Err(FlashDrvError::SIZE)` if the requested range leaves the partition, or propagates errors from the underlying flash controller.
    pub fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        if !self.contains(address, buf.len() as u32) {
            return Err(FlashDrvError::SIZE);
        }
        self.driver.read(buf, address)
    }

    /// Streams `len` bytes starting at `address` through `f`, one
    /// `buf`-sized chunk at a time.
    pub fn read_chunked<E>(
        &self,
        address: u32,
        len: u32,
        buf: &mut [u8],
        mut f: impl FnMut(&[u8]) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<FlashDrvError>,
    {
        if !self.contains(address, len) || buf.is_empty() {
            return Err(FlashDrvError::SIZE.into());
        }
        let mut offset = 0u32;
        while offset < len {
            let n = core::cmp::min(buf.len() as u32, len - offset) as usize;
            self.driver.read(&mut buf[..n], address + offset)?;
            f(&buf[..n])?;
            offset += n as u32;
        }
        Ok(())
    }

    pub fn contains(&self, address: u32, len: u32) -> bool {
        if address < self.base {
            return false;
        }
        match address.checked_add(len) {
            Some(end) => end <= self.base + self.length,
            None => false,
        }
    }
}
