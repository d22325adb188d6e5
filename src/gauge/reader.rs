//! # Register Reader
//!
//! Reads fuel-gauge registers with `i2cget` over a [`RemoteShell`].
//!
//! Each read is a single round trip:
//!
//! ```text
//! i2cget -f -y <bus> <device> <register> w   ->   "0x1a2b\n"
//! ```
//!
//! The output is trimmed and decoded with the matching [`codec`] decoder. By default any
//! failure is returned immediately; a [`ReadRetryPolicy`] can allow a bounded
//! number of retries for links that occasionally drop a command.

use std::time::Duration;
use tracing::{debug, warn};

use super::codec;
use crate::config::DeviceConfig;
use crate::error::Result;
use crate::remote::RemoteShell;

/// How many times a failed register read is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadRetryPolicy {
    /// Retries after the first attempt (0 = fail fast)
    pub max_retries: u32,
    /// Pause before each retry
    pub delay: Duration,
}

/// Register reader bound to one bus and device address
pub struct RegisterReader<S> {
    shell: S,
    i2c_bus: u8,
    device_address: u8,
    retry: ReadRetryPolicy,
}

impl<S: RemoteShell> RegisterReader<S> {
    /// Create a reader for the device described by `device`
    pub fn new(shell: S, device: &DeviceConfig, retry: ReadRetryPolicy) -> Self {
        Self {
            shell,
            i2c_bus: device.i2c_bus,
            device_address: device.device_address,
            retry,
        }
    }

    /// Build the `i2cget` word-read command for `address`
    pub fn read_command(&self, address: u8) -> String {
        format!(
            "i2cget -f -y {} {:#x} {:#x} w",
            self.i2c_bus, self.device_address, address
        )
    }

    /// Read and decode one register
    ///
    /// # Arguments
    ///
    /// * `address` - Register address
    /// * `signed` - Decode as two's complement
    ///
    /// # Errors
    ///
    /// Returns `Command` if the remote command fails, `Parse` if its output is
    /// not a 16-bit hex word. With a retry policy, the last error is returned
    /// once all retries are used up.
    pub async fn read(&self, address: u8, signed: bool) -> Result<i32> {
        self.read_with(address, |raw| codec::decode(raw, signed)).await
    }

    /// Read an unsigned register
    pub async fn read_unsigned(&self, address: u8) -> Result<u16> {
        self.read_with(address, codec::decode_unsigned).await
    }

    /// Read a two's complement register
    pub async fn read_signed(&self, address: u8) -> Result<i16> {
        self.read_with(address, codec::decode_signed).await
    }

    async fn read_with<T, D>(&self, address: u8, decode: D) -> Result<T>
    where
        T: std::fmt::Debug,
        D: Fn(&str) -> Result<T>,
    {
        let command = self.read_command(address);
        let mut attempt = 0;

        loop {
            match self.read_once(&command, &decode).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "Read of register {:#04x} failed ({}), retry {}/{}",
                        address, e, attempt, self.retry.max_retries
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_once<T, D>(&self, command: &str, decode: &D) -> Result<T>
    where
        T: std::fmt::Debug,
        D: Fn(&str) -> Result<T>,
    {
        let stdout = self.shell.run(command).await?;
        let value = decode(stdout.trim())?;
        debug!("{} -> {:?}", command, value);
        Ok(value)
    }
}
