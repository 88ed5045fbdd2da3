// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport for the DMX line. Transmit only: the bootloader never answers.

use anyhow::{Context, Result};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Default timeout for serial operations in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// How long the line is held in break. DMX512 requires at least 88 us.
pub const BREAK_DURATION: Duration = Duration::from_millis(1);

pub struct Transport {
    port: Box<dyn SerialPort>,
}

impl Transport {
    /// Open `port_name` at `baud_rate`, 8N2.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self { port })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Write a frame, optionally pausing between bytes.
    pub fn send(&mut self, frame: &[u8], byte_delay: Duration) -> Result<()> {
        if byte_delay.is_zero() {
            self.port
                .write_all(frame)
                .context("Failed to write to serial port")?;
        } else {
            for byte in frame {
                self.port
                    .write_all(std::slice::from_ref(byte))
                    .context("Failed to write to serial port")?;
                self.port.flush()?;
                thread::sleep(byte_delay);
            }
        }
        self.port.flush()?;
        Ok(())
    }

    /// Hold the line in break, which makes the bootloader leave update mode.
    pub fn send_break(&mut self) -> Result<()> {
        self.port.set_break().context("Failed to assert break")?;
        thread::sleep(BREAK_DURATION);
        self.port.clear_break().context("Failed to release break")?;
        Ok(())
    }
}
