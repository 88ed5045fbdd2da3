// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware upload tool for the strobe DMX bootloader.
//!
//! Usage:
//!   strobe-upload --port /dev/ttyUSB0 upload firmware.hex
//!   strobe-upload info firmware.hex
//!   strobe-upload simulate firmware.bin --base-page 128
//!   strobe-upload --port /dev/ttyUSB0 exit

mod cli;
mod commands;
mod image;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
