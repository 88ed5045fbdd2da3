// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use strobe_common::protocol::BAUD_RATE;
use strobe_common::Layout;

use crate::commands::{self, Pacing};
use crate::image::Image;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "strobe-upload")]
#[command(about = "Firmware upload tool for the strobe DMX bootloader")]
pub struct Cli {
    /// Serial port wired to the DMX line (e.g., /dev/ttyUSB0)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Line rate in baud
    #[arg(long, global = true, default_value_t = BAUD_RATE)]
    pub baud: u32,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flash geometry of the target.
#[derive(Args)]
pub struct LayoutArgs {
    /// Address of page 0 (hex accepted)
    #[arg(long, global = true, default_value = "0x10006000", value_parser = parse_u32)]
    pub page_base: u32,

    /// First page not reserved for the bootloader
    #[arg(long, global = true, default_value_t = 128)]
    pub app_start_page: u8,
}

impl LayoutArgs {
    pub fn layout(&self) -> Layout {
        Layout {
            page_base: self.page_base,
            application_start_page: self.app_start_page,
        }
    }
}

/// Image selection shared by the subcommands that take a file.
#[derive(Args)]
pub struct ImageArgs {
    /// Firmware image (.hex for Intel HEX, anything else is raw binary)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Page a raw binary starts at (defaults to the first application page)
    #[arg(long)]
    pub base_page: Option<u8>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Send an image to the bootloader, then the end-of-image frame
    Upload {
        #[command(flatten)]
        image: ImageArgs,

        /// Pause after each page frame while the device programs flash
        #[arg(long, default_value_t = 250)]
        page_delay_ms: u64,

        /// Pause between bytes of a frame
        #[arg(long, default_value_t = 0)]
        byte_delay_us: u64,
    },

    /// Show the address span of an image and the space it uses
    Info {
        #[command(flatten)]
        image: ImageArgs,
    },

    /// Run an upload through the bootloader logic against an in-memory flash
    Simulate {
        #[command(flatten)]
        image: ImageArgs,
    },

    /// Send a line break so the device leaves update mode and boots
    Exit,
}

fn parse_u32(s: &str) -> Result<u32> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("Invalid address {}", s))
}

fn open(cli_port: Option<&str>, baud: u32) -> Result<Transport> {
    let port = cli_port.context("--port is required for this command")?;
    Transport::new(port, baud)
}

fn load(args: &ImageArgs, layout: &Layout) -> Result<Image> {
    Image::load(&args.file, layout, args.base_page)
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let layout = cli.layout.layout();

    match cli.command {
        Commands::Upload {
            image,
            page_delay_ms,
            byte_delay_us,
        } => {
            let firmware = load(&image, &layout)?;
            let mut transport = open(cli.port.as_deref(), cli.baud)?;
            let pacing = Pacing {
                page_delay: Duration::from_millis(page_delay_ms),
                byte_delay: Duration::from_micros(byte_delay_us),
            };
            commands::upload(&mut transport, &firmware, &image.file, pacing)
        }
        Commands::Info { image } => commands::info(&load(&image, &layout)?, &layout),
        Commands::Simulate { image } => commands::simulate(&load(&image, &layout)?, &layout),
        Commands::Exit => commands::exit(&mut open(cli.port.as_deref(), cli.baud)?),
    }
}
