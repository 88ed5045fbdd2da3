// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};

use strobe_common::protocol::PAGE_SIZE;
use strobe_common::{Commit, Committer, Handoff, Layout, Receiver, SimFlash};

use crate::image::Image;
use crate::transport::Transport;

/// Transmit pacing. The line has no flow control, so the sender waits for the device.
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
    pub page_delay: Duration,
    pub byte_delay: Duration,
}

/// Send every page frame, then the end-of-image frame.
pub fn upload(transport: &mut Transport, image: &Image, file: &Path, pacing: Pacing) -> Result<()> {
    let messages = image.messages();
    let page_count = messages.len() - 1;

    println!(
        "Firmware: {} (0x{:08x}..=0x{:08x})",
        file.display(),
        image.min_addr(),
        image.max_addr()
    );
    println!(
        "Pages:    {}..={} ({} frames)",
        image.first_page(),
        image.last_page(),
        page_count
    );
    println!("Port:     {}", transport.port_name());
    println!();

    let pb = ProgressBar::new(page_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({eta})")?
            .progress_chars("#>-"),
    );

    for message in &messages[..page_count] {
        if let Err(e) = transport.send(&message.encode(), pacing.byte_delay) {
            pb.abandon();
            return Err(e.context(format!("Failed sending page {}", message.page_number)));
        }
        thread::sleep(pacing.page_delay);
        pb.inc(1);
    }
    pb.finish_with_message("Pages sent");

    let end = &messages[page_count];
    transport.send(&end.encode(), pacing.byte_delay)?;
    println!("End of image sent (page {}).", end.page_number);
    println!("The device boots the new firmware once the last page is programmed.");

    Ok(())
}

/// Print the address span of an image and how much of the application region it uses.
pub fn info(image: &Image, layout: &Layout) -> Result<()> {
    let available = layout.window_size() - layout.application_start_page as u32 * PAGE_SIZE as u32;
    let used = image.max_addr() - image.min_addr() + 1;

    println!("Min Addr: 0x{:08x}", image.min_addr());
    println!("Max Addr: 0x{:08x}", image.max_addr());
    println!("Pages:    {}..={}", image.first_page(), image.last_page());
    println!(
        "Total Space Used: {} bytes, {:.2}%",
        used,
        used as f64 / available as f64 * 100.0
    );

    Ok(())
}

/// Push the exact upload byte stream through the bootloader logic and check the result.
pub fn simulate(image: &Image, layout: &Layout) -> Result<()> {
    let handoff = Handoff::new();
    let mut receiver = Receiver::new(&handoff);
    let mut flash = Box::new(SimFlash::new(*layout));
    let mut committer = Committer::new(flash.as_mut(), &handoff, *layout);

    let mut written = 0usize;
    let mut rejected = 0usize;
    for message in image.messages() {
        for byte in message.encode() {
            receiver.on_byte(byte, false);
        }
        match committer.poll() {
            Commit::Written { .. } => written += 1,
            Commit::Rejected { page, reason } => {
                rejected += 1;
                println!("Page {} rejected: {}", page, reason);
            }
            Commit::EndOfImage => println!("End of image accepted, device would boot."),
            Commit::Idle => bail!("Frame for page {} was not framed", message.page_number),
        }
    }

    println!("Pages written: {}, rejected: {}", written, rejected);

    if !handoff.boot_requested() {
        bail!("Device would not have left update mode");
    }
    for page in image.first_page()..=image.last_page() {
        if flash.page(page) != image.page(page) {
            bail!("Page {} differs from the image after programming", page);
        }
    }
    if flash.out_of_bounds() != 0 {
        bail!("{} flash accesses fell outside a page", flash.out_of_bounds());
    }

    println!("Simulated flash matches the image.");
    Ok(())
}

/// Send a line break.
pub fn exit(transport: &mut Transport) -> Result<()> {
    transport.send_break()?;
    println!("Break sent on {}.", transport.port_name());
    Ok(())
}
