// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware images and their split into page frames.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use strobe_common::protocol::{Message, PAGE_SIZE};
use strobe_common::Layout;

/// An image placed in the page window, one erased-filled buffer per touched page.
#[derive(Debug)]
pub struct Image {
    pages: BTreeMap<u8, [u8; PAGE_SIZE]>,
    min_addr: u32,
    max_addr: u32,
}

impl Image {
    /// Load Intel HEX (`.hex`/`.ihex`) or a raw binary placed at `base_page`.
    pub fn load(path: &Path, layout: &Layout, base_page: Option<u8>) -> Result<Self> {
        check_window(layout)?;

        let is_hex = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("hex") || ext.eq_ignore_ascii_case("ihex"));

        let segments = if is_hex {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_hex(&text).with_context(|| format!("Invalid hex file {}", path.display()))?
        } else {
            let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let page = base_page.unwrap_or(layout.application_start_page);
            vec![(layout.page_address(page), data)]
        };

        Self::from_segments(layout, segments)
    }

    /// Place `(address, bytes)` segments into pages.
    pub fn from_segments(layout: &Layout, segments: Vec<(u32, Vec<u8>)>) -> Result<Self> {
        check_window(layout)?;

        let mut pages = BTreeMap::new();
        let mut min_addr = u32::MAX;
        let mut max_addr = 0;

        for (start, bytes) in segments {
            for (i, &byte) in bytes.iter().enumerate() {
                let Some(addr) = u32::try_from(i).ok().and_then(|i| start.checked_add(i)) else {
                    bail!("Segment at 0x{:08x} runs past the end of the address space", start);
                };
                let page = layout
                    .page_of(addr)
                    .ok_or_else(|| anyhow!("Address 0x{:08x} is outside the page window", addr))?;
                if layout.is_protected(page) {
                    bail!(
                        "Address 0x{:08x} is in page {}, reserved for the bootloader",
                        addr,
                        page
                    );
                }
                let offset = (addr - layout.page_address(page)) as usize;
                pages.entry(page).or_insert([0xFF; PAGE_SIZE])[offset] = byte;
                min_addr = min_addr.min(addr);
                max_addr = max_addr.max(addr);
            }
        }

        if pages.is_empty() {
            bail!("Image is empty");
        }

        Ok(Self {
            pages,
            min_addr,
            max_addr,
        })
    }

    pub fn min_addr(&self) -> u32 {
        self.min_addr
    }

    pub fn max_addr(&self) -> u32 {
        self.max_addr
    }

    pub fn first_page(&self) -> u8 {
        self.pages.keys().next().copied().unwrap_or_default()
    }

    pub fn last_page(&self) -> u8 {
        self.pages.keys().next_back().copied().unwrap_or_default()
    }

    /// Contents of a page in the transmitted span; gaps read as erased.
    pub fn page(&self, page: u8) -> [u8; PAGE_SIZE] {
        self.pages.get(&page).copied().unwrap_or([0xFF; PAGE_SIZE])
    }

    /// Every page from first to last as a full-page frame, then the end-of-image frame.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = (self.first_page()..=self.last_page())
            .map(|page| Message::new(page, &self.page(page)))
            .collect();
        // Any application page will do for the marker; 255 has no successor.
        messages.push(Message::end_of_image(self.last_page().saturating_add(1)));
        messages
    }
}

fn check_window(layout: &Layout) -> Result<()> {
    if layout.page_base.checked_add(layout.window_size()).is_none() {
        bail!(
            "Page window at 0x{:08x} runs past the end of the address space",
            layout.page_base
        );
    }
    Ok(())
}

/// Flatten Intel HEX records into absolute `(address, bytes)` segments.
fn parse_hex(text: &str) -> Result<Vec<(u32, Vec<u8>)>> {
    let mut upper = 0u32;
    let mut segments = Vec::new();

    for record in ihex::Reader::new(text) {
        match record.map_err(|e| anyhow!("{:?}", e))? {
            ihex::Record::Data { offset, value } => segments.push((upper + offset as u32, value)),
            ihex::Record::ExtendedLinearAddress(addr) => upper = (addr as u32) << 16,
            ihex::Record::ExtendedSegmentAddress(seg) => upper = (seg as u32) << 4,
            ihex::Record::EndOfFile => break,
            ihex::Record::StartLinearAddress(_) | ihex::Record::StartSegmentAddress { .. } => {}
        }
    }

    Ok(segments)
}
