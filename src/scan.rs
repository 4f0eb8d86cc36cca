//! Pointer discovery and catalog construction.
//!
//! An SCN container opens with a pointer table and ends with a block of
//! null-terminated strings. The boundary between the two is given by the
//! anchor pointer: a 2-byte little-endian value at a fixed offset whose
//! value is the file offset where the text region begins. Everything below
//! that value is table, everything at or above it is text.
//!
//! The sweep here is deliberately permissive: any aligned-or-not 2-byte
//! value that lands on a null-terminated span inside the text region is
//! kept as a candidate. Whether a candidate is real dialogue is a separate
//! question answered by [`crate::classify`].

use crate::codec;
use crate::types::{Catalog, ScnError, StringRecord};
use memchr::memchr;
use std::collections::BTreeMap;

/// Safely read a u16 in little-endian from a slice at a given offset.
///
/// Returns `None` if there aren't enough bytes available.
#[inline]
fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2)?
        .try_into()
        .ok()
        .map(u16::from_le_bytes)
}

/// Scan a container image and build the catalog of referenced strings.
///
/// Reads the anchor pointer at `anchor_offset` to find where the text
/// region starts, then interprets every byte offset in the table region as
/// a potential 2-byte little-endian pointer. An offset `i` is accepted as a
/// pointer location when its value lands inside the text region and the
/// target is null-terminated within the image. Accepted pointers are
/// grouped by target, so a string referenced from several table slots
/// yields a single record listing all of them.
///
/// # Errors
///
/// [`ScnError::ImageTooSmall`] when the image cannot hold the anchor
/// pointer, and [`ScnError::NoPointersFound`] when the sweep accepts
/// nothing — the latter means the file does not match this layout, not
/// that it is corrupt.
pub fn scan_image(data: &[u8], anchor_offset: usize) -> Result<Catalog, ScnError> {
    let Some(anchor) = read_u16_le(data, anchor_offset) else {
        return Err(ScnError::ImageTooSmall {
            len: data.len(),
            anchor_offset,
        });
    };
    let text_start = anchor as usize;

    // Last offset whose 2-byte read stays inside the table region.
    let sweep_end = text_start.saturating_sub(2);

    let mut by_target: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for location in 0..sweep_end {
        let Some(value) = read_u16_le(data, location) else {
            continue;
        };
        let target = value as usize;
        if target < text_start || target >= data.len() {
            continue;
        }
        if memchr(0, &data[target..]).is_none() {
            continue;
        }
        by_target.entry(target).or_default().push(location);
    }

    if by_target.is_empty() {
        return Err(ScnError::NoPointersFound);
    }

    // BTreeMap iteration gives the catalog its source-offset ordering; the
    // sweep order gives each record ascending, duplicate-free locations.
    Ok(by_target
        .into_iter()
        .map(|(source_offset, pointer_locations)| StringRecord {
            source_offset,
            pointer_locations,
            tagged_text: codec::decode_at(data, source_offset),
        })
        .collect())
}
