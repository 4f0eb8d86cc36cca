//! Container reconstruction from an edited catalog.
//!
//! The pointer-table region is copied from the original byte for byte and
//! keeps its exact length; only the 2-byte values inside it change. The
//! text region is rebuilt string by string: each entry's edited text is
//! re-encoded, then the span from the original terminator up to the next
//! string's original start is carried over verbatim, so terminators,
//! padding zeros, and any orphaned bytes between strings survive
//! untouched. Nothing is ever synthesized: if the original had no null
//! before the next string, the rebuilt text block gets none either.

use crate::catalog::CatalogEntry;
use crate::codec;
use crate::types::ScnError;
use memchr::memchr;

/// Rebuild a container from its original image and an edited catalog.
///
/// Entries are processed in ascending original-offset order (re-sorted
/// here to re-establish the invariant on hand-edited input). The text
/// region's start address stays equal to its original start; only the
/// internal layout shifts as edited strings grow or shrink. Every pointer
/// location named by an entry is rewritten with the string's new offset.
///
/// # Errors
///
/// [`ScnError::EmptyCatalog`] for an entry-less catalog,
/// [`ScnError::MissingSourceRecord`] when an entry's offset lies outside
/// the original image, [`ScnError::UnencodableChar`] when edited text
/// cannot be re-encoded, and [`ScnError::PointerOverflow`] when a
/// relocated string lands past 16-bit pointer range.
pub fn repack_image(original: &[u8], entries: &[CatalogEntry]) -> Result<Vec<u8>, ScnError> {
    if entries.is_empty() {
        return Err(ScnError::EmptyCatalog);
    }

    let mut ordered: Vec<&CatalogEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.source_offset);

    for entry in &ordered {
        if entry.source_offset >= original.len() {
            return Err(ScnError::MissingSourceRecord {
                offset: entry.source_offset,
            });
        }
    }

    // The table region runs up to the first surviving string; everything
    // in it (including any text bytes of strings the filter dropped) is
    // preserved as-is.
    let first_offset = ordered[0].source_offset;
    let mut table = original[..first_offset].to_vec();

    let mut text_block: Vec<u8> = Vec::new();
    let mut new_offsets: Vec<usize> = Vec::with_capacity(ordered.len());
    let mut current = first_offset;

    for (k, entry) in ordered.iter().enumerate() {
        new_offsets.push(current);

        let encoded = codec::encode(&entry.text)?;
        text_block.extend_from_slice(&encoded);
        current += encoded.len();

        // Carry the original terminator and padding through verbatim.
        let next_start = ordered
            .get(k + 1)
            .map_or(original.len(), |next| next.source_offset);
        if let Some(rel) = memchr(0, &original[entry.source_offset..]) {
            let first_zero = entry.source_offset + rel;
            if first_zero < next_start {
                let tail = &original[first_zero..next_start];
                text_block.extend_from_slice(tail);
                current += tail.len();
            }
        }
    }

    for (entry, &new_offset) in ordered.iter().zip(&new_offsets) {
        let value = u16::try_from(new_offset)
            .map_err(|_| ScnError::PointerOverflow { offset: new_offset })?;
        for pointer in &entry.pointers {
            if pointer.location + 2 <= table.len() {
                table[pointer.location..pointer.location + 2]
                    .copy_from_slice(&value.to_le_bytes());
            }
        }
    }

    table.extend_from_slice(&text_block);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PointerRef;
    use crate::scan::scan_image;

    fn entry(offset: usize, locations: &[usize], text: &str) -> CatalogEntry {
        CatalogEntry {
            source_offset: offset,
            pointers: locations
                .iter()
                .map(|&location| PointerRef {
                    location,
                    stored: None,
                })
                .collect(),
            text: text.to_string(),
        }
    }

    /// Table of 0x10 bytes with pointers at 0 and 2; "Hello" 0x00 0x00
    /// 0x00 0x00 then "World" 0x00.
    fn two_string_image() -> Vec<u8> {
        let mut data = vec![0u8; 0x10];
        data[0x0A] = 0x10; // anchor -> text start
        data[0] = 0x10; // -> "Hello"
        data[2] = 0x19; // -> "World"
        data.extend_from_slice(b"Hello");
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        data.extend_from_slice(b"World");
        data.push(0x00);
        data
    }

    #[test]
    fn test_repack_unedited_is_identity() {
        let original = two_string_image();
        let entries = vec![
            entry(0x10, &[0], "Hello"),
            entry(0x19, &[2], "World"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_repack_shrinking_text_preserves_padding_span() {
        let original = two_string_image();
        let entries = vec![
            entry(0x10, &[0], "Hi"),
            entry(0x19, &[2], "World"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");

        // Table region preserved byte for byte outside the rewritten slots.
        assert_eq!(&rebuilt[4..0x10], &original[4..0x10]);
        // "Hi" followed by the original 4-byte terminator+padding span.
        assert_eq!(&rebuilt[0x10..0x12], b"Hi");
        assert_eq!(&rebuilt[0x12..0x16], &[0x00, 0x00, 0x00, 0x00]);
        // Second string relocated three bytes down, pointer follows.
        assert_eq!(&rebuilt[0x16..0x1B], b"World");
        assert_eq!(u16::from_le_bytes([rebuilt[2], rebuilt[3]]), 0x16);
        // Whole file shrank by exactly the text difference.
        assert_eq!(rebuilt.len(), original.len() - 3);
    }

    #[test]
    fn test_repack_growing_text_relocates_pointers() {
        let original = two_string_image();
        let entries = vec![
            entry(0x10, &[0], "Hello there"),
            entry(0x19, &[2], "World"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");

        assert_eq!(u16::from_le_bytes([rebuilt[0], rebuilt[1]]), 0x10);
        let second = u16::from_le_bytes([rebuilt[2], rebuilt[3]]) as usize;
        assert_eq!(second, 0x10 + "Hello there".len() + 4);
        assert_eq!(&rebuilt[second..second + 5], b"World");
    }

    #[test]
    fn test_repack_pointer_closure_via_rescan() {
        // Every pointer in the rebuilt image lands on a string that
        // decodes back to the entry's text.
        let original = two_string_image();
        let entries = vec![
            entry(0x10, &[0], "Hiya\nfriend"),
            entry(0x19, &[2], "Planet<HEX=07>"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");

        let catalog = scan_image(&rebuilt, 0x0A).expect("rescan");
        let texts: Vec<&str> = catalog.iter().map(|r| r.tagged_text.as_str()).collect();
        assert!(texts.contains(&"Hiya\nfriend"));
        assert!(texts.contains(&"Planet<HEX=07>"));
    }

    #[test]
    fn test_repack_no_terminator_before_next_string_appends_nothing() {
        // "AB" runs straight into "CD" with no null in between; the
        // original gap bytes must not be invented on the way out.
        let mut original = vec![0u8; 0x10];
        original[0x0A] = 0x10;
        original[0] = 0x10;
        original[2] = 0x12;
        original.extend_from_slice(b"AB");
        original.extend_from_slice(b"CD");
        original.push(0x00);

        let entries = vec![entry(0x10, &[0], "ABX"), entry(0x12, &[2], "CD")];
        let rebuilt = repack_image(&original, &entries).expect("repack");

        // First entry contributes its text only; no null was copied
        // because the first null in the original sits past 0x12.
        assert_eq!(&rebuilt[0x10..0x13], b"ABX");
        assert_eq!(&rebuilt[0x13..0x15], b"CD");
        assert_eq!(rebuilt[0x15], 0x00);
        assert_eq!(u16::from_le_bytes([rebuilt[2], rebuilt[3]]), 0x13);
    }

    #[test]
    fn test_repack_unterminated_last_string() {
        let mut original = vec![0u8; 0x10];
        original[0x0A] = 0x10;
        original[0] = 0x10;
        original.extend_from_slice(b"Tail");

        let entries = vec![entry(0x10, &[0], "Tails")];
        let rebuilt = repack_image(&original, &entries).expect("repack");

        // No null in the original text region: none appears in the output.
        assert_eq!(&rebuilt[0x10..], b"Tails");
    }

    #[test]
    fn test_repack_sorts_entries_before_walking() {
        let original = two_string_image();
        let entries = vec![
            entry(0x19, &[2], "World"),
            entry(0x10, &[0], "Hello"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_repack_empty_catalog_is_an_error() {
        let original = two_string_image();
        assert!(matches!(
            repack_image(&original, &[]),
            Err(ScnError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_repack_offset_outside_image_is_an_error() {
        let original = two_string_image();
        let entries = vec![entry(0x1000, &[0], "Ghost")];
        assert!(matches!(
            repack_image(&original, &entries),
            Err(ScnError::MissingSourceRecord { offset: 0x1000 })
        ));
    }

    #[test]
    fn test_repack_pointer_location_past_table_is_ignored() {
        // A hand-edited catalog can name a slot beyond the table region;
        // the write is skipped rather than corrupting the text block.
        let original = two_string_image();
        let entries = vec![
            entry(0x10, &[0, 0x0E0], "Hello"),
            entry(0x19, &[2], "World"),
        ];
        let rebuilt = repack_image(&original, &entries).expect("repack");
        assert_eq!(rebuilt, original);
    }
}
