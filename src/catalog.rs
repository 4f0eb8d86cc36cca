//! The hand-editable text form of a catalog.
//!
//! One block per string: an index for humans, the immutable original
//! offset, the table slots that reference it, the tagged text body, and an
//! `<END>` marker. Translators edit the body and nothing else; the repack
//! stage parses the blocks back. The decoration around the fields is
//! cosmetic — the parser only needs the offset, the pointer locations, and
//! the body, and quietly skips blocks where those cannot be recovered.

use crate::types::{ScnError, StringRecord};
use regex::Regex;

/// Line separating blocks in the text form.
pub const BLOCK_SEPARATOR: &str = "####################################";

/// Marker closing a text body.
pub const END_MARKER: &str = "<END>";

/// One pointer-table slot referencing a string, with the 2-byte value as
/// it was stored there (decorative in the text form; repack recomputes
/// every pointer from scratch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRef {
    /// Absolute offset of the slot in the pointer-table region
    pub location: usize,
    /// Original bytes at the slot, in stored order; `None` when the text
    /// form carried no value clause
    pub stored: Option<[u8; 2]>,
}

/// One block of the text catalog, as rendered or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// String offset in the original image
    pub source_offset: usize,
    /// Table slots that referenced the string
    pub pointers: Vec<PointerRef>,
    /// Tagged text body (line breaks are real line breaks here)
    pub text: String,
}

impl CatalogEntry {
    /// Build an entry from a scanned record, capturing the stored pointer
    /// bytes out of the image for the `(Value: ...)` clauses.
    pub fn from_record(record: &StringRecord, data: &[u8]) -> Self {
        let pointers = record
            .pointer_locations
            .iter()
            .map(|&location| PointerRef {
                location,
                stored: data
                    .get(location..location + 2)
                    .map(|bytes| [bytes[0], bytes[1]]),
            })
            .collect();
        CatalogEntry {
            source_offset: record.source_offset,
            pointers,
            text: record.tagged_text.clone(),
        }
    }
}

/// Result of parsing a catalog text file: the recovered entries plus the
/// per-block failures that were skipped over.
#[derive(Debug, Default)]
pub struct ParsedCatalog {
    pub entries: Vec<CatalogEntry>,
    pub skipped: Vec<ScnError>,
}

/// Render entries into the editable text form.
///
/// Block indices are assigned here, 1-based in entry order, so a filtered
/// catalog comes out renumbered while every `String Offset` line still
/// names the original location.
pub fn render_catalog(entries: &[CatalogEntry], source_name: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Dump of {source_name}\n\n"));
    out.push_str(&format!("// Strings: {}\n\n", entries.len()));

    for (index, entry) in entries.iter().enumerate() {
        out.push_str(BLOCK_SEPARATOR);
        out.push('\n');
        out.push_str(&format!("// STRING #{}\n", index + 1));
        out.push_str(&format!("// String Offset: 0x{:08X}\n", entry.source_offset));
        for pointer in &entry.pointers {
            match pointer.stored {
                Some([lo, hi]) => out.push_str(&format!(
                    "// -> Referenced by: 0x{:08X} (Value: {lo:02X}{hi:02X})\n",
                    pointer.location
                )),
                None => out.push_str(&format!(
                    "// -> Referenced by: 0x{:08X}\n",
                    pointer.location
                )),
            }
        }
        out.push_str(&format!("\n{}\n\n{END_MARKER}\n", entry.text));
        out.push_str(BLOCK_SEPARATOR);
        out.push_str("\n\n");
    }

    out
}

/// Parse the text form back into entries.
///
/// Splits on the block separator and recovers each block independently; a
/// block missing its offset or its `<END>` marker is recorded in
/// `skipped` and does not disturb its neighbors.
pub fn parse_catalog(content: &str) -> ParsedCatalog {
    let offset_re = Regex::new(r"// String Offset:\s*0x([0-9A-Fa-f]{1,8})").unwrap();
    let pointer_re = Regex::new(
        r"// -> Referenced by:\s*0x([0-9A-Fa-f]{1,8})(?:\s*\(Value:\s*([0-9A-Fa-f]{4})\))?",
    )
    .unwrap();
    let body_re = Regex::new(r"(?s)\n\n(.*?)\n\n<END>").unwrap();

    let mut parsed = ParsedCatalog::default();
    let mut index = 0;

    for block in content.split(BLOCK_SEPARATOR) {
        if block.trim().is_empty() || !block.contains("// STRING #") {
            continue;
        }
        index += 1;

        let Some(offset_cap) = offset_re.captures(block) else {
            parsed.skipped.push(ScnError::UnparsableCatalogEntry {
                index,
                reason: "missing string offset",
            });
            continue;
        };
        let Ok(source_offset) = usize::from_str_radix(&offset_cap[1], 16) else {
            parsed.skipped.push(ScnError::UnparsableCatalogEntry {
                index,
                reason: "unreadable string offset",
            });
            continue;
        };

        let Some(body_cap) = body_re.captures(block) else {
            parsed.skipped.push(ScnError::UnparsableCatalogEntry {
                index,
                reason: "missing text body or <END> marker",
            });
            continue;
        };

        let pointers = pointer_re
            .captures_iter(block)
            .filter_map(|cap| {
                let location = usize::from_str_radix(&cap[1], 16).ok()?;
                let stored = cap.get(2).and_then(|value| {
                    let digits = value.as_str();
                    let lo = u8::from_str_radix(&digits[..2], 16).ok()?;
                    let hi = u8::from_str_radix(&digits[2..], 16).ok()?;
                    Some([lo, hi])
                });
                Some(PointerRef { location, stored })
            })
            .collect();

        parsed.entries.push(CatalogEntry {
            source_offset,
            pointers,
            text: body_cap[1].to_string(),
        });
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(offset: usize, locations: &[usize], text: &str) -> CatalogEntry {
        CatalogEntry {
            source_offset: offset,
            pointers: locations
                .iter()
                .map(|&location| PointerRef {
                    location,
                    stored: Some([(offset & 0xFF) as u8, (offset >> 8) as u8]),
                })
                .collect(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_render_then_parse_round_trips() {
        let entries = vec![
            entry(0x0C, &[0x00], "Hi\nBye"),
            entry(0x20, &[0x02, 0x06], "Second line<HEX=1B>"),
        ];

        let rendered = render_catalog(&entries, "SCENE01.SCN");
        let parsed = parse_catalog(&rendered);

        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.entries, entries);
    }

    #[test]
    fn test_render_numbers_blocks_in_order() {
        let entries = vec![entry(0x30, &[0], "One"), entry(0x40, &[2], "Two")];
        let rendered = render_catalog(&entries, "x");
        assert!(rendered.contains("// STRING #1"));
        assert!(rendered.contains("// STRING #2"));
        assert!(rendered.contains("// String Offset: 0x00000030"));
        assert!(rendered.contains("// String Offset: 0x00000040"));
    }

    #[test]
    fn test_render_value_clause_uses_stored_byte_order() {
        let entries = vec![CatalogEntry {
            source_offset: 0x0C,
            pointers: vec![PointerRef {
                location: 0,
                stored: Some([0x0C, 0x00]),
            }],
            text: "Hi".to_string(),
        }];
        let rendered = render_catalog(&entries, "x");
        assert!(rendered.contains("(Value: 0C00)"));
    }

    #[test]
    fn test_parse_skips_block_without_offset() {
        let entries = vec![entry(0x0C, &[0], "Hi")];
        let mut rendered = render_catalog(&entries, "x");
        rendered = rendered.replace("// String Offset: 0x0000000C", "// String Offset: ???");

        let parsed = parse_catalog(&rendered);
        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
        assert!(matches!(
            parsed.skipped[0],
            ScnError::UnparsableCatalogEntry { index: 1, .. }
        ));
    }

    #[test]
    fn test_parse_skips_block_without_end_marker() {
        let entries = vec![entry(0x0C, &[0], "Hi"), entry(0x20, &[2], "Fine day")];
        let rendered = render_catalog(&entries, "x");
        let broken = rendered.replacen(END_MARKER, "<--->", 1);

        let parsed = parse_catalog(&broken);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].source_offset, 0x20);
        assert_eq!(parsed.skipped.len(), 1);
    }

    #[test]
    fn test_parse_tolerates_missing_value_clause() {
        let text = format!(
            "{BLOCK_SEPARATOR}\n// STRING #1\n// String Offset: 0x0000000C\n\
             // -> Referenced by: 0x00000000\n\nHi\n\n<END>\n{BLOCK_SEPARATOR}\n"
        );
        let parsed = parse_catalog(&text);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].pointers[0].stored, None);
    }

    #[test]
    fn test_parse_empty_body() {
        let entries = vec![entry(0x0C, &[0], "")];
        let rendered = render_catalog(&entries, "x");
        let parsed = parse_catalog(&rendered);
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].text, "");
    }

    #[test]
    fn test_parse_multiline_body_with_blank_lines_before_end() {
        // The body capture is non-greedy: it stops at the first blank line
        // followed by <END>, keeping interior line breaks.
        let entries = vec![entry(0x0C, &[0], "Line one\nLine two")];
        let rendered = render_catalog(&entries, "x");
        let parsed = parse_catalog(&rendered);
        assert_eq!(parsed.entries[0].text, "Line one\nLine two");
    }

    #[test]
    fn test_parse_ignores_header_chatter() {
        let entries = vec![entry(0x0C, &[0], "Hi")];
        let rendered = render_catalog(&entries, "SCENE01.SCN");
        assert!(rendered.starts_with("// Dump of SCENE01.SCN"));
        let parsed = parse_catalog(&rendered);
        assert_eq!(parsed.entries.len(), 1);
    }
}
