//! Core types for SCN string-table processing.
//!
//! This module defines the data structures shared by the scanner, the
//! heuristic classifier, and the repack engine.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// One unique string discovered in the text region of a container.
///
/// A record is keyed by `source_offset`; several pointer-table entries may
/// reference the same string, so `pointer_locations` is a deduplicated,
/// ascending list. Records are never mutated in place: classification keeps
/// or drops whole records, and repacking derives new bytes from
/// `tagged_text` without touching the record itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringRecord {
    /// Byte offset of the string's first byte in the original image
    pub source_offset: usize,
    /// Pointer-table offsets whose 2-byte value references this string
    pub pointer_locations: Vec<usize>,
    /// Decoded text: literal characters, real line breaks for the newline
    /// control byte, and `<HEX=XX>` tags for opaque control codes
    pub tagged_text: String,
}

/// All records discovered in one container, sorted by `source_offset`.
///
/// The ascending order is load-bearing: repacking uses each record's
/// successor in the original layout to know how much terminator/padding to
/// carry over verbatim.
pub type Catalog = Vec<StringRecord>;

/// Errors surfaced by scanning, parsing, and repacking.
///
/// Each variant is scoped to a single file; batch callers report the
/// failure and continue with the next input.
#[derive(Debug, Error)]
pub enum ScnError {
    /// The image ends before the anchor pointer can be read.
    #[error("image is {len} bytes, too small to read the anchor pointer at {anchor_offset:#x}")]
    ImageTooSmall { len: usize, anchor_offset: usize },

    /// The pointer-table sweep produced zero candidates. Not a hard error:
    /// the file simply does not match the expected container layout.
    #[error("no valid string pointers found in the pointer-table region")]
    NoPointersFound,

    /// A block in the text catalog could not be parsed and was skipped.
    #[error("catalog block #{index} is malformed: {reason}")]
    UnparsableCatalogEntry { index: usize, reason: &'static str },

    /// A catalog file yielded no parseable entries at all.
    #[error("catalog contains no parseable string blocks")]
    EmptyCatalog,

    /// A catalog entry's offset lies outside the original image.
    #[error("record offset {offset:#x} lies outside the original image")]
    MissingSourceRecord { offset: usize },

    /// The original container paired with a catalog is not on disk.
    #[error("original container not found: {}", path.display())]
    OriginalFileMissing { path: PathBuf },

    /// A character in edited text has no single-byte encoding.
    #[error("character {ch:?} has no single-byte encoding")]
    UnencodableChar { ch: char },

    /// A relocated string landed past what a 2-byte pointer can address.
    #[error("relocated string offset {offset:#x} does not fit in a 16-bit pointer")]
    PointerOverflow { offset: usize },
}
