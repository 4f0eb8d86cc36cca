//! # scnpack - SCN script-container string engine
//!
//! This library locates, decodes, classifies, and repacks the string table
//! of SCN script containers: a fixed-size region of 2-byte little-endian
//! pointers followed by a block of null-terminated, single-byte-encoded
//! text with embedded control codes.
//!
//! ## Background
//!
//! The container carries no directory of its strings. The only reliable
//! landmark is the anchor pointer: a table slot at a fixed offset whose
//! value is where the text region begins. Everything below that value is
//! pointer table, and any 2-byte value in it that lands on a
//! null-terminated span of the text region *might* be a string reference.
//! Extraction therefore runs in two phases: a permissive structural sweep
//! ([`scan_image`]) that collects every candidate, and a heuristic pass
//! ([`classify`]) that separates genuine dialogue from incidental byte
//! noise — including fragments discovered through pointers into the middle
//! of longer strings.
//!
//! Edited text goes back in through [`repack_image`], which rebuilds the
//! text block with every pointer relocated while carrying the original
//! terminator and padding bytes through verbatim.
//!
//! ## Usage
//!
//! ```no_run
//! use scnpack::{extract_catalog_with_options, ExtractOptions, FilterVariant};
//!
//! let data = std::fs::read("SCENE01.SCN").unwrap();
//! let opts = ExtractOptions::new().with_noise_filter(FilterVariant::Dump);
//! let catalog = extract_catalog_with_options(&data, &opts).unwrap();
//!
//! for record in &catalog {
//!     println!("{:#06x}: {}", record.source_offset, record.tagged_text);
//! }
//! ```

pub mod catalog;
pub mod classify;
pub mod codec;
pub mod repack;
pub mod scan;
pub mod types;

pub use catalog::{parse_catalog, render_catalog, CatalogEntry, ParsedCatalog, PointerRef};
pub use classify::{
    filter_catalog, filter_texts, partition_catalog, verdict, FilterConfig, FilterRule,
    FilterVariant, FilterVerdict,
};
pub use codec::{decode_at, encode, NEWLINE_BYTE};
pub use repack::repack_image;
pub use scan::scan_image;
pub use types::{Catalog, ScnError, StringRecord};

/// Anchor pointer offset used by the SCN container family.
pub const DEFAULT_ANCHOR_OFFSET: usize = 0x0A;

/// Options for catalog extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Offset of the anchor pointer
    pub anchor_offset: usize,
    /// Run the noise filter on the scanned catalog. Default: false for
    /// library use, so clients see the full candidate population.
    pub filter_noise: bool,
    /// Rule set used when filtering
    pub variant: FilterVariant,
    /// Thresholds used when filtering
    pub filter: FilterConfig,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            anchor_offset: DEFAULT_ANCHOR_OFFSET,
            filter_noise: false,
            variant: FilterVariant::Dump,
            filter: FilterConfig::default(),
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anchor_offset(mut self, offset: usize) -> Self {
        self.anchor_offset = offset;
        self
    }

    /// Enable noise filtering with the given rule-set variant.
    pub fn with_noise_filter(mut self, variant: FilterVariant) -> Self {
        self.filter_noise = true;
        self.variant = variant;
        self
    }

    pub fn with_filter_config(mut self, config: FilterConfig) -> Self {
        self.filter = config;
        self
    }
}

/// Scan a container with the default anchor offset and no filtering.
pub fn extract_catalog(data: &[u8]) -> Result<Catalog, ScnError> {
    extract_catalog_with_options(data, &ExtractOptions::new())
}

/// Scan a container and optionally filter the catalog.
pub fn extract_catalog_with_options(
    data: &[u8],
    opts: &ExtractOptions,
) -> Result<Catalog, ScnError> {
    let catalog = scan::scan_image(data, opts.anchor_offset)?;
    if opts.filter_noise {
        Ok(classify::filter_catalog(catalog, &opts.filter, opts.variant))
    } else {
        Ok(catalog)
    }
}
