//! Heuristic filters separating dialogue strings from scan noise.
//!
//! The pointer sweep is permissive on purpose, so its catalog mixes real
//! script text with byte sequences that merely look pointed-to. The rules
//! here throw the noise out: per-record rules that look at one string in
//! isolation, plus one cross-record pass that drops strings which are
//! strict fragments of a longer surviving string (a pointer into the
//! middle of a line "discovers" the line's tail as a separate record).
//!
//! Rejection is an ordinary verdict, never an error. Running the filter on
//! its own output changes nothing.

use crate::codec;
use crate::types::{Catalog, StringRecord};

/// Thresholds for the filter rules. Defaults match the values tuned
/// against the target container family.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    /// Maximum `<HEX=XX>` tags tolerated in one string
    pub max_control_codes: usize,
    /// Minimum ASCII letters required in the stripped text
    pub min_alpha_chars: usize,
    /// Minimum fraction of visible characters among all tokens
    pub min_text_ratio: f32,
    /// Stripped texts shorter than this that start lowercase are dropped
    /// by the [`FilterRule::ShortLowercase`] rule
    pub short_lowercase_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_control_codes: 3,
            min_alpha_chars: 3,
            min_text_ratio: 0.3,
            short_lowercase_len: 30,
        }
    }
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_control_codes(mut self, max: usize) -> Self {
        self.max_control_codes = max;
        self
    }

    pub fn with_min_alpha_chars(mut self, min: usize) -> Self {
        self.min_alpha_chars = min;
        self
    }

    pub fn with_min_text_ratio(mut self, ratio: f32) -> Self {
        self.min_text_ratio = ratio;
        self
    }

    pub fn with_short_lowercase_len(mut self, len: usize) -> Self {
        self.short_lowercase_len = len;
        self
    }
}

/// Which rule set to run.
///
/// The extraction stage and the refinement stage historically filtered
/// with slightly different rules; both live here as one pipeline with an
/// enumerated rule list per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVariant {
    /// Extraction-stage rules: quick noise rejection while dumping.
    Dump,
    /// Refinement-stage rules: the stricter set, including the
    /// cross-record fragment dedup.
    Refine,
}

impl FilterVariant {
    /// Per-record rules, evaluated in order; the first hit rejects.
    pub fn rules(self) -> &'static [FilterRule] {
        match self {
            FilterVariant::Dump => &[
                FilterRule::ControlDensity,
                FilterRule::EmptyAfterStrip,
                FilterRule::ShortLowercase,
                FilterRule::TextRatio,
            ],
            FilterVariant::Refine => &[
                FilterRule::ControlDensity,
                FilterRule::EmptyAfterStrip,
                FilterRule::NumericOnly,
                FilterRule::MinAlpha,
                FilterRule::LeadingChar,
                FilterRule::TextRatio,
            ],
        }
    }

    /// Whether the cross-record fragment dedup runs after the per-record
    /// rules have settled the candidate pool.
    pub fn dedups_fragments(self) -> bool {
        matches!(self, FilterVariant::Refine)
    }
}

/// A single rejection rule. Doubles as the reject reason in a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    /// Too many `<HEX=XX>` control tags
    ControlDensity,
    /// Nothing but tags, line breaks, and whitespace
    EmptyAfterStrip,
    /// Stripped text is decimal digits only
    NumericOnly,
    /// Too few ASCII letters
    MinAlpha,
    /// Starts with a lowercase letter or sentence-interior punctuation
    LeadingChar,
    /// Visible text drowned out by control tags
    TextRatio,
    /// Short and starting lowercase (extraction-stage shortcut)
    ShortLowercase,
    /// Strict contiguous substring of a longer surviving string
    SubstringFragment,
}

impl FilterRule {
    /// Short display name for diagnostics.
    pub fn short_name(&self) -> &'static str {
        match self {
            FilterRule::ControlDensity => "control-density",
            FilterRule::EmptyAfterStrip => "empty",
            FilterRule::NumericOnly => "numeric-only",
            FilterRule::MinAlpha => "few-letters",
            FilterRule::LeadingChar => "leading-char",
            FilterRule::TextRatio => "text-ratio",
            FilterRule::ShortLowercase => "short-lowercase",
            FilterRule::SubstringFragment => "fragment",
        }
    }
}

/// Outcome of classifying one string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Reject(FilterRule),
}

impl FilterVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, FilterVerdict::Accept)
    }

    /// The rule that fired, if any.
    pub fn reason(&self) -> Option<FilterRule> {
        match self {
            FilterVerdict::Accept => None,
            FilterVerdict::Reject(rule) => Some(*rule),
        }
    }
}

/// Remove emitted `<HEX=XX>` tags and line breaks, count the tags, and
/// trim surrounding whitespace from what remains.
fn strip_tags(tagged_text: &str) -> (String, usize) {
    let mut stripped = String::with_capacity(tagged_text.len());
    let mut tag_count = 0;
    let mut pos = 0;
    while pos < tagged_text.len() {
        let rest = &tagged_text[pos..];
        if codec::is_emitted_hex_tag(rest) {
            tag_count += 1;
            pos += codec::HEX_TAG_LEN;
            continue;
        }
        let Some(ch) = rest.chars().next() else { break };
        if ch != '\n' {
            stripped.push(ch);
        }
        pos += ch.len_utf8();
    }
    (stripped.trim().to_string(), tag_count)
}

fn rule_fires(rule: FilterRule, stripped: &str, tag_count: usize, config: &FilterConfig) -> bool {
    match rule {
        FilterRule::ControlDensity => tag_count > config.max_control_codes,
        FilterRule::EmptyAfterStrip => stripped.is_empty(),
        FilterRule::NumericOnly => {
            !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
        }
        FilterRule::MinAlpha => {
            let alpha = stripped.chars().filter(|c| c.is_ascii_alphabetic()).count();
            alpha < config.min_alpha_chars
        }
        FilterRule::LeadingChar => stripped
            .chars()
            .next()
            .is_some_and(|c| c.is_lowercase() || matches!(c, ',' | '.' | '?' | '!')),
        FilterRule::TextRatio => {
            let text_chars = stripped.chars().count();
            let tokens = text_chars + tag_count;
            tokens == 0 || (text_chars as f32) / (tokens as f32) < config.min_text_ratio
        }
        FilterRule::ShortLowercase => {
            stripped.chars().count() < config.short_lowercase_len
                && stripped.chars().next().is_some_and(char::is_lowercase)
        }
        // Cross-record; never fires from per-record evaluation.
        FilterRule::SubstringFragment => false,
    }
}

/// Classify one tagged text in isolation.
///
/// Runs only the per-record rules of `variant`; the fragment dedup needs
/// the whole candidate population and lives in [`filter_texts`].
pub fn verdict(tagged_text: &str, config: &FilterConfig, variant: FilterVariant) -> FilterVerdict {
    let (stripped, tag_count) = strip_tags(tagged_text);
    for &rule in variant.rules() {
        if rule_fires(rule, &stripped, tag_count, config) {
            return FilterVerdict::Reject(rule);
        }
    }
    FilterVerdict::Accept
}

/// Classify a whole candidate population, one verdict per input.
///
/// Per-record rules run first; for variants with fragment dedup, every
/// surviving text is then compared against every other survivor in both
/// directions, and a text that is a strictly shorter contiguous substring
/// of another survivor is rejected. Comparisons use the pool as it stood
/// after the per-record rules, so the outcome does not depend on scan
/// direction: in a chain of nested fragments everything but the longest
/// member goes.
pub fn filter_texts(
    texts: &[&str],
    config: &FilterConfig,
    variant: FilterVariant,
) -> Vec<FilterVerdict> {
    let mut verdicts: Vec<FilterVerdict> = texts
        .iter()
        .map(|text| verdict(text, config, variant))
        .collect();

    if variant.dedups_fragments() {
        // Stripped forms of the per-record survivors, fixed before any
        // fragment rejection so the pass is order-independent.
        let stripped: Vec<Option<String>> = texts
            .iter()
            .zip(&verdicts)
            .map(|(text, v)| v.is_accept().then(|| strip_tags(text).0))
            .collect();

        for i in 0..stripped.len() {
            let Some(ref text_i) = stripped[i] else {
                continue;
            };
            for (j, candidate) in stripped.iter().enumerate() {
                if i == j {
                    continue;
                }
                let Some(text_j) = candidate else { continue };
                if text_i.len() < text_j.len() && text_j.contains(text_i.as_str()) {
                    verdicts[i] = FilterVerdict::Reject(FilterRule::SubstringFragment);
                    break;
                }
            }
        }
    }

    verdicts
}

/// Filter a catalog, keeping only records that classify as genuine text.
///
/// Surviving records keep their `source_offset` untouched; presentation
/// renumbering is the renderer's job.
pub fn filter_catalog(catalog: Catalog, config: &FilterConfig, variant: FilterVariant) -> Catalog {
    let verdicts = {
        let texts: Vec<&str> = catalog.iter().map(|r| r.tagged_text.as_str()).collect();
        filter_texts(&texts, config, variant)
    };
    catalog
        .into_iter()
        .zip(verdicts)
        .filter(|(_, v)| v.is_accept())
        .map(|(record, _)| record)
        .collect()
}

/// Like [`filter_catalog`], but also hands back the rejects with the rule
/// that dropped each, for diagnostic listings.
pub fn partition_catalog(
    catalog: Catalog,
    config: &FilterConfig,
    variant: FilterVariant,
) -> (Catalog, Vec<(StringRecord, FilterRule)>) {
    let verdicts = {
        let texts: Vec<&str> = catalog.iter().map(|r| r.tagged_text.as_str()).collect();
        filter_texts(&texts, config, variant)
    };

    let mut kept = Vec::new();
    let mut rejected = Vec::new();
    for (record, verdict) in catalog.into_iter().zip(verdicts) {
        match verdict.reason() {
            None => kept.push(record),
            Some(rule) => rejected.push((record, rule)),
        }
    }
    (kept, rejected)
}
