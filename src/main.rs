//! scnpack - SCN script string-table CLI
//!
//! Dump container strings into hand-editable catalogs, refine the catalogs
//! with the stricter noise filter, and repack edited catalogs into new
//! containers.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use scnpack::{
    parse_catalog, partition_catalog, render_catalog, repack_image, scan_image, CatalogEntry,
    FilterConfig, FilterVariant, ScnError, StringRecord,
};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "scnpack")]
#[command(
    author,
    version,
    about = "String-table dump, filter, and repack for SCN script containers"
)]
#[command(long_about = "
scnpack extracts the text of SCN script containers into hand-editable
catalogs, filters scan noise out of them, and rebuilds containers from
edited catalogs with every string pointer relocated and all terminator
and padding bytes preserved exactly.

EXAMPLES:
    scnpack dump input/                  # one catalog per .SCN in input/
    scnpack dump input/ --raw            # keep the unfiltered catalogs too
    scnpack refine output/ -o filtered   # stricter second-pass filter
    scnpack repack filtered/ --originals input/ -o repacked
")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// List strings rejected by the noise filter and the rule that fired
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract string catalogs from script containers
    Dump {
        /// Container file or folder of containers
        input: PathBuf,

        /// Output folder for catalog files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Container file extension when scanning a folder
        #[arg(long, default_value = ".SCN")]
        ext: String,

        /// Anchor pointer offset (hex accepted, e.g. 0x0A)
        #[arg(long, default_value = "0x0A", value_parser = parse_offset)]
        anchor: usize,

        /// Also keep the unfiltered catalog as <stem>_raw.txt
        #[arg(long)]
        raw: bool,

        /// Write the filtered catalog as JSON instead of the text form
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Re-filter existing catalogs with the stricter rule set
    Refine {
        /// Catalog file or folder of catalogs
        input: PathBuf,

        /// Output folder for refined catalogs
        #[arg(short, long, default_value = "filtered")]
        output: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Rebuild containers from edited catalogs
    Repack {
        /// Catalog file or folder of catalogs
        input: PathBuf,

        /// Folder holding the original containers
        #[arg(long)]
        originals: PathBuf,

        /// Output folder for rebuilt containers
        #[arg(short, long, default_value = "repacked")]
        output: PathBuf,

        /// Container file extension used to pair originals
        #[arg(long, default_value = ".SCN")]
        ext: String,
    },
}

/// Filter thresholds shared by dump and refine.
#[derive(Args, Debug)]
struct FilterArgs {
    /// Maximum <HEX=XX> tags tolerated in one string
    #[arg(long, default_value_t = 3)]
    max_control_codes: usize,

    /// Minimum ASCII letters required in the stripped text
    #[arg(long, default_value_t = 3)]
    min_alpha: usize,

    /// Minimum fraction of visible characters among all tokens
    #[arg(long, default_value_t = 0.3)]
    min_ratio: f32,

    /// Short-string cutoff for the lowercase-start rule
    #[arg(long, default_value_t = 30)]
    short_lowercase_len: usize,
}

impl FilterArgs {
    fn to_config(&self) -> FilterConfig {
        FilterConfig::new()
            .with_max_control_codes(self.max_control_codes)
            .with_min_alpha_chars(self.min_alpha)
            .with_min_text_ratio(self.min_ratio)
            .with_short_lowercase_len(self.short_lowercase_len)
    }
}

fn parse_offset(s: &str) -> std::result::Result<usize, String> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|_| format!("invalid offset: {s}"))
}

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";

fn main() -> Result<()> {
    let cli = Cli::parse();
    let use_color = !cli.no_color && io::stdout().is_terminal();
    let verbose = cli.verbose;

    match cli.command {
        Command::Dump {
            input,
            output,
            ext,
            anchor,
            raw,
            json,
            filter,
        } => {
            let files = collect_inputs(&input, &ext)?;
            if files.is_empty() {
                println!("No {ext} files found in {}", input.display());
                return Ok(());
            }
            fs::create_dir_all(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            let config = filter.to_config();

            let results: Vec<FileReport> = files
                .par_iter()
                .map(|path| {
                    report(path, dump_one(path, &output, anchor, raw, json, &config, verbose))
                })
                .collect();
            print_batch(&results, use_color);
        }

        Command::Refine {
            input,
            output,
            filter,
        } => {
            let files = collect_inputs(&input, ".txt")?;
            if files.is_empty() {
                println!("No catalog files found in {}", input.display());
                return Ok(());
            }
            fs::create_dir_all(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            let config = filter.to_config();

            let results: Vec<FileReport> = files
                .par_iter()
                .map(|path| report(path, refine_one(path, &output, &config, verbose)))
                .collect();
            print_batch(&results, use_color);
        }

        Command::Repack {
            input,
            originals,
            output,
            ext,
        } => {
            let files = collect_inputs(&input, ".txt")?;
            if files.is_empty() {
                println!("No catalog files found in {}", input.display());
                return Ok(());
            }
            fs::create_dir_all(&output)
                .with_context(|| format!("creating {}", output.display()))?;

            let results: Vec<FileReport> = files
                .par_iter()
                .map(|path| report(path, repack_one(path, &originals, &output, &ext)))
                .collect();
            print_batch(&results, use_color);
        }
    }

    Ok(())
}

/// Collect the batch: a single file as-is, or a folder filtered by
/// extension (matched case-insensitively), sorted for stable output.
fn collect_inputs(input: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("input does not exist: {}", input.display());
    }

    let suffix = ext.to_ascii_lowercase();
    let mut files: Vec<PathBuf> = fs::read_dir(input)
        .with_context(|| format!("reading {}", input.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.to_ascii_lowercase().ends_with(&suffix))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().unwrap_or_default().to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

fn to_entries(records: &[StringRecord], data: &[u8]) -> Vec<CatalogEntry> {
    records
        .iter()
        .map(|record| CatalogEntry::from_record(record, data))
        .collect()
}

/// First 40 visible characters of a string, line breaks flattened.
fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() > 40 {
        let head: String = flat.chars().take(37).collect();
        format!("{head}...")
    } else {
        flat
    }
}

fn dump_one(
    path: &Path,
    out_dir: &Path,
    anchor: usize,
    raw: bool,
    json: bool,
    config: &FilterConfig,
    verbose: bool,
) -> Result<Vec<String>> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let catalog = scan_image(&data, anchor)?;

    let stem = file_stem(path);
    let name = file_name(path);
    let mut lines = vec![format!("{} unique strings mapped", catalog.len())];

    if raw {
        let entries = to_entries(&catalog, &data);
        let raw_path = out_dir.join(format!("{stem}_raw.txt"));
        fs::write(&raw_path, render_catalog(&entries, &name))
            .with_context(|| format!("writing {}", raw_path.display()))?;
    }

    let (kept, rejected) = partition_catalog(catalog, config, FilterVariant::Dump);
    lines.push(format!("{} kept after noise filter", kept.len()));
    if verbose {
        for (record, rule) in &rejected {
            lines.push(format!(
                "rejected [{}] {:#010x} {}",
                rule.short_name(),
                record.source_offset,
                preview(&record.tagged_text)
            ));
        }
    }

    if json {
        let json_path = out_dir.join(format!("{stem}.json"));
        fs::write(&json_path, serde_json::to_string_pretty(&kept)?)
            .with_context(|| format!("writing {}", json_path.display()))?;
    } else {
        let entries = to_entries(&kept, &data);
        let txt_path = out_dir.join(format!("{stem}.txt"));
        fs::write(&txt_path, render_catalog(&entries, &name))
            .with_context(|| format!("writing {}", txt_path.display()))?;
    }

    Ok(lines)
}

fn refine_one(
    path: &Path,
    out_dir: &Path,
    config: &FilterConfig,
    verbose: bool,
) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = parse_catalog(&content);
    if parsed.entries.is_empty() {
        return Err(ScnError::EmptyCatalog.into());
    }

    let mut lines = Vec::new();
    if !parsed.skipped.is_empty() {
        lines.push(format!("{} malformed blocks skipped", parsed.skipped.len()));
    }

    let verdicts = {
        let texts: Vec<&str> = parsed.entries.iter().map(|e| e.text.as_str()).collect();
        scnpack::filter_texts(&texts, config, FilterVariant::Refine)
    };

    let mut kept = Vec::new();
    for (entry, verdict) in parsed.entries.iter().zip(&verdicts) {
        match verdict.reason() {
            None => kept.push(entry.clone()),
            Some(rule) => {
                if verbose {
                    lines.push(format!(
                        "rejected [{}] {}",
                        rule.short_name(),
                        preview(&entry.text)
                    ));
                }
            }
        }
    }
    lines.insert(
        0,
        format!("{} of {} strings kept", kept.len(), parsed.entries.len()),
    );

    // A catalog refined from a raw dump keeps the clean stem.
    let stem = file_stem(path);
    let clean = stem.strip_suffix("_raw").unwrap_or(&stem);
    let out_path = out_dir.join(format!("{clean}.txt"));
    fs::write(&out_path, render_catalog(&kept, &file_name(path)))
        .with_context(|| format!("writing {}", out_path.display()))?;

    Ok(lines)
}

fn repack_one(path: &Path, originals: &Path, out_dir: &Path, ext: &str) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let parsed = parse_catalog(&content);
    if parsed.entries.is_empty() {
        return Err(ScnError::EmptyCatalog.into());
    }

    let stem = file_stem(path);
    let original_path = originals.join(format!("{stem}{ext}"));
    if !original_path.is_file() {
        return Err(ScnError::OriginalFileMissing {
            path: original_path,
        }
        .into());
    }
    let original = fs::read(&original_path)
        .with_context(|| format!("reading {}", original_path.display()))?;

    let rebuilt = repack_image(&original, &parsed.entries)?;

    let out_path = out_dir.join(format!("{stem}{ext}"));
    fs::write(&out_path, &rebuilt).with_context(|| format!("writing {}", out_path.display()))?;

    let mut lines = vec![format!(
        "{} strings, {} -> {} bytes",
        parsed.entries.len(),
        original.len(),
        rebuilt.len()
    )];
    if !parsed.skipped.is_empty() {
        lines.push(format!("{} malformed blocks skipped", parsed.skipped.len()));
    }
    Ok(lines)
}

struct FileReport {
    name: String,
    result: Result<Vec<String>>,
}

fn report(path: &Path, result: Result<Vec<String>>) -> FileReport {
    FileReport {
        name: file_name(path),
        result,
    }
}

/// Print per-file outcomes in batch order. Layout mismatches (no
/// pointers, empty catalogs) show as warnings; everything else that
/// failed shows as an error. One bad file never stops the batch.
fn print_batch(results: &[FileReport], use_color: bool) {
    let mut done = 0usize;
    let mut skipped = 0usize;

    for report in results {
        match &report.result {
            Ok(lines) => {
                done += 1;
                if use_color {
                    println!("{GREEN}{}{RESET}", report.name);
                } else {
                    println!("{}", report.name);
                }
                for line in lines {
                    if use_color {
                        println!("  {DIM}{line}{RESET}");
                    } else {
                        println!("  {line}");
                    }
                }
            }
            Err(err) => {
                skipped += 1;
                let soft = matches!(
                    err.downcast_ref::<ScnError>(),
                    Some(ScnError::NoPointersFound | ScnError::EmptyCatalog)
                );
                let color = if soft { YELLOW } else { RED };
                if use_color {
                    eprintln!("{color}{}: {err:#}{RESET}", report.name);
                } else {
                    eprintln!("{}: {err:#}", report.name);
                }
            }
        }
    }

    println!();
    if use_color {
        println!("{BOLD}{done} processed, {skipped} skipped{RESET}");
    } else {
        println!("{done} processed, {skipped} skipped");
    }
}
