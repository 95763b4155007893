//! rasfs CLI - Command-line tool for Max Payne 2 RAS archives.
//!
//! This is the main entry point for the rasfs command-line application.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use rasfs::prelude::*;

/// rasfs - Max Payne 2 RAS archive tool
#[derive(Parser)]
#[command(name = "rasfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log decoding details (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ArchiveArgs {
    /// Path to the RAS archive
    #[arg(short, long, env = "RAS_ARCHIVE")]
    archive: PathBuf,

    /// Read through a file handle instead of memory-mapping the archive
    #[arg(long)]
    no_mmap: bool,

    /// Keep hash chains in insertion order on lookup
    #[arg(long)]
    no_move_to_front: bool,
}

impl ArchiveArgs {
    fn open(&self) -> Result<RasArchive> {
        let options = ArchiveOptions::default()
            .memory_map(!self.no_mmap)
            .move_to_front(!self.no_move_to_front);

        let start = Instant::now();
        let archive = RasArchive::open_with(&self.archive, options)
            .with_context(|| format!("Failed to open RAS archive {}", self.archive.display()))?;
        debug!(
            entries = archive.entry_count(),
            elapsed = ?start.elapsed(),
            "opened archive"
        );
        Ok(archive)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of a RAS archive
    List {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show offsets and sizes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print the directory tree below a path
    Tree {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Directory to start from (archive root by default)
        #[arg(default_value = "")]
        path: String,
    },

    /// Show metadata for a path
    Stat {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Path inside the archive
        path: String,
    },

    /// Write a file's contents to stdout
    Cat {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Path inside the archive
        path: String,
    },

    /// Extract files from a RAS archive
    Extract {
        #[command(flatten)]
        archive: ArchiveArgs,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Pack a directory tree into a RAS archive
    Pack {
        /// Directory to pack
        #[arg(short, long)]
        input: PathBuf,

        /// Output archive
        #[arg(short, long)]
        output: PathBuf,

        /// Keystream seed
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        seed: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { archive, filter, detailed } => {
            cmd_list(&archive.open()?, filter.as_deref(), detailed)?;
        }
        Commands::Tree { archive, path } => {
            cmd_tree(&archive.open()?, &path)?;
        }
        Commands::Stat { archive, path } => {
            cmd_stat(&archive.open()?, &path)?;
        }
        Commands::Cat { archive, path } => {
            cmd_cat(&archive.open()?, &path)?;
        }
        Commands::Extract { archive, output, filter } => {
            cmd_extract(&archive.open()?, &output, filter.as_deref())?;
        }
        Commands::Pack { input, output, seed } => {
            cmd_pack(&input, &output, seed)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Compile an optional glob filter; matching is case-insensitive.
fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid filter pattern {p:?}")))
        .transpose()
}

fn matches(filter: Option<&Pattern>, path: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };
    filter.map_or(true, |p| p.matches_with(path, options))
}

fn cmd_list(archive: &RasArchive, filter: Option<&str>, detailed: bool) -> Result<()> {
    let filter = compile_filter(filter)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut count = 0;
    for entry in archive.iter() {
        if !matches(filter.as_ref(), entry.path()) {
            continue;
        }

        let suffix = if entry.is_dir() { "/" } else { "" };
        if detailed {
            writeln!(
                out,
                "{:>12} {:>12} {:>12} {}{}",
                entry.offset(),
                entry.size(),
                entry.uncompressed_size(),
                entry.path(),
                suffix
            )?;
        } else {
            writeln!(out, "{}{}", entry.path(), suffix)?;
        }
        count += 1;
    }

    writeln!(out, "\nTotal: {} entries", count)?;

    Ok(())
}

fn cmd_tree(archive: &RasArchive, path: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let base_depth = path.split('/').filter(|c| !c.is_empty()).count();
    for entry_path in archive.walk(path) {
        let depth = entry_path.split('/').count() - base_depth - 1;
        let name = entry_path.rsplit('/').next().unwrap_or(entry_path.as_str());
        let suffix = if archive.stat(&entry_path)?.kind == EntryKind::Directory {
            "/"
        } else {
            ""
        };
        writeln!(out, "{:indent$}{}{}", "", name, suffix, indent = depth * 2)?;
    }

    Ok(())
}

fn cmd_stat(archive: &RasArchive, path: &str) -> Result<()> {
    let stat = archive
        .stat(path)
        .with_context(|| format!("Failed to stat {path}"))?;

    println!("Path:      {}", path);
    println!("Kind:      {:?}", stat.kind);
    println!("Size:      {}", stat.size);
    println!("Read-only: {}", stat.read_only);
    if let Some(entry) = archive.find(path) {
        if !entry.is_dir() {
            println!("Offset:    {}", entry.offset());
            println!("Declared uncompressed size: {}", entry.uncompressed_size());
        } else {
            println!("Children:  {}", entry.children().len());
        }
    }

    Ok(())
}

fn cmd_cat(archive: &RasArchive, path: &str) -> Result<()> {
    let mut view = archive
        .open_read(path)
        .with_context(|| format!("Failed to open {path}"))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut view, &mut out)?;
    out.flush()?;

    Ok(())
}

/// Map an archive path below `output`, refusing anything that could escape it.
fn output_path(output: &Path, entry_path: &str) -> Option<PathBuf> {
    let relative = Path::new(entry_path);
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(output.join(relative))
    } else {
        None
    }
}

fn cmd_extract(archive: &RasArchive, output: &Path, filter: Option<&str>) -> Result<()> {
    let filter = compile_filter(filter)?;
    let files: Vec<&Entry> = archive
        .iter()
        .filter(|e| !e.is_dir() && matches(filter.as_ref(), e.path()))
        .collect();

    println!("Extracting {} files...", files.len());

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)?;

    let start = Instant::now();
    let mut skipped = 0;
    for entry in &files {
        let Some(target) = output_path(output, entry.path()) else {
            warn!(path = entry.path(), "skipping entry that would escape the output directory");
            skipped += 1;
            pb.inc(1);
            continue;
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut view = archive
            .open_read(entry.path())
            .with_context(|| format!("Failed to open {}", entry.path()))?;
        let mut file = fs::File::create(&target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        io::copy(&mut view, &mut file)
            .with_context(|| format!("Failed to extract {}", entry.path()))?;

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!(
        "Extraction completed in {:?} ({} skipped)",
        start.elapsed(),
        skipped
    );

    Ok(())
}

/// Directory record name for a path relative to the pack root.
fn dir_record_name(relative: &Path) -> String {
    let mut name = String::from("\\");
    for component in relative.components() {
        name.push_str(&component.as_os_str().to_string_lossy());
        name.push('\\');
    }
    name
}

fn cmd_pack(input: &Path, output: &Path, seed: i32) -> Result<()> {
    println!("Packing: {} -> {}", input.display(), output.display());

    let mut builder = RasBuilder::new(seed);
    let mut dirs: HashMap<PathBuf, u32> = HashMap::new();

    for item in WalkDir::new(input).sort_by_file_name() {
        let item = item.with_context(|| format!("Failed to walk {}", input.display()))?;
        let relative = item.path().strip_prefix(input)?.to_path_buf();

        if item.file_type().is_dir() {
            let index = builder.add_dir(&dir_record_name(&relative));

            // Keep empty directories as directory marker records.
            if !relative.as_os_str().is_empty() && fs::read_dir(item.path())?.next().is_none() {
                builder.add_file(index, "", &[]);
            }
            dirs.insert(relative, index);
        } else if item.file_type().is_file() {
            let parent = relative.parent().unwrap_or(Path::new(""));
            let dir_index = *dirs
                .get(parent)
                .with_context(|| format!("No directory record for {}", parent.display()))?;
            let name = item.file_name().to_string_lossy();
            let data = fs::read(item.path())
                .with_context(|| format!("Failed to read {}", item.path().display()))?;
            builder.add_file(dir_index, &name, &data);
        }
    }

    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = io::BufWriter::new(file);
    builder
        .write_to(&mut writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    writer.flush()?;

    println!("Packed {} files", builder.file_count());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        let filter = compile_filter(Some("data/*.LVL")).unwrap();
        assert!(matches(filter.as_ref(), "data/level1.lvl"));
        assert!(!matches(filter.as_ref(), "sound/level1.wav"));
        assert!(matches(None, "anything"));
        assert!(compile_filter(Some("[")).is_err());
    }

    #[test]
    fn test_output_path_rejects_escapes() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            output_path(out, "data/item.bin"),
            Some(PathBuf::from("/tmp/out/data/item.bin"))
        );
        assert_eq!(output_path(out, "../evil"), None);
        assert_eq!(output_path(out, "data/../../evil"), None);
    }

    #[test]
    fn test_dir_record_name() {
        assert_eq!(dir_record_name(Path::new("")), "\\");
        assert_eq!(dir_record_name(Path::new("data/maps")), "\\data\\maps\\");
    }

    #[test]
    fn test_pack_then_open() {
        let input = tempfile::tempdir().unwrap();
        fs::create_dir_all(input.path().join("data/maps")).unwrap();
        fs::create_dir_all(input.path().join("empty")).unwrap();
        fs::write(input.path().join("readme.txt"), b"hi").unwrap();
        fs::write(input.path().join("data/maps/level1.lvl"), b"level").unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive_path = out.path().join("packed.ras");
        cmd_pack(input.path(), &archive_path, -42).unwrap();

        let archive = RasArchive::open(&archive_path).unwrap();
        assert_eq!(archive.header().seed, -42);
        assert_eq!(archive.read("readme.txt").unwrap(), b"hi");
        assert_eq!(archive.read("data/maps/level1.lvl").unwrap(), b"level");
        assert_eq!(archive.stat("empty").unwrap().kind, EntryKind::Directory);

        let extracted = tempfile::tempdir().unwrap();
        cmd_extract(&archive, extracted.path(), Some("data/*")).unwrap();
        assert_eq!(
            fs::read(extracted.path().join("data/maps/level1.lvl")).unwrap(),
            b"level"
        );
        assert!(!extracted.path().join("readme.txt").exists());
    }
}
