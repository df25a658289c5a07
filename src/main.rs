mod calendar;
mod document;
mod error;
mod fetcher;
mod model;
mod output;
mod parser;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use model::{Page, Participant};
use output::{OutputFormat, TablePaths};
use parser::lines::LineClassifier;
use parser::profile::{Disambiguation, DuplicatePolicy, FormatProfile, LineShape};
use parser::Extraction;
use settings::Settings;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Parser)]
#[command(name = "indycar_laptimes", about = "Per-lap times from IndyCar section result sheets")]
struct Cli {
    /// Settings file (default: ./laptimes.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert timing documents (.pdf or .txt) into lap tables
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        opts: ExtractArgs,
    },
    /// Print the participants found in a document
    Roster { file: PathBuf },
    /// Download section result documents into the archive directory
    Fetch {
        /// Only this season
        #[arg(long)]
        year: Option<i32>,
        /// Max race dates to try
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Fetch, then extract everything in the archive directory
    Run {
        #[arg(long)]
        year: Option<i32>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[command(flatten)]
        opts: ExtractArgs,
    },
}

/// Per-run overrides on top of the settings file and environment.
#[derive(Args, Debug, Default)]
struct ExtractArgs {
    /// Preset: sparse, sector-table, sector-table-fastest, strict, multi-line
    #[arg(long)]
    profile: Option<String>,
    #[arg(long)]
    min_lap: Option<f64>,
    #[arg(long)]
    max_lap: Option<f64>,
    #[arg(long, value_enum)]
    duplicates: Option<DuplicatePolicy>,
    #[arg(long, value_enum)]
    disambiguation: Option<Disambiguation>,
    #[arg(long, value_enum)]
    line_shape: Option<LineShape>,
    /// Close a section after an active page with no accepted laps (true/false)
    #[arg(long, action = ArgAction::Set)]
    deactivate_on_empty_page: Option<bool>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Explicit roster entry, repeatable (skips roster discovery)
    #[arg(long = "car", value_name = "ID=NAME", value_parser = parse_car)]
    cars: Vec<Participant>,
}

impl ExtractArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(p) = self.profile {
            settings.profile = p;
        }
        settings.min_lap = self.min_lap.or(settings.min_lap);
        settings.max_lap = self.max_lap.or(settings.max_lap);
        settings.duplicate_policy = self.duplicates.or(settings.duplicate_policy);
        settings.disambiguation_policy = self.disambiguation.or(settings.disambiguation_policy);
        settings.line_shape = self.line_shape.or(settings.line_shape);
        settings.deactivate_on_empty_page =
            self.deactivate_on_empty_page.or(settings.deactivate_on_empty_page);
        if let Some(f) = self.format {
            settings.output_format = f;
        }
        if let Some(dir) = self.output_dir {
            settings.output_dir = dir;
        }
        if !self.cars.is_empty() {
            settings.roster = self.cars;
        }
    }
}

fn parse_car(s: &str) -> Result<Participant, String> {
    let (id, name) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=NAME, got {s:?}"))?;
    let car = Participant::new(id.trim(), name.trim());
    car.validate()?;
    Ok(car)
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.verbose_logging |= cli.verbose;
    init_tracing(settings.verbose_logging);

    let t0 = Instant::now();
    match cli.command {
        Commands::Extract { files, opts } => {
            opts.apply(&mut settings);
            let profile = settings.format_profile()?;
            info!(profile = %settings.profile, ?profile, "extracting");
            process_documents(&files, &settings, &profile).print();
        }
        Commands::Roster { file } => {
            print_roster(&file, &settings.format_profile()?)?;
        }
        Commands::Fetch { year, limit } => {
            let stats = fetch(&settings, year, limit).await?;
            println!(
                "Fetched {} new documents ({} already present, {} skipped, {} not found, {} errors).",
                stats.downloaded, stats.present, stats.skipped, stats.not_found, stats.errors
            );
        }
        Commands::Run { year, limit, opts } => {
            opts.apply(&mut settings);
            let profile = settings.format_profile()?;

            let stats = fetch(&settings, year, limit).await?;
            println!("Archive: {} documents available.", stats.available());

            let files = list_documents(&settings.archive_dir)?;
            if files.is_empty() {
                println!("Nothing to extract in {:?}.", settings.archive_dir);
                return Ok(());
            }
            process_documents(&files, &settings, &profile).print();
        }
    }

    println!("\nDone in {:.1}s", t0.elapsed().as_secs_f64());
    Ok(())
}

async fn fetch(
    settings: &Settings,
    year: Option<i32>,
    limit: Option<usize>,
) -> Result<fetcher::FetchStats> {
    let dates: Vec<String> = calendar::race_dates(year)
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(String::from)
        .collect();
    if dates.is_empty() {
        let season = year.map_or("any season".into(), |y| y.to_string());
        bail!("no past race dates for {season}");
    }
    println!("Probing {} race dates...", dates.len());
    fetcher::fetch_dates(&settings.archive_dir, dates).await
}

/// `.pdf` and `.txt` files directly inside `dir`, sorted by name.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        let wanted = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf") || e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if wanted && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Default, PartialEq)]
struct BatchCounts {
    documents: usize,
    written: usize,
    empty: usize,
    failed: usize,
    laps: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Wrote {} tables from {} documents ({} laps, {} empty, {} failed).",
            self.written, self.documents, self.laps, self.empty, self.failed,
        );
    }
}

fn extract_file(path: &Path, settings: &Settings, profile: &FormatProfile) -> Result<Extraction> {
    let doc = document::read_document(path)?;
    let extraction = parser::extract_document(
        &doc.pages,
        settings.explicit_roster(),
        profile,
        &doc.file_name(),
    );
    if extraction.is_empty() {
        warn!(
            file = %doc.file_name(),
            participants = extraction.participants.len(),
            "no lap times found"
        );
    }
    Ok(extraction)
}

#[cfg(feature = "rayon")]
fn extract_batch(
    files: &[PathBuf],
    settings: &Settings,
    profile: &FormatProfile,
    pb: &ProgressBar,
) -> Vec<Result<Extraction>> {
    files
        .par_iter()
        .map(|path| {
            let result = extract_file(path, settings, profile);
            pb.inc(1);
            result
        })
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn extract_batch(
    files: &[PathBuf],
    settings: &Settings,
    profile: &FormatProfile,
    pb: &ProgressBar,
) -> Vec<Result<Extraction>> {
    files
        .iter()
        .map(|path| {
            let result = extract_file(path, settings, profile);
            pb.inc(1);
            result
        })
        .collect()
}

/// Extract every file in parallel, then write one table per document in
/// input order. One bad document never stops the batch.
fn process_documents(
    files: &[PathBuf],
    settings: &Settings,
    profile: &FormatProfile,
) -> BatchCounts {
    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let results = extract_batch(files, settings, profile, &pb);
    pb.finish_and_clear();

    let mut tables = TablePaths::new(&settings.output_dir, settings.output_format);
    let mut counts = BatchCounts {
        documents: files.len(),
        ..BatchCounts::default()
    };
    for (path, result) in files.iter().zip(results) {
        let written = result.and_then(|extraction| {
            let table = tables.claim(&extraction.metadata, path);
            output::write_table(
                &table,
                &extraction.metadata,
                &extraction.records,
                settings.output_format,
            )?;
            Ok((table, extraction))
        });
        match written {
            Ok((table, extraction)) => {
                let laps = extraction.records.len();
                info!(
                    file = ?path,
                    table = ?table,
                    laps,
                    participants = extraction.participants.len(),
                    "table written"
                );
                counts.written += 1;
                counts.laps += laps;
                if laps == 0 {
                    counts.empty += 1;
                }
            }
            Err(e) => {
                warn!(file = ?path, error = %e, "document failed");
                counts.failed += 1;
            }
        }
    }
    counts
}

/// Discovered participants with the pages their sections cover and how many
/// lap entries the configured line shape recognises there.
fn print_roster(file: &Path, profile: &FormatProfile) -> Result<()> {
    let doc = document::read_document(file)?;
    let roster = parser::roster::discover_roster(&doc.pages);
    if roster.is_empty() {
        println!("No participants found in {}.", doc.file_name());
        return Ok(());
    }
    for p in &roster {
        let (lap_lines, pages) = section_overview(&doc.pages, p, profile);
        println!("{:>4}  {:<28} {:>4} lap lines, pages {:?}", p.id, p.name, lap_lines, pages);
    }
    println!("\n{} participants", roster.len());
    Ok(())
}

fn section_overview(
    pages: &[Page],
    participant: &Participant,
    profile: &FormatProfile,
) -> (usize, Vec<usize>) {
    let mut classifier = LineClassifier::for_profile(profile);
    let mut lap_lines = 0;
    let mut pages_seen: Vec<usize> = Vec::new();
    for line in parser::sections::locate_sections(pages, participant) {
        if !line.is_active {
            classifier.reset();
            continue;
        }
        if pages_seen.last() != Some(&(line.page_index + 1)) {
            pages_seen.push(line.page_index + 1);
        }
        if classifier.feed(line.line).is_some() {
            lap_lines += 1;
        }
    }
    (lap_lines, pages_seen)
}
