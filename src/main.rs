use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use arena_card_prep::{
    load_catalog, logging, sweep, write_cards, write_json, write_manifest, write_skip_report,
    BackfillIndex, CardPipeline, ClientDataExtractor, ConfigConflict, CorrectionTable,
    EventFormat, ImageOverrides, PipelineConfig, SecondaryDatasets,
};

#[derive(Parser)]
#[command(name = "arena-card-prep")]
#[command(about = "Preprocess bulk card data for the Arena client and simulate draft rewards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter and reshape a bulk catalog into the compact card dataset
    Prepare {
        /// Provider bulk data JSON (default cards)
        #[arg(long)]
        catalog: PathBuf,

        /// Directory of extracted client data (<set>.json files)
        #[arg(long)]
        secondary_dir: Option<PathBuf>,

        /// Override tables JSON (missing sections use built-in defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Process records across all cores
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Fail on conflicting entries in the override tables or client data
        #[arg(long, default_value = "false")]
        strict: bool,

        /// Write skipped records to this CSV file
        #[arg(long)]
        skip_report: Option<PathBuf>,
    },

    /// Extract platform ids for one set from the client's data files
    Extract {
        /// data_cards JSON export
        #[arg(long)]
        data_cards: PathBuf,

        /// data_loc JSON export
        #[arg(long)]
        data_loc: PathBuf,

        /// Set code (case-insensitive)
        #[arg(long)]
        set: String,

        /// Output directory (writes <set>.json)
        #[arg(long, default_value = "extractedSetData")]
        out_dir: PathBuf,
    },

    /// Estimate average rewards per win rate for a draft event
    Simulate {
        /// Preset event: premier, traditional or quick
        #[arg(long, default_value = "quick")]
        format: String,

        /// Event definition JSON (overrides --format)
        #[arg(long)]
        format_file: Option<PathBuf>,

        /// Events simulated per win rate
        #[arg(long, default_value_t = 100_000)]
        trials: u64,

        /// Win rate step between sample points (0.01 to 1; 1.00 is always sampled)
        #[arg(long, default_value_t = 0.01)]
        step: f64,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output JSON (defaults to <format>Lookup.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init_tracing("info")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            catalog,
            secondary_dir,
            config,
            out_dir,
            parallel,
            strict,
            skip_report,
        } => run_prepare(
            &catalog,
            secondary_dir.as_deref(),
            config.as_deref(),
            &out_dir,
            parallel,
            strict,
            skip_report.as_deref(),
        ),
        Commands::Extract {
            data_cards,
            data_loc,
            set,
            out_dir,
        } => run_extract(&data_cards, &data_loc, &set, &out_dir),
        Commands::Simulate {
            format,
            format_file,
            trials,
            step,
            seed,
            out,
        } => run_simulate(&format, format_file.as_deref(), trials, step, seed, out.as_deref()),
    }
}

fn report_conflicts(conflicts: &[ConfigConflict], strict: bool) -> Result<()> {
    for conflict in conflicts {
        warn!(%conflict, "configuration conflict");
    }
    if strict && !conflicts.is_empty() {
        bail!("{} configuration conflict(s) in strict mode", conflicts.len());
    }
    Ok(())
}

fn run_prepare(
    catalog: &Path,
    secondary_dir: Option<&Path>,
    config_path: Option<&Path>,
    out_dir: &Path,
    parallel: bool,
    strict: bool,
    skip_report: Option<&Path>,
) -> Result<()> {
    println!("🃏 Card Preprocessing");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Configuration
    let config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    report_conflicts(&config.validate(), strict)?;

    // 2. Client data for backfill
    let datasets = match secondary_dir {
        Some(dir) => SecondaryDatasets::load_dir(dir)?,
        None => SecondaryDatasets::new(),
    };
    if datasets.is_empty() {
        println!("⚠️  No secondary data; platform ids will not be backfilled");
    } else {
        println!(
            "✓ Loaded {} secondary records from {} dataset(s)",
            datasets.record_count(),
            datasets.names().len()
        );
    }

    let index = BackfillIndex::build(&datasets, &config);
    if strict && !index.conflicts().is_empty() {
        bail!("{} secondary data conflict(s) in strict mode", index.conflicts().len());
    }
    let overrides = ImageOverrides::from_config(&config);
    let corrections = CorrectionTable::from_config(&config);
    println!(
        "✓ {} replacement image(s), {} correction(s)",
        overrides.len(),
        corrections.len()
    );

    // 3. Catalog
    println!("\n📂 Loading catalog...");
    let records = load_catalog(catalog)?;
    println!("✓ Loaded {} records", records.len());

    // 4. Pipeline
    println!("\n🔧 Processing...");
    let pipeline = CardPipeline::new(&config, &index, &overrides, &corrections);
    let report = if parallel {
        pipeline.run_parallel(records)
    } else {
        pipeline.run(records)
    };
    println!("✓ {}", report.summary());
    for (reason, count) in &report.rejected {
        println!("   {:<28} {}", reason.code(), count);
    }

    // 5. Output
    let (path, manifest) = write_cards(out_dir, &report)?;
    let manifest_path = path.with_extension("manifest.json");
    write_manifest(&manifest_path, &manifest)?;

    if let Some(skip_path) = skip_report {
        write_skip_report(skip_path, &report.skipped)?;
        println!("✓ Skip report: {}", skip_path.display());
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💾 {}", manifest.summary());
    println!("   Written to {}", path.display());

    Ok(())
}

fn run_extract(data_cards: &Path, data_loc: &Path, set: &str, out_dir: &Path) -> Result<()> {
    println!("🔍 Extracting client data for set {}", set.to_uppercase());

    let extractor = ClientDataExtractor::from_files(data_cards, data_loc)?;
    let records = extractor
        .extract_set(set)
        .with_context(|| format!("Nothing written for set {}", set))?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;
    let path = out_dir.join(format!("{}.json", set.to_lowercase()));
    write_json(&path, &records)?;

    println!("✓ Wrote {} cards to {}", records.len(), path.display());
    Ok(())
}

fn run_simulate(
    format_name: &str,
    format_file: Option<&Path>,
    trials: u64,
    step: f64,
    seed: u64,
    out: Option<&Path>,
) -> Result<()> {
    let format = match format_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read event format: {}", path.display()))?;
            serde_json::from_str::<EventFormat>(&content).context("Failed to parse event format JSON")?
        }
        None => match EventFormat::preset(format_name) {
            Some(format) => format,
            None => bail!("Unknown event format: {} (premier, traditional, quick)", format_name),
        },
    };

    println!(
        "🎲 Simulating {} draft: {} events per win rate, step {:.2}",
        format.name, trials, step
    );

    let lookup = sweep(&format, trials, step, seed)?;

    let out_path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}Lookup.json", format.name)));
    write_json(&out_path, &lookup)?;

    if let Some(even) = lookup.get("0.50") {
        println!(
            "✓ At 50%: {:.1} gems, {:.2} packs on average",
            even.avg_gems, even.avg_packs
        );
    }
    println!("✓ Wrote {} sample points to {}", lookup.len(), out_path.display());

    Ok(())
}
