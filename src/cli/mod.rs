//! Wine quality CLI module
//!
//! Command-line interface for running the model comparison, exploring the
//! data and inspecting input files.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::comparison::{ModelComparison, ModelKind};
use crate::config::StudyConfig;
use crate::data::{detect_separator, load_wine_pair, Origin, WineLoader};
use crate::explore::analyze;
use crate::report;
use crate::tuning::Scoring;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(64)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "wineq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wine quality classification: EDA, tuned models and ROC comparison")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Tune, evaluate and compare every model, then write the report
    Run(RunArgs),

    /// Print the exploratory analysis of the two files
    Explore(ExploreArgs),

    /// Show the columns and quality scores of one file
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Input files; fall back to WINEQ_RED / WINEQ_WHITE
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Red wine file (semicolon-delimited)
    #[arg(long)]
    pub red: Option<PathBuf>,

    /// White wine file (semicolon-delimited)
    #[arg(long)]
    pub white: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// JSON study configuration; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for the report files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Comma-separated models (e.g. lr,rf,svm)
    #[arg(short, long)]
    pub models: Option<String>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    pub test_size: Option<f64>,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tuning metric (roc_auc, accuracy, f1)
    #[arg(long)]
    pub scoring: Option<String>,

    /// Quality score at or above which a wine is good
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Leave the red/white flag out of the features
    #[arg(long)]
    pub no_origin: bool,
}

impl RunArgs {
    /// Merge the config file, flags and environment into one configuration
    pub fn to_config(&self) -> anyhow::Result<StudyConfig> {
        let mut config = match &self.config {
            Some(path) => StudyConfig::load(path)?,
            None => StudyConfig::default(),
        };

        if let Some(red) = &self.data.red {
            config.red_path = Some(red.clone());
        }
        if let Some(white) = &self.data.white {
            config.white_path = Some(white.clone());
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(models) = &self.models {
            config.models = ModelKind::parse_list(models)?;
        }
        if let Some(folds) = self.cv_folds {
            config.cv_folds = folds;
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(scoring) = &self.scoring {
            config.scoring = Scoring::parse(scoring)?;
        }
        if let Some(threshold) = self.threshold {
            config.label_threshold = threshold;
        }
        if self.no_origin {
            config.include_origin = false;
        }

        let config = config.apply_env();
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExploreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Quality score at or above which a wine is good
    #[arg(long, default_value = "6")]
    pub threshold: f64,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    let (red, white) = config.data_paths()?;

    section("Wine quality study");
    step_run("Loading data");
    let start = Instant::now();
    let dataset = load_wine_pair(red, white, &config)?;
    step_done(&format!(
        "{} rows × {} features in {:?}",
        dataset.n_samples(),
        dataset.n_features(),
        start.elapsed()
    ));
    println!(
        "  {} {}",
        muted("models"),
        config.models.iter().map(|k| k.key()).collect::<Vec<_>>().join(", ")
    );
    println!(
        "  {} {}-fold stratified CV, scoring {}, test size {}, seed {}",
        muted("tuning"),
        config.cv_folds,
        config.scoring,
        config.test_size,
        config.seed
    );

    let start = Instant::now();
    let study = ModelComparison::run(&dataset, &config)?;
    let elapsed = start.elapsed();

    report::print_eda(&study.eda);
    for model in &study.models {
        report::print_model(model);
    }
    report::print_failures(&study.failures);
    report::print_comparison(&study.table);

    println!();
    let files = report::write_all(&study, &config.output_dir)?;
    step_ok(&format!("comparison table → {}", files.csv.display()));
    step_ok(&format!("full results → {}", files.json.display()));
    if let Some(roc) = &files.roc {
        step_ok(&format!("ROC curves → {}", roc.display()));
    }
    step_ok(&format!("report → {}", files.markdown.display()));
    println!("  {}", dim(&format!("finished in {:.1}s", elapsed.as_secs_f64())));
    println!();
    Ok(())
}

pub fn cmd_explore(args: &ExploreArgs) -> anyhow::Result<()> {
    let config = StudyConfig {
        red_path: args.data.red.clone(),
        white_path: args.data.white.clone(),
        label_threshold: args.threshold,
        ..StudyConfig::default()
    }
    .apply_env();
    config.validate()?;
    let (red, white) = config.data_paths()?;

    step_run("Loading data");
    let dataset = load_wine_pair(red, white, &config)?;
    step_done(&format!("{} rows", dataset.n_samples()));

    report::print_eda(&analyze(&dataset));
    println!();
    Ok(())
}

/// Origin implied by a file name, white unless it mentions red
fn origin_from_name(path: &Path) -> Origin {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.contains("red") {
        Origin::Red
    } else {
        Origin::White
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let separator = detect_separator(data_path)?;
    let loader = WineLoader::new().with_separator(separator);
    let df = loader.load_frame(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {:?}", muted("Separator"), separator as char);
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!("  {:<24} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(54)));
    for col in df.get_columns() {
        println!(
            "  {:<24} {:<12} {:>6} {:>8}",
            col.name().as_str(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    match loader.frame_to_dataset(&df, origin_from_name(data_path)) {
        Ok(dataset) => {
            let eda = analyze(&dataset);
            section("Quality scores");
            for (quality, count) in &eda.quality_counts {
                println!("  {:>3} {:>6}", quality, count);
            }
            println!();
            step_ok(&format!(
                "{} complete rows, {} good at quality >= {}",
                dataset.n_samples(),
                eda.positives,
                eda.label_threshold
            ));
        }
        Err(e) => {
            println!();
            println!("  {} {}", "not a wine quality file:".yellow(), e);
        }
    }

    println!();
    Ok(())
}
