//! quickexit-stats - analyses for the quick exit usability study
//!
//! A CLI tool that computes inter-rater agreement on the annotation
//! survey, per-site Likert scores, and chi-squared tests of quick exit
//! mechanism presence.
//!
//! Exit codes:
//!   0 - Success (undefined statistics are reported, not fatal)
//!   1 - Runtime error (missing input, bad CSV, invalid config, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod survey;

use analysis::{AgreementCalculator, CategoryScheme, PresenceTest};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::Config;
use models::{AgreementMetadata, AgreementReport, Mechanism, Platform, SignificanceReport};
use report::RenderOptions;
use std::path::{Path, PathBuf};
use survey::SurveyLoader;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Report paths used when neither the CLI nor the config names one.
const AGREEMENT_REPORT: &str = "agreement_report.md";
const SIGNIFICANCE_REPORT: &str = "significance_report.md";

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("quickexit-stats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .quickexit.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the rater roster, questions, regions, and categories.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration, apply CLI overrides, and dispatch the subcommand.
fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let options = RenderOptions {
        precision: config.report.precision,
        hide_neutral_cells: config.report.hide_neutral_cells,
    };

    let format = config.report.format;

    match args.command {
        Some(Command::Agreement {
            ref annotations, ..
        }) => {
            let output = config.report.output_or(AGREEMENT_REPORT);
            run_agreement(&config, annotations, &output, format, options)
        }
        Some(Command::Scores {
            ref annotations,
            ref output,
            ref site_info,
            ref timings,
        }) => match site_info {
            Some(site_info) => run_dataset(&config, annotations, site_info, timings, output),
            None => run_scores(&config, annotations, output),
        },
        Some(Command::Significance {
            ref sites,
            platform,
            mechanism,
            collapsed,
            ..
        }) => run_significance(
            &config,
            SignificanceJob {
                sites,
                platform,
                mechanism,
                collapsed,
                output: &config.report.output_or(SIGNIFICANCE_REPORT),
                format,
            },
            options,
        ),
        None => anyhow::bail!("No subcommand given"),
    }
}

/// Compute Fleiss' and Cohen's Kappa per question and write the report.
fn run_agreement(
    config: &Config,
    annotations: &Path,
    output: &Path,
    format: OutputFormat,
    options: RenderOptions,
) -> Result<()> {
    let roster = config.raters.roster()?;
    let questions = config.survey.questions()?;

    println!("📥 Loading annotations: {}", annotations.display());
    let survey = SurveyLoader::new(questions.clone())
        .load(annotations)
        .with_context(|| format!("Failed to load annotations from {}", annotations.display()))?;

    if survey.is_empty() {
        warn!("No submissions found in {}", annotations.display());
    }
    info!(
        "Loaded {} submissions across {} site groups",
        survey.record_count(),
        survey.group_count()
    );

    let (first, second) = roster.pair();
    println!("🔬 Computing agreement for {} questions...", questions.len());
    println!("   Rater pair: {} / {}", first, second);

    let calculator = AgreementCalculator::new(&roster);
    let fleiss_panel = calculator.fleiss_panel(&survey);
    println!("   Fleiss panel: {}", fleiss_panel.join(", "));
    let results = calculator.compute(&survey, &questions);

    let report = AgreementReport {
        metadata: AgreementMetadata {
            source: annotations.display().to_string(),
            generated_at: Utc::now(),
            rater_pair: (first.to_string(), second.to_string()),
            excluded_raters: roster.excluded().to_vec(),
            fleiss_panel,
            site_groups: survey.group_count(),
            records: survey.record_count(),
        },
        questions: results,
    };

    let content = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_agreement_markdown(&report, options),
    };
    std::fs::write(output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    // Print summary
    println!("\n📊 Agreement Summary:");
    for q in &report.questions {
        println!(
            "   {:<20} Fleiss {:>9}   Cohen {:>9}   ({} groups)",
            q.question.label(),
            report::format_stat(q.fleiss, options.precision),
            report::format_stat(q.cohen, options.precision),
            q.qualifying_groups
        );
    }
    println!("\n✅ Report saved to: {}", output.display());

    Ok(())
}

/// Write mean Likert scores per site group as CSV.
fn run_scores(config: &Config, annotations: &Path, output: &Path) -> Result<()> {
    let questions = config.survey.questions()?;

    println!("📥 Loading annotations: {}", annotations.display());
    let survey = SurveyLoader::new(questions.clone())
        .load(annotations)
        .with_context(|| format!("Failed to load annotations from {}", annotations.display()))?;

    let scores = analysis::mean_scores(&survey, &questions);

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    analysis::write_scores_csv(&scores, &questions, file)
        .with_context(|| format!("Failed to write scores to {}", output.display()))?;

    println!(
        "\n✅ Scores for {} site groups saved to: {}",
        scores.len(),
        output.display()
    );
    Ok(())
}

/// Join site info, mean scores and timings into one CSV row per site.
fn run_dataset(
    config: &Config,
    annotations: &Path,
    site_info: &Path,
    timing_files: &[PathBuf],
    output: &Path,
) -> Result<()> {
    let questions = config.survey.questions()?;

    println!("📥 Loading annotations: {}", annotations.display());
    let survey = SurveyLoader::new(questions.clone())
        .load(annotations)
        .with_context(|| format!("Failed to load annotations from {}", annotations.display()))?;

    println!("📥 Loading site info: {}", site_info.display());
    let sites = survey::load_site_info(site_info)
        .with_context(|| format!("Failed to load site info from {}", site_info.display()))?;

    let timings = survey::load_timings(timing_files).context("Failed to load timing data")?;
    info!(
        "Loaded {} sites, timings for {} site groups from {} files",
        sites.len(),
        timings.site_count(),
        timing_files.len()
    );

    let rows = analysis::combine(&sites, &survey, &timings, &questions);

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    analysis::write_dataset_csv(&rows, &questions, file)
        .with_context(|| format!("Failed to write dataset to {}", output.display()))?;

    println!(
        "\n✅ Combined dataset for {} sites saved to: {}",
        rows.len(),
        output.display()
    );
    Ok(())
}

/// Inputs of one presence test run.
struct SignificanceJob<'a> {
    sites: &'a Path,
    platform: Platform,
    mechanism: Mechanism,
    collapsed: bool,
    output: &'a Path,
    format: OutputFormat,
}

/// Run the chi-squared presence test and write the report.
fn run_significance(config: &Config, job: SignificanceJob<'_>, options: RenderOptions) -> Result<()> {
    let settings = &config.significance;

    println!("📥 Loading site list: {}", job.sites.display());
    let sites = survey::load_site_list(job.sites)
        .with_context(|| format!("Failed to load site list from {}", job.sites.display()))?;
    info!("Loaded {} sites", sites.len());

    let scheme = if job.collapsed {
        CategoryScheme::collapsed(&settings.collapsed)
    } else {
        CategoryScheme::fine(&settings.categories)
    };

    println!(
        "🔬 Testing presence of {} {} across {} regions x {} categories...",
        job.platform,
        job.mechanism,
        settings.regions.len(),
        scheme.columns().len()
    );

    let result = PresenceTest::new(&settings.regions, &scheme)
        .with_population(settings.population)
        .run(&sites, job.platform, job.mechanism);

    let report = SignificanceReport {
        source: job.sites.display().to_string(),
        generated_at: Utc::now(),
        result,
    };

    let content = match job.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_significance_markdown(&report, options),
    };
    std::fs::write(job.output, &content)
        .with_context(|| format!("Failed to write report to {}", job.output.display()))?;

    let result = &report.result;
    println!("\n📊 Chi-Squared Summary:");
    println!("   Present: {} of {}", result.present, result.population);
    println!(
        "   χ² = {:.*}, dof = {}, p = {:.*}",
        options.precision, result.chi2, result.dof, options.precision, result.p_value
    );
    println!("\n✅ Report saved to: {}", job.output.display());

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
