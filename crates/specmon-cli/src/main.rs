//! Spectrum Occupancy Command-Line Interface
//!
//! This CLI provides tools for:
//! - Inspecting sweep exports
//! - Band occupancy analysis with license correlation
//! - Auto-threshold previews, peak detection and band statistics
//! - Comparing two sweeps of the same band
//! - Generating synthetic sweeps and registries

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use specmon_core::prelude::*;
use specmon_sim::{RegistryConfig, RegistryGenerator, SweepConfig, SweepGenerator};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "specmon")]
#[command(author, version, about = "Spectrum occupancy analysis CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (stdout if not specified)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ThresholdArgs {
    /// Manual threshold in dBµV/m
    #[arg(long, short = 't', conflicts_with = "auto")]
    threshold: Option<f64>,

    /// Use noise floor plus margin instead of a fixed threshold
    #[arg(long)]
    auto: bool,

    /// Auto-threshold margin in dB
    #[arg(long, short = 'm')]
    margin: Option<f64>,
}

impl ThresholdArgs {
    fn mode(&self, config: &SpecmonConfig) -> ThresholdMode {
        if self.auto {
            ThresholdMode::Auto {
                margin_db: self.margin.unwrap_or(config.threshold.default_margin_db),
            }
        } else {
            ThresholdMode::Manual {
                threshold: self.threshold.unwrap_or(config.threshold.default_threshold),
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show metadata and band layout of a sweep export
    Info {
        /// Sweep export file
        input: PathBuf,
    },

    /// Analyze band occupancy and correlate with the license registry
    Analyze {
        /// Sweep export file
        input: PathBuf,

        /// Band number (1-based)
        #[arg(long, short = 'b', default_value = "1")]
        band: u32,

        #[command(flatten)]
        threshold: ThresholdArgs,

        /// License registry (JSON array of records)
        #[arg(long, short = 'r')]
        registry: Option<PathBuf>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Preview the noise floor and auto threshold of a band
    AutoThreshold {
        /// Sweep export file
        input: PathBuf,

        /// Band number (1-based)
        #[arg(long, short = 'b', default_value = "1")]
        band: u32,

        /// Margin above the noise floor in dB
        #[arg(long, short = 'm')]
        margin: Option<f64>,
    },

    /// List raw channels of a band or of the whole sweep
    Channels {
        /// Sweep export file
        input: PathBuf,

        /// Band number; all bands when omitted
        #[arg(long, short = 'b')]
        band: Option<u32>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Detect distinct emission peaks in a band
    Peaks {
        /// Sweep export file
        input: PathBuf,

        /// Band number (1-based)
        #[arg(long, short = 'b', default_value = "1")]
        band: u32,

        #[command(flatten)]
        threshold: ThresholdArgs,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Field strength statistics of a band
    Stats {
        /// Sweep export file
        input: PathBuf,

        /// Band number (1-based)
        #[arg(long, short = 'b', default_value = "1")]
        band: u32,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Compare a band of two sweeps at their common frequencies
    Compare {
        /// Current sweep export
        input: PathBuf,

        /// Sweep export to compare against
        other: PathBuf,

        /// Band number of the current sweep
        #[arg(long, short = 'b', default_value = "1")]
        band: u32,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Generate a synthetic FM-band sweep and optional registry
    Simulate {
        /// Output sweep export file
        #[arg(short, long, default_value = "simulated.csv")]
        output: PathBuf,

        /// Random seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Mean noise floor in dBµV/m
        #[arg(long, default_value = "25.0")]
        noise_floor: f64,

        /// Also write a matching license registry (JSON)
        #[arg(long)]
        registry: Option<PathBuf>,

        /// Fraction of carriers that receive a license
        #[arg(long, default_value = "0.8")]
        licensed_fraction: f64,
    },

    /// Print the effective configuration, or an example file
    Config {
        /// Print an example configuration instead
        #[arg(long)]
        example: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn load_config(path: Option<&Path>) -> Result<SpecmonConfig> {
    match path {
        Some(p) => SpecmonConfig::load_from(p)
            .with_context(|| format!("Failed to load config from {:?}", p)),
        None => SpecmonConfig::load().context("Failed to load config"),
    }
}

fn open_sweep(service: &OccupancyService, input: &Path) -> Result<MeasurementId> {
    let ingested = service
        .ingest_file(input)
        .with_context(|| format!("Failed to read sweep {:?}", input))?;
    for warning in &ingested.warnings {
        warn!("{}", warning);
    }
    Ok(ingested.id)
}

fn emit(text: &str, output: Option<PathBuf>, what: &str) -> Result<()> {
    if let Some(output_path) = output {
        std::fs::write(&output_path, text)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        println!("{} written to {:?}", what, output_path);
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn cmd_info(service: &OccupancyService, input: PathBuf) -> Result<()> {
    let id = open_sweep(service, &input)?;
    let m = service.measurement(id)?;

    println!("=== Sweep Export ===");
    println!("File: {}", m.filename());
    for (key, value) in m.metadata() {
        println!("  {:<20} {}", key, value);
    }
    if let Some(loc) = m.location() {
        println!("Location:           {:.6}, {:.6}", loc.lat, loc.lon);
    }
    if let (Some(start), Some(stop)) = (m.start_time(), m.stop_time()) {
        println!("Sweep window:       {} - {}", start, stop);
    }
    println!();
    println!("{:>4}  {:>12}  {:>12}  {:>10}  {:>10}", "Band", "Start (MHz)", "Stop (MHz)", "Channels", "Step (kHz)");
    for band in m.bands() {
        let step = band
            .channel_step()
            .map(|s| format!("{:.1}", s * 1000.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:>12.4}  {:>12.4}  {:>10}  {:>10}",
            band.band_number(),
            band.start_freq(),
            band.stop_freq(),
            band.len(),
            step
        );
    }
    Ok(())
}

fn cmd_analyze(
    service: &OccupancyService,
    input: PathBuf,
    band: u32,
    threshold: ThresholdArgs,
    registry: Option<PathBuf>,
    out: OutputArgs,
) -> Result<()> {
    if let Some(path) = registry {
        let count = service
            .load_registry(&path)
            .with_context(|| format!("Failed to load registry {:?}", path))?;
        info!("Loaded {} license records", count);
    } else {
        warn!("No registry given; every occupied channel will be reported unlicensed");
    }

    let id = open_sweep(service, &input)?;
    let request = AnalysisRequest {
        band_number: band,
        threshold: threshold.mode(service.config()),
    };
    let result = service.analyze(id, &request)?;

    let text = match out.format {
        OutputFormat::Json => result.to_json()?,
        OutputFormat::Csv => result.to_csv(),
        OutputFormat::Text => result.to_text(),
    };
    emit(&text, out.output, "Analysis")
}

fn cmd_auto_threshold(service: &OccupancyService, input: PathBuf, band: u32, margin: Option<f64>) -> Result<()> {
    let id = open_sweep(service, &input)?;
    let margin = margin.unwrap_or(service.config().threshold.default_margin_db);
    let auto = service.auto_threshold(id, band, margin)?;

    println!("Noise Floor:       {:.2} dBµV/m", auto.noise_floor);
    println!("Margin:            {:.2} dB", auto.margin_db);
    println!("Auto Threshold:    {:.2} dBµV/m", auto.auto_threshold);
    Ok(())
}

fn cmd_channels(service: &OccupancyService, input: PathBuf, band: Option<u32>, out: OutputArgs) -> Result<()> {
    let id = open_sweep(service, &input)?;
    let channels = service.list_channels(id, band)?;

    let text = match out.format {
        OutputFormat::Json => serde_json::to_string_pretty(&channels)?,
        OutputFormat::Csv => {
            let mut s = String::from("channel_no,frequency,max_field_strength,avg_field_strength\n");
            for c in &channels {
                s.push_str(&format!(
                    "{},{},{},{}\n",
                    c.channel_no, c.frequency, c.max_field_strength, c.avg_field_strength
                ));
            }
            s
        }
        OutputFormat::Text => {
            let mut s = format!("{:>6}  {:>12}  {:>8}  {:>8}\n", "No.", "Freq (MHz)", "Max", "Avg");
            for c in &channels {
                s.push_str(&format!(
                    "{:>6}  {:>12.4}  {:>8.1}  {:>8.1}\n",
                    c.channel_no, c.frequency, c.max_field_strength, c.avg_field_strength
                ));
            }
            s
        }
    };
    emit(&text, out.output, "Channels")
}

fn cmd_peaks(
    service: &OccupancyService,
    input: PathBuf,
    band: u32,
    threshold: ThresholdArgs,
    out: OutputArgs,
) -> Result<()> {
    let id = open_sweep(service, &input)?;
    let peaks = service.detect_peaks(id, band, threshold.mode(service.config()))?;

    let text = match out.format {
        OutputFormat::Json => PeakDetector::format_json(&peaks)?,
        OutputFormat::Csv => PeakDetector::format_csv(&peaks),
        OutputFormat::Text => PeakDetector::format_text(&peaks),
    };
    emit(&text, out.output, "Peaks")
}

fn cmd_stats(service: &OccupancyService, input: PathBuf, band: u32, out: OutputArgs) -> Result<()> {
    let id = open_sweep(service, &input)?;
    let stats = service.band_stats(id, band)?;

    let text = match out.format {
        OutputFormat::Json => stats.to_json()?,
        _ => stats.to_text(),
    };
    emit(&text, out.output, "Statistics")
}

fn cmd_compare(service: &OccupancyService, input: PathBuf, other: PathBuf, band: u32, out: OutputArgs) -> Result<()> {
    let current = open_sweep(service, &input)?;
    let other = open_sweep(service, &other)?;
    let comparison = service.compare(current, other, band)?;

    let text = match out.format {
        OutputFormat::Json => comparison.to_json()?,
        OutputFormat::Csv => comparison.to_csv(),
        OutputFormat::Text => comparison.to_text(),
    };
    emit(&text, out.output, "Comparison")
}

fn cmd_simulate(
    output: PathBuf,
    seed: Option<u64>,
    noise_floor: f64,
    registry: Option<PathBuf>,
    licensed_fraction: f64,
) -> Result<()> {
    let config = SweepConfig {
        seed,
        noise_floor_dbuv: noise_floor,
        ..SweepConfig::default()
    };
    let plans = config.bands.clone();
    let filename = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "simulated.csv".to_string());

    let text = SweepGenerator::new(config).generate_export(&filename)?;
    std::fs::write(&output, &text).with_context(|| format!("Failed to write {:?}", output))?;
    println!("Sweep written to {:?}", output);

    if let Some(path) = registry {
        let records = RegistryGenerator::new(RegistryConfig {
            licensed_fraction,
            seed: seed.map(|s| s.wrapping_add(1)),
            ..RegistryConfig::default()
        })
        .generate(&plans);
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        println!("Registry with {} records written to {:?}", records.len(), path);
    }
    Ok(())
}

fn cmd_config(config: &SpecmonConfig, example: bool) -> Result<()> {
    if example {
        print!("{}", SpecmonConfig::example_yaml());
    } else {
        print!("{}", config.to_yaml().context("Failed to render config")?);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::from_str(&config.logging.level).unwrap_or(tracing::Level::WARN),
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let service = OccupancyService::new(config.clone());

    match cli.command {
        Commands::Info { input } => cmd_info(&service, input),
        Commands::Analyze {
            input,
            band,
            threshold,
            registry,
            out,
        } => cmd_analyze(&service, input, band, threshold, registry, out),
        Commands::AutoThreshold { input, band, margin } => cmd_auto_threshold(&service, input, band, margin),
        Commands::Channels { input, band, out } => cmd_channels(&service, input, band, out),
        Commands::Peaks {
            input,
            band,
            threshold,
            out,
        } => cmd_peaks(&service, input, band, threshold, out),
        Commands::Stats { input, band, out } => cmd_stats(&service, input, band, out),
        Commands::Compare {
            input,
            other,
            band,
            out,
        } => cmd_compare(&service, input, other, band, out),
        Commands::Simulate {
            output,
            seed,
            noise_floor,
            registry,
            licensed_fraction,
        } => cmd_simulate(output, seed, noise_floor, registry, licensed_fraction),
        Commands::Config { example } => cmd_config(&config, example),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
    }
}
