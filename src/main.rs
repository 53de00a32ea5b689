use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use rusty_ae::commands::{self, CaptureSource};
use rusty_ae::config::{FilterSensor, Overrides, PipelineConfig};
use rusty_ae::data::axis::TimeAxis;
use rusty_ae::data::correlate::PairingStrategy;
use rusty_ae::data::writer::OutputFormat;
use rusty_ae::ingest::Instrument;
use rusty_ae::oracle::console::{ConsoleReviewer, ConsoleSelector};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON pipeline configuration; flags below override it
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// How records are grouped into events
    #[clap(long, global = true, value_enum)]
    pairing: Option<PairingStrategy>,

    /// Encoding of the written datasets
    #[clap(long, global = true, value_enum, default_value = "json")]
    output_format: OutputFormat,

    /// Write log records to a timestamped `<date>_log.txt` instead of stderr
    #[clap(long, global = true)]
    session_log: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Parse an instrument capture into a dataset
    Ingest(Ingest),

    /// Keep or discard each event of a dataset after looking at it
    Review(Review),

    /// Drop events whose mean channel energy is below a threshold
    Energy(Energy),

    /// Pick the time of arrival of every channel
    Toa(Toa),
}

#[derive(Parser)]
struct Ingest {
    /// Capture text file
    capture: PathBuf,

    /// Companion file holding one timestamp per event
    #[clap(long)]
    time_file: Option<PathBuf>,

    #[clap(long, value_enum, default_value = "digital-wave")]
    instrument: Instrument,

    /// Review events on the terminal and split into filter/noise datasets
    #[clap(long)]
    review: bool,
}

#[derive(Parser)]
struct Review {
    dataset: PathBuf,
}

#[derive(Parser)]
struct Energy {
    dataset: PathBuf,

    /// log10 energy an event must exceed
    #[clap(long, allow_negative_numbers = true)]
    threshold: Option<f64>,

    #[clap(long, value_enum)]
    filter_sensor: Option<FilterSensor>,
}

#[derive(Parser)]
struct Toa {
    dataset: PathBuf,

    /// Time axis preset; defaults to the configured axis
    #[clap(long, value_enum)]
    axis: Option<Instrument>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.session_log)?;

    let config = PipelineConfig::load(cli.config.as_deref()).context("reading pipeline config")?;
    let mut overrides = Overrides {
        pairing: cli.pairing,
        ..Overrides::default()
    };
    let format = cli.output_format;

    let written = match cli.mode {
        Mode::Ingest(args) => {
            let source = CaptureSource {
                path: &args.capture,
                time_file: args.time_file.as_deref(),
                instrument: args.instrument,
            };
            let config = config.with_overrides(overrides);
            let written = if args.review {
                let axis = TimeAxis::from_config(&args.instrument.axis());
                let mut reviewer = ConsoleReviewer::stdio().with_axis(axis);
                let artifacts =
                    commands::ingest_and_review(&source, &config, format, &mut reviewer);
                artifacts.map(|a| vec![a.kept, a.noise])
            } else {
                commands::ingest(&source, format).map(|path| vec![path])
            };
            written.with_context(|| format!("ingesting {}", args.capture.display()))?
        }
        Mode::Review(args) => {
            let config = config.with_overrides(overrides);
            let axis = TimeAxis::from_config(&config.axis);
            let mut reviewer = ConsoleReviewer::stdio().with_axis(axis);
            let artifacts = commands::review(&args.dataset, &config, format, &mut reviewer)
                .with_context(|| format!("reviewing {}", args.dataset.display()))?;
            vec![artifacts.kept, artifacts.noise]
        }
        Mode::Energy(args) => {
            overrides.energy_threshold = args.threshold;
            overrides.filter_sensor = args.filter_sensor;
            let config = config.with_overrides(overrides);
            let path = commands::energy(&args.dataset, &config, format)
                .with_context(|| format!("energy filtering {}", args.dataset.display()))?;
            vec![path]
        }
        Mode::Toa(args) => {
            overrides.axis = args.axis.map(Instrument::axis);
            let config = config.with_overrides(overrides);
            let mut selector = ConsoleSelector::stdio();
            let path = commands::toa(&args.dataset, &config, format, &mut selector)
                .with_context(|| format!("picking arrival times for {}", args.dataset.display()))?;
            vec![path]
        }
    };

    for path in written {
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn init_logging(session_log: bool) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let mut log_name = None;
    if session_log {
        let name = format!("{}_log.txt", Local::now().format("%Y-%m-%d_%H-%M-%S"));
        let file = File::create(&name).with_context(|| format!("creating session log {name}"))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
        log_name = Some(name);
    }
    builder.init();
    if let Some(name) = log_name {
        eprintln!("logging to {name}");
    }
    Ok(())
}
