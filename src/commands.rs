//! Subcommand bodies of the `rusty-ae` binary. Operators are passed in, so
//! the same paths run against the terminal or against scripted answers.

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::data::flatten::flatten;
use crate::data::loader::load_dataset;
use crate::data::model::Dataset;
use crate::data::writer::{artifact_path, dataset_path, save_dataset, OutputFormat, Stage};
use crate::error::PipelineResult;
use crate::ingest::{read_capture, Instrument};
use crate::stages::energy::EnergyFilter;
use crate::stages::toa::{SelectionOracle, ToaEngine};
use crate::stages::visual::{DecisionOracle, VisualFilter};

/// A capture file and how to read it.
#[derive(Debug, Clone, Copy)]
pub struct CaptureSource<'a> {
    pub path: &'a Path,
    pub time_file: Option<&'a Path>,
    pub instrument: Instrument,
}

/// Files written by a visual review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewArtifacts {
    pub kept: PathBuf,
    pub noise: PathBuf,
}

fn read_source(source: &CaptureSource<'_>) -> PipelineResult<(Dataset, usize)> {
    let capture = read_capture(source.instrument, source.path, source.time_file)?;
    let channels = capture.channel_count();
    Ok((flatten(capture.signals)?, channels))
}

/// Parse a capture and write it unfiltered as `<stem>.<ext>`.
pub fn ingest(source: &CaptureSource<'_>, format: OutputFormat) -> PipelineResult<PathBuf> {
    let (dataset, _) = read_source(source)?;
    let path = dataset_path(source.path, format);
    save_dataset(&dataset, &path)?;
    Ok(path)
}

/// Parse a capture and review it straight away. Events are grouped by the
/// channel count the capture itself reports.
pub fn ingest_and_review<O>(
    source: &CaptureSource<'_>,
    config: &PipelineConfig,
    format: OutputFormat,
    reviewer: &mut O,
) -> PipelineResult<ReviewArtifacts>
where
    O: DecisionOracle + ?Sized,
{
    let (dataset, channels) = read_source(source)?;
    let filter = VisualFilter::new(config.pairing, channels);
    partition(&filter, &dataset, source.path, format, reviewer)
}

/// Review an existing dataset with the configured channel count.
pub fn review<O>(
    path: &Path,
    config: &PipelineConfig,
    format: OutputFormat,
    reviewer: &mut O,
) -> PipelineResult<ReviewArtifacts>
where
    O: DecisionOracle + ?Sized,
{
    let dataset = load_dataset(path)?;
    partition(&VisualFilter::from_config(config), &dataset, path, format, reviewer)
}

fn partition<O>(
    filter: &VisualFilter,
    dataset: &Dataset,
    original: &Path,
    format: OutputFormat,
    reviewer: &mut O,
) -> PipelineResult<ReviewArtifacts>
where
    O: DecisionOracle + ?Sized,
{
    let split = filter.apply(dataset, reviewer)?;
    let artifacts = ReviewArtifacts {
        kept: artifact_path(original, Stage::Filter, format),
        noise: artifact_path(original, Stage::Noise, format),
    };
    save_dataset(&split.kept, &artifacts.kept)?;
    save_dataset(&split.noise, &artifacts.noise)?;
    Ok(artifacts)
}

/// Energy-filter a dataset into `<stem>_energy_filter_<threshold>.<ext>`.
pub fn energy(
    path: &Path,
    config: &PipelineConfig,
    format: OutputFormat,
) -> PipelineResult<PathBuf> {
    let dataset = load_dataset(path)?;
    let filter = EnergyFilter::from_config(config);
    let kept = filter.apply(&dataset)?;
    let out = artifact_path(path, Stage::EnergyFilter(filter.threshold()), format);
    save_dataset(&kept, &out)?;
    Ok(out)
}

/// Pick arrival times into `<stem>_toa.<ext>`.
pub fn toa<O>(
    path: &Path,
    config: &PipelineConfig,
    format: OutputFormat,
    selector: &mut O,
) -> PipelineResult<PathBuf>
where
    O: SelectionOracle + ?Sized,
{
    let dataset = load_dataset(path)?;
    let picked = ToaEngine::from_config(config).run(dataset, selector)?;
    let out = artifact_path(path, Stage::Toa, format);
    save_dataset(&picked, &out)?;
    Ok(out)
}
