use std::path::Path;

use assert_approx_eq::assert_approx_eq;
use rusty_ae::data::loader::load_dataset;
use rusty_ae::data::model::{Dataset, WaveformRecord};
use rusty_ae::data::writer::{artifact_path, save_dataset, OutputFormat, Stage};
use rusty_ae::error::{PipelineError, SchemaError};
use tempfile::tempdir;

fn sample_dataset(with_toa: bool) -> Dataset {
    let records = vec![
        WaveformRecord::new("batch_a.txt", 1, 1, vec![0.25, -1.5e-3, 3.0]).with_time(0.125),
        WaveformRecord::new("batch_a.txt", 2, 1, vec![1.0, 2.0, -0.5]).with_time(1.75),
        WaveformRecord::new("batch_a.txt", 1, 2, vec![-0.75, 0.0, 1e-9]).with_time(0.125),
        WaveformRecord::new("batch_a.txt", 2, 2, vec![4.0, 0.5, 0.1]).with_time(1.75),
    ];
    let records = if with_toa {
        records
            .into_iter()
            .zip([0.0, 12.3, 5.0, 20.1])
            .map(|(r, t)| r.with_toa(t))
            .collect()
    } else {
        records
    };
    Dataset::from_records(records).unwrap()
}

fn assert_same(expected: &Dataset, loaded: &Dataset) {
    assert_eq!(loaded.len(), expected.len());
    assert_eq!(loaded.events(), expected.events());
    assert_eq!(loaded.sensors(), expected.sensors());
    assert_eq!(loaded.parent_sources(), expected.parent_sources());
    for (a, b) in expected.waves().iter().zip(loaded.waves()) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert_approx_eq!(*x, *y, 1e-12);
        }
    }
    for (x, y) in expected.times().iter().zip(loaded.times()) {
        assert_approx_eq!(*x, *y, 1e-12);
    }
    assert_eq!(loaded.toa().is_some(), expected.toa().is_some());
    if let (Some(a), Some(b)) = (expected.toa(), loaded.toa()) {
        for (x, y) in a.iter().zip(b) {
            assert_approx_eq!(*x, *y, 1e-12);
        }
    }
}

fn round_trip(dir: &Path, name: &str, dataset: &Dataset) -> Dataset {
    let path = dir.join(name);
    save_dataset(dataset, &path).unwrap();
    load_dataset(&path).unwrap()
}

#[test]
fn json_round_trip() {
    let dir = tempdir().unwrap();
    for with_toa in [false, true] {
        let dataset = sample_dataset(with_toa);
        assert_same(&dataset, &round_trip(dir.path(), "set.json", &dataset));
    }
}

#[test]
fn csv_round_trip() {
    let dir = tempdir().unwrap();
    for with_toa in [false, true] {
        let dataset = sample_dataset(with_toa);
        assert_same(&dataset, &round_trip(dir.path(), "set.csv", &dataset));
    }
}

#[test]
fn parquet_round_trip() {
    let dir = tempdir().unwrap();
    for with_toa in [false, true] {
        let dataset = sample_dataset(with_toa);
        assert_same(&dataset, &round_trip(dir.path(), "set.parquet", &dataset));
    }
}

#[test]
fn json_output_uses_canonical_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("set.json");
    save_dataset(&sample_dataset(false), &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let object = value.as_object().unwrap();
    for key in ["waves", "event", "sensor", "time", "parent_txt"] {
        assert!(object.contains_key(key), "missing {key}");
    }
    assert!(!object.contains_key("toa"));
    assert_eq!(object["sensor"], serde_json::json!([1, 1, 2, 2]));
}

#[test]
fn json_without_time_loads_with_zero_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("old.json");
    std::fs::write(
        &path,
        r#"{"waves": [[0.1, 0.2], [0.3, 0.4]], "event": [0, 0], "sensor": [1, 2],
            "parent_txt": ["scope.txt", "scope.txt"]}"#,
    )
    .unwrap();
    let dataset = load_dataset(&path).unwrap();
    assert_eq!(dataset.times(), &[0.0, 0.0]);
}

#[test]
fn json_without_waves_is_a_schema_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"event": [1], "sensor": [1], "parent_txt": ["a"]}"#).unwrap();
    assert!(matches!(
        load_dataset(&path),
        Err(PipelineError::Schema(SchemaError::MissingField("waves")))
    ));
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("set.xlsx");
    assert!(matches!(
        save_dataset(&sample_dataset(false), &path),
        Err(PipelineError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        load_dataset(&path),
        Err(PipelineError::UnsupportedFormat(_))
    ));
}

#[test]
fn stage_artifacts_sit_next_to_the_input() {
    let input = Path::new("/data/run_07.json");
    assert_eq!(
        artifact_path(input, Stage::Toa, OutputFormat::Json),
        Path::new("/data/run_07_toa.json")
    );
    assert_eq!(
        artifact_path(input, Stage::EnergyFilter(-1.0), OutputFormat::Csv),
        Path::new("/data/run_07_energy_filter_-1.0.csv")
    );
    assert_eq!(
        artifact_path(input, Stage::Noise, OutputFormat::Parquet),
        Path::new("/data/run_07_noise.parquet")
    );
}
