use std::path::{Path, PathBuf};

use velo_etl::config::PipelineConfig;
use velo_etl::gtfs::load_reference_points;
use velo_etl::infra::FileSource;
use velo_etl::model::{Coordinates, TransitMode};
use velo_etl::output::{CsvSink, StationSink};
use velo_etl::pipeline::run_pipeline;
use velo_etl::report::{Degradation, DropReason};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn config(sink: &Path) -> PipelineConfig {
    PipelineConfig {
        feed_endpoint: fixture("stations.json").display().to_string(),
        reference_data_path: fixture("gtfs"),
        sink_connection: sink.to_path_buf(),
        ..Default::default()
    }
}

#[test]
fn test_reference_extraction_from_fixture() {
    let extraction = load_reference_points(&fixture("gtfs"));

    let metro: Vec<_> = extraction.sets.metro.iter().map(|p| p.name.as_str()).collect();
    let bus: Vec<_> = extraction.sets.bus.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(metro, vec!["Capitole", "Esquirol", "Jean Jaurès"]);
    assert_eq!(bus, vec!["Capitole", "Saint-Sernin"]);
    assert!(extraction.degradations.is_empty());

    let capitole_bus = &extraction.sets.bus[0];
    assert_eq!(capitole_bus.mode, TransitMode::Bus);
    assert_eq!(capitole_bus.position, Coordinates::new(43.6046, 1.4441));
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = CsvSink::new(dir.path().join("stations.csv"));
    let config = config(sink.path());
    let source = FileSource::new(&config.feed_endpoint);

    let report = run_pipeline(&config, &source, &sink).await.unwrap();

    assert_eq!(report.rows_loaded, 3);
    assert!(!report.is_degraded());

    let normalize = &report.stages[0];
    assert_eq!(normalize.input_rows, 6);
    assert_eq!(normalize.output_rows, 3);
    assert_eq!(normalize.dropped.get(&DropReason::NotOpen), Some(&1));
    assert_eq!(normalize.dropped.get(&DropReason::MissingPosition), Some(&1));
    assert_eq!(normalize.dropped.get(&DropReason::MalformedPosition), Some(&1));

    let content = std::fs::read_to_string(sink.path()).unwrap();
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[8], "metro_stations_nearby_500m");
    assert_eq!(&headers[9], "bus_stops_nearby_200m");

    let rows: Vec<Vec<String>> = rdr
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    let summary: Vec<(&str, &str, &str)> = rows
        .iter()
        .map(|r| (r[0].as_str(), r[8].as_str(), r[9].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("SAINT SERNIN", "0", "1"),
            ("CAPITOLE", "3", "1"),
            ("FAR SOUTH", "0", "0"),
        ]
    );
    assert!(rows.iter().all(|r| r[4] == "OPEN"));
}

#[tokio::test]
async fn test_pipeline_without_gtfs_still_loads_stations() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = CsvSink::new(dir.path().join("stations.csv"));
    let config = PipelineConfig {
        reference_data_path: dir.path().join("missing_gtfs"),
        ..config(sink.path())
    };
    let source = FileSource::new(&config.feed_endpoint);

    let report = run_pipeline(&config, &source, &sink).await.unwrap();

    assert_eq!(report.rows_loaded, 3);
    assert!(
        report
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::ReferenceDataUnavailable { .. }))
    );

    let content = std::fs::read_to_string(sink.path()).unwrap();
    for line in content.lines().skip(1) {
        assert!(line.ends_with(",0,0"), "unexpected row {line}");
    }
}

#[tokio::test]
async fn test_failed_feed_keeps_previous_table() {
    let dir = tempfile::TempDir::new().unwrap();
    let sink = CsvSink::new(dir.path().join("stations.csv"));
    let config = config(sink.path());

    let first = run_pipeline(&config, &FileSource::new(&config.feed_endpoint), &sink)
        .await
        .unwrap();
    assert_eq!(first.rows_loaded, 3);

    let missing = FileSource::new(dir.path().join("gone.json"));
    let second = run_pipeline(&config, &missing, &sink).await.unwrap();

    assert_eq!(second.rows_loaded, 0);
    assert!(second.degradations.contains(&Degradation::EmptyStationBatch));
    assert_eq!(sink.summary(1).unwrap().row_count, 3);
}
