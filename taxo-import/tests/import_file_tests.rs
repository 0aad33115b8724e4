//! File to database imports, the way the CLI runs them

mod helpers;

use chrono::Utc;
use helpers::{fast_options, term_under};
use std::io::Write;
use taxo_common::config::ImportConfig;
use taxo_common::db::{init_database, FieldKind, FieldValue, GeoPoint, ROOT_PARENT};
use taxo_import::config::resolve_import_config;
use taxo_import::db::runs::{list_runs, load_run, save_run};
use taxo_import::decoder::{decode_file, SourceFormat};
use taxo_import::throttle::throttle_for;
use taxo_import::{ImportError, ImportOptions, Importer, SqliteTermRepository, TermRepository};
use tempfile::TempDir;

const CITIES_CSV: &str = "\
Name,Parent,Description,field_population,field_location,field_mayor
Toronto,Ontario,Provincial capital,2794356,\"43.65,-79.38\",Olivia Chow
Ottawa,Ontario,,1017449,\"45.42,-75.70\",
Springfield,Illinois,State capital,114394,,
Springfield,Missouri,,169176,,
,Nowhere,dropped,,,
Yukon,,Territory,,,
";

const CITIES_XML: &str = r#"<?xml version="1.0"?>
<terms>
  <term parent="Ontario">
    <name>Toronto</name>
    <field_population>2794356</field_population>
    <field_location lat="43.65" lng="-79.38"/>
  </term>
  <term>
    <name>Yukon</name>
    <description>Territory</description>
  </term>
</terms>
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

async fn open_store(dir: &TempDir) -> SqliteTermRepository {
    let pool = init_database(&dir.path().join("taxo.db")).await.unwrap();
    SqliteTermRepository::new(pool)
}

#[tokio::test]
async fn test_csv_import_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cities.csv", CITIES_CSV);
    let repo = open_store(&dir).await;

    let vocab = repo.get_or_create_vocabulary("Cities").await.unwrap();
    repo.declare_field(vocab.id, "field_population", FieldKind::Number).await.unwrap();
    repo.declare_field(vocab.id, "field_location", FieldKind::Geolocation).await.unwrap();

    let decoded = decode_file(&path, None).unwrap();
    assert_eq!(decoded.rows.len(), 5);
    assert_eq!(decoded.dropped_lines, vec![6]);

    let started_at = Utc::now();
    let report = Importer::new(&repo, fast_options(2))
        .import_rows(vocab.id, &decoded.rows, false)
        .await
        .unwrap();

    assert_eq!(report.processed, 5);
    assert_eq!(report.created, 5);
    assert_eq!(report.parents_created, 3);
    assert_eq!(report.failed, 0);
    // field_mayor is not declared
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(repo.count_terms(vocab.id).await.unwrap(), 8);

    let ontario = term_under(&repo, vocab.id, "Ontario", ROOT_PARENT).await;
    let toronto = term_under(&repo, vocab.id, "Toronto", ontario.id).await;
    assert_eq!(toronto.description, "Provincial capital");
    assert_eq!(toronto.fields.get("field_population"), Some(&FieldValue::Number(2794356.0)));
    assert_eq!(
        toronto.fields.get("field_location"),
        Some(&FieldValue::Geo(GeoPoint::new(43.65, -79.38)))
    );

    let ottawa = term_under(&repo, vocab.id, "Ottawa", ontario.id).await;
    assert_eq!(ottawa.description, "");

    save_run(repo.pool(), &path.display().to_string(), &report, started_at, Some(Utc::now()))
        .await
        .unwrap();
    let runs = list_runs(repo.pool(), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, report.run_id);
    assert_eq!(runs[0].report.created, 5);

    // Re-importing the same file writes nothing
    let again = Importer::new(&repo, fast_options(2))
        .import_rows(vocab.id, &decoded.rows, false)
        .await
        .unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.updated, 0);
    assert_eq!(again.unchanged, 5);
    assert_eq!(repo.count_terms(vocab.id).await.unwrap(), 8);

    save_run(repo.pool(), &path.display().to_string(), &again, Utc::now(), None)
        .await
        .unwrap();
    let loaded = load_run(repo.pool(), again.run_id).await.unwrap().unwrap();
    assert_eq!(loaded.report.unchanged, 5);
    assert_eq!(loaded.ended_at, None);
}

#[tokio::test]
async fn test_xml_and_csv_agree() {
    let dir = TempDir::new().unwrap();
    let xml_path = write_file(&dir, "cities.xml", CITIES_XML);
    let csv_path = write_file(&dir, "cities.csv", CITIES_CSV);
    let repo = open_store(&dir).await;

    let vocab = repo.get_or_create_vocabulary("Cities").await.unwrap();
    repo.declare_field(vocab.id, "field_population", FieldKind::Number).await.unwrap();
    repo.declare_field(vocab.id, "field_location", FieldKind::Geolocation).await.unwrap();

    let xml = decode_file(&xml_path, None).unwrap();
    let report = Importer::new(&repo, fast_options(50))
        .import_rows(vocab.id, &xml.rows, false)
        .await
        .unwrap();
    assert_eq!(report.created, 2);

    let csv = decode_file(&csv_path, Some(SourceFormat::Csv)).unwrap();
    let report = Importer::new(&repo, fast_options(50))
        .import_rows(vocab.id, &csv.rows, false)
        .await
        .unwrap();

    // Toronto gains its description; Yukon already matches
    assert_eq!(report.updated, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.created, 3);
}

#[tokio::test]
async fn test_unknown_extension_needs_format() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "cities.dat", CITIES_CSV);

    assert!(matches!(
        decode_file(&path, None),
        Err(ImportError::UnsupportedFormat(_))
    ));
    assert_eq!(decode_file(&path, Some(SourceFormat::Csv)).unwrap().rows.len(), 5);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = decode_file(&dir.path().join("absent.csv"), None);
    assert!(matches!(result, Err(ImportError::Io(_))));
}

#[tokio::test]
async fn test_stored_settings_drive_the_importer() {
    let dir = TempDir::new().unwrap();
    let repo = open_store(&dir).await;

    taxo_common::db::settings::set_setting(repo.pool(), "import_progress_interval", 2usize)
        .await
        .unwrap();
    taxo_common::db::settings::set_setting(repo.pool(), "import_batch_pause_ms", 0u64)
        .await
        .unwrap();
    taxo_common::db::settings::set_setting(repo.pool(), "import_parent_pause_ms", 0u64)
        .await
        .unwrap();

    let config = resolve_import_config(repo.pool(), &ImportConfig::default())
        .await
        .unwrap();
    assert_eq!(config.progress_interval, 2);

    let vocab = repo.get_or_create_vocabulary("Cities").await.unwrap();
    let rows = vec![
        helpers::row(1, "Whitehorse", Some("Yukon")),
        helpers::row(2, "Dawson", Some("Yukon")),
        helpers::row(3, "Watson Lake", Some("Yukon")),
    ];
    let report = Importer::new(&repo, ImportOptions::from_config(&config))
        .with_throttle(throttle_for(&config))
        .import_rows(vocab.id, &rows, false)
        .await
        .unwrap();

    assert_eq!(report.created, 3);
    assert_eq!(report.parents_created, 1);
}
