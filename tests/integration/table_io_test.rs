//! Reading metadata tables and writing harmonized output

use std::fs::File;

use age_harmonizer::{
    AgeHarmonizer, HarmonizerConfig, HarmonizerError, ValueSource, load_input, load_input_async,
    write_harmonized_csv, write_report_json,
};
use parquet::arrow::ArrowWriter;

use crate::utils::{cohort, metadata_batch, scratch_dir};

const METADATA_CSV: &str = "\
sample_id,age,infant_age,age_category,disease_stage
S1,34,NA,adult,II
S2,NA,90,newborn,I
S3,,,adult,III
S4,NA,NA,NA,I
S5,61,,adult,II
";

fn harmonizer() -> AgeHarmonizer {
    AgeHarmonizer::new(HarmonizerConfig::default().with_seed(11))
}

fn parse_cell(cell: &str) -> Option<f64> {
    (!cell.is_empty()).then(|| cell.parse().unwrap())
}

#[test]
fn test_csv_with_missing_tokens_round_trip() {
    let dir = scratch_dir("csv_round_trip");
    let input = dir.join("metadata.csv");
    std::fs::write(&input, METADATA_CSV).unwrap();

    let batches = load_input(&input, 1024).unwrap();
    let output = harmonizer().harmonize_batches(&batches).unwrap();
    assert_eq!(output.report.input_rows, 5);
    assert_eq!(output.report.dropped_rows, 1);
    assert_eq!(output.rows.len(), 4);

    let out_path = dir.join("harmonized.csv");
    write_harmonized_csv(&out_path, &output.rows).unwrap();

    let written = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("Source,Original_Value,Original_Unit,Harmonized_Value,Harmonized_Unit,Harmonized_Age_Group")
    );

    let rows: Vec<Vec<&str>> = lines.map(|l| l.split(',').collect()).collect();
    assert_eq!(rows.len(), 4);

    assert_eq!(rows[0][0], "age");
    assert_eq!(parse_cell(rows[0][1]), Some(34.0));
    assert_eq!(rows[0][2], "year");
    assert_eq!(parse_cell(rows[0][3]), Some(34.0));
    assert_eq!(rows[0][5], "adult");

    assert_eq!(rows[1][0], "infant_age");
    assert_eq!(parse_cell(rows[1][1]), Some(90.0));
    assert_eq!(rows[1][2], "day");
    assert!((parse_cell(rows[1][3]).unwrap() - 90.0 / 365.0).abs() < 1e-9);
    assert_eq!(rows[1][4], "year");
    assert_eq!(rows[1][5], "infant");

    // adults are sampled from [34, 61]
    let imputed = parse_cell(rows[2][3]).unwrap();
    assert!(imputed == 34.0 || imputed == 61.0);
    assert_eq!(rows[2][5], "adult");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_required_column() {
    let dir = scratch_dir("missing_column");
    let input = dir.join("metadata.csv");
    std::fs::write(&input, "sample_id,age,age_category\nS1,34,adult\n").unwrap();

    let batches = load_input(&input, 1024).unwrap();
    let err = harmonizer().harmonize_batches(&batches).unwrap_err();
    assert!(matches!(err, HarmonizerError::MissingRequiredColumn(ref c) if c == "infant_age"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_negative_age_is_rejected() {
    let dir = scratch_dir("negative_age");
    let input = dir.join("metadata.tsv");
    std::fs::write(
        &input,
        "sample_id\tage\tinfant_age\tage_category\nS1\t-3\t\tchild\n",
    )
    .unwrap();

    let batches = load_input(&input, 1024).unwrap();
    let err = harmonizer().harmonize_batches(&batches).unwrap_err();
    assert!(matches!(
        err,
        HarmonizerError::InvalidNumericValue { ref column, row: 0, .. } if column == "age"
    ));

    std::fs::remove_dir_all(&dir).ok();
}

fn long_csv(tail: &str) -> String {
    let mut csv = String::from("sample_id,age,infant_age,age_category\n");
    for i in 0..1000 {
        csv.push_str(&format!("S{i},30,,adult\n"));
    }
    csv.push_str(tail);
    csv
}

#[test]
fn test_late_infant_age_survives_type_inference() {
    let dir = scratch_dir("late_infant_age");
    let input = dir.join("metadata.csv");
    std::fs::write(&input, long_csv("S1000,,90,newborn\n")).unwrap();

    let batches = load_input(&input, 4096).unwrap();
    let output = harmonizer().harmonize_batches(&batches).unwrap();
    assert_eq!(output.rows.len(), 1001);

    let infant = output.rows.last().unwrap();
    assert_eq!(infant.source, ValueSource::InfantAge);
    assert_eq!(infant.original_value, Some(90.0));
    assert_eq!(infant.age_group_label(), Some("infant"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_late_missing_tokens_survive_type_inference() {
    let dir = scratch_dir("late_missing_tokens");
    let input = dir.join("metadata.csv");
    std::fs::write(&input, long_csv("S1000,NA,NA,adult\n")).unwrap();

    let batches = load_input(&input, 4096).unwrap();
    let output = harmonizer().harmonize_batches(&batches).unwrap();
    assert_eq!(output.rows.len(), 1001);

    let imputed = output.rows.last().unwrap();
    assert!(imputed.imputed);
    assert_eq!(imputed.harmonized_value, Some(30.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_parquet_input() {
    let dir = scratch_dir("parquet_input");
    let input = dir.join("metadata.parquet");
    let batch = metadata_batch(&cohort());

    let file = File::create(&input).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let batches = load_input(&input, 8).unwrap();
    assert!(batches.len() > 1);

    let from_parquet = harmonizer().harmonize_batches(&batches).unwrap();
    let in_memory = harmonizer().harmonize_batches(&[batch]).unwrap();
    assert_eq!(from_parquet.rows, in_memory.rows);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_directory_input_keeps_file_order() {
    let dir = scratch_dir("directory_input");
    std::fs::write(
        dir.join("b_second.csv"),
        "sample_id,age,infant_age,age_category\nS3,70,,senior\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("a_first.csv"),
        "sample_id,age,infant_age,age_category\nS1,4,,child\nS2,,120,newborn\n",
    )
    .unwrap();
    std::fs::write(dir.join("notes.txt"), "not a table").unwrap();

    let batches = load_input(&dir, 1024).unwrap();
    let output = harmonizer().harmonize_batches(&batches).unwrap();
    let groups: Vec<_> = output.rows.iter().map(|r| r.age_group_label()).collect();
    assert_eq!(groups, vec![Some("child"), Some("infant"), Some("senior")]);
    assert_eq!(output.rows[2].row, 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_async_directory_load_matches_sync() {
    let dir = scratch_dir("async_directory");
    for (name, body) in [
        ("part_1.csv", "sample_id,age,infant_age,age_category\nS1,34,,adult\nS2,,,adult\n"),
        ("part_2.csv", "sample_id,age,infant_age,age_category\nS3,12,,schoolage\n"),
    ] {
        std::fs::write(dir.join(name), body).unwrap();
    }

    let sync_batches = load_input(&dir, 1024).unwrap();
    let async_batches = load_input_async(&dir, 1024).await.unwrap();
    assert_eq!(sync_batches, async_batches);

    let output = harmonizer().harmonize_batches(&async_batches).unwrap();
    assert_eq!(output.rows[1].harmonized_value, Some(34.0));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_report_json() {
    let dir = scratch_dir("report_json");
    let output = harmonizer()
        .harmonize_batches(&[metadata_batch(&cohort())])
        .unwrap();

    let path = dir.join("report.json");
    write_report_json(&path, &output.report).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["random_seed"], 11);
    assert_eq!(json["output_rows"], 21);
    assert_eq!(json["reconciliation"]["infant_age_corrections"], 1);
    assert_eq!(json["imputation"]["categories"][1]["category"], "child");
    assert_eq!(json["imputation"]["categories"][1]["strategy"], "median");

    std::fs::remove_dir_all(&dir).ok();
}
