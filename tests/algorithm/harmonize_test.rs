//! End-to-end behavior of the age harmonization pipeline

use age_harmonizer::algorithm::harmonize::reconcile;
use age_harmonizer::{
    AgeCategory, AgeHarmonizer, AgeRecord, AgeUnit, EmptyReferencePolicy, HarmonizerConfig,
    HarmonizerError, ImputationStrategy, OutputRow, ReferenceUnits, StrategyTable, ValueSource,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::utils::{Row, cohort, metadata_batch};

fn harmonizer() -> AgeHarmonizer {
    AgeHarmonizer::new(HarmonizerConfig::default().with_seed(2024))
}

#[test]
fn test_boundary_ages_decide_the_group() {
    let batch = metadata_batch(&[
        (Some(0), None, Some("adult")),
        (Some(11), None, Some("newborn")),
        (Some(12), None, Some("child")),
        (Some(65), None, Some("senior")),
        (Some(66), None, Some("adult")),
    ]);

    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    let groups: Vec<_> = output.rows.iter().map(|r| r.age_group_label()).collect();
    assert_eq!(
        groups,
        vec![
            Some("infant"),
            Some("child"),
            Some("schoolage"),
            Some("adult"),
            Some("senior"),
        ]
    );
    assert_eq!(output.report.reconciliation.category_overrides, 5);
}

#[test]
fn test_infant_age_of_a_year_or_more_is_corrected() {
    let reconciled = reconcile(AgeRecord::new(0, None, Some(500.0), Some(AgeCategory::Newborn)));
    assert_eq!(reconciled.age_category, Some(AgeCategory::Child));
    assert_eq!(reconciled.infant_age, None);

    let batch = metadata_batch(&cohort());
    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    let corrected = output.rows.iter().find(|r| r.row == 7).unwrap();
    assert_eq!(corrected.age_group, Some(AgeCategory::Child));
    assert_eq!(corrected.source, ValueSource::Age);
    assert_eq!(corrected.original_unit, AgeUnit::Year);
    assert_eq!(output.report.reconciliation.infant_age_corrections, 1);
}

#[test]
fn test_units_are_harmonized_to_years() {
    let batch = metadata_batch(&cohort());
    let output = harmonizer().harmonize_batches(&[batch]).unwrap();

    for row in &output.rows {
        assert_eq!(row.harmonized_unit, AgeUnit::Year);
        if row.source == ValueSource::InfantAge {
            assert_eq!(row.original_unit, AgeUnit::Day);
            let expected = row.original_value.unwrap() / 365.0;
            assert!((row.harmonized_value.unwrap() - expected).abs() < 1e-12);
        }
    }

    let infant = output.rows.iter().find(|r| r.row == 0).unwrap();
    assert_eq!(infant.source, ValueSource::InfantAge);
    assert!((infant.harmonized_value.unwrap() - 0.246_575_3).abs() < 1e-7);
}

#[test]
fn test_every_row_gets_a_value() {
    let batch = metadata_batch(&cohort());
    let output = harmonizer().harmonize_batches(&[batch]).unwrap();

    assert_eq!(output.report.input_rows, 22);
    assert_eq!(output.report.dropped_rows, 1);
    assert_eq!(output.rows.len(), 21);
    assert!(output.rows.iter().all(|r| r.harmonized_value.is_some()));
    assert_eq!(output.report.imputation.total_imputed(), 5);
    assert_eq!(output.report.imputation.total_unresolved(), 0);

    let uncategorized = output.rows.iter().find(|r| r.row == 20).unwrap();
    assert_eq!(uncategorized.age_group, None);
    assert_eq!(uncategorized.source, ValueSource::InfantAge);
}

#[test]
fn test_imputed_values_follow_category_strategies() {
    let batch = metadata_batch(&cohort());
    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    let value = |row: usize| {
        output
            .rows
            .iter()
            .find(|r| r.row == row)
            .and_then(|r| r.harmonized_value)
            .unwrap()
    };

    // newborn median over [0, 90 days, 200 days] in years
    assert!((value(3) - 90.0 / 365.0).abs() < 1e-12);
    // child median over [2, 5, 9]
    assert_eq!(value(7), 5.0);
    // schoolage mean over [13, 15, 17]
    assert_eq!(value(11), 15.0);
    // adult draws from [25, 34, 61]
    assert!([25.0, 34.0, 61.0].contains(&value(15)));
    assert!([25.0, 34.0, 61.0].contains(&value(16)));
    // senior median over [70, 82]
    assert_eq!(value(19), 76.0);

    let newborn = output.report.imputation.category(AgeCategory::Newborn).unwrap();
    assert_eq!(newborn.strategy, ImputationStrategy::Median);
    assert_eq!(newborn.observed, 3);
}

#[test]
fn test_rerun_on_reconstruction_keeps_age_groups() {
    let batch = metadata_batch(&cohort());
    let harmonizer = harmonizer();
    let first = harmonizer.harmonize_batches(&[batch]).unwrap();

    let reconstructed: Vec<AgeRecord> = first.rows.iter().map(|r| r.to_age_record()).collect();
    let second = harmonizer
        .harmonize_records(reconstructed, &mut StdRng::seed_from_u64(7))
        .unwrap();

    assert_eq!(first.rows.len(), second.rows.len());
    for (before, after) in first.rows.iter().zip(&second.rows) {
        assert_eq!(before.age_group, after.age_group, "row {}", before.row);
    }
    assert_eq!(second.report.imputation.total_imputed(), 0);
}

fn assert_rerun_keeps_groups(harmonizer: &AgeHarmonizer, rows: &[Row]) {
    let first = harmonizer.harmonize_batches(&[metadata_batch(rows)]).unwrap();
    let reconstructed: Vec<AgeRecord> = first.rows.iter().map(|r| r.to_age_record()).collect();
    let second = harmonizer
        .harmonize_records(reconstructed, &mut StdRng::seed_from_u64(3))
        .unwrap();

    for (before, after) in first.rows.iter().zip(&second.rows) {
        assert_eq!(before.age_group, after.age_group, "row {}", before.row);
        let (a, b) = (before.harmonized_value.unwrap(), after.harmonized_value.unwrap());
        assert!((a - b).abs() < 1e-9, "row {}", before.row);
    }
}

#[test]
fn test_rerun_keeps_groups_with_day_values_outside_newborn() {
    let harmonizer = AgeHarmonizer::new(HarmonizerConfig::default().with_seed(1));

    // child known only through infant_age
    assert_rerun_keeps_groups(
        &harmonizer,
        &[(None, Some(100), Some("child")), (None, None, Some("child"))],
    );

    // schoolage pool mixing days and years
    assert_rerun_keeps_groups(
        &harmonizer,
        &[
            (None, Some(100), Some("schoolage")),
            (Some(15), None, Some("schoolage")),
            (None, None, Some("schoolage")),
        ],
    );

    let output = harmonizer
        .harmonize_batches(&[metadata_batch(&[
            (None, Some(100), Some("child")),
            (None, None, Some("child")),
        ])])
        .unwrap();
    let imputed = &output.rows[1];
    assert_eq!(imputed.source, ValueSource::InfantAge);
    assert_eq!(imputed.original_unit, AgeUnit::Day);
    assert_eq!(imputed.age_group_label(), Some("child"));
    assert!((imputed.harmonized_value.unwrap() - 100.0 / 365.0).abs() < 1e-12);
}

#[test]
fn test_old_newborn_without_age_is_imputed_as_child() {
    let batch = metadata_batch(&[
        (None, Some(428), Some("newborn")),
        (Some(3), None, Some("child")),
        (Some(7), None, Some("child")),
        (Some(8), None, Some("child")),
    ]);

    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    let row = OutputRow::from(&output.rows[0]);
    assert_eq!(row.harmonized_age_group.as_deref(), Some("child"));
    assert_eq!(row.source, "age");
    assert_eq!(row.harmonized_value, Some(7.0));
    assert!(output.rows[0].imputed);
}

#[test]
fn test_adult_row_passes_through() {
    let batch = metadata_batch(&[(Some(34), None, Some("adult"))]);

    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    assert_eq!(
        OutputRow::from(&output.rows[0]),
        OutputRow {
            source: "age".to_string(),
            original_value: Some(34.0),
            original_unit: "year".to_string(),
            harmonized_value: Some(34.0),
            harmonized_unit: "year".to_string(),
            harmonized_age_group: Some("adult".to_string()),
        }
    );
}

#[test]
fn test_category_without_observations_fails() {
    let batch = metadata_batch(&[
        (Some(40), None, Some("adult")),
        (None, None, Some("senior")),
    ]);

    let err = harmonizer().harmonize_batches(&[batch.clone()]).unwrap_err();
    assert!(matches!(
        err,
        HarmonizerError::EmptyReferenceDistribution {
            category: AgeCategory::Senior,
            missing: 1
        }
    ));

    let lenient = AgeHarmonizer::new(
        HarmonizerConfig::default()
            .with_seed(1)
            .with_empty_reference_policy(EmptyReferencePolicy::MarkUnresolved),
    );
    let output = lenient.harmonize_batches(&[batch]).unwrap();
    assert_eq!(output.rows[1].harmonized_value, None);
    assert_eq!(output.rows[1].age_group_label(), Some("senior"));
    assert_eq!(output.report.imputation.total_unresolved(), 1);
}

#[test]
fn test_same_seed_same_output() {
    let batch = metadata_batch(&cohort());
    let first = harmonizer().harmonize_batches(&[batch.clone()]).unwrap();
    let second = harmonizer().harmonize_batches(&[batch]).unwrap();
    assert_eq!(first.rows, second.rows);
}

#[test]
fn test_raw_reference_units_mix_days_and_years() {
    let batch = metadata_batch(&[
        (Some(0), None, Some("newborn")),
        (None, Some(90), Some("newborn")),
        (None, None, Some("newborn")),
    ]);

    let raw = AgeHarmonizer::new(
        HarmonizerConfig::default()
            .with_seed(1)
            .with_reference_units(ReferenceUnits::Raw),
    );
    let output = raw.harmonize_batches(&[batch.clone()]).unwrap();
    assert_eq!(output.rows[2].harmonized_value, Some(45.0));

    let output = harmonizer().harmonize_batches(&[batch]).unwrap();
    assert!((output.rows[2].harmonized_value.unwrap() - 45.0 / 365.0).abs() < 1e-12);
}

#[test]
fn test_custom_strategy_table() {
    let batch = metadata_batch(&cohort());
    let strategies =
        StrategyTable::default().with_strategy(AgeCategory::Adult, ImputationStrategy::Median);

    let output = harmonizer()
        .with_strategies(strategies)
        .harmonize_batches(&[batch])
        .unwrap();
    let adults: Vec<f64> = output
        .rows
        .iter()
        .filter(|r| r.imputed && r.age_group == Some(AgeCategory::Adult))
        .filter_map(|r| r.harmonized_value)
        .collect();
    assert_eq!(adults, vec![34.0, 34.0]);
}

#[test]
fn test_invalid_category_aborts() {
    let batch = metadata_batch(&[(Some(34), None, Some("adult")), (None, None, Some("elderly"))]);

    let err = harmonizer().harmonize_batches(&[batch]).unwrap_err();
    assert!(matches!(
        err,
        HarmonizerError::InvalidCategoryValue { ref value, row: 1 } if value == "elderly"
    ));
}
