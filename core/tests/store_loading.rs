//! Store loading tests: format preference, deterministic sampling, and
//! the fail-fast error paths.

use paywatch_core::{
    config::DataConfig,
    error::AgentError,
    record::TxType,
    store::{self, DatasetForm, StoreCache, TransactionStore},
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

/// Fresh scratch directory per test. Collisions are avoided with the
/// process id plus a per-process sequence number.
fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "paywatch-{label}-{}-{}",
        std::process::id(),
        DIR_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

const CSV_HEADER: &str = "step,type,amount,nameOrig,oldbalanceOrg,newbalanceOrig,nameDest,oldbalanceDest,newbalanceDest,isFraud,isFlaggedFraud";

/// 20 rows: ten TRANSFERs from C1 (one fraud), ten PAYMENTs from C2.
fn write_fixture_csv(dir: &PathBuf) {
    let mut lines = vec![CSV_HEADER.to_string()];
    for i in 0..10 {
        let is_fraud = u8::from(i == 3);
        lines.push(format!(
            "{i},TRANSFER,{}.0,C1,1000.0,900.0,C9,0.0,100.0,{is_fraud},0",
            100 + i
        ));
    }
    for i in 10..20 {
        lines.push(format!(
            "{i},PAYMENT,{}.0,C2,2000.0,1900.0,M7,0.0,100.0,0,0",
            100 + i
        ));
    }
    std::fs::write(dir.join("paysim.csv"), lines.join("\n")).expect("write csv");
}

#[test]
fn csv_load_parses_all_fields() {
    let dir = scratch_dir("csv");
    write_fixture_csv(&dir);

    let store = TransactionStore::load(&DataConfig::new(&dir)).expect("load");
    assert_eq!(store.len(), 20);
    assert_eq!(store.form(), DatasetForm::Csv);
    assert_eq!(store.fraud_count(), 1);

    let first = &store.all_records()[0];
    assert_eq!(first.step, 0);
    assert_eq!(first.tx_type, TxType::Transfer);
    assert_eq!(first.amount, 100.0);
    assert_eq!(first.name_orig, "C1");
    assert!(!first.is_fraud);
}

#[test]
fn missing_dataset_fails_fast() {
    let dir = scratch_dir("empty");
    let err = TransactionStore::load(&DataConfig::new(&dir)).unwrap_err();
    assert!(
        matches!(err, AgentError::DataUnavailable { .. }),
        "expected DataUnavailable, got {err}"
    );
}

#[test]
fn sampling_fraction_is_validated_not_clamped() {
    let dir = scratch_dir("frac");
    write_fixture_csv(&dir);

    for bad in [0.0, -0.5, 1.01, 2.0] {
        let config = DataConfig::new(&dir).with_sample_frac(bad);
        let err = TransactionStore::load(&config).unwrap_err();
        assert!(
            matches!(err, AgentError::SamplingRange { .. }),
            "fraction {bad} must be rejected, got {err}"
        );
    }
}

#[test]
fn sampling_is_deterministic_across_loads() {
    let dir = scratch_dir("det");
    write_fixture_csv(&dir);
    let config = DataConfig::new(&dir).with_sample_frac(0.5);

    let first = TransactionStore::load(&config).expect("first load");
    let second = TransactionStore::load(&config).expect("second load");

    assert_eq!(first.len(), 10, "0.5 of 20 rows");
    assert_eq!(
        first.all_records(),
        second.all_records(),
        "same fraction must yield the same rows in the same order"
    );
}

#[test]
fn different_fractions_yield_different_subsets() {
    let dir = scratch_dir("fracs");
    write_fixture_csv(&dir);

    let quarter =
        TransactionStore::load(&DataConfig::new(&dir).with_sample_frac(0.25)).expect("load");
    let half =
        TransactionStore::load(&DataConfig::new(&dir).with_sample_frac(0.5)).expect("load");
    assert_eq!(quarter.len(), 5);
    assert_eq!(half.len(), 10);
}

#[test]
fn origin_history_is_ordered_by_descending_step() {
    let dir = scratch_dir("order");
    write_fixture_csv(&dir);

    let store = TransactionStore::load(&DataConfig::new(&dir)).expect("load");
    let history = store.records_by_origin("C1");
    assert_eq!(history.len(), 10);
    for pair in history.windows(2) {
        assert!(
            pair[0].step >= pair[1].step,
            "history must be newest first: {} before {}",
            pair[0].step,
            pair[1].step
        );
    }

    let recent = store.recent_by_origin("C1", 3);
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].step, 9);
}

#[test]
fn unknown_account_returns_empty_history() {
    let dir = scratch_dir("unknown");
    write_fixture_csv(&dir);

    let store = TransactionStore::load(&DataConfig::new(&dir)).expect("load");
    assert!(store.records_by_origin("C404").is_empty());
    assert!(store.recent_by_origin("C404", 10).is_empty());
}

#[test]
fn sqlite_form_is_preferred_after_conversion() {
    let dir = scratch_dir("convert");
    write_fixture_csv(&dir);
    let config = DataConfig::new(&dir);

    let from_csv = TransactionStore::load(&config).expect("csv load");
    let rows = store::convert_csv_to_sqlite(&config.csv_path(), &config.sqlite_path())
        .expect("convert");
    assert_eq!(rows, 20);

    let from_sqlite = TransactionStore::load(&config).expect("sqlite load");
    assert_eq!(from_sqlite.form(), DatasetForm::Sqlite, "db must win over csv");
    assert_eq!(
        from_csv.all_records(),
        from_sqlite.all_records(),
        "both forms must carry identical records"
    );
}

#[test]
fn store_cache_memoizes_by_fraction() {
    let dir = scratch_dir("cache");
    write_fixture_csv(&dir);

    let cache = StoreCache::new(DataConfig::new(&dir));
    let a = cache.load(Some(0.5)).expect("load");
    let b = cache.load(Some(0.5)).expect("load again");
    assert!(
        std::sync::Arc::ptr_eq(&a, &b),
        "same fraction must reuse the loaded store"
    );

    let full = cache.load(None).expect("full load");
    assert_eq!(full.len(), 20);
    assert!(!std::sync::Arc::ptr_eq(&a, &full));

    let err = cache.load(Some(0.0)).unwrap_err();
    assert!(matches!(err, AgentError::SamplingRange { .. }));
}

#[test]
fn dataset_info_counts_both_forms() {
    let dir = scratch_dir("info");
    write_fixture_csv(&dir);
    let config = DataConfig::new(&dir);

    let csv_info = store::dataset_info(&config).expect("csv info");
    assert_eq!(csv_info.form, DatasetForm::Csv);
    assert_eq!(csv_info.total_rows, 20);
    assert_eq!(csv_info.fraud_count, 1);
    assert_eq!(csv_info.fraud_rate_pct(), 5.0);

    store::convert_csv_to_sqlite(&config.csv_path(), &config.sqlite_path()).expect("convert");
    let db_info = store::dataset_info(&config).expect("db info");
    assert_eq!(db_info.form, DatasetForm::Sqlite);
    assert_eq!(db_info.total_rows, 20);
    assert_eq!(db_info.fraud_count, 1);
    assert_eq!(
        db_info.type_counts.len(),
        csv_info.type_counts.len(),
        "both forms must report the same type breakdown"
    );
}
