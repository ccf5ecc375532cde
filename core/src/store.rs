//! The transaction store: the dataset, immutable after load.
//!
//! RULE: Only the store submodules touch the serialized dataset forms.
//! Signal tools and the scoring engine see records through the store's
//! read-only accessors — they never open files or execute SQL.
//!
//! Load-time strategy: prefer the SQLite form (`paysim.db`) when it
//! exists, fall back to the CSV form (`paysim.csv`), fail fast when
//! neither can be found.

mod csv;
mod sqlite;

pub use sqlite::convert_csv_to_sqlite;

use crate::{
    config::DataConfig,
    error::{AgentError, AgentResult},
    record::{TransactionRecord, TxType},
    rng::{SamplerRng, SAMPLE_SEED},
    types::AccountId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Which serialized form a store was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetForm {
    Sqlite,
    Csv,
    /// Built directly from records, used in tests.
    Memory,
}

#[derive(Debug)]
pub struct TransactionStore {
    records: Vec<TransactionRecord>,
    /// Record indices per origin account, ordered by descending step.
    by_origin: HashMap<AccountId, Vec<usize>>,
    form: DatasetForm,
    sample_frac: Option<f64>,
}

impl TransactionStore {
    /// Load the dataset, sub-sampling when the config asks for it.
    pub fn load(config: &DataConfig) -> AgentResult<Self> {
        if let Some(frac) = config.sample_frac {
            if !(frac > 0.0 && frac <= 1.0) {
                return Err(AgentError::SamplingRange { fraction: frac });
            }
        }

        let sqlite_path = config.sqlite_path();
        let csv_path = config.csv_path();
        let (records, form) = if sqlite_path.is_file() {
            log::info!("Loading dataset from {}", sqlite_path.display());
            (sqlite::load_records(&sqlite_path)?, DatasetForm::Sqlite)
        } else if csv_path.is_file() {
            log::info!("Loading dataset from {}", csv_path.display());
            (csv::load_records(&csv_path)?, DatasetForm::Csv)
        } else {
            return Err(AgentError::DataUnavailable {
                searched: vec![sqlite_path, csv_path],
            });
        };

        let records = match config.sample_frac {
            Some(frac) => sample(records, frac),
            None => records,
        };

        log::info!("Loaded {} transaction records", records.len());
        Ok(Self::build(records, form, config.sample_frac))
    }

    /// Build a store directly from records. Used in tests.
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        Self::build(records, DatasetForm::Memory, None)
    }

    fn build(
        records: Vec<TransactionRecord>,
        form: DatasetForm,
        sample_frac: Option<f64>,
    ) -> Self {
        let mut by_origin: HashMap<AccountId, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_origin
                .entry(record.name_orig.clone())
                .or_default()
                .push(idx);
        }
        // Descending step; stable, so load order breaks ties.
        for indices in by_origin.values_mut() {
            indices.sort_by(|&a, &b| records[b].step.cmp(&records[a].step));
        }
        Self {
            records,
            by_origin,
            form,
            sample_frac,
        }
    }

    /// All records for an origin account, most recent step first.
    /// Unknown accounts return an empty vec, never an error.
    pub fn records_by_origin(&self, account_id: &str) -> Vec<&TransactionRecord> {
        self.by_origin
            .get(account_id)
            .map(|indices| indices.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// The `n` most recent records for an origin account.
    pub fn recent_by_origin(&self, account_id: &str, n: usize) -> Vec<&TransactionRecord> {
        let mut records = self.records_by_origin(account_id);
        records.truncate(n);
        records
    }

    pub fn all_records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn fraud_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_fraud).count()
    }

    pub fn form(&self) -> DatasetForm {
        self.form
    }

    pub fn sample_frac(&self) -> Option<f64> {
        self.sample_frac
    }
}

/// Uniform sub-sample at `frac`, fixed seed. Same input and fraction
/// always yield the same rows in the same order.
fn sample(records: Vec<TransactionRecord>, frac: f64) -> Vec<TransactionRecord> {
    let take = ((records.len() as f64) * frac).round() as usize;
    let mut rng = SamplerRng::new(SAMPLE_SEED);
    let indices = rng.sample_indices(records.len(), take);
    indices.into_iter().map(|i| records[i].clone()).collect()
}

/// Per-process store memoization, keyed by sampling fraction. Loading
/// the same fraction twice returns the same `Arc`'d store; stores are
/// immutable after load so readers need no further locking.
pub struct StoreCache {
    config: DataConfig,
    loaded: Mutex<HashMap<u64, Arc<TransactionStore>>>,
}

impl StoreCache {
    pub fn new(config: DataConfig) -> Self {
        Self {
            config,
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn load(&self, sample_frac: Option<f64>) -> AgentResult<Arc<TransactionStore>> {
        if let Some(frac) = sample_frac {
            if !(frac > 0.0 && frac <= 1.0) {
                return Err(AgentError::SamplingRange { fraction: frac });
            }
        }
        let key = sample_frac.map(f64::to_bits).unwrap_or(u64::MAX);
        let mut loaded = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(store) = loaded.get(&key) {
            return Ok(Arc::clone(store));
        }
        let mut config = self.config.clone();
        config.sample_frac = sample_frac;
        let store = Arc::new(TransactionStore::load(&config)?);
        loaded.insert(key, Arc::clone(&store));
        Ok(store)
    }
}

/// Quick dataset statistics, computed from whichever form is present
/// without building the origin index.
#[derive(Debug, Clone)]
pub struct DatasetInfo {
    pub total_rows: u64,
    pub fraud_count: u64,
    pub form: DatasetForm,
    pub type_counts: Vec<(TxType, u64)>,
}

impl DatasetInfo {
    pub fn fraud_rate_pct(&self) -> f64 {
        if self.total_rows == 0 {
            0.0
        } else {
            self.fraud_count as f64 / self.total_rows as f64 * 100.0
        }
    }
}

pub fn dataset_info(config: &DataConfig) -> AgentResult<DatasetInfo> {
    let sqlite_path = config.sqlite_path();
    let csv_path = config.csv_path();
    if sqlite_path.is_file() {
        sqlite::dataset_info(&sqlite_path)
    } else if csv_path.is_file() {
        csv::dataset_info(&csv_path)
    } else {
        Err(AgentError::DataUnavailable {
            searched: vec![sqlite_path, csv_path],
        })
    }
}
