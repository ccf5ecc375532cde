//! CSV loading — the row-oriented text form of the dataset.

use super::{DatasetForm, DatasetInfo};
use crate::{
    error::AgentResult,
    record::{TransactionRecord, TxType},
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Raw CSV row, PaySim column headers. Fraud flags arrive as 0/1.
#[derive(Debug, Deserialize)]
struct CsvRow {
    step: i64,
    #[serde(rename = "type")]
    tx_type: String,
    amount: f64,
    #[serde(rename = "nameOrig")]
    name_orig: String,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_orig: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "nameDest")]
    name_dest: String,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
    #[serde(rename = "isFraud")]
    is_fraud: u8,
    #[serde(rename = "isFlaggedFraud")]
    is_flagged: u8,
}

impl CsvRow {
    fn into_record(self, line: usize) -> AgentResult<TransactionRecord> {
        let tx_type = TxType::from_str(&self.tx_type)
            .map_err(|e| anyhow::anyhow!("csv line {line}: {e}"))?;
        Ok(TransactionRecord {
            step: self.step,
            tx_type,
            amount: self.amount,
            name_orig: self.name_orig,
            old_balance_orig: self.old_balance_orig,
            new_balance_orig: self.new_balance_orig,
            name_dest: self.name_dest,
            old_balance_dest: self.old_balance_dest,
            new_balance_dest: self.new_balance_dest,
            is_fraud: self.is_fraud != 0,
            is_flagged: self.is_flagged != 0,
        })
    }
}

pub(super) fn load_records(path: &Path) -> AgentResult<Vec<TransactionRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        records.push(row?.into_record(i + 2)?);
    }
    Ok(records)
}

pub(super) fn dataset_info(path: &Path) -> AgentResult<DatasetInfo> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut total_rows = 0u64;
    let mut fraud_count = 0u64;
    let mut type_counts: HashMap<TxType, u64> = HashMap::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let record = row?.into_record(i + 2)?;
        total_rows += 1;
        if record.is_fraud {
            fraud_count += 1;
        }
        *type_counts.entry(record.tx_type).or_default() += 1;
    }
    let mut type_counts: Vec<(TxType, u64)> = type_counts.into_iter().collect();
    type_counts.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(DatasetInfo {
        total_rows,
        fraud_count,
        form: DatasetForm::Csv,
        type_counts,
    })
}
