//! SQLite loading and conversion — the indexed binary form.
//!
//! One-time `convert_csv_to_sqlite` produces this form; subsequent
//! loads prefer it over re-parsing the CSV.

use super::{csv, DatasetForm, DatasetInfo};
use crate::{
    error::AgentResult,
    record::{TransactionRecord, TxType},
};
use rusqlite::{params, Connection};
use std::path::Path;
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    step             INTEGER NOT NULL,
    type             TEXT    NOT NULL,
    amount           REAL    NOT NULL,
    name_orig        TEXT    NOT NULL,
    old_balance_orig REAL    NOT NULL,
    new_balance_orig REAL    NOT NULL,
    name_dest        TEXT    NOT NULL,
    old_balance_dest REAL    NOT NULL,
    new_balance_dest REAL    NOT NULL,
    is_fraud         INTEGER NOT NULL,
    is_flagged       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_orig ON transactions (name_orig, step);
";

pub(super) fn load_records(path: &Path) -> AgentResult<Vec<TransactionRecord>> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut stmt = conn.prepare(
        "SELECT step, type, amount, name_orig, old_balance_orig, new_balance_orig,
                name_dest, old_balance_dest, new_balance_dest, is_fraud, is_flagged
         FROM transactions ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        let type_text: String = row.get(1)?;
        Ok(TransactionRecord {
            step: row.get(0)?,
            tx_type: parse_type(&type_text)?,
            amount: row.get(2)?,
            name_orig: row.get(3)?,
            old_balance_orig: row.get(4)?,
            new_balance_orig: row.get(5)?,
            name_dest: row.get(6)?,
            old_balance_dest: row.get(7)?,
            new_balance_dest: row.get(8)?,
            is_fraud: row.get::<_, i64>(9)? != 0,
            is_flagged: row.get::<_, i64>(10)? != 0,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn parse_type(text: &str) -> Result<TxType, rusqlite::Error> {
    TxType::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })
}

pub(super) fn dataset_info(path: &Path) -> AgentResult<DatasetInfo> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let total_rows: u64 =
        conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| {
            row.get::<_, i64>(0)
        })? as u64;
    let fraud_count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE is_fraud != 0",
        [],
        |row| row.get::<_, i64>(0),
    )? as u64;

    let mut stmt = conn.prepare(
        "SELECT type, COUNT(*) FROM transactions GROUP BY type ORDER BY COUNT(*) DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
    })?;
    let mut type_counts = Vec::new();
    for row in rows {
        let (type_text, count) = row?;
        let tx_type =
            TxType::from_str(&type_text).map_err(|e| anyhow::anyhow!("transactions: {e}"))?;
        type_counts.push((tx_type, count));
    }

    Ok(DatasetInfo {
        total_rows,
        fraud_count,
        form: DatasetForm::Sqlite,
        type_counts,
    })
}

/// One-time conversion of the CSV form into the indexed SQLite form.
/// Returns the number of rows written.
pub fn convert_csv_to_sqlite(csv_path: &Path, db_path: &Path) -> AgentResult<u64> {
    let records = csv::load_records(csv_path)?;

    let mut conn = Connection::open(db_path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO transactions (step, type, amount, name_orig, old_balance_orig,
                 new_balance_orig, name_dest, old_balance_dest, new_balance_dest,
                 is_fraud, is_flagged)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for record in &records {
            stmt.execute(params![
                record.step,
                record.tx_type.as_str(),
                record.amount,
                record.name_orig,
                record.old_balance_orig,
                record.new_balance_orig,
                record.name_dest,
                record.old_balance_dest,
                record.new_balance_dest,
                record.is_fraud as i64,
                record.is_flagged as i64,
            ])?;
        }
    }
    tx.commit()?;

    log::info!(
        "Converted {} rows from {} to {}",
        records.len(),
        csv_path.display(),
        db_path.display()
    );
    Ok(records.len() as u64)
}
