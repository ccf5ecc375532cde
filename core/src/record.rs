//! Transaction records and analysis inputs.
//!
//! RULE: `TransactionRecord` is immutable after load. The ground-truth
//! `is_fraud` flag is carried for evaluation and display only — nothing
//! on the scoring path may read it.

use crate::types::{AccountId, Step};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PaySim transaction types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxType {
    Payment,
    CashIn,
    CashOut,
    Transfer,
    Debit,
}

impl TxType {
    /// Types the scoring gate short-circuits: statistically never fraud
    /// in the source dataset.
    pub fn is_gated(&self) -> bool {
        matches!(self, Self::Payment | Self::CashIn | Self::Debit)
    }

    /// Types that proceed to full signal scoring.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Self::Transfer | Self::CashOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::CashIn => "CASH_IN",
            Self::CashOut => "CASH_OUT",
            Self::Transfer => "TRANSFER",
            Self::Debit => "DEBIT",
        }
    }
}

impl FromStr for TxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYMENT" => Ok(Self::Payment),
            "CASH_IN" => Ok(Self::CashIn),
            "CASH_OUT" => Ok(Self::CashOut),
            "TRANSFER" => Ok(Self::Transfer),
            "DEBIT" => Ok(Self::Debit),
            other => Err(format!("Unknown transaction type: {other}")),
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the dataset. Field names follow the PaySim column
/// convention when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub step: Step,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub amount: f64,
    #[serde(rename = "nameOrig")]
    pub name_orig: AccountId,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_orig: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_orig: f64,
    #[serde(rename = "nameDest")]
    pub name_dest: AccountId,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest: f64,
    #[serde(rename = "isFraud")]
    pub is_fraud: bool,
    #[serde(rename = "isFlaggedFraud")]
    pub is_flagged: bool,
}

/// Analysis input: any subset of transaction fields may be present.
/// Missing numeric fields default to zero in diagnostic formatting only;
/// the scoring engine needs type, amount, both account ids, and the
/// origin balance-before to produce a non-degenerate result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<TxType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "nameOrig", default, skip_serializing_if = "Option::is_none")]
    pub name_orig: Option<AccountId>,
    #[serde(
        rename = "oldbalanceOrg",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub old_balance_orig: Option<f64>,
    #[serde(
        rename = "newbalanceOrig",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_balance_orig: Option<f64>,
    #[serde(rename = "nameDest", default, skip_serializing_if = "Option::is_none")]
    pub name_dest: Option<AccountId>,
    #[serde(
        rename = "oldbalanceDest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub old_balance_dest: Option<f64>,
    #[serde(
        rename = "newbalanceDest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_balance_dest: Option<f64>,
    #[serde(rename = "isFraud", default, skip_serializing_if = "Option::is_none")]
    pub is_fraud: Option<bool>,
    #[serde(
        rename = "isFlaggedFraud",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_flagged: Option<bool>,
}

impl TransactionSnapshot {
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn old_balance_orig(&self) -> f64 {
        self.old_balance_orig.unwrap_or(0.0)
    }

    pub fn name_orig(&self) -> &str {
        self.name_orig.as_deref().unwrap_or("")
    }

    pub fn name_dest(&self) -> &str {
        self.name_dest.as_deref().unwrap_or("")
    }

    /// One `field: value` line per present field, for task text and
    /// diagnostic output. Missing numeric fields render as 0.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("  step: {}", self.step.unwrap_or(0)));
        lines.push(format!(
            "  type: {}",
            self.tx_type.map(|t| t.as_str()).unwrap_or("(missing)")
        ));
        lines.push(format!("  amount: {:.2}", self.amount()));
        lines.push(format!("  nameOrig: {}", self.name_orig()));
        lines.push(format!("  oldbalanceOrg: {:.2}", self.old_balance_orig()));
        lines.push(format!(
            "  newbalanceOrig: {:.2}",
            self.new_balance_orig.unwrap_or(0.0)
        ));
        lines.push(format!("  nameDest: {}", self.name_dest()));
        lines.push(format!(
            "  oldbalanceDest: {:.2}",
            self.old_balance_dest.unwrap_or(0.0)
        ));
        lines.push(format!(
            "  newbalanceDest: {:.2}",
            self.new_balance_dest.unwrap_or(0.0)
        ));
        lines.join("\n")
    }
}

impl From<&TransactionRecord> for TransactionSnapshot {
    fn from(r: &TransactionRecord) -> Self {
        Self {
            step: Some(r.step),
            tx_type: Some(r.tx_type),
            amount: Some(r.amount),
            name_orig: Some(r.name_orig.clone()),
            old_balance_orig: Some(r.old_balance_orig),
            new_balance_orig: Some(r.new_balance_orig),
            name_dest: Some(r.name_dest.clone()),
            old_balance_dest: Some(r.old_balance_dest),
            new_balance_dest: Some(r.new_balance_dest),
            is_fraud: Some(r.is_fraud),
            is_flagged: Some(r.is_flagged),
        }
    }
}
