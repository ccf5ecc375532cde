//! Signal tools — the sub-score computations behind the weighted
//! four-signal framework.
//!
//! Each tool is a pure function of its declared inputs plus read-only
//! store access. A tool returns its numeric sub-score, a one-line
//! rationale for the report narrative, and a longer detail text served
//! back to the reasoning oracle as the tool-call result. Signals are
//! independent: no tool observes another tool's output.
//!
//! The ground-truth `is_fraud` flag appears here only as *historical*
//! data about an account's past records — the candidate transaction's
//! own label is never an input.

use crate::{
    record::TxType,
    store::TransactionStore,
};
use serde::Serialize;

// ── Constants ────────────────────────────────────────────────────────────────

/// Default history window for the account-behavior signal.
pub const SIGNAL_A_WINDOW: usize = 10;

/// Historical fraud rate above which an account is treated as risky.
const FRAUD_RATE_RISKY: f64 = 0.05;
/// High-risk (TRANSFER/CASH_OUT) count at which a pattern counts as trusted.
const TRUSTED_HIGH_RISK_COUNT: usize = 5;
/// Below this many records the history is too thin to trust.
const LIMITED_HISTORY_COUNT: usize = 3;

/// Balance-ratio band edges. The moderate band is inclusive at 1.5 and
/// at 2.0; only ratios strictly above 2.0 are severe.
const SEVERE_RATIO: f64 = 2.0;
const MODERATE_RATIO: f64 = 1.5;
const MILD_RATIO: f64 = 1.0;

/// Amounts above this are unusually large for the dataset.
const LARGE_AMOUNT: f64 = 300_000.0;

const MERCHANT_PREFIX: &str = "M";

// ── Signal reports ───────────────────────────────────────────────────────────

/// The four weighted signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    AccountBehavior,
    BalanceAnomaly,
    DestinationType,
    AmountContext,
}

impl SignalId {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AccountBehavior => "account behavior",
            Self::BalanceAnomaly => "balance anomaly",
            Self::DestinationType => "destination type",
            Self::AmountContext => "amount context",
        }
    }

    /// Framework weight, in percent. Advisory only — scores are summed
    /// unweighted; the weights express how strong each signal's score
    /// range was designed to be.
    pub fn weight_pct(&self) -> u8 {
        match self {
            Self::AccountBehavior | Self::BalanceAnomaly => 40,
            Self::DestinationType | Self::AmountContext => 10,
        }
    }

    /// Step letter used in narratives (A through D).
    pub fn letter(&self) -> char {
        match self {
            Self::AccountBehavior => 'A',
            Self::BalanceAnomaly => 'B',
            Self::DestinationType => 'C',
            Self::AmountContext => 'D',
        }
    }
}

/// One signal's output: sub-score plus rationale. `detail` is the
/// advisory long form for the reasoning step; the scoring engine only
/// consumes `score`.
#[derive(Debug, Clone, Serialize)]
pub struct SignalReport {
    pub signal: SignalId,
    pub score: f64,
    pub rationale: String,
    pub detail: String,
}

// ── Tool A: account behavior (weight 40%) ────────────────────────────────────

/// Score the origin account's recent behavior. Branches are evaluated
/// in priority order; exactly one fires:
///   no history          -> +2
///   fraud rate > 5%     -> +2
///   >= 5 high-risk txns -> -2
///   < 3 records         -> +1
///   any fraud at all    -> +1
///   otherwise           -> -1
pub fn origin_history(store: &TransactionStore, origin_id: &str, n: usize) -> SignalReport {
    let recent = store.recent_by_origin(origin_id, n);
    let total = recent.len();

    if total == 0 {
        return SignalReport {
            signal: SignalId::AccountBehavior,
            score: 2.0,
            rationale: "no transaction history, new or unknown account".into(),
            detail: format!(
                "Account {origin_id}: NO TRANSACTION HISTORY\n\
                 Risk: new/unknown account\n\
                 Signal score: +2.0 (apply stricter checks)"
            ),
        };
    }

    let fraud_count = recent.iter().filter(|r| r.is_fraud).count();
    let fraud_rate = fraud_count as f64 / total as f64;
    let transfer_count = recent
        .iter()
        .filter(|r| r.tx_type == TxType::Transfer)
        .count();
    let cashout_count = recent
        .iter()
        .filter(|r| r.tx_type == TxType::CashOut)
        .count();
    let high_risk_count = transfer_count + cashout_count;
    let avg_amount = recent.iter().map(|r| r.amount).sum::<f64>() / total as f64;
    let max_amount = recent.iter().map(|r| r.amount).fold(0.0, f64::max);

    let (score, rationale) = if fraud_rate > FRAUD_RATE_RISKY {
        (2.0, format!("past fraud in history ({fraud_count}/{total} records)"))
    } else if high_risk_count >= TRUSTED_HIGH_RISK_COUNT {
        (
            -2.0,
            format!("frequent TRANSFER/CASH_OUT pattern ({high_risk_count}/{total}), trusted"),
        )
    } else if total < LIMITED_HISTORY_COUNT {
        (1.0, format!("limited history, only {total} prior records"))
    } else if fraud_rate > 0.0 {
        (1.0, format!("some fraud in history ({fraud_count}/{total} records)"))
    } else {
        (-1.0, "normal behavior, no fraud history".into())
    };

    let history_lines: Vec<String> = recent
        .iter()
        .map(|r| {
            format!(
                "  step {:>4}  {:<9} {:>14.2}  fraud={}",
                r.step,
                r.tx_type.as_str(),
                r.amount,
                r.is_fraud as u8
            )
        })
        .collect();

    let detail = format!(
        "Transaction history for {origin_id} (last {total}):\n\
         {}\n\
         Statistics:\n\
         \x20 fraud count: {fraud_count} (rate {:.1}%)\n\
         \x20 TRANSFER count: {transfer_count}\n\
         \x20 CASH_OUT count: {cashout_count}\n\
         \x20 high-risk transactions: {high_risk_count}\n\
         \x20 avg amount: {avg_amount:.2}\n\
         \x20 max amount: {max_amount:.2}\n\
         Assessment: {rationale}\n\
         Signal score: {score:+.1}",
        history_lines.join("\n"),
        fraud_rate * 100.0,
    );

    SignalReport {
        signal: SignalId::AccountBehavior,
        score,
        rationale,
        detail,
    }
}

// ── Tool B: balance anomaly (weight 40%) ─────────────────────────────────────

/// Score the amount-to-balance ratio. Intentionally weak: a balance
/// anomaly appears in roughly 15% of legitimate mobile-money
/// transactions, so it may reinforce other signals but never drives a
/// decision by itself.
pub fn balance_anomaly(amount: f64, old_balance_orig: f64, tx_type: Option<TxType>) -> SignalReport {
    let not_applicable = |rationale: String, detail: String| SignalReport {
        signal: SignalId::BalanceAnomaly,
        score: 0.0,
        rationale,
        detail,
    };

    match tx_type {
        None => {
            return not_applicable(
                "no type information, cannot assess".into(),
                "Balance check skipped: transaction type missing\nSignal score: 0.0".into(),
            )
        }
        Some(t) if t.is_gated() => {
            return not_applicable(
                format!("not applicable, {t} is a low-risk type"),
                format!(
                    "{t}: low-risk transaction type\n\
                     Balance check not applicable\n\
                     Signal score: 0.0"
                ),
            )
        }
        Some(_) => {}
    }

    if old_balance_orig <= 0.0 {
        return not_applicable(
            "no balance data, cannot assess".into(),
            format!(
                "No available balance data (balance-before {old_balance_orig:.2})\n\
                 Amount: {amount:.2}\n\
                 Signal score: 0.0 (cannot assess)"
            ),
        );
    }

    let ratio = amount / old_balance_orig;
    let (score, band) = if ratio > SEVERE_RATIO {
        (2.0, "severe anomaly")
    } else if ratio >= MODERATE_RATIO {
        (1.0, "moderate anomaly")
    } else if ratio > MILD_RATIO {
        (0.5, "mild anomaly")
    } else {
        (0.0, "no anomaly")
    };

    let rationale = format!("{band}, amount is {ratio:.2}x the available balance");
    let detail = format!(
        "Balance anomaly check:\n\
         \x20 amount: {amount:.2}\n\
         \x20 balance before: {old_balance_orig:.2}\n\
         \x20 ratio: {ratio:.2}x\n\
         Assessment: {band}. Mobile-money accounts may carry credit or \
         overdraft, so treat this as a reinforcing signal only.\n\
         Signal score: {score:+.1}"
    );

    SignalReport {
        signal: SignalId::BalanceAnomaly,
        score,
        rationale,
        detail,
    }
}

// ── Tool C: destination type (weight 10%) ────────────────────────────────────

/// Merchant destinations (id prefix `M`) are payment processors or
/// retailers and carry lower fraud risk.
pub fn merchant_check(dest_id: &str) -> SignalReport {
    if dest_id.starts_with(MERCHANT_PREFIX) {
        SignalReport {
            signal: SignalId::DestinationType,
            score: -1.0,
            rationale: format!("destination {dest_id} is a merchant account, safer"),
            detail: format!(
                "MERCHANT ACCOUNT: {dest_id}\n\
                 Type: payment processor or business account\n\
                 Risk profile: lower (typical use is purchases and bill payments)\n\
                 Signal score: -1.0"
            ),
        }
    } else {
        SignalReport {
            signal: SignalId::DestinationType,
            score: 0.0,
            rationale: format!("destination {dest_id} is a regular account, neutral"),
            detail: format!(
                "REGULAR ACCOUNT: {dest_id}\n\
                 Type: personal account, can be fraud or legitimate\n\
                 Risk profile: neutral, requires other signals\n\
                 Signal score: 0.0"
            ),
        }
    }
}

// ── Tool D: amount context (weight 10%) ──────────────────────────────────────

/// Flag unusually large amounts. Weak signal: large amounts appear in
/// both fraud and legitimate traffic.
pub fn amount_context(amount: f64) -> SignalReport {
    if amount > LARGE_AMOUNT {
        SignalReport {
            signal: SignalId::AmountContext,
            score: 0.5,
            rationale: format!("amount {amount:.2} is unusually large (over {LARGE_AMOUNT:.0})"),
            detail: format!(
                "Amount context: {amount:.2} exceeds the {LARGE_AMOUNT:.0} threshold\n\
                 Signal score: +0.5"
            ),
        }
    } else {
        SignalReport {
            signal: SignalId::AmountContext,
            score: 0.0,
            rationale: format!("amount {amount:.2} is within the usual range"),
            detail: format!(
                "Amount context: {amount:.2} is at or below the {LARGE_AMOUNT:.0} threshold\n\
                 Signal score: 0.0"
            ),
        }
    }
}

// ── Auxiliary diagnostics ────────────────────────────────────────────────────
//
// These two tools are surfaced to the reasoning step for context. They
// are never part of the four-signal weighted sum.

/// Full-history statistics for an account.
pub fn account_statistics(store: &TransactionStore, account_id: &str) -> String {
    let records = store.records_by_origin(account_id);
    if records.is_empty() {
        return format!("No transaction history for {account_id}");
    }

    let total = records.len();
    let fraud_count = records.iter().filter(|r| r.is_fraud).count();
    let fraud_rate = fraud_count as f64 / total as f64 * 100.0;
    let avg_amount = records.iter().map(|r| r.amount).sum::<f64>() / total as f64;

    let mut type_counts: Vec<(TxType, usize)> = Vec::new();
    for record in &records {
        match type_counts.iter_mut().find(|(t, _)| *t == record.tx_type) {
            Some((_, count)) => *count += 1,
            None => type_counts.push((record.tx_type, 1)),
        }
    }
    type_counts.sort_by(|a, b| b.1.cmp(&a.1));
    let types_line = type_counts
        .iter()
        .map(|(t, c)| format!("{t}={c}"))
        .collect::<Vec<_>>()
        .join(", ");

    let risk_level = if fraud_rate > FRAUD_RATE_RISKY * 100.0 {
        "HIGH (>5% fraud rate)"
    } else {
        "NORMAL"
    };

    format!(
        "Account statistics for {account_id}:\n\
         \x20 total transactions: {total}\n\
         \x20 fraud count: {fraud_count} (rate {fraud_rate:.2}%)\n\
         \x20 avg amount: {avg_amount:.2}\n\
         \x20 types: {types_line}\n\
         \x20 risk level: {risk_level}"
    )
}

/// Compare an amount against the account's own average for the same
/// transaction type: unusual when above mean + 2 standard deviations.
/// Informational only.
pub fn amount_versus_average(
    store: &TransactionStore,
    origin_id: &str,
    amount: f64,
    tx_type: Option<TxType>,
) -> String {
    let records = store.records_by_origin(origin_id);
    if records.is_empty() {
        return format!(
            "New account {origin_id}: no baseline to compare against\n\
             Informational: unusual, no history (+1 context)"
        );
    }

    let type_label = tx_type.map(|t| t.as_str()).unwrap_or("(unknown)");
    let same_type: Vec<f64> = records
        .iter()
        .filter(|r| Some(r.tx_type) == tx_type)
        .map(|r| r.amount)
        .collect();

    if same_type.is_empty() {
        return format!(
            "Account {origin_id} has never done {type_label} before\n\
             Amount: {amount:.2}\n\
             Informational: first transaction of this type, unusual behavior"
        );
    }

    let n = same_type.len();
    let mean = same_type.iter().sum::<f64>() / n as f64;
    // Sample standard deviation is undefined for a single observation;
    // with no spread to measure, the amount counts as typical.
    if n < 2 {
        return format!(
            "Typical amount for {origin_id}:\n\
             \x20 current amount: {amount:.2}\n\
             \x20 account average ({type_label}): {mean:.2}\n\
             Informational: single prior record, no spread to compare against"
        );
    }

    let variance = same_type
        .iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>()
        / (n - 1) as f64;
    let stddev = variance.sqrt();
    let upper_bound = mean + 2.0 * stddev;

    if amount > upper_bound {
        format!(
            "UNUSUAL amount for {origin_id}:\n\
             \x20 current amount: {amount:.2}\n\
             \x20 account average ({type_label}): {mean:.2}\n\
             \x20 upper bound (mean + 2 stddev): {upper_bound:.2}\n\
             Informational: far above typical for this account"
        )
    } else {
        format!(
            "Typical amount for {origin_id}:\n\
             \x20 current amount: {amount:.2}\n\
             \x20 account average ({type_label}): {mean:.2}\n\
             \x20 upper bound (mean + 2 stddev): {upper_bound:.2}\n\
             Informational: within normal range for this account"
        )
    }
}
