//! Scoring engine — type gate, signal aggregation, threshold mapping.
//!
//! State machine: `Gate` -> `Scoring` -> `Decided`. Low-risk types
//! short-circuit from `Gate` straight to `Decided` with a fixed
//! outcome; high-risk types run all four signal tools and map the
//! summed score through the threshold table.
//!
//! Invariants:
//!   - The decision is a pure, monotonic function of the total score.
//!   - No single signal can reach FRAUD on its own (the largest single
//!     sub-score is +2.0, inside the SUSPICIOUS band).
//!   - Totals at or below +1.0 stay LEGITIMATE.
//!   - The candidate transaction's ground-truth label is never read.

use crate::{
    record::TransactionSnapshot,
    signals::{self, SignalReport, SIGNAL_A_WINDOW},
    store::TransactionStore,
    types::Probability,
};
use serde::Serialize;
use std::fmt;

/// Fixed probability for gate-short-circuited transactions.
pub const GATED_PROBABILITY: Probability = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Legitimate,
    Suspicious,
    Fraud,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legitimate => "LEGITIMATE",
            Self::Suspicious => "SUSPICIOUS",
            Self::Fraud => "FRAUD",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's deterministic verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub total: f64,
    pub probability: Probability,
    pub decision: Decision,
}

/// Engine states, recorded in the trace in entry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Gate,
    Scoring,
    Decided,
}

/// What the engine did: states entered and tools invoked, in order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisTrace {
    pub states: Vec<EngineState>,
    pub tool_calls: Vec<&'static str>,
}

impl AnalysisTrace {
    fn enter(&mut self, state: EngineState) {
        self.states.push(state);
    }

    fn tool(&mut self, name: &'static str) {
        self.tool_calls.push(name);
    }
}

/// Full evaluation output: the per-signal reports (empty when the gate
/// short-circuited), the verdict, and the trace.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub gated: bool,
    pub signals: Vec<SignalReport>,
    pub result: ScoreResult,
    pub trace: AnalysisTrace,
}

/// Evaluate one transaction against a fixed store snapshot. Pure:
/// repeated calls with the same store and transaction yield identical
/// breakdowns.
pub fn evaluate(store: &TransactionStore, tx: &TransactionSnapshot) -> ScoreBreakdown {
    let mut trace = AnalysisTrace::default();
    trace.enter(EngineState::Gate);

    if tx.tx_type.map(|t| t.is_gated()).unwrap_or(false) {
        // Hard short-circuit: no signal tool runs for low-risk types.
        trace.enter(EngineState::Decided);
        return ScoreBreakdown {
            gated: true,
            signals: Vec::new(),
            result: ScoreResult {
                total: 0.0,
                probability: GATED_PROBABILITY,
                decision: Decision::Legitimate,
            },
            trace,
        };
    }

    trace.enter(EngineState::Scoring);
    let a = signals::origin_history(store, tx.name_orig(), SIGNAL_A_WINDOW);
    trace.tool("get_origin_history");
    let b = signals::balance_anomaly(tx.amount(), tx.old_balance_orig(), tx.tx_type);
    trace.tool("check_balance_anomaly");
    let c = signals::merchant_check(tx.name_dest());
    trace.tool("is_merchant_account");
    let d = signals::amount_context(tx.amount());
    trace.tool("check_amount_context");

    let total = a.score + b.score + c.score + d.score;
    trace.enter(EngineState::Decided);

    ScoreBreakdown {
        gated: false,
        signals: vec![a, b, c, d],
        result: decide(total),
        trace,
    }
}

/// Map a total score to probability and decision. Ordered thresholds,
/// first match wins, evaluated low to high.
pub fn decide(total: f64) -> ScoreResult {
    let (probability, decision) = if total <= -1.0 {
        (5, Decision::Legitimate)
    } else if total <= 0.0 {
        (10, Decision::Legitimate)
    } else if total <= 1.0 {
        (20, Decision::Legitimate)
    } else if total <= 2.0 {
        (50, Decision::Suspicious)
    } else {
        (75, Decision::Fraud)
    };
    ScoreResult {
        total,
        probability,
        decision,
    }
}

/// Human description of the threshold band a total falls in.
pub fn band_description(total: f64) -> &'static str {
    if total <= -1.0 {
        "at or below -1.0"
    } else if total <= 0.0 {
        "in (-1.0, 0.0]"
    } else if total <= 1.0 {
        "in (0.0, 1.0]"
    } else if total <= 2.0 {
        "in (1.0, 2.0]"
    } else {
        "above 2.0"
    }
}
