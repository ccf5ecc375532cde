//! Reasoning orchestrator — drives the oracle's tool-call loop and
//! formats the analysis report.
//!
//! RULES:
//!   - The scoring engine's deterministic verdict is authoritative.
//!     The oracle explains; it never judges. A narrative whose trailing
//!     decision lines disagree with the engine is rewritten.
//!   - Oracle failures are recovered here, into a diagnostic result
//!     carrying the transaction's fields and a remediation hint. They
//!     never propagate as raw faults and are never converted into a
//!     fabricated verdict.
//!   - The analyst holds its collaborators by explicit injection: one
//!     store, one oracle, constructed once and passed in.

use crate::{
    config::AnalysisMode,
    error::{AgentError, AgentResult},
    oracle::{self, ChatMessage, OracleReply, ReasoningOracle, ToolInvocation},
    prompts,
    record::{TransactionSnapshot, TxType},
    scoring::{self, ScoreBreakdown},
    signals::{self, SIGNAL_A_WINDOW},
    store::TransactionStore,
    types::Probability,
};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Default cap on oracle tool-call rounds per analysis.
pub const DEFAULT_TOOL_CALL_BUDGET: u32 = 12;

/// One finished analysis. Each call recomputes from scratch; reports
/// are never cached.
#[derive(Debug)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub snapshot: TransactionSnapshot,
    pub outcome: AnalysisOutcome,
}

#[derive(Debug)]
pub enum AnalysisOutcome {
    /// The narrative text, already reconciled with the engine verdict.
    Completed {
        breakdown: ScoreBreakdown,
        text: String,
    },
    /// The oracle failed; no verdict is reported.
    Diagnostic { message: String },
}

impl AnalysisReport {
    /// The display text for either outcome.
    pub fn text(&self) -> &str {
        match &self.outcome {
            AnalysisOutcome::Completed { text, .. } => text,
            AnalysisOutcome::Diagnostic { message } => message,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Diagnostic { .. })
    }
}

pub struct FraudAnalyst {
    store: Arc<TransactionStore>,
    oracle: Box<dyn ReasoningOracle>,
    mode: AnalysisMode,
    tool_call_budget: u32,
}

impl FraudAnalyst {
    pub fn new(
        store: Arc<TransactionStore>,
        oracle: Box<dyn ReasoningOracle>,
        mode: AnalysisMode,
    ) -> Self {
        Self {
            store,
            oracle,
            mode,
            tool_call_budget: DEFAULT_TOOL_CALL_BUDGET,
        }
    }

    pub fn with_tool_call_budget(mut self, budget: u32) -> Self {
        self.tool_call_budget = budget.max(1);
        self
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// The deterministic path: gate, signals, thresholds. Never touches
    /// the oracle.
    pub fn score(&self, tx: &TransactionSnapshot) -> ScoreBreakdown {
        scoring::evaluate(&self.store, tx)
    }

    /// Full agent path: deterministic verdict first, then the oracle
    /// narrates it through the tool-call protocol.
    pub fn analyze(&self, tx: &TransactionSnapshot) -> AnalysisReport {
        let analysis_id = Uuid::new_v4();
        let breakdown = self.score(tx);
        log::debug!(
            "analysis {analysis_id}: gated={} total={:+.1} decision={}",
            breakdown.gated,
            breakdown.result.total,
            breakdown.result.decision
        );

        let outcome = match self.narrate(tx) {
            Ok(text) => AnalysisOutcome::Completed {
                text: self.reconcile(text, tx, &breakdown),
                breakdown,
            },
            Err(e) => {
                log::warn!("analysis {analysis_id}: oracle failed: {e}");
                AnalysisOutcome::Diagnostic {
                    message: diagnostic_text(tx, &e),
                }
            }
        };

        AnalysisReport {
            analysis_id,
            snapshot: tx.clone(),
            outcome,
        }
    }

    /// Analyze a sequence independently. A failing item yields its
    /// diagnostic report and never aborts the rest.
    pub fn analyze_batch(&self, txs: &[TransactionSnapshot]) -> Vec<AnalysisReport> {
        txs.iter()
            .enumerate()
            .map(|(i, tx)| {
                log::info!("Analyzing transaction {}/{}", i + 1, txs.len());
                self.analyze(tx)
            })
            .collect()
    }

    /// Drive the oracle until it produces final text or the tool-call
    /// budget runs out.
    fn narrate(&self, tx: &TransactionSnapshot) -> AgentResult<String> {
        let mut messages = vec![
            ChatMessage::system(prompts::system_directive(self.mode)),
            ChatMessage::user(prompts::task_text(tx)),
        ];
        let tools = oracle::tool_specs();

        for _ in 0..self.tool_call_budget {
            match self.oracle.next(&messages, &tools)? {
                OracleReply::Final(text) => return Ok(text),
                OracleReply::ToolCalls(calls) => {
                    messages.push(ChatMessage::assistant_tool_calls(&calls));
                    for call in &calls {
                        let result = self.dispatch_tool(call);
                        log::debug!("tool {} served ({} bytes)", call.name, result.len());
                        messages.push(ChatMessage::tool_result(call.id.clone(), result));
                    }
                }
            }
        }

        Err(AgentError::oracle(format!(
            "tool-call budget of {} rounds exhausted without a final answer",
            self.tool_call_budget
        )))
    }

    /// Serve one tool call from the signal tools. Argument problems are
    /// reported back to the oracle as text, not raised as faults.
    fn dispatch_tool(&self, call: &ToolInvocation) -> String {
        let args = &call.arguments;
        match call.name.as_str() {
            "get_origin_history" => {
                let Some(origin_id) = arg_str(args, "origin_id") else {
                    return missing_arg(call, "origin_id");
                };
                let n = args
                    .get("n")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
                    .unwrap_or(SIGNAL_A_WINDOW);
                signals::origin_history(&self.store, &origin_id, n).detail
            }
            "check_balance_anomaly" => {
                let (Some(amount), Some(balance)) =
                    (arg_f64(args, "amount"), arg_f64(args, "oldbalanceOrg"))
                else {
                    return missing_arg(call, "amount, oldbalanceOrg");
                };
                match parse_type_arg(args) {
                    Ok(tx_type) => signals::balance_anomaly(amount, balance, tx_type).detail,
                    Err(text) => text,
                }
            }
            "is_merchant_account" => {
                let Some(dest_id) = arg_str(args, "dest_id") else {
                    return missing_arg(call, "dest_id");
                };
                signals::merchant_check(&dest_id).detail
            }
            "get_account_statistics" => {
                let Some(account_id) = arg_str(args, "account_id") else {
                    return missing_arg(call, "account_id");
                };
                signals::account_statistics(&self.store, &account_id)
            }
            "compare_to_account_average" => {
                let (Some(origin_id), Some(amount)) =
                    (arg_str(args, "origin_id"), arg_f64(args, "amount"))
                else {
                    return missing_arg(call, "origin_id, amount");
                };
                match parse_type_arg(args) {
                    Ok(tx_type) => {
                        signals::amount_versus_average(&self.store, &origin_id, amount, tx_type)
                    }
                    Err(text) => text,
                }
            }
            other => format!("Error: unknown tool '{other}'"),
        }
    }

    /// The strict six-step narrative plus trailing decision lines,
    /// rendered locally from the breakdown. Also the offline report.
    pub fn render_report(&self, tx: &TransactionSnapshot, breakdown: &ScoreBreakdown) -> String {
        let mut lines = vec!["Agent Analysis (Step by Step)".to_string(), String::new()];
        let type_label = tx.tx_type.map(|t| t.as_str()).unwrap_or("(missing)");

        if breakdown.gated {
            lines.push(format!(
                "1. Type check: {type_label} is a low-risk type; the gate returns \
                 LEGITIMATE immediately."
            ));
            for (i, letter) in ['A', 'B', 'C', 'D'].iter().enumerate() {
                lines.push(format!("{}. Signal {letter}: skipped by the type gate.", i + 2));
            }
            lines.push(format!(
                "6. No score computed; the type gate fixes the outcome at {}% probability.",
                breakdown.result.probability
            ));
        } else {
            lines.push(format!(
                "1. Type check: {type_label} is a high-risk type; full four-signal \
                 analysis required."
            ));
            for (i, signal) in breakdown.signals.iter().enumerate() {
                lines.push(format!(
                    "{}. Signal {} ({}, {}%): {:+.1} points ({}).",
                    i + 2,
                    signal.signal.letter(),
                    signal.signal.label(),
                    signal.signal.weight_pct(),
                    signal.score,
                    signal.rationale
                ));
            }
            lines.push(format!(
                "6. Total score {:+.1} is {}: fraud probability {}%.",
                breakdown.result.total,
                scoring::band_description(breakdown.result.total),
                breakdown.result.probability
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "FRAUD PROBABILITY: {}%",
            breakdown.result.probability
        ));
        lines.push(format!("REASON: {}", deterministic_reason(tx, breakdown)));
        lines.push(format!("FINAL DECISION: {}", breakdown.result.decision));
        lines.join("\n")
    }

    /// Enforce the contract that the narrative's stated decision equals
    /// the engine's. Matching text passes through untouched; anything
    /// else gets its trailing lines rewritten.
    fn reconcile(&self, text: String, tx: &TransactionSnapshot, breakdown: &ScoreBreakdown) -> String {
        let (stated_probability, stated_decision) = parse_trailing_lines(&text);
        let result = &breakdown.result;
        if stated_probability == Some(result.probability)
            && stated_decision == Some(result.decision.as_str().to_string())
        {
            return text;
        }

        log::warn!(
            "oracle narrative stated {:?}/{:?} but the engine decided {}%/{}; rewriting",
            stated_probability,
            stated_decision,
            result.probability,
            result.decision
        );

        let mut reason: Option<String> = None;
        let mut body: Vec<&str> = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim_start();
            if trimmed.starts_with("FRAUD PROBABILITY:") || trimmed.starts_with("FINAL DECISION:") {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("REASON:") {
                reason = Some(rest.trim().to_string());
                continue;
            }
            body.push(line);
        }
        while body.last().is_some_and(|l| l.trim().is_empty()) {
            body.pop();
        }

        let mut out = body.join("\n");
        out.push_str(&format!(
            "\n\nFRAUD PROBABILITY: {}%\nREASON: {}\nFINAL DECISION: {}",
            result.probability,
            reason.unwrap_or_else(|| deterministic_reason(tx, breakdown)),
            result.decision
        ));
        out
    }
}

/// A summary reason derived from the breakdown, used in offline reports
/// and as the fallback when a rewritten narrative carried no REASON.
fn deterministic_reason(tx: &TransactionSnapshot, breakdown: &ScoreBreakdown) -> String {
    if breakdown.gated {
        let type_label = tx.tx_type.map(|t| t.as_str()).unwrap_or("(missing)");
        return format!(
            "{type_label} transactions are statistically never fraudulent in this \
             dataset, so the type gate short-circuits the signal analysis."
        );
    }

    let mut contributors: Vec<&signals::SignalReport> = breakdown
        .signals
        .iter()
        .filter(|s| s.score != 0.0)
        .collect();
    contributors.sort_by(|a, b| {
        b.score
            .abs()
            .partial_cmp(&a.score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let summary = if contributors.is_empty() {
        "no signal contributed a non-zero score".to_string()
    } else {
        contributors
            .iter()
            .take(3)
            .map(|s| s.rationale.clone())
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Total score {:+.1} ({}). Key signals: {summary}.",
        breakdown.result.total,
        scoring::band_description(breakdown.result.total)
    )
}

/// Diagnostic result for a failed oracle: the literal transaction
/// fields plus a remediation hint, never a verdict.
fn diagnostic_text(tx: &TransactionSnapshot, error: &AgentError) -> String {
    format!(
        "Reasoning oracle unavailable: {error}\n\n\
         Transaction under analysis:\n{}\n\n\
         Remediation:\n\
         \x20 1. Check OPENAI_API_KEY in the environment\n\
         \x20 2. Verify the oracle endpoint is reachable\n\
         \x20 3. Re-run with the offline deterministic report if the\n\
         \x20    oracle stays unavailable",
        tx.describe()
    )
}

fn parse_trailing_lines(text: &str) -> (Option<Probability>, Option<String>) {
    let mut probability = None;
    let mut decision = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("FRAUD PROBABILITY:") {
            let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
            probability = digits.parse::<Probability>().ok();
        } else if let Some(rest) = trimmed.strip_prefix("FINAL DECISION:") {
            for candidate in ["LEGITIMATE", "SUSPICIOUS", "FRAUD"] {
                if rest.contains(candidate) {
                    decision = Some(candidate.to_string());
                    break;
                }
            }
        }
    }
    (probability, decision)
}

fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn arg_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn missing_arg(call: &ToolInvocation, expected: &str) -> String {
    format!(
        "Error: tool '{}' requires arguments: {expected}",
        call.name
    )
}

/// Optional `tx_type` argument; unknown names are reported as text.
fn parse_type_arg(args: &Value) -> Result<Option<TxType>, String> {
    match args.get("tx_type").and_then(Value::as_str) {
        None => Ok(None),
        Some(raw) => TxType::from_str(raw).map(Some).map_err(|e| format!("Error: {e}")),
    }
}
