//! Orchestrator tests: the tool-call loop, narrative reconciliation,
//! and oracle-failure recovery.

use paywatch_core::{
    agent::{AnalysisOutcome, FraudAnalyst},
    config::AnalysisMode,
    error::{AgentError, AgentResult},
    oracle::{ChatMessage, OracleReply, ReasoningOracle, Role, ToolInvocation, ToolSpec},
    record::{TransactionSnapshot, TxType},
    store::TransactionStore,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Plays back a fixed reply script and records every message list it
/// was shown. Cloned handles share the same state.
#[derive(Clone)]
struct ScriptedOracle {
    replies: Arc<Mutex<VecDeque<OracleReply>>>,
    seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<OracleReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn calls_seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

impl ReasoningOracle for ScriptedOracle {
    fn next(&self, messages: &[ChatMessage], _tools: &[ToolSpec]) -> AgentResult<OracleReply> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::oracle("script exhausted"))
    }
}

/// An oracle that is never reachable.
struct UnreachableOracle;

impl ReasoningOracle for UnreachableOracle {
    fn next(&self, _messages: &[ChatMessage], _tools: &[ToolSpec]) -> AgentResult<OracleReply> {
        Err(AgentError::oracle("connection refused"))
    }
}

fn cash_out_tx() -> TransactionSnapshot {
    TransactionSnapshot {
        step: Some(100),
        tx_type: Some(TxType::CashOut),
        amount: Some(297_988.0),
        name_orig: Some("C1000000001".into()),
        old_balance_orig: Some(30_030.0),
        new_balance_orig: Some(0.0),
        name_dest: Some("C1792659267".into()),
        old_balance_dest: Some(0.0),
        new_balance_dest: Some(297_988.0),
        is_fraud: Some(false),
        is_flagged: Some(false),
    }
}

fn payment_tx() -> TransactionSnapshot {
    TransactionSnapshot {
        tx_type: Some(TxType::Payment),
        amount: Some(9_839.64),
        name_orig: Some("C1231006815".into()),
        name_dest: Some("M1979787155".into()),
        ..Default::default()
    }
}

fn analyst(oracle: Box<dyn ReasoningOracle>) -> FraudAnalyst {
    let store = Arc::new(TransactionStore::from_records(vec![]));
    FraudAnalyst::new(store, oracle, AnalysisMode::Production)
}

const MATCHING_FINAL: &str = "Agent Analysis (Step by Step)\n\n\
    1. CASH_OUT is high risk, full analysis required.\n\
    2. Signal A: +2.0 (no history).\n\
    3. Signal B: +2.0 (ratio 9.92x).\n\
    4. Signal C: 0.0 (regular destination).\n\
    5. Signal D: 0.0 (amount under 300,000).\n\
    6. Total +4.0 is above 2.0.\n\n\
    FRAUD PROBABILITY: 75%\n\
    REASON: A new account moving almost ten times its balance.\n\
    FINAL DECISION: FRAUD";

// ── Tool-call loop ───────────────────────────────────────────────────────────

#[test]
fn tool_calls_are_served_and_fed_back() {
    let oracle = ScriptedOracle::new(vec![
        OracleReply::ToolCalls(vec![ToolInvocation {
            id: "call_1".into(),
            name: "get_origin_history".into(),
            arguments: json!({ "origin_id": "C1000000001" }),
        }]),
        OracleReply::Final(MATCHING_FINAL.into()),
    ]);
    let analyst = analyst(Box::new(oracle.clone()));

    let report = analyst.analyze(&cash_out_tx());
    assert!(!report.is_diagnostic(), "got: {}", report.text());

    let seen = oracle.calls_seen();
    assert_eq!(seen.len(), 2, "two oracle rounds");
    assert_eq!(seen[0].len(), 2, "round 1: system + user");
    assert_eq!(seen[1].len(), 4, "round 2: + assistant echo + tool result");
    assert_eq!(seen[1][2].role, Role::Assistant);
    assert_eq!(seen[1][3].role, Role::Tool);
    assert_eq!(seen[1][3].tool_call_id.as_deref(), Some("call_1"));
    let tool_text = seen[1][3].content.as_deref().unwrap_or_default();
    assert!(
        tool_text.contains("NO TRANSACTION HISTORY"),
        "tool result must describe the empty history: {tool_text}"
    );
}

#[test]
fn unknown_tool_is_reported_back_not_raised() {
    let oracle = ScriptedOracle::new(vec![
        OracleReply::ToolCalls(vec![ToolInvocation {
            id: "call_1".into(),
            name: "predict_fraud".into(),
            arguments: json!({}),
        }]),
        OracleReply::Final(MATCHING_FINAL.into()),
    ]);
    let analyst = analyst(Box::new(oracle.clone()));

    let report = analyst.analyze(&cash_out_tx());
    assert!(!report.is_diagnostic());

    let seen = oracle.calls_seen();
    let tool_text = seen[1][3].content.as_deref().unwrap_or_default();
    assert!(
        tool_text.contains("unknown tool"),
        "unknown tools are answered with an error text: {tool_text}"
    );
}

#[test]
fn exhausted_budget_becomes_a_diagnostic() {
    let endless_call = || {
        OracleReply::ToolCalls(vec![ToolInvocation {
            id: "call".into(),
            name: "get_origin_history".into(),
            arguments: json!({ "origin_id": "C1" }),
        }])
    };
    let oracle = ScriptedOracle::new(vec![endless_call(), endless_call(), endless_call()]);
    let analyst = analyst(Box::new(oracle)).with_tool_call_budget(2);

    let report = analyst.analyze(&cash_out_tx());
    assert!(report.is_diagnostic());
    assert!(
        report.text().contains("budget"),
        "diagnostic must name the exhausted budget: {}",
        report.text()
    );
}

// ── Reconciliation ───────────────────────────────────────────────────────────

#[test]
fn matching_narrative_passes_through_untouched() {
    let oracle = ScriptedOracle::new(vec![OracleReply::Final(MATCHING_FINAL.into())]);
    let analyst = analyst(Box::new(oracle));

    let report = analyst.analyze(&cash_out_tx());
    match &report.outcome {
        AnalysisOutcome::Completed { text, breakdown } => {
            assert_eq!(text, MATCHING_FINAL);
            assert_eq!(breakdown.result.probability, 75);
        }
        other => panic!("expected completed outcome, got {other:?}"),
    }
}

#[test]
fn disagreeing_narrative_is_rewritten_to_the_engine_verdict() {
    let wrong = "Agent Analysis (Step by Step)\n\n1. Looks fine to me.\n\n\
        FRAUD PROBABILITY: 10%\n\
        REASON: The destination looked ordinary.\n\
        FINAL DECISION: LEGITIMATE";
    let oracle = ScriptedOracle::new(vec![OracleReply::Final(wrong.into())]);
    let analyst = analyst(Box::new(oracle));

    let report = analyst.analyze(&cash_out_tx());
    let text = report.text();
    assert!(text.contains("FRAUD PROBABILITY: 75%"), "got: {text}");
    assert!(text.ends_with("FINAL DECISION: FRAUD"), "got: {text}");
    assert!(
        text.contains("REASON: The destination looked ordinary."),
        "the oracle's reason survives the rewrite: {text}"
    );
    assert!(
        !text.contains("FRAUD PROBABILITY: 10%"),
        "the stale probability must be gone: {text}"
    );
}

#[test]
fn narrative_without_decision_lines_gets_them_appended() {
    let bare = "Agent Analysis (Step by Step)\n\n1. Narrative only, no verdict lines.";
    let oracle = ScriptedOracle::new(vec![OracleReply::Final(bare.into())]);
    let analyst = analyst(Box::new(oracle));

    let report = analyst.analyze(&cash_out_tx());
    let text = report.text();
    assert!(text.contains("FRAUD PROBABILITY: 75%"), "got: {text}");
    assert!(text.contains("REASON:"), "got: {text}");
    assert!(text.ends_with("FINAL DECISION: FRAUD"), "got: {text}");
}

// ── Gate path ────────────────────────────────────────────────────────────────

#[test]
fn gated_transaction_scores_without_any_tool() {
    let analyst = analyst(Box::new(UnreachableOracle));
    let breakdown = analyst.score(&payment_tx());

    assert!(breakdown.gated);
    assert_eq!(breakdown.result.probability, 5);
    assert!(breakdown.trace.tool_calls.is_empty());

    let text = analyst.render_report(&payment_tx(), &breakdown);
    assert!(text.contains("FRAUD PROBABILITY: 5%"), "got: {text}");
    assert!(text.ends_with("FINAL DECISION: LEGITIMATE"), "got: {text}");
}

// ── Failure recovery ─────────────────────────────────────────────────────────

#[test]
fn unreachable_oracle_yields_a_diagnostic_with_the_fields() {
    let analyst = analyst(Box::new(UnreachableOracle));
    let tx = cash_out_tx();

    let report = analyst.analyze(&tx);
    assert!(report.is_diagnostic());

    let text = report.text();
    assert!(text.contains("297988"), "amount must be present: {text}");
    assert!(text.contains("C1000000001"), "origin must be present: {text}");
    assert!(text.contains("C1792659267"), "destination must be present: {text}");
    assert!(text.contains("CASH_OUT"), "type must be present: {text}");
    assert!(text.contains("Remediation"), "hint must be present: {text}");
    assert!(
        !text.contains("FINAL DECISION"),
        "a failed analysis must not fabricate a verdict: {text}"
    );
}

#[test]
fn batch_survives_per_item_failures() {
    let analyst = analyst(Box::new(UnreachableOracle));
    let txs = vec![payment_tx(), cash_out_tx(), payment_tx()];

    let reports = analyst.analyze_batch(&txs);
    assert_eq!(reports.len(), 3, "a failing item must not abort the batch");
    for report in &reports {
        assert!(report.is_diagnostic());
    }
}

// ── Offline report format ────────────────────────────────────────────────────

#[test]
fn offline_report_follows_the_strict_format() {
    let analyst = analyst(Box::new(UnreachableOracle));
    let tx = cash_out_tx();
    let breakdown = analyst.score(&tx);
    let text = analyst.render_report(&tx, &breakdown);

    assert!(text.starts_with("Agent Analysis (Step by Step)"));
    for step in 1..=6 {
        assert!(
            text.contains(&format!("\n{step}. ")),
            "missing narrative step {step}: {text}"
        );
    }

    let tail: Vec<&str> = text.lines().rev().take(3).collect();
    assert!(tail[2].starts_with("FRAUD PROBABILITY: 75%"), "got: {text}");
    assert!(tail[1].starts_with("REASON:"), "got: {text}");
    assert_eq!(tail[0], "FINAL DECISION: FRAUD", "got: {text}");
}
