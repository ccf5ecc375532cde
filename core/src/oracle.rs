//! The reasoning oracle seam.
//!
//! RULE: The language model is an opaque collaborator. The orchestrator
//! sends it a directive, a task, and the declared tool schemas; it
//! replies with either tool-call requests or final text. Everything is
//! explicit request/response message passing — no implicit control
//! flow, no hidden state on the oracle side.

use crate::{
    config::OracleConfig,
    error::{AgentError, AgentResult},
    signals::SIGNAL_A_WINDOW,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One chat message in OpenAI chat-completions shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Echo of an assistant turn that requested tool calls.
    pub fn assistant_tool_calls(calls: &[ToolInvocation]) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(calls.iter().map(ToolInvocation::to_payload).collect()),
            tool_call_id: None,
        }
    }

    /// A tool result fed back to the oracle.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Raw tool-call payload as it appears on the wire: arguments are a
/// JSON-encoded string per the chat-completions schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub name: String,
    pub arguments: String,
}

/// A decoded tool-call request from the oracle.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn to_payload(&self) -> ToolCallPayload {
        ToolCallPayload {
            id: self.id.clone(),
            kind: "function".into(),
            function: FunctionPayload {
                name: self.name.clone(),
                arguments: self.arguments.to_string(),
            },
        }
    }

    pub fn from_payload(payload: &ToolCallPayload) -> AgentResult<Self> {
        let arguments: Value = if payload.function.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&payload.function.arguments).map_err(|e| {
                AgentError::oracle(format!(
                    "tool call {} carried malformed arguments: {e}",
                    payload.function.name
                ))
            })?
        };
        Ok(Self {
            id: payload.id.clone(),
            name: payload.function.name.clone(),
            arguments,
        })
    }
}

/// A declared operation the oracle may invoke.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolSpec {
    /// Chat-completions `tools` entry.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// One oracle step: either more tool calls to serve, or the final text.
#[derive(Debug, Clone)]
pub enum OracleReply {
    ToolCalls(Vec<ToolInvocation>),
    Final(String),
}

/// The oracle contract. The orchestrator owns the loop; an oracle only
/// ever answers one step at a time.
pub trait ReasoningOracle: Send + Sync {
    fn next(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> AgentResult<OracleReply>;
}

// ── Declared tool surface ────────────────────────────────────────────────────

/// The five operations exposed to the oracle. Tool D (amount context)
/// is a plain threshold the directive states inline, so it is not a
/// callable tool — matching the framework text.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "get_origin_history",
            description: "Recent transaction history and behavior assessment for the \
                          sender account. Use to check for new accounts, trusted \
                          TRANSFER/CASH_OUT patterns, and past fraud.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "origin_id": { "type": "string", "description": "Sender account id (nameOrig)" },
                    "n": { "type": "integer", "description": "History window size", "default": SIGNAL_A_WINDOW }
                },
                "required": ["origin_id"]
            }),
        },
        ToolSpec {
            name: "check_balance_anomaly",
            description: "Compare the transaction amount against the sender's balance \
                          before the transaction. Weak signal; use only to reinforce \
                          other signals.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "amount": { "type": "number" },
                    "oldbalanceOrg": { "type": "number", "description": "Sender balance before the transaction" },
                    "tx_type": { "type": "string", "description": "Transaction type, e.g. TRANSFER" }
                },
                "required": ["amount", "oldbalanceOrg", "tx_type"]
            }),
        },
        ToolSpec {
            name: "is_merchant_account",
            description: "Whether the destination account is a merchant (id prefix M). \
                          Merchants carry lower fraud risk.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "dest_id": { "type": "string", "description": "Destination account id (nameDest)" }
                },
                "required": ["dest_id"]
            }),
        },
        ToolSpec {
            name: "get_account_statistics",
            description: "Full-history statistics for an account: totals, fraud rate, \
                          type breakdown. Diagnostic context only.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "account_id": { "type": "string" }
                },
                "required": ["account_id"]
            }),
        },
        ToolSpec {
            name: "compare_to_account_average",
            description: "Whether the amount is typical for this account and \
                          transaction type (mean + 2 stddev bound). Diagnostic \
                          context only.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "origin_id": { "type": "string" },
                    "amount": { "type": "number" },
                    "tx_type": { "type": "string" }
                },
                "required": ["origin_id", "amount", "tx_type"]
            }),
        },
    ]
}

// ── HTTP oracle ──────────────────────────────────────────────────────────────

/// OpenAI-compatible chat-completions client. Every failure (transport,
/// HTTP status, malformed body) surfaces as `AgentError::Oracle` so the
/// orchestrator can recover it into a diagnostic result.
pub struct HttpOracle {
    config: OracleConfig,
    client: reqwest::blocking::Client,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> AgentResult<Self> {
        config.validate()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::oracle(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

impl ReasoningOracle for HttpOracle {
    fn next(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> AgentResult<OracleReply> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": messages,
            "tools": tools.iter().map(ToolSpec::to_wire).collect::<Vec<_>>(),
        });

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| AgentError::oracle(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(AgentError::oracle(format!("HTTP {status}: {text}")));
        }

        let value: Value = response
            .json()
            .map_err(|e| AgentError::oracle(format!("malformed response body: {e}")))?;
        let message = value
            .pointer("/choices/0/message")
            .ok_or_else(|| AgentError::oracle("response carried no choices"))?;

        if let Some(raw_calls) = message.get("tool_calls").and_then(Value::as_array) {
            if !raw_calls.is_empty() {
                let mut calls = Vec::with_capacity(raw_calls.len());
                for raw in raw_calls {
                    let payload: ToolCallPayload = serde_json::from_value(raw.clone())
                        .map_err(|e| AgentError::oracle(format!("malformed tool call: {e}")))?;
                    calls.push(ToolInvocation::from_payload(&payload)?);
                }
                return Ok(OracleReply::ToolCalls(calls));
            }
        }

        match message.get("content").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => Ok(OracleReply::Final(text.to_string())),
            _ => Err(AgentError::oracle("response carried neither tool calls nor text")),
        }
    }
}
