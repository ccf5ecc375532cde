//! PayWatch core — fraud triage for PaySim-style mobile-money data.
//!
//! A weighted four-signal scoring framework over an immutable
//! transaction store, narrated by an external reasoning oracle:
//!
//!   - `store`:   the dataset, loaded once (SQLite preferred, CSV
//!                fallback), optionally sub-sampled with a fixed seed.
//!   - `signals`: the pure sub-score tools (account behavior, balance
//!                anomaly, destination type, amount context) plus two
//!                auxiliary diagnostics.
//!   - `scoring`: the type gate, score aggregation, and threshold
//!                mapping. Deterministic and authoritative.
//!   - `oracle`:  the tool-call protocol seam to the language model.
//!   - `agent`:   the orchestrator tying the above together.

pub mod agent;
pub mod config;
pub mod error;
pub mod oracle;
pub mod prompts;
pub mod record;
pub mod rng;
pub mod scoring;
pub mod signals;
pub mod store;
pub mod types;

pub use agent::{AnalysisOutcome, AnalysisReport, FraudAnalyst};
pub use config::{AnalysisMode, DataConfig, OracleConfig};
pub use error::{AgentError, AgentResult};
pub use record::{TransactionRecord, TransactionSnapshot, TxType};
pub use scoring::{Decision, ScoreBreakdown, ScoreResult};
pub use store::{StoreCache, TransactionStore};
