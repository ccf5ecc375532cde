//! Shared primitive types used across the entire crate.

/// The dataset's time step. Monotonic ordering key for an account's
/// history; not unique across records.
pub type Step = i64;

/// An account identifier. Ids beginning with `M` denote merchant
/// accounts; the prefix check is case-sensitive and prefix-only.
pub type AccountId = String;

/// A fraud probability, in whole percent (5, 10, 20, 50, 75).
pub type Probability = u8;
