//! Per-request recommendation options.
//!
//! One immutable value travels with each `recommend` call; there is no
//! ambient tuning state anywhere in the engine.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_HOPS: u32 = 2;
pub const DEFAULT_MAX_CANDIDATES: usize = 200;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

const MAX_HOPS_LIMIT: u32 = 8;
const MAX_CANDIDATES_LIMIT: usize = 10_000;
const TOP_K_LIMIT: usize = 1_000;
const DEADLINE_LIMIT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid option `{option}`: {message}")]
pub struct OptionsError {
    pub option: &'static str,
    pub message: String,
}

impl OptionsError {
    fn new(option: &'static str, message: impl Into<String>) -> Self {
        Self { option, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendOptions {
    /// Traversal depth bound.
    pub max_hops: u32,
    /// Traversal breadth safety bound; discovery stops once this many
    /// distinct products have been seen.
    pub max_candidates: usize,
    /// Result size bound.
    pub top_k: usize,
    /// Drop candidates the seed customer already purchased.
    pub exclude_owned: bool,
    /// Aggregate deadline for one recommendation call, across all of its
    /// sub-queries.
    pub deadline: Duration,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            top_k: DEFAULT_TOP_K,
            exclude_owned: true,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl RecommendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_exclude_owned(mut self, exclude_owned: bool) -> Self {
        self.exclude_owned = exclude_owned;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_hops == 0 || self.max_hops > MAX_HOPS_LIMIT {
            return Err(OptionsError::new(
                "max_hops",
                format!("{} is outside 1..={MAX_HOPS_LIMIT}", self.max_hops),
            ));
        }
        if self.max_candidates == 0 || self.max_candidates > MAX_CANDIDATES_LIMIT {
            return Err(OptionsError::new(
                "max_candidates",
                format!("{} is outside 1..={MAX_CANDIDATES_LIMIT}", self.max_candidates),
            ));
        }
        if self.top_k == 0 || self.top_k > TOP_K_LIMIT {
            return Err(OptionsError::new(
                "top_k",
                format!("{} is outside 1..={TOP_K_LIMIT}", self.top_k),
            ));
        }
        if self.deadline.is_zero() || self.deadline > DEADLINE_LIMIT {
            return Err(OptionsError::new(
                "deadline",
                format!("{:?} is outside 1ms..={DEADLINE_LIMIT:?}", self.deadline),
            ));
        }
        Ok(())
    }
}
