//! Market-basket mining pipeline
//!
//! Turns completed multi-item orders into association rules through the
//! level-wise Apriori search: orders are reduced to deduplicated
//! transactions, frequent itemsets are grown one level at a time under a
//! support threshold, and surviving itemsets of size two or more are split
//! into antecedent/consequent rules filtered by confidence.

pub mod itemsets;
pub mod rules;
pub mod transactions;

pub use itemsets::{FrequentItemsets, ItemsetKey, ItemsetLevel, ItemsetMiner};
pub use rules::{AssociationRule, RuleGenerator};
pub use transactions::{
    ItemToken, Transaction, TransactionExtractor, TransactionStats,
};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Default minimum fraction of transactions an itemset must appear in.
pub const DEFAULT_MIN_SUPPORT: f64 = 0.15;

/// Default minimum confidence for a rule to survive generation.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Hard ceiling on itemset size. Bounds the level-wise search on
/// pathological order histories; retail baskets never get near it.
pub const MAX_ITEMSET_SIZE: usize = 10;

/// Mining is skipped entirely below this many usable transactions.
pub const DEFAULT_MIN_TRANSACTIONS: usize = 5;

/// Validated support and confidence thresholds for one mining pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningParams {
    min_support: f64,
    min_confidence: f64,
}

impl MiningParams {
    pub fn new(min_support: f64, min_confidence: f64) -> Result<Self, DomainError> {
        if !(min_support > 0.0 && min_support <= 1.0) {
            return Err(DomainError::InvalidThreshold { name: "min_support", value: min_support });
        }
        if !(min_confidence > 0.0 && min_confidence <= 1.0) {
            return Err(DomainError::InvalidThreshold {
                name: "min_confidence",
                value: min_confidence,
            });
        }

        Ok(Self { min_support, min_confidence })
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Absolute support-count threshold for a transaction set of the given
    /// size: `ceil(min_support × transaction_count)`.
    pub fn support_threshold(&self, transaction_count: usize) -> u32 {
        (self.min_support * transaction_count as f64).ceil() as u32
    }
}

impl Default for MiningParams {
    fn default() -> Self {
        Self { min_support: DEFAULT_MIN_SUPPORT, min_confidence: DEFAULT_MIN_CONFIDENCE }
    }
}

/// Outcome classification of a mining pass. Thin order history is a status,
/// never an error: query modes answer with an empty list plus the message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiningStatus {
    Ok,
    InsufficientTransactions { found: usize, required: usize },
    NoFrequentItemsets,
    NoRules,
}

impl MiningStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn message(&self) -> String {
        match self {
            Self::Ok => "association rules are available".to_string(),
            Self::InsufficientTransactions { found, required } => format!(
                "insufficient order history for analysis (need at least {required} multi-item orders, got {found})"
            ),
            Self::NoFrequentItemsets => {
                "no item combinations met the support threshold".to_string()
            }
            Self::NoRules => "no item combinations met the confidence threshold".to_string(),
        }
    }
}
