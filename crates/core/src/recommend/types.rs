//! Types for the recommendation queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::Product;
use crate::mining::{ItemToken, ItemsetKey, TransactionStats};

/// Token-level scored recommendation produced by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub token: ItemToken,
    pub score: f64,
}

/// Token-level co-purchase hit for one focal item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoPurchaseItem {
    pub token: ItemToken,
    pub confidence: f64,
    pub lift: f64,
}

/// One rule shown by the trending view, as raw token groups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendingCombination {
    pub antecedent: ItemsetKey,
    pub consequent: ItemsetKey,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

/// Catalog-resolved recommendation row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendedProduct {
    pub product: Product,
    pub score: f64,
}

/// Catalog-resolved co-purchase row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoPurchasedProduct {
    pub product: Product,
    pub confidence: f64,
    pub lift: f64,
}

/// Catalog-resolved trending combination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCombination {
    pub antecedent: Vec<Product>,
    pub consequent: Vec<Product>,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

/// Query result carrying a human-readable status alongside the items. An
/// empty item list with an explanation is the normal answer for thin order
/// history, never an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendations<T> {
    pub items: Vec<T>,
    pub message: String,
}

impl<T> Recommendations<T> {
    pub fn new(items: Vec<T>, message: impl Into<String>) -> Self {
        Self { items, message: message.into() }
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self { items: Vec::new(), message: message.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Summary returned by the explicit refresh operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub rule_count: usize,
    pub transaction_count: usize,
    pub computed_at: DateTime<Utc>,
    pub status_message: String,
}

/// Per-token occurrence count for the analytics view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemFrequency {
    pub token: ItemToken,
    pub count: u32,
}

/// Operational view of the mining pipeline for dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningAnalytics {
    pub total_orders: u64,
    pub stats: TransactionStats,
    pub rule_count: usize,
    pub computed_at: Option<DateTime<Utc>>,
    pub cache_age_minutes: Option<i64>,
    pub top_items: Vec<ItemFrequency>,
    pub min_support: f64,
    pub min_confidence: f64,
}
