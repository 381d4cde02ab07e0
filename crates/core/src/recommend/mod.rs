//! Recommendation queries over the mined rule set
//!
//! Three read-only views of one rule snapshot: cart/personalized ranking,
//! frequently-bought-together for a single focal item, and trending
//! antecedent/consequent combinations.

mod engine;
mod types;

pub use engine::RecommendationEngine;
pub use types::*;

/// Default result size for cart-based recommendations.
pub const DEFAULT_CART_LIMIT: usize = 6;

/// Default result size for purchase-history recommendations.
pub const DEFAULT_PERSONALIZED_LIMIT: usize = 8;

/// Default result size for frequently-bought-together lookups.
pub const DEFAULT_BOUGHT_TOGETHER_LIMIT: usize = 4;

/// Default result size for the trending-combinations view.
pub const DEFAULT_TRENDING_LIMIT: usize = 10;

/// Trending floors, deliberately looser than the mining thresholds so the
/// view stays populated on small catalogs.
pub const TRENDING_MIN_CONFIDENCE: f64 = 0.3;
pub const TRENDING_MIN_LIFT: f64 = 1.0;
