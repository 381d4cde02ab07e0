pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod mining;
pub mod recommend;
pub mod service;
pub mod sources;

pub use cache::{RuleCache, RuleSetSnapshot};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus};
pub use domain::product::{CustomerId, Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use mining::{
    AssociationRule, FrequentItemsets, ItemToken, ItemsetKey, ItemsetMiner, MiningParams,
    MiningStatus, RuleGenerator, Transaction, TransactionExtractor, TransactionStats,
};
pub use recommend::{
    CoPurchaseItem, CoPurchasedProduct, ItemFrequency, MiningAnalytics, RankedItem,
    Recommendations, RecommendationEngine, RecommendedProduct, RefreshSummary,
    ResolvedCombination, TrendingCombination,
};
pub use service::RecommendationService;
pub use sources::{OrderSource, ProductResolver};
