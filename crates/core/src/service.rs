//! Orchestration: order source → rule cache → engine → catalog resolver.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, warn};

use crate::cache::{RuleCache, RuleSetSnapshot};
use crate::config::MiningConfig;
use crate::domain::product::CustomerId;
use crate::errors::ApplicationError;
use crate::mining::transactions::{item_frequencies, token_for_line, TransactionExtractor};
use crate::mining::{AssociationRule, ItemToken, MiningParams};
use crate::recommend::{
    CoPurchaseItem, CoPurchasedProduct, ItemFrequency, MiningAnalytics, RankedItem,
    Recommendations, RecommendationEngine, RecommendedProduct, RefreshSummary,
    ResolvedCombination,
};
use crate::sources::{OrderSource, ProductResolver};

const UNAVAILABLE_MESSAGE: &str = "recommendation data is temporarily unavailable";

/// Number of items reported by the analytics frequency table.
const TOP_ITEM_COUNT: usize = 10;

/// Public face of the recommendation engine: wires the collaborator seams
/// to the cache and the ranking functions, and resolves tokens back to
/// catalog entities for presentation. Query methods never return an error —
/// the worst outcome is an empty list with an explanatory message.
pub struct RecommendationService<S, R> {
    source: S,
    resolver: R,
    cache: RuleCache<S>,
    engine: RecommendationEngine,
}

impl<S, R> RecommendationService<S, R>
where
    S: OrderSource + Clone,
    R: ProductResolver,
{
    pub fn from_config(source: S, resolver: R, config: &MiningConfig) -> Result<Self, ApplicationError> {
        let params = MiningParams::new(config.min_support, config.min_confidence)?;
        let cache = RuleCache::new(
            source.clone(),
            params,
            Duration::seconds(config.cache_ttl_secs as i64),
            config.min_transactions,
        );

        Ok(Self { source, resolver, cache, engine: RecommendationEngine })
    }

    /// Ranked recommendations for the current cart contents.
    pub async fn cart_recommendations(
        &self,
        tokens: &[ItemToken],
        limit: usize,
    ) -> Recommendations<RecommendedProduct> {
        if tokens.is_empty() {
            return Recommendations::empty("cart is empty");
        }
        self.context_recommendations(tokens, limit, "cart").await
    }

    /// Ranked recommendations seeded from a customer's purchase history.
    /// Every line of every eligible order contributes to the context, so
    /// single-item orders still personalize even though they never mine.
    pub async fn personalized_recommendations(
        &self,
        customer: &CustomerId,
        limit: usize,
    ) -> Recommendations<RecommendedProduct> {
        let orders = match self.source.load_for_customer(customer).await {
            Ok(orders) => orders,
            Err(error) => {
                error!(
                    event_name = "recommend.history_load_failed",
                    customer_id = %customer.0,
                    error = %error,
                    "could not load purchase history"
                );
                return Recommendations::empty(UNAVAILABLE_MESSAGE);
            }
        };

        let tokens: Vec<ItemToken> = orders
            .iter()
            .filter(|order| order.status.contributes_to_mining())
            .flat_map(|order| order.lines.iter().map(token_for_line))
            .collect();

        if tokens.is_empty() {
            return Recommendations::empty(
                "no order history available for personalized recommendations",
            );
        }

        self.context_recommendations(&tokens, limit, "purchase history").await
    }

    async fn context_recommendations(
        &self,
        tokens: &[ItemToken],
        limit: usize,
        context_name: &str,
    ) -> Recommendations<RecommendedProduct> {
        let Some(snapshot) = self.snapshot_for_query().await else {
            return Recommendations::empty(UNAVAILABLE_MESSAGE);
        };
        if snapshot.rules.is_empty() {
            return Recommendations::empty(snapshot.status.message());
        }

        let context: HashSet<ItemToken> = tokens.iter().cloned().collect();
        let ranked = self.engine.rank_for_context(&snapshot.rules, &context, limit);
        let items = self.resolve_ranked(ranked).await;
        let message =
            format!("found {} recommendations based on your {context_name}", items.len());

        Recommendations::new(items, message)
    }

    /// Items frequently purchased alongside one focal item. Historical
    /// rules may identify the product by catalog id or by display name, so
    /// the lookup matches both forms.
    pub async fn frequently_bought_together(
        &self,
        focal: &ItemToken,
        limit: usize,
    ) -> Recommendations<CoPurchasedProduct> {
        let Some(snapshot) = self.snapshot_for_query().await else {
            return Recommendations::empty(UNAVAILABLE_MESSAGE);
        };
        if snapshot.rules.is_empty() {
            return Recommendations::empty(snapshot.status.message());
        }

        let mut focals = vec![focal.clone()];
        if let Ok(Some(product)) = self.resolver.resolve(focal).await {
            for alias in [ItemToken::new(&product.id.0), ItemToken::new(&product.name)] {
                if !alias.is_empty() && !focals.contains(&alias) {
                    focals.push(alias);
                }
            }
        }

        let co_purchases = self.engine.bought_together(&snapshot.rules, &focals, limit);
        let items = self.resolve_co_purchases(co_purchases).await;
        let message = format!("found {} items frequently bought together", items.len());

        Recommendations::new(items, message)
    }

    /// Rule groups clearing the trending floors, resolved for display.
    /// Combinations where either side loses all its products to resolution
    /// are dropped whole.
    pub async fn trending_combinations(
        &self,
        limit: usize,
    ) -> Recommendations<ResolvedCombination> {
        let Some(snapshot) = self.snapshot_for_query().await else {
            return Recommendations::empty(UNAVAILABLE_MESSAGE);
        };
        if snapshot.rules.is_empty() {
            return Recommendations::empty(snapshot.status.message());
        }

        let combinations = self.engine.trending(&snapshot.rules, limit);
        let mut items = Vec::with_capacity(combinations.len());

        for combination in combinations {
            let antecedent = self.resolve_tokens(combination.antecedent.tokens()).await;
            let consequent = self.resolve_tokens(combination.consequent.tokens()).await;

            if antecedent.is_empty() || consequent.is_empty() {
                continue;
            }

            items.push(ResolvedCombination {
                antecedent,
                consequent,
                support: combination.support,
                confidence: combination.confidence,
                lift: combination.lift,
            });
        }

        let message = format!("found {} trending combinations", items.len());
        Recommendations::new(items, message)
    }

    /// Explicit recompute. Unlike the query paths this surfaces mining
    /// failures to the caller; the cache keeps serving its previous rule
    /// set either way.
    pub async fn refresh_rules(&self, force: bool) -> Result<RefreshSummary, ApplicationError> {
        let snapshot = self.cache.refresh(force).await?;

        Ok(RefreshSummary {
            rule_count: snapshot.rule_count(),
            transaction_count: snapshot.stats.transaction_count,
            computed_at: snapshot.computed_at,
            status_message: snapshot.status.message(),
        })
    }

    /// Raw rule set for diagnostics.
    pub async fn debug_ruleset(&self) -> Result<Vec<AssociationRule>, ApplicationError> {
        Ok(self.cache.snapshot().await?.rules.clone())
    }

    /// Direct catalog lookup, exposed so interface layers can distinguish
    /// an unknown focal product from an empty co-purchase list.
    pub async fn resolve_product(
        &self,
        token: &ItemToken,
    ) -> Result<Option<crate::domain::product::Product>, ApplicationError> {
        self.resolver.resolve(token).await
    }

    /// Operational numbers for dashboards: order/transaction counts, the
    /// current item frequency table, and the cache's age.
    pub async fn analytics(&self) -> Result<MiningAnalytics, ApplicationError> {
        let total_orders = self.source.count_orders().await?;
        let orders = self.source.load_eligible_orders().await?;
        let (transactions, stats) = TransactionExtractor.extract_with_stats(&orders);

        let mut frequencies: Vec<(ItemToken, u32)> =
            item_frequencies(&transactions).into_iter().collect();
        frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        frequencies.truncate(TOP_ITEM_COUNT);

        let snapshot = self.cache.peek().await;
        let params = self.cache.params();
        let now = Utc::now();

        Ok(MiningAnalytics {
            total_orders,
            stats,
            rule_count: snapshot.as_ref().map(|s| s.rule_count()).unwrap_or(0),
            computed_at: snapshot.as_ref().map(|s| s.computed_at),
            cache_age_minutes: snapshot.as_ref().map(|s| s.age(now).num_minutes()),
            top_items: frequencies
                .into_iter()
                .map(|(token, count)| ItemFrequency { token, count })
                .collect(),
            min_support: params.min_support(),
            min_confidence: params.min_confidence(),
        })
    }

    async fn snapshot_for_query(&self) -> Option<Arc<RuleSetSnapshot>> {
        match self.cache.snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                error!(
                    event_name = "recommend.snapshot_failed",
                    error = %error,
                    "mining pass failed with no cached rules; serving empty result"
                );
                None
            }
        }
    }

    async fn resolve_ranked(&self, ranked: Vec<RankedItem>) -> Vec<RecommendedProduct> {
        let mut items = Vec::with_capacity(ranked.len());
        for item in ranked {
            if let Some(product) = self.resolve_active(&item.token).await {
                items.push(RecommendedProduct { product, score: item.score });
            }
        }
        items
    }

    async fn resolve_co_purchases(
        &self,
        co_purchases: Vec<CoPurchaseItem>,
    ) -> Vec<CoPurchasedProduct> {
        let mut items = Vec::with_capacity(co_purchases.len());
        for item in co_purchases {
            if let Some(product) = self.resolve_active(&item.token).await {
                items.push(CoPurchasedProduct {
                    product,
                    confidence: item.confidence,
                    lift: item.lift,
                });
            }
        }
        items
    }

    async fn resolve_tokens(&self, tokens: &[ItemToken]) -> Vec<crate::domain::product::Product> {
        let mut products = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Some(product) = self.resolve_active(token).await {
                products.push(product);
            }
        }
        products
    }

    /// Tokens that no longer resolve to an active catalog entry are dropped
    /// from results; resolver failures drop the token too rather than
    /// failing the whole request.
    async fn resolve_active(&self, token: &ItemToken) -> Option<crate::domain::product::Product> {
        match self.resolver.resolve(token).await {
            Ok(Some(product)) if product.active => Some(product),
            Ok(_) => None,
            Err(resolve_error) => {
                warn!(
                    event_name = "recommend.resolver_failed",
                    token = %token,
                    error = %resolve_error,
                    "dropping unresolvable token from results"
                );
                None
            }
        }
    }
}
