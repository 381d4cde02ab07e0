use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use basketry_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
use basketry_core::domain::product::{CustomerId, Product, ProductId};

use crate::repositories::{RepositoryError, SqlOrderRepository, SqlProductRepository};
use crate::DbPool;

struct ProductSeed {
    id: &'static str,
    sku: &'static str,
    name: &'static str,
    category: &'static str,
    unit_price_cents: i64,
    active: bool,
}

const PRODUCT_SEEDS: &[ProductSeed] = &[
    ProductSeed {
        id: "prod-beans-espresso",
        sku: "BEAN-ESP-250",
        name: "Espresso Beans",
        category: "coffee",
        unit_price_cents: 1450,
        active: true,
    },
    ProductSeed {
        id: "prod-beans-filter",
        sku: "BEAN-FLT-250",
        name: "Filter Roast Beans",
        category: "coffee",
        unit_price_cents: 1350,
        active: true,
    },
    ProductSeed {
        id: "prod-grinder-hand",
        sku: "GRND-HND-001",
        name: "Hand Grinder",
        category: "equipment",
        unit_price_cents: 4900,
        active: true,
    },
    ProductSeed {
        id: "prod-kettle-gooseneck",
        sku: "KETL-GSN-001",
        name: "Gooseneck Kettle",
        category: "equipment",
        unit_price_cents: 6500,
        active: true,
    },
    ProductSeed {
        id: "prod-filters-paper",
        sku: "FLTR-PPR-100",
        name: "Paper Filters",
        category: "accessories",
        unit_price_cents: 650,
        active: true,
    },
    ProductSeed {
        id: "prod-mug-ceramic",
        sku: "MUG-CRM-001",
        name: "Ceramic Mug",
        category: "accessories",
        unit_price_cents: 1800,
        active: true,
    },
    ProductSeed {
        id: "prod-scale-digital",
        sku: "SCAL-DGT-001",
        name: "Digital Scale",
        category: "equipment",
        unit_price_cents: 3200,
        active: true,
    },
    // Discontinued; stays in the catalog so historical rules referencing it
    // exercise the inactive-product drop path.
    ProductSeed {
        id: "prod-mug-travel",
        sku: "MUG-TRV-001",
        name: "Travel Mug",
        category: "accessories",
        unit_price_cents: 2200,
        active: false,
    },
];

struct OrderSeed {
    id: &'static str,
    customer: &'static str,
    status: OrderStatus,
    items: &'static [&'static str],
    days_ago: i64,
}

const ORDER_SEEDS: &[OrderSeed] = &[
    OrderSeed {
        id: "order-0001",
        customer: "cust-alice",
        status: OrderStatus::Delivered,
        items: &["prod-beans-espresso", "prod-grinder-hand"],
        days_ago: 42,
    },
    OrderSeed {
        id: "order-0002",
        customer: "cust-bob",
        status: OrderStatus::Delivered,
        items: &["prod-beans-espresso", "prod-grinder-hand", "prod-filters-paper"],
        days_ago: 38,
    },
    OrderSeed {
        id: "order-0003",
        customer: "cust-carol",
        status: OrderStatus::Shipped,
        items: &["prod-beans-espresso", "prod-filters-paper"],
        days_ago: 31,
    },
    OrderSeed {
        id: "order-0004",
        customer: "cust-dave",
        status: OrderStatus::Processing,
        items: &["prod-beans-espresso", "prod-grinder-hand"],
        days_ago: 27,
    },
    OrderSeed {
        id: "order-0005",
        customer: "cust-erin",
        status: OrderStatus::Delivered,
        items: &["prod-kettle-gooseneck", "prod-filters-paper"],
        days_ago: 24,
    },
    OrderSeed {
        id: "order-0006",
        customer: "cust-frank",
        status: OrderStatus::Delivered,
        items: &["prod-beans-espresso", "prod-grinder-hand"],
        days_ago: 20,
    },
    OrderSeed {
        id: "order-0007",
        customer: "cust-grace",
        status: OrderStatus::Shipped,
        items: &["prod-kettle-gooseneck", "prod-filters-paper", "prod-beans-filter"],
        days_ago: 16,
    },
    OrderSeed {
        id: "order-0008",
        customer: "cust-heidi",
        status: OrderStatus::Delivered,
        items: &["prod-beans-filter", "prod-mug-ceramic"],
        days_ago: 12,
    },
    OrderSeed {
        id: "order-0009",
        customer: "cust-ivan",
        status: OrderStatus::Pending,
        items: &["prod-beans-espresso", "prod-scale-digital"],
        days_ago: 6,
    },
    OrderSeed {
        id: "order-0010",
        customer: "cust-judy",
        status: OrderStatus::Cancelled,
        items: &["prod-mug-ceramic", "prod-scale-digital"],
        days_ago: 5,
    },
    OrderSeed {
        id: "order-0011",
        customer: "cust-kevin",
        status: OrderStatus::Delivered,
        items: &["prod-beans-filter", "prod-mug-ceramic"],
        days_ago: 3,
    },
    OrderSeed {
        id: "order-0012",
        customer: "cust-laura",
        status: OrderStatus::Delivered,
        items: &["prod-beans-espresso", "prod-filters-paper"],
        days_ago: 1,
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub product_count: usize,
    pub order_count: usize,
}

/// Deterministic demo dataset: a small coffee-gear catalog plus an order
/// history whose baskets produce a non-trivial rule set at the default
/// mining thresholds. Used by `basketry seed` and by smoke tests.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub fn products() -> Vec<Product> {
        PRODUCT_SEEDS
            .iter()
            .map(|seed| Product {
                id: ProductId(seed.id.to_string()),
                sku: seed.sku.to_string(),
                name: seed.name.to_string(),
                category: Some(seed.category.to_string()),
                unit_price: Decimal::new(seed.unit_price_cents, 2),
                active: seed.active,
            })
            .collect()
    }

    pub fn orders() -> Vec<Order> {
        let now = Utc::now();

        ORDER_SEEDS
            .iter()
            .map(|seed| Order {
                id: OrderId(seed.id.to_string()),
                customer_id: CustomerId(seed.customer.to_string()),
                status: seed.status,
                lines: seed
                    .items
                    .iter()
                    .map(|item| {
                        let product = PRODUCT_SEEDS
                            .iter()
                            .find(|product| product.id == *item);
                        OrderLine {
                            product_id: ProductId((*item).to_string()),
                            name: product.map(|p| p.name.to_string()).unwrap_or_default(),
                            quantity: 1,
                            unit_price: Decimal::new(
                                product.map(|p| p.unit_price_cents).unwrap_or(0),
                                2,
                            ),
                        }
                    })
                    .collect(),
                placed_at: now - Duration::days(seed.days_ago),
            })
            .collect()
    }

    /// Load the dataset into an empty database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let products = Self::products();
        let orders = Self::orders();

        let product_repo = SqlProductRepository::new(pool.clone());
        for product in &products {
            product_repo.insert(product).await?;
        }

        let order_repo = SqlOrderRepository::new(pool.clone());
        for order in &orders {
            order_repo.insert(order).await?;
        }

        Ok(SeedResult { product_count: products.len(), order_count: orders.len() })
    }
}

#[cfg(test)]
mod tests {
    use basketry_core::config::MiningConfig;
    use basketry_core::{ItemToken, OrderSource, RecommendationService};

    use crate::repositories::{SqlOrderRepository, SqlProductRepository};
    use crate::{connect_with_settings, migrations};

    use super::DemoSeedDataset;

    async fn seeded_pool() -> crate::DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoSeedDataset::load(&pool).await.expect("load seeds");
        pool
    }

    #[tokio::test]
    async fn seeds_load_and_filter_by_status() {
        let pool = seeded_pool().await;
        let orders = SqlOrderRepository::new(pool.clone());

        assert_eq!(orders.count_orders().await.expect("count"), 12);
        // The pending and cancelled seeds never reach the miner.
        assert_eq!(orders.load_eligible_orders().await.expect("load").len(), 10);
    }

    #[tokio::test]
    async fn seeded_history_mines_a_usable_rule_set() {
        let pool = seeded_pool().await;
        let service = RecommendationService::from_config(
            SqlOrderRepository::new(pool.clone()),
            SqlProductRepository::new(pool.clone()),
            &MiningConfig {
                min_support: 0.15,
                min_confidence: 0.5,
                cache_ttl_secs: 3_600,
                min_transactions: 5,
            },
        )
        .expect("valid config");

        let summary = service.refresh_rules(false).await.expect("refresh");
        assert!(summary.rule_count > 0, "demo baskets should produce rules");
        assert_eq!(summary.transaction_count, 10);

        let recommendations = service
            .cart_recommendations(&[ItemToken::new("prod-beans-espresso")], 6)
            .await;
        assert!(
            recommendations
                .items
                .iter()
                .any(|item| item.product.id.0 == "prod-grinder-hand"),
            "espresso beans should recommend the hand grinder"
        );
    }
}
