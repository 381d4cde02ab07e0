use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use basketry_core::domain::order::{Order, OrderId, OrderLine, OrderStatus, ALL_STATUSES};
use basketry_core::domain::product::{CustomerId, ProductId};
use basketry_core::{ApplicationError, OrderSource};

use super::RepositoryError;
use crate::DbPool;

#[derive(Clone)]
pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, placed_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&order.id.0)
        .bind(&order.customer_id.0)
        .bind(order.status.as_str())
        .bind(order.placed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, product_id, name, quantity, unit_price)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&order.id.0)
            .bind(&line.product_id.0)
            .bind(&line.name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_orders(&self, customer: Option<&CustomerId>) -> Result<Vec<Order>, RepositoryError> {
        let base = format!(
            "SELECT o.id, o.customer_id, o.status, o.placed_at,
                    l.product_id, l.name, l.quantity, l.unit_price
             FROM orders o
             JOIN order_lines l ON l.order_id = o.id
             WHERE o.status IN ({statuses}){customer_clause}
             ORDER BY o.placed_at, o.id",
            statuses = eligible_status_sql(),
            customer_clause = if customer.is_some() { " AND o.customer_id = ?1" } else { "" },
        );

        let mut query = sqlx::query(&base);
        if let Some(customer) = customer {
            query = query.bind(&customer.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let mut orders: Vec<Order> = Vec::new();

        for row in rows {
            let order_id: String = row.try_get("id")?;
            let line = OrderLine {
                product_id: ProductId(row.try_get("product_id")?),
                name: row.try_get("name")?,
                quantity: decode_quantity(row.try_get::<i64, _>("quantity")?)?,
                unit_price: decode_decimal(&row.try_get::<String, _>("unit_price")?)?,
            };

            match orders.last_mut() {
                Some(order) if order.id.0 == order_id => order.lines.push(line),
                _ => orders.push(Order {
                    id: OrderId(order_id),
                    customer_id: CustomerId(row.try_get("customer_id")?),
                    status: decode_status(&row.try_get::<String, _>("status")?)?,
                    lines: vec![line],
                    placed_at: decode_timestamp(&row.try_get::<String, _>("placed_at")?)?,
                }),
            }
        }

        Ok(orders)
    }
}

#[async_trait]
impl OrderSource for SqlOrderRepository {
    async fn load_eligible_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.load_orders(None).await?)
    }

    async fn load_for_customer(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<Order>, ApplicationError> {
        Ok(self.load_orders(Some(customer)).await?)
    }

    async fn count_orders(&self) -> Result<u64, ApplicationError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::Database)?;
        Ok(count as u64)
    }
}

/// SQL fragment listing the statuses that contribute to mining, derived
/// from the domain predicate so the filter cannot drift from it.
fn eligible_status_sql() -> String {
    ALL_STATUSES
        .iter()
        .filter(|status| status.contributes_to_mining())
        .map(|status| format!("'{}'", status.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn decode_status(raw: &str) -> Result<OrderStatus, RepositoryError> {
    raw.parse().map_err(|_| RepositoryError::Decode(format!("unknown order status `{raw}`")))
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

fn decode_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|error| RepositoryError::Decode(format!("bad decimal `{raw}`: {error}")))
}

fn decode_quantity(raw: i64) -> Result<u32, RepositoryError> {
    u32::try_from(raw)
        .map_err(|_| RepositoryError::Decode(format!("quantity `{raw}` out of range")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use basketry_core::domain::order::{Order, OrderId, OrderLine, OrderStatus, ALL_STATUSES};
    use basketry_core::domain::product::{CustomerId, ProductId};
    use basketry_core::OrderSource;

    use crate::{connect_with_settings, migrations};

    use super::{eligible_status_sql, SqlOrderRepository};

    async fn repository() -> SqlOrderRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlOrderRepository::new(pool)
    }

    fn order(id: &str, customer: &str, status: OrderStatus, items: &[&str]) -> Order {
        Order {
            id: OrderId(id.to_string()),
            customer_id: CustomerId(customer.to_string()),
            status,
            lines: items
                .iter()
                .map(|item| OrderLine {
                    product_id: ProductId((*item).to_string()),
                    name: format!("Product {item}"),
                    quantity: 2,
                    unit_price: Decimal::new(1250, 2),
                })
                .collect(),
            placed_at: Utc::now(),
        }
    }

    #[test]
    fn status_filter_matches_the_domain_predicate() {
        let clause = eligible_status_sql();
        for status in ALL_STATUSES {
            let quoted = format!("'{}'", status.as_str());
            assert_eq!(
                clause.contains(&quoted),
                status.contributes_to_mining(),
                "status {quoted} filter disagrees with the domain predicate"
            );
        }
    }

    #[tokio::test]
    async fn round_trips_orders_with_their_lines() {
        let repo = repository().await;
        let stored = order("o-1", "alice", OrderStatus::Delivered, &["espresso", "grinder"]);
        repo.insert(&stored).await.expect("insert order");

        let loaded = repo.load_eligible_orders().await.expect("load orders");

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, stored.id);
        assert_eq!(loaded[0].lines.len(), 2);
        assert_eq!(loaded[0].lines[0].unit_price, Decimal::new(1250, 2));
    }

    #[tokio::test]
    async fn excludes_pending_and_cancelled_orders() {
        let repo = repository().await;
        repo.insert(&order("o-1", "alice", OrderStatus::Delivered, &["a", "b"]))
            .await
            .expect("insert");
        repo.insert(&order("o-2", "bob", OrderStatus::Pending, &["a", "c"]))
            .await
            .expect("insert");
        repo.insert(&order("o-3", "carol", OrderStatus::Cancelled, &["b", "c"]))
            .await
            .expect("insert");
        repo.insert(&order("o-4", "dave", OrderStatus::Shipped, &["a", "c"]))
            .await
            .expect("insert");

        let loaded = repo.load_eligible_orders().await.expect("load orders");

        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|order| order.status.contributes_to_mining()));
    }

    #[tokio::test]
    async fn filters_history_by_customer() {
        let repo = repository().await;
        repo.insert(&order("o-1", "alice", OrderStatus::Delivered, &["a", "b"]))
            .await
            .expect("insert");
        repo.insert(&order("o-2", "bob", OrderStatus::Delivered, &["a", "c"]))
            .await
            .expect("insert");

        let history = repo
            .load_for_customer(&CustomerId("alice".to_string()))
            .await
            .expect("load history");

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].customer_id, CustomerId("alice".to_string()));
    }

    #[tokio::test]
    async fn counts_orders_regardless_of_status() {
        let repo = repository().await;
        repo.insert(&order("o-1", "alice", OrderStatus::Delivered, &["a", "b"]))
            .await
            .expect("insert");
        repo.insert(&order("o-2", "bob", OrderStatus::Cancelled, &["a", "c"]))
            .await
            .expect("insert");

        assert_eq!(repo.count_orders().await.expect("count"), 2);
    }
}
