use std::collections::HashMap;

use tokio::sync::RwLock;

use async_trait::async_trait;

use basketry_core::domain::order::Order;
use basketry_core::domain::product::{CustomerId, Product};
use basketry_core::mining::ItemToken;
use basketry_core::{ApplicationError, OrderSource, ProductResolver};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl InMemoryOrderRepository {
    pub async fn save(&self, order: Order) {
        self.orders.write().await.push(order);
    }

    pub async fn save_all(&self, orders: impl IntoIterator<Item = Order>) {
        self.orders.write().await.extend(orders);
    }
}

#[async_trait]
impl OrderSource for InMemoryOrderRepository {
    async fn load_eligible_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().filter(|order| order.status.contributes_to_mining()).cloned().collect())
    }

    async fn load_for_customer(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<Order>, ApplicationError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().filter(|order| order.customer_id == *customer).cloned().collect())
    }

    async fn count_orders(&self) -> Result<u64, ApplicationError> {
        Ok(self.orders.read().await.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub async fn save(&self, product: Product) {
        self.products.write().await.insert(product.id.0.clone(), product);
    }
}

#[async_trait]
impl ProductResolver for InMemoryProductRepository {
    async fn resolve(&self, token: &ItemToken) -> Result<Option<Product>, ApplicationError> {
        let products = self.products.read().await;

        if let Some(product) = products.get(token.as_str()) {
            return Ok(product.active.then(|| product.clone()));
        }

        Ok(products
            .values()
            .find(|product| product.active && product.name == token.as_str())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use basketry_core::domain::order::{Order, OrderId, OrderLine, OrderStatus};
    use basketry_core::domain::product::{CustomerId, Product, ProductId};
    use basketry_core::mining::ItemToken;
    use basketry_core::{OrderSource, ProductResolver};

    use super::{InMemoryOrderRepository, InMemoryProductRepository};

    #[tokio::test]
    async fn in_memory_order_repo_filters_eligible_orders() {
        let repo = InMemoryOrderRepository::default();
        repo.save(order("o-1", OrderStatus::Delivered)).await;
        repo.save(order("o-2", OrderStatus::Pending)).await;

        let eligible = repo.load_eligible_orders().await.expect("load orders");

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, OrderId("o-1".to_string()));
        assert_eq!(repo.count_orders().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn in_memory_product_repo_resolves_by_id_and_name() {
        let repo = InMemoryProductRepository::default();
        repo.save(product("prod-1", "Espresso Beans", true)).await;
        repo.save(product("prod-2", "Hand Grinder", false)).await;

        let by_id = repo.resolve(&ItemToken::new("prod-1")).await.expect("resolve");
        assert!(by_id.is_some());

        let by_name = repo.resolve(&ItemToken::new("Espresso Beans")).await.expect("resolve");
        assert_eq!(by_name.map(|p| p.id), Some(ProductId("prod-1".to_string())));

        let inactive = repo.resolve(&ItemToken::new("prod-2")).await.expect("resolve");
        assert!(inactive.is_none());
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId(id.to_string()),
            customer_id: CustomerId("cust-1".to_string()),
            status,
            lines: vec![
                line("a"),
                line("b"),
            ],
            placed_at: Utc::now(),
        }
    }

    fn line(product_id: &str) -> OrderLine {
        OrderLine {
            product_id: ProductId(product_id.to_string()),
            name: format!("Product {product_id}"),
            quantity: 1,
            unit_price: Decimal::new(999, 2),
        }
    }

    fn product(id: &str, name: &str, active: bool) -> Product {
        Product {
            id: ProductId(id.to_string()),
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            category: None,
            unit_price: Decimal::new(999, 2),
            active,
        }
    }
}
