use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use basketry_core::domain::product::{Product, ProductId};
use basketry_core::mining::ItemToken;
use basketry_core::{ApplicationError, ProductResolver};

use super::RepositoryError;
use crate::DbPool;

#[derive(Clone)]
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (id, sku, name, category, unit_price, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&product.id.0)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.unit_price.to_string())
        .bind(product.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, sku, name, category, unit_price, active FROM products WHERE id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_product).transpose()
    }

    async fn find_active_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, sku, name, category, unit_price, active
             FROM products WHERE name = ?1 AND active = 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_product).transpose()
    }
}

#[async_trait]
impl ProductResolver for SqlProductRepository {
    /// Tokens carry a catalog id in the common case and a display name when
    /// the original order line had no product reference, so the lookup tries
    /// both, id first. Inactive products resolve to nothing.
    async fn resolve(&self, token: &ItemToken) -> Result<Option<Product>, ApplicationError> {
        if let Some(product) = self.find_by_id(&ProductId(token.as_str().to_string())).await? {
            return Ok(product.active.then_some(product));
        }

        Ok(self.find_active_by_name(token.as_str()).await?)
    }
}

fn decode_product(row: sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let unit_price_raw: String = row.try_get("unit_price")?;
    let unit_price = Decimal::from_str(&unit_price_raw).map_err(|error| {
        RepositoryError::Decode(format!("bad decimal `{unit_price_raw}`: {error}"))
    })?;

    Ok(Product {
        id: ProductId(row.try_get("id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit_price,
        active: row.try_get("active")?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use basketry_core::domain::product::{Product, ProductId};
    use basketry_core::mining::ItemToken;
    use basketry_core::ProductResolver;

    use crate::{connect_with_settings, migrations};

    use super::SqlProductRepository;

    async fn repository() -> SqlProductRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        SqlProductRepository::new(pool)
    }

    fn product(id: &str, name: &str, active: bool) -> Product {
        Product {
            id: ProductId(id.to_string()),
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            category: Some("coffee".to_string()),
            unit_price: Decimal::new(2450, 2),
            active,
        }
    }

    #[tokio::test]
    async fn resolves_tokens_by_catalog_id() {
        let repo = repository().await;
        repo.insert(&product("prod-1", "Espresso Beans", true)).await.expect("insert");

        let resolved = repo.resolve(&ItemToken::new("prod-1")).await.expect("resolve");

        assert_eq!(resolved.map(|p| p.name), Some("Espresso Beans".to_string()));
    }

    #[tokio::test]
    async fn falls_back_to_exact_active_name_match() {
        let repo = repository().await;
        repo.insert(&product("prod-1", "Espresso Beans", true)).await.expect("insert");

        let resolved = repo.resolve(&ItemToken::new("Espresso Beans")).await.expect("resolve");

        assert_eq!(resolved.map(|p| p.id), Some(ProductId("prod-1".to_string())));
    }

    #[tokio::test]
    async fn inactive_products_do_not_resolve() {
        let repo = repository().await;
        repo.insert(&product("prod-1", "Espresso Beans", false)).await.expect("insert");

        assert_eq!(repo.resolve(&ItemToken::new("prod-1")).await.expect("resolve"), None);
        assert_eq!(
            repo.resolve(&ItemToken::new("Espresso Beans")).await.expect("resolve"),
            None
        );
    }

    #[tokio::test]
    async fn unknown_tokens_resolve_to_nothing() {
        let repo = repository().await;
        assert_eq!(repo.resolve(&ItemToken::new("ghost")).await.expect("resolve"), None);
    }
}
