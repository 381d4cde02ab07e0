//! Seams to the surrounding commerce system. The engine consumes a
//! read-only order stream and, for presentation only, a token-to-catalog
//! lookup; everything else about checkout and catalog CRUD stays outside.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::order::Order;
use crate::domain::product::{CustomerId, Product};
use crate::errors::ApplicationError;
use crate::mining::ItemToken;

/// Read-only stream of orders for basket mining.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders whose fulfillment status contributes to mining, with line
    /// items attached.
    async fn load_eligible_orders(&self) -> Result<Vec<Order>, ApplicationError>;

    /// Mining-eligible orders for one customer.
    async fn load_for_customer(&self, customer: &CustomerId)
        -> Result<Vec<Order>, ApplicationError>;

    /// Total order count regardless of status.
    async fn count_orders(&self) -> Result<u64, ApplicationError>;
}

/// Maps an item token back to a catalog entity for presentation.
#[async_trait]
pub trait ProductResolver: Send + Sync {
    /// `None` when the token matches no active catalog entry; the caller
    /// drops the token from its result rather than failing the request.
    async fn resolve(&self, token: &ItemToken) -> Result<Option<Product>, ApplicationError>;
}

#[async_trait]
impl<T: OrderSource + ?Sized> OrderSource for Arc<T> {
    async fn load_eligible_orders(&self) -> Result<Vec<Order>, ApplicationError> {
        (**self).load_eligible_orders().await
    }

    async fn load_for_customer(
        &self,
        customer: &CustomerId,
    ) -> Result<Vec<Order>, ApplicationError> {
        (**self).load_for_customer(customer).await
    }

    async fn count_orders(&self) -> Result<u64, ApplicationError> {
        (**self).count_orders().await
    }
}

#[async_trait]
impl<T: ProductResolver + ?Sized> ProductResolver for Arc<T> {
    async fn resolve(&self, token: &ItemToken) -> Result<Option<Product>, ApplicationError> {
        (**self).resolve(token).await
    }
}
