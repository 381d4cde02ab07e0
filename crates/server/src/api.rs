//! HTTP surface for the recommendation engine.
//!
//! Query endpoints never answer 5xx because of mining internals: thin data
//! comes back as 200 with an empty list and an explanatory message. Only
//! the explicit refresh and diagnostic endpoints surface failures.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use basketry_core::recommend::{
    DEFAULT_BOUGHT_TOGETHER_LIMIT, DEFAULT_CART_LIMIT, DEFAULT_PERSONALIZED_LIMIT,
    DEFAULT_TRENDING_LIMIT,
};
use basketry_core::{ApplicationError, CustomerId, InterfaceError, ItemToken};

use crate::bootstrap::Service;

/// Largest result size a caller may request.
const MAX_LIMIT: usize = 50;

pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/recommendations/cart", get(cart))
        .route("/recommendations/personalized/{customer_id}", get(personalized))
        .route(
            "/recommendations/frequently-bought-together/{token}",
            get(frequently_bought_together),
        )
        .route("/recommendations/trending", get(trending))
        .route("/recommendations/refresh", post(refresh))
        .route("/recommendations/rules", get(rules))
        .route("/recommendations/analytics", get(analytics))
        .with_state(service)
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    service: Arc<Service>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.api.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "recommendation api started"
    );

    Ok(tokio::spawn(async move {
        if let Err(serve_error) = axum::serve(listener, router(service))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
        {
            error!(
                event_name = "system.api.error",
                correlation_id = "bootstrap",
                error = %serve_error,
                "recommendation api terminated unexpectedly"
            );
        }
    }))
}

#[derive(Debug, Deserialize)]
struct CartQuery {
    #[serde(default)]
    tokens: String,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RefreshRequest {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    correlation_id: String,
}

async fn cart(State(service): State<Arc<Service>>, Query(query): Query<CartQuery>) -> Response {
    let tokens = parse_tokens(&query.tokens);
    let limit = clamp_limit(query.limit, DEFAULT_CART_LIMIT);

    let result = service.cart_recommendations(&tokens, limit).await;
    (StatusCode::OK, Json(result)).into_response()
}

async fn personalized(
    State(service): State<Arc<Service>>,
    Path(customer_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = clamp_limit(query.limit, DEFAULT_PERSONALIZED_LIMIT);

    let result =
        service.personalized_recommendations(&CustomerId(customer_id), limit).await;
    (StatusCode::OK, Json(result)).into_response()
}

async fn frequently_bought_together(
    State(service): State<Arc<Service>>,
    Path(token): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let focal = ItemToken::new(&token);
    let limit = clamp_limit(query.limit, DEFAULT_BOUGHT_TOGETHER_LIMIT);

    // Unknown focal products 404 up front; an empty co-purchase list for a
    // known product is a 200 with a message.
    match service.resolve_product(&focal).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    message: "product not found".to_string(),
                    correlation_id: new_correlation_id(),
                }),
            )
                .into_response();
        }
        Err(resolve_error) => return error_response(resolve_error),
    }

    let result = service.frequently_bought_together(&focal, limit).await;
    (StatusCode::OK, Json(result)).into_response()
}

async fn trending(
    State(service): State<Arc<Service>>,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = clamp_limit(query.limit, DEFAULT_TRENDING_LIMIT);

    let result = service.trending_combinations(limit).await;
    (StatusCode::OK, Json(result)).into_response()
}

async fn refresh(State(service): State<Arc<Service>>, body: Bytes) -> Response {
    let request: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(parse_error) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorBody {
                        message: format!("invalid refresh request: {parse_error}"),
                        correlation_id: new_correlation_id(),
                    }),
                )
                    .into_response();
            }
        }
    };

    match service.refresh_rules(request.force).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(refresh_error) => error_response(refresh_error),
    }
}

async fn rules(State(service): State<Arc<Service>>) -> Response {
    match service.debug_ruleset().await {
        Ok(rules) => (StatusCode::OK, Json(rules)).into_response(),
        Err(rules_error) => error_response(rules_error),
    }
}

async fn analytics(State(service): State<Arc<Service>>) -> Response {
    match service.analytics().await {
        Ok(analytics) => (StatusCode::OK, Json(analytics)).into_response(),
        Err(analytics_error) => error_response(analytics_error),
    }
}

fn parse_tokens(raw: &str) -> Vec<ItemToken> {
    raw.split(',')
        .map(ItemToken::new)
        .filter(|token| !token.is_empty())
        .collect()
}

fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_LIMIT)
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn error_response(operation_error: ApplicationError) -> Response {
    let correlation_id = new_correlation_id();
    error!(
        event_name = "api.operation_failed",
        correlation_id = %correlation_id,
        error = %operation_error,
        "recommendation operation failed"
    );

    let interface = operation_error.into_interface(correlation_id.clone());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorBody { message: interface.user_message().to_string(), correlation_id }),
    )
        .into_response()
}
