use super::repository;
use crate::{
    modules::dish,
    types::Context,
    utils::validation,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

#[derive(Deserialize)]
struct Filters {
    dish_id: Option<String>,
    user_id: Option<String>,
}

async fn get_purchases(
    State(ctx): State<Arc<Context>>,
    Query(filters): Query<Filters>,
) -> impl IntoResponse {
    match repository::find_many(
        &ctx.db_conn.pool,
        repository::FindManyFilters {
            dish_id: filters.dish_id,
            user_id: filters.user_id,
        },
    )
    .await
    {
        Ok(purchases) => (StatusCode::OK, Json(json!(purchases))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch purchases" })),
        ),
    }
}

async fn get_purchase_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
) -> impl IntoResponse {
    match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(purchase)) => (StatusCode::OK, Json(json!(purchase))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Purchase not found" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch purchase" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
struct CreatePurchasePayload {
    #[validate(length(min = 1, code = "INVALID_DISH_ID", message = "Dish id cannot be empty"))]
    dish_id: String,
    #[validate(length(min = 1, code = "INVALID_USER_ID", message = "User id cannot be empty"))]
    user_id: String,
}

async fn create_purchase(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<CreatePurchasePayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        tracing::warn!("Failed to validate payload: {errors}");
        return validation::into_response(errors).into_response();
    }

    match dish::repository::find_by_id(&ctx.db_conn.pool, payload.dish_id.clone()).await {
        Ok(Some(_)) => (),
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Dish not found" })),
            )
                .into_response()
        }
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch dish" })),
            )
                .into_response()
        }
    }

    match repository::create(
        &ctx.db_conn.pool,
        repository::CreatePurchasePayload {
            dish_id: payload.dish_id,
            user_id: payload.user_id,
        },
    )
    .await
    {
        Ok(purchase) => (StatusCode::CREATED, Json(json!(purchase))).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Purchase creation failed" })),
        )
            .into_response(),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", get(get_purchases).post(create_purchase))
        .route("/:id", get(get_purchase_by_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_fail_validation() {
        let payload: CreatePurchasePayload = serde_json::from_value(json!({
            "dish_id": "",
            "user_id": ""
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("dish_id"));
        assert!(errors.field_errors().contains_key("user_id"));
    }

    #[test]
    fn filters_are_optional() {
        let filters: Filters = serde_json::from_value(json!({})).unwrap();
        assert!(filters.dish_id.is_none());
        assert!(filters.user_id.is_none());
    }
}
