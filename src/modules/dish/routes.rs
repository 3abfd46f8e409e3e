use super::repository::{self, DishCategory, Ingredient};
use crate::{types::Context, utils::validation};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bigdecimal::{BigDecimal, FromPrimitive};
use serde::Deserialize;
use serde_json::json;
use std::{io::Read, sync::Arc};
use tempfile::NamedTempFile;
use validator::Validate;

fn to_price(price: f64) -> BigDecimal {
    BigDecimal::from_f64(price).unwrap_or(BigDecimal::from_u8(0).unwrap())
}

async fn get_dishes(State(ctx): State<Arc<Context>>) -> impl IntoResponse {
    match repository::find_many(&ctx.db_conn.pool).await {
        Ok(dishes) => (StatusCode::OK, Json(json!(dishes))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch dishes" })),
        ),
    }
}

async fn get_dish_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
) -> impl IntoResponse {
    match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(dish)) => (StatusCode::OK, Json(json!(dish))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Dish not found" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch dish" })),
        ),
    }
}

#[derive(Deserialize)]
struct CategoryFilters {
    category: DishCategory,
}

// An unknown category never reaches the handler, the extractor rejects it
// with a 400.
async fn get_dishes_by_category(
    State(ctx): State<Arc<Context>>,
    Query(filters): Query<CategoryFilters>,
) -> impl IntoResponse {
    match repository::find_many_by_category(&ctx.db_conn.pool, filters.category).await {
        Ok(dishes) => (StatusCode::OK, Json(json!(dishes))),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch dishes" })),
        ),
    }
}

#[derive(Deserialize, Validate)]
struct CreateDishPayload {
    #[validate(length(min = 1, code = "INVALID_DISH_NAME", message = "Dish name cannot be empty"))]
    name: String,
    #[validate(range(
        min = 0.0,
        code = "INVALID_DISH_PRICE",
        message = "Dish price cannot be negative"
    ))]
    price: f64,
    category: DishCategory,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
}

async fn create_dish(
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<CreateDishPayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        tracing::warn!("Failed to validate payload: {errors}");
        return validation::into_response(errors).into_response();
    }

    match repository::create(
        &ctx.db_conn.pool,
        repository::CreateDishPayload {
            name: payload.name,
            price: to_price(payload.price),
            category: payload.category,
            ingredients: payload.ingredients,
        },
    )
    .await
    {
        Ok(dish) => (
            StatusCode::CREATED,
            [(
                header::LOCATION,
                format!("{}/api/dishes/{}", ctx.app.url, dish.id),
            )],
            Json(json!(dish)),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Dish creation failed" })),
        )
            .into_response(),
    }
}

#[derive(Deserialize, Validate)]
struct UpdateDishPayload {
    #[validate(length(min = 1, code = "INVALID_DISH_NAME", message = "Dish name cannot be empty"))]
    name: Option<String>,
    #[validate(range(
        min = 0.0,
        code = "INVALID_DISH_PRICE",
        message = "Dish price cannot be negative"
    ))]
    price: Option<f64>,
    category: Option<DishCategory>,
    ingredients: Option<Vec<Ingredient>>,
}

async fn update_dish_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    Json(payload): Json<UpdateDishPayload>,
) -> Response {
    if let Err(errors) = payload.validate() {
        tracing::warn!("Failed to validate payload: {errors}");
        return validation::into_response(errors).into_response();
    }

    match repository::update_by_id(
        &ctx.db_conn.pool,
        id,
        repository::UpdateDishPayload {
            name: payload.name,
            price: payload.price.map(to_price),
            category: payload.category,
            ingredients: payload.ingredients,
        },
    )
    .await
    {
        Ok(Some(dish)) => (StatusCode::OK, Json(json!(dish))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Dish not found" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update dish" })),
        )
            .into_response(),
    }
}

async fn delete_dish_by_id(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
) -> impl IntoResponse {
    match repository::delete_by_id(ctx.db_conn.clone(), id).await {
        Ok(Some(dish)) => (StatusCode::OK, Json(json!(dish))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Dish not found" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to delete dish" })),
        ),
    }
}

#[derive(TryFromMultipart)]
struct UploadDishImagePayload {
    #[form_data(limit = "10MiB")]
    image_file: FieldData<NamedTempFile>,
}

async fn upload_dish_image(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
    TypedMultipart(mut payload): TypedMultipart<UploadDishImagePayload>,
) -> Response {
    let dish = match repository::find_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(dish)) => dish,
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
    };

    let mut buf: Vec<u8> = vec![];

    if let Err(err) = payload.image_file.contents.read_to_end(&mut buf) {
        tracing::error!("Failed to read the uploaded file {:?}", err);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to upload image" })),
        )
            .into_response();
    }

    match repository::update_image_by_id(&ctx.db_conn.pool, dish.id.clone(), buf).await {
        Ok(_) => (
            StatusCode::CREATED,
            [(
                header::LOCATION,
                format!("{}/api/dishes/{}/image", ctx.app.url, dish.id),
            )],
            Json(json!({ "message": "Dish image uploaded" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to upload image" })),
        )
            .into_response(),
    }
}

async fn download_dish_image(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
) -> Response {
    match repository::find_image_by_id(&ctx.db_conn.pool, id).await {
        Ok(Some(image)) => {
            ([(header::CONTENT_TYPE, "image/jpeg")], image).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Dish image not found" })),
        )
            .into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to fetch dish image" })),
        )
            .into_response(),
    }
}

// Clearing an already absent image is fine, only a missing dish is an error.
async fn delete_dish_image(
    Path(id): Path<String>,
    State(ctx): State<Arc<Context>>,
) -> Response {
    match repository::find_by_id(&ctx.db_conn.pool, id.clone()).await {
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

    match repository::clear_image_by_id(&ctx.db_conn.pool, id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to delete image" })),
        )
            .into_response(),
    }
}

pub fn get_router() -> Router<Arc<Context>> {
    Router::new()
        .route("/", get(get_dishes).post(create_dish))
        .route("/category", get(get_dishes_by_category))
        .route(
            "/:id",
            get(get_dish_by_id)
                .put(update_dish_by_id)
                .delete(delete_dish_by_id),
        )
        .route(
            "/:id/image",
            get(download_dish_image)
                .post(upload_dish_image)
                .delete(delete_dish_image),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn empty_name_fails_validation() {
        let payload: CreateDishPayload = serde_json::from_value(json!({
            "name": "",
            "price": 4.0,
            "category": "Desayuno"
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn negative_price_fails_validation() {
        let payload: CreateDishPayload = serde_json::from_value(json!({
            "name": "Churros",
            "price": -1.0,
            "category": "Desayuno"
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("price"));
    }

    #[test]
    fn ingredients_default_to_empty() {
        let payload: CreateDishPayload = serde_json::from_value(json!({
            "name": "Churros",
            "price": 4.0,
            "category": "Desayuno"
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert!(payload.ingredients.is_empty());
    }

    #[test]
    fn update_payload_accepts_partial_bodies() {
        let payload: UpdateDishPayload = serde_json::from_value(json!({
            "price": 9.75
        }))
        .unwrap();

        assert!(payload.validate().is_ok());
        assert!(payload.name.is_none());
        assert!(payload.category.is_none());
        assert_eq!(payload.price, Some(9.75));
    }

    #[test]
    fn price_conversion_keeps_the_decimal_value() {
        assert_eq!(to_price(12.5), BigDecimal::from_str("12.5").unwrap());
        assert_eq!(to_price(f64::NAN), BigDecimal::from_str("0").unwrap());
    }
}
