use crate::utils::database::DatabaseConnection;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::{BigDecimal, Json};
use sqlx::PgExecutor;
use ulid::Ulid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, sqlx::Type)]
#[sqlx(type_name = "dish_category")]
pub enum DishCategory {
    Desayuno,
    Comida,
    Cena,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Ingredient {
    pub name: String,
}

// The image bytes stay out of this struct; they are only ever fetched
// through find_image_by_id.
#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub price: BigDecimal,
    pub category: DishCategory,
    pub ingredients: Json<Vec<Ingredient>>,
    #[serde(rename = "image")]
    pub has_image: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct CreateDishPayload {
    pub name: String,
    pub price: BigDecimal,
    pub category: DishCategory,
    pub ingredients: Vec<Ingredient>,
}

pub enum Error {
    UnexpectedError,
}

const DISH_COLUMNS: &str = "id, name, price, category, ingredients, has_image, created_at, updated_at";

pub async fn create<'e, E: PgExecutor<'e>>(e: E, payload: CreateDishPayload) -> Result<Dish, Error> {
    match sqlx::query_as::<_, Dish>(&format!(
        "
        INSERT INTO dishes (id, name, price, category, ingredients, has_image)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        RETURNING {}
        ",
        DISH_COLUMNS
    ))
    .bind(Ulid::new().to_string())
    .bind(payload.name)
    .bind(payload.price)
    .bind(payload.category)
    .bind(Json(payload.ingredients))
    .fetch_one(e)
    .await
    {
        Ok(dish) => Ok(dish),
        Err(err) => {
            tracing::error!("Error occurred while trying to create a dish: {}", err);
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Dish>, Error> {
    match sqlx::query_as::<_, Dish>(&format!(
        "SELECT {} FROM dishes WHERE id = $1",
        DISH_COLUMNS
    ))
    .bind(id)
    .fetch_optional(e)
    .await
    {
        Ok(maybe_dish) => Ok(maybe_dish),
        Err(err) => {
            tracing::error!("Error occurred while trying to fetch a dish by id: {}", err);
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn find_many<'e, E: PgExecutor<'e>>(e: E) -> Result<Vec<Dish>, Error> {
    match sqlx::query_as::<_, Dish>(&format!(
        "SELECT {} FROM dishes ORDER BY created_at",
        DISH_COLUMNS
    ))
    .fetch_all(e)
    .await
    {
        Ok(dishes) => Ok(dishes),
        Err(err) => {
            tracing::error!("Error occurred while trying to fetch many dishes: {}", err);
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn find_many_by_category<'e, E: PgExecutor<'e>>(
    e: E,
    category: DishCategory,
) -> Result<Vec<Dish>, Error> {
    match sqlx::query_as::<_, Dish>(&format!(
        "SELECT {} FROM dishes WHERE category = $1 ORDER BY created_at",
        DISH_COLUMNS
    ))
    .bind(category)
    .fetch_all(e)
    .await
    {
        Ok(dishes) => Ok(dishes),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to fetch dishes by category: {}",
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}

pub struct UpdateDishPayload {
    pub name: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<DishCategory>,
    pub ingredients: Option<Vec<Ingredient>>,
}

pub async fn update_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    payload: UpdateDishPayload,
) -> Result<Option<Dish>, Error> {
    match sqlx::query_as::<_, Dish>(&format!(
        "
        UPDATE dishes SET
            name = COALESCE($1, name),
            price = COALESCE($2, price),
            category = COALESCE($3, category),
            ingredients = COALESCE($4, ingredients),
            updated_at = NOW()
        WHERE
            id = $5
        RETURNING {}
        ",
        DISH_COLUMNS
    ))
    .bind(payload.name)
    .bind(payload.price)
    .bind(payload.category)
    .bind(payload.ingredients.map(Json))
    .bind(id.clone())
    .fetch_optional(e)
    .await
    {
        Ok(maybe_dish) => Ok(maybe_dish),
        Err(e) => {
            log::error!(
                "Error occurred while trying to update a dish by id {}: {}",
                id,
                e
            );
            Err(Error::UnexpectedError)
        }
    }
}

// Purchases reference dishes, so both go in one transaction.
pub async fn delete_by_id(db: DatabaseConnection, id: String) -> Result<Option<Dish>, Error> {
    match db.pool.begin().await {
        Ok(mut tx) => {
            let purchases_result = sqlx::query("DELETE FROM purchases WHERE dish_id = $1")
                .bind(id.clone())
                .execute(&mut *tx)
                .await;

            let dish_result = sqlx::query_as::<_, Dish>(&format!(
                "DELETE FROM dishes WHERE id = $1 RETURNING {}",
                DISH_COLUMNS
            ))
            .bind(id.clone())
            .fetch_optional(&mut *tx)
            .await;

            match (purchases_result, dish_result) {
                (Ok(_), Ok(maybe_dish)) => {
                    if let Err(e) = tx.commit().await {
                        tracing::error!("Failed to commit transaction: {}", e);
                        return Err(Error::UnexpectedError);
                    }
                    Ok(maybe_dish)
                }
                _ => {
                    if let Err(e) = tx.rollback().await {
                        tracing::error!("Failed to rollback transaction: {}", e);
                    }
                    log::error!("Error occurred while trying to delete a dish by id {}", id);
                    Err(Error::UnexpectedError)
                }
            }
        }
        Err(err) => {
            tracing::error!("Failed to begin transaction: {}", err);
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn update_image_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
    image: Vec<u8>,
) -> Result<(), Error> {
    match sqlx::query(
        "
        UPDATE dishes SET
            image = $1,
            has_image = TRUE,
            updated_at = NOW()
        WHERE
            id = $2
        ",
    )
    .bind(image)
    .bind(id.clone())
    .execute(e)
    .await
    {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to store the image of dish {}: {}",
                id,
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn clear_image_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<(), Error> {
    match sqlx::query(
        "
        UPDATE dishes SET
            image = NULL,
            has_image = FALSE,
            updated_at = NOW()
        WHERE
            id = $1
        ",
    )
    .bind(id.clone())
    .execute(e)
    .await
    {
        Ok(_) => Ok(()),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to clear the image of dish {}: {}",
                id,
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}

// None both when the dish is missing and when it has no image yet.
pub async fn find_image_by_id<'e, E: PgExecutor<'e>>(
    e: E,
    id: String,
) -> Result<Option<Vec<u8>>, Error> {
    match sqlx::query_scalar::<_, Option<Vec<u8>>>("SELECT image FROM dishes WHERE id = $1")
        .bind(id)
        .fetch_optional(e)
        .await
    {
        Ok(maybe_image) => Ok(maybe_image.flatten()),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to fetch the image of a dish: {}",
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::FromPrimitive;

    #[test]
    fn category_uses_the_original_capitalized_names() {
        let category: DishCategory = serde_json::from_str("\"Desayuno\"").unwrap();
        assert_eq!(category, DishCategory::Desayuno);

        assert!(serde_json::from_str::<DishCategory>("\"desayuno\"").is_err());
        assert!(serde_json::from_str::<DishCategory>("\"Brunch\"").is_err());
    }

    #[test]
    fn dish_serializes_has_image_as_image_and_never_exposes_bytes() {
        let dish = Dish {
            id: Ulid::new().to_string(),
            name: String::from("Tortilla"),
            price: BigDecimal::from_f64(12.5).unwrap(),
            category: DishCategory::Comida,
            ingredients: Json(vec![Ingredient {
                name: String::from("Huevo"),
            }]),
            has_image: false,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: None,
        };

        let json = serde_json::to_value(&dish).unwrap();

        assert_eq!(json["image"], serde_json::json!(false));
        assert!(json.get("has_image").is_none());
        assert_eq!(json["ingredients"][0]["name"], "Huevo");
        assert_eq!(json["category"], "Comida");
    }
}
