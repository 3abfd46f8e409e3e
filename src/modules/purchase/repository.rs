use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use ulid::Ulid;

#[derive(Serialize, Deserialize, Clone, Debug, sqlx::FromRow)]
pub struct Purchase {
    pub id: String,
    pub dish_id: String,
    pub user_id: String,
    pub created_at: NaiveDateTime,
}

pub struct CreatePurchasePayload {
    pub dish_id: String,
    pub user_id: String,
}

pub enum Error {
    UnexpectedError,
}

pub async fn create<'e, E: PgExecutor<'e>>(
    e: E,
    payload: CreatePurchasePayload,
) -> Result<Purchase, Error> {
    match sqlx::query_as::<_, Purchase>(
        "
        INSERT INTO purchases (id, dish_id, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, dish_id, user_id, created_at
        ",
    )
    .bind(Ulid::new().to_string())
    .bind(payload.dish_id)
    .bind(payload.user_id)
    .fetch_one(e)
    .await
    {
        Ok(purchase) => Ok(purchase),
        Err(err) => {
            tracing::error!("Error occurred while trying to create a purchase: {}", err);
            Err(Error::UnexpectedError)
        }
    }
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: String) -> Result<Option<Purchase>, Error> {
    match sqlx::query_as::<_, Purchase>(
        "SELECT id, dish_id, user_id, created_at FROM purchases WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(e)
    .await
    {
        Ok(maybe_purchase) => Ok(maybe_purchase),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to fetch a purchase by id: {}",
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}

pub struct FindManyFilters {
    pub dish_id: Option<String>,
    pub user_id: Option<String>,
}

pub async fn find_many<'e, E: PgExecutor<'e>>(
    e: E,
    filters: FindManyFilters,
) -> Result<Vec<Purchase>, Error> {
    match sqlx::query_as::<_, Purchase>(
        "
        SELECT id, dish_id, user_id, created_at
        FROM purchases
        WHERE
            ($1::VARCHAR IS NULL OR dish_id = $1)
            AND ($2::VARCHAR IS NULL OR user_id = $2)
        ORDER BY created_at
        ",
    )
    .bind(filters.dish_id)
    .bind(filters.user_id)
    .fetch_all(e)
    .await
    {
        Ok(purchases) => Ok(purchases),
        Err(err) => {
            tracing::error!(
                "Error occurred while trying to fetch many purchases: {}",
                err
            );
            Err(Error::UnexpectedError)
        }
    }
}
