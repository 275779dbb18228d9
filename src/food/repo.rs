use std::collections::HashMap;

use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::vision::FoodEstimate;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub calorie_target: Option<f64>,
    pub protein_target: Option<f64>,
    pub carb_target: Option<f64>,
    pub fat_target: Option<f64>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodItemRow {
    pub id: Uuid,
    pub image_id: Uuid,
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub fat: f64,
    pub protein: f64,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Fetch by the identity provider's subject, if they ever saved anything.
    pub async fn find_by_external_id(
        db: &PgPool,
        external_id: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, calorie_target, protein_target, carb_target,
                   fat_target, created_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert-or-fetch keyed on the provider subject.
    pub async fn upsert_by_external_id(db: &PgPool, external_id: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id)
            VALUES ($1)
            ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
            RETURNING id, external_id, calorie_target, protein_target, carb_target,
                      fat_target, created_at
            "#,
        )
        .bind(external_id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store the four daily targets, creating the user row if needed.
    pub async fn upsert_targets(
        db: &PgPool,
        external_id: &str,
        calories: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, calorie_target, protein_target, carb_target, fat_target)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE SET
                calorie_target = EXCLUDED.calorie_target,
                protein_target = EXCLUDED.protein_target,
                carb_target = EXCLUDED.carb_target,
                fat_target = EXCLUDED.fat_target
            RETURNING id, external_id, calorie_target, protein_target, carb_target,
                      fat_target, created_at
            "#,
        )
        .bind(external_id)
        .bind(calories)
        .bind(protein)
        .bind(carbs)
        .bind(fat)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

/// Create one capture and its items in a single transaction. Returns the
/// capture id, its timestamp and the stored rows.
pub async fn insert_capture(
    db: &PgPool,
    user_id: Uuid,
    image_url: Option<&str>,
    ai_raw: &serde_json::Value,
    items: &[FoodEstimate],
) -> anyhow::Result<(Uuid, OffsetDateTime, Vec<FoodItemRow>)> {
    let mut tx = db.begin().await.context("begin tx")?;

    let (image_id, created_at): (Uuid, OffsetDateTime) = sqlx::query_as(
        r#"
        INSERT INTO images (user_id, image_url, ai_raw)
        VALUES ($1, $2, $3)
        RETURNING id, created_at
        "#,
    )
    .bind(user_id)
    .bind(image_url)
    .bind(ai_raw)
    .fetch_one(&mut *tx)
    .await
    .context("insert image")?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query_as::<_, FoodItemRow>(
            r#"
            INSERT INTO food_items (image_id, name, calories, carbs, fat, protein)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, image_id, name, calories, carbs, fat, protein, created_at
            "#,
        )
        .bind(image_id)
        .bind(&item.name)
        .bind(item.calories)
        .bind(item.carbs)
        .bind(item.fat)
        .bind(item.protein)
        .fetch_one(&mut *tx)
        .await
        .context("insert food item")?;
        rows.push(row);
    }

    tx.commit().await.context("commit tx")?;
    Ok((image_id, created_at, rows))
}

/// Captures for a user, newest first; items newest first within each.
pub async fn list_captures_with_items(
    db: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<(Uuid, Vec<FoodItemRow>)>> {
    let image_ids: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT id
        FROM images
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let rows = sqlx::query_as::<_, FoodItemRow>(
        r#"
        SELECT fi.id, fi.image_id, fi.name, fi.calories, fi.carbs, fi.fat,
               fi.protein, fi.created_at
        FROM food_items fi
        JOIN images i ON i.id = fi.image_id
        WHERE i.user_id = $1
        ORDER BY fi.created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let mut by_image: HashMap<Uuid, Vec<FoodItemRow>> = HashMap::new();
    for row in rows {
        by_image.entry(row.image_id).or_default().push(row);
    }

    Ok(image_ids
        .into_iter()
        .map(|(id,)| (id, by_image.remove(&id).unwrap_or_default()))
        .collect())
}

/// Apply a macro correction to one item the caller owns. Returns the updated
/// row, or `None` when the item does not exist or belongs to someone else.
pub async fn update_item_macros(
    db: &PgPool,
    external_id: &str,
    item_id: Uuid,
    calories: f64,
    carbs: f64,
    fat: f64,
    protein: f64,
) -> anyhow::Result<Option<FoodItemRow>> {
    let row = sqlx::query_as::<_, FoodItemRow>(
        r#"
        UPDATE food_items
        SET calories = $3, carbs = $4, fat = $5, protein = $6
        FROM images i, users u
        WHERE food_items.id = $1
          AND food_items.image_id = i.id
          AND i.user_id = u.id
          AND u.external_id = $2
        RETURNING food_items.id, food_items.image_id, food_items.name,
                  food_items.calories, food_items.carbs, food_items.fat,
                  food_items.protein, food_items.created_at
        "#,
    )
    .bind(item_id)
    .bind(external_id)
    .bind(calories)
    .bind(carbs)
    .bind(fat)
    .bind(protein)
    .fetch_optional(db)
    .await?;
    Ok(row)
}
