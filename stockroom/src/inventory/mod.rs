//! Inventory item records.
//!
//! Items are the protected resource behind the authorization gate: every
//! operation is scoped to the owning user, and routes only reach this module
//! after the gate has granted access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use crate::auth::{AuthResult, UserId};

/// Inventory item owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub quantity: i32,
    pub user_id: UserId,
}

/// Payload for creating or updating an item
#[derive(Debug, Clone, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub quantity: i32,
}

/// Trait for item repository operations
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// List a user's items
    async fn list_for_user(&self, user_id: UserId) -> AuthResult<Vec<Item>>;

    /// Create an item owned by a user
    async fn create(&self, user_id: UserId, input: ItemInput) -> AuthResult<Item>;

    /// Update an item, scoped to its owner. Returns the updated item, or
    /// `None` when the item does not exist or belongs to someone else.
    async fn update(&self, user_id: UserId, item_id: i64, input: ItemInput)
    -> AuthResult<Option<Item>>;

    /// Delete an item, scoped to its owner. Returns whether a row was removed.
    async fn delete(&self, user_id: UserId, item_id: i64) -> AuthResult<bool>;
}

/// Default PostgreSQL implementation of `ItemRepository`
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_item(row: &sqlx::postgres::PgRow) -> Item {
    Item {
        id: row.get("id"),
        name: row.get("name"),
        quantity: row.get("quantity"),
        user_id: row.get("user_id"),
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    async fn list_for_user(&self, user_id: UserId) -> AuthResult<Vec<Item>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, user_id FROM items WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_item).collect())
    }

    async fn create(&self, user_id: UserId, input: ItemInput) -> AuthResult<Item> {
        let row = sqlx::query(
            "INSERT INTO items (name, quantity, user_id)
             VALUES ($1, $2, $3)
             RETURNING id, name, quantity, user_id",
        )
        .bind(&input.name)
        .bind(input.quantity)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(map_item(&row))
    }

    async fn update(
        &self,
        user_id: UserId,
        item_id: i64,
        input: ItemInput,
    ) -> AuthResult<Option<Item>> {
        let row = sqlx::query(
            "UPDATE items SET name = $3, quantity = $4
             WHERE id = $1 AND user_id = $2
             RETURNING id, name, quantity, user_id",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(&input.name)
        .bind(input.quantity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(map_item))
    }

    async fn delete(&self, user_id: UserId, item_id: i64) -> AuthResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
