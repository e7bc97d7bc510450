//! SurrealDB implementation of [`TokenRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::token::{CreateToken, Token};
use keel_core::new_id;
use keel_core::repository::TokenRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::delete_record;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TokenRow {
    record_id: String,
    user_id: String,
    name: String,
    token_hash: String,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Token {
            id: row.record_id,
            user_id: row.user_id,
            name: row.name,
            token_hash: row.token_hash,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct SurrealTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TokenRepository for SurrealTokenRepository<C> {
    async fn create(&self, input: CreateToken) -> KeelResult<Token> {
        let id = new_id();
        let result = self
            .db
            .query(
                "CREATE type::record('token', $id) SET \
                 user_id = $user_id, name = $name, token_hash = $token_hash; \
                 SELECT meta::id(id) AS record_id, * FROM type::record('token', $id);",
            )
            .bind(("id", id.clone()))
            .bind(("user_id", input.user_id))
            .bind(("name", input.name))
            .bind(("token_hash", input.token_hash))
            .await
            .map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<TokenRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "token".into(),
            id,
        })?;
        Ok(row.into())
    }

    async fn find_by_user(&self, user_id: &str) -> KeelResult<Vec<Token>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM token \
                 WHERE user_id = $user_id ORDER BY created_at ASC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TokenRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(Token::from).collect())
    }

    async fn delete(&self, id: &str) -> KeelResult<()> {
        Ok(delete_record(&self.db, "token", id).await?)
    }
}
