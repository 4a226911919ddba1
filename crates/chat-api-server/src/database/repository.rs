use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use super::models::{ArchivedTurn, ArchivedTurnRow, NewArchivedTurn};
use super::DbPool;
use crate::models::chat::{MemberId, ProductId};
use crate::utils::error::ChatError;

/// Durable archive of finished conversations (`query_history`).
///
/// Rows for a (member, product) pair always mirror the conversation as it was
/// at the most recent archival: writers go through [`HistoryStore::replace`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Delete every archived turn of the pair, then insert `turns` in order.
    /// Both happen in one transaction.
    async fn replace(
        &self,
        member_id: MemberId,
        product_id: ProductId,
        turns: &[NewArchivedTurn],
    ) -> Result<(), ChatError>;

    /// Returns the number of archived turns removed
    async fn delete_by_member_and_product(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<u64, ChatError>;

    /// Archived turns of the pair, oldest first
    async fn find_by_member_and_product(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<Vec<ArchivedTurn>, ChatError>;

    /// Distinct products with archived turns, most recently archived first
    async fn recent_products(&self, member_id: MemberId) -> Result<Vec<ProductId>, ChatError>;
}

/// Existence checks against the member and product tables owned by the
/// identity and catalog services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn member_exists(&self, member_id: MemberId) -> Result<bool, ChatError>;
    async fn product_exists(&self, product_id: ProductId) -> Result<bool, ChatError>;
}

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_turns(rows: Vec<ArchivedTurnRow>) -> Result<Vec<ArchivedTurn>, ChatError> {
    rows.into_iter().map(ArchivedTurn::try_from).collect()
}

#[async_trait]
impl HistoryStore for Repository {
    async fn replace(
        &self,
        member_id: MemberId,
        product_id: ProductId,
        turns: &[NewArchivedTurn],
    ) -> Result<(), ChatError> {
        let mut tx = self.pool.get_pool().begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM query_history WHERE member_id = $1 AND product_id = $2",
        )
        .bind(member_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if !turns.is_empty() {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO query_history (member_id, product_id, role, content) ");
            builder.push_values(turns, |mut row, turn| {
                row.push_bind(member_id)
                    .push_bind(product_id)
                    .push_bind(turn.role.as_db_str())
                    .push_bind(turn.content.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(
            member_id,
            product_id,
            deleted,
            inserted = turns.len(),
            "Replaced archived conversation"
        );
        Ok(())
    }

    async fn delete_by_member_and_product(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<u64, ChatError> {
        let result = sqlx::query(
            "DELETE FROM query_history WHERE member_id = $1 AND product_id = $2",
        )
        .bind(member_id)
        .bind(product_id)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_member_and_product(
        &self,
        member_id: MemberId,
        product_id: ProductId,
    ) -> Result<Vec<ArchivedTurn>, ChatError> {
        let rows = sqlx::query_as::<_, ArchivedTurnRow>(
            r#"SELECT
                history_id,
                member_id,
                product_id,
                role,
                content,
                created_at
               FROM query_history
               WHERE member_id = $1 AND product_id = $2
               ORDER BY history_id ASC"#,
        )
        .bind(member_id)
        .bind(product_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        into_turns(rows)
    }

    async fn recent_products(&self, member_id: MemberId) -> Result<Vec<ProductId>, ChatError> {
        let products = sqlx::query_scalar::<_, ProductId>(
            r#"SELECT product_id
               FROM query_history
               WHERE member_id = $1
               GROUP BY product_id
               ORDER BY MAX(history_id) DESC"#,
        )
        .bind(member_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(products)
    }
}

#[async_trait]
impl MemberDirectory for Repository {
    async fn member_exists(&self, member_id: MemberId) -> Result<bool, ChatError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM member WHERE member_id = $1)",
        )
        .bind(member_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(exists)
    }

    async fn product_exists(&self, product_id: ProductId) -> Result<bool, ChatError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(exists)
    }
}
