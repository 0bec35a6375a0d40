//! Book instances repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        instance::InstanceRow, BookInstance, InstanceFilter, InstanceOrder, PageRequest,
    },
};

/// Filter placeholders: $1 book, $2 borrower, $3 status code
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::int4 IS NULL OR bi.book_id = $1)
      AND ($2::int4 IS NULL OR bi.borrower_id = $2)
      AND ($3::text IS NULL OR bi.status = $3)
"#;

fn order_clause(order: InstanceOrder) -> &'static str {
    match order {
        InstanceOrder::DueBack => "bi.due_back ASC NULLS LAST, bi.id",
        InstanceOrder::Imprint => "bi.imprint, bi.id",
    }
}

#[derive(Clone)]
pub struct InstancesRepository {
    pool: Pool<Postgres>,
}

impl InstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self, filter: &InstanceFilter) -> AppResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM catalog_bookinstance bi {}",
            FILTER_CLAUSE
        );
        let count: i64 = sqlx::query_scalar(&query)
            .bind(filter.book_id)
            .bind(filter.borrower_id)
            .bind(filter.status.map(|s| s.code()))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Option<PageRequest>,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let total = self.count(filter).await?;

        let query = format!(
            r#"
            SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.status, bi.borrower_id,
                   b.title AS book_title
            FROM catalog_bookinstance bi
            JOIN catalog_book b ON b.id = bi.book_id
            {}
            ORDER BY {}
            LIMIT $4 OFFSET $5
            "#,
            FILTER_CLAUSE,
            order_clause(order)
        );

        // LIMIT NULL means no limit
        let rows = sqlx::query_as::<_, InstanceRow>(&query)
            .bind(filter.book_id)
            .bind(filter.borrower_id)
            .bind(filter.status.map(|s| s.code()))
            .bind(page.map(|p| p.limit()))
            .bind(page.map(|p| p.offset()).unwrap_or(0))
            .fetch_all(&self.pool)
            .await?;

        let instances = rows
            .into_iter()
            .map(BookInstance::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((instances, total))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.status, bi.borrower_id,
                   b.title AS book_title
            FROM catalog_bookinstance bi
            JOIN catalog_book b ON b.id = bi.book_id
            WHERE bi.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookInstance::try_from).transpose()
    }

    pub async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query("UPDATE catalog_bookinstance SET due_back = $1 WHERE id = $2")
            .bind(due_back)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
