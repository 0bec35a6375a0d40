//! Authors repository for database operations

use sqlx::{Pool, Postgres};

use super::{is_foreign_key_violation, DeleteOutcome};
use crate::{
    error::AppResult,
    models::{Author, AuthorForm, PageRequest},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_author")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// List authors ordered by last name, then first name
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)> {
        let total = self.count().await?;

        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT id, first_name, last_name, date_of_birth, date_of_death
            FROM catalog_author
            ORDER BY last_name, first_name, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((authors, total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name, date_of_birth, date_of_death FROM catalog_author WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    pub async fn create(&self, form: &AuthorForm) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO catalog_author (first_name, last_name, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4)
            RETURNING id, first_name, last_name, date_of_birth, date_of_death
            "#,
        )
        .bind(&form.first_name)
        .bind(&form.last_name)
        .bind(form.date_of_birth)
        .bind(form.date_of_death)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    pub async fn update(&self, id: i32, form: &AuthorForm) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            UPDATE catalog_author
            SET first_name = $1, last_name = $2, date_of_birth = $3, date_of_death = $4
            WHERE id = $5
            RETURNING id, first_name, last_name, date_of_birth, date_of_death
            "#,
        )
        .bind(&form.first_name)
        .bind(&form.last_name)
        .bind(form.date_of_birth)
        .bind(form.date_of_death)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    /// Delete an author unless books still reference them
    pub async fn delete(&self, id: i32) -> AppResult<DeleteOutcome> {
        let dependents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_book WHERE author_id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if dependents > 0 {
            return Ok(DeleteOutcome::HasDependents { count: dependents });
        }

        match sqlx::query("DELETE FROM catalog_author WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(result) if result.rows_affected() == 0 => Ok(DeleteOutcome::NotFound),
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(e) if is_foreign_key_violation(&e) => {
                Ok(DeleteOutcome::HasDependents { count: 1 })
            }
            Err(e) => Err(e.into()),
        }
    }
}
