//! Books repository for database operations

use sqlx::{Pool, Postgres, Transaction};

use super::{is_foreign_key_violation, DeleteOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookForm, PageRequest},
};

/// Book columns plus the sorted genre ids aggregated from the junction table
const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.summary, b.isbn, b.language_id,
           COALESCE(
               array_agg(bg.genre_id ORDER BY bg.genre_id) FILTER (WHERE bg.genre_id IS NOT NULL),
               '{}'
           )::int4[] AS genre_ids
    FROM catalog_book b
    LEFT JOIN catalog_book_genre bg ON bg.book_id = b.id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_book")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// List books ordered by title
    pub async fn list(&self, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let total = self.count().await?;

        let query = format!(
            "{} GROUP BY b.id ORDER BY b.title, b.id LIMIT $1 OFFSET $2",
            BOOK_SELECT
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((books, total))
    }

    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        let query = format!(
            "{} WHERE b.author_id = $1 GROUP BY b.id ORDER BY b.title, b.id",
            BOOK_SELECT
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let query = format!("{} WHERE b.id = $1 GROUP BY b.id", BOOK_SELECT);
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Whether another book already uses this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM catalog_book WHERE isbn = $1 AND ($2::int4 IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn create(&self, form: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO catalog_book (title, author_id, summary, isbn, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&form.title)
        .bind(form.author)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(form.language)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_genres(&mut tx, id, &form.normalized_genres()).await?;
        tx.commit().await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", id)))
    }

    pub async fn update(&self, id: i32, form: &BookForm) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE catalog_book
            SET title = $1, author_id = $2, summary = $3, isbn = $4, language_id = $5
            WHERE id = $6
            "#,
        )
        .bind(&form.title)
        .bind(form.author)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(form.language)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::replace_genres(&mut tx, id, &form.normalized_genres()).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Delete a book unless instances still reference it
    pub async fn delete(&self, id: i32) -> AppResult<DeleteOutcome> {
        let mut tx = self.pool.begin().await?;

        let dependents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_bookinstance WHERE book_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if dependents > 0 {
            return Ok(DeleteOutcome::HasDependents { count: dependents });
        }

        sqlx::query("DELETE FROM catalog_book_genre WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = match sqlx::query("DELETE FROM catalog_book WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(result) => result,
            // an instance was added between the count and the delete
            Err(e) if is_foreign_key_violation(&e) => {
                return Ok(DeleteOutcome::HasDependents { count: 1 });
            }
            Err(e) => return Err(e.into()),
        };

        if result.rows_affected() == 0 {
            return Ok(DeleteOutcome::NotFound);
        }

        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn replace_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
        genre_ids: &[i32],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM catalog_book_genre WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            "INSERT INTO catalog_book_genre (book_id, genre_id) SELECT $1, UNNEST($2::int4[])",
        )
        .bind(book_id)
        .bind(genre_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
