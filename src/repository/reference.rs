//! Genre and language lookups

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Genre, Language},
};

#[derive(Clone)]
pub struct ReferenceRepository {
    pool: Pool<Postgres>,
}

impl ReferenceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Genres with the given ids, by name; unknown ids are skipped
    pub async fn get_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM catalog_genre WHERE id = ANY($1) ORDER BY name, id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    pub async fn get_language(&self, id: i32) -> AppResult<Option<Language>> {
        let language =
            sqlx::query_as::<_, Language>("SELECT id, name FROM catalog_language WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(language)
    }
}
