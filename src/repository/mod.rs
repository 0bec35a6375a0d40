//! Catalog store: the query interface the services depend on, and its implementations

pub mod authors;
pub mod books;
pub mod instances;
pub mod memory;
pub mod reference;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorForm, Book, BookForm, BookInstance, Genre, InstanceFilter, InstanceOrder,
        Language, PageRequest,
    },
};

pub use memory::MemoryStore;

/// Result of a delete that may be refused because other records reference the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    HasDependents { count: i64 },
}

/// Query interface over books, authors, instances, genres and languages.
///
/// List operations take explicit filter, order and page parameters and return the
/// page rows together with the unpaginated total.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> AppResult<()>;

    // Books
    async fn count_books(&self) -> AppResult<i64>;
    async fn list_books(&self, page: PageRequest) -> AppResult<(Vec<Book>, i64)>;
    async fn list_books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>>;
    async fn get_book(&self, id: i32) -> AppResult<Option<Book>>;
    async fn isbn_taken(&self, isbn: &str, exclude_book: Option<i32>) -> AppResult<bool>;
    async fn create_book(&self, form: &BookForm) -> AppResult<Book>;
    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Option<Book>>;
    async fn delete_book(&self, id: i32) -> AppResult<DeleteOutcome>;

    // Authors
    async fn count_authors(&self) -> AppResult<i64>;
    async fn list_authors(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)>;
    async fn get_author(&self, id: i32) -> AppResult<Option<Author>>;
    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author>;
    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Option<Author>>;
    async fn delete_author(&self, id: i32) -> AppResult<DeleteOutcome>;

    // Book instances
    async fn count_instances(&self, filter: &InstanceFilter) -> AppResult<i64>;
    /// `page = None` returns every matching row
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Option<PageRequest>,
    ) -> AppResult<(Vec<BookInstance>, i64)>;
    async fn get_instance(&self, id: Uuid) -> AppResult<Option<BookInstance>>;
    /// Returns false when the instance does not exist
    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool>;

    // Reference data
    async fn get_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>>;
    async fn get_language(&self, id: i32) -> AppResult<Option<Language>>;
}

/// PostgreSQL catalog store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub authors: authors::AuthorsRepository,
    pub instances: instances::InstancesRepository,
    pub reference: reference::ReferenceRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            instances: instances::InstancesRepository::new(pool.clone()),
            reference: reference::ReferenceRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Postgres reports a row still referenced by a foreign key as SQLSTATE 23503
pub(crate) fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23503"),
        _ => false,
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Unavailable(format!("Database unreachable: {}", e)))?;
        Ok(())
    }

    async fn count_books(&self) -> AppResult<i64> {
        self.books.count().await
    }

    async fn list_books(&self, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        self.books.list(page).await
    }

    async fn list_books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        self.books.list_by_author(author_id).await
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        self.books.get_by_id(id).await
    }

    async fn isbn_taken(&self, isbn: &str, exclude_book: Option<i32>) -> AppResult<bool> {
        self.books.isbn_exists(isbn, exclude_book).await
    }

    async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        self.books.create(form).await
    }

    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Option<Book>> {
        self.books.update(id, form).await
    }

    async fn delete_book(&self, id: i32) -> AppResult<DeleteOutcome> {
        self.books.delete(id).await
    }

    async fn count_authors(&self) -> AppResult<i64> {
        self.authors.count().await
    }

    async fn list_authors(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)> {
        self.authors.list(page).await
    }

    async fn get_author(&self, id: i32) -> AppResult<Option<Author>> {
        self.authors.get_by_id(id).await
    }

    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        self.authors.create(form).await
    }

    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Option<Author>> {
        self.authors.update(id, form).await
    }

    async fn delete_author(&self, id: i32) -> AppResult<DeleteOutcome> {
        self.authors.delete(id).await
    }

    async fn count_instances(&self, filter: &InstanceFilter) -> AppResult<i64> {
        self.instances.count(filter).await
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Option<PageRequest>,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        self.instances.list(filter, order, page).await
    }

    async fn get_instance(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        self.instances.get_by_id(id).await
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool> {
        self.instances.set_due_back(id, due_back).await
    }

    async fn get_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        self.reference.get_genres(ids).await
    }

    async fn get_language(&self, id: i32) -> AppResult<Option<Language>> {
        self.reference.get_language(id).await
    }
}
