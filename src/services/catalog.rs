//! Books and authors: listing, detail pages and editing

use std::sync::Arc;

use validator::{Validate, ValidationError, ValidationErrors};

use super::checked_page;
use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorDetail, AuthorForm, Book, BookDetail, BookForm, InstanceFilter,
        InstanceOrder, Page, PageRequest,
    },
    repository::{CatalogStore, DeleteOutcome},
};

/// What happened to a book delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookDeletion {
    Deleted,
    /// Copies still reference the book; nothing was changed
    Blocked { copies: i64 },
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    page_size: i64,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, page_size: i64) -> Self {
        Self { store, page_size }
    }

    // ---- Books ----

    pub async fn list_books(&self, page: Option<i64>) -> AppResult<Page<Book>> {
        let request = PageRequest::new(page, self.page_size);
        let (books, total) = self.store.list_books(request).await?;
        checked_page(books, total, request)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// The book with its author, genres, language and copies resolved
    pub async fn book_detail(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.get_book(id).await?;

        let author = match book.author_id {
            Some(author_id) => self.store.get_author(author_id).await?,
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => self.store.get_language(language_id).await?,
            None => None,
        };
        let genres = self.store.get_genres(&book.genre_ids).await?;
        let (copies, _) = self
            .store
            .list_instances(&InstanceFilter::of_book(id), InstanceOrder::Imprint, None)
            .await?;

        Ok(BookDetail {
            book,
            author,
            genres,
            language,
            copies,
        })
    }

    pub async fn create_book(&self, form: BookForm) -> AppResult<Book> {
        self.validate_book(&form, None).await?;
        let book = self.store.create_book(&form).await?;
        tracing::info!("Created book {} ({})", book.id, book.title);
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, form: BookForm) -> AppResult<Book> {
        // 404 takes precedence over form errors
        self.get_book(id).await?;
        self.validate_book(&form, Some(id)).await?;

        let book = self
            .store
            .update_book(id, &form)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        tracing::info!("Updated book {}", id);
        Ok(book)
    }

    /// Delete a book unless copies of it exist
    pub async fn delete_book(&self, id: i32) -> AppResult<BookDeletion> {
        self.get_book(id).await?;

        let copies = self
            .store
            .count_instances(&InstanceFilter::of_book(id))
            .await?;
        if copies > 0 {
            tracing::info!("Book {} kept: {} copies still reference it", id, copies);
            return Ok(BookDeletion::Blocked { copies });
        }

        match self.store.delete_book(id).await? {
            DeleteOutcome::Deleted => {
                tracing::info!("Deleted book {}", id);
                Ok(BookDeletion::Deleted)
            }
            DeleteOutcome::HasDependents { count } => {
                tracing::info!("Book {} kept: {} copies still reference it", id, count);
                Ok(BookDeletion::Blocked { copies: count })
            }
            DeleteOutcome::NotFound => {
                Err(AppError::NotFound(format!("Book with id {} not found", id)))
            }
        }
    }

    /// Field checks plus the ones that need the store: references exist and the ISBN is free
    async fn validate_book(&self, form: &BookForm, book_id: Option<i32>) -> AppResult<()> {
        let mut errors = match form.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        match form.author {
            None => errors.add(
                "author",
                ValidationError::new("required").with_message("Select an author".into()),
            ),
            Some(author_id) => {
                if self.store.get_author(author_id).await?.is_none() {
                    errors.add("author", unknown_choice(author_id));
                }
            }
        }

        if let Some(language_id) = form.language {
            if self.store.get_language(language_id).await?.is_none() {
                errors.add("language", unknown_choice(language_id));
            }
        }

        let wanted = form.normalized_genres();
        let found = self.store.get_genres(&wanted).await?;
        if let Some(missing) = wanted.iter().find(|id| !found.iter().any(|g| g.id == **id)) {
            errors.add("genres", unknown_choice(*missing));
        }

        if !form.isbn.is_empty() && self.store.isbn_taken(&form.isbn, book_id).await? {
            errors.add(
                "isbn",
                ValidationError::new("unique")
                    .with_message("Book with this ISBN already exists.".into()),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Form(errors))
        }
    }

    // ---- Authors ----

    pub async fn list_authors(&self, page: Option<i64>) -> AppResult<Page<Author>> {
        let request = PageRequest::new(page, self.page_size);
        let (authors, total) = self.store.list_authors(request).await?;
        checked_page(authors, total, request)
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.store
            .get_author(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn author_detail(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.get_author(id).await?;
        let books = self.store.list_books_by_author(id).await?;
        Ok(AuthorDetail { author, books })
    }

    pub async fn create_author(&self, form: AuthorForm) -> AppResult<Author> {
        form.validate().map_err(AppError::Form)?;
        let author = self.store.create_author(&form).await?;
        tracing::info!("Created author {} ({})", author.id, author.display_name());
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, form: AuthorForm) -> AppResult<Author> {
        self.get_author(id).await?;
        form.validate().map_err(AppError::Form)?;

        let author = self
            .store
            .update_author(id, &form)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        tracing::info!("Updated author {}", id);
        Ok(author)
    }

    /// Delete an author; refused with a conflict while any book references them
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        match self.store.delete_author(id).await {
            Ok(DeleteOutcome::Deleted) => {
                tracing::info!("Deleted author {}", id);
                Ok(())
            }
            Ok(DeleteOutcome::HasDependents { count }) => {
                tracing::warn!("Refused to delete author {}: {} books reference them", id, count);
                Err(AppError::Conflict(format!(
                    "Author {} is referenced by {} book(s); delete or reassign them first",
                    id, count
                )))
            }
            Ok(DeleteOutcome::NotFound) => {
                Err(AppError::NotFound(format!("Author with id {} not found", id)))
            }
            Err(e) => {
                tracing::error!("Failed to delete author {}: {}", id, e);
                Err(e)
            }
        }
    }
}

fn unknown_choice(id: i32) -> ValidationError {
    ValidationError::new("invalid_choice").with_message(
        format!("Select a valid choice. {} is not one of the available choices.", id).into(),
    )
}
