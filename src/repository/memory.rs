//! In-process catalog store, used by tests and when no database is configured

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, DeleteOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorForm, Book, BookForm, BookInstance, Genre, InstanceFilter, InstanceOrder,
        Language, LoanStatus, PageRequest,
    },
};

#[derive(Default)]
struct MemoryData {
    books: BTreeMap<i32, Book>,
    authors: BTreeMap<i32, Author>,
    instances: HashMap<Uuid, BookInstance>,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    next_book_id: i32,
    next_author_id: i32,
    next_genre_id: i32,
    next_language_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn paginate<T>(rows: Vec<T>, page: Option<PageRequest>) -> Vec<T> {
    match page {
        Some(page) => rows
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect(),
        None => rows,
    }
}

pub struct MemoryStore {
    data: RwLock<MemoryData>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(MemoryData::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: every operation fails with `AppError::Unavailable` while unset
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::Unavailable("in-memory store is offline".to_string()))
        }
    }

    pub async fn add_genre(&self, name: &str) -> Genre {
        let mut data = self.data.write().await;
        let genre = Genre {
            id: next_id(&mut data.next_genre_id),
            name: name.to_string(),
        };
        data.genres.insert(genre.id, genre.clone());
        genre
    }

    pub async fn add_language(&self, name: &str) -> Language {
        let mut data = self.data.write().await;
        let language = Language {
            id: next_id(&mut data.next_language_id),
            name: name.to_string(),
        };
        data.languages.insert(language.id, language.clone());
        language
    }

    /// Add a copy of an existing book
    pub async fn add_instance(
        &self,
        book_id: i32,
        imprint: &str,
        status: LoanStatus,
        due_back: Option<NaiveDate>,
        borrower_id: Option<i32>,
    ) -> AppResult<BookInstance> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        let instance = BookInstance {
            id: Uuid::new_v4(),
            book_id,
            imprint: imprint.to_string(),
            due_back,
            status,
            borrower_id,
            book_title: None,
        };
        data.instances.insert(instance.id, instance.clone());
        Ok(instance)
    }

    fn with_title(data: &MemoryData, mut instance: BookInstance) -> BookInstance {
        instance.book_title = data.books.get(&instance.book_id).map(|b| b.title.clone());
        instance
    }

    fn book_from_form(id: i32, form: &BookForm) -> Book {
        Book {
            id,
            title: form.title.clone(),
            author_id: form.author,
            summary: form.summary.clone(),
            isbn: form.isbn.clone(),
            genre_ids: form.normalized_genres(),
            language_id: form.language,
        }
    }

    fn author_from_form(id: i32, form: &AuthorForm) -> Author {
        Author {
            id,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth: form.date_of_birth,
            date_of_death: form.date_of_death,
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        self.check()
    }

    async fn count_books(&self) -> AppResult<i64> {
        self.check()?;
        Ok(self.data.read().await.books.len() as i64)
    }

    async fn list_books(&self, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        self.check()?;
        let data = self.data.read().await;
        let mut books: Vec<Book> = data.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        let total = books.len() as i64;
        Ok((paginate(books, Some(page)), total))
    }

    async fn list_books_by_author(&self, author_id: i32) -> AppResult<Vec<Book>> {
        self.check()?;
        let data = self.data.read().await;
        let mut books: Vec<Book> = data
            .books
            .values()
            .filter(|b| b.author_id == Some(author_id))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        self.check()?;
        Ok(self.data.read().await.books.get(&id).cloned())
    }

    async fn isbn_taken(&self, isbn: &str, exclude_book: Option<i32>) -> AppResult<bool> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data
            .books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_book))
    }

    async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        self.check()?;
        let mut data = self.data.write().await;
        let id = next_id(&mut data.next_book_id);
        let book = Self::book_from_form(id, form);
        data.books.insert(id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Option<Book>> {
        self.check()?;
        let mut data = self.data.write().await;
        match data.books.get_mut(&id) {
            Some(book) => {
                *book = Self::book_from_form(id, form);
                Ok(Some(book.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_book(&self, id: i32) -> AppResult<DeleteOutcome> {
        self.check()?;
        let mut data = self.data.write().await;
        if !data.books.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let dependents = data.instances.values().filter(|i| i.book_id == id).count() as i64;
        if dependents > 0 {
            return Ok(DeleteOutcome::HasDependents { count: dependents });
        }
        data.books.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn count_authors(&self) -> AppResult<i64> {
        self.check()?;
        Ok(self.data.read().await.authors.len() as i64)
    }

    async fn list_authors(&self, page: PageRequest) -> AppResult<(Vec<Author>, i64)> {
        self.check()?;
        let data = self.data.read().await;
        let mut authors: Vec<Author> = data.authors.values().cloned().collect();
        authors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then(a.id.cmp(&b.id))
        });
        let total = authors.len() as i64;
        Ok((paginate(authors, Some(page)), total))
    }

    async fn get_author(&self, id: i32) -> AppResult<Option<Author>> {
        self.check()?;
        Ok(self.data.read().await.authors.get(&id).cloned())
    }

    async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        self.check()?;
        let mut data = self.data.write().await;
        let id = next_id(&mut data.next_author_id);
        let author = Self::author_from_form(id, form);
        data.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Option<Author>> {
        self.check()?;
        let mut data = self.data.write().await;
        match data.authors.get_mut(&id) {
            Some(author) => {
                *author = Self::author_from_form(id, form);
                Ok(Some(author.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_author(&self, id: i32) -> AppResult<DeleteOutcome> {
        self.check()?;
        let mut data = self.data.write().await;
        if !data.authors.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let dependents = data
            .books
            .values()
            .filter(|b| b.author_id == Some(id))
            .count() as i64;
        if dependents > 0 {
            return Ok(DeleteOutcome::HasDependents { count: dependents });
        }
        data.authors.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn count_instances(&self, filter: &InstanceFilter) -> AppResult<i64> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data.instances.values().filter(|i| filter.matches(i)).count() as i64)
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        order: InstanceOrder,
        page: Option<PageRequest>,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        self.check()?;
        let data = self.data.read().await;
        let mut rows: Vec<BookInstance> = data
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .map(|i| Self::with_title(&data, i))
            .collect();

        match order {
            InstanceOrder::DueBack => rows.sort_by(|a, b| {
                (a.due_back.is_none(), a.due_back, a.id).cmp(&(b.due_back.is_none(), b.due_back, b.id))
            }),
            InstanceOrder::Imprint => {
                rows.sort_by(|a, b| a.imprint.cmp(&b.imprint).then(a.id.cmp(&b.id)))
            }
        }

        let total = rows.len() as i64;
        Ok((paginate(rows, page), total))
    }

    async fn get_instance(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        self.check()?;
        let data = self.data.read().await;
        Ok(data
            .instances
            .get(&id)
            .cloned()
            .map(|i| Self::with_title(&data, i)))
    }

    async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<bool> {
        self.check()?;
        let mut data = self.data.write().await;
        match data.instances.get_mut(&id) {
            Some(instance) => {
                instance.due_back = Some(due_back);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        self.check()?;
        let data = self.data.read().await;
        let mut genres: Vec<Genre> = ids
            .iter()
            .filter_map(|id| data.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        genres.dedup();
        Ok(genres)
    }

    async fn get_language(&self, id: i32) -> AppResult<Option<Language>> {
        self.check()?;
        Ok(self.data.read().await.languages.get(&id).cloned())
    }
}
