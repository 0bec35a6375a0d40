//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{
    author::Author,
    instance::BookInstance,
    reference::{Genre, Language},
};

/// Full book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    pub isbn: String,
    /// Genre ids, ascending
    pub genre_ids: Vec<i32>,
    pub language_id: Option<i32>,
}

/// Book detail page: the book with its references resolved and its copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub author: Option<Author>,
    pub genres: Vec<Genre>,
    pub language: Option<Language>,
    pub copies: Vec<BookInstance>,
}

/// Create / update book form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    /// Author id; required on the form even though storage allows null
    pub author: Option<i32>,
    #[validate(length(min = 1, max = 1000, message = "Summary is required (max 1000 characters)"))]
    pub summary: String,
    #[validate(length(min = 1, max = 13, message = "ISBN is required (13 characters)"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Select at least one genre"))]
    pub genres: Vec<i32>,
    pub language: Option<i32>,
}

impl BookForm {
    /// Genre ids sorted and deduplicated, as stored
    pub fn normalized_genres(&self) -> Vec<i32> {
        let mut ids = self.genres.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genres: book.genre_ids.clone(),
            language: book.language_id,
        }
    }
}
