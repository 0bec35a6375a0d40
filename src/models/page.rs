//! Pagination request and response types

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{author::Author, book::Book, instance::BookInstance};

/// Page query parameter shared by every list endpoint
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number, starting at 1 (default: 1)
    pub page: Option<i64>,
}

/// One page of a list, as passed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        Self {
            page: page.unwrap_or(1),
            per_page: per_page.max(1),
        }
    }

    /// Rows to skip; saturates for page numbers far past the end
    pub fn offset(&self) -> i64 {
        self.page
            .saturating_sub(1)
            .max(0)
            .saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(BookPage = Page<Book>, AuthorPage = Page<Author>, InstancePage = Page<BookInstance>)]
pub struct Page<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Total number of rows across all pages
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Rows per page
    pub per_page: i64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let num_pages = num_pages(total, request.per_page);
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            num_pages,
            has_next: request.page < num_pages,
            has_previous: request.page > 1,
        }
    }
}

/// Number of pages for `total` rows; an empty list still has one (empty) page
pub fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

/// Whether `page` exists for a list of `total` rows
pub fn page_in_range(page: i64, total: i64, per_page: i64) -> bool {
    page >= 1 && page <= num_pages(total, per_page)
}
