//! Book instance (loanable copy) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use super::enums::LoanStatus;
use crate::error::AppError;

/// Internal row structure for instance queries (status as its storage code)
#[derive(Debug, Clone, FromRow)]
pub struct InstanceRow {
    id: Uuid,
    book_id: i32,
    imprint: String,
    due_back: Option<NaiveDate>,
    status: String,
    borrower_id: Option<i32>,
    #[sqlx(default)]
    book_title: Option<String>,
}

impl TryFrom<InstanceRow> for BookInstance {
    type Error = AppError;

    fn try_from(row: InstanceRow) -> Result<Self, Self::Error> {
        Ok(BookInstance {
            id: row.id,
            book_id: row.book_id,
            imprint: row.imprint,
            due_back: row.due_back,
            status: row.status.parse()?,
            borrower_id: row.borrower_id,
            book_title: row.book_title,
        })
    }
}

/// A specific copy of a book that can be borrowed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub borrower_id: Option<i32>,
    /// Title of the referenced book (populated on list queries)
    #[serde(default)]
    pub book_title: Option<String>,
}

/// Which instances a query selects; `None` fields do not filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub book_id: Option<i32>,
    pub borrower_id: Option<i32>,
    pub status: Option<LoanStatus>,
}

impl InstanceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn on_loan() -> Self {
        Self {
            status: Some(LoanStatus::OnLoan),
            ..Self::default()
        }
    }

    pub fn with_status(status: LoanStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn of_book(book_id: i32) -> Self {
        Self {
            book_id: Some(book_id),
            ..Self::default()
        }
    }

    pub fn borrowed_by(mut self, borrower_id: i32) -> Self {
        self.borrower_id = Some(borrower_id);
        self
    }

    pub fn matches(&self, instance: &BookInstance) -> bool {
        self.book_id.map_or(true, |id| instance.book_id == id)
            && self.borrower_id.map_or(true, |id| instance.borrower_id == Some(id))
            && self.status.map_or(true, |status| instance.status == status)
    }
}

/// Sort key for instance lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstanceOrder {
    /// Soonest due first, undated last
    #[default]
    DueBack,
    Imprint,
}

/// Renewal form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewBookForm {
    /// Enter a date between now and 4 weeks (default 3)
    pub renewal_date: NaiveDate,
}

impl RenewBookForm {
    /// Form pre-filled with the proposed renewal date
    pub fn proposed(today: NaiveDate, default_weeks: i64) -> Self {
        Self {
            renewal_date: today + Duration::weeks(default_weeks),
        }
    }

    /// The renewal date may be neither in the past nor more than `max_weeks` ahead
    pub fn validate_against(&self, today: NaiveDate, max_weeks: i64) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.renewal_date < today {
            errors.add(
                "renewal_date",
                ValidationError::new("renewal_in_past")
                    .with_message("Invalid date - renewal in past".into()),
            );
        } else if self.renewal_date > today + Duration::weeks(max_weeks) {
            errors.add(
                "renewal_date",
                ValidationError::new("renewal_too_far")
                    .with_message(format!("Invalid date - renewal more than {} weeks ahead", max_weeks).into()),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Renewal page: the instance being renewed and the form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalPage {
    pub instance: BookInstance,
    pub form: RenewBookForm,
}
