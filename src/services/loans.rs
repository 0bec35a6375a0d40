//! Borrowed copies and due-date renewal

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::checked_page;
use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::{
        BookInstance, InstanceFilter, InstanceOrder, Page, PageRequest, RenewBookForm,
        RenewalPage,
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn CatalogStore>,
    config: CatalogConfig,
}

impl LoansService {
    pub fn new(store: Arc<dyn CatalogStore>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    /// Copies on loan to one borrower, soonest due first
    pub async fn borrowed_by(&self, borrower_id: i32, page: Option<i64>) -> AppResult<Page<BookInstance>> {
        self.on_loan(InstanceFilter::on_loan().borrowed_by(borrower_id), page)
            .await
    }

    /// Every copy on loan, soonest due first
    pub async fn all_borrowed(&self, page: Option<i64>) -> AppResult<Page<BookInstance>> {
        self.on_loan(InstanceFilter::on_loan(), page).await
    }

    async fn on_loan(&self, filter: InstanceFilter, page: Option<i64>) -> AppResult<Page<BookInstance>> {
        let request = PageRequest::new(page, self.config.page_size);
        let (rows, total) = self
            .store
            .list_instances(&filter, InstanceOrder::DueBack, Some(request))
            .await?;
        checked_page(rows, total, request)
    }

    async fn get_instance(&self, id: Uuid) -> AppResult<BookInstance> {
        self.store
            .get_instance(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    /// The renewal form for a copy, proposing a date a few weeks from `today`
    pub async fn renewal_form(&self, id: Uuid, today: NaiveDate) -> AppResult<RenewalPage> {
        let instance = self.get_instance(id).await?;
        Ok(RenewalPage {
            instance,
            form: RenewBookForm::proposed(today, self.config.renewal_default_weeks),
        })
    }

    /// Set a new due date; the copy is left untouched when the date is rejected
    pub async fn renew(&self, id: Uuid, form: RenewBookForm, today: NaiveDate) -> AppResult<BookInstance> {
        let mut instance = self.get_instance(id).await?;

        form.validate_against(today, self.config.renewal_max_weeks)
            .map_err(AppError::Form)?;

        if !self.store.set_due_back(id, form.renewal_date).await? {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }

        tracing::info!("Renewed book instance {} until {}", id, form.renewal_date);
        instance.due_back = Some(form.renewal_date);
        Ok(instance)
    }
}
