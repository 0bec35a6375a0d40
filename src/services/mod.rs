//! Business logic services

pub mod catalog;
pub mod loans;
pub mod permissions;
pub mod sessions;
pub mod stats;

use std::sync::Arc;

use crate::{
    config::CatalogConfig,
    error::{AppError, AppResult},
    models::{page::page_in_range, Page, PageRequest},
    repository::CatalogStore,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub stats: stats::StatsService,
    pub sessions: sessions::SessionService,
    pub authorizer: Arc<dyn permissions::Authorizer>,
    pub store: Arc<dyn CatalogStore>,
}

impl Services {
    /// Create all services over one catalog store
    pub fn new(
        store: Arc<dyn CatalogStore>,
        sessions: Arc<dyn sessions::SessionStore>,
        authorizer: Arc<dyn permissions::Authorizer>,
        config: &CatalogConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone(), config.page_size),
            loans: loans::LoansService::new(store.clone(), config.clone()),
            stats: stats::StatsService::new(store.clone()),
            sessions: sessions::SessionService::new(sessions),
            authorizer,
            store,
        }
    }
}

/// Wrap a fetched page, or 404 when the requested page lies outside the list
pub(crate) fn checked_page<T>(items: Vec<T>, total: i64, request: PageRequest) -> AppResult<Page<T>> {
    if !page_in_range(request.page, total, request.per_page) {
        return Err(AppError::NotFound(format!("Invalid page ({})", request.page)));
    }
    Ok(Page::new(items, total, request))
}
