//! Catalog-wide counts shown on the dashboard

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{InstanceFilter, LoanStatus},
    repository::CatalogStore,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    /// Copies with status exactly `available`
    pub num_instances_available: i64,
    pub num_authors: i64,
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn CatalogStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub async fn counts(&self) -> AppResult<CatalogCounts> {
        Ok(CatalogCounts {
            num_books: self.store.count_books().await?,
            num_instances: self.store.count_instances(&InstanceFilter::all()).await?,
            num_instances_available: self
                .store
                .count_instances(&InstanceFilter::with_status(LoanStatus::Available))
                .await?,
            num_authors: self.store.count_authors().await?,
        })
    }
}
