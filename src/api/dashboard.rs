//! Catalog home page

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppResult, services::stats::CatalogCounts, AppState};

/// Home page figures plus the caller's visit count
#[derive(Serialize, ToSchema)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: CatalogCounts,
    /// Visits to this page in the current session, this one included
    pub num_visits: i64,
}

/// Catalog home page
#[utoipa::path(
    get,
    path = "/catalog/",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog counts and session visit count", body = Dashboard),
        (status = 500, description = "Store failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Dashboard>)> {
    let counts = state.services.stats.counts().await?;

    let cookie_name = state.config.session.cookie_name.clone();
    let (jar, session_id) = match jar.get(&cookie_name).map(|c| c.value().to_string()) {
        Some(id) => (jar, id),
        None => {
            let id = Uuid::new_v4().simple().to_string();
            let cookie = Cookie::build((cookie_name, id.clone()))
                .http_only(true)
                .path("/");
            (jar.add(cookie), id)
        }
    };

    let num_visits = state.services.sessions.record_visit(&session_id).await?;

    Ok((jar, Json(Dashboard { counts, num_visits })))
}
