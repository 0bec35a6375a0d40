//! Borrowed-book lists and due-date renewal

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Redirect,
    Json,
};
use chrono::{Local, NaiveDate};
use uuid::Uuid;

use super::{form_body, urls, CurrentUser};
use crate::{
    error::AppResult,
    models::{
        page::InstancePage, BookInstance, Page, PageQuery, Permission, RenewBookForm, RenewalPage,
    },
    AppState,
};

/// Renewal dates are checked against the server's local calendar
fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Copies on loan to the caller
#[utoipa::path(
    get,
    path = "/catalog/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's loans, soonest due first", body = InstancePage),
        (status = 302, description = "Login required"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BookInstance>>> {
    let identity = user.require_login()?;

    let page = state
        .services
        .loans
        .borrowed_by(identity.user_id, query.page)
        .await?;
    Ok(Json(page))
}

/// Every copy on loan (librarians)
#[utoipa::path(
    get,
    path = "/catalog/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All loans, soonest due first", body = InstancePage),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BookInstance>>> {
    user.require(state.services.authorizer.as_ref(), Permission::CanMarkReturned)?;

    let page = state.services.loans.all_borrowed(query.page).await?;
    Ok(Json(page))
}

/// Renewal form with the proposed due date
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Copy and proposed renewal date", body = RenewalPage),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalPage>> {
    user.require(state.services.authorizer.as_ref(), Permission::CanMarkReturned)?;

    let page = state.services.loans.renewal_form(id, today()).await?;
    Ok(Json(page))
}

/// Set a new due date for a copy
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = RenewBookForm,
    responses(
        (status = 303, description = "Renewed; redirect to all borrowed books"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Date in the past or too far ahead", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<RenewBookForm>, JsonRejection>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::CanMarkReturned)?;
    let form = form_body(payload)?;

    state.services.loans.renew(id, form, today()).await?;
    Ok(Redirect::to(urls::BORROWED))
}
