//! Author pages and edit forms

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Redirect,
    Json,
};

use super::{form_body, urls, CurrentUser};
use crate::{
    error::AppResult,
    models::{page::AuthorPage, Author, AuthorDetail, AuthorForm, Page, PageQuery, Permission},
    AppState,
};

/// List authors by last name, then first name
#[utoipa::path(
    get,
    path = "/catalog/authors",
    tag = "authors",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of authors", body = AuthorPage),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Author>>> {
    let page = state.services.catalog.list_authors(query.page).await?;
    Ok(Json(page))
}

/// Author with the books they wrote
#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "authors",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn author_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetail>> {
    let detail = state.services.catalog.author_detail(id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/catalog/author/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Empty form", body = AuthorForm),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn create_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<AuthorForm>> {
    user.require(state.services.authorizer.as_ref(), Permission::AddAuthor)?;
    Ok(Json(AuthorForm::default()))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/catalog/author/create",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Created; redirect to the author page"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing catalog.add_author")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<AuthorForm>, JsonRejection>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::AddAuthor)?;
    let form = form_body(payload)?;

    let author = state.services.catalog.create_author(form).await?;
    Ok(Redirect::to(&urls::author_detail(author.id)))
}

#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Current values", body = AuthorForm),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorForm>> {
    user.require(state.services.authorizer.as_ref(), Permission::ChangeAuthor)?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(AuthorForm::from(&author)))
}

/// Update an author
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorForm,
    responses(
        (status = 303, description = "Updated; redirect to the author page"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing catalog.change_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    payload: Result<Json<AuthorForm>, JsonRejection>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::ChangeAuthor)?;
    let form = form_body(payload)?;

    let author = state.services.catalog.update_author(id, form).await?;
    Ok(Redirect::to(&urls::author_detail(author.id)))
}

#[utoipa::path(
    get,
    path = "/catalog/author/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "The author to delete", body = Author),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.delete_author"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    user.require(state.services.authorizer.as_ref(), Permission::DeleteAuthor)?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Delete an author who no longer has books
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/delete",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 303, description = "Deleted; redirect to the author list"),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.delete_author"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Books still reference the author", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::DeleteAuthor)?;

    state.services.catalog.delete_author(id).await?;
    Ok(Redirect::to(urls::AUTHORS))
}
