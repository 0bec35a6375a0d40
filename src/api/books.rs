//! Book pages and edit forms

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Redirect,
    Json,
};

use super::{form_body, urls, CurrentUser};
use crate::{
    error::AppResult,
    models::{page::BookPage, Book, BookDetail, BookForm, Page, PageQuery, Permission},
    services::catalog::BookDeletion,
    AppState,
};

/// List books by title
#[utoipa::path(
    get,
    path = "/catalog/books",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of books", body = BookPage),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Book>>> {
    let page = state.services.catalog.list_books(query.page).await?;
    Ok(Json(page))
}

/// Book with its author, genres, language and copies
#[utoipa::path(
    get,
    path = "/catalog/book/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetail>> {
    let detail = state.services.catalog.book_detail(id).await?;
    Ok(Json(detail))
}

/// Empty book form
#[utoipa::path(
    get,
    path = "/catalog/book/create",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Empty form", body = BookForm),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn create_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<BookForm>> {
    user.require(state.services.authorizer.as_ref(), Permission::AddBook)?;
    Ok(Json(BookForm::default()))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/catalog/book/create",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 303, description = "Created; redirect to the book page"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing catalog.add_book")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<BookForm>, JsonRejection>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::AddBook)?;
    let form = form_body(payload)?;

    let book = state.services.catalog.create_book(form).await?;
    Ok(Redirect::to(&urls::book_detail(book.id)))
}

/// Book form filled with the current values
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Current values", body = BookForm),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BookForm>> {
    user.require(state.services.authorizer.as_ref(), Permission::ChangeBook)?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(BookForm::from(&book)))
}

/// Update a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = BookForm,
    responses(
        (status = 303, description = "Updated; redirect to the book page"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse),
        (status = 403, description = "Missing catalog.change_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    payload: Result<Json<BookForm>, JsonRejection>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::ChangeBook)?;
    let form = form_body(payload)?;

    let book = state.services.catalog.update_book(id, form).await?;
    Ok(Redirect::to(&urls::book_detail(book.id)))
}

/// Delete confirmation page
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "The book to delete", body = Book),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.delete_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    user.require(state.services.authorizer.as_ref(), Permission::DeleteBook)?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Delete a book; books that still have copies are kept and the caller is sent back to them
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/delete",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 303, description = "Redirect to the book list, or to the book when copies exist"),
        (status = 302, description = "Login required"),
        (status = 403, description = "Missing catalog.delete_book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> AppResult<Redirect> {
    user.require(state.services.authorizer.as_ref(), Permission::DeleteBook)?;

    match state.services.catalog.delete_book(id).await? {
        BookDeletion::Deleted => Ok(Redirect::to(urls::BOOKS)),
        BookDeletion::Blocked { .. } => Ok(Redirect::to(&urls::book_detail(id))),
    }
}
