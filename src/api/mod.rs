//! HTTP handlers for the catalog pages and forms

pub mod authors;
pub mod books;
pub mod dashboard;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod urls;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::request::Parts,
    response::Redirect,
    routing::get,
    Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    models::{Identity, Permission},
    services::permissions::Authorizer,
    AppState,
};

/// The caller, if a valid bearer token was presented, and where to send them to log in
pub struct CurrentUser {
    identity: Option<Identity>,
    login_redirect: String,
}

impl CurrentUser {
    /// The identity, or a redirect to the login page for anonymous callers
    pub fn require_login(&self) -> AppResult<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::LoginRequired(self.login_redirect.clone()))
    }

    /// Login first, then the permission: anonymous callers are redirected, others get 403
    pub fn require(&self, authorizer: &dyn Authorizer, permission: Permission) -> AppResult<&Identity> {
        let identity = self.require_login()?;
        if !authorizer.has_perm(identity, permission) {
            return Err(AppError::Authorization(format!(
                "Permission {} required",
                permission
            )));
        }
        Ok(identity)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Internal("Failed to read authorization header".to_string()))?;

        // A bad or expired token is treated like no token at all
        let identity = bearer.and_then(|TypedHeader(auth)| {
            Identity::from_token(auth.token(), &state.config.auth.jwt_secret)
                .map_err(|e| tracing::debug!("Ignoring invalid bearer token: {}", e))
                .ok()
        });

        Ok(CurrentUser {
            identity,
            login_redirect: urls::login(
                &state.config.auth.login_url,
                parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| parts.uri.path()),
            ),
        })
    }
}

/// Unwrap a JSON form body once access checks have passed
pub(crate) fn form_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(form)| form)
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// Build the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let catalog = Router::new()
        .route("/", get(|| async { Redirect::to(urls::CATALOG_INDEX) }))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/catalog/", get(dashboard::index))
        // Books
        .route("/catalog/books", get(books::list_books))
        .route("/catalog/book/create", get(books::create_form).post(books::create_book))
        .route("/catalog/book/:id", get(books::book_detail))
        .route("/catalog/book/:id/update", get(books::update_form).post(books::update_book))
        .route("/catalog/book/:id/delete", get(books::delete_confirm).post(books::delete_book))
        .route("/catalog/book/:id/renew", get(loans::renewal_form).post(loans::renew_book))
        // Authors
        .route("/catalog/authors", get(authors::list_authors))
        .route("/catalog/author/create", get(authors::create_form).post(authors::create_author))
        .route("/catalog/author/:id", get(authors::author_detail))
        .route("/catalog/author/:id/update", get(authors::update_form).post(authors::update_author))
        .route("/catalog/author/:id/delete", get(authors::delete_confirm).post(authors::delete_author))
        // Loans
        .route("/catalog/mybooks", get(loans::my_borrowed))
        .route("/catalog/borrowed", get(loans::all_borrowed))
        .with_state(state);

    Router::new()
        .merge(catalog)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
