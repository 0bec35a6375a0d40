//! API integration tests
//!
//! Drive the full router against the in-memory catalog store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use chrono::{Duration, Local, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;

use locallibrary_server::{
    api,
    config::AppConfig,
    models::{AuthorForm, BookForm, Identity, LoanStatus, Permission},
    repository::{CatalogStore, MemoryStore},
    services::{
        permissions::{Authorizer, ClaimsAuthorizer},
        sessions::MemorySessionStore,
        Services,
    },
    AppState,
};

mockall::mock! {
    pub Authz {}
    impl Authorizer for Authz {
        fn has_perm(&self, identity: &Identity, permission: Permission) -> bool;
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    config: AppConfig,
}

fn test_app() -> TestApp {
    test_app_with(Arc::new(ClaimsAuthorizer))
}

fn test_app_with(authorizer: Arc<dyn Authorizer>) -> TestApp {
    let config = AppConfig::default();
    let store = Arc::new(MemoryStore::new());
    let services = Services::new(
        store.clone(),
        Arc::new(MemorySessionStore::new(config.session.ttl_seconds)),
        authorizer,
        &config.catalog,
    );
    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
    };
    TestApp {
        router: api::router(state),
        store,
        config,
    }
}

impl TestApp {
    fn token(&self, user_id: i32, permissions: &[Permission]) -> String {
        let now = chrono::Utc::now().timestamp();
        Identity {
            sub: user_id.to_string(),
            user_id,
            username: format!("user{}", user_id),
            permissions: permissions.iter().map(|p| p.as_str().to_string()).collect(),
            is_superuser: false,
            exp: now + 3600,
            iat: now,
        }
        .create_token(&self.config.auth.jwt_secret)
        .expect("Failed to sign token")
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed")
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn author(&self, first: &str, last: &str) -> i32 {
        self.store
            .create_author(&AuthorForm {
                first_name: first.into(),
                last_name: last.into(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn book(&self, title: &str, isbn: &str, author: Option<i32>) -> i32 {
        self.store
            .create_book(&BookForm {
                title: title.into(),
                author,
                summary: "summary".into(),
                isbn: isbn.into(),
                genres: vec![1],
                language: None,
            })
            .await
            .unwrap()
            .id
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to parse response")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("No Location header")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ---- Health & home ----

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_store_outage() {
    let app = test_app();
    assert_eq!(app.get("/ready", None).await.status(), StatusCode::OK);

    app.store.set_available(false);
    let response = app.get("/ready", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["code"], "store_unavailable");
}

#[tokio::test]
async fn test_root_redirects_to_catalog() {
    let app = test_app();
    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/");
}

#[tokio::test]
async fn test_dashboard_counts_and_visits() {
    let app = test_app();
    app.author("Octavia", "Butler").await;
    let book = app.book("Kindred", "9780807083697", None).await;
    app.store
        .add_instance(book, "Beacon", LoanStatus::Available, None, None)
        .await
        .unwrap();
    app.store
        .add_instance(book, "Beacon", LoanStatus::OnLoan, Some(date(2024, 3, 1)), Some(1))
        .await
        .unwrap();

    let first = app.get("/catalog/", None).await;
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = first
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("No session cookie")
        .to_string();
    assert!(cookie.starts_with("sessionid="));

    let body = json_body(first).await;
    assert_eq!(body["num_books"], 1);
    assert_eq!(body["num_instances"], 2);
    assert_eq!(body["num_instances_available"], 1);
    assert_eq!(body["num_authors"], 1);
    assert_eq!(body["num_visits"], 1);

    for expected in 2..=4 {
        let request = Request::builder()
            .uri("/catalog/")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = json_body(app.send(request).await).await;
        assert_eq!(body["num_visits"], expected);
    }

    // A new visitor starts over
    let body = json_body(app.get("/catalog/", None).await).await;
    assert_eq!(body["num_visits"], 1);
}

#[tokio::test]
async fn test_dashboard_store_failure_is_server_error() {
    let app = test_app();
    app.store.set_available(false);
    let response = app.get("/catalog/", None).await;
    assert!(response.status().is_server_error());
}

// ---- Lists & details ----

#[tokio::test]
async fn test_book_list_pagination() {
    let app = test_app();

    let empty = app.get("/catalog/books", None).await;
    assert_eq!(empty.status(), StatusCode::OK);
    assert_eq!(json_body(empty).await["total"], 0);

    for i in 0..12 {
        app.book(&format!("Title {:02}", i), &i.to_string(), None).await;
    }

    let body = json_body(app.get("/catalog/books?page=2", None).await).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["title"], "Title 10");
    assert_eq!(body["num_pages"], 2);
    assert_eq!(body["has_next"], false);
    assert_eq!(body["has_previous"], true);

    let past_end = app.get("/catalog/books?page=3", None).await;
    assert_eq!(past_end.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_extreme_page_numbers_are_not_found() {
    let app = test_app();
    app.book("Kindred", "1", None).await;
    let token = app.token(9, &[Permission::CanMarkReturned]);

    for page in [i64::MAX, i64::MIN, 0] {
        let books = app.get(&format!("/catalog/books?page={}", page), None).await;
        assert_eq!(books.status(), StatusCode::NOT_FOUND);

        let authors = app.get(&format!("/catalog/authors?page={}", page), None).await;
        assert_eq!(authors.status(), StatusCode::NOT_FOUND);

        let borrowed = app
            .get(&format!("/catalog/borrowed?page={}", page), Some(&token))
            .await;
        assert_eq!(borrowed.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_author_list_is_sorted_by_name() {
    let app = test_app();
    app.author("Zadie", "Smith").await;
    app.author("Iain", "Banks").await;

    let body = json_body(app.get("/catalog/authors", None).await).await;
    assert_eq!(body["items"][0]["last_name"], "Banks");
    assert_eq!(body["items"][1]["last_name"], "Smith");
}

#[tokio::test]
async fn test_detail_pages() {
    let app = test_app();
    let author = app.author("Octavia", "Butler").await;
    let book = app.book("Kindred", "9780807083697", Some(author)).await;

    let body = json_body(app.get(&format!("/catalog/book/{}", book), None).await).await;
    assert_eq!(body["book"]["title"], "Kindred");
    assert_eq!(body["author"]["last_name"], "Butler");

    let body = json_body(app.get(&format!("/catalog/author/{}", author), None).await).await;
    assert_eq!(body["books"][0]["id"], book);

    assert_eq!(app.get("/catalog/book/999", None).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/catalog/author/999", None).await.status(), StatusCode::NOT_FOUND);
}

// ---- Borrowed lists ----

#[tokio::test]
async fn test_mybooks_requires_login() {
    let app = test_app();
    let response = app.get("/catalog/mybooks", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/accounts/login/?next=/catalog/mybooks");

    let response = app.get("/catalog/mybooks", Some("not-a-token")).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = app.get("/catalog/mybooks?page=2&sort=due", None).await;
    assert_eq!(
        location(&response),
        "/accounts/login/?next=/catalog/mybooks%3Fpage%3D2%26sort%3Ddue"
    );
}

#[tokio::test]
async fn test_mybooks_lists_own_loans_only() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    app.store
        .add_instance(book, "A", LoanStatus::OnLoan, Some(date(2024, 3, 1)), Some(1))
        .await
        .unwrap();
    app.store
        .add_instance(book, "B", LoanStatus::OnLoan, Some(date(2024, 3, 2)), Some(2))
        .await
        .unwrap();

    let token = app.token(1, &[]);
    let body = json_body(app.get("/catalog/mybooks", Some(&token)).await).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["imprint"], "A");
    assert_eq!(body["items"][0]["book_title"], "Kindred");
}

#[tokio::test]
async fn test_borrowed_requires_permission() {
    let app = test_app();
    let token = app.token(1, &[]);

    let response = app.get("/catalog/borrowed", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "not_authorized");

    let response = app.get("/catalog/borrowed", None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn test_borrowed_is_ordered_by_due_date() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    for (due, borrower) in [(date(2024, 5, 1), 1), (date(2024, 3, 1), 2), (date(2024, 4, 1), 3)] {
        app.store
            .add_instance(book, "Beacon", LoanStatus::OnLoan, Some(due), Some(borrower))
            .await
            .unwrap();
    }

    let token = app.token(9, &[Permission::CanMarkReturned]);
    let body = json_body(app.get("/catalog/borrowed", Some(&token)).await).await;
    let dues: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["due_back"].as_str().unwrap())
        .collect();
    assert_eq!(dues, vec!["2024-03-01", "2024-04-01", "2024-05-01"]);
}

// ---- Renewal ----

#[tokio::test]
async fn test_renewal_access_checks() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    let copy = app
        .store
        .add_instance(book, "Beacon", LoanStatus::OnLoan, None, Some(1))
        .await
        .unwrap();
    let uri = format!("/catalog/book/{}/renew", copy.id);

    let response = app.get(&uri, None).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), format!("/accounts/login/?next={}", uri));

    let plain = app.token(1, &[]);
    assert_eq!(app.get(&uri, Some(&plain)).await.status(), StatusCode::FORBIDDEN);

    let today = Local::now().date_naive();
    let response = app
        .post(&uri, Some(&plain), json!({ "renewal_date": today }))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let stored = app.store.get_instance(copy.id).await.unwrap().unwrap();
    assert_eq!(stored.due_back, None);
}

#[tokio::test]
async fn test_renewal_form_proposes_three_weeks() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    let copy = app
        .store
        .add_instance(book, "Beacon", LoanStatus::OnLoan, None, Some(1))
        .await
        .unwrap();
    let token = app.token(9, &[Permission::CanMarkReturned]);

    let body = json_body(
        app.get(&format!("/catalog/book/{}/renew", copy.id), Some(&token))
            .await,
    )
    .await;
    let expected = Local::now().date_naive() + Duration::weeks(3);
    assert_eq!(body["form"]["renewal_date"], json!(expected));
    assert_eq!(body["instance"]["id"], json!(copy.id));

    let missing = app
        .get(&format!("/catalog/book/{}/renew", uuid::Uuid::new_v4()), Some(&token))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_renewal_date_bounds() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    let due = date(2024, 1, 15);
    let copy = app
        .store
        .add_instance(book, "Beacon", LoanStatus::OnLoan, Some(due), Some(1))
        .await
        .unwrap();
    let token = app.token(9, &[Permission::CanMarkReturned]);
    let uri = format!("/catalog/book/{}/renew", copy.id);
    let today = Local::now().date_naive();

    let response = app
        .post(&uri, Some(&token), json!({ "renewal_date": today - Duration::days(1) }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["fields"]["renewal_date"][0]["message"], "Invalid date - renewal in past");

    let response = app
        .post(&uri, Some(&token), json!({ "renewal_date": today + Duration::days(29) }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["fields"]["renewal_date"][0]["message"],
        "Invalid date - renewal more than 4 weeks ahead"
    );

    let stored = app.store.get_instance(copy.id).await.unwrap().unwrap();
    assert_eq!(stored.due_back, Some(due));

    let response = app
        .post(&uri, Some(&token), json!({ "renewal_date": today }))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/borrowed");
    let stored = app.store.get_instance(copy.id).await.unwrap().unwrap();
    assert_eq!(stored.due_back, Some(today));

    let four_weeks = today + Duration::weeks(4);
    let response = app
        .post(&uri, Some(&token), json!({ "renewal_date": four_weeks }))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let stored = app.store.get_instance(copy.id).await.unwrap().unwrap();
    assert_eq!(stored.due_back, Some(four_weeks));
}

// ---- Author editing ----

#[tokio::test]
async fn test_author_create_access_and_redirect() {
    let app = test_app();
    let form = json!({ "first_name": "Ann", "last_name": "Leckie" });

    let response = app.post("/catalog/author/create", None, form.clone()).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let plain = app.token(1, &[]);
    let response = app.post("/catalog/author/create", Some(&plain), form.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_authors().await.unwrap(), 0);

    let token = app.token(1, &[Permission::AddAuthor]);
    assert_eq!(
        app.get("/catalog/author/create", Some(&token)).await.status(),
        StatusCode::OK
    );
    let response = app.post("/catalog/author/create", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/author/1");
    assert_eq!(app.store.count_authors().await.unwrap(), 1);
}

#[tokio::test]
async fn test_author_form_errors() {
    let app = test_app();
    let token = app.token(1, &[Permission::AddAuthor]);

    let response = app
        .post(
            "/catalog/author/create",
            Some(&token),
            json!({
                "first_name": "",
                "last_name": "Le Guin",
                "date_of_birth": "1929-10-21",
                "date_of_death": "1900-01-01"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["fields"]["first_name"].is_array());
    assert_eq!(app.store.count_authors().await.unwrap(), 0);
}

#[tokio::test]
async fn test_author_update() {
    let app = test_app();
    let id = app.author("Ursula", "LeGuin").await;
    let token = app.token(1, &[Permission::ChangeAuthor]);
    let uri = format!("/catalog/author/{}/update", id);

    let current = json_body(app.get(&uri, Some(&token)).await).await;
    assert_eq!(current["last_name"], "LeGuin");

    let response = app
        .post(&uri, Some(&token), json!({ "first_name": "Ursula", "last_name": "Le Guin" }))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/catalog/author/{}", id));
    let author = app.store.get_author(id).await.unwrap().unwrap();
    assert_eq!(author.last_name, "Le Guin");

    let missing = app
        .post("/catalog/author/999/update", Some(&token), json!({ "first_name": "A", "last_name": "B" }))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_author_delete() {
    let app = test_app();
    let busy = app.author("Octavia", "Butler").await;
    let idle = app.author("Ann", "Leckie").await;
    app.book("Kindred", "1", Some(busy)).await;
    let token = app.token(1, &[Permission::DeleteAuthor]);

    let confirm = app.get(&format!("/catalog/author/{}/delete", idle), Some(&token)).await;
    assert_eq!(confirm.status(), StatusCode::OK);

    let response = app
        .post(&format!("/catalog/author/{}/delete", busy), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["code"], "has_dependents");
    assert_eq!(app.store.count_authors().await.unwrap(), 2);

    let response = app
        .post(&format!("/catalog/author/{}/delete", idle), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/authors");
    assert_eq!(app.store.count_authors().await.unwrap(), 1);

    let response = app
        .post(&format!("/catalog/author/{}/delete", idle), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---- Book editing ----

#[tokio::test]
async fn test_book_create_and_duplicate_isbn() {
    let app = test_app();
    let author = app.author("Octavia", "Butler").await;
    let genre = app.store.add_genre("Science Fiction").await;
    let language = app.store.add_language("English").await;
    let token = app.token(1, &[Permission::AddBook]);
    let form = json!({
        "title": "Kindred",
        "author": author,
        "summary": "Dana is pulled back in time",
        "isbn": "9780807083697",
        "genres": [genre.id],
        "language": language.id
    });

    let response = app.post("/catalog/book/create", Some(&token), form.clone()).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/book/1");

    let response = app.post("/catalog/book/create", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["fields"]["isbn"][0]["message"],
        "Book with this ISBN already exists."
    );
    assert_eq!(app.store.count_books().await.unwrap(), 1);
}

#[tokio::test]
async fn test_book_update() {
    let app = test_app();
    let author = app.author("Octavia", "Butler").await;
    let genre = app.store.add_genre("Science Fiction").await;
    let book = app
        .store
        .create_book(&BookForm {
            title: "Kindrid".into(),
            author: Some(author),
            summary: "Dana".into(),
            isbn: "9780807083697".into(),
            genres: vec![genre.id],
            language: None,
        })
        .await
        .unwrap();
    let token = app.token(1, &[Permission::ChangeBook]);
    let uri = format!("/catalog/book/{}/update", book.id);

    let mut form = json_body(app.get(&uri, Some(&token)).await).await;
    form["title"] = json!("Kindred");

    let response = app.post(&uri, Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/catalog/book/{}", book.id));
    let stored = app.store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Kindred");
}

#[tokio::test]
async fn test_book_delete_with_copies_redirects_back() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    app.store
        .add_instance(book, "Beacon", LoanStatus::Available, None, None)
        .await
        .unwrap();
    let token = app.token(1, &[Permission::DeleteBook]);

    let response = app
        .post(&format!("/catalog/book/{}/delete", book), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/catalog/book/{}", book));
    assert_eq!(app.store.count_books().await.unwrap(), 1);
}

#[tokio::test]
async fn test_book_delete_without_copies() {
    let app = test_app();
    let book = app.book("Kindred", "1", None).await;
    let token = app.token(1, &[Permission::DeleteBook]);

    let response = app
        .post(&format!("/catalog/book/{}/delete", book), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/catalog/books");
    assert_eq!(app.store.count_books().await.unwrap(), 0);
}

// ---- Authorizer seam ----

#[tokio::test]
async fn test_anonymous_callers_never_reach_the_authorizer() {
    let mut authorizer = MockAuthz::new();
    authorizer.expect_has_perm().times(0);
    let app = test_app_with(Arc::new(authorizer));
    let book = app.book("Kindred", "1", None).await;

    let response = app
        .post(&format!("/catalog/book/{}/delete", book), None, json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(app.store.count_books().await.unwrap(), 1);
}

#[tokio::test]
async fn test_denied_capability_leaves_store_untouched() {
    let mut authorizer = MockAuthz::new();
    authorizer
        .expect_has_perm()
        .withf(|_, permission| *permission == Permission::DeleteBook)
        .times(1)
        .return_const(false);
    let app = test_app_with(Arc::new(authorizer));
    let book = app.book("Kindred", "1", None).await;
    // The mock decides; the token's own claims do not matter
    let token = app.token(1, &[Permission::DeleteBook]);

    let response = app
        .post(&format!("/catalog/book/{}/delete", book), Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_books().await.unwrap(), 1);
}
