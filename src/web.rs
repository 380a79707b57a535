// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::settings::Settings;
use crate::Result;
use axum::extract::Request;
use axum::middleware::{from_fn, from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

mod admin;
mod api;
mod auth;
mod render;
mod views;

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<database::Connection>>,
    settings: Arc<Settings>,
    views: Arc<minijinja::Environment<'static>>,
}

impl AppState {
    pub fn new(conn: database::Connection, settings: Settings) -> Self {
        let views = render::view_engine(settings.debug());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            settings: Arc::new(settings),
            views: Arc::new(views),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn views(&self) -> &minijinja::Environment<'static> {
        &self.views
    }

    /// Runs `f` on a blocking thread while holding the connection. A panic in
    /// an earlier `f` leaves the lock poisoned; the connection is still usable
    /// since every multi-statement write runs in a transaction.
    pub async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut database::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(|poisoned| {
                log::warn!("recovering database connection after a panic");
                poisoned.into_inner()
            });
            f(&mut conn)
        })
        .await?
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{method} {path} {} ({:.1?})",
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/recipes",
            get(api::list_recipes).post(api::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(api::get_recipe)
                .put(api::replace_recipe)
                .patch(api::update_recipe)
                .delete(api::delete_recipe),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            auth::require_auth_for_writes,
        ));

    let admin = admin::routes().route_layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        .route("/", get(views::index))
        .route("/cookbook", get(views::recipe_list))
        .route("/cookbook/foods", get(views::food_conversions))
        .route("/cookbook/:slug", get(views::recipe_detail))
        .nest("/api", api)
        .nest("/admin", admin)
        .layer(from_fn(log_requests))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: SocketAddr) -> Result<()> {
    if state.settings().debug() {
        log::warn!("running with development settings");
    }

    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
const TEST_TOKEN: &str = "kitchen-token";

#[cfg(test)]
fn test_state() -> (AppState, database::fixtures::Pantry) {
    use crate::settings::Profile;

    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let settings = Settings {
        profile: Profile::Development,
        database: ":memory:".into(),
        api_tokens: vec![TEST_TOKEN.into()],
    };
    (AppState::new(conn, settings), pantry)
}

#[cfg(test)]
async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, axum::http::HeaderMap, Vec<u8>) {
    use axum::body::Body;
    use axum::http::header;
    use tower::ServiceExt as _;

    let mut request = axum::http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router(state.clone())
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

#[cfg(test)]
async fn send_json(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let (status, _, bytes) = send(state, method, uri, Some(TEST_TOKEN), body).await;
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn root_redirects_to_cookbook() {
    use axum::http::{header, StatusCode};

    let (state, _) = test_state();
    let (status, headers, _) = send(&state, "GET", "/", None, None).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/cookbook");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    use axum::http::StatusCode;

    let (state, _) = test_state();
    let (status, _, _) = send(&state, "GET", "/pantry", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn panicking_request_does_not_wedge_connection() {
    use axum::http::StatusCode;

    let (state, _) = test_state();
    let result: Result<()> = state
        .with_connection(|_| panic!("boom"))
        .await;
    assert!(matches!(result, Err(crate::Error::Task(_))));

    let (status, _, _) = send(&state, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
