// Copyright 2023 Remi Bernotavicius

//! Token authentication. Clients send `Authorization: Bearer <token>` (or
//! `Token <token>`). Anonymous clients may read; writing needs a configured
//! token.

use super::AppState;
use crate::settings::Settings;
use crate::{Error, Result};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    ReadOnly,
    Full,
}

fn credentials(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| Error::Unauthorized)?;
    let (scheme, token) = value.split_once(' ').ok_or(Error::Unauthorized)?;
    if !(scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token")) {
        return Err(Error::Unauthorized);
    }
    Ok(Some(token.trim()))
}

/// Presenting a token that isn't configured is an error even for reads.
pub fn permission(settings: &Settings, headers: &HeaderMap) -> Result<Permission> {
    match credentials(headers)? {
        None => Ok(Permission::ReadOnly),
        Some(token) if settings.accepts_token(token) => Ok(Permission::Full),
        Some(_) => Err(Error::Unauthorized),
    }
}

pub fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if permission(state.settings(), request.headers())? < Permission::Full {
        log::debug!("refusing anonymous {} {}", request.method(), request.uri());
        return Err(Error::Unauthorized);
    }
    Ok(next.run(request).await)
}

pub async fn require_auth_for_writes(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let needed = if is_read_only(request.method()) {
        Permission::ReadOnly
    } else {
        Permission::Full
    };
    if permission(state.settings(), request.headers())? < needed {
        log::debug!("refusing anonymous {} {}", request.method(), request.uri());
        return Err(Error::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
fn headers(authorization: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = authorization {
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
    }
    headers
}

#[test]
fn permission_from_headers() {
    let settings = Settings {
        profile: crate::settings::Profile::Production,
        database: ":memory:".into(),
        api_tokens: vec!["s3cret".into()],
    };

    assert_eq!(
        permission(&settings, &headers(None)).unwrap(),
        Permission::ReadOnly
    );
    assert_eq!(
        permission(&settings, &headers(Some("Bearer s3cret"))).unwrap(),
        Permission::Full
    );
    assert_eq!(
        permission(&settings, &headers(Some("Token s3cret"))).unwrap(),
        Permission::Full
    );
    for bad in ["Bearer nope", "Basic s3cret", "s3cret"] {
        assert!(matches!(
            permission(&settings, &headers(Some(bad))),
            Err(Error::Unauthorized)
        ));
    }
}

#[test]
fn read_only_methods() {
    assert!(is_read_only(&Method::GET));
    assert!(is_read_only(&Method::HEAD));
    assert!(!is_read_only(&Method::POST));
    assert!(!is_read_only(&Method::PATCH));
    assert!(!is_read_only(&Method::DELETE));
}
