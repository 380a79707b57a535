// Copyright 2023 Remi Bernotavicius

//! JSON API for recipes.

use super::AppState;
use crate::database::forms::{RecipeForm, RecipePatch};
use crate::database::models::{CategoryId, Recipe, RecipeId, SourceId};
use crate::database::recipes;
use crate::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct RecipeBody {
    pub title: String,
    pub summary: String,
    pub description: String,
    pub slug: String,
    pub prep_time: String,
    pub ctime: chrono::NaiveDateTime,
    pub mtime: chrono::NaiveDateTime,
    pub sources: Vec<SourceId>,
    pub category: CategoryId,
    pub serving_value: Option<i32>,
}

impl RecipeBody {
    fn new(recipe: Recipe, sources: Vec<SourceId>) -> Self {
        Self {
            title: recipe.title,
            summary: recipe.summary,
            description: recipe.description,
            slug: recipe.slug,
            prep_time: recipe.prep_time,
            ctime: recipe.ctime,
            mtime: recipe.mtime,
            sources,
            category: recipe.category_id,
            serving_value: recipe.serving_value,
        }
    }
}

pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<RecipeBody>>> {
    let all = state.with_connection(recipes::recipes_with_sources).await?;
    Ok(Json(
        all.into_iter()
            .map(|(recipe, sources)| RecipeBody::new(recipe, sources))
            .collect(),
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeBody>> {
    let body = state
        .with_connection(move |conn| {
            let recipe = recipes::get_recipe(conn, id)?;
            let sources = recipes::recipe_sources(conn, id)?;
            Ok(RecipeBody::new(recipe, sources))
        })
        .await?;
    Ok(Json(body))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Json(mut form): Json<RecipeForm>,
) -> Result<(StatusCode, Json<RecipeBody>)> {
    form.validate()?;
    let body = state
        .with_connection(move |conn| {
            let recipe = recipes::add_recipe(conn, &form)?;
            log::info!("created recipe {} {:?}", recipe.id, recipe.title);
            Ok(RecipeBody::new(recipe, form.sources))
        })
        .await?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn replace_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(mut form): Json<RecipeForm>,
) -> Result<Json<RecipeBody>> {
    let body = state
        .with_connection(move |conn| {
            form.keep_slug(&recipes::get_recipe(conn, id)?);
            form.validate()?;

            let recipe = recipes::edit_recipe(conn, id, &form)?;
            Ok(RecipeBody::new(recipe, form.sources))
        })
        .await?;
    Ok(Json(body))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(patch): Json<RecipePatch>,
) -> Result<Json<RecipeBody>> {
    let body = state
        .with_connection(move |conn| {
            let recipe = recipes::get_recipe(conn, id)?;
            let sources = recipes::recipe_sources(conn, id)?;
            let mut form = RecipeForm::from_recipe(&recipe, sources);
            patch.apply(&mut form);
            form.validate()?;

            let recipe = recipes::edit_recipe(conn, id, &form)?;
            Ok(RecipeBody::new(recipe, form.sources))
        })
        .await?;
    Ok(Json(body))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| recipes::delete_recipe(conn, id))
        .await?;
    log::info!("deleted recipe {id}");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
use super::{send, send_json, test_state};
#[cfg(test)]
use serde_json::json;

#[tokio::test]
async fn list_has_one_entry_per_recipe() {
    let (state, pantry) = test_state();
    let (status, body) = send_json(&state, "GET", "/api/recipes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    state
        .with_connection(move |conn| {
            crate::database::fixtures::recipe(conn, &pantry, "Tomato Soup");
            crate::database::fixtures::recipe(conn, &pantry, "Apple Pie");
            Ok(())
        })
        .await
        .unwrap();

    let (status, _, bytes) = send(&state, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let recipes = body.as_array().unwrap();
    assert_eq!(recipes.len(), 2);
    assert_eq!(recipes[0]["title"], "Apple Pie");
    assert_eq!(recipes[0]["slug"], "apple-pie");
    assert_eq!(recipes[0]["sources"], json!([]));
    assert_eq!(recipes[0]["serving_value"], 4);
    assert!(recipes[0].get("id").is_none());
    for field in ["summary", "description", "prep_time", "ctime", "mtime", "category"] {
        assert!(recipes[0].get(field).is_some(), "missing {field}");
    }
}

#[tokio::test]
async fn missing_recipe_is_not_found() {
    let (state, _) = test_state();
    let (status, body) = send_json(&state, "GET", "/api/recipes/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn anonymous_writes_are_refused() {
    use axum::http::header;

    let (state, pantry) = test_state();
    let recipe = json!({"title": "Tomato Soup", "category": pantry.category.id});

    for (method, uri) in [
        ("POST", "/api/recipes"),
        ("PUT", "/api/recipes/1"),
        ("PATCH", "/api/recipes/1"),
        ("DELETE", "/api/recipes/1"),
    ] {
        let (status, headers, _) = send(&state, method, uri, None, Some(recipe.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(headers.contains_key(header::WWW_AUTHENTICATE));
    }

    let (status, _, _) = send(&state, "POST", "/api/recipes", Some("wrong"), Some(recipe)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&state, "GET", "/api/recipes", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn recipe_lifecycle() {
    let (state, pantry) = test_state();

    let (status, created) = send_json(
        &state,
        "POST",
        "/api/recipes",
        Some(json!({
            "title": "Tomato Soup",
            "summary": "warming",
            "category": pantry.category.id,
            "serving_value": 4,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "tomato-soup");
    assert_eq!(created["ctime"], created["mtime"]);

    let (status, patched) = send_json(
        &state,
        "PATCH",
        "/api/recipes/1",
        Some(json!({"summary": "hearty", "serving_value": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "Tomato Soup");
    assert_eq!(patched["summary"], "hearty");
    assert_eq!(patched["serving_value"], serde_json::Value::Null);
    assert_eq!(patched["ctime"], created["ctime"]);

    let (status, replaced) = send_json(
        &state,
        "PUT",
        "/api/recipes/1",
        Some(json!({"title": "Tomato Bisque", "category": pantry.category.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["slug"], "tomato-soup");
    assert_eq!(replaced["summary"], "");

    let (status, _, page) = send(&state, "GET", "/cookbook/tomato-soup", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(page).unwrap().contains("<h1>Tomato Bisque</h1>"));

    let (status, renamed) = send_json(
        &state,
        "PUT",
        "/api/recipes/1",
        Some(json!({
            "title": "Tomato Bisque",
            "slug": "bisque",
            "category": pantry.category.id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["slug"], "bisque");
    let (status, _, _) = send(&state, "GET", "/cookbook/bisque", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, invalid) = send_json(
        &state,
        "PUT",
        "/api/recipes/1",
        Some(json!({"title": "", "category": pantry.category.id})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid["error"], "invalid");

    let (status, _) = send_json(&state, "DELETE", "/api/recipes/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_json(&state, "GET", "/api/recipes/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
