// Copyright 2023 Remi Bernotavicius

use super::render::{self, RecipePage};
use super::AppState;
use crate::database::query::{get_category, get_source};
use crate::database::recipes;
use crate::recipe_card::{recipe_card, scaled, scaled_servings, Scale};
use crate::unit_conversion::foods_with_conversions;
use crate::{Error, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;

pub async fn index() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/cookbook")])
}

#[derive(Deserialize, Debug)]
pub struct PageQuery {
    page: Option<i64>,
}

/// Page 1 always exists, even with no recipes. Other empty pages don't.
pub async fn recipe_list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>> {
    let page = query.page.unwrap_or(1);
    if page < 1 {
        return Err(Error::not_found(format_args!("page {page}")));
    }

    let (recipes, total) = state
        .with_connection(move |conn| {
            Ok((
                recipes::recipe_page(conn, page)?,
                recipes::count_recipes(conn)?,
            ))
        })
        .await?;
    if page > 1 && recipes.is_empty() {
        return Err(Error::not_found(format_args!("page {page}")));
    }
    Ok(Html(render::recipe_list(state.views(), &recipes, page, total)?))
}

#[derive(Deserialize, Debug)]
pub struct ScaleQuery {
    scale: Option<String>,
}

pub async fn recipe_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ScaleQuery>,
) -> Result<Html<String>> {
    let scale = match query.scale.as_deref() {
        Some(scale) => scale.parse()?,
        None => Scale::ONE,
    };

    let page = state
        .with_connection(move |conn| {
            let recipe = recipes::get_recipe_by_slug(conn, &slug)?;
            let category = get_category(conn, recipe.category_id)?;
            let sources = recipes::recipe_sources(conn, recipe.id)?
                .into_iter()
                .map(|id| get_source(conn, id))
                .collect::<Result<Vec<_>>>()?;
            let card = scaled(&recipe_card(conn, recipe.id)?, scale);

            Ok(RecipePage {
                servings: scaled_servings(&recipe, scale),
                recipe,
                category,
                sources,
                card,
                scale,
            })
        })
        .await?;
    Ok(Html(render::recipe_detail(state.views(), &page)?))
}

pub async fn food_conversions(State(state): State<AppState>) -> Result<Html<String>> {
    let foods = state.with_connection(foods_with_conversions).await?;
    Ok(Html(render::food_conversions(state.views(), &foods)?))
}

#[cfg(test)]
use super::{send, test_state};

#[cfg(test)]
async fn body_text(state: &AppState, uri: &str) -> (StatusCode, String) {
    let (status, _, bytes) = send(state, "GET", uri, None, None).await;
    (status, String::from_utf8(bytes).unwrap())
}

#[tokio::test]
async fn first_page_always_exists() {
    let (state, _) = test_state();
    let (status, html) = body_text(&state, "/cookbook").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("page 1 of 1"));

    let (status, _) = body_text(&state, "/cookbook?page=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = body_text(&state, "/cookbook?page=0").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn huge_page_is_not_found_and_server_keeps_serving() {
    let (state, _) = test_state();
    for page in [i64::MAX, i64::MIN] {
        let (status, _) = body_text(&state, &format!("/cookbook?page={page}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "page={page}");
    }

    let (status, html) = body_text(&state, "/cookbook").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("page 1 of 1"));
    let (status, _) = body_text(&state, "/api/recipes").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn markup_in_recipe_text_is_escaped() {
    use crate::database::forms::DirectionForm;

    let (state, pantry) = test_state();
    let slug = state
        .with_connection(move |conn| {
            let recipe =
                crate::database::fixtures::recipe(conn, &pantry, "<script>alert(1)</script> Pie");
            recipes::add_direction(
                conn,
                recipe.id,
                &DirectionForm {
                    text: "Bake at 200 & <b>rest</b>".into(),
                    order: None,
                },
            )?;
            Ok(recipe.slug)
        })
        .await
        .unwrap();

    let (status, html) = body_text(&state, "/cookbook").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;"));

    let (status, html) = body_text(&state, &format!("/cookbook/{slug}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!html.contains("<script>"));
    assert!(!html.contains("<b>rest"));
    assert!(html.contains("Bake at 200 &amp; &lt;b&gt;rest"));
}

#[tokio::test]
async fn recipe_detail_scales_servings() {
    use crate::database::forms::{DirectionForm, IngredientForm};

    let (state, pantry) = test_state();
    state
        .with_connection(move |conn| {
            let recipe = crate::database::fixtures::recipe(conn, &pantry, "Tomato Soup");
            let direction = recipes::add_direction(
                conn,
                recipe.id,
                &DirectionForm {
                    text: "Simmer the tomatoes".into(),
                    order: None,
                },
            )?;
            recipes::add_ingredient(
                conn,
                recipe.id,
                &IngredientForm {
                    amount: Some(1.0),
                    unit: Some(pantry.cup.id),
                    food: pantry.tomato.id,
                    direction: Some(direction.id),
                    order_index: None,
                },
            )?;
            Ok(())
        })
        .await
        .unwrap();

    let (status, html) = body_text(&state, "/cookbook/tomato-soup").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<h1>Tomato Soup</h1>"));
    assert!(html.contains("Serves 4"));
    assert!(html.contains("1 cup tomato"));

    let (status, html) = body_text(&state, "/cookbook/tomato-soup?scale=2.5").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Serves 10"));
    assert!(html.contains("2.5 cup tomato"));

    let (status, html) = body_text(&state, "/cookbook/tomato-soup").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Serves 4"));

    for bad in ["0", "-2", "abc", "NaN"] {
        let (status, _) = body_text(&state, &format!("/cookbook/tomato-soup?scale={bad}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "scale={bad}");
    }

    let (status, _) = body_text(&state, "/cookbook/gazpacho").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn foods_page_lists_foods() {
    let (state, _) = test_state();
    let (status, html) = body_text(&state, "/cookbook/foods").await;
    assert_eq!(status, StatusCode::OK);
    for food in ["flour", "salt", "tomato"] {
        assert!(html.contains(&format!("<dt>{food}</dt>")));
    }
}
