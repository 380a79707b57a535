// Copyright 2023 Remi Bernotavicius

//! Administrative CRUD for every table. All routes here require a token.

use super::AppState;
use crate::database::forms::{
    CategoryForm, DirectionForm, FoodForm, FoodGroupForm, IngredientForm, PhotoForm, RecipeForm,
    SourceForm, UnitForm,
};
use crate::database::models::{
    Category, CategoryId, Direction, DirectionId, Food, FoodGroup, FoodGroupId, FoodId,
    Ingredient, IngredientId, Photo, PhotoId, Recipe, RecipeId, Source, SourceId, Unit, UnitId,
};
use crate::database::query::{self, FoodFilter};
use crate::database::recipes::{self, RecipeFilter};
use crate::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sources", get(list_sources).post(create_source))
        .route(
            "/sources/:id",
            get(get_source).put(update_source).delete(delete_source),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/food-groups", get(list_food_groups).post(create_food_group))
        .route(
            "/food-groups/:id",
            get(get_food_group)
                .put(update_food_group)
                .delete(delete_food_group),
        )
        .route("/foods", get(list_foods).post(create_food))
        .route(
            "/foods/:id",
            get(get_food).put(update_food).delete(delete_food),
        )
        .route("/units", get(list_units).post(create_unit))
        .route(
            "/units/:id",
            get(get_unit).put(update_unit).delete(delete_unit),
        )
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/directions", post(create_direction))
        .route("/recipes/:id/ingredients", post(create_recipe_ingredient))
        .route("/recipes/:id/photos", post(create_recipe_photo))
        .route(
            "/directions/:id",
            get(get_direction)
                .put(update_direction)
                .delete(delete_direction),
        )
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route(
            "/ingredients/:id",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
        .route("/photos", get(list_photos).post(create_photo))
        .route(
            "/photos/:id",
            get(get_photo).put(update_photo).delete(delete_photo),
        )
}

type Created<T> = (StatusCode, Json<T>);

fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<Source>>> {
    Ok(Json(state.with_connection(query::list_sources).await?))
}

async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<SourceId>,
) -> Result<Json<Source>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::get_source(conn, id))
            .await?,
    ))
}

async fn create_source(
    State(state): State<AppState>,
    Json(mut form): Json<SourceForm>,
) -> Result<Created<Source>> {
    form.validate()?;
    let source = state
        .with_connection(move |conn| query::add_source(conn, &form))
        .await?;
    Ok(created(source))
}

async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<SourceId>,
    Json(mut form): Json<SourceForm>,
) -> Result<Json<Source>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| query::edit_source(conn, id, &form))
            .await?,
    ))
}

async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<SourceId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| query::delete_source(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.with_connection(query::list_categories).await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::get_category(conn, id))
            .await?,
    ))
}

async fn create_category(
    State(state): State<AppState>,
    Json(mut form): Json<CategoryForm>,
) -> Result<Created<Category>> {
    form.validate()?;
    let category = state
        .with_connection(move |conn| query::add_category(conn, &form))
        .await?;
    Ok(created(category))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(mut form): Json<CategoryForm>,
) -> Result<Json<Category>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| query::edit_category(conn, id, &form))
            .await?,
    ))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| query::delete_category(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_food_groups(State(state): State<AppState>) -> Result<Json<Vec<FoodGroup>>> {
    Ok(Json(state.with_connection(query::list_food_groups).await?))
}

async fn get_food_group(
    State(state): State<AppState>,
    Path(id): Path<FoodGroupId>,
) -> Result<Json<FoodGroup>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::get_food_group(conn, id))
            .await?,
    ))
}

async fn create_food_group(
    State(state): State<AppState>,
    Json(mut form): Json<FoodGroupForm>,
) -> Result<Created<FoodGroup>> {
    form.validate()?;
    let group = state
        .with_connection(move |conn| query::add_food_group(conn, &form))
        .await?;
    Ok(created(group))
}

async fn update_food_group(
    State(state): State<AppState>,
    Path(id): Path<FoodGroupId>,
    Json(mut form): Json<FoodGroupForm>,
) -> Result<Json<FoodGroup>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| query::edit_food_group(conn, id, &form))
            .await?,
    ))
}

async fn delete_food_group(
    State(state): State<AppState>,
    Path(id): Path<FoodGroupId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| query::delete_food_group(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_foods(
    State(state): State<AppState>,
    Query(filter): Query<FoodFilter>,
) -> Result<Json<Vec<Food>>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::list_foods(conn, &filter))
            .await?,
    ))
}

async fn get_food(State(state): State<AppState>, Path(id): Path<FoodId>) -> Result<Json<Food>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::get_food(conn, id))
            .await?,
    ))
}

async fn create_food(
    State(state): State<AppState>,
    Json(mut form): Json<FoodForm>,
) -> Result<Created<Food>> {
    form.validate()?;
    let food = state
        .with_connection(move |conn| query::add_food(conn, &form))
        .await?;
    Ok(created(food))
}

async fn update_food(
    State(state): State<AppState>,
    Path(id): Path<FoodId>,
    Json(mut form): Json<FoodForm>,
) -> Result<Json<Food>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| query::edit_food(conn, id, &form))
            .await?,
    ))
}

async fn delete_food(State(state): State<AppState>, Path(id): Path<FoodId>) -> Result<StatusCode> {
    state
        .with_connection(move |conn| query::delete_food(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_units(State(state): State<AppState>) -> Result<Json<Vec<Unit>>> {
    Ok(Json(state.with_connection(query::list_units).await?))
}

async fn get_unit(State(state): State<AppState>, Path(id): Path<UnitId>) -> Result<Json<Unit>> {
    Ok(Json(
        state
            .with_connection(move |conn| query::get_unit(conn, id))
            .await?,
    ))
}

async fn create_unit(
    State(state): State<AppState>,
    Json(mut form): Json<UnitForm>,
) -> Result<Created<Unit>> {
    form.validate()?;
    let unit = state
        .with_connection(move |conn| query::add_unit(conn, &form))
        .await?;
    Ok(created(unit))
}

async fn update_unit(
    State(state): State<AppState>,
    Path(id): Path<UnitId>,
    Json(mut form): Json<UnitForm>,
) -> Result<Json<Unit>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| query::edit_unit(conn, id, &form))
            .await?,
    ))
}

async fn delete_unit(State(state): State<AppState>, Path(id): Path<UnitId>) -> Result<StatusCode> {
    state
        .with_connection(move |conn| query::delete_unit(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize, Debug)]
struct RecipeWithSources {
    #[serde(flatten)]
    recipe: Recipe,
    sources: Vec<SourceId>,
}

/// A recipe together with everything edited alongside it.
#[derive(Serialize, Debug)]
struct RecipeDetail {
    #[serde(flatten)]
    recipe: Recipe,
    sources: Vec<SourceId>,
    directions: Vec<Direction>,
    ingredients: Vec<Ingredient>,
    photos: Vec<Photo>,
}

async fn list_recipes(
    State(state): State<AppState>,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<Vec<Recipe>>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::list_recipes(conn, &filter))
            .await?,
    ))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<Json<RecipeDetail>> {
    let detail = state
        .with_connection(move |conn| {
            Ok(RecipeDetail {
                recipe: recipes::get_recipe(conn, id)?,
                sources: recipes::recipe_sources(conn, id)?,
                directions: recipes::list_directions(conn, id)?,
                ingredients: recipes::list_ingredients(conn, Some(id))?,
                photos: recipes::list_photos(conn, Some(id))?,
            })
        })
        .await?;
    Ok(Json(detail))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(mut form): Json<RecipeForm>,
) -> Result<Created<RecipeWithSources>> {
    form.validate()?;
    let recipe = state
        .with_connection(move |conn| {
            let recipe = recipes::add_recipe(conn, &form)?;
            Ok(RecipeWithSources {
                recipe,
                sources: form.sources,
            })
        })
        .await?;
    Ok(created(recipe))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
    Json(mut form): Json<RecipeForm>,
) -> Result<Json<RecipeWithSources>> {
    let recipe = state
        .with_connection(move |conn| {
            form.keep_slug(&recipes::get_recipe(conn, id)?);
            form.validate()?;

            let recipe = recipes::edit_recipe(conn, id, &form)?;
            Ok(RecipeWithSources {
                recipe,
                sources: form.sources,
            })
        })
        .await?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<RecipeId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| recipes::delete_recipe(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_direction(
    State(state): State<AppState>,
    Path(recipe): Path<RecipeId>,
    Json(form): Json<DirectionForm>,
) -> Result<Created<Direction>> {
    let direction = state
        .with_connection(move |conn| recipes::add_direction(conn, recipe, &form))
        .await?;
    Ok(created(direction))
}

async fn get_direction(
    State(state): State<AppState>,
    Path(id): Path<DirectionId>,
) -> Result<Json<Direction>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::get_direction(conn, id))
            .await?,
    ))
}

async fn update_direction(
    State(state): State<AppState>,
    Path(id): Path<DirectionId>,
    Json(form): Json<DirectionForm>,
) -> Result<Json<Direction>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::edit_direction(conn, id, &form))
            .await?,
    ))
}

async fn delete_direction(
    State(state): State<AppState>,
    Path(id): Path<DirectionId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| recipes::delete_direction(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Debug)]
struct RecipeQuery {
    recipe: Option<RecipeId>,
}

#[derive(Deserialize, Debug)]
struct NewIngredient {
    recipe: RecipeId,
    #[serde(flatten)]
    form: IngredientForm,
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Ingredient>>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::list_ingredients(conn, query.recipe))
            .await?,
    ))
}

async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<Json<Ingredient>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::get_ingredient(conn, id))
            .await?,
    ))
}

async fn add_ingredient(
    state: &AppState,
    recipe: RecipeId,
    form: IngredientForm,
) -> Result<Created<Ingredient>> {
    form.validate()?;
    let ingredient = state
        .with_connection(move |conn| recipes::add_ingredient(conn, recipe, &form))
        .await?;
    Ok(created(ingredient))
}

async fn create_ingredient(
    State(state): State<AppState>,
    Json(new): Json<NewIngredient>,
) -> Result<Created<Ingredient>> {
    add_ingredient(&state, new.recipe, new.form).await
}

async fn create_recipe_ingredient(
    State(state): State<AppState>,
    Path(recipe): Path<RecipeId>,
    Json(form): Json<IngredientForm>,
) -> Result<Created<Ingredient>> {
    add_ingredient(&state, recipe, form).await
}

async fn update_ingredient(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
    Json(form): Json<IngredientForm>,
) -> Result<Json<Ingredient>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| recipes::edit_ingredient(conn, id, &form))
            .await?,
    ))
}

async fn delete_ingredient(
    State(state): State<AppState>,
    Path(id): Path<IngredientId>,
) -> Result<StatusCode> {
    state
        .with_connection(move |conn| recipes::delete_ingredient(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Debug)]
struct NewPhoto {
    recipe: RecipeId,
    #[serde(flatten)]
    form: PhotoForm,
}

async fn list_photos(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Photo>>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::list_photos(conn, query.recipe))
            .await?,
    ))
}

async fn get_photo(State(state): State<AppState>, Path(id): Path<PhotoId>) -> Result<Json<Photo>> {
    Ok(Json(
        state
            .with_connection(move |conn| recipes::get_photo(conn, id))
            .await?,
    ))
}

async fn add_photo(state: &AppState, recipe: RecipeId, form: PhotoForm) -> Result<Created<Photo>> {
    form.validate()?;
    let photo = state
        .with_connection(move |conn| recipes::add_photo(conn, recipe, &form))
        .await?;
    Ok(created(photo))
}

async fn create_photo(
    State(state): State<AppState>,
    Json(new): Json<NewPhoto>,
) -> Result<Created<Photo>> {
    add_photo(&state, new.recipe, new.form).await
}

async fn create_recipe_photo(
    State(state): State<AppState>,
    Path(recipe): Path<RecipeId>,
    Json(form): Json<PhotoForm>,
) -> Result<Created<Photo>> {
    add_photo(&state, recipe, form).await
}

async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<PhotoId>,
    Json(form): Json<PhotoForm>,
) -> Result<Json<Photo>> {
    form.validate()?;
    Ok(Json(
        state
            .with_connection(move |conn| recipes::edit_photo(conn, id, &form))
            .await?,
    ))
}

async fn delete_photo(State(state): State<AppState>, Path(id): Path<PhotoId>) -> Result<StatusCode> {
    state
        .with_connection(move |conn| recipes::delete_photo(conn, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
use super::{send, send_json, test_state};
#[cfg(test)]
use serde_json::json;

#[tokio::test]
async fn every_admin_route_needs_a_token() {
    let (state, _) = test_state();
    for uri in [
        "/admin/sources",
        "/admin/categories",
        "/admin/food-groups",
        "/admin/foods",
        "/admin/units",
        "/admin/recipes",
        "/admin/ingredients",
        "/admin/photos",
    ] {
        let (status, _, _) = send(&state, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        let (status, _) = send_json(&state, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn catalog_crud() {
    let (state, pantry) = test_state();

    let (status, source) = send_json(
        &state,
        "POST",
        "/admin/sources",
        Some(json!({"name": "Joy of Cooking"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(source["url"], "");

    let uri = format!("/admin/sources/{}", source["id"]);
    let (status, source) = send_json(
        &state,
        "PUT",
        &uri,
        Some(json!({"name": "Joy of Cooking", "url": "https://www.thejoykitchen.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(source["url"], "https://www.thejoykitchen.com");

    let (status, _) = send_json(
        &state,
        "POST",
        "/admin/sources",
        Some(json!({"name": "Bad", "url": "not a url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, unit) = send_json(
        &state,
        "POST",
        "/admin/units",
        Some(json!({"name": "liter", "name_abbrev": "l", "type": "volume", "system": "si"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(unit["type"], "volume");
    assert_eq!(unit["system"], "si");

    let (status, foods) = send_json(
        &state,
        "GET",
        &format!("/admin/foods?q=to&group={}", pantry.group.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(foods.as_array().unwrap().len(), 1);
    assert_eq!(foods[0]["name"], "tomato");

    let (status, _) = send_json(&state, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_json(&state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn category_in_use_is_not_deleted() {
    let (state, pantry) = test_state();
    let category = pantry.category.id;
    state
        .with_connection(move |conn| {
            crate::database::fixtures::recipe(conn, &pantry, "Tomato Soup");
            Ok(())
        })
        .await
        .unwrap();

    let uri = format!("/admin/categories/{category}");
    let (status, body) = send_json(&state, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");
    let (status, _) = send_json(&state, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn inline_recipe_editing() {
    let (state, pantry) = test_state();

    let (status, recipe) = send_json(
        &state,
        "POST",
        "/admin/recipes",
        Some(json!({"title": "Tomato Soup", "category": pantry.category.id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let recipe_uri = format!("/admin/recipes/{}", recipe["id"]);

    let (status, chop) = send_json(
        &state,
        "POST",
        &format!("{recipe_uri}/directions"),
        Some(json!({"text": "Chop"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(chop["order"], 0);

    let (status, wash) = send_json(
        &state,
        "POST",
        &format!("{recipe_uri}/directions"),
        Some(json!({"text": "Wash", "order": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wash["order"], 0);

    let (status, ingredient) = send_json(
        &state,
        "POST",
        &format!("{recipe_uri}/ingredients"),
        Some(json!({
            "amount": 2.0,
            "unit": pantry.cup.id,
            "food": pantry.tomato.id,
            "direction": chop["id"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ingredient["order_index"], 0);

    let (status, photo) = send_json(
        &state,
        "POST",
        "/admin/photos",
        Some(json!({
            "recipe": recipe["id"],
            "caption": "Served",
            "image": "photos/tomato-soup.jpg",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(photo["keep"], true);

    let (status, detail) = send_json(&state, "GET", &recipe_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Tomato Soup");
    let texts: Vec<_> = detail["directions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["text"].clone())
        .collect();
    assert_eq!(texts, [json!("Wash"), json!("Chop")]);
    assert_eq!(detail["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(detail["photos"].as_array().unwrap().len(), 1);

    let direction_uri = format!("/admin/directions/{}", chop["id"]);
    let (status, _) = send_json(&state, "DELETE", &direction_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, detail) = send_json(&state, "GET", &recipe_uri, None).await;
    assert_eq!(detail["directions"].as_array().unwrap().len(), 1);
    assert_eq!(detail["directions"][0]["order"], 0);
    assert_eq!(detail["ingredients"], json!([]));

    let (status, renamed) = send_json(
        &state,
        "PUT",
        &recipe_uri,
        Some(json!({"title": "Roasted Tomato Soup", "category": pantry.category.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Roasted Tomato Soup");
    assert_eq!(renamed["slug"], "tomato-soup");
}

#[tokio::test]
async fn ingredient_direction_from_other_recipe_is_rejected() {
    let (state, pantry) = test_state();
    let (soup, salad) = state
        .with_connection(move |conn| {
            let soup = crate::database::fixtures::recipe(conn, &pantry, "Tomato Soup");
            let salad = crate::database::fixtures::recipe(conn, &pantry, "Tomato Salad");
            let step = recipes::add_direction(
                conn,
                soup.id,
                &DirectionForm {
                    text: "Simmer".into(),
                    order: None,
                },
            )?;
            Ok(((soup.id, step.id, pantry.salt.id), salad.id))
        })
        .await
        .unwrap();
    let (_, step, salt) = soup;

    let (status, body) = send_json(
        &state,
        "POST",
        &format!("/admin/recipes/{salad}/ingredients"),
        Some(json!({"food": salt, "direction": step})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid");
}
