// Copyright 2023 Remi Bernotavicius

//! Recipes and the rows that hang off them: source links, directions,
//! ingredients and photos.
//!
//! `Direction.order` and `Ingredient.order_index` are positions among
//! siblings. Inserting at a position shifts the siblings above it up by one,
//! removing a row closes its gap. Shifts go through negative values so the
//! unique (parent, position) constraint holds after every statement.

use crate::database;
use crate::database::forms::{DirectionForm, IngredientForm, PhotoForm, RecipeForm};
use crate::database::models::{
    Direction, DirectionId, Food, Ingredient, IngredientId, Photo, PhotoId, Recipe, RecipeId,
    RecipeSource, SourceId, Unit,
};
use crate::database::query::{deleted, found};
use crate::database::schema::ingredients;
use crate::{Error, Result};
use diesel::associations::GroupedBy as _;
use diesel::prelude::Connection as _;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use diesel::BelongingToDsl as _;
use diesel::BoxableExpression;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Deserialize;

pub const PAGE_SIZE: i64 = 100;

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct RecipeFilter {
    /// Substring of the title, summary or description.
    pub q: Option<String>,
    pub source: Option<SourceId>,
}

pub fn list_recipes(conn: &mut database::Connection, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
    use database::schema::recipes::dsl::*;
    use database::schema::recipes_sources;
    use diesel::BoolExpressionMethods as _;
    use diesel::TextExpressionMethods as _;

    let mut query = recipes
        .select(Recipe::as_select())
        .order_by((title.asc(), id.asc()))
        .into_boxed();
    if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{q}%");
        query = query.filter(
            title
                .like(pattern.clone())
                .or(summary.like(pattern.clone()))
                .or(description.like(pattern)),
        );
    }
    if let Some(source) = filter.source {
        query = query.filter(
            id.eq_any(
                recipes_sources::table
                    .filter(recipes_sources::source_id.eq(source))
                    .select(recipes_sources::recipe_id),
            ),
        );
    }
    Ok(query.load(conn)?)
}

/// One page of recipes ordered by title. Pages start at 1; a page whose
/// offset can't be represented doesn't exist.
pub fn recipe_page(conn: &mut database::Connection, page: i64) -> Result<Vec<Recipe>> {
    use database::schema::recipes::dsl::*;

    let offset = page
        .checked_sub(1)
        .filter(|p| *p >= 0)
        .and_then(|p| p.checked_mul(PAGE_SIZE))
        .ok_or_else(|| Error::not_found(format_args!("page {page}")))?;
    Ok(recipes
        .select(Recipe::as_select())
        .order_by((title.asc(), id.asc()))
        .limit(PAGE_SIZE)
        .offset(offset)
        .load(conn)?)
}

pub fn count_recipes(conn: &mut database::Connection) -> Result<i64> {
    use database::schema::recipes::dsl::*;

    Ok(recipes.count().get_result(conn)?)
}

pub fn get_recipe(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    let recipe = recipes
        .find(recipe_id)
        .select(Recipe::as_select())
        .get_result(conn)
        .optional()?;
    found(recipe, format_args!("recipe {recipe_id}"))
}

pub fn get_recipe_by_slug(conn: &mut database::Connection, recipe_slug: &str) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    let recipe = recipes
        .filter(slug.eq(recipe_slug))
        .select(Recipe::as_select())
        .get_result(conn)
        .optional()?;
    found(recipe, format_args!("recipe {recipe_slug:?}"))
}

pub fn recipe_sources(conn: &mut database::Connection, recipe: RecipeId) -> Result<Vec<SourceId>> {
    use database::schema::recipes_sources::dsl::*;

    Ok(recipes_sources
        .filter(recipe_id.eq(recipe))
        .select(source_id)
        .order_by(source_id.asc())
        .load(conn)?)
}

/// Every recipe with the ids of its sources, loaded in two queries.
pub fn recipes_with_sources(
    conn: &mut database::Connection,
) -> Result<Vec<(Recipe, Vec<SourceId>)>> {
    use database::schema::recipes_sources;

    let all_recipes = list_recipes(conn, &RecipeFilter::default())?;
    let links = RecipeSource::belonging_to(&all_recipes)
        .select(RecipeSource::as_select())
        .order_by(recipes_sources::source_id.asc())
        .load(conn)?;

    Ok(links
        .grouped_by(&all_recipes)
        .into_iter()
        .zip(all_recipes)
        .map(|(links, recipe)| (recipe, links.into_iter().map(|l| l.source_id).collect()))
        .collect())
}

fn link_sources(
    conn: &mut database::Connection,
    recipe: RecipeId,
    source_ids: &[SourceId],
) -> Result<()> {
    use database::schema::recipes_sources::dsl::*;
    use diesel::{delete, insert_into};

    delete(recipes_sources.filter(recipe_id.eq(recipe))).execute(conn)?;
    if source_ids.is_empty() {
        return Ok(());
    }

    let links: Vec<_> = source_ids
        .iter()
        .map(|&source| RecipeSource {
            recipe_id: recipe,
            source_id: source,
        })
        .collect();
    insert_into(recipes_sources).values(&links).execute(conn)?;
    Ok(())
}

/// Stores a new recipe. `ctime` and `mtime` are both set to now.
pub fn add_recipe(conn: &mut database::Connection, form: &RecipeForm) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;
    use diesel::insert_into;

    conn.transaction(|conn| {
        let timestamp = now();
        let recipe = insert_into(recipes)
            .values((
                title.eq(&form.title),
                summary.eq(&form.summary),
                description.eq(&form.description),
                slug.eq(&form.slug),
                prep_time.eq(&form.prep_time),
                ctime.eq(timestamp),
                mtime.eq(timestamp),
                category_id.eq(form.category),
                serving_value.eq(form.serving_value),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)?;
        link_sources(conn, recipe.id, &form.sources)?;
        Ok(recipe)
    })
}

/// Saves every field of the form. `mtime` moves to now on every save, whether
/// or not anything else changed.
pub fn edit_recipe(
    conn: &mut database::Connection,
    id_to_edit: RecipeId,
    form: &RecipeForm,
) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    conn.transaction(|conn| {
        let recipe = update(recipes.find(id_to_edit))
            .set((
                title.eq(&form.title),
                summary.eq(&form.summary),
                description.eq(&form.description),
                slug.eq(&form.slug),
                prep_time.eq(&form.prep_time),
                mtime.eq(now()),
                category_id.eq(form.category),
                serving_value.eq(form.serving_value),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)
            .optional()?;
        let recipe = found(recipe, format_args!("recipe {id_to_edit}"))?;
        link_sources(conn, recipe.id, &form.sources)?;
        Ok(recipe)
    })
}

/// Removes the recipe along with its directions, ingredients, photos and
/// source links.
pub fn delete_recipe(conn: &mut database::Connection, delete_id: RecipeId) -> Result<()> {
    use database::schema::recipes::dsl::*;
    use diesel::delete;

    let count = delete(recipes.find(delete_id)).execute(conn)?;
    deleted(count, format_args!("recipe {delete_id}"))
}

pub fn list_directions(conn: &mut database::Connection, recipe: RecipeId) -> Result<Vec<Direction>> {
    use database::schema::directions::dsl::*;

    Ok(directions
        .filter(recipe_id.eq(recipe))
        .select(Direction::as_select())
        .order_by((order.asc(), id.asc()))
        .load(conn)?)
}

pub fn get_direction(conn: &mut database::Connection, direction_id: DirectionId) -> Result<Direction> {
    use database::schema::directions::dsl::*;

    let direction = directions
        .find(direction_id)
        .select(Direction::as_select())
        .get_result(conn)
        .optional()?;
    found(direction, format_args!("direction {direction_id}"))
}

fn next_direction_position(conn: &mut database::Connection, recipe: RecipeId) -> Result<i32> {
    use database::schema::directions::dsl::*;
    use diesel::dsl::max;

    let last: Option<i32> = directions
        .filter(recipe_id.eq(recipe))
        .select(max(order))
        .get_result(conn)?;
    Ok(last.map_or(0, |p| p + 1))
}

fn open_direction_slot(
    conn: &mut database::Connection,
    recipe: RecipeId,
    position: i32,
) -> Result<()> {
    use database::schema::directions::dsl::*;
    use diesel::update;

    update(directions)
        .filter(recipe_id.eq(recipe))
        .filter(order.ge(position))
        .set(order.eq(order * -1 - 1))
        .execute(conn)?;
    update(directions)
        .filter(recipe_id.eq(recipe))
        .filter(order.lt(0))
        .set(order.eq(order * -1))
        .execute(conn)?;
    Ok(())
}

fn close_direction_slot(
    conn: &mut database::Connection,
    recipe: RecipeId,
    position: i32,
) -> Result<()> {
    use database::schema::directions::dsl::*;
    use diesel::update;

    update(directions)
        .filter(recipe_id.eq(recipe))
        .filter(order.gt(position))
        .set(order.eq(order * -1 + 1))
        .execute(conn)?;
    update(directions)
        .filter(recipe_id.eq(recipe))
        .filter(order.lt(0))
        .set(order.eq(order * -1))
        .execute(conn)?;
    Ok(())
}

/// Without an `order` the direction goes last. Otherwise it is placed at that
/// position (clamped to the end) and the later directions move down a step.
pub fn add_direction(
    conn: &mut database::Connection,
    recipe: RecipeId,
    form: &DirectionForm,
) -> Result<Direction> {
    use database::schema::directions::dsl::*;
    use diesel::insert_into;

    conn.transaction(|conn| {
        get_recipe(conn, recipe)?;
        let end = next_direction_position(conn, recipe)?;
        let position = form.order.map_or(end, |p| p.clamp(0, end));
        open_direction_slot(conn, recipe, position)?;

        Ok(insert_into(directions)
            .values((
                text.eq(&form.text),
                recipe_id.eq(recipe),
                order.eq(position),
            ))
            .returning(Direction::as_returning())
            .get_result(conn)?)
    })
}

pub fn edit_direction(
    conn: &mut database::Connection,
    id_to_edit: DirectionId,
    form: &DirectionForm,
) -> Result<Direction> {
    use database::schema::directions::dsl::*;
    use diesel::update;

    conn.transaction(|conn| {
        let current = get_direction(conn, id_to_edit)?;
        update(directions.find(id_to_edit))
            .set(text.eq(&form.text))
            .execute(conn)?;

        if let Some(requested) = form.order.filter(|&p| Some(p) != current.order) {
            update(directions.find(id_to_edit))
                .set(order.eq(None::<i32>))
                .execute(conn)?;
            if let Some(old) = current.order {
                close_direction_slot(conn, current.recipe_id, old)?;
            }
            let end = next_direction_position(conn, current.recipe_id)?;
            let position = requested.clamp(0, end);
            open_direction_slot(conn, current.recipe_id, position)?;
            update(directions.find(id_to_edit))
                .set(order.eq(position))
                .execute(conn)?;
        }
        get_direction(conn, id_to_edit)
    })
}

/// Deletes the direction and its ingredients, closing the gap it leaves.
pub fn delete_direction(conn: &mut database::Connection, delete_id: DirectionId) -> Result<()> {
    use database::schema::directions::dsl::*;
    use diesel::delete;

    conn.transaction(|conn| {
        let current = get_direction(conn, delete_id)?;
        delete(directions.find(delete_id)).execute(conn)?;
        if let Some(old) = current.order {
            close_direction_slot(conn, current.recipe_id, old)?;
        }
        log::debug!(
            "deleted direction {:?} of recipe {}",
            current.label(),
            current.recipe_id
        );
        Ok(())
    })
}

/// Ingredients of a recipe (or of every recipe) ordered by direction,
/// position, then id.
pub fn list_ingredients(
    conn: &mut database::Connection,
    recipe: Option<RecipeId>,
) -> Result<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;

    let mut query = ingredients
        .select(Ingredient::as_select())
        .order_by((direction_id.asc(), order_index.asc(), id.asc()))
        .into_boxed();
    if let Some(recipe) = recipe {
        query = query.filter(recipe_id.eq(recipe));
    }
    Ok(query.load(conn)?)
}

pub fn get_ingredient(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;

    let ingredient = ingredients
        .find(ingredient_id)
        .select(Ingredient::as_select())
        .get_result(conn)
        .optional()?;
    found(ingredient, format_args!("ingredient {ingredient_id}"))
}

pub(crate) type IngredientFilter =
    Box<dyn BoxableExpression<ingredients::table, Sqlite, SqlType = Bool>>;

/// Ingredients sharing a direction are siblings. Ingredients without a
/// direction are siblings of the others in the same recipe without one.
fn ingredient_siblings(recipe: RecipeId, direction: Option<DirectionId>) -> IngredientFilter {
    use database::schema::ingredients::dsl::*;
    use diesel::BoolExpressionMethods as _;
    use diesel::NullableExpressionMethods as _;

    match direction {
        Some(d) => Box::new(
            recipe_id
                .eq(recipe)
                .and(direction_id.assume_not_null().eq(d)),
        ),
        None => Box::new(recipe_id.eq(recipe).and(direction_id.is_null())),
    }
}

fn next_ingredient_position(
    conn: &mut database::Connection,
    recipe: RecipeId,
    direction: Option<DirectionId>,
) -> Result<i32> {
    use database::schema::ingredients::dsl::*;
    use diesel::dsl::max;

    let last: Option<i32> = ingredients
        .filter(ingredient_siblings(recipe, direction))
        .select(max(order_index))
        .get_result(conn)?;
    Ok(last.map_or(0, |p| p + 1))
}

fn open_ingredient_slot(
    conn: &mut database::Connection,
    recipe: RecipeId,
    direction: Option<DirectionId>,
    position: i32,
) -> Result<()> {
    use database::schema::ingredients::dsl::*;
    use diesel::update;

    update(ingredients)
        .filter(ingredient_siblings(recipe, direction))
        .filter(order_index.ge(position))
        .set(order_index.eq(order_index * -1 - 1))
        .execute(conn)?;
    update(ingredients)
        .filter(ingredient_siblings(recipe, direction))
        .filter(order_index.lt(0))
        .set(order_index.eq(order_index * -1))
        .execute(conn)?;
    Ok(())
}

fn close_ingredient_slot(
    conn: &mut database::Connection,
    recipe: RecipeId,
    direction: Option<DirectionId>,
    position: i32,
) -> Result<()> {
    use database::schema::ingredients::dsl::*;
    use diesel::update;

    update(ingredients)
        .filter(ingredient_siblings(recipe, direction))
        .filter(order_index.gt(position))
        .set(order_index.eq(order_index * -1 + 1))
        .execute(conn)?;
    update(ingredients)
        .filter(ingredient_siblings(recipe, direction))
        .filter(order_index.lt(0))
        .set(order_index.eq(order_index * -1))
        .execute(conn)?;
    Ok(())
}

/// Renumbers a sibling group to 0..n keeping its current order. Rows only
/// ever move down, into positions already vacated.
fn compact_ingredient_positions(
    conn: &mut database::Connection,
    recipe: RecipeId,
    direction: Option<DirectionId>,
) -> Result<()> {
    use database::schema::ingredients::dsl::*;
    use diesel::update;

    let siblings: Vec<(IngredientId, Option<i32>)> = ingredients
        .filter(ingredient_siblings(recipe, direction))
        .filter(order_index.is_not_null())
        .select((id, order_index))
        .order_by((order_index.asc(), id.asc()))
        .load(conn)?;
    for (position, (sibling, current)) in (0..).zip(siblings) {
        if current != Some(position) {
            update(ingredients.find(sibling))
                .set(order_index.eq(position))
                .execute(conn)?;
        }
    }
    Ok(())
}

/// Runs `delete_rows`, which removes ingredients matching `affected` through
/// `ON DELETE CASCADE`, then closes the gaps left in each sibling group.
pub(crate) fn delete_cascading_to_ingredients(
    conn: &mut database::Connection,
    affected: IngredientFilter,
    delete_rows: impl FnOnce(&mut database::Connection) -> Result<()>,
) -> Result<()> {
    use database::schema::ingredients::dsl::*;

    conn.transaction(|conn| {
        let groups: Vec<(RecipeId, Option<DirectionId>)> = ingredients
            .filter(affected)
            .select((recipe_id, direction_id))
            .distinct()
            .load(conn)?;
        delete_rows(conn)?;
        for (recipe, direction) in groups {
            compact_ingredient_positions(conn, recipe, direction)?;
        }
        Ok(())
    })
}

/// An ingredient may only be attached to one of its own recipe's directions.
fn check_direction(
    conn: &mut database::Connection,
    recipe: RecipeId,
    direction: Option<DirectionId>,
) -> Result<()> {
    let Some(direction) = direction else {
        return Ok(());
    };
    match get_direction(conn, direction) {
        Ok(d) if d.recipe_id == recipe => Ok(()),
        Ok(_) => Err(Error::Invalid(format!(
            "direction {direction} belongs to another recipe"
        ))),
        Err(Error::NotFound(_)) => Err(Error::Invalid(format!(
            "direction {direction} does not exist"
        ))),
        Err(e) => Err(e),
    }
}

pub fn add_ingredient(
    conn: &mut database::Connection,
    recipe: RecipeId,
    form: &IngredientForm,
) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;
    use diesel::insert_into;

    conn.transaction(|conn| {
        get_recipe(conn, recipe)?;
        check_direction(conn, recipe, form.direction)?;
        let end = next_ingredient_position(conn, recipe, form.direction)?;
        let position = form.order_index.map_or(end, |p| p.clamp(0, end));
        open_ingredient_slot(conn, recipe, form.direction, position)?;

        Ok(insert_into(ingredients)
            .values((
                amount.eq(form.amount),
                unit_id.eq(form.unit),
                recipe_id.eq(recipe),
                food_id.eq(form.food),
                order_index.eq(position),
                direction_id.eq(form.direction),
            ))
            .returning(Ingredient::as_returning())
            .get_result(conn)?)
    })
}

/// Moving an ingredient to another direction appends it there unless an
/// `order_index` is given.
pub fn edit_ingredient(
    conn: &mut database::Connection,
    id_to_edit: IngredientId,
    form: &IngredientForm,
) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;
    use diesel::update;

    conn.transaction(|conn| {
        let current = get_ingredient(conn, id_to_edit)?;
        check_direction(conn, current.recipe_id, form.direction)?;
        update(ingredients.find(id_to_edit))
            .set((
                amount.eq(form.amount),
                unit_id.eq(form.unit),
                food_id.eq(form.food),
            ))
            .execute(conn)?;

        let moved = form.direction != current.direction_id;
        let repositioned = form
            .order_index
            .is_some_and(|p| Some(p) != current.order_index);
        if moved || repositioned {
            update(ingredients.find(id_to_edit))
                .set(order_index.eq(None::<i32>))
                .execute(conn)?;
            if let Some(old) = current.order_index {
                close_ingredient_slot(conn, current.recipe_id, current.direction_id, old)?;
            }
            let end = next_ingredient_position(conn, current.recipe_id, form.direction)?;
            let position = form.order_index.map_or(end, |p| p.clamp(0, end));
            open_ingredient_slot(conn, current.recipe_id, form.direction, position)?;
            update(ingredients.find(id_to_edit))
                .set((direction_id.eq(form.direction), order_index.eq(position)))
                .execute(conn)?;
        }
        get_ingredient(conn, id_to_edit)
    })
}

pub fn delete_ingredient(conn: &mut database::Connection, delete_id: IngredientId) -> Result<()> {
    use database::schema::ingredients::dsl::*;
    use diesel::delete;

    conn.transaction(|conn| {
        let current = get_ingredient(conn, delete_id)?;
        delete(ingredients.find(delete_id)).execute(conn)?;
        if let Some(old) = current.order_index {
            close_ingredient_slot(conn, current.recipe_id, current.direction_id, old)?;
        }
        Ok(())
    })
}

pub struct DirectionWithIngredients {
    pub direction: Direction,
    pub ingredients: Vec<(Ingredient, Food, Option<Unit>)>,
}

/// A recipe's directions in order, each with its ingredients and their foods
/// and units. Two queries regardless of how many directions there are.
pub fn directions_with_ingredients(
    conn: &mut database::Connection,
    recipe: RecipeId,
) -> Result<Vec<DirectionWithIngredients>> {
    use database::schema::{foods, units};

    let recipe_directions = list_directions(conn, recipe)?;
    let rows: Vec<(Ingredient, (Food, Option<Unit>))> =
        Ingredient::belonging_to(&recipe_directions)
            .inner_join(foods::table)
            .left_join(units::table)
            .select((
                Ingredient::as_select(),
                (Food::as_select(), Option::<Unit>::as_select()),
            ))
            .order_by((ingredients::order_index.asc(), ingredients::id.asc()))
            .load(conn)?;

    Ok(rows
        .grouped_by(&recipe_directions)
        .into_iter()
        .zip(recipe_directions)
        .map(|(rows, direction)| DirectionWithIngredients {
            direction,
            ingredients: rows
                .into_iter()
                .map(|(ingredient, (food, unit))| (ingredient, food, unit))
                .collect(),
        })
        .collect())
}

pub fn list_photos(conn: &mut database::Connection, recipe: Option<RecipeId>) -> Result<Vec<Photo>> {
    use database::schema::photos::dsl::*;

    let mut query = photos
        .select(Photo::as_select())
        .order_by(id.asc())
        .into_boxed();
    if let Some(recipe) = recipe {
        query = query.filter(recipe_id.eq(recipe));
    }
    Ok(query.load(conn)?)
}

pub fn get_photo(conn: &mut database::Connection, photo_id: PhotoId) -> Result<Photo> {
    use database::schema::photos::dsl::*;

    let photo = photos
        .find(photo_id)
        .select(Photo::as_select())
        .get_result(conn)
        .optional()?;
    found(photo, format_args!("photo {photo_id}"))
}

pub fn add_photo(
    conn: &mut database::Connection,
    recipe: RecipeId,
    form: &PhotoForm,
) -> Result<Photo> {
    use database::schema::photos::dsl::*;
    use diesel::insert_into;

    conn.transaction(|conn| {
        get_recipe(conn, recipe)?;
        Ok(insert_into(photos)
            .values((
                caption.eq(&form.caption),
                recipe_id.eq(recipe),
                image.eq(&form.image),
                keep.eq(true),
            ))
            .returning(Photo::as_returning())
            .get_result(conn)?)
    })
}

pub fn edit_photo(
    conn: &mut database::Connection,
    id_to_edit: PhotoId,
    form: &PhotoForm,
) -> Result<Photo> {
    use database::schema::photos::dsl::*;
    use diesel::update;

    let photo = update(photos.find(id_to_edit))
        .set((caption.eq(&form.caption), image.eq(&form.image)))
        .returning(Photo::as_returning())
        .get_result(conn)
        .optional()?;
    found(photo, format_args!("photo {id_to_edit}"))
}

pub fn delete_photo(conn: &mut database::Connection, delete_id: PhotoId) -> Result<()> {
    use database::schema::photos::dsl::*;
    use diesel::delete;

    let count = delete(photos.find(delete_id)).execute(conn)?;
    deleted(count, format_args!("photo {delete_id}"))
}

#[cfg(test)]
fn direction_texts(conn: &mut database::Connection, recipe: RecipeId) -> Vec<(String, i32)> {
    list_directions(conn, recipe)
        .unwrap()
        .into_iter()
        .map(|d| (d.text, d.order.unwrap()))
        .collect()
}

#[cfg(test)]
fn step(text: &str, order: Option<i32>) -> DirectionForm {
    DirectionForm {
        text: text.into(),
        order,
    }
}

#[test]
fn every_save_moves_mtime() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let created = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    assert_eq!(created.ctime, created.mtime);

    std::thread::sleep(std::time::Duration::from_millis(10));
    let form = RecipeForm::from_recipe(&created, vec![]);
    let saved = edit_recipe(&mut conn, created.id, &form).unwrap();

    assert_eq!(saved.ctime, created.ctime);
    assert!(saved.mtime > created.mtime);
    assert_eq!(saved.title, created.title);
}

#[test]
fn sources_are_linked_and_replaced() {
    use crate::database::forms::SourceForm;
    use crate::database::query::add_source;

    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    let book = add_source(
        &mut conn,
        &SourceForm {
            name: "Joy of Cooking".into(),
            url: String::new(),
        },
    )
    .unwrap();
    let site = add_source(
        &mut conn,
        &SourceForm {
            name: "Serious Eats".into(),
            url: "https://www.seriouseats.com".into(),
        },
    )
    .unwrap();

    let mut form = RecipeForm::from_recipe(&recipe, vec![book.id, site.id]);
    edit_recipe(&mut conn, recipe.id, &form).unwrap();
    assert_eq!(
        recipe_sources(&mut conn, recipe.id).unwrap(),
        vec![book.id, site.id]
    );

    form.sources = vec![site.id];
    edit_recipe(&mut conn, recipe.id, &form).unwrap();
    let all = recipes_with_sources(&mut conn).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].1, vec![site.id]);

    let filtered = list_recipes(
        &mut conn,
        &RecipeFilter {
            q: None,
            source: Some(book.id),
        },
    )
    .unwrap();
    assert!(filtered.is_empty());
}

#[test]
fn unknown_source_is_invalid() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");

    let form = RecipeForm::from_recipe(&recipe, vec![SourceId::from(99)]);
    let result = edit_recipe(&mut conn, recipe.id, &form);
    assert!(matches!(result, Err(Error::Invalid(_))));
}

#[test]
fn directions_insert_at_position() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");

    add_direction(&mut conn, recipe.id, &step("chop", None)).unwrap();
    add_direction(&mut conn, recipe.id, &step("simmer", None)).unwrap();
    add_direction(&mut conn, recipe.id, &step("wash", Some(0))).unwrap();
    add_direction(&mut conn, recipe.id, &step("serve", Some(10))).unwrap();

    assert_eq!(
        direction_texts(&mut conn, recipe.id),
        [
            ("wash".into(), 0),
            ("chop".into(), 1),
            ("simmer".into(), 2),
            ("serve".into(), 3)
        ]
    );
}

#[test]
fn directions_close_gaps_and_move() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");

    let wash = add_direction(&mut conn, recipe.id, &step("wash", None)).unwrap();
    add_direction(&mut conn, recipe.id, &step("chop", None)).unwrap();
    let simmer = add_direction(&mut conn, recipe.id, &step("simmer", None)).unwrap();
    add_direction(&mut conn, recipe.id, &step("serve", None)).unwrap();

    delete_direction(&mut conn, wash.id).unwrap();
    assert_eq!(
        direction_texts(&mut conn, recipe.id),
        [
            ("chop".into(), 0),
            ("simmer".into(), 1),
            ("serve".into(), 2)
        ]
    );

    let moved = edit_direction(&mut conn, simmer.id, &step("simmer gently", Some(0))).unwrap();
    assert_eq!(moved.order, Some(0));
    assert_eq!(
        direction_texts(&mut conn, recipe.id),
        [
            ("simmer gently".into(), 0),
            ("chop".into(), 1),
            ("serve".into(), 2)
        ]
    );

    edit_direction(&mut conn, simmer.id, &step("simmer gently", Some(2))).unwrap();
    assert_eq!(
        direction_texts(&mut conn, recipe.id),
        [
            ("chop".into(), 0),
            ("serve".into(), 1),
            ("simmer gently".into(), 2)
        ]
    );
}

#[test]
fn ingredients_keep_positions_per_direction() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    let first = add_direction(&mut conn, recipe.id, &step("chop", None)).unwrap();
    let second = add_direction(&mut conn, recipe.id, &step("season", None)).unwrap();

    let form = |direction, order_index| IngredientForm {
        amount: Some(2.0),
        unit: None,
        food: pantry.tomato.id,
        direction,
        order_index,
    };
    let a = add_ingredient(&mut conn, recipe.id, &form(Some(first.id), None)).unwrap();
    let b = add_ingredient(&mut conn, recipe.id, &form(Some(first.id), None)).unwrap();
    let c = add_ingredient(&mut conn, recipe.id, &form(Some(second.id), None)).unwrap();
    let d = add_ingredient(&mut conn, recipe.id, &form(Some(first.id), Some(0))).unwrap();
    assert_eq!(c.order_index, Some(0));
    assert_eq!(d.order_index, Some(0));

    let positions = |conn: &mut database::Connection| -> Vec<(IngredientId, i32)> {
        list_ingredients(conn, Some(recipe.id))
            .unwrap()
            .into_iter()
            .map(|i| (i.id, i.order_index.unwrap()))
            .collect()
    };
    assert_eq!(
        positions(&mut conn),
        [(d.id, 0), (a.id, 1), (b.id, 2), (c.id, 0)]
    );

    edit_ingredient(&mut conn, a.id, &form(Some(second.id), Some(0))).unwrap();
    assert_eq!(
        positions(&mut conn),
        [(d.id, 0), (b.id, 1), (a.id, 0), (c.id, 1)]
    );

    delete_ingredient(&mut conn, d.id).unwrap();
    assert_eq!(positions(&mut conn), [(b.id, 0), (a.id, 0), (c.id, 1)]);
}

#[test]
fn ingredient_direction_must_share_recipe() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let soup = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    let salad = database::fixtures::recipe(&mut conn, &pantry, "Tomato Salad");
    let soup_step = add_direction(&mut conn, soup.id, &step("simmer", None)).unwrap();

    let form = IngredientForm {
        amount: None,
        unit: None,
        food: pantry.salt.id,
        direction: Some(soup_step.id),
        order_index: None,
    };
    let result = add_ingredient(&mut conn, salad.id, &form);
    assert!(matches!(result, Err(Error::Invalid(_))));
}

#[test]
fn directions_with_ingredients_loads_foods_and_units() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    let chop = add_direction(&mut conn, recipe.id, &step("chop", None)).unwrap();
    let season = add_direction(&mut conn, recipe.id, &step("season", Some(0))).unwrap();
    add_ingredient(
        &mut conn,
        recipe.id,
        &IngredientForm {
            amount: Some(3.0),
            unit: None,
            food: pantry.tomato.id,
            direction: Some(chop.id),
            order_index: None,
        },
    )
    .unwrap();
    add_ingredient(
        &mut conn,
        recipe.id,
        &IngredientForm {
            amount: Some(1.0),
            unit: Some(pantry.teaspoon.id),
            food: pantry.salt.id,
            direction: Some(season.id),
            order_index: None,
        },
    )
    .unwrap();

    let loaded = directions_with_ingredients(&mut conn, recipe.id).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].direction.id, season.id);
    let (_, food, unit) = &loaded[0].ingredients[0];
    assert_eq!(food.id, pantry.salt.id);
    assert_eq!(unit.as_ref().map(|u| u.id), Some(pantry.teaspoon.id));

    assert_eq!(loaded[1].direction.id, chop.id);
    let (_, food, unit) = &loaded[1].ingredients[0];
    assert_eq!(food.id, pantry.tomato.id);
    assert!(unit.is_none());
}

#[test]
fn deleting_recipe_removes_children() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    add_direction(&mut conn, recipe.id, &step("chop", None)).unwrap();
    add_photo(
        &mut conn,
        recipe.id,
        &PhotoForm {
            caption: "finished".into(),
            image: "images/soup.jpg".into(),
        },
    )
    .unwrap();

    delete_recipe(&mut conn, recipe.id).unwrap();
    assert!(list_directions(&mut conn, recipe.id).unwrap().is_empty());
    assert!(list_photos(&mut conn, Some(recipe.id)).unwrap().is_empty());
    assert!(matches!(
        delete_recipe(&mut conn, recipe.id),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn recipes_page_by_title() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    for title in ["Tomato Soup", "Apple Pie", "Minestrone"] {
        database::fixtures::recipe(&mut conn, &pantry, title);
    }

    let titles: Vec<_> = recipe_page(&mut conn, 1)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, ["Apple Pie", "Minestrone", "Tomato Soup"]);
    assert!(recipe_page(&mut conn, 2).unwrap().is_empty());
    for page in [0, -3, i64::MAX, i64::MIN] {
        assert!(matches!(
            recipe_page(&mut conn, page),
            Err(Error::NotFound(_))
        ));
    }
    assert_eq!(count_recipes(&mut conn).unwrap(), 3);

    let found = list_recipes(
        &mut conn,
        &RecipeFilter {
            q: Some("pie".into()),
            source: None,
        },
    )
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        get_recipe_by_slug(&mut conn, "apple-pie").unwrap().id,
        found[0].id
    );
}
