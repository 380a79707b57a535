// Copyright 2023 Remi Bernotavicius

//! Catalog entities: sources, categories, food groups, foods and units.

use crate::database;
use crate::database::forms::{CategoryForm, FoodForm, FoodGroupForm, SourceForm, UnitForm};
use crate::database::recipes::delete_cascading_to_ingredients;
use crate::database::models::{
    Category, CategoryId, Food, FoodGroup, FoodGroupId, FoodId, Source, SourceId, Unit, UnitId,
};
use crate::{Error, Result};
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Deserialize;
use std::fmt;

pub(crate) fn found<T>(row: Option<T>, what: impl fmt::Display) -> Result<T> {
    row.ok_or_else(|| Error::not_found(what))
}

pub(crate) fn deleted(count: usize, what: impl fmt::Display) -> Result<()> {
    if count == 0 {
        return Err(Error::not_found(what));
    }
    Ok(())
}

pub fn list_sources(conn: &mut database::Connection) -> Result<Vec<Source>> {
    use database::schema::sources::dsl::*;

    Ok(sources
        .select(Source::as_select())
        .order_by((name.asc(), id.asc()))
        .load(conn)?)
}

pub fn get_source(conn: &mut database::Connection, source_id: SourceId) -> Result<Source> {
    use database::schema::sources::dsl::*;

    let source = sources
        .find(source_id)
        .select(Source::as_select())
        .get_result(conn)
        .optional()?;
    found(source, format_args!("source {source_id}"))
}

pub fn add_source(conn: &mut database::Connection, form: &SourceForm) -> Result<Source> {
    use database::schema::sources::dsl::*;
    use diesel::insert_into;

    Ok(insert_into(sources)
        .values((name.eq(&form.name), url.eq(&form.url)))
        .returning(Source::as_returning())
        .get_result(conn)?)
}

pub fn edit_source(
    conn: &mut database::Connection,
    id_to_edit: SourceId,
    form: &SourceForm,
) -> Result<Source> {
    use database::schema::sources::dsl::*;
    use diesel::update;

    let source = update(sources.find(id_to_edit))
        .set((name.eq(&form.name), url.eq(&form.url)))
        .returning(Source::as_returning())
        .get_result(conn)
        .optional()?;
    found(source, format_args!("source {id_to_edit}"))
}

pub fn delete_source(conn: &mut database::Connection, delete_id: SourceId) -> Result<()> {
    use database::schema::sources::dsl::*;
    use diesel::delete;

    let count = delete(sources.find(delete_id)).execute(conn)?;
    deleted(count, format_args!("source {delete_id}"))
}

/// Categories in display order. Categories without an `order_index` sort first.
pub fn list_categories(conn: &mut database::Connection) -> Result<Vec<Category>> {
    use database::schema::categories::dsl::*;

    Ok(categories
        .select(Category::as_select())
        .order_by((order_index.asc(), id.asc()))
        .load(conn)?)
}

pub fn get_category(conn: &mut database::Connection, category_id: CategoryId) -> Result<Category> {
    use database::schema::categories::dsl::*;

    let category = categories
        .find(category_id)
        .select(Category::as_select())
        .get_result(conn)
        .optional()?;
    found(category, format_args!("category {category_id}"))
}

pub fn add_category(conn: &mut database::Connection, form: &CategoryForm) -> Result<Category> {
    use database::schema::categories::dsl::*;
    use diesel::insert_into;

    Ok(insert_into(categories)
        .values((
            name.eq(&form.name),
            slug.eq(&form.slug),
            order_index.eq(form.order_index),
        ))
        .returning(Category::as_returning())
        .get_result(conn)?)
}

pub fn edit_category(
    conn: &mut database::Connection,
    id_to_edit: CategoryId,
    form: &CategoryForm,
) -> Result<Category> {
    use database::schema::categories::dsl::*;
    use diesel::update;

    let category = update(categories.find(id_to_edit))
        .set((
            name.eq(&form.name),
            slug.eq(&form.slug),
            order_index.eq(form.order_index),
        ))
        .returning(Category::as_returning())
        .get_result(conn)
        .optional()?;
    found(category, format_args!("category {id_to_edit}"))
}

/// Categories that still hold recipes are kept.
pub fn delete_category(conn: &mut database::Connection, delete_id: CategoryId) -> Result<()> {
    let count: i64 = {
        use database::schema::recipes::dsl::*;

        recipes
            .filter(category_id.eq(delete_id))
            .count()
            .get_result(conn)?
    };

    if count > 0 {
        return Err(Error::Invalid(format!(
            "category {delete_id} still has {count} recipe(s)"
        )));
    }

    use database::schema::categories::dsl::*;
    use diesel::delete;

    let count = delete(categories.find(delete_id)).execute(conn)?;
    deleted(count, format_args!("category {delete_id}"))
}

pub fn list_food_groups(conn: &mut database::Connection) -> Result<Vec<FoodGroup>> {
    use database::schema::food_groups::dsl::*;

    Ok(food_groups
        .select(FoodGroup::as_select())
        .order_by((name.asc(), id.asc()))
        .load(conn)?)
}

pub fn get_food_group(
    conn: &mut database::Connection,
    group_id: FoodGroupId,
) -> Result<FoodGroup> {
    use database::schema::food_groups::dsl::*;

    let group = food_groups
        .find(group_id)
        .select(FoodGroup::as_select())
        .get_result(conn)
        .optional()?;
    found(group, format_args!("food group {group_id}"))
}

pub fn add_food_group(conn: &mut database::Connection, form: &FoodGroupForm) -> Result<FoodGroup> {
    use database::schema::food_groups::dsl::*;
    use diesel::insert_into;

    Ok(insert_into(food_groups)
        .values(name.eq(&form.name))
        .returning(FoodGroup::as_returning())
        .get_result(conn)?)
}

pub fn edit_food_group(
    conn: &mut database::Connection,
    id_to_edit: FoodGroupId,
    form: &FoodGroupForm,
) -> Result<FoodGroup> {
    use database::schema::food_groups::dsl::*;
    use diesel::update;

    let group = update(food_groups.find(id_to_edit))
        .set(name.eq(&form.name))
        .returning(FoodGroup::as_returning())
        .get_result(conn)
        .optional()?;
    found(group, format_args!("food group {id_to_edit}"))
}

/// Deleting a food group deletes its foods and every ingredient using them.
pub fn delete_food_group(conn: &mut database::Connection, delete_id: FoodGroupId) -> Result<()> {
    use database::schema::food_groups::dsl::*;
    use database::schema::{foods, ingredients};
    use diesel::delete;

    let affected = Box::new(
        ingredients::food_id.eq_any(
            foods::table
                .filter(foods::group_id.eq(delete_id))
                .select(foods::id),
        ),
    );
    delete_cascading_to_ingredients(conn, affected, |conn| {
        let count = delete(food_groups.find(delete_id)).execute(conn)?;
        deleted(count, format_args!("food group {delete_id}"))
    })
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct FoodFilter {
    /// Substring of the food's name.
    pub q: Option<String>,
    pub group: Option<FoodGroupId>,
}

/// Foods ordered by `name_sorted`.
pub fn list_foods(conn: &mut database::Connection, filter: &FoodFilter) -> Result<Vec<Food>> {
    use database::schema::foods::dsl::*;
    use diesel::TextExpressionMethods as _;

    let mut query = foods
        .select(Food::as_select())
        .order_by((name_sorted.asc(), id.asc()))
        .into_boxed();
    if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
        query = query.filter(name.like(format!("%{q}%")));
    }
    if let Some(group) = filter.group {
        query = query.filter(group_id.eq(group));
    }
    Ok(query.load(conn)?)
}

pub fn get_food(conn: &mut database::Connection, food_id: FoodId) -> Result<Food> {
    use database::schema::foods::dsl::*;

    let food = foods
        .find(food_id)
        .select(Food::as_select())
        .get_result(conn)
        .optional()?;
    found(food, format_args!("food {food_id}"))
}

pub fn add_food(conn: &mut database::Connection, form: &FoodForm) -> Result<Food> {
    use database::schema::foods::dsl::*;
    use diesel::insert_into;

    Ok(insert_into(foods)
        .values((
            name.eq(&form.name),
            name_sorted.eq(&form.name_sorted),
            group_id.eq(form.group),
            name_plural.eq(form.name_plural.as_deref()),
            detail.eq(&form.detail),
        ))
        .returning(Food::as_returning())
        .get_result(conn)?)
}

pub fn edit_food(conn: &mut database::Connection, id_to_edit: FoodId, form: &FoodForm) -> Result<Food> {
    use database::schema::foods::dsl::*;
    use diesel::update;

    let food = update(foods.find(id_to_edit))
        .set((
            name.eq(&form.name),
            name_sorted.eq(&form.name_sorted),
            group_id.eq(form.group),
            name_plural.eq(form.name_plural.as_deref()),
            detail.eq(&form.detail),
        ))
        .returning(Food::as_returning())
        .get_result(conn)
        .optional()?;
    found(food, format_args!("food {id_to_edit}"))
}

/// Also deletes every ingredient using the food.
pub fn delete_food(conn: &mut database::Connection, delete_id: FoodId) -> Result<()> {
    use database::schema::foods::dsl::*;
    use database::schema::ingredients;
    use diesel::delete;

    let affected = Box::new(ingredients::food_id.eq(delete_id));
    delete_cascading_to_ingredients(conn, affected, |conn| {
        let count = delete(foods.find(delete_id)).execute(conn)?;
        deleted(count, format_args!("food {delete_id}"))
    })
}

pub fn list_units(conn: &mut database::Connection) -> Result<Vec<Unit>> {
    use database::schema::units::dsl::*;

    Ok(units
        .select(Unit::as_select())
        .order_by((name.asc(), id.asc()))
        .load(conn)?)
}

pub fn get_unit(conn: &mut database::Connection, unit_id: UnitId) -> Result<Unit> {
    use database::schema::units::dsl::*;

    let unit = units
        .find(unit_id)
        .select(Unit::as_select())
        .get_result(conn)
        .optional()?;
    found(unit, format_args!("unit {unit_id}"))
}

pub fn add_unit(conn: &mut database::Connection, form: &UnitForm) -> Result<Unit> {
    use database::schema::units::dsl::*;
    use diesel::insert_into;

    Ok(insert_into(units)
        .values((
            name.eq(&form.name),
            name_abbrev.eq(&form.name_abbrev),
            plural_abbrev.eq(&form.plural_abbrev),
            unit_type.eq(form.unit_type),
            system.eq(form.system),
        ))
        .returning(Unit::as_returning())
        .get_result(conn)?)
}

pub fn edit_unit(conn: &mut database::Connection, id_to_edit: UnitId, form: &UnitForm) -> Result<Unit> {
    use database::schema::units::dsl::*;
    use diesel::update;

    let unit = update(units.find(id_to_edit))
        .set((
            name.eq(&form.name),
            name_abbrev.eq(&form.name_abbrev),
            plural_abbrev.eq(&form.plural_abbrev),
            unit_type.eq(form.unit_type),
            system.eq(form.system),
        ))
        .returning(Unit::as_returning())
        .get_result(conn)
        .optional()?;
    found(unit, format_args!("unit {id_to_edit}"))
}

/// Also deletes every ingredient measured in the unit.
pub fn delete_unit(conn: &mut database::Connection, delete_id: UnitId) -> Result<()> {
    use database::schema::ingredients;
    use database::schema::units::dsl::*;
    use diesel::delete;
    use diesel::NullableExpressionMethods as _;

    let affected = Box::new(ingredients::unit_id.assume_not_null().eq(delete_id));
    delete_cascading_to_ingredients(conn, affected, |conn| {
        let count = delete(units.find(delete_id)).execute(conn)?;
        deleted(count, format_args!("unit {delete_id}"))
    })
}

#[test]
fn categories_ordered_by_order_index() {
    let mut conn = database::fixtures::connection();
    for (category_name, index) in [("Soups", 2), ("Desserts", 0), ("Mains", 1)] {
        let mut form = CategoryForm {
            name: category_name.into(),
            slug: String::new(),
            order_index: Some(index),
        };
        form.validate().unwrap();
        add_category(&mut conn, &form).unwrap();
    }

    let names: Vec<_> = list_categories(&mut conn)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Desserts", "Mains", "Soups"]);
}

#[test]
fn foods_ordered_by_name_sorted() {
    let mut conn = database::fixtures::connection();
    let group = add_food_group(
        &mut conn,
        &FoodGroupForm {
            name: "Produce".into(),
        },
    )
    .unwrap();
    for (food_name, sorted) in [("red onion", "onion, red"), ("apple", "apple"), ("basil", "basil")] {
        add_food(
            &mut conn,
            &FoodForm {
                name: food_name.into(),
                name_sorted: sorted.into(),
                group: group.id,
                name_plural: None,
                detail: String::new(),
            },
        )
        .unwrap();
    }

    let names: Vec<_> = list_foods(&mut conn, &FoodFilter::default())
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, ["apple", "basil", "red onion"]);

    let filter = FoodFilter {
        q: Some("on".into()),
        group: Some(group.id),
    };
    let names: Vec<_> = list_foods(&mut conn, &filter)
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, ["red onion"]);
}

#[test]
fn category_with_recipes_is_kept() {
    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");

    let result = delete_category(&mut conn, pantry.category.id);
    assert!(matches!(result, Err(Error::Invalid(_))));
    get_category(&mut conn, pantry.category.id).unwrap();
}

#[test]
fn duplicate_unit_name_is_invalid() {
    use crate::database::models::{UnitSystem, UnitType};

    let mut conn = database::fixtures::connection();
    let form = UnitForm {
        name: "cup".into(),
        name_abbrev: "c.".into(),
        plural_abbrev: "c.".into(),
        unit_type: UnitType::Volume,
        system: Some(UnitSystem::Imperial),
    };
    add_unit(&mut conn, &form).unwrap();
    assert!(matches!(add_unit(&mut conn, &form), Err(Error::Invalid(_))));
}

#[test]
fn missing_rows_are_not_found() {
    let mut conn = database::fixtures::connection();
    assert!(matches!(
        get_source(&mut conn, SourceId::from(42)),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        delete_unit(&mut conn, UnitId::from(42)),
        Err(Error::NotFound(_))
    ));
    let form = FoodGroupForm {
        name: "Dairy".into(),
    };
    assert!(matches!(
        edit_food_group(&mut conn, FoodGroupId::from(42), &form),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn cascading_deletes_keep_ingredient_positions_contiguous() {
    use crate::database::forms::{DirectionForm, IngredientForm};
    use crate::database::models::{DirectionId, UnitId};
    use crate::database::recipes::{add_direction, add_ingredient, list_ingredients};

    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Tomato Soup");
    let simmer = add_direction(
        &mut conn,
        recipe.id,
        &DirectionForm {
            text: "Simmer".into(),
            order: None,
        },
    )
    .unwrap();

    let mut add = |food: FoodId, unit: UnitId, direction: Option<DirectionId>| {
        let form = IngredientForm {
            amount: Some(1.0),
            unit: Some(unit),
            food,
            direction,
            order_index: None,
        };
        add_ingredient(&mut conn, recipe.id, &form).unwrap();
    };
    add(pantry.tomato.id, pantry.cup.id, Some(simmer.id));
    add(pantry.salt.id, pantry.teaspoon.id, Some(simmer.id));
    add(pantry.flour.id, pantry.gram.id, Some(simmer.id));
    add(pantry.tomato.id, pantry.cup.id, Some(simmer.id));
    add(pantry.salt.id, pantry.teaspoon.id, None);
    add(pantry.flour.id, pantry.gram.id, None);

    let positions = |conn: &mut database::Connection| -> Vec<(FoodId, Option<DirectionId>, i32)> {
        list_ingredients(conn, Some(recipe.id))
            .unwrap()
            .into_iter()
            .map(|i| (i.food_id, i.direction_id, i.order_index.unwrap()))
            .collect()
    };

    delete_food(&mut conn, pantry.salt.id).unwrap();
    assert_eq!(
        positions(&mut conn),
        [
            (pantry.flour.id, None, 0),
            (pantry.tomato.id, Some(simmer.id), 0),
            (pantry.flour.id, Some(simmer.id), 1),
            (pantry.tomato.id, Some(simmer.id), 2),
        ]
    );

    delete_unit(&mut conn, pantry.cup.id).unwrap();
    assert_eq!(
        positions(&mut conn),
        [
            (pantry.flour.id, None, 0),
            (pantry.flour.id, Some(simmer.id), 0),
        ]
    );

    delete_food_group(&mut conn, pantry.group.id).unwrap();
    assert!(positions(&mut conn).is_empty());
}
