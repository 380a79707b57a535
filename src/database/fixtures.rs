// Copyright 2023 Remi Bernotavicius

//! A small stocked kitchen for tests, backed by an in-memory database.

use crate::database;
use crate::database::forms::{CategoryForm, FoodForm, FoodGroupForm, RecipeForm, UnitForm};
use crate::database::models::{Category, Food, FoodGroup, Recipe, Unit, UnitSystem, UnitType};
use crate::database::query::{add_category, add_food, add_food_group, add_unit};
use crate::database::recipes::add_recipe;

pub fn connection() -> database::Connection {
    database::establish_connection(":memory:").unwrap()
}

pub struct Pantry {
    pub category: Category,
    pub group: FoodGroup,
    pub tomato: Food,
    pub salt: Food,
    pub flour: Food,
    pub cup: Unit,
    pub teaspoon: Unit,
    pub gram: Unit,
}

fn food(
    conn: &mut database::Connection,
    group: &FoodGroup,
    name: &str,
    name_plural: Option<&str>,
) -> Food {
    add_food(
        conn,
        &FoodForm {
            name: name.into(),
            name_sorted: name.into(),
            group: group.id,
            name_plural: name_plural.map(Into::into),
            detail: String::new(),
        },
    )
    .unwrap()
}

fn unit(
    conn: &mut database::Connection,
    name: &str,
    abbrev: &str,
    unit_type: UnitType,
    system: UnitSystem,
) -> Unit {
    add_unit(
        conn,
        &UnitForm {
            name: name.into(),
            name_abbrev: abbrev.into(),
            plural_abbrev: abbrev.into(),
            unit_type,
            system: Some(system),
        },
    )
    .unwrap()
}

pub fn stock(conn: &mut database::Connection) -> Pantry {
    let mut category = CategoryForm {
        name: "Soups".into(),
        slug: String::new(),
        order_index: Some(0),
    };
    category.validate().unwrap();
    let category = add_category(conn, &category).unwrap();
    let group = add_food_group(
        conn,
        &FoodGroupForm {
            name: "Pantry".into(),
        },
    )
    .unwrap();

    Pantry {
        tomato: food(conn, &group, "tomato", Some("tomatoes")),
        salt: food(conn, &group, "salt", None),
        flour: food(conn, &group, "flour", None),
        cup: unit(conn, "cup", "c", UnitType::Volume, UnitSystem::Imperial),
        teaspoon: unit(conn, "teaspoon", "tsp", UnitType::Volume, UnitSystem::Imperial),
        gram: unit(conn, "gram", "g", UnitType::Mass, UnitSystem::Si),
        category,
        group,
    }
}

pub fn recipe(conn: &mut database::Connection, pantry: &Pantry, title: &str) -> Recipe {
    let mut form = RecipeForm {
        title: title.into(),
        summary: format!("A simple {}", title.to_lowercase()),
        description: String::new(),
        slug: String::new(),
        prep_time: "30 minutes".into(),
        category: pantry.category.id,
        sources: vec![],
        serving_value: Some(4),
    };
    form.validate().unwrap();
    add_recipe(conn, &form).unwrap()
}
