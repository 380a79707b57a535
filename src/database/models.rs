// Copyright 2023 Remi Bernotavicius

use derive_more::{Display, From};
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::Insertable;
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use serde::{Deserialize, Serialize};

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(table_name = crate::database::schema::sources)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub url: String,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct CategoryId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(table_name = crate::database::schema::categories)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub order_index: Option<i32>,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct FoodGroupId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(table_name = crate::database::schema::food_groups)]
pub struct FoodGroup {
    pub id: FoodGroupId,
    pub name: String,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct FoodId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(belongs_to(FoodGroup, foreign_key = group_id))]
#[diesel(table_name = crate::database::schema::foods)]
pub struct Food {
    pub id: FoodId,
    pub name: String,
    pub name_sorted: String,
    pub group_id: FoodGroupId,
    pub name_plural: Option<String>,
    pub detail: String,
}

#[derive(
    Debug, Display, Hash, Copy, Clone, PartialEq, Eq, DbEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    #[display("other")]
    Other,
    #[display("mass")]
    Mass,
    #[display("volume")]
    Volume,
}

#[derive(
    Debug, Display, Hash, Copy, Clone, PartialEq, Eq, DbEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[display("SI")]
    Si,
    #[display("imperial")]
    Imperial,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(i32);

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(table_name = crate::database::schema::units)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub name_abbrev: String,
    pub plural_abbrev: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub system: Option<UnitSystem>,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct RecipeId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(belongs_to(Category, foreign_key = category_id))]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub slug: String,
    pub prep_time: String,
    pub ctime: chrono::NaiveDateTime,
    pub mtime: chrono::NaiveDateTime,
    pub category_id: CategoryId,
    pub serving_value: Option<i32>,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Insertable, Clone, Debug)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Source))]
#[diesel(primary_key(recipe_id, source_id))]
#[diesel(table_name = crate::database::schema::recipes_sources)]
pub struct RecipeSource {
    pub recipe_id: RecipeId,
    pub source_id: SourceId,
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct DirectionId(i32);

/// One step of a recipe's preparation. `order` is the step's position among
/// the recipe's other directions.
#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::directions)]
pub struct Direction {
    pub id: DirectionId,
    pub text: String,
    pub recipe_id: RecipeId,
    pub order: Option<i32>,
}

impl Direction {
    /// Short label used in listings, the first 40 characters of the text.
    pub fn label(&self) -> String {
        let mut chars = self.text.chars();
        let mut label: String = chars.by_ref().take(40).collect();
        if chars.next().is_some() {
            label += "...";
        }
        label
    }
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct IngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Direction))]
#[diesel(belongs_to(Food))]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub amount: Option<f64>,
    pub unit_id: Option<UnitId>,
    pub recipe_id: RecipeId,
    pub food_id: FoodId,
    pub order_index: Option<i32>,
    pub direction_id: Option<DirectionId>,
}

impl Ingredient {
    /// The food's plural name is used unless the amount is exactly one. An
    /// ingredient without an amount counts as "not one".
    pub fn formatted_food<'a>(&self, food: &'a Food) -> &'a str {
        match food.name_plural.as_deref() {
            Some(plural) if !plural.is_empty() && self.amount != Some(1.0) => plural,
            _ => &food.name,
        }
    }
}

#[derive(
    DieselNewType,
    Debug,
    Display,
    From,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Copy,
    Clone,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PhotoId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::photos)]
pub struct Photo {
    pub id: PhotoId,
    pub caption: String,
    pub recipe_id: RecipeId,
    pub image: String,
    pub keep: bool,
}

#[cfg(test)]
fn food(plural: Option<&str>) -> Food {
    Food {
        id: FoodId(1),
        name: "tomato".into(),
        name_sorted: "tomato".into(),
        group_id: FoodGroupId(1),
        name_plural: plural.map(Into::into),
        detail: String::new(),
    }
}

#[cfg(test)]
fn ingredient(amount: Option<f64>) -> Ingredient {
    Ingredient {
        id: IngredientId(1),
        amount,
        unit_id: None,
        recipe_id: RecipeId(1),
        food_id: FoodId(1),
        order_index: Some(0),
        direction_id: None,
    }
}

#[test]
fn formatted_food_plural() {
    let tomato = food(Some("tomatoes"));
    assert_eq!(ingredient(Some(2.0)).formatted_food(&tomato), "tomatoes");
    assert_eq!(ingredient(Some(0.5)).formatted_food(&tomato), "tomatoes");
    assert_eq!(ingredient(Some(0.0)).formatted_food(&tomato), "tomatoes");
}

#[test]
fn formatted_food_singular() {
    let tomato = food(Some("tomatoes"));
    assert_eq!(ingredient(Some(1.0)).formatted_food(&tomato), "tomato");

    let empty_plural = food(Some(""));
    assert_eq!(ingredient(Some(3.0)).formatted_food(&empty_plural), "tomato");

    let no_plural = food(None);
    assert_eq!(ingredient(Some(3.0)).formatted_food(&no_plural), "tomato");
    assert_eq!(ingredient(None).formatted_food(&no_plural), "tomato");
}

#[test]
fn formatted_food_without_amount_is_plural() {
    let tomato = food(Some("tomatoes"));
    assert_eq!(ingredient(None).formatted_food(&tomato), "tomatoes");
}

#[test]
fn direction_label_truncates() {
    let mut direction = Direction {
        id: DirectionId(1),
        text: "Stir".into(),
        recipe_id: RecipeId(1),
        order: Some(0),
    };
    assert_eq!(direction.label(), "Stir");

    direction.text = "x".repeat(41);
    assert_eq!(direction.label(), format!("{}...", "x".repeat(40)));
}
