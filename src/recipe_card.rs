// Copyright 2023 Remi Bernotavicius

//! The recipe card is what a cook reads: each direction followed by the
//! ingredients it uses. Scaling for a different number of servings happens
//! here at display time and is never written back to the recipe.

use crate::database;
use crate::database::models::{Recipe, RecipeId};
use crate::database::recipes::directions_with_ingredients;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct IngredientLine {
    pub amount: Option<f64>,
    pub unit: Option<String>,
    pub food: String,
    pub detail: String,
}

/// Amounts print with at most two decimals and no trailing zeros.
pub struct Amount(pub f64);

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = (self.0 * 100.0).round() / 100.0;
        write!(f, "{rounded}")
    }
}

impl fmt::Display for IngredientLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(amount) = self.amount {
            write!(f, "{} ", Amount(amount))?;
        }
        if let Some(unit) = &self.unit {
            write!(f, "{unit} ")?;
        }
        write!(f, "{}", self.food)?;
        if !self.detail.is_empty() {
            write!(f, ", {}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DirectionCard {
    pub text: String,
    pub ingredients: Vec<IngredientLine>,
}

/// The recipe's directions in order, each with its ingredients in order.
/// Ingredients not attached to a direction are left off the card.
pub fn recipe_card(conn: &mut database::Connection, recipe: RecipeId) -> Result<Vec<DirectionCard>> {
    Ok(directions_with_ingredients(conn, recipe)?
        .into_iter()
        .map(|d| DirectionCard {
            text: d.direction.text,
            ingredients: d
                .ingredients
                .iter()
                .map(|(ingredient, food, unit)| IngredientLine {
                    amount: ingredient.amount,
                    unit: unit.as_ref().map(|u| u.name.clone()),
                    food: ingredient.formatted_food(food).to_owned(),
                    detail: food.detail.clone(),
                })
                .collect(),
        })
        .collect())
}

/// Multiplier for a recipe's amounts and servings. Always finite and positive.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    pub const ONE: Self = Self(1.0);

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::Invalid(format!(
                "scale must be a positive number, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::ONE
    }
}

impl FromStr for Scale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| Error::Invalid(format!("scale {s:?} is not a number")))?;
        Self::new(value)
    }
}

pub fn scaled(card: &[DirectionCard], scale: Scale) -> Vec<DirectionCard> {
    card.iter()
        .map(|direction| DirectionCard {
            text: direction.text.clone(),
            ingredients: direction
                .ingredients
                .iter()
                .map(|line| IngredientLine {
                    amount: line.amount.map(|a| a * scale.value()),
                    ..line.clone()
                })
                .collect(),
        })
        .collect()
}

pub fn scaled_servings(recipe: &Recipe, scale: Scale) -> Option<f64> {
    recipe
        .serving_value
        .map(|servings| f64::from(servings) * scale.value())
}

#[cfg(test)]
fn line(amount: Option<f64>, unit: Option<&str>, food: &str) -> IngredientLine {
    IngredientLine {
        amount,
        unit: unit.map(Into::into),
        food: food.into(),
        detail: String::new(),
    }
}

#[test]
fn ingredient_line_display() {
    assert_eq!(
        line(Some(2.0), Some("cup"), "tomatoes").to_string(),
        "2 cup tomatoes"
    );
    assert_eq!(line(None, None, "salt").to_string(), "salt");
    assert_eq!(
        line(Some(1.0 / 3.0), Some("teaspoon"), "salt").to_string(),
        "0.33 teaspoon salt"
    );

    let mut diced = line(Some(1.5), None, "onions");
    diced.detail = "diced".into();
    assert_eq!(diced.to_string(), "1.5 onions, diced");
}

#[test]
fn scale_parsing() {
    assert_eq!("2".parse::<Scale>().unwrap().value(), 2.0);
    assert_eq!(" 0.5 ".parse::<Scale>().unwrap().value(), 0.5);
    for bad in ["0", "-1", "NaN", "inf", "two", ""] {
        assert!(
            matches!(bad.parse::<Scale>(), Err(Error::Invalid(_))),
            "{bad:?} should be rejected"
        );
    }
    assert_eq!(Scale::default(), Scale::ONE);
}

#[test]
fn scaling_multiplies_amounts_only() {
    let card = vec![DirectionCard {
        text: "Chop".into(),
        ingredients: vec![
            line(Some(2.0), Some("cup"), "tomatoes"),
            line(None, None, "salt"),
        ],
    }];

    let doubled = scaled(&card, Scale::new(2.0).unwrap());
    assert_eq!(doubled[0].text, "Chop");
    assert_eq!(doubled[0].ingredients[0].amount, Some(4.0));
    assert_eq!(doubled[0].ingredients[0].food, "tomatoes");
    assert_eq!(doubled[0].ingredients[1].amount, None);
    assert_eq!(card[0].ingredients[0].amount, Some(2.0));
}

#[test]
fn card_follows_positions() {
    use crate::database::forms::{DirectionForm, IngredientForm};
    use crate::database::recipes::{add_direction, add_ingredient, get_recipe};

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
    let chop = add_direction(
        &mut conn,
        recipe.id,
        &DirectionForm {
            text: "Chop".into(),
            order: Some(0),
        },
    )
    .unwrap();
    for (food, amount, unit, direction, order_index) in [
        (pantry.salt.id, Some(1.0), Some(pantry.teaspoon.id), simmer.id, None),
        (pantry.tomato.id, Some(1.0), None, chop.id, None),
        (pantry.tomato.id, Some(3.0), None, simmer.id, Some(0)),
    ] {
        add_ingredient(
            &mut conn,
            recipe.id,
            &IngredientForm {
                amount,
                unit,
                food,
                direction: Some(direction),
                order_index,
            },
        )
        .unwrap();
    }

    let card = recipe_card(&mut conn, recipe.id).unwrap();
    assert_eq!(
        card,
        vec![
            DirectionCard {
                text: "Chop".into(),
                ingredients: vec![line(Some(1.0), None, "tomato")],
            },
            DirectionCard {
                text: "Simmer".into(),
                ingredients: vec![
                    line(Some(3.0), None, "tomatoes"),
                    line(Some(1.0), Some("teaspoon"), "salt"),
                ],
            },
        ]
    );

    let stored = get_recipe(&mut conn, recipe.id).unwrap();
    assert_eq!(scaled_servings(&stored, Scale::new(1.5).unwrap()), Some(6.0));
    assert_eq!(stored.serving_value, Some(4));
}
