// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{Food, Ingredient, Unit, UnitType};
use crate::database::query::{list_foods, FoodFilter};
use crate::Result;
use diesel::associations::GroupedBy as _;
use diesel::BelongingToDsl as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator as _};

/// A unit of measure we know how to convert. Units stored in the database are
/// matched to one of these by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Measurement {
    Cups,
    FluidOunces,
    Grams,
    Kilograms,
    Kiloliters,
    Liters,
    Milligrams,
    Milliliters,
    Ounces,
    Pounds,
    Quarts,
    Tablespoons,
    Teaspoons,
}

#[derive(PartialEq, Eq, Debug)]
pub enum MeasurementKind {
    Volume,
    Weight,
}

impl From<Measurement> for MeasurementKind {
    fn from(m: Measurement) -> Self {
        match m {
            Measurement::Cups => Self::Volume,
            Measurement::FluidOunces => Self::Volume,
            Measurement::Grams => Self::Weight,
            Measurement::Kilograms => Self::Weight,
            Measurement::Kiloliters => Self::Volume,
            Measurement::Liters => Self::Volume,
            Measurement::Milligrams => Self::Weight,
            Measurement::Milliliters => Self::Volume,
            Measurement::Ounces => Self::Weight,
            Measurement::Pounds => Self::Weight,
            Measurement::Quarts => Self::Volume,
            Measurement::Tablespoons => Self::Volume,
            Measurement::Teaspoons => Self::Volume,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum MeasurementClass {
    Us,
    Metric,
}

impl From<Measurement> for MeasurementClass {
    fn from(m: Measurement) -> Self {
        match m {
            Measurement::Cups => Self::Us,
            Measurement::FluidOunces => Self::Us,
            Measurement::Grams => Self::Metric,
            Measurement::Kilograms => Self::Metric,
            Measurement::Kiloliters => Self::Metric,
            Measurement::Liters => Self::Metric,
            Measurement::Milligrams => Self::Metric,
            Measurement::Milliliters => Self::Metric,
            Measurement::Ounces => Self::Us,
            Measurement::Pounds => Self::Us,
            Measurement::Quarts => Self::Us,
            Measurement::Tablespoons => Self::Us,
            Measurement::Teaspoons => Self::Us,
        }
    }
}

impl Measurement {
    fn names(self) -> &'static [&'static str] {
        match self {
            Self::Cups => &["cup", "cups", "c"],
            Self::FluidOunces => &["fluid ounce", "fluid ounces", "fl oz", "fl. oz"],
            Self::Grams => &["gram", "grams", "gramme", "grammes", "g"],
            Self::Kilograms => &["kilogram", "kilograms", "kg", "kgs"],
            Self::Kiloliters => &["kiloliter", "kiloliters", "kilolitre", "kilolitres", "kl"],
            Self::Liters => &["liter", "liters", "litre", "litres", "l"],
            Self::Milligrams => &["milligram", "milligrams", "mg"],
            Self::Milliliters => &["milliliter", "milliliters", "millilitre", "millilitres", "ml"],
            Self::Ounces => &["ounce", "ounces", "oz"],
            Self::Pounds => &["pound", "pounds", "lb", "lbs"],
            Self::Quarts => &["quart", "quarts", "qt", "qts"],
            Self::Tablespoons => &["tablespoon", "tablespoons", "tbsp", "tbs", "tbl"],
            Self::Teaspoons => &["teaspoon", "teaspoons", "tsp", "tsps"],
        }
    }

    /// Matches the unit's name or abbreviations, ignoring case and a trailing
    /// period. The unit's stored type has to agree with the measurement's kind.
    pub fn recognize(unit: &Unit) -> Option<Self> {
        let candidates: Vec<String> = [&unit.name, &unit.name_abbrev, &unit.plural_abbrev]
            .into_iter()
            .map(|s| s.trim().trim_end_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let measurement = Self::iter()
            .find(|m| candidates.iter().any(|c| m.names().contains(&c.as_str())))?;

        match (MeasurementKind::from(measurement), unit.unit_type) {
            (MeasurementKind::Volume, UnitType::Volume) | (MeasurementKind::Weight, UnitType::Mass) => {
                Some(measurement)
            }
            _ => None,
        }
    }
}

fn as_teaspoons(a: Measurement) -> f64 {
    match a {
        Measurement::Cups => 48.0,
        Measurement::FluidOunces => 6.0,
        Measurement::Teaspoons => 1.0,
        Measurement::Tablespoons => 3.0,
        Measurement::Quarts => 192.0,
        _ => unreachable!(),
    }
}

fn as_milliliters(a: Measurement) -> f64 {
    match a {
        Measurement::Cups => 236.5882365,
        Measurement::FluidOunces => 29.5735295625,
        Measurement::Kiloliters => 1_000_000.0,
        Measurement::Liters => 1_000.0,
        Measurement::Milliliters => 1.0,
        Measurement::Tablespoons => 14.78676478125,
        Measurement::Teaspoons => 4.92892159375,
        Measurement::Quarts => 946.352946,
        _ => unreachable!(),
    }
}

fn as_ounces(a: Measurement) -> f64 {
    match a {
        Measurement::Ounces => 1.0,
        Measurement::Pounds => 16.0,
        _ => unreachable!(),
    }
}

fn as_milligrams(a: Measurement) -> f64 {
    match a {
        Measurement::Grams => 1_000.0,
        Measurement::Kilograms => 1_000_000.0,
        Measurement::Milligrams => 1.0,
        Measurement::Ounces => 28_349.523125,
        Measurement::Pounds => 453_592.37,
        _ => unreachable!(),
    }
}

/// How many `b` make one `a`. Volumes and weights don't convert into each
/// other.
pub fn conversion_factor(a: Measurement, b: Measurement) -> Option<f64> {
    let a_kind = MeasurementKind::from(a);
    let b_kind = MeasurementKind::from(b);
    if a_kind != b_kind {
        return None;
    }

    let a_class = MeasurementClass::from(a);
    let b_class = MeasurementClass::from(b);

    Some(match a_kind {
        MeasurementKind::Volume => match (a_class, b_class) {
            (MeasurementClass::Us, MeasurementClass::Us) => as_teaspoons(a) / as_teaspoons(b),
            _ => as_milliliters(a) / as_milliliters(b),
        },
        MeasurementKind::Weight => match (a_class, b_class) {
            (MeasurementClass::Us, MeasurementClass::Us) => as_ounces(a) / as_ounces(b),
            _ => as_milligrams(a) / as_milligrams(b),
        },
    })
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

#[derive(Serialize, Clone, Debug)]
pub struct FoodConversions {
    pub food: Food,
    /// Units this food's ingredients are measured in, by name.
    pub units: Vec<Unit>,
    pub conversions: Vec<Conversion>,
}

fn conversions_between(units: &[Unit]) -> Vec<Conversion> {
    let known: Vec<_> = units
        .iter()
        .filter_map(|u| Measurement::recognize(u).map(|m| (u, m)))
        .collect();

    let mut conversions = vec![];
    for (i, (from_unit, from)) in known.iter().enumerate() {
        for (to_unit, to) in &known[i + 1..] {
            if let Some(factor) = conversion_factor(*from, *to) {
                conversions.push(Conversion {
                    from: from_unit.name.clone(),
                    to: to_unit.name.clone(),
                    factor,
                });
            }
        }
    }
    conversions
}

/// Every food ordered by `name_sorted`, with the units its ingredients use and
/// the factor between each pair of those units that can be converted.
pub fn foods_with_conversions(conn: &mut database::Connection) -> Result<Vec<FoodConversions>> {
    use database::schema::units;

    let all_foods = list_foods(conn, &FoodFilter::default())?;
    let usages: Vec<(Ingredient, Unit)> = Ingredient::belonging_to(&all_foods)
        .inner_join(units::table)
        .select((Ingredient::as_select(), Unit::as_select()))
        .load(conn)?;

    Ok(usages
        .grouped_by(&all_foods)
        .into_iter()
        .zip(all_foods)
        .map(|(usages, food)| {
            let mut units: Vec<Unit> = usages.into_iter().map(|(_, unit)| unit).collect();
            units.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            units.dedup_by_key(|u| u.id);
            let conversions = conversions_between(&units);
            FoodConversions {
                food,
                units,
                conversions,
            }
        })
        .collect())
}

#[cfg(test)]
fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= expected.abs() * 1e-6,
        "{actual} != {expected}"
    );
}

#[cfg(test)]
fn stored_unit(id: i32, name: &str, abbrev: &str, unit_type: UnitType) -> Unit {
    use crate::database::models::{UnitId, UnitSystem};

    Unit {
        id: UnitId::from(id),
        name: name.into(),
        name_abbrev: abbrev.into(),
        plural_abbrev: abbrev.into(),
        unit_type,
        system: Some(UnitSystem::Imperial),
    }
}

#[cfg(test)]
fn factors(units: &[Unit]) -> Vec<(String, String, f64)> {
    conversions_between(units)
        .into_iter()
        .map(|c| (c.from, c.to, c.factor))
        .collect()
}

#[test]
fn spoons_and_cups_convert_exactly() {
    let units = [
        stored_unit(1, "quart", "qt", UnitType::Volume),
        stored_unit(2, "cup", "c.", UnitType::Volume),
        stored_unit(3, "tablespoon", "T", UnitType::Volume),
        stored_unit(4, "teaspoon", "t", UnitType::Volume),
    ];
    let expected = [
        ("quart", "cup", 4.0),
        ("quart", "tablespoon", 64.0),
        ("quart", "teaspoon", 192.0),
        ("cup", "tablespoon", 16.0),
        ("cup", "teaspoon", 48.0),
        ("tablespoon", "teaspoon", 3.0),
    ];
    let expected: Vec<_> = expected
        .into_iter()
        .map(|(from, to, factor)| (from.to_owned(), to.to_owned(), factor))
        .collect();
    assert_eq!(factors(&units), expected);
}

#[test]
fn imperial_weights_convert_to_metric() {
    let units = [
        stored_unit(1, "pound", "lb", UnitType::Mass),
        stored_unit(2, "kilo", "kg", UnitType::Mass),
        stored_unit(3, "gram", "g", UnitType::Mass),
    ];
    let conversions = factors(&units);
    assert_eq!(conversions.len(), 3);
    assert_close(conversions[0].2, 0.45359237);
    assert_close(conversions[1].2, 453.59237);
    assert_eq!(conversions[2].2, 1_000.0);
}

#[test]
fn metric_volumes_convert_to_cups_and_spoons() {
    let units = [
        stored_unit(1, "litre", "l", UnitType::Volume),
        stored_unit(2, "cup", "c", UnitType::Volume),
        stored_unit(3, "teaspoon", "tsp", UnitType::Volume),
    ];
    let conversions = factors(&units);
    assert_eq!(conversions.len(), 3);
    assert_close(conversions[0].2, 4.226753);
    assert_close(conversions[1].2, 202.884136);
    assert_eq!(conversions[2].2, 48.0);
}

#[test]
fn unrecognized_units_have_no_conversions() {
    let units = [
        stored_unit(1, "cup", "c", UnitType::Volume),
        stored_unit(2, "pinch", "", UnitType::Other),
        stored_unit(3, "ounce", "oz", UnitType::Volume),
        stored_unit(4, "fluid ounce", "fl oz", UnitType::Volume),
    ];
    let conversions = factors(&units);
    assert_eq!(conversions, [("cup".to_owned(), "fluid ounce".to_owned(), 8.0)]);
}

#[test]
fn volume_and_weight_do_not_convert() {
    use Measurement::*;

    assert_eq!(conversion_factor(Cups, Grams), None);
    assert_eq!(conversion_factor(Ounces, FluidOunces), None);
}

#[test]
fn recognize_units() {
    use crate::database::models::{UnitId, UnitSystem};

    let unit = |name: &str, abbrev: &str, unit_type| Unit {
        id: UnitId::from(1),
        name: name.into(),
        name_abbrev: abbrev.into(),
        plural_abbrev: String::new(),
        unit_type,
        system: Some(UnitSystem::Imperial),
    };
    assert_eq!(
        Measurement::recognize(&unit("Tablespoon", "tbsp.", UnitType::Volume)),
        Some(Measurement::Tablespoons)
    );
    assert_eq!(
        Measurement::recognize(&unit("heaping spoon", "Tbsp", UnitType::Volume)),
        Some(Measurement::Tablespoons)
    );
    assert_eq!(
        Measurement::recognize(&unit("gram", "g", UnitType::Mass)),
        Some(Measurement::Grams)
    );
    assert_eq!(
        Measurement::recognize(&unit("cup", "c", UnitType::Mass)),
        None
    );
    assert_eq!(
        Measurement::recognize(&unit("pinch", "", UnitType::Other)),
        None
    );
}

#[test]
fn foods_list_their_unit_conversions() {
    use crate::database::forms::IngredientForm;
    use crate::database::recipes::add_ingredient;
    use maplit::btreemap;
    use std::collections::BTreeMap;

    let mut conn = database::fixtures::connection();
    let pantry = database::fixtures::stock(&mut conn);
    let recipe = database::fixtures::recipe(&mut conn, &pantry, "Bread");
    for (food, unit) in [
        (&pantry.flour, &pantry.cup),
        (&pantry.flour, &pantry.teaspoon),
        (&pantry.flour, &pantry.cup),
        (&pantry.salt, &pantry.gram),
        (&pantry.salt, &pantry.teaspoon),
    ] {
        add_ingredient(
            &mut conn,
            recipe.id,
            &IngredientForm {
                amount: Some(1.0),
                unit: Some(unit.id),
                food: food.id,
                direction: None,
                order_index: None,
            },
        )
        .unwrap();
    }

    let foods = foods_with_conversions(&mut conn).unwrap();
    let units: BTreeMap<String, Vec<String>> = foods
        .iter()
        .map(|f| {
            (
                f.food.name.clone(),
                f.units.iter().map(|u| u.name.clone()).collect(),
            )
        })
        .collect();
    assert_eq!(
        units,
        btreemap! {
            "flour".into() => vec!["cup".into(), "teaspoon".into()],
            "salt".into() => vec!["gram".into(), "teaspoon".into()],
            "tomato".into() => vec![],
        }
    );

    let flour = foods.iter().find(|f| f.food.id == pantry.flour.id).unwrap();
    assert_eq!(
        flour.conversions,
        vec![Conversion {
            from: "cup".into(),
            to: "teaspoon".into(),
            factor: 48.0,
        }]
    );
    let salt = foods.iter().find(|f| f.food.id == pantry.salt.id).unwrap();
    assert!(salt.conversions.is_empty());
}
