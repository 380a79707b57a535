// Copyright 2023 Remi Bernotavicius

//! HTML pages for the cookbook. Templates are compiled into the binary and
//! rendered with minijinja, which escapes every value in a `.html` template.

use crate::database::models::{Category, Food, Recipe, Source, Unit};
use crate::database::recipes::PAGE_SIZE;
use crate::recipe_card::{Amount, DirectionCard, Scale};
use crate::unit_conversion::FoodConversions;
use crate::Result;
use minijinja::{context, Environment};
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("recipe_list.html", include_str!("../../templates/recipe_list.html")),
    ("recipe_detail.html", include_str!("../../templates/recipe_detail.html")),
    ("foods.html", include_str!("../../templates/foods.html")),
];

fn load_template(name: &str) -> std::result::Result<Option<String>, minijinja::Error> {
    Ok(TEMPLATES
        .iter()
        .find(|(template, _)| *template == name)
        .map(|(_, source)| (*source).to_owned()))
}

/// Templates are parsed on first use. With `debug` on, render errors carry
/// the offending template source.
pub fn view_engine(debug: bool) -> Environment<'static> {
    let mut views = Environment::new();
    views.set_debug(debug);
    views.set_loader(load_template);
    views
}

pub fn recipe_list(
    views: &Environment<'_>,
    recipes: &[Recipe],
    page: i64,
    total: i64,
) -> Result<String> {
    let pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
    let html = views.get_template("recipe_list.html")?.render(context! {
        recipes,
        page,
        pages,
        previous => (page > 1).then(|| page - 1),
        next => (page < pages).then(|| page + 1),
    })?;
    Ok(html)
}

pub struct RecipePage {
    pub recipe: Recipe,
    pub category: Category,
    pub sources: Vec<Source>,
    pub card: Vec<DirectionCard>,
    pub servings: Option<f64>,
    pub scale: Scale,
}

#[derive(Serialize)]
struct DirectionView {
    text: String,
    ingredients: Vec<String>,
}

pub fn recipe_detail(views: &Environment<'_>, page: &RecipePage) -> Result<String> {
    let directions: Vec<_> = page
        .card
        .iter()
        .map(|direction| DirectionView {
            text: direction.text.clone(),
            ingredients: direction.ingredients.iter().map(|l| l.to_string()).collect(),
        })
        .collect();

    let html = views.get_template("recipe_detail.html")?.render(context! {
        recipe => &page.recipe,
        category => &page.category,
        sources => &page.sources,
        directions,
        servings => page.servings.map(|s| Amount(s).to_string()),
        scale => (page.scale != Scale::ONE).then(|| Amount(page.scale.value()).to_string()),
    })?;
    Ok(html)
}

#[derive(Serialize)]
struct FoodView<'a> {
    food: &'a Food,
    units: &'a [Unit],
    conversions: Vec<String>,
}

pub fn food_conversions(views: &Environment<'_>, foods: &[FoodConversions]) -> Result<String> {
    let foods: Vec<_> = foods
        .iter()
        .map(|entry| FoodView {
            food: &entry.food,
            units: &entry.units,
            conversions: entry
                .conversions
                .iter()
                .map(|c| format!("1 {} = {} {}", c.from, Amount(c.factor), c.to))
                .collect(),
        })
        .collect();

    let html = views
        .get_template("foods.html")?
        .render(context! { foods })?;
    Ok(html)
}

#[test]
fn every_template_parses() {
    let views = view_engine(true);
    for (name, _) in TEMPLATES {
        views.get_template(name).unwrap();
    }
}

#[test]
fn empty_list_has_one_page() {
    let views = view_engine(false);
    let html = recipe_list(&views, &[], 1, 0).unwrap();
    assert!(html.contains("page 1 of 1"));
    assert!(!html.contains("next"));
    assert!(!html.contains("previous"));
}
