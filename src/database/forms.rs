// Copyright 2023 Remi Bernotavicius

//! Write payloads accepted by the API and admin endpoints. Each form is
//! validated (and has derived fields filled in) before it reaches the database.

use crate::database::models::{
    CategoryId, DirectionId, FoodGroupId, FoodId, Recipe, SourceId, UnitId, UnitSystem, UnitType,
};
use crate::{Error, Result};
use serde::Deserialize;

fn check_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Invalid(format!("{field} may not be blank")));
    }
    Ok(())
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let length = value.chars().count();
    if length > max {
        return Err(Error::Invalid(format!(
            "{field} has {length} characters, at most {max} are allowed"
        )));
    }
    Ok(())
}

fn check_slug(value: &str, max: usize) -> Result<()> {
    check_required("slug", value)?;
    check_length("slug", value, max)?;
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Invalid(format!(
            "slug {value:?} may only contain letters, numbers, underscores or hyphens"
        )));
    }
    Ok(())
}

/// Lowercase ASCII slug built from `text`. Accented and non-Latin letters
/// are transliterated first, then runs of whitespace, hyphens and
/// underscores collapse into a single hyphen.
pub fn slugify(text: &str, max: usize) -> String {
    let mut slug = String::new();
    for c in deunicode::deunicode(text).chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if c == '_' || c == '-' || c.is_whitespace() {
            if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
    }
    let mut slug: String = slug.chars().take(max).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Deserialize, Debug, Clone)]
pub struct SourceForm {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl SourceForm {
    pub fn validate(&mut self) -> Result<()> {
        check_required("name", &self.name)?;
        check_length("name", &self.name, 150)?;
        check_length("url", &self.url, 500)?;
        if !self.url.is_empty()
            && !(self.url.starts_with("http://") || self.url.starts_with("https://"))
        {
            return Err(Error::Invalid(format!("{:?} is not a valid URL", self.url)));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub order_index: Option<i32>,
}

impl CategoryForm {
    pub fn validate(&mut self) -> Result<()> {
        check_required("name", &self.name)?;
        check_length("name", &self.name, 120)?;
        if self.slug.is_empty() {
            self.slug = slugify(&self.name, 50);
        }
        check_slug(&self.slug, 50)?;
        if self.order_index.is_some_and(|i| i < 0) {
            return Err(Error::Invalid("order_index may not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct FoodGroupForm {
    pub name: String,
}

impl FoodGroupForm {
    pub fn validate(&mut self) -> Result<()> {
        check_required("name", &self.name)?;
        check_length("name", &self.name, 150)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct FoodForm {
    pub name: String,
    #[serde(default)]
    pub name_sorted: String,
    pub group: FoodGroupId,
    #[serde(default)]
    pub name_plural: Option<String>,
    #[serde(default)]
    pub detail: String,
}

impl FoodForm {
    pub fn validate(&mut self) -> Result<()> {
        check_required("name", &self.name)?;
        check_length("name", &self.name, 150)?;
        check_length("name_sorted", &self.name_sorted, 150)?;
        if let Some(plural) = &self.name_plural {
            check_length("name_plural", plural, 150)?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UnitForm {
    pub name: String,
    #[serde(default)]
    pub name_abbrev: String,
    #[serde(default)]
    pub plural_abbrev: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    #[serde(default)]
    pub system: Option<UnitSystem>,
}

impl UnitForm {
    pub fn validate(&mut self) -> Result<()> {
        check_required("name", &self.name)?;
        check_length("name", &self.name, 60)?;
        check_length("name_abbrev", &self.name_abbrev, 60)?;
        check_length("plural_abbrev", &self.plural_abbrev, 60)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecipeForm {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub prep_time: String,
    pub category: CategoryId,
    #[serde(default)]
    pub sources: Vec<SourceId>,
    #[serde(default)]
    pub serving_value: Option<i32>,
}

/// Paths under `/cookbook/` that aren't recipes.
const RESERVED_RECIPE_SLUGS: &[&str] = &["foods"];

impl RecipeForm {
    pub fn from_recipe(recipe: &Recipe, sources: Vec<SourceId>) -> Self {
        Self {
            title: recipe.title.clone(),
            summary: recipe.summary.clone(),
            description: recipe.description.clone(),
            slug: recipe.slug.clone(),
            prep_time: recipe.prep_time.clone(),
            category: recipe.category_id,
            sources,
            serving_value: recipe.serving_value,
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        check_required("title", &self.title)?;
        check_length("title", &self.title, 50)?;
        check_length("summary", &self.summary, 500)?;
        check_length("prep_time", &self.prep_time, 100)?;
        if self.slug.is_empty() {
            self.slug = slugify(&self.title, 50);
        }
        check_slug(&self.slug, 50)?;
        if RESERVED_RECIPE_SLUGS.contains(&self.slug.as_str()) {
            return Err(Error::Invalid(format!(
                "slug {:?} is reserved, choose another",
                self.slug
            )));
        }
        self.sources.sort();
        self.sources.dedup();
        Ok(())
    }

    /// A full replacement that leaves `slug` out keeps the stored one, so
    /// renaming a recipe doesn't move its page.
    pub fn keep_slug(&mut self, stored: &Recipe) {
        if self.slug.is_empty() {
            self.slug = stored.slug.clone();
        }
    }
}

/// Partial update of a recipe. Absent fields keep their stored value;
/// `serving_value: null` clears it.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipePatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub prep_time: Option<String>,
    pub category: Option<CategoryId>,
    pub sources: Option<Vec<SourceId>>,
    #[serde(default, deserialize_with = "present")]
    pub serving_value: Option<Option<i32>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl RecipePatch {
    pub fn apply(self, form: &mut RecipeForm) {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(summary) = self.summary {
            form.summary = summary;
        }
        if let Some(description) = self.description {
            form.description = description;
        }
        if let Some(slug) = self.slug {
            form.slug = slug;
        }
        if let Some(prep_time) = self.prep_time {
            form.prep_time = prep_time;
        }
        if let Some(category) = self.category {
            form.category = category;
        }
        if let Some(sources) = self.sources {
            form.sources = sources;
        }
        if let Some(serving_value) = self.serving_value {
            form.serving_value = serving_value;
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DirectionForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub order: Option<i32>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientForm {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub unit: Option<UnitId>,
    pub food: FoodId,
    #[serde(default)]
    pub direction: Option<DirectionId>,
    #[serde(default)]
    pub order_index: Option<i32>,
}

impl IngredientForm {
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_some_and(|a| !a.is_finite()) {
            return Err(Error::Invalid("amount must be a finite number".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct PhotoForm {
    pub caption: String,
    pub image: String,
}

impl PhotoForm {
    pub fn validate(&self) -> Result<()> {
        check_required("caption", &self.caption)?;
        check_length("caption", &self.caption, 200)?;
        check_required("image", &self.image)
    }
}

#[test]
fn slugify_examples() {
    assert_eq!(slugify("Chicken Tikka Masala", 50), "chicken-tikka-masala");
    assert_eq!(slugify("  Mom's  best -- pie!  ", 50), "moms-best-pie");
    assert_eq!(slugify("Crème brûlée", 50), "creme-brulee");
    assert_eq!(slugify("Bœuf à la Bourguignonne", 50), "boeuf-a-la-bourguignonne");
    assert_eq!(slugify("a b c d", 4), "a-b");
}

#[test]
fn recipe_form_derives_slug() {
    let mut form: RecipeForm =
        serde_json::from_str(r#"{"title": "Tomato Soup", "category": 1, "sources": [3, 1, 3]}"#)
            .unwrap();
    form.validate().unwrap();
    assert_eq!(form.slug, "tomato-soup");
    assert_eq!(form.sources, vec![SourceId::from(1), SourceId::from(3)]);
}

#[test]
fn recipe_slug_cannot_shadow_foods_page() {
    let mut form: RecipeForm =
        serde_json::from_str(r#"{"title": "Soup", "slug": "foods", "category": 1}"#).unwrap();
    assert!(matches!(form.validate(), Err(Error::Invalid(_))));

    let mut form: RecipeForm =
        serde_json::from_str(r#"{"title": "Foods", "category": 1}"#).unwrap();
    assert!(matches!(form.validate(), Err(Error::Invalid(_))));

    let mut form: RecipeForm =
        serde_json::from_str(r#"{"title": "Foods", "slug": "foods-of-spain", "category": 1}"#)
            .unwrap();
    form.validate().unwrap();
}

#[test]
fn recipe_form_rejects_bad_input() {
    let mut long_title: RecipeForm =
        serde_json::from_value(serde_json::json!({"title": "x".repeat(51), "category": 1}))
            .unwrap();
    assert!(matches!(long_title.validate(), Err(Error::Invalid(_))));

    let mut bad_slug: RecipeForm =
        serde_json::from_str(r#"{"title": "Soup", "slug": "so up", "category": 1}"#).unwrap();
    assert!(matches!(bad_slug.validate(), Err(Error::Invalid(_))));

    let mut blank: RecipeForm =
        serde_json::from_str(r#"{"title": "  ", "category": 1}"#).unwrap();
    assert!(matches!(blank.validate(), Err(Error::Invalid(_))));
}

#[test]
fn recipe_patch_distinguishes_null_from_absent() {
    let mut form: RecipeForm = serde_json::from_str(
        r#"{"title": "Soup", "category": 1, "serving_value": 4, "summary": "hot"}"#,
    )
    .unwrap();

    let untouched: RecipePatch = serde_json::from_str(r#"{"title": "Stew"}"#).unwrap();
    untouched.apply(&mut form);
    assert_eq!(form.title, "Stew");
    assert_eq!(form.serving_value, Some(4));
    assert_eq!(form.summary, "hot");

    let cleared: RecipePatch = serde_json::from_str(r#"{"serving_value": null}"#).unwrap();
    cleared.apply(&mut form);
    assert_eq!(form.serving_value, None);
}

#[test]
fn category_form_derives_slug() {
    let mut form: CategoryForm = serde_json::from_str(r#"{"name": "Main Dishes"}"#).unwrap();
    form.validate().unwrap();
    assert_eq!(form.slug, "main-dishes");
    assert_eq!(form.order_index, None);
}

#[test]
fn source_form_checks_url() {
    let mut form = SourceForm {
        name: "Grandma".into(),
        url: "ftp://example.com".into(),
    };
    assert!(matches!(form.validate(), Err(Error::Invalid(_))));
    form.url = "https://example.com/recipes".into();
    form.validate().unwrap();
}
