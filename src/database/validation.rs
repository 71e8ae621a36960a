use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

use crate::{
    constants::{COOKING_TIME_MAX, COOKING_TIME_MIN, RECIPE_NAME_MAX_LENGTH},
    error::{Error, ValidationErrors},
    schema::{RecipeData, Uuid},
};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i64,
}

/// Recipe payload as sent by the client. Every field is optional so that a
/// partial update can be merged over the stored recipe before validation.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Uuid>>,
}

impl RecipeForm {
    /// Fills the fields missing from `self` with the values of `current`.
    pub fn merge(self, current: RecipeData) -> Self {
        Self {
            name: self.name.or(Some(current.name)),
            image: self.image.or(Some(current.image)),
            text: self.text.or(Some(current.text)),
            cooking_time: self.cooking_time.or(Some(current.cooking_time.into())),
            ingredients: self.ingredients.or_else(|| {
                Some(
                    current
                        .ingredients
                        .into_iter()
                        .map(|(id, amount)| IngredientAmount {
                            id,
                            amount: amount.into(),
                        })
                        .collect(),
                )
            }),
            tags: self.tags.or(Some(current.tags)),
        }
    }
}

#[derive(Default)]
struct FieldErrors {
    inner: ValidationErrors,
}

impl FieldErrors {
    fn add(&mut self, field: &str, message: &str) {
        self.inner
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    fn required(&mut self, field: &str) {
        self.add(field, "This field is required");
    }

    fn finish<T>(self, value: T) -> Result<T, Error> {
        if self.inner.is_empty() {
            Ok(value)
        } else {
            Err(Error::validation(self.inner))
        }
    }
}

pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), Vec<String>> {
    let mut errors = vec![];

    if ingredients.is_empty() {
        errors.push(String::from("A recipe needs at least one ingredient"));
    }
    if ingredients.iter().any(|i| i.amount <= 0) {
        errors.push(String::from("Ingredient amount must be greater than zero"));
    }
    if ingredients.iter().any(|i| i.amount > i32::MAX.into()) {
        errors.push(String::from("Ingredient amount is too large"));
    }

    let unique: HashSet<Uuid> = ingredients.iter().map(|i| i.id).collect();
    if unique.len() < ingredients.len() {
        errors.push(String::from("Ingredients must not repeat"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_tags(tags: &[Uuid]) -> Result<(), Vec<String>> {
    let mut errors = vec![];

    if tags.is_empty() {
        errors.push(String::from("A recipe needs at least one tag"));
    }

    let unique: HashSet<&Uuid> = tags.iter().collect();
    if unique.len() < tags.len() {
        errors.push(String::from("Tags must not repeat"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_cooking_time(cooking_time: i64) -> Result<(), String> {
    if cooking_time < COOKING_TIME_MIN.into() {
        return Err(format!(
            "Cooking time can't be less than {COOKING_TIME_MIN} minute"
        ));
    }
    if cooking_time > COOKING_TIME_MAX.into() {
        return Err(format!(
            "Cooking time can't be more than {COOKING_TIME_MAX} minutes"
        ));
    }
    Ok(())
}

/// Accepts `data:image/<type>;base64,<payload>` where the payload decodes.
pub fn validate_image(image: &str) -> Result<(), String> {
    let payload = image
        .strip_prefix("data:image/")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload);

    match payload {
        Some(payload) if !payload.is_empty() => STANDARD
            .decode(payload)
            .map(|_| ())
            .map_err(|_| String::from("Image payload is not valid base64")),
        _ => Err(String::from("Image must be a base64 encoded data URI")),
    }
}

/// Checks every field and reports all violations at once, keyed by field.
pub fn validate_recipe(form: RecipeForm) -> Result<RecipeData, Error> {
    let mut errors = FieldErrors::default();

    let name = form.name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        errors.required("name");
    } else if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        errors.add(
            "name",
            &format!("Name can't be longer than {RECIPE_NAME_MAX_LENGTH} characters"),
        );
    }

    let text = form.text.unwrap_or_default();
    if text.trim().is_empty() {
        errors.required("text");
    }

    let image = form.image.unwrap_or_default();
    if image.is_empty() {
        errors.required("image");
    } else if let Err(e) = validate_image(&image) {
        errors.add("image", &e);
    }

    let cooking_time = match form.cooking_time {
        Some(cooking_time) => {
            if let Err(e) = validate_cooking_time(cooking_time) {
                errors.add("cooking_time", &e);
            }
            cooking_time
        }
        None => {
            errors.required("cooking_time");
            0
        }
    };

    let ingredients = form.ingredients.unwrap_or_default();
    if let Err(messages) = validate_ingredients(&ingredients) {
        messages.iter().for_each(|m| errors.add("ingredients", m));
    }

    let tags = form.tags.unwrap_or_default();
    if let Err(messages) = validate_tags(&tags) {
        messages.iter().for_each(|m| errors.add("tags", m));
    }

    errors.finish(())?;

    Ok(RecipeData {
        name,
        image,
        text,
        cooking_time: cooking_time as i32,
        ingredients: ingredients
            .into_iter()
            .map(|i| (i.id, i.amount as i32))
            .collect(),
        tags,
    })
}
