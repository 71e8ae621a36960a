use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::{Error, ErrorKind, ValidationErrors},
    form::Form,
    pagination::{PageContext, PageRequest},
    schema::{Recipe, RecipeData, RecipeFilter, RelationKind, Uuid},
    store::Store,
    validation::{validate_recipe, RecipeForm},
    views::RecipeView,
};

use super::users::user_view;

/// Filters accepted by the recipe listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: PageRequest,
}

impl TryFrom<&Form> for RecipeQuery {
    type Error = Error;

    fn try_from(form: &Form) -> Result<Self, Self::Error> {
        Ok(Self {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
            page: PageRequest::new(form.get_number("page")?, form.get_number("limit")?),
        })
    }
}

impl RecipeQuery {
    /// The favorite and cart flags only mean something for a known user and
    /// are ignored for anonymous requests.
    fn filter(&self, viewer: Option<&SessionData>) -> RecipeFilter {
        let user_id = viewer.map(|session| session.user_id);

        RecipeFilter {
            author: self.author,
            tags: self.tags.to_owned(),
            favorited_by: user_id.filter(|_| self.is_favorited),
            in_cart_of: user_id.filter(|_| self.is_in_shopping_cart),
        }
    }
}

/// Reports ingredient and tag ids that are not in the catalog.
async fn check_catalog_references(store: &dyn Store, data: &RecipeData) -> Result<(), Error> {
    let ingredient_ids: Vec<Uuid> = data.ingredients.iter().map(|(id, _)| *id).collect();
    let missing_ingredients = store.find_missing_ingredients(&ingredient_ids).await?;
    let missing_tags = store.find_missing_tags(&data.tags).await?;

    let mut errors = ValidationErrors::new();
    if !missing_ingredients.is_empty() {
        errors.insert(
            String::from("ingredients"),
            missing_ingredients
                .iter()
                .map(|id| format!("Ingredient {id} does not exist"))
                .collect(),
        );
    }
    if !missing_tags.is_empty() {
        errors.insert(
            String::from("tags"),
            missing_tags
                .iter()
                .map(|id| format!("Tag {id} does not exist"))
                .collect(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(errors))
    }
}

pub async fn recipe_view(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    recipe: Recipe,
) -> Result<RecipeView, Error> {
    let author = store
        .get_user_by_id(recipe.author_id)
        .await?
        .ok_or_else(|| ErrorKind::InternalServerError.new("Recipe author is missing"))?;
    let author = user_view(store, viewer, author.info()).await?;

    let ingredients = store.list_recipe_parts(recipe.id).await?;
    let tags = store.list_recipe_tags(recipe.id).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(session) => (
            store
                .has_relation(RelationKind::Favorite, session.user_id, recipe.id)
                .await?,
            store
                .has_relation(RelationKind::ShoppingCart, session.user_id, recipe.id)
                .await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        author,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        ingredients,
        tags,
        cooking_time: recipe.cooking_time,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn get_recipe(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    id: Uuid,
) -> Result<RecipeView, Error> {
    let recipe = store
        .get_recipe(id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))?;

    recipe_view(store, viewer, recipe).await
}

/// Loads a recipe the session is allowed to modify: its own, or any when the
/// session may manage all recipes.
pub async fn get_recipe_mut(
    store: &dyn Store,
    session: &SessionData,
    id: Uuid,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = store.get_recipe(id).await?;

    match recipe {
        Some(recipe) => match session.authenticate(ActionType::ManageAllRecipes) {
            Ok(_) => Ok(recipe),
            Err(_) => {
                if recipe.author_id != session.user_id {
                    Err(ErrorKind::PermissionDenied.new("Only the author may change a recipe"))
                } else {
                    Ok(recipe)
                }
            }
        },
        None => Err(ErrorKind::NotFound.new("No recipe exists with specified id")),
    }
}

pub async fn fetch_recipes(
    store: &dyn Store,
    viewer: Option<&SessionData>,
    query: &RecipeQuery,
) -> Result<PageContext<RecipeView>, Error> {
    let page = store.fetch_recipes(&query.filter(viewer), query.page).await?;

    let mut results = Vec::with_capacity(page.results.len());
    for recipe in page.results {
        results.push(recipe_view(store, viewer, recipe).await?);
    }

    Ok(PageContext {
        count: page.count,
        next: page.next,
        previous: page.previous,
        results,
    })
}

pub async fn create_recipe(
    store: &dyn Store,
    session: &SessionData,
    form: RecipeForm,
) -> Result<RecipeView, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let data = validate_recipe(form)?;
    check_catalog_references(store, &data).await?;

    let id = store.create_recipe(session.user_id, &data).await?;
    log::info!("{} created recipe {id}", session.username);

    get_recipe(store, Some(session), id).await
}

/// Fields missing from `form` keep their stored values; ingredient and tag
/// links are replaced as a whole when given.
pub async fn update_recipe(
    store: &dyn Store,
    session: &SessionData,
    id: Uuid,
    form: RecipeForm,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe_mut(store, session, id).await?;

    let current = RecipeData {
        ingredients: store
            .list_recipe_parts(id)
            .await?
            .into_iter()
            .map(|part| (part.ingredient_id, part.amount))
            .collect(),
        tags: store
            .list_recipe_tags(id)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect(),
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    };

    let data = validate_recipe(form.merge(current))?;
    check_catalog_references(store, &data).await?;

    store.update_recipe(id, &data).await?;
    log::info!("{} updated recipe {id}", session.username);

    get_recipe(store, Some(session), id).await
}

pub async fn delete_recipe(store: &dyn Store, session: &SessionData, id: Uuid) -> Result<(), Error> {
    let recipe = get_recipe_mut(store, session, id).await?;

    if !store.delete_recipe(recipe.id).await? {
        return Err(ErrorKind::NotFound.new("No recipe exists with specified id"));
    }
    log::info!("{} deleted recipe {id}", session.username);

    Ok(())
}
