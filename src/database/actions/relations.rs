//! Favorites, shopping cart entries and subscriptions.
//!
//! All three are presence flags over a (user, target) pair: adding an
//! existing pair fails with `AlreadyExists`, removing a missing one fails
//! with `RelationNotFound`. The store performs the insert atomically, so of
//! two concurrent adds exactly one wins.

use crate::{
    authentication::{jwt::SessionData, permissions::ActionType},
    error::{Error, ErrorKind},
    pagination::{PageContext, PageRequest},
    schema::{RelationKind, UserInfo, Uuid},
    store::Store,
    views::{RecipeSummary, SubscriptionView},
};

async fn add_relation(
    store: &dyn Store,
    session: &SessionData,
    kind: RelationKind,
    target_id: Uuid,
    exists: &str,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    if !store.insert_relation(kind, session.user_id, target_id).await? {
        return Err(ErrorKind::AlreadyExists.new(exists));
    }
    log::debug!("{kind:?} {} -> {target_id} added", session.user_id);

    Ok(())
}

async fn remove_relation(
    store: &dyn Store,
    session: &SessionData,
    kind: RelationKind,
    target_id: Uuid,
    missing: &str,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    if !store.delete_relation(kind, session.user_id, target_id).await? {
        return Err(ErrorKind::RelationNotFound.new(missing));
    }
    log::debug!("{kind:?} {} -> {target_id} removed", session.user_id);

    Ok(())
}

async fn recipe_summary(store: &dyn Store, recipe_id: Uuid) -> Result<RecipeSummary, Error> {
    store
        .get_recipe(recipe_id)
        .await?
        .map(RecipeSummary::from)
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))
}

pub async fn add_to_favorites(
    store: &dyn Store,
    session: &SessionData,
    recipe_id: Uuid,
) -> Result<RecipeSummary, Error> {
    let recipe = recipe_summary(store, recipe_id).await?;
    add_relation(
        store,
        session,
        RelationKind::Favorite,
        recipe_id,
        "Recipe is already in favorites",
    )
    .await?;

    Ok(recipe)
}

pub async fn remove_from_favorites(
    store: &dyn Store,
    session: &SessionData,
    recipe_id: Uuid,
) -> Result<(), Error> {
    recipe_summary(store, recipe_id).await?;
    remove_relation(
        store,
        session,
        RelationKind::Favorite,
        recipe_id,
        "Recipe is not in favorites",
    )
    .await
}

pub async fn add_to_shopping_cart(
    store: &dyn Store,
    session: &SessionData,
    recipe_id: Uuid,
) -> Result<RecipeSummary, Error> {
    let recipe = recipe_summary(store, recipe_id).await?;
    add_relation(
        store,
        session,
        RelationKind::ShoppingCart,
        recipe_id,
        "Recipe is already in the shopping cart",
    )
    .await?;

    Ok(recipe)
}

pub async fn remove_from_shopping_cart(
    store: &dyn Store,
    session: &SessionData,
    recipe_id: Uuid,
) -> Result<(), Error> {
    recipe_summary(store, recipe_id).await?;
    remove_relation(
        store,
        session,
        RelationKind::ShoppingCart,
        recipe_id,
        "Recipe is not in the shopping cart",
    )
    .await
}

/// Author profile as shown in the subscriptions listing.
pub async fn subscription_view(
    store: &dyn Store,
    session: &SessionData,
    author: UserInfo,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, Error> {
    let recipes = store
        .list_author_recipes(author.id, recipes_limit)
        .await?
        .into_iter()
        .map(RecipeSummary::from)
        .collect();
    let recipes_count = store.count_author_recipes(author.id).await?;
    let is_subscribed = store
        .has_relation(RelationKind::Follow, session.user_id, author.id)
        .await?;

    Ok(SubscriptionView {
        user: author,
        is_subscribed,
        recipes,
        recipes_count,
    })
}

pub async fn subscribe(
    store: &dyn Store,
    session: &SessionData,
    author_id: Uuid,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, Error> {
    let author = store
        .get_user_by_id(author_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("User not found"))?;

    if author.id == session.user_id {
        return Err(ErrorKind::SelfFollow.default());
    }

    add_relation(
        store,
        session,
        RelationKind::Follow,
        author.id,
        "You are already subscribed to this author",
    )
    .await?;

    subscription_view(store, session, author.info(), recipes_limit).await
}

pub async fn unsubscribe(
    store: &dyn Store,
    session: &SessionData,
    author_id: Uuid,
) -> Result<(), Error> {
    store
        .get_user_by_id(author_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("User not found"))?;

    remove_relation(
        store,
        session,
        RelationKind::Follow,
        author_id,
        "You are not subscribed to this author",
    )
    .await
}

pub async fn fetch_subscriptions(
    store: &dyn Store,
    session: &SessionData,
    page: PageRequest,
    recipes_limit: Option<i64>,
) -> Result<PageContext<SubscriptionView>, Error> {
    let authors = store.fetch_subscriptions(session.user_id, page).await?;

    let mut results = Vec::with_capacity(authors.results.len());
    for author in authors.results {
        results.push(subscription_view(store, session, author, recipes_limit).await?);
    }

    Ok(PageContext {
        count: authors.count,
        next: authors.next,
        previous: authors.previous,
        results,
    })
}
