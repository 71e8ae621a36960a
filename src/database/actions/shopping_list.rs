use std::collections::HashMap;

use serde::Serialize;

use crate::{
    authentication::jwt::SessionData,
    error::Error,
    schema::CartPart,
    store::Store,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums the amounts of equal (name, unit) ingredients. Items keep the order
/// in which their ingredient first appears.
pub fn aggregate(parts: Vec<CartPart>) -> Vec<ShoppingListItem> {
    let mut items: Vec<ShoppingListItem> = vec![];
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for part in parts {
        let key = (part.name, part.measurement_unit);
        match index.get(&key) {
            Some(&i) => items[i].amount += i64::from(part.amount),
            None => {
                index.insert(key.clone(), items.len());
                items.push(ShoppingListItem {
                    name: key.0,
                    measurement_unit: key.1,
                    amount: part.amount.into(),
                });
            }
        }
    }

    items
}

pub async fn shopping_list(
    store: &dyn Store,
    session: &SessionData,
) -> Result<Vec<ShoppingListItem>, Error> {
    let parts = store.list_cart_parts(session.user_id).await?;
    Ok(aggregate(parts))
}
