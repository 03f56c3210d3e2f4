mod ingredients;
mod memberships;
mod recipes;
mod shopping_list;
mod short_links;
mod subscriptions;
mod tags;

pub use ingredients::{get_ingredient, import_ingredients, list_ingredients};
pub use memberships::{add_membership, has_membership, list_memberships, remove_membership};
pub use recipes::{
    create_recipe, delete_recipe, fetch_recipes, get_recipe, update_recipe, RecipeFilter,
};
pub use shopping_list::{aggregate, build_shopping_list, ShoppingList};
pub use short_links::{decode_short_link, encode_short_link, short_code};
pub use subscriptions::{list_subscriptions, subscribe, unsubscribe, SubscriptionFilter};
pub use tags::{create_tag, get_tag, list_tags};
