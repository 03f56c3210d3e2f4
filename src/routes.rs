use std::{convert::Infallible, sync::Arc};

use serde_json::json;
use sqlx::{Pool, Sqlite};
use warp::{
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use crate::{
    actions::{
        add_membership, build_shopping_list, create_recipe, decode_short_link, delete_recipe,
        encode_short_link, fetch_recipes, get_ingredient, get_recipe, get_tag, list_ingredients,
        list_subscriptions, list_tags, remove_membership, subscribe, unsubscribe, update_recipe,
        RecipeFilter, SubscriptionFilter,
    },
    config::Config,
    constants::SHOPPING_LIST_FILENAME,
    error::Error,
    form::{Form, FormData},
    jwt::SessionData,
    permissions::ActionType,
    middleware::{with_possible_session, with_session},
    schema::{Id, MembershipKind, RecipeDraft, RecipePatch},
};

pub struct State {
    pub pool: Pool<Sqlite>,
    pub config: Config,
}

fn with_state(state: Arc<State>) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn membership_kind() -> impl Filter<Extract = (MembershipKind,), Error = Rejection> + Clone {
    let favorite = warp::path("favorite").map(|| MembershipKind::Favorite);
    let cart = warp::path("shopping_cart").map(|| MembershipKind::CartItem);

    favorite.or(cart).unify()
}

pub fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = state.config.jwt_secret.clone();

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(warp::query::<FormData>())
        .and(with_state(state.clone()))
        .and_then(list_ingredients_handler);

    let ingredient = warp::path!("api" / "ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_ingredient_handler);

    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_tags_handler);

    let tag = warp::path!("api" / "tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_tag_handler);

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart_handler);

    let list_recipes = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(warp::query::<FormData>())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes_handler);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(warp::body::json::<RecipeDraft>())
        .and(with_state(state.clone()))
        .and_then(create_recipe_handler);

    let recipe = warp::path!("api" / "recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(get_recipe_handler);

    let update = warp::path!("api" / "recipes" / Id)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(warp::body::json::<RecipePatch>())
        .and(with_state(state.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("api" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe_handler);

    let add = warp::path!("api" / "recipes" / Id / ..)
        .and(membership_kind())
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(add_membership_handler);

    let remove = warp::path!("api" / "recipes" / Id / ..)
        .and(membership_kind())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(remove_membership_handler);

    let get_link = warp::path!("api" / "recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_link_handler);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<FormData>())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(list_subscriptions_handler);

    let subscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<FormData>())
        .and(with_session(secret.clone()))
        .and(with_state(state.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("api" / "users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_state(state.clone()))
        .and_then(unsubscribe_handler);

    let short_link = warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state))
        .and_then(short_link_handler);

    ingredients
        .or(ingredient)
        .or(tags)
        .or(tag)
        .or(download)
        .or(list_recipes)
        .or(create)
        .or(recipe)
        .or(update)
        .or(delete)
        .or(add)
        .or(remove)
        .or(get_link)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
        .or(short_link)
}

async fn list_ingredients_handler(
    form: FormData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let name = Form::from_data(form).get_str("name");
    let list = list_ingredients(name.as_deref(), &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&list))
}

async fn get_ingredient_handler(id: Id, state: Arc<State>) -> Result<impl Reply, Rejection> {
    match get_ingredient(id, &state.pool)
        .await
        .map_err(warp::reject::custom)?
    {
        Some(ingredient) => Ok(reply::json(&ingredient)),
        None => Err(warp::reject::not_found()),
    }
}

async fn list_tags_handler(state: Arc<State>) -> Result<impl Reply, Rejection> {
    let list = list_tags(&state.pool).await.map_err(warp::reject::custom)?;

    Ok(reply::json(&list))
}

async fn get_tag_handler(id: Id, state: Arc<State>) -> Result<impl Reply, Rejection> {
    match get_tag(id, &state.pool).await.map_err(warp::reject::custom)? {
        Some(tag) => Ok(reply::json(&tag)),
        None => Err(warp::reject::not_found()),
    }
}

async fn list_recipes_handler(
    form: FormData,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let filter = RecipeFilter::from_form(&Form::from_data(form))
        .map_err(|e| warp::reject::custom(Error::from(e)))?;
    let page = fetch_recipes(&filter, session.map(|s| s.user_id), &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&page))
}

async fn create_recipe_handler(
    session: SessionData,
    draft: RecipeDraft,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = create_recipe(&session, draft, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::with_status(reply::json(&recipe), StatusCode::CREATED))
}

async fn get_recipe_handler(
    id: Id,
    session: Option<SessionData>,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = get_recipe(id, session.map(|s| s.user_id), &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&recipe))
}

async fn update_recipe_handler(
    id: Id,
    session: SessionData,
    patch: RecipePatch,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    let recipe = update_recipe(id, &session, patch, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&recipe))
}

async fn delete_recipe_handler(
    id: Id,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    delete_recipe(id, &session, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_membership_handler(
    id: Id,
    kind: MembershipKind,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnMemberships)
        .map_err(warp::reject::custom)?;
    let (_, recipe) = add_membership(session.user_id, id, kind, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::with_status(reply::json(&recipe), StatusCode::CREATED))
}

async fn remove_membership_handler(
    id: Id,
    kind: MembershipKind,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnMemberships)
        .map_err(warp::reject::custom)?;
    remove_membership(session.user_id, id, kind, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_subscriptions_handler(
    form: FormData,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(warp::reject::custom)?;
    let filter = SubscriptionFilter::from_form(&Form::from_data(form))
        .map_err(|e| warp::reject::custom(Error::from(e)))?;
    let page = list_subscriptions(session.user_id, &filter, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&page))
}

async fn subscribe_handler(
    author_id: Id,
    form: FormData,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(warp::reject::custom)?;
    let filter = SubscriptionFilter::from_form(&Form::from_data(form))
        .map_err(|e| warp::reject::custom(Error::from(e)))?;
    let (_, author) = subscribe(session.user_id, author_id, filter.recipes_limit, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::with_status(reply::json(&author), StatusCode::CREATED))
}

async fn unsubscribe_handler(
    author_id: Id,
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnSubscriptions)
        .map_err(warp::reject::custom)?;
    unsubscribe(session.user_id, author_id, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn download_shopping_cart_handler(
    session: SessionData,
    state: Arc<State>,
) -> Result<impl Reply, Rejection> {
    session
        .authenticate(ActionType::ManageOwnMemberships)
        .map_err(warp::reject::custom)?;
    let body = build_shopping_list(session.user_id, &state.pool)
        .await
        .and_then(|list| list.to_csv())
        .map_err(warp::reject::custom)?;

    Ok(reply::with_header(
        reply::with_header(body, "content-type", "text/csv; charset=utf-8"),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    ))
}

async fn get_link_handler(id: Id, state: Arc<State>) -> Result<impl Reply, Rejection> {
    let code = encode_short_link(id, &state.pool)
        .await
        .map_err(warp::reject::custom)?;

    Ok(reply::json(&json!({
        "code": code,
        "short-link": state.config.short_link_url(&code),
    })))
}

async fn short_link_handler(code: String, state: Arc<State>) -> Result<impl Reply, Rejection> {
    let recipe_id = decode_short_link(&code, &state.pool)
        .await
        .map_err(warp::reject::custom)?;
    let location: Uri = format!("/recipes/{recipe_id}")
        .parse()
        .map_err(|_| warp::reject::custom(Error::ShortLinkNotFound(code)))?;

    Ok(warp::redirect::found(location))
}

/// Turns every rejection into a JSON error body with the matching status.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(e) = err.find::<Error>() {
        if e.code() >= 500 {
            log::error!("{e}");
        } else {
            log::warn!("Rejected request: {e}");
        }
        let errors = match e {
            Error::Validation(errors) => Some(
                errors
                    .iter()
                    .map(|v| json!({ "field": v.field(), "info": v.to_string(), "detail": v }))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };
        (
            StatusCode::from_u16(e.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            json!({ "code": e.code(), "error": e.name(), "info": e.to_string(), "errors": errors }),
        )
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            json!({ "code": 404, "error": "not_found", "info": "Not found" }),
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "code": 400, "error": "invalid_request", "info": e.to_string() }),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            json!({ "code": 400, "error": "invalid_request", "info": "Invalid query string" }),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "code": 405, "error": "method_not_allowed", "info": "Method not allowed" }),
        )
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "code": 500, "error": "internal", "info": "Internal server error" }),
        )
    };

    Ok(reply::with_status(reply::json(&body), status))
}
