mod common;

use std::sync::Arc;

use common::{memory_pool, seed, Catalog};
use foodgram_sdk::{
    config::Config,
    jwt::generate_jwt_session,
    routes::{handle_rejection, routes, State},
    schema::UserRole,
};
use serde_json::{json, Value};
use warp::{http::StatusCode, Filter, Reply};

const SECRET: &str = "route-secret";

async fn app() -> (
    impl Filter<Extract = (impl Reply,), Error = std::convert::Infallible> + Clone,
    Catalog,
) {
    let pool = memory_pool().await;
    let catalog = seed(&pool).await;
    let config = Config {
        port: 0,
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        public_url: "https://food.test".into(),
        jwt_secret: SECRET.into(),
    };
    let state = Arc::new(State { pool, config });

    (routes(state).recover(handle_rejection), catalog)
}

fn bearer(user_id: i64) -> String {
    let token = generate_jwt_session(user_id, UserRole::User, SECRET).unwrap();
    format!("Bearer {token}")
}

fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

fn pancakes(catalog: &Catalog) -> Value {
    json!({
        "name": "Pancakes",
        "image": "recipes/pancakes.png",
        "text": "Mix and fry",
        "cooking_time": 20,
        "tags": [catalog.breakfast],
        "ingredients": [{"id": catalog.flour, "amount": 200}, {"id": catalog.eggs, "amount": 2}],
    })
}

#[tokio::test]
async fn catalog_is_public() {
    let (app, _) = app().await;

    let response = warp::test::request().path("/api/tags").reply(&app).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response).as_array().unwrap().len(), 2);

    let response = warp::test::request()
        .path("/api/ingredients?name=FL")
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(&response)[0]["name"], "flour");

    let response = warp::test::request().path("/api/tags/99").reply(&app).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_requires_a_session() {
    let (app, catalog) = app().await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .json(&pancakes(&catalog))
        .reply(&app)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&response)["error"], "unauthorized");
}

#[tokio::test]
async fn invalid_recipe_lists_every_problem() {
    let (app, catalog) = app().await;
    let mut recipe = pancakes(&catalog);
    recipe["tags"] = json!([]);
    recipe["cooking_time"] = json!(1000);

    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("authorization", bearer(1))
        .json(&recipe)
        .reply(&app)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let errors = body(&response)["errors"].as_array().unwrap().clone();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["field"], "tags");
    assert_eq!(errors[1]["detail"]["code"], "cooking_time_out_of_range");
}

#[tokio::test]
async fn recipe_lifecycle_over_http() {
    let (app, catalog) = app().await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("authorization", bearer(1))
        .json(&pancakes(&catalog))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body(&response)["id"].as_i64().unwrap();

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/recipes/{id}/shopping_cart"))
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body(&response)["name"], "Pancakes");

    let response = warp::test::request()
        .method("POST")
        .path(&format!("/api/recipes/{id}/shopping_cart"))
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"], "already_exists");

    let response = warp::test::request()
        .path(&format!("/api/recipes/{id}"))
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(body(&response)["is_in_shopping_cart"], true);

    let response = warp::test::request()
        .path("/api/recipes/download_shopping_cart")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv; charset=utf-8");
    assert_eq!(
        response.body().as_ref(),
        b"ingredient,measurement_unit,amount\neggs,pcs,2\nflour,g,200\n"
    );

    let response = warp::test::request()
        .method("PATCH")
        .path(&format!("/api/recipes/{id}"))
        .header("authorization", bearer(2))
        .json(&json!({"tags": [catalog.breakfast], "ingredients": [{"id": catalog.flour, "amount": 1}]}))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/api/recipes/{id}"))
        .header("authorization", bearer(1))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = warp::test::request()
        .path(&format!("/api/recipes/{id}"))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response)["error"], "recipe_not_found");
}

#[tokio::test]
async fn short_link_redirects_to_the_recipe() {
    let (app, catalog) = app().await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("authorization", bearer(1))
        .json(&pancakes(&catalog))
        .reply(&app)
        .await;
    let id = body(&response)["id"].as_i64().unwrap();

    let response = warp::test::request()
        .path(&format!("/api/recipes/{id}/get-link"))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let link = body(&response);
    let code = link["code"].as_str().unwrap().to_string();
    assert_eq!(link["short-link"], format!("https://food.test/s/{code}"));

    let response = warp::test::request()
        .path(&format!("/s/{code}"))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], format!("/recipes/{id}").as_str());

    let response = warp::test::request().path("/s/ffffff").reply(&app).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (app, _) = app().await;

    let response = warp::test::request().path("/api/nothing").reply(&app).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(&response)["code"], 404);
}

#[tokio::test]
async fn oversized_page_is_a_bad_request() {
    let (app, _) = app().await;

    let response = warp::test::request()
        .path("/api/recipes?page=9223372036854775807&limit=100")
        .reply(&app)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscriptions_over_http() {
    let (app, catalog) = app().await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/recipes")
        .header("authorization", bearer(1))
        .json(&pancakes(&catalog))
        .reply(&app)
        .await;
    let recipe_id = body(&response)["id"].as_i64().unwrap();

    let response = warp::test::request()
        .method("POST")
        .path("/api/users/1/subscribe?recipes_limit=0")
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = warp::test::request()
        .method("POST")
        .path("/api/users/1/subscribe?recipes_limit=0")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let author = body(&response);
    assert_eq!(author["id"], 1);
    assert_eq!(author["is_subscribed"], true);
    assert_eq!(author["recipes_count"], 1);
    assert_eq!(author["recipes"].as_array().unwrap().len(), 0);

    let response = warp::test::request()
        .method("POST")
        .path("/api/users/1/subscribe")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"], "already_subscribed");

    let response = warp::test::request()
        .method("POST")
        .path("/api/users/2/subscribe")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"], "self_subscription");

    let response = warp::test::request()
        .path(&format!("/api/recipes/{recipe_id}"))
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(body(&response)["is_subscribed"], true);

    let response = warp::test::request()
        .path("/api/users/subscriptions")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body(&response);
    assert_eq!(page["total_rows"], 1);
    assert_eq!(page["rows"][0]["recipes"][0]["name"], "Pancakes");

    let response = warp::test::request()
        .method("DELETE")
        .path("/api/users/1/subscribe")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = warp::test::request()
        .method("DELETE")
        .path("/api/users/1/subscribe")
        .header("authorization", bearer(2))
        .reply(&app)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&response)["error"], "not_subscribed");
}
