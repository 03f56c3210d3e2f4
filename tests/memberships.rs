mod common;

use common::{publish, seed, user};
use foodgram_sdk::{
    add_membership, connect, error::Error, get_recipe, list_memberships, remove_membership,
    schema::MembershipKind,
};

#[tokio::test]
async fn adding_twice_reports_already_exists() {
    let pool = common::memory_pool().await;
    let catalog = seed(&pool).await;
    let recipe = publish(&pool, &user(1), "Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]).await;

    let (entry, minified) = add_membership(2, recipe.id, MembershipKind::Favorite, &pool)
        .await
        .unwrap();
    assert_eq!(entry.user_id, 2);
    assert_eq!(entry.kind, MembershipKind::Favorite);
    assert_eq!(minified.id, recipe.id);
    assert_eq!(minified.name, "Pancakes");

    let e = add_membership(2, recipe.id, MembershipKind::Favorite, &pool)
        .await
        .unwrap_err();
    assert!(matches!(
        e,
        Error::AlreadyExists {
            kind: MembershipKind::Favorite,
            ..
        }
    ));
    assert_eq!(
        list_memberships(2, MembershipKind::Favorite, &pool)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn kinds_and_users_are_independent() {
    let pool = common::memory_pool().await;
    let catalog = seed(&pool).await;
    let recipe = publish(&pool, &user(1), "Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]).await;

    add_membership(2, recipe.id, MembershipKind::Favorite, &pool).await.unwrap();
    add_membership(2, recipe.id, MembershipKind::CartItem, &pool).await.unwrap();
    add_membership(3, recipe.id, MembershipKind::Favorite, &pool).await.unwrap();

    let seen_by_2 = get_recipe(recipe.id, Some(2), &pool).await.unwrap();
    assert!(seen_by_2.is_favorited);
    assert!(seen_by_2.is_in_shopping_cart);

    let seen_by_3 = get_recipe(recipe.id, Some(3), &pool).await.unwrap();
    assert!(seen_by_3.is_favorited);
    assert!(!seen_by_3.is_in_shopping_cart);

    let anonymous = get_recipe(recipe.id, None, &pool).await.unwrap();
    assert!(!anonymous.is_favorited);
}

#[tokio::test]
async fn removing_a_missing_entry_reports_not_found() {
    let pool = common::memory_pool().await;
    let catalog = seed(&pool).await;
    let recipe = publish(&pool, &user(1), "Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]).await;

    add_membership(2, recipe.id, MembershipKind::CartItem, &pool).await.unwrap();
    remove_membership(2, recipe.id, MembershipKind::CartItem, &pool).await.unwrap();

    let e = remove_membership(2, recipe.id, MembershipKind::CartItem, &pool)
        .await
        .unwrap_err();
    assert!(matches!(
        e,
        Error::NotFound {
            kind: MembershipKind::CartItem,
            ..
        }
    ));
    assert!(!get_recipe(recipe.id, Some(2), &pool).await.unwrap().is_in_shopping_cart);
}

#[tokio::test]
async fn unknown_recipe_is_reported_before_membership_state() {
    let pool = common::memory_pool().await;
    seed(&pool).await;

    assert!(matches!(
        add_membership(2, 77, MembershipKind::Favorite, &pool).await,
        Err(Error::RecipeNotFound(77))
    ));
    assert!(matches!(
        remove_membership(2, 77, MembershipKind::Favorite, &pool).await,
        Err(Error::RecipeNotFound(77))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_store_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("race.db").display());
    let pool = connect(&url, 4).await.unwrap();
    let catalog = seed(&pool).await;
    let recipe = publish(&pool, &user(1), "Pancakes", &[catalog.breakfast], &[(catalog.flour, 200)]).await;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                add_membership(2, recipe.id, MembershipKind::Favorite, &pool).await
            })
        })
        .collect();

    let mut added = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => added += 1,
            Err(Error::AlreadyExists { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(added, 1);
    assert_eq!(rejected, 3);
    assert_eq!(
        list_memberships(2, MembershipKind::Favorite, &pool)
            .await
            .unwrap()
            .len(),
        1
    );
}
