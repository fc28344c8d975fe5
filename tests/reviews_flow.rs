mod common;

use chrono::{Duration, Utc};
use common::{TestApp, test_app};
use storefront_api::{
    dto::{
        cart::AddToCartRequest,
        orders::PlaceOrderRequest,
        reviews::{AddReviewRequest, EditReviewRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{Product, Role},
    services::{cart_service, order_service, product_service, review_service},
};

async fn buy(app: &TestApp, user: &AuthUser, product: &Product) {
    cart_service::add_to_cart(
        &app.state,
        user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await
    .unwrap();
    order_service::place_order(
        &app.state,
        user,
        PlaceOrderRequest {
            payment_intent_id: "pi_review".into(),
            discount_code: None,
        },
    )
    .await
    .unwrap();
}

fn review(product: &Product, rating: i32) -> AddReviewRequest {
    AddReviewRequest {
        product_id: product.id,
        rating,
        comment: "Solid".into(),
    }
}

#[tokio::test]
async fn only_buyers_review_and_only_once() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 8.0, 10).await;

    let err = review_service::add_review(&app.state, &alice, review(&mug, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    buy(&app, &alice, &mug).await;
    let created = review_service::add_review(&app.state, &alice, review(&mug, 5))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!(!created.approved);
    assert_eq!(created.username, "alice");

    let err = review_service::add_review(&app.state, &alice, review(&mug, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("already")));
}

#[tokio::test]
async fn rating_and_comment_are_validated() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 8.0, 10).await;
    buy(&app, &alice, &mug).await;

    for rating in [0, 6] {
        assert!(matches!(
            review_service::add_review(&app.state, &alice, review(&mug, rating)).await,
            Err(AppError::BadRequest(_))
        ));
    }

    let long = AddReviewRequest {
        comment: "x".repeat(501),
        ..review(&mug, 3)
    };
    assert!(matches!(
        review_service::add_review(&app.state, &alice, long).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn pending_reviews_are_hidden_until_approved() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 8.0, 10).await;
    buy(&app, &alice, &mug).await;

    let created = review_service::add_review(&app.state, &alice, review(&mug, 4))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    let public = review_service::get_product_reviews(&app.state, None, mug.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!(public.items.is_empty());

    let for_author = review_service::get_product_reviews(&app.state, Some(&alice), mug.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!(for_author.items.is_empty());

    let for_admin = review_service::get_product_reviews(&app.state, Some(&admin), mug.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(for_admin.items.len(), 1);

    assert!(matches!(
        review_service::approve_review(&app.state, &alice, created.id).await,
        Err(AppError::Forbidden(_))
    ));
    review_service::approve_review(&app.state, &admin, created.id)
        .await
        .unwrap();

    let public = review_service::get_product_reviews(&app.state, None, mug.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(public.items.len(), 1);

    let product = product_service::get_product(&app.state, mug.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(product.average_rating, 4.0);
}

#[tokio::test]
async fn authors_edit_within_the_window_only() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let bob = app.user("bob", Role::User).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 8.0, 10).await;
    buy(&app, &alice, &mug).await;

    let created = review_service::add_review(&app.state, &alice, review(&mug, 2))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    let edit = || EditReviewRequest {
        rating: 5,
        comment: "Grew on me".into(),
    };

    assert!(matches!(
        review_service::edit_review(&app.state, &bob, created.id, edit()).await,
        Err(AppError::Forbidden(_))
    ));

    let edited = review_service::edit_review(&app.state, &alice, created.id, edit())
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(edited.rating, 5);

    let mut stale = edited.clone();
    stale.created_at = Utc::now() - Duration::hours(25);
    app.state.store.reviews.save(stale).await.unwrap();
    assert!(matches!(
        review_service::edit_review(&app.state, &alice, created.id, edit()).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn admins_delete_reviews() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 8.0, 10).await;
    buy(&app, &alice, &mug).await;

    let created = review_service::add_review(&app.state, &alice, review(&mug, 1))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert!(matches!(
        review_service::delete_review(&app.state, &alice, created.id).await,
        Err(AppError::Forbidden(_))
    ));
    review_service::delete_review(&app.state, &admin, created.id)
        .await
        .unwrap();
    assert!(matches!(
        review_service::delete_review(&app.state, &admin, created.id).await,
        Err(AppError::NotFound(_))
    ));
}
