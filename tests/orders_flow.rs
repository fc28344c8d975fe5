mod common;

use common::{TestApp, test_app};
use storefront_api::{
    dto::{cart::AddToCartRequest, orders::PlaceOrderRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, Product, Role},
    routes::params::Pagination,
    services::{cart_service, order_service},
};

async fn add(app: &TestApp, user: &AuthUser, product: &Product, quantity: i32) {
    cart_service::add_to_cart(
        &app.state,
        user,
        AddToCartRequest {
            product_id: product.id,
            quantity,
        },
    )
    .await
    .unwrap();
}

fn paid(discount_code: Option<&str>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        payment_intent_id: "pi_123".into(),
        discount_code: discount_code.map(str::to_string),
    }
}

#[tokio::test]
async fn placing_an_order_decrements_stock_and_clears_the_cart() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;
    let b = app.product(&misc, "Product B", 5.0, 3).await;

    add(&app, &alice, &a, 2).await;
    add(&app, &alice, &b, 1).await;

    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert_eq!(order.total_price, 25.0);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.payment_intent_id, "pi_123");
    assert_eq!(app.stock_of(&a).await, 3);
    assert_eq!(app.stock_of(&b).await, 2);

    let cart = cart_service::get_cart(&app.state, &alice)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!(cart.items.is_empty());

    assert_eq!(
        app.mailer.subjects_for("alice@example.com"),
        vec!["Order Confirmation".to_string()]
    );
}

#[tokio::test]
async fn insufficient_stock_fails_without_touching_the_cart() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;
    let b = app.product(&misc, "Product B", 5.0, 3).await;

    add(&app, &alice, &a, 2).await;
    add(&app, &alice, &b, 3).await;

    // Someone else bought product B in the meantime.
    let mut sold_out = b.clone();
    sold_out.stock = 1;
    app.state.store.products.save(sold_out).await.unwrap();

    let err = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Product B")));

    assert_eq!(app.stock_of(&a).await, 5);
    let cart = cart_service::get_cart(&app.state, &alice)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(cart.items.len(), 2);
}

#[tokio::test]
async fn active_discount_code_reduces_the_total() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 12.5, 10).await;
    app.discount("SAVE20", 20.0, true).await;

    add(&app, &alice, &a, 2).await;

    let order = order_service::place_order(&app.state, &alice, paid(Some("SAVE20")))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!((order.total_price - 20.0).abs() < 1e-9);
}

#[tokio::test]
async fn inactive_or_unknown_discount_code_fails_the_order() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 10).await;
    app.discount("OLD", 50.0, false).await;

    add(&app, &alice, &a, 1).await;

    for code in ["OLD", "NOPE"] {
        let err = order_service::place_order(&app.state, &alice, paid(Some(code)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "code {code}");
    }

    assert_eq!(app.stock_of(&a).await, 10);
}

#[tokio::test]
async fn unpaid_intent_and_empty_cart_are_rejected() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 10).await;

    let err = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "Cart is empty"));

    add(&app, &alice, &a, 1).await;
    app.payments.set_status("requires_payment_method");
    let err = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("requires_payment_method")));
    assert_eq!(app.stock_of(&a).await, 10);
}

#[tokio::test]
async fn malformed_intent_ids_never_reach_the_provider() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 10).await;
    add(&app, &alice, &a, 1).await;

    for id in ["../charges/ch_1", "ch_1", "pi_1/../../charges/ch_1"] {
        let err = order_service::place_order(
            &app.state,
            &alice,
            PlaceOrderRequest {
                payment_intent_id: id.into(),
                discount_code: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "id {id}");
    }

    assert!(app.payments.retrieved.lock().unwrap().is_empty());
    assert_eq!(app.stock_of(&a).await, 10);
}

#[tokio::test]
async fn cancelling_restores_stock_and_only_works_once() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;

    add(&app, &alice, &a, 4).await;
    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(app.stock_of(&a).await, 1);

    let cancelled = order_service::cancel_order(&app.state, &alice, order.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(app.stock_of(&a).await, 5);
    assert_eq!(*app.payments.cancelled.lock().unwrap(), vec!["pi_123".to_string()]);
    assert!(
        app.mailer
            .subjects_for("alice@example.com")
            .contains(&"Order Cancelled".to_string())
    );

    let err = order_service::cancel_order(&app.state, &alice, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(app.stock_of(&a).await, 5);
}

#[tokio::test]
async fn provider_failure_keeps_the_order_pending() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;

    add(&app, &alice, &a, 2).await;
    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    app.payments.fail_cancellations();
    let err = order_service::cancel_order(&app.state, &alice, order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Payment(_)));

    let stored = app.state.store.orders.find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(app.stock_of(&a).await, 3);
}

#[tokio::test]
async fn other_users_cannot_see_or_cancel_an_order() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let mallory = app.user("mallory", Role::User).await;
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;

    add(&app, &alice, &a, 1).await;
    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert!(matches!(
        order_service::get_order(&app.state, &mallory, order.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        order_service::cancel_order(&app.state, &mallory, order.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(order_service::get_order(&app.state, &admin, order.id).await.is_ok());
}

#[tokio::test]
async fn admin_cancellation_notifies_the_order_owner() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;

    add(&app, &alice, &a, 2).await;
    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    order_service::cancel_order(&app.state, &admin, order.id)
        .await
        .unwrap();
    assert!(
        app.mailer
            .subjects_for("alice@example.com")
            .contains(&"Order Cancelled".to_string())
    );
    assert!(
        !app.mailer
            .subjects_for("admin@example.com")
            .contains(&"Order Cancelled".to_string())
    );
    assert_eq!(app.stock_of(&a).await, 5);
}

#[tokio::test]
async fn only_admins_update_status_and_any_transition_is_accepted() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 5).await;

    add(&app, &alice, &a, 1).await;
    let order = order_service::place_order(&app.state, &alice, paid(None))
        .await
        .unwrap()
        .into_data()
        .unwrap();

    let err = order_service::update_order_status(&app.state, &alice, order.id, OrderStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    order_service::cancel_order(&app.state, &alice, order.id)
        .await
        .unwrap();
    let revived = order_service::update_order_status(&app.state, &admin, order.id, OrderStatus::Pending)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(revived.status, OrderStatus::Pending);
    assert!(
        app.mailer
            .subjects_for("alice@example.com")
            .contains(&"Order Status Update".to_string())
    );
}

#[tokio::test]
async fn orders_are_listed_per_user() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let bob = app.user("bob", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 10.0, 50).await;

    for _ in 0..3 {
        add(&app, &alice, &a, 1).await;
        order_service::place_order(&app.state, &alice, paid(None))
            .await
            .unwrap();
    }

    let resp = order_service::list_orders(&app.state, &alice, Pagination::default())
        .await
        .unwrap();
    assert_eq!(resp.meta.as_ref().and_then(|m| m.total), Some(3));
    assert_eq!(resp.into_data().unwrap().items.len(), 3);

    let resp = order_service::list_orders(&app.state, &bob, Pagination::default())
        .await
        .unwrap();
    assert!(resp.into_data().unwrap().items.is_empty());
}

#[tokio::test]
async fn payment_intent_is_created_for_the_cart_total() {
    let app = test_app();
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let a = app.product(&misc, "Product A", 19.99, 5).await;

    assert!(matches!(
        order_service::create_cart_payment_intent(&app.state, &alice).await,
        Err(AppError::BadRequest(_))
    ));

    add(&app, &alice, &a, 2).await;
    let intent = order_service::create_cart_payment_intent(&app.state, &alice)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(intent.amount, 3998);
    assert_eq!(*app.payments.created.lock().unwrap(), vec![3998]);

    assert!(order_service::create_payment_intent(&app.state, 0.0).await.is_err());
}
