mod common;

use common::test_app;
use storefront_api::{
    dto::{
        cart::AddToCartRequest,
        categories::CreateCategoryRequest,
        discounts::{CreateDiscountRequest, SetDiscountActiveRequest},
        orders::PlaceOrderRequest,
        products::UpdateProductRequest,
    },
    error::AppError,
    models::Role,
    services::{cart_service, category_service, discount_service, order_service, product_service},
};

fn no_changes() -> UpdateProductRequest {
    UpdateProductRequest {
        name: None,
        description: None,
        price: None,
        stock: None,
        image_url: None,
        category_id: None,
    }
}

fn discount(code: &str, percentage: f64) -> CreateDiscountRequest {
    CreateDiscountRequest {
        code: code.into(),
        discount_percentage: percentage,
        active: true,
    }
}

#[tokio::test]
async fn search_is_case_insensitive_and_blank_lists_everything() {
    let app = test_app();
    let misc = app.category("Misc").await;
    app.product(&misc, "Ferris Mug", 12.0, 5).await;
    app.product(&misc, "Crab Mug", 8.0, 5).await;
    app.product(&misc, "Tee", 20.0, 5).await;

    let found = product_service::search_products(&app.state, Some("mUg".into()))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    let mut names: Vec<_> = found.items.iter().map(|p| p.product.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Crab Mug".to_string(), "Ferris Mug".to_string()]);

    for blank in [None, Some("   ".to_string())] {
        let all = product_service::search_products(&app.state, blank)
            .await
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(all.items.len(), 3);
    }
}

#[tokio::test]
async fn products_are_listed_per_category_with_its_name() {
    let app = test_app();
    let kitchen = app.category("Kitchen").await;
    let apparel = app.category("Apparel").await;
    app.product(&kitchen, "Mug", 12.0, 5).await;
    app.product(&apparel, "Tee", 20.0, 5).await;
    app.product(&apparel, "Hoodie", 55.0, 5).await;

    let listed = product_service::products_by_category(&app.state, apparel.id)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(listed.items.len(), 2);
    for item in &listed.items {
        assert_eq!(item.product.category_id, apparel.id);
        assert_eq!(item.category_name.as_deref(), Some("Apparel"));
        assert_eq!(item.average_rating, 0.0);
    }
}

#[tokio::test]
async fn categories_are_unique_and_kept_while_in_use() {
    let app = test_app();
    let admin = app.user("admin", Role::Admin).await;
    let alice = app.user("alice", Role::User).await;

    let request = || CreateCategoryRequest {
        name: "Books".into(),
        description: None,
    };

    assert!(matches!(
        category_service::create_category(&app.state, &alice, request()).await,
        Err(AppError::Forbidden(_))
    ));
    let books = category_service::create_category(&app.state, &admin, request())
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert!(matches!(
        category_service::create_category(&app.state, &admin, request()).await,
        Err(AppError::BadRequest(_))
    ));

    let novel = app.product(&books, "Novel", 9.0, 3).await;
    assert!(matches!(
        category_service::delete_category(&app.state, &admin, books.id).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(category_service::get_category(&app.state, books.id).await.is_ok());

    product_service::delete_product(&app.state, &admin, novel.id)
        .await
        .unwrap();
    category_service::delete_category(&app.state, &admin, books.id)
        .await
        .unwrap();
    assert!(matches!(
        category_service::get_category(&app.state, books.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn partial_updates_are_validated_and_leave_the_product_untouched_on_error() {
    let app = test_app();
    let admin = app.user("admin", Role::Admin).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 12.0, 5).await;

    let negative_stock = UpdateProductRequest {
        stock: Some(-1),
        ..no_changes()
    };
    assert!(matches!(
        product_service::update_product(&app.state, &admin, mug.id, negative_stock).await,
        Err(AppError::BadRequest(_))
    ));

    let negative_price = UpdateProductRequest {
        price: Some(-0.5),
        ..no_changes()
    };
    assert!(matches!(
        product_service::update_product(&app.state, &admin, mug.id, negative_price).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(app.stock_of(&mug).await, 5);

    let repriced = product_service::update_product(
        &app.state,
        &admin,
        mug.id,
        UpdateProductRequest {
            price: Some(15.0),
            ..no_changes()
        },
    )
    .await
    .unwrap()
    .into_data()
    .unwrap();
    assert_eq!(repriced.product.price, 15.0);
    assert_eq!(repriced.product.name, "Mug");
    assert_eq!(repriced.product.stock, 5);
}

#[tokio::test]
async fn discount_codes_are_validated_on_creation() {
    let app = test_app();
    let admin = app.user("admin", Role::Admin).await;
    let alice = app.user("alice", Role::User).await;

    assert!(matches!(
        discount_service::create_discount_code(&app.state, &alice, discount("HALF", 50.0)).await,
        Err(AppError::Forbidden(_))
    ));
    for percentage in [0.0, -5.0, 100.5] {
        assert!(
            matches!(
                discount_service::create_discount_code(&app.state, &admin, discount("BAD", percentage))
                    .await,
                Err(AppError::BadRequest(_))
            ),
            "percentage {percentage}"
        );
    }

    discount_service::create_discount_code(&app.state, &admin, discount("FULL", 100.0))
        .await
        .unwrap();
    assert!(matches!(
        discount_service::create_discount_code(&app.state, &admin, discount("FULL", 10.0)).await,
        Err(AppError::BadRequest(_))
    ));

    let codes = discount_service::list_discount_codes(&app.state, &admin)
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(codes.len(), 1);
}

#[tokio::test]
async fn deactivated_codes_fail_the_order() {
    let app = test_app();
    let admin = app.user("admin", Role::Admin).await;
    let alice = app.user("alice", Role::User).await;
    let misc = app.category("Misc").await;
    let mug = app.product(&misc, "Mug", 10.0, 5).await;

    let code = discount_service::create_discount_code(&app.state, &admin, discount("SPRING", 10.0))
        .await
        .unwrap()
        .into_data()
        .unwrap();
    let code = discount_service::set_discount_active(
        &app.state,
        &admin,
        code.id,
        SetDiscountActiveRequest { active: false },
    )
    .await
    .unwrap()
    .into_data()
    .unwrap();
    assert!(!code.active);

    cart_service::add_to_cart(
        &app.state,
        &alice,
        AddToCartRequest {
            product_id: mug.id,
            quantity: 1,
        },
    )
    .await
    .unwrap();
    let err = order_service::place_order(
        &app.state,
        &alice,
        PlaceOrderRequest {
            payment_intent_id: "pi_spring".into(),
            discount_code: Some("SPRING".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(app.stock_of(&mug).await, 5);
}
