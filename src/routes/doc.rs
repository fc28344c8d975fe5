use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartView, RemoveCartItemRequest, UpdateCartItemRequest},
        categories::CreateCategoryRequest,
        discounts::{CreateDiscountRequest, SetDiscountActiveRequest},
        orders::{OrderList, PaymentIntentResponse, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductDto, ProductList, UpdateProductRequest},
        reviews::{AddReviewRequest, EditReviewRequest, ReviewList},
    },
    models::{Category, DiscountCode, Order, OrderItem, OrderStatus, Product, Review, Role, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, categories, discounts, health, orders, params, products as product_routes,
        reviews,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        product_routes::list_products,
        product_routes::search_products,
        product_routes::products_by_category,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::delete_category,
        reviews::add_review,
        reviews::product_reviews,
        reviews::edit_review,
        reviews::approve_review,
        reviews::delete_review,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        orders::update_order_status,
        orders::create_payment_intent,
        discounts::list_codes,
        discounts::create_code,
        discounts::set_active
    ),
    components(
        schemas(
            Role,
            User,
            Category,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            Review,
            DiscountCode,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AddToCartRequest,
            UpdateCartItemRequest,
            RemoveCartItemRequest,
            CartItemDto,
            CartView,
            CreateCategoryRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductDto,
            ProductList,
            AddReviewRequest,
            EditReviewRequest,
            ReviewList,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            PaymentIntentResponse,
            CreateDiscountRequest,
            SetDiscountActiveRequest,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<ProductDto>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<Order>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Catalog browsing and admin maintenance"),
        (name = "Categories", description = "Product categories"),
        (name = "Cart", description = "Per-user shopping cart"),
        (name = "Orders", description = "Checkout, payment intents and order lifecycle"),
        (name = "Reviews", description = "Product reviews and moderation"),
        (name = "Discounts", description = "Discount code administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
