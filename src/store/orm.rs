use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        cart_items::{self, Entity as CartItems},
        categories::{self, Entity as Categories},
        discount_codes::{self, Entity as DiscountCodes},
        order_items::{self, Entity as OrderItems},
        orders::{self, Entity as Orders},
        products::{self, Entity as Products},
        reviews::{self, Entity as Reviews},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{
        CartItem, Category, DiscountCode, Order, OrderItem, OrderStatus, Product, Review, User,
    },
};

use super::{
    CartStore, CategoryStore, DiscountStore, OrderStore, PageRequest, ProductFilter, ProductSort,
    ProductStore, ReviewStore, UserStore,
};

/// sea-orm backed store over a Postgres connection pool.
#[derive(Clone)]
pub struct OrmStore {
    conn: DatabaseConnection,
}

impl OrmStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn corrupt(field: &str, err: String) -> AppError {
    AppError::Internal(anyhow::anyhow!("stored {field} is invalid: {err}"))
}

fn user_from_entity(model: users::Model) -> AppResult<User> {
    Ok(User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        role: model.role.parse().map_err(|e| corrupt("role", e))?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn category_from_entity(model: categories::Model) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
    }
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        image_url: model.image_url,
        category_id: model.category_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn cart_item_from_entity(model: cart_items::Model) -> CartItem {
    CartItem {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        unit_price: model.unit_price,
        quantity: model.quantity,
    }
}

fn order_from_entity(model: orders::Model, items: Vec<OrderItem>) -> AppResult<Order> {
    let status: OrderStatus = model.status.parse().map_err(|e| corrupt("status", e))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items,
        order_date: model.order_date.with_timezone(&Utc),
        total_price: model.total_price,
        status,
        payment_intent_id: model.payment_intent_id,
    })
}

fn review_from_entity(model: reviews::Model) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        username: model.username,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
        approved: model.approved,
    }
}

fn discount_from_entity(model: discount_codes::Model) -> DiscountCode {
    DiscountCode {
        id: model.id,
        code: model.code,
        discount_percentage: model.discount_percentage,
        active: model.active,
    }
}

#[async_trait]
impl UserStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Users::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn save(&self, user: User) -> AppResult<User> {
        let exists = Users::find_by_id(user.id).one(&self.conn).await?.is_some();
        let active = users::ActiveModel {
            id: Set(user.id),
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            role: Set(user.role.as_str().to_string()),
            created_at: Set(user.created_at.into()),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        user_from_entity(model)
    }
}

#[async_trait]
impl CategoryStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(Categories::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(category_from_entity))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        Ok(Categories::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.conn)
            .await?
            .map(category_from_entity))
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        Ok(Categories::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect())
    }

    async fn save(&self, category: Category) -> AppResult<Category> {
        let exists = Categories::find_by_id(category.id)
            .one(&self.conn)
            .await?
            .is_some();
        let active = categories::ActiveModel {
            id: Set(category.id),
            name: Set(category.name),
            description: Set(category.description),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        Ok(category_from_entity(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Categories::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl ProductStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(Products::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(product_from_entity))
    }

    async fn find(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Product>, u64)> {
        let mut condition = Condition::all();
        if let Some(search) = filter.name_contains.as_ref() {
            condition = condition.add(Expr::col(products::Column::Name).ilike(format!("%{search}%")));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(products::Column::CategoryId.eq(category_id));
        }
        if let Some(min_price) = filter.min_price {
            condition = condition.add(products::Column::Price.gte(min_price));
        }
        if let Some(max_price) = filter.max_price {
            condition = condition.add(products::Column::Price.lte(max_price));
        }

        let sort_col = match filter.sort {
            ProductSort::CreatedAt => products::Column::CreatedAt,
            ProductSort::Price => products::Column::Price,
            ProductSort::Name => products::Column::Name,
        };

        let mut finder = Products::find().filter(condition);
        finder = if filter.descending {
            finder.order_by_desc(sort_col)
        } else {
            finder.order_by_asc(sort_col)
        };

        let total = finder.clone().count(&self.conn).await?;

        let items = finder
            .limit(page.limit())
            .offset(page.offset())
            .all(&self.conn)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();

        Ok((items, total))
    }

    async fn count_in_category(&self, category_id: Uuid) -> AppResult<u64> {
        Ok(Products::find()
            .filter(products::Column::CategoryId.eq(category_id))
            .count(&self.conn)
            .await?)
    }

    async fn save(&self, product: Product) -> AppResult<Product> {
        let exists = Products::find_by_id(product.id)
            .one(&self.conn)
            .await?
            .is_some();
        let active = products::ActiveModel {
            id: Set(product.id),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock: Set(product.stock),
            image_url: Set(product.image_url),
            category_id: Set(product.category_id),
            created_at: Set(product.created_at.into()),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        Ok(product_from_entity(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Products::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl CartStore for OrmStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<CartItem>> {
        Ok(CartItems::find()
            .filter(cart_items::Column::UserId.eq(user_id))
            .order_by_asc(cart_items::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(cart_item_from_entity)
            .collect())
    }

    async fn find_item(&self, id: Uuid) -> AppResult<Option<CartItem>> {
        Ok(CartItems::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(cart_item_from_entity))
    }

    async fn save_item(&self, item: CartItem) -> AppResult<CartItem> {
        let exists = CartItems::find_by_id(item.id)
            .one(&self.conn)
            .await?
            .is_some();
        let active = cart_items::ActiveModel {
            id: Set(item.id),
            user_id: Set(item.user_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            created_at: Set(item.created_at.into()),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        Ok(cart_item_from_entity(model))
    }

    async fn delete_item(&self, id: Uuid) -> AppResult<bool> {
        let result = CartItems::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    async fn clear(&self, user_id: Uuid) -> AppResult<()> {
        CartItems::delete_many()
            .filter(cart_items::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}

impl OrmStore {
    async fn load_items(&self, order_ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, Vec<OrderItem>>> {
        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }
        let rows = OrderItems::find()
            .filter(order_items::Column::OrderId.is_in(order_ids))
            .all(&self.conn)
            .await?;
        for row in rows {
            grouped
                .entry(row.order_id)
                .or_default()
                .push(order_item_from_entity(row));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl OrderStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        let Some(order) = Orders::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };
        let mut items = self.load_items(vec![order.id]).await?;
        let items = items.remove(&order.id).unwrap_or_default();
        order_from_entity(order, items).map(Some)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> AppResult<(Vec<Order>, u64)> {
        let finder = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::OrderDate);

        let total = finder.clone().count(&self.conn).await?;
        let rows = finder
            .limit(page.limit())
            .offset(page.offset())
            .all(&self.conn)
            .await?;

        let mut items = self
            .load_items(rows.iter().map(|order| order.id).collect())
            .await?;
        let orders = rows
            .into_iter()
            .map(|order| {
                let order_items = items.remove(&order.id).unwrap_or_default();
                order_from_entity(order, order_items)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok((orders, total))
    }

    async fn has_purchased(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let count = OrderItems::find()
            .inner_join(Orders)
            .filter(order_items::Column::ProductId.eq(product_id))
            .filter(orders::Column::UserId.eq(user_id))
            .filter(orders::Column::Status.ne(OrderStatus::Cancelled.as_str()))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    async fn save(&self, order: Order) -> AppResult<Order> {
        let txn = self.conn.begin().await?;

        let exists = Orders::find_by_id(order.id).one(&txn).await?.is_some();
        let active = orders::ActiveModel {
            id: Set(order.id),
            user_id: Set(order.user_id),
            order_date: Set(order.order_date.into()),
            total_price: Set(order.total_price),
            status: Set(order.status.as_str().to_string()),
            payment_intent_id: Set(order.payment_intent_id.clone()),
        };
        if exists {
            active.update(&txn).await?;
        } else {
            active.insert(&txn).await?;
        }

        OrderItems::delete_many()
            .filter(order_items::Column::OrderId.eq(order.id))
            .exec(&txn)
            .await?;
        for item in &order.items {
            order_items::ActiveModel {
                id: Set(item.id),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                unit_price: Set(item.unit_price),
                quantity: Set(item.quantity),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(order)
    }
}

#[async_trait]
impl ReviewStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Review>> {
        Ok(Reviews::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(review_from_entity))
    }

    async fn find_by_product(&self, product_id: Uuid) -> AppResult<Vec<Review>> {
        Ok(Reviews::find()
            .filter(reviews::Column::ProductId.eq(product_id))
            .order_by_desc(reviews::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(review_from_entity)
            .collect())
    }

    async fn exists_for(&self, user_id: Uuid, product_id: Uuid) -> AppResult<bool> {
        let count = Reviews::find()
            .filter(reviews::Column::UserId.eq(user_id))
            .filter(reviews::Column::ProductId.eq(product_id))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    async fn average_rating(&self, product_id: Uuid) -> AppResult<f64> {
        let ratings: Vec<i32> = Reviews::find()
            .select_only()
            .column(reviews::Column::Rating)
            .filter(reviews::Column::ProductId.eq(product_id))
            .into_tuple()
            .all(&self.conn)
            .await?;
        if ratings.is_empty() {
            return Ok(0.0);
        }
        let sum: i32 = ratings.iter().sum();
        Ok(f64::from(sum) / ratings.len() as f64)
    }

    async fn save(&self, review: Review) -> AppResult<Review> {
        let exists = Reviews::find_by_id(review.id)
            .one(&self.conn)
            .await?
            .is_some();
        let active = reviews::ActiveModel {
            id: Set(review.id),
            product_id: Set(review.product_id),
            user_id: Set(review.user_id),
            username: Set(review.username),
            rating: Set(review.rating),
            comment: Set(review.comment),
            created_at: Set(review.created_at.into()),
            approved: Set(review.approved),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        Ok(review_from_entity(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = Reviews::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl DiscountStore for OrmStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<DiscountCode>> {
        Ok(DiscountCodes::find_by_id(id)
            .one(&self.conn)
            .await?
            .map(discount_from_entity))
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<DiscountCode>> {
        Ok(DiscountCodes::find()
            .filter(discount_codes::Column::Code.eq(code))
            .one(&self.conn)
            .await?
            .map(discount_from_entity))
    }

    async fn list(&self) -> AppResult<Vec<DiscountCode>> {
        Ok(DiscountCodes::find()
            .order_by_asc(discount_codes::Column::Code)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(discount_from_entity)
            .collect())
    }

    async fn save(&self, code: DiscountCode) -> AppResult<DiscountCode> {
        let exists = DiscountCodes::find_by_id(code.id)
            .one(&self.conn)
            .await?
            .is_some();
        let active = discount_codes::ActiveModel {
            id: Set(code.id),
            code: Set(code.code),
            discount_percentage: Set(code.discount_percentage),
            active: Set(code.active),
        };
        let model = if exists {
            active.update(&self.conn).await?
        } else {
            active.insert(&self.conn).await?
        };
        Ok(discount_from_entity(model))
    }
}
