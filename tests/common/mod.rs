#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;
use storefront_api::{
    mail::{EmailMessage, Mailer},
    middleware::auth::AuthUser,
    models::{Category, DiscountCode, Product, Role, User},
    payments::{PaymentGateway, PaymentIntent, STATUS_SUCCEEDED},
    state::{AppState, JwtSettings},
    store::Store,
};
use uuid::Uuid;

/// Payment gateway double. Every intent reports `status`.
pub struct FakePayments {
    pub status: Mutex<String>,
    pub fail_cancel: Mutex<bool>,
    pub cancelled: Mutex<Vec<String>>,
    pub created: Mutex<Vec<i64>>,
    pub retrieved: Mutex<Vec<String>>,
}

impl FakePayments {
    pub fn new() -> Self {
        Self {
            status: Mutex::new(STATUS_SUCCEEDED.to_string()),
            fail_cancel: Mutex::new(false),
            cancelled: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            retrieved: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    pub fn fail_cancellations(&self) {
        *self.fail_cancel.lock().unwrap() = true;
    }

    fn intent(&self, id: &str, amount: i64) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            status: self.status.lock().unwrap().clone(),
            amount,
            currency: "usd".into(),
            client_secret: Some(format!("{id}_secret")),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for FakePayments {
    async fn create_intent(&self, amount_minor: i64, _currency: &str) -> anyhow::Result<PaymentIntent> {
        self.created.lock().unwrap().push(amount_minor);
        Ok(self.intent("pi_new", amount_minor))
    }

    async fn retrieve_intent(&self, id: &str) -> anyhow::Result<PaymentIntent> {
        self.retrieved.lock().unwrap().push(id.to_string());
        Ok(self.intent(id, 0))
    }

    async fn cancel_intent(&self, id: &str) -> anyhow::Result<PaymentIntent> {
        if *self.fail_cancel.lock().unwrap() {
            anyhow::bail!("provider unavailable");
        }
        self.cancelled.lock().unwrap().push(id.to_string());
        let mut intent = self.intent(id, 0);
        intent.status = "canceled".into();
        Ok(intent)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn subjects_for(&self, to: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == to)
            .map(|m| m.subject.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub payments: Arc<FakePayments>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_app() -> TestApp {
    let payments = Arc::new(FakePayments::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState {
        store: Store::in_memory(),
        payments: payments.clone(),
        mailer: mailer.clone(),
        jwt: JwtSettings {
            secret: "test-secret".into(),
            ttl_hours: 1,
        },
        currency: "usd".into(),
    };
    TestApp {
        state,
        payments,
        mailer,
    }
}

impl TestApp {
    pub async fn user(&self, username: &str, role: Role) -> AuthUser {
        let user = self
            .state
            .store
            .users
            .save(User {
                id: Uuid::new_v4(),
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: String::new(),
                role,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        AuthUser {
            user_id: user.id,
            username: user.username,
            role,
        }
    }

    pub async fn category(&self, name: &str) -> Category {
        self.state
            .store
            .categories
            .save(Category {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    pub async fn product(&self, category: &Category, name: &str, price: f64, stock: i32) -> Product {
        self.state
            .store
            .products
            .save(Product {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: None,
                price,
                stock,
                image_url: None,
                category_id: category.id,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    pub async fn discount(&self, code: &str, percentage: f64, active: bool) -> DiscountCode {
        self.state
            .store
            .discounts
            .save(DiscountCode {
                id: Uuid::new_v4(),
                code: code.to_string(),
                discount_percentage: percentage,
                active,
            })
            .await
            .unwrap()
    }

    pub async fn stock_of(&self, product: &Product) -> i32 {
        self.state
            .store
            .products
            .find_by_id(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}
