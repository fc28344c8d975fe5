use std::sync::Arc;

use crate::{
    config::{AppConfig, StorageBackend},
    db::{create_orm_conn, run_migrations},
    mail::{DynMailer, LogMailer, SmtpMailer},
    payments::{DisabledGateway, DynPaymentGateway, StripeGateway},
    store::Store,
};

/// Token signing settings shared by login and the request extractor.
#[derive(Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub payments: DynPaymentGateway,
    pub mailer: DynMailer,
    pub jwt: JwtSettings,
    pub currency: String,
}

impl AppState {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;
                let conn = create_orm_conn(url).await?;
                run_migrations(&conn).await?;
                Store::orm(conn)
            }
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Store::in_memory()
            }
        };

        let payments: DynPaymentGateway = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripeGateway::new(&config.stripe_api_base, key)),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY is not set; payment calls will fail");
                Arc::new(DisabledGateway)
            }
        };

        let mailer: DynMailer = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, &config.mail_from)?),
            None => Arc::new(LogMailer),
        };

        Ok(Self {
            store,
            payments,
            mailer,
            jwt: JwtSettings {
                secret: config.jwt_secret.clone(),
                ttl_hours: config.jwt_ttl_hours,
            },
            currency: config.payment_currency.clone(),
        })
    }
}
