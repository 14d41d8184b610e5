use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub smtp: SmtpConfig,
    pub invoicing: InvoicingConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CacheConfig {
    pub url: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InvoicingConfig {
    pub base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let db_url = env::var("PAYMENT_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name =
            env::var("PAYMENT_DATABASE_NAME").unwrap_or_else(|_| "payment_db".to_string());

        let cache_url =
            env::var("PAYMENT_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let smtp_enabled = env::var("PAYMENT_SMTP_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let smtp_host = env::var("PAYMENT_SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("PAYMENT_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()?;
        let smtp_user = env::var("PAYMENT_SMTP_USER").unwrap_or_default();
        let smtp_password = env::var("PAYMENT_SMTP_PASSWORD").unwrap_or_default();
        let from_email = env::var("PAYMENT_SMTP_FROM_EMAIL")
            .unwrap_or_else(|_| "billing@example.com".to_string());
        let from_name =
            env::var("PAYMENT_SMTP_FROM_NAME").unwrap_or_else(|_| "SecurePayments".to_string());

        let invoice_base_url = env::var("PAYMENT_INVOICE_BASE_URL")
            .unwrap_or_else(|_| "https://api.example.com/invoices".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            cache: CacheConfig {
                url: Secret::new(cache_url),
            },
            smtp: SmtpConfig {
                enabled: smtp_enabled,
                host: smtp_host,
                port: smtp_port,
                user: smtp_user,
                password: Secret::new(smtp_password),
                from_email,
                from_name,
            },
            invoicing: InvoicingConfig {
                base_url: invoice_base_url,
            },
            service_name: "payment-service".to_string(),
        })
    }
}
