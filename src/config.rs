use std::env;
use std::time::Duration;

use crate::domain::PaymentProvider;
use crate::gateway::mercado_pago::MercadoPagoSettings;
use crate::gateway::stripe::StripeSettings;

/// Storage backend, swappable the same way the platform swaps bus backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    InMemory,
}

/// Application configuration parsed from environment variables. Gateway
/// adapters receive their settings from here at construction time; nothing
/// else in the service reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub default_provider: PaymentProvider,
    pub currency: String,
    pub checkout_timeout: Duration,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub pending_url: Option<String>,
    pub webhook_url: Option<String>,
    pub mercado_pago: Option<MercadoPagoSettings>,
    pub stripe: Option<StripeSettings>,
    pub mock_webhook_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8094".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let store = match env::var("STORE_TYPE")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => StoreKind::Postgres,
            "inmemory" => StoreKind::InMemory,
            other => return Err(format!("STORE_TYPE '{other}' is not supported")),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let provider_name =
            env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "mock".to_string());
        let default_provider = PaymentProvider::parse(&provider_name)
            .ok_or_else(|| format!("PAYMENT_PROVIDER '{provider_name}' is not supported"))?;

        let currency = env::var("CURRENCY").unwrap_or_else(|_| "BRL".to_string());

        let checkout_timeout_secs: u64 = env::var("CHECKOUT_TIMEOUT_SECS")
            .unwrap_or_else(|_| "45".to_string())
            .parse()
            .map_err(|_| "CHECKOUT_TIMEOUT_SECS must be a valid u64".to_string())?;

        let mercado_pago = match env::var("MERCADO_PAGO_ACCESS_TOKEN").ok() {
            Some(access_token) => {
                let webhook_secret = env::var("MERCADO_PAGO_WEBHOOK_SECRET")
                    .map_err(|_| "MERCADO_PAGO_WEBHOOK_SECRET must be set".to_string())?;
                Some(MercadoPagoSettings::new(access_token, webhook_secret))
            }
            None => None,
        };

        let stripe = match env::var("STRIPE_SECRET_KEY").ok() {
            Some(secret_key) => {
                let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
                    .map_err(|_| "STRIPE_WEBHOOK_SECRET must be set".to_string())?;
                Some(StripeSettings::new(secret_key, webhook_secret))
            }
            None => None,
        };

        let configured = match default_provider {
            PaymentProvider::MercadoPago => mercado_pago.is_some(),
            PaymentProvider::Stripe => stripe.is_some(),
            PaymentProvider::Mock => true,
        };
        if !configured {
            return Err(format!(
                "PAYMENT_PROVIDER is '{provider_name}' but its settings are missing"
            ));
        }

        Ok(Config {
            host,
            port,
            store,
            database_url,
            default_provider,
            currency,
            checkout_timeout: Duration::from_secs(checkout_timeout_secs),
            success_url: env::var("CHECKOUT_SUCCESS_URL").ok(),
            failure_url: env::var("CHECKOUT_FAILURE_URL").ok(),
            pending_url: env::var("CHECKOUT_PENDING_URL").ok(),
            webhook_url: env::var("PAYMENT_WEBHOOK_URL").ok(),
            mercado_pago,
            stripe,
            mock_webhook_secret: env::var("MOCK_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "mock-webhook-secret".to_string()),
        })
    }
}
