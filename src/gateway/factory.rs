//! Provider-to-adapter resolution.
//!
//! Adapters are constructed once from resolved settings and registered
//! here; orchestration code resolves them by provider enum at call time.
//! An unregistered provider is an explicit error, never a silent fallback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::domain::PaymentProvider;

use super::mercado_pago::MercadoPagoGateway;
use super::mock::MockGateway;
use super::stripe::StripeGateway;
use super::{GatewayError, GatewayResult, PaymentGateway};

#[derive(Default)]
pub struct GatewayFactory {
    adapters: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
}

impl GatewayFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: PaymentProvider, adapter: Arc<dyn PaymentGateway>) {
        self.adapters.insert(provider, adapter);
    }

    pub fn with_adapter(
        mut self,
        provider: PaymentProvider,
        adapter: Arc<dyn PaymentGateway>,
    ) -> Self {
        self.register(provider, adapter);
        self
    }

    pub fn resolve(&self, provider: PaymentProvider) -> GatewayResult<Arc<dyn PaymentGateway>> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| GatewayError::unsupported(provider))
    }

    /// Construct adapters for every provider with resolved settings. The
    /// mock adapter is always available for dev and test flows.
    pub fn from_config(config: &Config) -> GatewayResult<Self> {
        let mut factory = GatewayFactory::new();

        if let Some(settings) = &config.mercado_pago {
            factory.register(
                PaymentProvider::MercadoPago,
                Arc::new(MercadoPagoGateway::new(settings.clone())?),
            );
        }
        if let Some(settings) = &config.stripe {
            factory.register(
                PaymentProvider::Stripe,
                Arc::new(StripeGateway::new(settings.clone())?),
            );
        }
        factory.register(
            PaymentProvider::Mock,
            Arc::new(MockGateway::new(config.mock_webhook_secret.clone())),
        );

        Ok(factory)
    }
}
