use crate::domain::error::DomainError;
use crate::domain::ports::pricing_config::PricingConfigStore;
use crate::domain::values::price_ladder::{suggest_price, PriceSuggestion, PricingConfig, SuggestionPolicy};
use std::sync::Arc;

pub struct SuggestPriceUseCase {
    store: Arc<dyn PricingConfigStore>,
    policy: SuggestionPolicy,
}

impl SuggestPriceUseCase {
    pub fn new(store: Arc<dyn PricingConfigStore>, policy: SuggestionPolicy) -> Self {
        Self { store, policy }
    }

    /// Suggest a sale price for a part labelled `label`, given a tax-inclusive
    /// market price. Uses the tenant's ladders when it has uploaded its own.
    pub fn suggest(
        &self,
        tenant_id: Option<i64>,
        label: &str,
        market_price: f64,
    ) -> Result<Option<PriceSuggestion>, DomainError> {
        let config = self.store.load(tenant_id)?;
        let suggestion = suggest_price(&config, label, market_price, &self.policy);
        if suggestion.is_none() {
            tracing::debug!(label, market_price, "no price family for label");
        }
        Ok(suggestion)
    }

    pub fn upload(&self, tenant_id: Option<i64>, config: &PricingConfig) -> Result<(), DomainError> {
        config.validate()?;
        self.store.upload(tenant_id, config)
    }

    pub fn current(&self, tenant_id: Option<i64>) -> Result<Arc<PricingConfig>, DomainError> {
        self.store.load(tenant_id)
    }
}
