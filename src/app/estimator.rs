use crate::adapters::http::ApiClient;
use crate::adapters::storage::LocalStorage;
use crate::app::session::{EstimationSession, SessionContext};
use crate::core::cart::CartStore;
use crate::core::schema::InputSchemaResolver;
use crate::core::slug::SlugNormalizer;
use crate::core::submission::CartSubmission;
use crate::domain::ports::{
    ConfigProvider, ContactApi, KeyValueStore, PricingApi, ServiceCatalog,
};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Wires the estimation flow together for one process.
pub struct Estimator {
    normalizer: SlugNormalizer,
    catalog: Arc<dyn ServiceCatalog>,
    pricing: Arc<dyn PricingApi>,
    resolver: InputSchemaResolver,
    cart: CartStore,
    submission: CartSubmission,
    debounce: Duration,
}

impl Estimator {
    pub fn new<A>(
        api: Arc<A>,
        storage: Arc<dyn KeyValueStore>,
        cart_key: &str,
        normalizer: SlugNormalizer,
        debounce: Duration,
    ) -> Self
    where
        A: PricingApi + ServiceCatalog + ContactApi + 'static,
    {
        let pricing: Arc<dyn PricingApi> = api.clone();
        let catalog: Arc<dyn ServiceCatalog> = api.clone();
        let contact: Arc<dyn ContactApi> = api;
        let cart = CartStore::new(storage, cart_key);

        Self {
            normalizer,
            catalog,
            resolver: InputSchemaResolver::new(pricing.clone()),
            pricing,
            submission: CartSubmission::new(contact, cart.clone()),
            cart,
            debounce,
        }
    }

    /// File-backed storage under the data dir, tokens included.
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(LocalStorage::new(config.data_dir()));
        let api = ApiClient::from_config(config)?.with_token_store(storage.clone());
        let normalizer = match config.slug_aliases() {
            Some(aliases) => SlugNormalizer::with_aliases(aliases)?,
            None => SlugNormalizer::default(),
        };

        info!(
            "🚀 Estimator ready (api: {}, data: {})",
            api.base_url(),
            config.data_dir()
        );

        Ok(Self::new(
            Arc::new(api),
            storage,
            config.cart_key(),
            normalizer,
            Duration::from_millis(config.debounce_ms()),
        ))
    }

    pub async fn open(&self, raw_slug: &str) -> EstimationSession {
        let ctx = SessionContext {
            normalizer: &self.normalizer,
            catalog: self.catalog.as_ref(),
            resolver: &self.resolver,
            pricing: self.pricing.clone(),
            debounce: self.debounce,
        };
        EstimationSession::open(ctx, raw_slug).await
    }

    pub fn normalizer(&self) -> &SlugNormalizer {
        &self.normalizer
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn submission(&self) -> &CartSubmission {
        &self.submission
    }
}
