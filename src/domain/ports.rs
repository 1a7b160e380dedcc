use crate::domain::model::{
    ContactInquiry, EstimateResult, EstimationRules, ParameterSet, ServiceInfo,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Synchronous key-value medium (browser-local-storage equivalent).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn data_dir(&self) -> &str;
    fn cart_key(&self) -> &str;
    fn debounce_ms(&self) -> u64;
    fn request_timeout_seconds(&self) -> u64;

    fn slug_aliases(&self) -> Option<&HashMap<String, String>> {
        None
    }
}

#[async_trait]
pub trait PricingApi: Send + Sync {
    async fn estimation_rules(&self) -> Result<EstimationRules>;
    async fn calculate(&self, service_id: &str, params: &ParameterSet) -> Result<EstimateResult>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn service(&self, slug: &str) -> Result<ServiceInfo>;
}

#[async_trait]
pub trait ContactApi: Send + Sync {
    async fn submit_contact(&self, inquiry: &ContactInquiry) -> Result<()>;
}
