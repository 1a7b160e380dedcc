//! One service page: the resolved form, its calculator and the add-to-cart step.

use crate::core::calculator::{EstimateCalculator, EstimateView};
use crate::core::cart::CartStore;
use crate::core::form::EstimateForm;
use crate::core::schema::{InputSchemaResolver, ResolvedInputs, SchemaSource};
use crate::core::slug::SlugNormalizer;
use crate::domain::model::{CartItem, ServiceInfo};
use crate::domain::ports::{PricingApi, ServiceCatalog};
use crate::utils::error::{EstimatorError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const NO_ESTIMATE_YET: &str =
    "Please adjust your inputs to get an estimate before adding to cart.";

/// What a session needs from its surroundings.
pub struct SessionContext<'a> {
    pub normalizer: &'a SlugNormalizer,
    pub catalog: &'a dyn ServiceCatalog,
    pub resolver: &'a InputSchemaResolver,
    pub pricing: Arc<dyn PricingApi>,
    pub debounce: Duration,
}

pub struct EstimationSession {
    raw_slug: String,
    service_id: String,
    service: Option<ServiceInfo>,
    source: Option<SchemaSource>,
    form: Option<EstimateForm>,
    calculator: EstimateCalculator,
}

impl EstimationSession {
    pub async fn open(ctx: SessionContext<'_>, raw_slug: &str) -> Self {
        let service_id = ctx.normalizer.normalize(raw_slug).to_string();
        info!("📄 Opening '{}' (service id '{}')", raw_slug, service_id);

        let service = fetch_service(ctx.catalog, raw_slug, &service_id).await;
        let (source, form) = match ctx.resolver.resolve_inputs(&service_id, raw_slug).await {
            ResolvedInputs::Form { source, form } => (Some(source), Some(form)),
            ResolvedInputs::CustomEstimationRequired => (None, None),
        };

        Self {
            raw_slug: raw_slug.to_string(),
            calculator: EstimateCalculator::new(ctx.pricing, service_id.clone(), ctx.debounce),
            service_id,
            service,
            source,
            form,
        }
    }

    pub fn raw_slug(&self) -> &str {
        &self.raw_slug
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Service title, or the slug as typed when metadata was unavailable.
    pub fn title(&self) -> &str {
        self.service
            .as_ref()
            .map(|s| s.title.as_str())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.raw_slug.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.service.as_ref()?.description.as_deref()
    }

    pub fn source(&self) -> Option<SchemaSource> {
        self.source
    }

    pub fn form(&self) -> Option<&EstimateForm> {
        self.form.as_ref()
    }

    pub fn is_custom_estimation(&self) -> bool {
        self.form.is_none()
    }

    /// Applies one edit and schedules a debounced recalculation.
    pub fn edit(&mut self, path: &str, raw: &str) -> Result<JoinHandle<()>> {
        let form = self.form_mut()?;
        form.set_from_str(path, raw)?;
        let params = form.params().clone();
        Ok(self.calculator.schedule(params))
    }

    /// Applies `key=value` edits without scheduling anything. Either every
    /// edit lands or the form is left untouched. Debounced edits still
    /// pending are dropped so they cannot overwrite the overrides' total.
    pub fn apply_overrides<'s, I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let form = self.form_mut()?;
        let mut draft = form.clone();
        for (path, raw) in overrides {
            draft.set_from_str(path, raw)?;
        }
        *form = draft;
        self.calculator.cancel_pending();
        Ok(())
    }

    pub async fn recalculate(&self) -> EstimateView {
        match &self.form {
            Some(form) => self.calculator.calculate(form.params()).await,
            None => self.calculator.view(),
        }
    }

    pub fn estimate(&self) -> EstimateView {
        self.calculator.view()
    }

    pub fn subscribe(&self) -> watch::Receiver<EstimateView> {
        self.calculator.subscribe()
    }

    /// Snapshots the current total into the cart.
    pub fn add_to_cart(&self, cart: &CartStore) -> Result<Vec<CartItem>> {
        let view = self.calculator.view();
        // 計算失敗時畫面上的總額已經過時
        if let Some(error) = view.error {
            return Err(EstimatorError::validation("estimate", error));
        }
        if !view.total.is_finite() || view.total <= 0.0 {
            return Err(EstimatorError::validation("estimate", NO_ESTIMATE_YET));
        }

        cart.add_to_cart(CartItem {
            id: self.service_id.clone(),
            title: self.title().to_string(),
            amount: view.total,
            quantity: 1,
            slug: self.raw_slug.clone(),
        })
    }

    fn form_mut(&mut self) -> Result<&mut EstimateForm> {
        let service_id = &self.service_id;
        self.form.as_mut().ok_or_else(|| {
            EstimatorError::validation(
                "service",
                format!("'{}' needs a custom estimate; contact us instead", service_id),
            )
        })
    }
}

async fn fetch_service(catalog: &dyn ServiceCatalog, raw_slug: &str, service_id: &str) -> Option<ServiceInfo> {
    match catalog.service(raw_slug).await {
        Ok(info) => return Some(info),
        Err(e) => debug!("📄 No service metadata under '{}': {}", raw_slug, e),
    }

    if service_id != raw_slug {
        match catalog.service(service_id).await {
            Ok(info) => return Some(info),
            Err(e) => debug!("📄 No service metadata under '{}': {}", service_id, e),
        }
    }

    warn!("⚠️ Service metadata unavailable for '{}', using the slug as title", raw_slug);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use crate::core::calculator::CALCULATION_FAILED;
    use crate::domain::model::{EstimateResult, EstimationRules, ParameterSet};
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeSite;

    #[async_trait]
    impl PricingApi for FakeSite {
        async fn estimation_rules(&self) -> Result<EstimationRules> {
            Err(EstimatorError::HttpStatus {
                status: 503,
                message: None,
            })
        }

        async fn calculate(&self, _: &str, params: &ParameterSet) -> Result<EstimateResult> {
            let pages = params.get("pages").and_then(|v| v.as_i64()).unwrap_or(0);
            if pages > 50 {
                return Err(EstimatorError::HttpStatus {
                    status: 400,
                    message: Some("too many pages".to_string()),
                });
            }
            Ok(EstimateResult {
                estimated_cost: pages as f64 * 7500.0,
                breakdown: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl ServiceCatalog for FakeSite {
        async fn service(&self, slug: &str) -> Result<ServiceInfo> {
            match slug {
                "web-designing" => Ok(ServiceInfo {
                    slug: slug.to_string(),
                    title: "Web Design".to_string(),
                    description: None,
                }),
                _ => Err(EstimatorError::HttpStatus {
                    status: 404,
                    message: Some("Not found.".to_string()),
                }),
            }
        }
    }

    async fn open(raw_slug: &str) -> EstimationSession {
        let site = Arc::new(FakeSite);
        let normalizer = SlugNormalizer::default();
        let resolver = InputSchemaResolver::new(site.clone());
        let ctx = SessionContext {
            normalizer: &normalizer,
            catalog: site.as_ref(),
            resolver: &resolver,
            pricing: site.clone(),
            debounce: Duration::from_millis(400),
        };
        EstimationSession::open(ctx, raw_slug).await
    }

    #[tokio::test]
    async fn test_open_falls_back_to_canonical_metadata() {
        let session = open("web-design").await;
        assert_eq!(session.service_id(), "web-designing");
        assert_eq!(session.title(), "Web Design");
        assert_eq!(session.source(), Some(SchemaSource::BuiltinDefault));
        assert!(!session.is_custom_estimation());
    }

    #[tokio::test]
    async fn test_unknown_service_needs_custom_estimate() {
        let mut session = open("company-secrets").await;
        assert!(session.is_custom_estimation());
        assert_eq!(session.title(), "company-secrets");
        assert!(session.apply_overrides([("pages", "2")]).is_err());
    }

    #[tokio::test]
    async fn test_add_to_cart_requires_a_positive_estimate() {
        let cart = CartStore::with_default_key(Arc::new(MemoryStorage::new()));
        let mut session = open("web-design").await;

        let err = session.add_to_cart(&cart).unwrap_err();
        assert_eq!(err.user_friendly_message(), NO_ESTIMATE_YET);

        session.apply_overrides([("pages", "2"), ("logo", "true")]).unwrap();
        assert_eq!(session.recalculate().await.total, 15000.0);

        let items = session.add_to_cart(&cart).unwrap();
        assert_eq!(
            items,
            vec![CartItem {
                id: "web-designing".to_string(),
                title: "Web Design".to_string(),
                amount: 15000.0,
                quantity: 1,
                slug: "web-design".to_string(),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_recalculate_after_debounce() {
        let mut session = open("web-designing").await;
        let first = session.edit("pages", "3").unwrap();
        let second = session.edit("pages", "4").unwrap();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(session.estimate().total, 30000.0);
        assert_eq!(session.form().unwrap().value("pages"), Some(json!(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrides_win_over_a_pending_edit() {
        let mut session = open("web-designing").await;
        let pending = session.edit("pages", "3").unwrap();

        session.apply_overrides([("pages", "4")]).unwrap();
        assert_eq!(session.recalculate().await.total, 30000.0);

        pending.await.unwrap();
        assert_eq!(session.estimate().total, 30000.0);
        assert_eq!(session.form().unwrap().value("pages"), Some(json!(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recalculate_drops_a_pending_edit() {
        let mut session = open("web-designing").await;
        let pending = session.edit("pages", "2").unwrap();

        // 表單已是 pages=2，立即計算後排程的那次不再送出
        let view = session.recalculate().await;
        assert_eq!(view.total, 15000.0);
        let seq = view.seq;

        pending.await.unwrap();
        assert_eq!(session.estimate().seq, seq);
        assert_eq!(session.estimate().total, 15000.0);
    }

    #[tokio::test]
    async fn test_failed_override_leaves_form_untouched() {
        let mut session = open("web-designing").await;
        let before = session.form().unwrap().clone();

        let result = session.apply_overrides([("pages", "3"), ("no_such_field", "1")]);
        assert!(result.is_err());
        assert_eq!(session.form(), Some(&before));
        assert_eq!(session.form().unwrap().value("pages"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_add_to_cart_reports_the_calculation_error() {
        let cart = CartStore::with_default_key(Arc::new(MemoryStorage::new()));
        let mut session = open("web-designing").await;

        session.apply_overrides([("pages", "2")]).unwrap();
        assert_eq!(session.recalculate().await.total, 15000.0);

        session.apply_overrides([("pages", "60")]).unwrap();
        let view = session.recalculate().await;
        assert_eq!(view.total, 15000.0);
        assert_eq!(view.error.as_deref(), Some(CALCULATION_FAILED));

        let err = session.add_to_cart(&cart).unwrap_err();
        assert_eq!(err.user_friendly_message(), CALCULATION_FAILED);
        assert!(cart.get_cart().is_empty());
    }
}
