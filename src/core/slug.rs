use crate::utils::error::{EstimatorError, Result};
use std::collections::HashMap;

/// Public slug → canonical service id, as published on the site.
pub const DEFAULT_SLUG_ALIASES: &[(&str, &str)] = &[
    // Web Designing
    ("web-designing", "web-designing"),
    ("web-design", "web-designing"),
    ("design", "web-designing"),
    ("ui-design", "web-designing"),
    ("digital-product-design", "web-designing"),
    // Web Development
    ("web-development", "web-development"),
    ("web-app-development", "web-development"),
    ("web-application-development", "web-development"),
    ("web-dev", "web-development"),
    // Deployment
    ("deployment", "deployment"),
    ("cloud-deployment", "deployment"),
    // Hosting
    ("hosting", "hosting"),
    ("cloud-hosting", "hosting"),
    ("web-hosting", "hosting"),
    ("cloud-web-hosting", "hosting"),
    // App Development
    ("app-development", "app-development"),
    ("mobile-app-solutions", "app-development"),
    ("mobile-app-dev", "app-development"),
    ("mobile-development", "app-development"),
    // Logo Design
    ("logo-designing", "logo-designing"),
    ("logo-design", "logo-designing"),
    // Data Solutions
    ("data-solutions", "data-solutions"),
    ("data-analytics", "data-solutions"),
];

/// Maps user-facing slugs to the ids the pricing backend knows.
///
/// Lookup is case-insensitive; unknown slugs pass through untouched.
#[derive(Debug, Clone)]
pub struct SlugNormalizer {
    aliases: HashMap<String, String>,
}

impl Default for SlugNormalizer {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_SLUG_ALIASES
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect(),
        }
    }
}

impl SlugNormalizer {
    /// Built-in table extended (or overridden) by configured aliases.
    ///
    /// Fails if the merged table is not closed, i.e. some alias target would
    /// itself normalize to something else.
    pub fn with_aliases(extra: &HashMap<String, String>) -> Result<Self> {
        let mut normalizer = Self::default();
        for (alias, canonical) in extra {
            normalizer
                .aliases
                .insert(alias.to_lowercase(), canonical.clone());
        }
        normalizer.check_closed()?;
        Ok(normalizer)
    }

    pub fn normalize<'a>(&'a self, raw_slug: &'a str) -> &'a str {
        self.aliases
            .get(&raw_slug.to_lowercase())
            .map(String::as_str)
            .unwrap_or(raw_slug)
    }

    pub fn is_known(&self, raw_slug: &str) -> bool {
        self.aliases.contains_key(&raw_slug.to_lowercase())
    }

    fn check_closed(&self) -> Result<()> {
        for (alias, canonical) in &self.aliases {
            let again = self.normalize(canonical);
            if again != canonical.as_str() {
                return Err(EstimatorError::InvalidConfigValueError {
                    field: format!("aliases.{}", alias),
                    value: canonical.clone(),
                    reason: format!(
                        "target is itself an alias of '{}'; point the alias at the canonical id",
                        again
                    ),
                });
            }
        }
        Ok(())
    }
}
