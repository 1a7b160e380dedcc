//! Per-service estimation inputs.
//!
//! Every known canonical service id maps to a declarative field schema; a
//! single generic form ([`EstimateForm`]) consumes it. Parameter templates
//! come from the remote rules document when it has an entry for the service,
//! otherwise from the defaults carried by the built-in schema.

use crate::core::form::EstimateForm;
use crate::domain::model::{EstimationRules, ParameterSet};
use crate::domain::ports::PricingApi;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Integer stepper clamped at `min`.
    Count { default: i64, min: i64 },
    Toggle { default: bool },
    Choice {
        default: String,
        options: Vec<ChoiceOption>,
    },
    /// Nested object of sub-fields (e.g. `features.cms`).
    Group { fields: Vec<FieldSpec> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Static counterpart of [`FieldSpec`] used by the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDef {
    Count {
        name: &'static str,
        label: &'static str,
        default: i64,
        min: i64,
    },
    Toggle {
        name: &'static str,
        label: &'static str,
    },
    Choice {
        name: &'static str,
        label: &'static str,
        default: &'static str,
        options: &'static [(&'static str, &'static str)],
    },
    Group {
        name: &'static str,
        label: &'static str,
        fields: &'static [FieldDef],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSchema {
    pub service_id: &'static str,
    pub fields: &'static [FieldDef],
}

const fn count(name: &'static str, label: &'static str, default: i64, min: i64) -> FieldDef {
    FieldDef::Count {
        name,
        label,
        default,
        min,
    }
}

const fn toggle(name: &'static str, label: &'static str) -> FieldDef {
    FieldDef::Toggle { name, label }
}

pub const SERVICE_SCHEMAS: &[ServiceSchema] = &[
    ServiceSchema {
        service_id: "web-designing",
        fields: &[
            count("pages", "Number of Pages", 1, 1),
            count("iterations", "Design Iterations", 1, 1),
            toggle("logo", "Include Logo Design"),
        ],
    },
    ServiceSchema {
        service_id: "web-development",
        fields: &[
            count("pages", "Number of Pages", 1, 1),
            FieldDef::Group {
                name: "features",
                label: "Features",
                fields: &[
                    toggle("cms", "CMS Integration"),
                    toggle("auth", "Authentication System"),
                    toggle("payments", "Payment Gateway"),
                ],
            },
        ],
    },
    ServiceSchema {
        service_id: "deployment",
        fields: &[count("environments", "Number of Environments", 1, 1)],
    },
    ServiceSchema {
        service_id: "company-details",
        fields: &[count("pages", "Number of Pages", 1, 1)],
    },
    ServiceSchema {
        service_id: "hosting",
        fields: &[count("years", "Years of Hosting", 1, 1)],
    },
    ServiceSchema {
        service_id: "app-development",
        fields: &[
            count("screens", "Number of Screens", 5, 1),
            FieldDef::Choice {
                name: "platform",
                label: "Platform",
                default: "single",
                options: &[("single", "Android or iOS"), ("both", "Android + iOS")],
            },
        ],
    },
    ServiceSchema {
        service_id: "logo-designing",
        fields: &[
            count("concepts", "Number of Concepts", 1, 1),
            count("revisions", "Number of Revisions", 2, 0),
        ],
    },
    ServiceSchema {
        service_id: "data-solutions",
        fields: &[
            count("dashboards", "Number of Dashboards", 1, 1),
            count("integrations", "Number of Integrations", 0, 0),
        ],
    },
];

pub fn builtin_schema(service_id: &str) -> Option<&'static ServiceSchema> {
    SERVICE_SCHEMAS.iter().find(|s| s.service_id == service_id)
}

impl FieldDef {
    pub fn to_spec(&self) -> FieldSpec {
        let (name, label, kind) = match *self {
            FieldDef::Count {
                name,
                label,
                default,
                min,
            } => (name, label, FieldKind::Count { default, min }),
            FieldDef::Toggle { name, label } => (name, label, FieldKind::Toggle { default: false }),
            FieldDef::Choice {
                name,
                label,
                default,
                options,
            } => (
                name,
                label,
                FieldKind::Choice {
                    default: default.to_string(),
                    options: options
                        .iter()
                        .map(|(value, label)| ChoiceOption {
                            value: value.to_string(),
                            label: label.to_string(),
                        })
                        .collect(),
                },
            ),
            FieldDef::Group {
                name,
                label,
                fields,
            } => (
                name,
                label,
                FieldKind::Group {
                    fields: fields.iter().map(FieldDef::to_spec).collect(),
                },
            ),
        };

        FieldSpec {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

impl FieldSpec {
    pub fn default_value(&self) -> Value {
        match &self.kind {
            FieldKind::Count { default, .. } => Value::from(*default),
            FieldKind::Toggle { default } => Value::Bool(*default),
            FieldKind::Choice { default, .. } => Value::String(default.clone()),
            FieldKind::Group { fields } => Value::Object(defaults_for(fields)),
        }
    }

    /// Derives a field from a rules template value when no built-in schema
    /// exists for the service.
    pub fn infer(name: &str, template: &Value) -> Option<FieldSpec> {
        let kind = match template {
            Value::Number(n) => FieldKind::Count {
                default: n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
                min: 0,
            },
            Value::Bool(b) => FieldKind::Toggle { default: *b },
            Value::String(s) => FieldKind::Choice {
                default: s.clone(),
                options: vec![ChoiceOption {
                    value: s.clone(),
                    label: s.clone(),
                }],
            },
            Value::Object(map) => FieldKind::Group {
                fields: infer_fields(map),
            },
            Value::Null | Value::Array(_) => return None,
        };

        Some(FieldSpec {
            name: name.to_string(),
            label: humanize(name),
            kind,
        })
    }
}

impl ServiceSchema {
    pub fn fields(&self) -> Vec<FieldSpec> {
        self.fields.iter().map(FieldDef::to_spec).collect()
    }

    pub fn defaults(&self) -> ParameterSet {
        defaults_for(&self.fields())
    }
}

fn defaults_for(fields: &[FieldSpec]) -> ParameterSet {
    fields
        .iter()
        .map(|field| (field.name.clone(), field.default_value()))
        .collect()
}

pub fn infer_fields(template: &ParameterSet) -> Vec<FieldSpec> {
    template
        .iter()
        .filter_map(|(name, value)| FieldSpec::infer(name, value))
        .collect()
}

fn humanize(name: &str) -> String {
    let spaced = name.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Where a service's parameter template came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    RemoteRules,
    /// Rules keyed by the raw (legacy) slug rather than the canonical id.
    RemoteLegacySlug,
    BuiltinDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInputs {
    Form {
        source: SchemaSource,
        form: EstimateForm,
    },
    /// No rule and no default: show a contact-us prompt instead of a calculator.
    CustomEstimationRequired,
}

impl ResolvedInputs {
    pub fn is_custom_estimation(&self) -> bool {
        matches!(self, ResolvedInputs::CustomEstimationRequired)
    }

    pub fn form(&self) -> Option<&EstimateForm> {
        match self {
            ResolvedInputs::Form { form, .. } => Some(form),
            ResolvedInputs::CustomEstimationRequired => None,
        }
    }

    pub fn into_form(self) -> Option<EstimateForm> {
        match self {
            ResolvedInputs::Form { form, .. } => Some(form),
            ResolvedInputs::CustomEstimationRequired => None,
        }
    }
}

pub struct InputSchemaResolver {
    api: Arc<dyn PricingApi>,
    rules: OnceCell<EstimationRules>,
}

impl InputSchemaResolver {
    pub fn new(api: Arc<dyn PricingApi>) -> Self {
        Self {
            api,
            rules: OnceCell::new(),
        }
    }

    /// Remote rules, fetched once per resolver. A failed fetch is not cached.
    async fn rules(&self) -> Option<&EstimationRules> {
        let fetched = self
            .rules
            .get_or_try_init(|| async {
                debug!("📥 Fetching estimation rules");
                let rules = self.api.estimation_rules().await?;
                info!("📥 Loaded estimation rules for {} services", rules.len());
                Ok::<_, crate::utils::error::EstimatorError>(rules)
            })
            .await;

        match fetched {
            Ok(rules) => Some(rules),
            Err(e) => {
                warn!("⚠️ Estimation rules unavailable, using built-in defaults: {}", e);
                None
            }
        }
    }

    pub async fn resolve_inputs(&self, service_id: &str, raw_slug: &str) -> ResolvedInputs {
        let remote = self.rules().await.and_then(|rules| {
            lookup_template(rules, service_id)
                .map(|t| (SchemaSource::RemoteRules, t))
                .or_else(|| {
                    lookup_template(rules, raw_slug).map(|t| (SchemaSource::RemoteLegacySlug, t))
                })
        });
        let builtin = builtin_schema(service_id);

        let (source, params) = match (remote, builtin) {
            // clone: cached rules and defaults stay pristine templates
            (Some((source, template)), _) => (source, template.clone()),
            (None, Some(schema)) => (SchemaSource::BuiltinDefault, schema.defaults()),
            (None, None) => {
                info!(
                    "🧾 No estimation inputs for '{}' (slug '{}'), custom estimation required",
                    service_id, raw_slug
                );
                return ResolvedInputs::CustomEstimationRequired;
            }
        };

        let fields = match builtin {
            Some(schema) => schema.fields(),
            None => infer_fields(&params),
        };

        debug!(
            "🧾 Resolved {} inputs for '{}' from {:?}",
            fields.len(),
            service_id,
            source
        );

        ResolvedInputs::Form {
            source,
            form: EstimateForm::new(service_id, fields, params),
        }
    }
}

fn lookup_template<'a>(rules: &'a EstimationRules, key: &str) -> Option<&'a ParameterSet> {
    rules.get(key).and_then(Value::as_object)
}
