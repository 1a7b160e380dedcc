use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters sent to the pricing endpoint; shape varies per service.
pub type ParameterSet = serde_json::Map<String, serde_json::Value>;

/// Remote estimation rules: service id (canonical or legacy slug) → template.
pub type EstimationRules = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub quantity: u32,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub breakdown: Vec<BreakdownLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest<'a> {
    pub service_id: &'a str,
    pub params: &'a ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    #[serde(default)]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Body of `POST contact/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactInquiry {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}
