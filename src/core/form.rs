use crate::core::schema::{FieldKind, FieldSpec};
use crate::domain::model::ParameterSet;
use crate::utils::error::{EstimatorError, Result};
use serde::Serialize;
use serde_json::Value;

/// Generic estimation form: a field schema plus the parameter values it edits.
///
/// Fields are addressed by dotted paths (`pages`, `features.cms`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateForm {
    service_id: String,
    fields: Vec<FieldSpec>,
    params: ParameterSet,
}

impl EstimateForm {
    pub fn new(service_id: impl Into<String>, fields: Vec<FieldSpec>, params: ParameterSet) -> Self {
        Self {
            service_id: service_id.into(),
            fields,
            params,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn field(&self, path: &str) -> Option<&FieldSpec> {
        let mut current = self.fields.as_slice();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let field = current.iter().find(|f| f.name == segment)?;
            if segments.peek().is_none() {
                return Some(field);
            }
            match &field.kind {
                FieldKind::Group { fields } => current = fields.as_slice(),
                _ => return None,
            }
        }
        None
    }

    /// Current value, falling back to the field default when the template
    /// omits it.
    pub fn value(&self, path: &str) -> Option<Value> {
        let field = self.field(path)?;
        Some(self.lookup(path).cloned().unwrap_or_else(|| field.default_value()))
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.params.get(first)?, |value, segment| {
            value.as_object()?.get(segment)
        })
    }

    pub fn count(&self, path: &str) -> Result<i64> {
        let field = self.require(path)?;
        let FieldKind::Count { default, .. } = field.kind else {
            return Err(wrong_kind(path, "a number"));
        };
        Ok(self
            .lookup(path)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(default))
    }

    /// Sets a count, clamped at the field minimum. Returns the stored value.
    pub fn set_count(&mut self, path: &str, value: i64) -> Result<i64> {
        let field = self.require(path)?;
        let FieldKind::Count { min, .. } = field.kind else {
            return Err(wrong_kind(path, "a number"));
        };
        let clamped = value.max(min);
        self.write(path, Value::from(clamped));
        Ok(clamped)
    }

    pub fn increment(&mut self, path: &str) -> Result<i64> {
        let current = self.count(path)?;
        self.set_count(path, current.saturating_add(1))
    }

    pub fn decrement(&mut self, path: &str) -> Result<i64> {
        let current = self.count(path)?;
        self.set_count(path, current.saturating_sub(1))
    }

    pub fn set_toggle(&mut self, path: &str, value: bool) -> Result<()> {
        let field = self.require(path)?;
        if !matches!(field.kind, FieldKind::Toggle { .. }) {
            return Err(wrong_kind(path, "a toggle"));
        }
        self.write(path, Value::Bool(value));
        Ok(())
    }

    pub fn set_choice(&mut self, path: &str, value: &str) -> Result<()> {
        let field = self.require(path)?;
        let FieldKind::Choice { options, .. } = &field.kind else {
            return Err(wrong_kind(path, "a choice"));
        };
        if !options.iter().any(|o| o.value == value) {
            let allowed: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
            return Err(EstimatorError::validation(
                path,
                format!("'{}' is not one of: {}", value, allowed.join(", ")),
            ));
        }
        self.write(path, Value::String(value.to_string()));
        Ok(())
    }

    /// Parses `raw` according to the field kind (command-line `key=value`).
    pub fn set_from_str(&mut self, path: &str, raw: &str) -> Result<()> {
        let raw = raw.trim();
        let kind = self.require(path)?.kind.clone();
        match kind {
            FieldKind::Count { .. } => {
                let value = raw.parse::<i64>().map_err(|_| {
                    EstimatorError::validation(path, format!("'{}' is not a whole number", raw))
                })?;
                self.set_count(path, value).map(|_| ())
            }
            FieldKind::Toggle { .. } => {
                let value = parse_bool(raw).ok_or_else(|| {
                    EstimatorError::validation(path, format!("'{}' is not true/false", raw))
                })?;
                self.set_toggle(path, value)
            }
            FieldKind::Choice { .. } => self.set_choice(path, raw),
            FieldKind::Group { .. } => Err(EstimatorError::validation(
                path,
                "is a group; set one of its fields instead",
            )),
        }
    }

    fn require(&self, path: &str) -> Result<&FieldSpec> {
        self.field(path).ok_or_else(|| {
            EstimatorError::validation(
                path,
                format!("unknown field for service '{}'", self.service_id),
            )
        })
    }

    fn write(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut map = &mut self.params;
        for segment in segments {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(ParameterSet::new()));
            if !entry.is_object() {
                *entry = Value::Object(ParameterSet::new());
            }
            map = match entry {
                Value::Object(inner) => inner,
                _ => unreachable!("entry was just made an object"),
            };
        }
        map.insert(leaf.to_string(), value);
    }
}

fn wrong_kind(path: &str, expected: &str) -> EstimatorError {
    EstimatorError::validation(path, format!("field is not {}", expected))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::builtin_schema;
    use serde_json::json;

    fn form_for(service_id: &str) -> EstimateForm {
        let schema = builtin_schema(service_id).unwrap();
        EstimateForm::new(service_id, schema.fields(), schema.defaults())
    }

    #[test]
    fn test_counts_clamp_at_minimum() {
        let mut form = form_for("web-designing");
        assert_eq!(form.set_count("pages", 0).unwrap(), 1);
        assert_eq!(form.decrement("pages").unwrap(), 1);
        assert_eq!(form.increment("pages").unwrap(), 2);
        assert_eq!(form.params().get("pages"), Some(&json!(2)));

        let mut logo = form_for("logo-designing");
        assert_eq!(logo.set_count("revisions", -3).unwrap(), 0);
    }

    #[test]
    fn test_group_fields_use_dotted_paths() {
        let mut form = form_for("web-development");
        form.set_toggle("features.payments", true).unwrap();
        form.set_from_str("features.cms", "yes").unwrap();

        assert_eq!(
            Value::Object(form.params().clone()),
            json!({"pages": 1, "features": {"cms": true, "auth": false, "payments": true}})
        );
        assert_eq!(form.field("features.auth").unwrap().label, "Authentication System");
        assert!(form.set_from_str("features", "true").is_err());
    }

    #[test]
    fn test_choice_must_be_a_declared_option() {
        let mut form = form_for("app-development");
        form.set_choice("platform", "both").unwrap();
        assert_eq!(form.value("platform"), Some(json!("both")));

        let err = form.set_choice("platform", "web").unwrap_err();
        assert!(matches!(err, EstimatorError::ValidationError { .. }));
        assert_eq!(form.value("platform"), Some(json!("both")));
    }

    #[test]
    fn test_missing_values_fall_back_to_field_defaults() {
        let schema = builtin_schema("app-development").unwrap();
        let mut form = EstimateForm::new("app-development", schema.fields(), ParameterSet::new());

        assert_eq!(form.value("screens"), Some(json!(5)));
        assert_eq!(form.count("screens").unwrap(), 5);
        assert_eq!(form.increment("screens").unwrap(), 6);

        // nested group created on first write
        let schema = builtin_schema("web-development").unwrap();
        let mut form = EstimateForm::new("web-development", schema.fields(), ParameterSet::new());
        form.set_toggle("features.auth", true).unwrap();
        assert_eq!(form.params().get("features"), Some(&json!({"auth": true})));
    }

    #[test]
    fn test_unknown_fields_and_bad_input_are_rejected() {
        let mut form = form_for("hosting");
        assert!(form.set_from_str("bandwidth", "3").is_err());
        assert!(form.set_from_str("years", "three").is_err());
        assert!(form.set_toggle("years", true).is_err());
        assert!(form.value("bandwidth").is_none());

        form.set_from_str("years", " 3 ").unwrap();
        assert_eq!(form.count("years").unwrap(), 3);
    }
}
