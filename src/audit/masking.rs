//! Parameter Masking
//!
//! Produces the audit-safe copy of the caller's parameter map. In lower
//! tiers (local, dev, test) the copy is unchanged so operators can debug
//! with real values. In upper tiers every parameter whose definition is
//! flagged sensitive is replaced with a fixed marker. Keys with no matching
//! definition pass through untouched; the registry schema, not the caller,
//! decides what is sensitive.

use serde_json::Value;
use std::collections::HashSet;

use crate::registry::ParameterDefinition;

/// Replacement for sensitive values in upper-tier audit records
pub const MASKED_VALUE: &str = "***MASKED***";

/// Tiers where masking is active
const UPPER_TIERS: [&str; 2] = ["uat", "prod"];

/// Whether the deployment tier masks sensitive parameters
#[must_use]
pub fn is_upper_tier(tier: &str) -> bool {
    UPPER_TIERS.contains(&tier.to_ascii_lowercase().as_str())
}

/// Copy `params` with sensitive values redacted when the tier requires it
#[must_use]
pub fn mask_parameters(
    params: &serde_json::Map<String, Value>,
    definitions: &[ParameterDefinition],
    tier: &str,
) -> serde_json::Map<String, Value> {
    if !is_upper_tier(tier) {
        return params.clone();
    }

    let sensitive: HashSet<&str> =
        definitions.iter().filter(|d| d.sensitive).map(|d| d.name.as_str()).collect();

    params
        .iter()
        .map(|(key, value)| {
            if sensitive.contains(key.as_str()) {
                (key.clone(), Value::String(MASKED_VALUE.to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ParamType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params(json: Value) -> serde_json::Map<String, Value> {
        match json {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn sensitive_def(name: &str) -> ParameterDefinition {
        let mut def = ParameterDefinition::new(name, ParamType::Varchar2);
        def.sensitive = true;
        def
    }

    #[test]
    fn test_lower_tier_returns_unchanged_copy() {
        let input = params(json!({"ssn": "123-45-6789", "id": 42}));
        let defs = vec![sensitive_def("ssn")];

        for tier in ["local", "dev", "sit", "test", ""] {
            let masked = mask_parameters(&input, &defs, tier);
            assert_eq!(masked, input);
        }
    }

    #[test]
    fn test_upper_tier_masks_sensitive_keys() {
        let input = params(json!({"ssn": "123-45-6789", "id": 42}));
        let defs =
            vec![sensitive_def("ssn"), ParameterDefinition::new("id", ParamType::Number)];

        let masked = mask_parameters(&input, &defs, "prod");
        assert_eq!(masked, params(json!({"ssn": "***MASKED***", "id": 42})));
    }

    #[test]
    fn test_tier_comparison_is_case_insensitive() {
        let input = params(json!({"ssn": "secret"}));
        let defs = vec![sensitive_def("ssn")];

        let masked = mask_parameters(&input, &defs, "PROD");
        assert_eq!(masked["ssn"], json!("***MASKED***"));

        let masked = mask_parameters(&input, &defs, "Uat");
        assert_eq!(masked["ssn"], json!("***MASKED***"));
    }

    #[test]
    fn test_undeclared_keys_pass_through() {
        // Keys the schema does not know are treated as non-sensitive
        let input = params(json!({"rogue": "value", "token": "abc"}));
        let defs = vec![sensitive_def("token")];

        let masked = mask_parameters(&input, &defs, "uat");
        assert_eq!(masked, params(json!({"rogue": "value", "token": "***MASKED***"})));
    }

    #[test]
    fn test_empty_params_stay_empty() {
        let masked = mask_parameters(&serde_json::Map::new(), &[sensitive_def("x")], "prod");
        assert!(masked.is_empty());
    }

    #[test]
    fn test_masking_does_not_mutate_input() {
        let input = params(json!({"ssn": "123"}));
        let defs = vec![sensitive_def("ssn")];

        let _ = mask_parameters(&input, &defs, "prod");
        assert_eq!(input["ssn"], json!("123"));
    }
}
