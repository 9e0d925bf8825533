//! # Price Range Check
//!
//! A minimum price above its maximum cannot be expressed in JSON Schema,
//! so it is checked after schema validation. Service documents carry
//! either `priceMin`/`priceMax` or, for specialist roles,
//! `<role>PriceMin`/`<role>PriceMax`; only the first pair found is
//! checked.

use dmp_core::Decimal;
use serde_json::{Map, Value};

use crate::error::SchemaValidationError;
use crate::translate::{ErrorMap, FieldError};

/// The `(min, max)` key pair a document's price range lives under.
pub fn price_keys(document: &Map<String, Value>) -> Option<(String, String)> {
    if document.contains_key("priceMin") {
        return Some(("priceMin".to_string(), "priceMax".to_string()));
    }
    document.keys().find_map(|key| {
        key.strip_suffix("PriceMin")
            .map(|prefix| (key.clone(), format!("{prefix}PriceMax")))
    })
}

/// Check the price range of `document` against the errors already found.
///
/// Returns a map with `max_less_than_min` on the max key when both bounds
/// are present, neither already has an error, and min exceeds max.
/// Values that cannot be read as decimals fail the call.
pub fn check_price_range(
    document: &Value,
    existing: &ErrorMap,
) -> Result<ErrorMap, SchemaValidationError> {
    let mut errors = ErrorMap::new();
    let Some(object) = document.as_object() else {
        return Ok(errors);
    };
    let Some((min_key, max_key)) = price_keys(object) else {
        return Ok(errors);
    };
    let (Some(min), Some(max)) = (
        object.get(&min_key).filter(|v| is_present(v)),
        object.get(&max_key).filter(|v| is_present(v)),
    ) else {
        return Ok(errors);
    };
    if existing.contains_field(&min_key) || existing.contains_field(&max_key) {
        return Ok(errors);
    }

    if to_decimal(&min_key, min)? > to_decimal(&max_key, max)? {
        errors.insert(max_key, FieldError::MaxLessThanMin);
    }
    Ok(errors)
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn to_decimal(field: &str, value: &Value) -> Result<Decimal, SchemaValidationError> {
    let invalid = || SchemaValidationError::InvalidDecimal {
        field: field.to_string(),
        value: value.to_string(),
    };
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(invalid()),
    };
    text.parse::<Decimal>().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn plain_price_keys_win() {
        let doc = obj(json!({"priceMin": "1", "agileCoachPriceMin": "2"}));
        assert_eq!(price_keys(&doc), Some(("priceMin".into(), "priceMax".into())));
    }

    #[test]
    fn specialist_price_keys_use_prefix() {
        let doc = obj(json!({"developerPriceMax": "9", "developerPriceMin": "2"}));
        assert_eq!(
            price_keys(&doc),
            Some(("developerPriceMin".into(), "developerPriceMax".into()))
        );
        assert_eq!(price_keys(&obj(json!({"serviceName": "x"}))), None);
    }

    #[test]
    fn min_above_max_flags_max() {
        let doc = json!({"priceMin": "20.00", "priceMax": "10.00"});
        let errors = check_price_range(&doc, &ErrorMap::new()).unwrap();
        assert_eq!(errors.get("priceMax"), Some(&FieldError::MaxLessThanMin));
    }

    #[test]
    fn min_below_or_equal_max_passes() {
        for (min, max) in [("10.00", "20.00"), ("10", "10.00000"), ("9.5", "10")] {
            let doc = json!({"priceMin": min, "priceMax": max});
            assert!(check_price_range(&doc, &ErrorMap::new()).unwrap().is_empty());
        }
    }

    #[test]
    fn comparison_is_numeric() {
        let doc = json!({"priceMin": "9", "priceMax": "10"});
        assert!(check_price_range(&doc, &ErrorMap::new()).unwrap().is_empty());
    }

    #[test]
    fn skipped_when_a_bound_is_missing_or_empty() {
        for doc in [
            json!({"priceMin": "20"}),
            json!({"priceMin": "20", "priceMax": ""}),
            json!({"priceMin": "", "priceMax": "10"}),
            json!({"priceMin": "20", "priceMax": null}),
        ] {
            assert!(check_price_range(&doc, &ErrorMap::new()).unwrap().is_empty());
        }
    }

    #[test]
    fn skipped_when_a_bound_already_has_an_error() {
        let mut existing = ErrorMap::new();
        existing.insert("priceMin", FieldError::NotMoneyFormat);
        let doc = json!({"priceMin": "20", "priceMax": "10"});
        assert!(check_price_range(&doc, &existing).unwrap().is_empty());
    }

    #[test]
    fn specialist_range() {
        let doc = json!({"designerPriceMin": "500", "designerPriceMax": "400"});
        let errors = check_price_range(&doc, &ErrorMap::new()).unwrap();
        assert_eq!(errors.get("designerPriceMax"), Some(&FieldError::MaxLessThanMin));
    }

    #[test]
    fn numbers_are_accepted() {
        let doc = json!({"priceMin": 30, "priceMax": 20.5});
        let errors = check_price_range(&doc, &ErrorMap::new()).unwrap();
        assert_eq!(errors.get("priceMax"), Some(&FieldError::MaxLessThanMin));
    }

    #[test]
    fn unparsable_values_fail() {
        let doc = json!({"priceMin": "ten", "priceMax": "20"});
        let err = check_price_range(&doc, &ErrorMap::new()).unwrap_err();
        assert!(matches!(err, SchemaValidationError::InvalidDecimal { ref field, .. } if field == "priceMin"));

        let doc = json!({"priceMin": ["10"], "priceMax": "20"});
        assert!(check_price_range(&doc, &ErrorMap::new()).is_err());
    }
}
