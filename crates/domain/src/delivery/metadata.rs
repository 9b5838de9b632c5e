//! Conversion of event metadata into storable JSON.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::DomainError;

/// Converts arbitrary metadata into a JSON object.
///
/// Dates become ISO-8601 strings and amounts become numbers through their
/// `Serialize` impls. A non-object value is wrapped as `{"value": ...}` and
/// `null` becomes an empty object.
pub fn coerce<M: Serialize + ?Sized>(meta: &M) -> Result<Value, DomainError> {
    let value = serde_json::to_value(meta)?;
    Ok(match value {
        Value::Object(map) => Value::Object(map),
        Value::Null => Value::Object(Map::new()),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Value::Object(map)
        }
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::Money;

    #[derive(Serialize)]
    struct Payload {
        date_prevue: Option<NaiveDate>,
        amount: Money,
        raw: Decimal,
    }

    #[test]
    fn dates_and_amounts_become_primitives() {
        let meta = coerce(&Payload {
            date_prevue: NaiveDate::from_ymd_opt(2025, 7, 14),
            amount: Money::new(Decimal::from_str("1500.00").unwrap()),
            raw: Decimal::from_str("2.50").unwrap(),
        })
        .unwrap();

        assert_eq!(meta["date_prevue"], json!("2025-07-14"));
        assert_eq!(meta["amount"], json!(1500));
        assert!(meta["raw"].is_string() || meta["raw"].is_number());
    }

    #[test]
    fn scalars_are_wrapped() {
        assert_eq!(coerce(&42).unwrap(), json!({"value": 42}));
        assert_eq!(coerce(&Option::<u8>::None).unwrap(), json!({}));
    }
}
