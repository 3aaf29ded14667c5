//! JSON report rendering for engine views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Number, Value};

/// Decimal places kept for floats in rendered reports.
pub const REPORT_DECIMALS: i32 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct Report<T: Serialize> {
    pub view: &'static str,
    pub generated_at: DateTime<Utc>,
    pub n_records: usize,
    pub data: T,
}

impl<T: Serialize> Report<T> {
    pub fn new(view: &'static str, n_records: usize, data: T) -> Self {
        Self {
            view,
            generated_at: Utc::now(),
            n_records,
            data,
        }
    }

    /// Serialize with every float rounded to [`REPORT_DECIMALS`].
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        round_floats(&mut value, REPORT_DECIMALS);
        Ok(value)
    }
}

/// Round every floating-point number in `value`, recursively.
pub fn round_floats(value: &mut Value, decimals: i32) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n.as_f64().and_then(|f| Number::from_f64(round_to(f, decimals))) {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| round_floats(v, decimals)),
        Value::Object(map) => map.values_mut().for_each(|v| round_floats(v, decimals)),
        _ => {}
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rounds_nested_floats_only() {
        let mut value = json!({
            "shortfall_abs": 5.298999999999999,
            "rows": [{"delta": 0.123456789}, {"count": 3}],
            "label": "Wheat"
        });
        round_floats(&mut value, 6);
        assert_eq!(value["shortfall_abs"], json!(5.299));
        assert_eq!(value["rows"][0]["delta"], json!(0.123457));
        assert_eq!(value["rows"][1]["count"], json!(3));
        assert_eq!(value["label"], json!("Wheat"));
    }

    #[test]
    fn test_report_envelope() {
        let report = Report::new("top", 1, json!({"x": 1.0000004}));
        let value = report.to_value().unwrap();
        assert_eq!(value["view"], "top");
        assert_eq!(value["n_records"], 1);
        assert_eq!(value["data"]["x"], json!(1.0));
        assert!(value["generated_at"].is_string());
    }
}
