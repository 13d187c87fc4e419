use serde_json::Value;

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Trims `value` and drops it when nothing is left.
pub fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `true` for `"0"`, `"00"`, `"000"` and so on, which some cameras emit in
/// place of a real sub-second or time component.
pub fn is_zero_run(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().all(|ch| ch == '0')
}

pub fn to_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => to_f64(s),
        _ => None,
    }
}

/// Renders scalars the way exiftool would print them; arrays and objects
/// have no single textual value.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn round_to_places(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    // -0.0 would otherwise leak into sign checks
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_checks_trim_whitespace() {
        assert!(is_blank("  \t"));
        assert!(!is_blank(" x "));
        assert_eq!(blank_to_none(Some("  N ")), Some("N"));
        assert_eq!(blank_to_none(Some("   ")), None);
        assert_eq!(blank_to_none(None), None);
    }

    #[test]
    fn zero_runs_are_detected() {
        assert!(is_zero_run("00"));
        assert!(is_zero_run(" 000 "));
        assert!(!is_zero_run("001"));
        assert!(!is_zero_run(""));
    }

    #[test]
    fn numeric_parsing_rejects_garbage() {
        assert_eq!(to_f64(" 12.5 "), Some(12.5));
        assert_eq!(to_f64("NaN"), None);
        assert_eq!(to_f64("abc"), None);
    }

    #[test]
    fn json_values_convert_to_numbers_and_text() {
        assert_eq!(value_to_f64(&json!(45.5)), Some(45.5));
        assert_eq!(value_to_f64(&json!("123.45")), Some(123.45));
        assert_eq!(value_to_f64(&json!([1, 2])), None);
        assert_eq!(value_to_text(&json!(3)), Some("3".to_string()));
        assert_eq!(value_to_text(&json!({"a": 1})), None);
    }

    #[test]
    fn rounding_never_returns_negative_zero() {
        assert_eq!(round_to_places(-0.0000001, 6), 0.0);
        assert!(round_to_places(-0.0000001, 6).is_sign_positive());
        assert_eq!(round_to_places(37.774_900_4, 6), 37.7749);
    }
}
