//! Defensive field extraction from untyped model JSON.
//!
//! Every accessor takes a list of candidate keys (models drift between
//! camelCase, snake_case and synonyms across runs) and returns a typed value
//! or a neutral default. Nothing here fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+").expect("valid regex"));

/// "BC", "BCE", "B.C.", "B.C.E." as a standalone marker, glued to the
/// number or not ("216BC", "BC 216").
static BCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])b\.?c\.?(?:e\.?)?(?:[^a-z]|$)").expect("valid regex")
});

/// First candidate key present with a non-null value.
pub(crate) fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = value.as_object()?;
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find(|v| !v.is_null())
}

/// Trimmed string; empty on absence or type mismatch.
pub(crate) fn text(value: &Value, keys: &[&str]) -> String {
    field(value, keys)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Trimmed, non-empty string.
pub(crate) fn opt_text(value: &Value, keys: &[&str]) -> Option<String> {
    Some(text(value, keys)).filter(|s| !s.is_empty())
}

/// Array elements, or an empty slice when the field is not an array.
pub(crate) fn array<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    field(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Non-empty trimmed strings from an array; the second value counts the
/// elements that were discarded.
pub(crate) fn text_list(value: &Value, keys: &[&str]) -> (Vec<String>, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0;
    for element in array(value, keys) {
        match element.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => kept.push(s.to_string()),
            _ => dropped += 1,
        }
    }
    (kept, dropped)
}

/// A finite number, accepting numeric strings.
pub(crate) fn finite_number(value: &Value, keys: &[&str]) -> Option<f64> {
    let raw = field(value, keys)?;
    let number = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// A signed year. Accepts integers, finite floats, and strings such as
/// "216 BCE", "-216", "c. 1066", "44 BC" or "AD 9".
pub(crate) fn year(value: &Value, keys: &[&str]) -> Option<i32> {
    match field(value, keys)? {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32),
        Value::String(s) => parse_year_text(s),
        _ => None,
    }
}

pub(crate) fn parse_year_text(raw: &str) -> Option<i32> {
    let matched = LEADING_INT.find(raw)?;
    let number: i32 = matched.as_str().parse().ok()?;
    let is_bce = BCE_MARKER.is_match(raw);
    Some(if is_bce && number > 0 { -number } else { number })
}

/// 1..=3 importance. Numbers are rounded and clamped; "high"/"medium"/"low"
/// are understood.
pub(crate) fn importance(value: &Value, keys: &[&str]) -> Option<u8> {
    if let Some(number) = finite_number(value, keys) {
        return Some(number.round().clamp(1.0, 3.0) as u8);
    }
    match text(value, keys).to_lowercase().as_str() {
        "high" | "major" | "pivotal" | "critical" => Some(3),
        "medium" | "moderate" => Some(2),
        "low" | "minor" => Some(1),
        _ => None,
    }
}

/// Positive integer citation numbers. Accepts `3`, `"3"` and `"[3]"`.
pub(crate) fn citation_numbers(value: &Value, keys: &[&str]) -> (Vec<u32>, usize) {
    let mut kept: Vec<u32> = Vec::new();
    let mut dropped = 0;
    for element in array(value, keys) {
        let parsed = match element {
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64)
                .map(|f| f as u32),
            Value::String(s) => s
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= 1),
            _ => None,
        };
        match parsed {
            Some(n) if !kept.contains(&n) => kept.push(n),
            Some(_) => {}
            None => dropped += 1,
        }
    }
    (kept, dropped)
}

/// A non-negative integer index. `Ok(None)` when absent, `Err(())` when
/// present but unusable.
pub(crate) fn index(value: &Value, keys: &[&str]) -> Result<Option<usize>, ()> {
    let Some(raw) = field(value, keys) else {
        return Ok(None);
    };
    let number = match raw {
        Value::Number(n) => n.as_f64().ok_or(())?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| ())?,
        _ => return Err(()),
    };
    if number.is_finite() && number >= 0.0 && number.fract() == 0.0 {
        Ok(Some(number as usize))
    } else {
        Err(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_coerces_mismatches_to_empty() {
        let value = json!({"title": 42, "summary": "  Rome burns  "});
        assert_eq!(text(&value, &["title"]), "");
        assert_eq!(text(&value, &["summary"]), "Rome burns");
        assert_eq!(text(&json!(null), &["title"]), "");
    }

    #[test]
    fn first_present_alias_wins() {
        let value = json!({"one_liner": null, "oneLiner": "Carthage must be destroyed"});
        assert_eq!(
            text(&value, &["one_liner", "oneLiner"]),
            "Carthage must be destroyed"
        );
    }

    #[test]
    fn text_list_discards_non_strings() {
        let value = json!({"facts": ["a", 3, "", {"x": 1}, " b "]});
        let (kept, dropped) = text_list(&value, &["facts"]);
        assert_eq!(kept, vec!["a", "b"]);
        assert_eq!(dropped, 3);
    }

    #[test]
    fn years_parse_from_many_shapes() {
        let value = json!({
            "a": -216, "b": 1066.4, "c": "216 BCE", "d": "c. 1066",
            "e": "44 BC", "f": "AD 9", "g": "soon", "h": f64::NAN
        });
        assert_eq!(year(&value, &["a"]), Some(-216));
        assert_eq!(year(&value, &["b"]), Some(1066));
        assert_eq!(year(&value, &["c"]), Some(-216));
        assert_eq!(year(&value, &["d"]), Some(1066));
        assert_eq!(year(&value, &["e"]), Some(-44));
        assert_eq!(year(&value, &["f"]), Some(9));
        assert_eq!(year(&value, &["g"]), None);
        assert_eq!(year(&value, &["h"]), None);
    }

    #[test]
    fn bce_marker_is_found_wherever_it_sits() {
        assert_eq!(parse_year_text("216BC"), Some(-216));
        assert_eq!(parse_year_text("BC 216"), Some(-216));
        assert_eq!(parse_year_text("216 bc"), Some(-216));
        assert_eq!(parse_year_text("31 B.C.E."), Some(-31));
        assert_eq!(parse_year_text("-216 BCE"), Some(-216));
        assert_eq!(parse_year_text("1066 ABC"), Some(1066));
        assert_eq!(parse_year_text("AD 9"), Some(9));
    }

    #[test]
    fn importance_is_clamped() {
        let value = json!({"a": 7, "b": -2, "c": "high", "d": "2", "e": true});
        assert_eq!(importance(&value, &["a"]), Some(3));
        assert_eq!(importance(&value, &["b"]), Some(1));
        assert_eq!(importance(&value, &["c"]), Some(3));
        assert_eq!(importance(&value, &["d"]), Some(2));
        assert_eq!(importance(&value, &["e"]), None);
    }

    #[test]
    fn citation_numbers_accept_marker_strings() {
        let value = json!({"citations": [1, "[2]", "3", 0, -1, 2.5, "x", 1]});
        let (kept, dropped) = citation_numbers(&value, &["citations"]);
        assert_eq!(kept, vec![1, 2, 3]);
        assert_eq!(dropped, 4);
    }

    #[test]
    fn index_distinguishes_absent_from_invalid() {
        assert_eq!(index(&json!({}), &["i"]), Ok(None));
        assert_eq!(index(&json!({"i": 2}), &["i"]), Ok(Some(2)));
        assert_eq!(index(&json!({"i": "1"}), &["i"]), Ok(Some(1)));
        assert_eq!(index(&json!({"i": -1}), &["i"]), Err(()));
        assert_eq!(index(&json!({"i": 1.5}), &["i"]), Err(()));
    }
}
