//! Field keys and value coercion shared by every form writer and reader.
//!
//! Policy:
//! - One key function (`field_key`) for all sections and all periods.
//! - Accents are stripped via NFD decomposition, then everything is lowercased.
//! - Quotes and parentheses vanish; any other run of punctuation or whitespace
//!   becomes a single `_`.
//!
//! Keep this logic single-sourced: a key written by one form must be the key
//! read back by every other form.

use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize a human label into the stored field key.
///
/// `"Stock Período Anterior"` -> `"stock_periodo_anterior"`,
/// `"Ventas (USD) / Mes"` -> `"ventas_usd_mes"`.
pub fn field_key(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.nfd() {
        for lc in ch.to_lowercase() {
            if is_combining_mark(lc) {
                continue;
            }
            match lc {
                '\'' | '"' | '(' | ')' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' => {}
                c if c.is_alphanumeric() => {
                    if pending_sep && !out.is_empty() {
                        out.push('_');
                    }
                    pending_sep = false;
                    out.push(c);
                }
                _ => pending_sep = true,
            }
        }
    }
    out
}

/// Parse a raw form value as a decimal number.
///
/// A lone `,` is a decimal separator (`12,5`). When both `,` and `.` appear,
/// whichever comes last is the decimal separator and the other groups
/// thousands (`1,234.5` and `1.234,5` are both 1234.5). Non-finite results
/// are not numbers.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let candidate: Cow<'_, str> = match (s.rfind(','), s.rfind('.')) {
        (None, _) => Cow::Borrowed(s),
        (Some(_), None) => Cow::Owned(s.replace(',', ".")),
        (Some(comma), Some(dot)) if comma > dot => Cow::Owned(s.replace('.', "").replace(',', ".")),
        (Some(_), Some(_)) => Cow::Owned(s.replace(',', "")),
    };
    // f64::from_str accepts "inf" and "NaN"; those stay text.
    let v: f64 = candidate.parse().ok()?;
    v.is_finite().then_some(v)
}

/// Coerce one stored value: numeric strings become numbers, blank strings
/// become null, everything else is kept as is.
pub fn coerce_value(value: Value) -> Value {
    match value {
        Value::String(s) => {
            if s.trim().is_empty() {
                Value::Null
            } else if let Some(n) = parse_decimal(&s).and_then(Number::from_f64) {
                Value::Number(n)
            } else {
                Value::String(s)
            }
        }
        other => other,
    }
}

pub fn coerce_section(data: Map<String, Value>) -> Map<String, Value> {
    data.into_iter().map(|(k, v)| (k, coerce_value(v))).collect()
}

/// Rewrite every key through `field_key`. A key that is already canonical
/// wins over a legacy spelling of the same key; a key that normalizes to
/// nothing is kept verbatim.
pub fn canonical_keys(data: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(data.len());
    let mut legacy = Vec::new();
    for (k, v) in data {
        let key = field_key(&k);
        if key.is_empty() || key == k {
            out.insert(k, v);
        } else {
            legacy.push((key, v));
        }
    }
    for (key, v) in legacy {
        out.entry(key).or_insert(v);
    }
    out
}

/// True when `canonical_keys` would rename at least one key.
pub fn has_legacy_keys(data: &Map<String, Value>) -> bool {
    data.keys().any(|k| {
        let key = field_key(k);
        !key.is_empty() && key != *k
    })
}

/// Read a stored value as a number, accepting numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Collects `(label, raw value)` pairs from a form into a section map keyed by
/// `field_key`, optionally prefixed (e.g. `"ingresos"`, `"home"`).
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    prefix: Option<String>,
    fields: Map<String, Value>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            fields: Map::new(),
        }
    }

    pub fn key_for(&self, label: &str) -> String {
        match &self.prefix {
            Some(p) => field_key(&format!("{p} {label}")),
            None => field_key(label),
        }
    }

    pub fn push(&mut self, label: &str, raw: &str) -> &mut Self {
        let key = self.key_for(label);
        self.fields.insert(key, coerce_value(Value::String(raw.to_string())));
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_section(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_strip_accents_and_punctuation() {
        assert_eq!(field_key("Stock Período Anterior"), "stock_periodo_anterior");
        assert_eq!(field_key("Ventas (USD) / Mes."), "ventas_usd_mes");
        assert_eq!(field_key("  Año  -  Diseño: 'nuevo' "), "ano_diseno_nuevo");
        assert_eq!(field_key("activo_circulante_Disponible"), "activo_circulante_disponible");
    }

    #[test]
    fn keys_are_idempotent() {
        for label in ["Préstamo Bancario", "home_Stock_Período_Anterior_México", "__a__b__", "İstanbul"] {
            let once = field_key(label);
            assert_eq!(field_key(&once), once, "label {label:?}");
        }
    }

    #[test]
    fn decimals_accept_both_separators() {
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal(" 12,5 "), Some(12.5));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal("1.234.567,25"), Some(1234567.25));
        assert_eq!(parse_decimal("1,234,567.25"), Some(1234567.25));
        assert_eq!(parse_decimal("-3"), Some(-3.0));
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn coercion_keeps_text_and_nulls_blanks() {
        assert_eq!(coerce_value(json!("12.5")), json!(12.5));
        assert_eq!(coerce_value(json!("n/a")), json!("n/a"));
        assert_eq!(coerce_value(json!("   ")), Value::Null);
        assert_eq!(coerce_value(json!(true)), json!(true));
        assert_eq!(coerce_value(json!(7)), json!(7));
    }

    #[test]
    fn legacy_keys_are_canonicalized() {
        let data = json!({
            "home_Stock_Período_Anterior_Argentina": 5,
            "home_stock_periodo_anterior_chile": 7,
            "home_Stock_Período_Anterior_Chile": 99,
            "()": "kept",
        });
        let Value::Object(data) = data else { unreachable!() };
        assert!(has_legacy_keys(&data));

        let out = canonical_keys(data);
        assert_eq!(out.len(), 3);
        assert_eq!(out["home_stock_periodo_anterior_argentina"], json!(5));
        assert_eq!(out["home_stock_periodo_anterior_chile"], json!(7));
        assert_eq!(out["()"], json!("kept"));
        assert!(!has_legacy_keys(&out));
    }

    #[test]
    fn form_fields_prefix_and_coerce() {
        let mut form = FormFields::with_prefix("ingresos");
        form.push("Ventas Contado", "1,500.5").push("Observación", "pendiente");
        let section = form.into_section();
        assert_eq!(section["ingresos_ventas_contado"], json!(1500.5));
        assert_eq!(section["ingresos_observacion"], json!("pendiente"));
    }
}
