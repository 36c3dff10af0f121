use serde_json::Value;

/// Fields that carry the answer, in priority order.
const PRIORITY_KEYS: [&str; 6] = [
    "rows_computed",
    "canonical_id",
    "composite_score",
    "pct_change",
    "raiv",
    "RAIV",
];

/// Print just the key answer value(s).
///
/// Objects print their highest-priority field. Arrays of per-country
/// records print one `country: value` line each.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(items) => {
            for item in items {
                let label = item
                    .get("country")
                    .or_else(|| item.get("Country"))
                    .or_else(|| item.get("raw_label"))
                    .map(format_minimal);
                match (label, key_value(item)) {
                    (Some(label), Some(v)) => println!("{}: {}", label, format_minimal(v)),
                    (None, Some(v)) => println!("{}", format_minimal(v)),
                    _ => println!("{}", format_minimal(item)),
                }
            }
        }
        other => match key_value(other) {
            Some(v) => println!("{}", format_minimal(v)),
            None => println!("{}", format_minimal(other)),
        },
    }
}

fn key_value(value: &Value) -> Option<&Value> {
    let map = value.as_object()?;
    PRIORITY_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
