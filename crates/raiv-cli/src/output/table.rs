use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Nested record lists printed as their own sections.
const SECTION_KEYS: [&str; 2] = ["rows", "buckets"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map),
        other => print_table(other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalar fields as a Field/Value table, then each record list as its own
/// table. A run's `summary` is expanded one level.
fn print_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut sections: Vec<(&str, &Vec<Value>)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(items) if is_record_list(items) => sections.push((key.as_str(), items)),
            Value::Object(inner) if key == "summary" => {
                for (k, v) in inner {
                    if let Value::Array(items) = v {
                        sections.push((k.as_str(), items));
                    }
                }
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (name, items) in sections {
        println!("\n{}:", name);
        print_array_table(items);
    }
}

fn is_record_list(items: &[Value]) -> bool {
    matches!(items.first(), Some(Value::Object(_)))
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    // Grouped records (e.g. one ranking per year): a heading per group.
    if let Some(section) = SECTION_KEYS.iter().find(|k| first.get(**k).is_some_and(Value::is_array)) {
        for item in arr {
            if let Value::Object(map) = item {
                let heading: Vec<String> = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != *section)
                    .map(|(k, v)| format!("{}={}", k, format_value(v)))
                    .collect();
                println!("\n[{}]", heading.join(", "));
                if let Some(Value::Array(items)) = map.get(*section) {
                    print_array_table(items);
                }
            }
        }
        return;
    }

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }

    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
