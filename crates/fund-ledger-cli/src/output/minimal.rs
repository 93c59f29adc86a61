use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(line) = replay_line(result_obj) {
        println!("{}", line);
        return;
    }

    let priority_keys = [
        "total_allocated",
        "total_interest_paid",
        "scaled_share",
        "block_size",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

/// `applied=5 rejected=1 lp_return=... gp_return=...` for a replay report.
fn replay_line(result: &Value) -> Option<String> {
    let applied = result.get("applied")?;
    let rejected = result.get("rejected")?;
    let summary = result.get("summary")?;
    Some(format!(
        "applied={} rejected={} lp_return={} gp_return={} gp_catchup={}",
        format_minimal(applied),
        format_minimal(rejected),
        format_minimal(summary.get("lp_return")?),
        format_minimal(summary.get("gp_return")?),
        format_minimal(summary.get("gp_catchup")?),
    ))
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
