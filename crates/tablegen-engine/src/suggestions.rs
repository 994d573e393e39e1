//! Fuzzy matching suggestions for template errors
//!
//! Uses Levenshtein distance to point at the filter or data key the
//! template author most likely meant.

/// Maximum Levenshtein distance to consider for suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Filters available to templates
pub const AVAILABLE_FILTERS: &[&str] = &[
    // Code-generation filters
    "date_time_format",
    "escape_java_string",
    "flat_get",
    // Built-in MiniJinja filters
    "default",
    "upper",
    "lower",
    "title",
    "capitalize",
    "replace",
    "trim",
    "join",
    "first",
    "last",
    "length",
    "reverse",
    "sort",
    "unique",
    "map",
    "select",
    "reject",
    "selectattr",
    "rejectattr",
    "batch",
    "slice",
    "dictsort",
    "items",
    "attr",
    "int",
    "float",
    "abs",
    "round",
    "string",
    "list",
    "bool",
    "indent",
    "tojson",
    "urlencode",
];

/// Find the closest candidates, best first
pub fn find_closest_matches<'a>(
    input: &str,
    candidates: &[&'a str],
    max_results: usize,
) -> Vec<&'a str> {
    let mut matches: Vec<(usize, &str)> = candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = strsim::levenshtein(input, candidate);
            (distance > 0 && distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, candidate))
        })
        .collect();

    matches.sort_by_key(|(distance, _)| *distance);
    matches.truncate(max_results);
    matches.into_iter().map(|(_, candidate)| candidate).collect()
}

fn did_you_mean(matches: &[&str]) -> Option<String> {
    if matches.is_empty() {
        return None;
    }
    let quoted: Vec<String> = matches.iter().map(|m| format!("`{}`", m)).collect();
    Some(format!("Did you mean {}?", quoted.join(" or ")))
}

/// Suggest corrections for an undefined variable against the data keys
pub fn suggest_undefined_variable(variable_name: &str, available: &[String]) -> Option<String> {
    let root = variable_name.split('.').next().unwrap_or(variable_name);
    let candidates: Vec<&str> = available.iter().map(String::as_str).collect();

    did_you_mean(&find_closest_matches(root, &candidates, 3)).or_else(|| {
        if available.is_empty() {
            None
        } else {
            Some(format!(
                "`{}` is not in the data document. Top-level keys: {}",
                root,
                available.join(", ")
            ))
        }
    })
}

/// Suggest corrections for an unknown filter
pub fn suggest_unknown_filter(filter_name: &str) -> Option<String> {
    did_you_mean(&find_closest_matches(filter_name, AVAILABLE_FILTERS, 3)).or_else(|| {
        Some(format!(
            "Unknown filter `{}`. Code-generation filters: date_time_format, escape_java_string, flat_get",
            filter_name
        ))
    })
}

/// Hint for writing a missing `flat_get` lookup to the output
pub fn suggest_missing_lookup() -> String {
    "Guard the lookup with `is defined` or pass a default: `flat_get(\"a.b\", fallback)`"
        .to_string()
}

/// Extract a quoted name from an error message
pub fn extract_quoted_name(msg: &str) -> Option<String> {
    // Pattern: "unknown filter `foo`" or "variable 'bar' is undefined"
    let patterns = [("`", "`"), ("'", "'"), ("\"", "\"")];

    for (start, end) in patterns {
        if let Some(start_idx) = msg.find(start) {
            let rest = &msg[start_idx + start.len()..];
            if let Some(end_idx) = rest.find(end) {
                return Some(rest[..end_idx].to_string());
            }
        }
    }
    None
}
