//! Code-generation filters
//!
//! Filters are collected in a [`FilterSet`] value that the engine installs
//! into each environment it builds. Nothing is registered globally.

use chrono::format::{Item, StrftimeItems};
use minijinja::{Environment, Error, ErrorKind, Value};
use std::fmt::Write as _;
use tablegen_core::Timestamp;

use crate::value::{DateValue, Lookup, MissingValue, is_missing};

/// The filters this engine provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    DateTimeFormat,
    EscapeJavaString,
    FlatGet,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::DateTimeFormat, Filter::EscapeJavaString, Filter::FlatGet];

    /// Name the filter is invoked by in templates
    pub fn name(self) -> &'static str {
        match self {
            Filter::DateTimeFormat => "date_time_format",
            Filter::EscapeJavaString => "escape_java_string",
            Filter::FlatGet => "flat_get",
        }
    }

    fn install(self, env: &mut Environment<'_>) {
        match self {
            Filter::DateTimeFormat => env.add_filter(self.name(), date_time_format),
            Filter::EscapeJavaString => env.add_filter(self.name(), escape_java_string),
            Filter::FlatGet => env.add_filter(self.name(), flat_get),
        }
    }
}

/// A set of named filters handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl FilterSet {
    /// All code-generation filters
    pub fn standard() -> Self {
        Self {
            filters: Filter::ALL.to_vec(),
        }
    }

    /// No custom filters, only the MiniJinja builtins
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub fn with(mut self, filter: Filter) -> Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Register every filter in the set on `env`
    pub fn install(&self, env: &mut Environment<'_>) {
        for filter in &self.filters {
            filter.install(env);
        }
    }
}

/// Format a date or date-time with a strftime pattern
///
/// Dates without a time of day format as midnight.
///
/// Usage: {{ updated | date_time_format("%Y-%m-%d") }}
pub fn date_time_format(value: Value, pattern: String) -> Result<String, Error> {
    if let Some(missing) = value.downcast_object_ref::<MissingValue>() {
        return Err(missing.to_error());
    }
    let Some(date) = value.downcast_object_ref::<DateValue>() else {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("date_time_format expects a date or date-time, got {}", value.kind()),
        ));
    };

    let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid date format pattern '{}'", pattern),
        ));
    }

    let mut out = String::new();
    let written = match date.0 {
        Timestamp::Offset(dt) => write!(out, "{}", dt.format_with_items(items.iter())),
        other => write!(out, "{}", other.naive().format_with_items(items.iter())),
    };

    written.map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("pattern '{}' cannot be applied to {}", pattern, date.0),
        )
    })?;
    Ok(out)
}

/// Escape a value for use inside a double-quoted C-family string literal
///
/// Non-string values are escaped in their rendered form. The surrounding
/// quotes are not included; non-ASCII characters become `\uXXXX` escapes
/// (UTF-16 code units). A missing lookup is an error.
///
/// Usage: "{{ name | escape_java_string }}"
pub fn escape_java_string(value: Value) -> Result<String, Error> {
    if let Some(missing) = value.downcast_object_ref::<MissingValue>() {
        return Err(missing.to_error());
    }
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    // Escaping would hide a marker that was stringified earlier
    if let Some(missing) = MissingValue::find_in(&text) {
        return Err(missing.to_error());
    }
    Ok(escape_java(&text))
}

fn escape_java(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() || !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Look up a dotted key path in nested mappings
///
/// A missing segment yields `default` when one is given, otherwise a
/// marker that fails only when written to the output.
///
/// Usage: {{ countries | flat_get("NL.length", 0) }}
pub fn flat_get(obj: Value, path: String, default: Option<Value>) -> Value {
    match (Lookup::resolve(&obj, &path), default) {
        (Lookup::Missing { .. }, Some(default)) => default,
        (lookup, _) => lookup.into(),
    }
}

/// `defined` test that also treats missing lookups as undefined
pub fn is_defined(value: Value) -> bool {
    !value.is_undefined() && !is_missing(&value)
}

pub fn is_undefined(value: Value) -> bool {
    !is_defined(value)
}

/// `default` filter that also falls back for missing lookups
///
/// With `boolean` set, falsy values fall back too.
///
/// Usage: {{ countries | flat_get("DE.name") | default("n/a") }}
pub fn default_value(value: Value, other: Option<Value>, boolean: Option<bool>) -> Value {
    let use_default = if boolean.unwrap_or(false) {
        !value.is_true()
    } else {
        !is_defined(value.clone())
    };
    if use_default {
        other.unwrap_or_else(|| Value::from(""))
    } else {
        value
    }
}
