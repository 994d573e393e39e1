//! Template values: context conversion, dates and the missing-lookup marker

use chrono::{Datelike, Timelike};
use indexmap::IndexMap;
use minijinja::value::{Object, ObjectRepr};
use minijinja::{Error, ErrorKind, Value};
use std::fmt;
use std::sync::Arc;
use tablegen_core::{Context, ContextValue, Timestamp};

/// Convert the data context into the template root value
pub fn context_to_value(context: &Context) -> Value {
    mapping_to_value(context.root())
}

/// Convert one data node; timestamps become [`DateValue`] objects
pub fn to_value(value: &ContextValue) -> Value {
    match value {
        ContextValue::Null => Value::from(()),
        ContextValue::Bool(b) => Value::from(*b),
        ContextValue::Integer(i) => Value::from(*i),
        ContextValue::Float(f) => Value::from(*f),
        ContextValue::String(s) => Value::from(s.as_str()),
        ContextValue::Timestamp(ts) => Value::from_object(DateValue(*ts)),
        ContextValue::Sequence(items) => Value::from(items.iter().map(to_value).collect::<Vec<_>>()),
        ContextValue::Mapping(map) => mapping_to_value(map),
    }
}

// Serializing values inside `from_serialize` keeps objects intact, and the
// engine's map type preserves insertion order.
fn mapping_to_value(map: &IndexMap<String, ContextValue>) -> Value {
    let entries: IndexMap<&str, Value> = map.iter().map(|(k, v)| (k.as_str(), to_value(v))).collect();
    Value::from_serialize(&entries)
}

/// A date or date-time as seen from templates
///
/// Renders in ISO form and exposes its calendar fields as attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateValue(pub Timestamp);

impl Object for DateValue {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let naive = self.0.naive();
        let field = match key.as_str()? {
            "year" => naive.year() as i64,
            "month" => naive.month() as i64,
            "day" => naive.day() as i64,
            "hour" if self.0.has_time() => naive.hour() as i64,
            "minute" if self.0.has_time() => naive.minute() as i64,
            "second" if self.0.has_time() => naive.second() as i64,
            _ => return None,
        };
        Some(Value::from(field))
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a dotted-path lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Resolved(Value),
    /// `segment` was absent while resolving `path`
    Missing { path: String, segment: String },
}

impl Lookup {
    /// Walk `path` through nested mappings starting at `obj`
    pub fn resolve(obj: &Value, path: &str) -> Self {
        let mut current = obj.clone();
        for segment in path.split('.') {
            let next = match current.kind() {
                minijinja::value::ValueKind::Map => current
                    .get_item(&Value::from(segment))
                    .ok()
                    .filter(|v| !v.is_undefined()),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => {
                    return Self::Missing {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    };
                }
            }
        }
        Self::Resolved(current)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

impl From<Lookup> for Value {
    fn from(lookup: Lookup) -> Self {
        match lookup {
            Lookup::Resolved(value) => value,
            Lookup::Missing { path, segment } => Value::from_object(MissingValue { path, segment }),
        }
    }
}

/// Template-side stand-in for [`Lookup::Missing`]
///
/// Falsy and reported as undefined by the `defined` test. Writing it to
/// the output is an error, raised by the engine's formatter. When a filter
/// or operator turns it into text first, the text carries a delimited
/// encoding of the lookup that [`reject_stringified_missing`] finds in the
/// rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValue {
    pub path: String,
    pub segment: String,
}

// Unicode noncharacters never appear in data or template text
const STRINGIFIED_START: char = '\u{fdd0}';
const STRINGIFIED_SEP: char = '\u{fdd1}';
const STRINGIFIED_END: char = '\u{fdd2}';

impl MissingValue {
    /// The error raised when this value reaches the output
    pub fn to_error(&self) -> Error {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("undefined value '{}' (at '{}')", self.path, self.segment),
        )
    }

    /// Find a stringified marker in `text`
    ///
    /// The path is hex encoded so case-changing filters keep it readable.
    pub fn find_in(text: &str) -> Option<Self> {
        let start = text.find(STRINGIFIED_START)? + STRINGIFIED_START.len_utf8();
        let rest = &text[start..];
        let decoded = rest
            .find(STRINGIFIED_END)
            .and_then(|end| rest[..end].split_once(STRINGIFIED_SEP))
            .and_then(|(path, segment)| Some((decode_hex(path)?, decode_hex(segment)?)));

        Some(match decoded {
            Some((path, segment)) => Self { path, segment },
            None => Self {
                path: "<unknown>".to_string(),
                segment: "<unknown>".to_string(),
            },
        })
    }
}

fn encode_hex(text: &str) -> String {
    text.bytes().map(|b| format!("{:02x}", b)).collect()
}

fn decode_hex(hex: &str) -> Option<String> {
    if hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}

impl Object for MissingValue {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn is_true(self: &Arc<Self>) -> bool {
        false
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        write!(
            f,
            "{}{}{}{}{}",
            STRINGIFIED_START,
            encode_hex(&self.path),
            STRINGIFIED_SEP,
            encode_hex(&self.segment),
            STRINGIFIED_END
        )
    }
}

/// Fail when rendered text contains a missing lookup turned into a string
pub fn reject_stringified_missing(text: String) -> Result<String, Error> {
    match MissingValue::find_in(&text) {
        Some(missing) => Err(missing.to_error()),
        None => Ok(text),
    }
}

/// Whether a value is the missing-lookup marker
pub fn is_missing(value: &Value) -> bool {
    value.downcast_object_ref::<MissingValue>().is_some()
}
