//! Data context loaded from the YAML data document

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value as YamlValue;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::LoadError;

/// YAML 1.1 date-only timestamp: month and day are always two digits
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})$").expect("valid regex")
});

/// YAML 1.1 date-time timestamp: one or two digit month and day, time required
static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^
        (?P<year>\d{4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})
        (?:[Tt]|[\ \t]+)
        (?P<hour>\d{1,2}):(?P<minute>\d{2}):(?P<second>\d{2})
        (?:\.(?P<fraction>\d*))?
        (?:[\ \t]*(?P<tz>Z|[-+]\d{1,2}(?::?\d{2})?))?
        $",
    )
    .expect("valid regex")
});

/// A date or date-time scalar from the data document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Calendar date without a time of day (`2021-03-04`)
    Date(NaiveDate),
    /// Date and time without an offset (`2021-03-04 05:06:07`)
    Local(NaiveDateTime),
    /// Date and time with an explicit offset (`2021-03-04T05:06:07+01:00`)
    Offset(DateTime<FixedOffset>),
}

impl Timestamp {
    /// Parse a plain scalar that matches the YAML timestamp grammar
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = DATE_RE.captures(text) {
            return date_of(&caps).map(Self::Date);
        }

        let caps = DATETIME_RE.captures(text)?;
        let date = date_of(&caps)?;
        let nanos = caps
            .name("fraction")
            .map(|m| fraction_to_nanos(m.as_str()))
            .unwrap_or(0);
        let time = NaiveTime::from_hms_nano_opt(
            number(&caps, "hour")?,
            number(&caps, "minute")?,
            number(&caps, "second")?,
            nanos,
        )?;
        let local = date.and_time(time);

        match caps.name("tz").map(|m| m.as_str()) {
            None => Some(Self::Local(local)),
            Some(tz) => {
                let offset = parse_offset(tz)?;
                offset.from_local_datetime(&local).single().map(Self::Offset)
            }
        }
    }

    /// Wall-clock date and time (dates are taken at midnight)
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN),
            Self::Local(local) => *local,
            Self::Offset(dt) => dt.naive_local(),
        }
    }

    /// Whether the value carries a time of day
    pub fn has_time(&self) -> bool {
        !matches!(self, Self::Date(_))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Local(local) => write!(f, "{}", local.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Offset(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
        }
    }
}

fn date_of(caps: &Captures<'_>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        number(caps, "year")?,
        number(caps, "month")?,
        number(caps, "day")?,
    )
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}

fn fraction_to_nanos(digits: &str) -> u32 {
    let mut nanos = 0u32;
    for (i, d) in digits.chars().take(9).enumerate() {
        nanos += d.to_digit(10).unwrap_or(0) * 10u32.pow(8 - i as u32);
    }
    nanos
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    if tz == "Z" {
        return FixedOffset::east_opt(0);
    }

    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let digits: String = tz[1..].chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = if digits.len() > 2 {
        digits.split_at(digits.len() - 2)
    } else {
        (digits.as_str(), "0")
    };
    let seconds = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * seconds)
}

/// A node in the data tree
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Timestamp(Timestamp),
    Sequence(Vec<ContextValue>),
    /// Keys keep document order
    Mapping(IndexMap<String, ContextValue>),
}

impl ContextValue {
    /// Short type name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, ContextValue>> {
        match self {
            Self::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Convert a parsed YAML node
    fn from_yaml(value: YamlValue) -> Self {
        match value {
            YamlValue::Null => Self::Null,
            YamlValue::Bool(b) => Self::Bool(b),
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            YamlValue::String(s) => match Timestamp::parse(&s) {
                Some(ts) => Self::Timestamp(ts),
                None => Self::String(s),
            },
            YamlValue::Sequence(items) => {
                Self::Sequence(items.into_iter().map(Self::from_yaml).collect())
            }
            YamlValue::Mapping(map) => Self::Mapping(
                map.into_iter()
                    .map(|(k, v)| (key_to_string(k), Self::from_yaml(v)))
                    .collect(),
            ),
            // Tags carry no meaning for templates
            YamlValue::Tagged(tagged) => Self::from_yaml(tagged.value),
        }
    }
}

fn key_to_string(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Tagged(tagged) => key_to_string(tagged.value),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// The data tree every template is rendered against
///
/// Loaded once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    root: IndexMap<String, ContextValue>,
}

impl Context {
    /// Load the data document at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let context = Self::parse(&content, path)?;
        tracing::debug!(
            path = %path.display(),
            keys = context.root.len(),
            "loaded data document"
        );
        Ok(context)
    }

    /// Parse a data document held in memory
    pub fn from_yaml(yaml: &str) -> Result<Self, LoadError> {
        Self::parse(yaml, Path::new("<inline>"))
    }

    fn parse(yaml: &str, path: &Path) -> Result<Self, LoadError> {
        let value: YamlValue = serde_yaml::from_str(yaml).map_err(|source| LoadError::Parse {
            path: PathBuf::from(path),
            source,
        })?;

        match ContextValue::from_yaml(value) {
            ContextValue::Mapping(root) => Ok(Self { root }),
            other => Err(LoadError::NotAMapping {
                path: PathBuf::from(path),
                found: other.kind_name(),
            }),
        }
    }

    /// Top-level entries in document order
    pub fn root(&self) -> &IndexMap<String, ContextValue> {
        &self.root
    }

    /// Get a value by dotted path (e.g. "countries.NL.length")
    pub fn get(&self, path: &str) -> Option<&ContextValue> {
        let mut parts = path.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_mapping()?.get(part)?;
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
