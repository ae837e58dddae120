//! Per-call query options for the Indicators API.
//!
//! The API mixes two conventions: `language`, `source` and `topic` live in the URL
//! path, everything else goes into the query string. [`Options`] keeps the path
//! options as named fields and carries any other parameter (`gapfill`, `frequency`,
//! `incomeLevel`, ...) in a residual map that is passed through verbatim.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How to specify dates in API queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateSpec {
    /// Single year like 2020
    Year(i32),
    /// Inclusive range like 2000..=2020
    Range { start: i32, end: i32 },
    /// Anything the API understands that is not a plain year, e.g. `2012M01:2012M08`
    /// or `2010Q1:2011Q4`.
    Period(String),
}

impl DateSpec {
    pub fn to_query_param(&self) -> String {
        match self {
            DateSpec::Year(y) => y.to_string(),
            DateSpec::Range { start, end } => format!("{}:{}", start, end),
            DateSpec::Period(p) => p.clone(),
        }
    }

    /// `2020` -> `Year`, `2000:2010` -> `Range`, anything else -> `Period`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Ok(y) = s.parse::<i32>() {
            return DateSpec::Year(y);
        }
        if let Some((a, b)) = s.split_once(':')
            && let (Ok(start), Ok(end)) = (a.parse::<i32>(), b.parse::<i32>())
        {
            return DateSpec::Range { start, end };
        }
        DateSpec::Period(s.to_string())
    }
}

/// A single option value as it will appear in the query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// Rendered `;`-joined, the API's list separator.
    List(Vec<String>),
}

impl OptionValue {
    pub fn to_query_value(&self) -> String {
        match self {
            OptionValue::Text(s) => s.clone(),
            OptionValue::Integer(n) => n.to_string(),
            OptionValue::Float(x) => x.to_string(),
            OptionValue::List(items) => items.join(";"),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_value())
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Integer(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Integer(n.into())
    }
}

impl From<u32> for OptionValue {
    fn from(n: u32) -> Self {
        OptionValue::Integer(n.into())
    }
}

impl From<f64> for OptionValue {
    fn from(x: f64) -> Self {
        OptionValue::Float(x)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(items: Vec<String>) -> Self {
        OptionValue::List(items)
    }
}

impl From<&[&str]> for OptionValue {
    fn from(items: &[&str]) -> Self {
        OptionValue::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// Options the client always sets itself; caller values are discarded.
pub(crate) const FIXED_OPTIONS: [(&str, &str); 2] = [("format", "json"), ("per_page", "10000")];

/// Options the caller may not set at all (pagination is handled internally).
pub(crate) const BANNED_OPTIONS: [&str; 1] = ["page"];

/// Query options for a single Indicators API call.
///
/// ```
/// use wbdata::{DateSpec, Options};
///
/// let opts = Options::new()
///     .language("fr")
///     .date(DateSpec::Range { start: 2000, end: 2010 })
///     .set("gapFill", "Y");
/// assert_eq!(opts.get_language(), Some("fr"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    language: Option<String>,
    source: Option<String>,
    topic: Option<String>,
    date: Option<DateSpec>,
    mrv: Option<String>,
    extra: BTreeMap<String, OptionValue>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-letter language code, e.g. `"fr"`. Becomes the outermost path segment.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Restrict to one data source (e.g. `2` for WDI). Cannot be combined with `topic`.
    pub fn source(mut self, source: impl fmt::Display) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// Restrict to one topic. Cannot be combined with `source`.
    pub fn topic(mut self, topic: impl fmt::Display) -> Self {
        self.topic = Some(topic.to_string());
        self
    }

    pub fn date(mut self, date: DateSpec) -> Self {
        self.date = Some(date);
        self
    }

    /// Number of most recent values to return.
    pub fn mrv(mut self, mrv: u32) -> Self {
        self.mrv = Some(mrv.to_string());
        self
    }

    /// Set an option by name. Names are matched case-insensitively: the path and
    /// date options are routed to their fields, `page`, `format` and `per_page` are
    /// dropped, and everything else is kept as a pass-through query parameter.
    pub fn set(mut self, name: &str, value: impl Into<OptionValue>) -> Self {
        let name = name.to_lowercase();
        let value = value.into();
        match name.as_str() {
            "language" => self.language = Some(value.to_query_value()),
            "source" => self.source = Some(value.to_query_value()),
            "topic" => self.topic = Some(value.to_query_value()),
            "date" => self.date = Some(DateSpec::parse(&value.to_query_value())),
            "mrv" => self.mrv = Some(value.to_query_value()),
            n if BANNED_OPTIONS.contains(&n) || FIXED_OPTIONS.iter().any(|(k, _)| *k == n) => {
                log::debug!("ignoring option {:?}, it is managed by the client", n);
            }
            _ => {
                self.extra.insert(name, value);
            }
        }
        self
    }

    pub fn get_language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn get_source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn get_topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn get_date(&self) -> Option<&DateSpec> {
        self.date.as_ref()
    }

    pub fn get_mrv(&self) -> Option<&str> {
        self.mrv.as_deref()
    }

    /// Pass-through query parameters, keyed by lower-cased name.
    pub fn extra(&self) -> &BTreeMap<String, OptionValue> {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_routes_names_case_insensitively() {
        let o = Options::new()
            .set("Language", "es")
            .set("TOPIC", 5)
            .set("Date", "2000:2010")
            .set("gapFill", "Y");
        assert_eq!(o.get_language(), Some("es"));
        assert_eq!(o.get_topic(), Some("5"));
        assert_eq!(o.get_date(), Some(&DateSpec::Range { start: 2000, end: 2010 }));
        assert_eq!(o.extra().get("gapfill"), Some(&OptionValue::from("Y")));
    }

    #[test]
    fn managed_options_are_dropped() {
        let o = Options::new()
            .set("page", 3)
            .set("per_page", 5)
            .set("FORMAT", "xml");
        assert!(o.extra().is_empty());
    }

    #[test]
    fn date_spec_parsing() {
        assert_eq!(DateSpec::parse("2020"), DateSpec::Year(2020));
        assert_eq!(
            DateSpec::parse("2012M01:2012M08"),
            DateSpec::Period("2012M01:2012M08".into())
        );
        assert_eq!(DateSpec::Range { start: 1, end: 2 }.to_query_param(), "1:2");
    }

    #[test]
    fn list_values_join_with_semicolons() {
        let v = OptionValue::from(&["a", "b", "c"][..]);
        assert_eq!(v.to_query_value(), "a;b;c");
        assert_eq!(OptionValue::from(2.5).to_query_value(), "2.5");
    }
}
