//! Substring filtering and code listings for `get_*` results.
use crate::models::{InfoMapping, Named};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Keep only the entries whose value, rendered as JSON, contains `needle`
/// (case-insensitive).
///
/// Metadata records embed their own id, so this also filters on the key.
///
/// ```
/// use std::collections::BTreeMap;
/// use serde_json::json;
///
/// let mut regions = BTreeMap::new();
/// regions.insert("EAS".to_string(), json!({"code": "EAS", "name": "East Asia & Pacific"}));
/// regions.insert("SAS".to_string(), json!({"code": "SAS", "name": "South Asia"}));
/// let hits = wbdata::match_data("asia &", &regions);
/// assert_eq!(hits.keys().collect::<Vec<_>>(), ["EAS"]);
/// ```
pub fn match_data<V>(needle: &str, results: &BTreeMap<String, V>) -> BTreeMap<String, V>
where
    V: Serialize + Clone,
{
    let needle = needle.to_lowercase();
    results
        .iter()
        .filter(|(_, v)| {
            serde_json::to_string(v)
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Display names shown next to a code in a listing.
pub trait Labelled {
    fn labels(&self) -> Vec<String>;
}

impl Labelled for serde_json::Value {
    fn labels(&self) -> Vec<String> {
        ["value", "name"]
            .iter()
            .filter_map(|field| self.get(field))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }
}

impl Labelled for Named {
    fn labels(&self) -> Vec<String> {
        vec![self.value.clone()]
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Num(u64),
    Text(String),
}

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()));

/// Split `"SP.POP.0014"` into text and number runs so that `a2` sorts before `a10`.
fn natural_key(text: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in DIGITS.find_iter(text) {
        if m.start() > last {
            out.push(Chunk::Text(text[last..m.start()].to_string()));
        }
        match m.as_str().parse::<u64>() {
            Ok(n) => out.push(Chunk::Num(n)),
            Err(_) => out.push(Chunk::Text(m.as_str().to_string())),
        }
        last = m.end();
    }
    if last < text.len() {
        out.push(Chunk::Text(text[last..].to_string()));
    }
    out
}

pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_key(a).cmp(&natural_key(b)).then_with(|| a.cmp(b))
}

/// One `code  label` line per label, codes in natural order, optionally filtered
/// through [`match_data`].
pub fn format_codes<V>(results: &BTreeMap<String, V>, filter: Option<&str>) -> String
where
    V: Labelled + Serialize + Clone,
{
    let filtered;
    let results = match filter {
        Some(needle) => {
            filtered = match_data(needle, results);
            &filtered
        }
        None => results,
    };

    let mut keys: Vec<&String> = results.keys().collect();
    keys.sort_by(|a, b| natural_cmp(a, b));

    let mut out = String::new();
    for k in keys {
        for label in results[k].labels() {
            out.push_str(&format!("{:30} {}\n", k, label));
        }
    }
    out
}

/// Listing for the names returned alongside indicator data: countries first,
/// then indicators.
pub fn format_info(info: &InfoMapping, filter: Option<&str>) -> String {
    let mut out = format_codes(&info.countries, filter);
    out.push_str(&format_codes(&info.indicators, filter));
    out
}

/// Print [`format_codes`] to stdout.
pub fn print_codes<V>(results: &BTreeMap<String, V>, filter: Option<&str>)
where
    V: Labelled + Serialize + Clone,
{
    print!("{}", format_codes(results, filter));
}
