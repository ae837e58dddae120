use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata section returned by the API (position 0 of every page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    /// Accept both and normalize to `u32`.
    #[serde(default, deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "de_u32_from_string_or_number")]
    pub total: u32,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("negative value for u32"));
            }
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeName {
    pub id: String,
    pub value: String,
}

/// One observation from the `countries/{codes}/indicators/{code}` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub indicator: CodeName,
    pub country: CodeName,
    #[serde(default)]
    pub countryiso3code: Option<String>,
    pub date: String,
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, rename = "obs_status")]
    pub obs_status: Option<String>,
    #[serde(default)]
    pub decimal: Option<i32>,
}

/// `indicator id -> country id (alpha-2) -> date -> value`
pub type DataMapping = BTreeMap<String, BTreeMap<String, BTreeMap<String, Option<f64>>>>;

/// Display name captured for an indicator or country id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    pub value: String,
}

/// Human-readable names for the ids appearing in a [`DataMapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoMapping {
    pub indicators: BTreeMap<String, Named>,
    pub countries: BTreeMap<String, Named>,
}

/// Metadata records (countries, indicators, topics, ...) keyed by their id field.
pub type EntityMapping = BTreeMap<String, serde_json::Value>;

/// One record from the Climate Data API.
///
/// Instrumental responses carry `year` or `month` with `data`; modelled responses
/// carry `fromYear`/`toYear` with `annualVal` or `monthVals`, and optionally
/// `gcm`, `scenario` and `percentile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub gcm: Option<String>,
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub percentile: Option<u32>,
    #[serde(default)]
    pub from_year: Option<i32>,
    #[serde(default)]
    pub to_year: Option<i32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<i32>,
    #[serde(default)]
    pub data: Option<f64>,
    #[serde(default)]
    pub annual_val: Option<Vec<f64>>,
    #[serde(default)]
    pub month_vals: Option<Vec<f64>>,
}

/// `location (alpha-2 or basin id) -> year or month (1-12) -> value`
pub type InstrumentalMapping = BTreeMap<String, BTreeMap<i32, f64>>;

/// Top-level key of a modelled result: a named GCM, or one ensemble percentile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKey {
    Gcm(String),
    Ensemble { percentile: u32 },
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKey::Gcm(name) => f.write_str(name),
            ModelKey::Ensemble { percentile } => write!(f, "ensemble_{}", percentile),
        }
    }
}

impl Serialize for ModelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Start year of a modelled window, tagged with its emissions scenario when the
/// observation is a future projection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeKey {
    pub year: i32,
    pub scenario: Option<String>,
}

impl TimeKey {
    pub fn year(year: i32) -> Self {
        Self {
            year,
            scenario: None,
        }
    }

    pub fn with_scenario(year: i32, scenario: impl Into<String>) -> Self {
        Self {
            year,
            scenario: Some(scenario.into()),
        }
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scenario {
            Some(s) => write!(f, "{}_{}", self.year, s),
            None => write!(f, "{}", self.year),
        }
    }
}

impl Serialize for TimeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelledValue {
    Annual(f64),
    /// Month number (1-12) to value.
    Monthly(BTreeMap<u8, f64>),
}

/// `model -> location -> time -> value`
pub type ModelledMapping =
    BTreeMap<ModelKey, BTreeMap<String, BTreeMap<TimeKey, ModelledValue>>>;
