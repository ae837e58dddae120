//! Synchronous client for the **World Bank Climate Data API**.
//!
//! Two families of data:
//! - *instrumental*: historical CRU observations, per year, month or decade;
//! - *modelled*: General Circulation Model (GCM) projections over fixed 19-year
//!   windows, either per named GCM or as ensemble percentiles.
//!
//! Locations are country codes (alpha-2 or alpha-3) or numeric river basin ids.
//! Responses are flat JSON arrays, one request per location (and per window for
//! modelled data); results are keyed by alpha-2 code, or by basin id for basins.
//!
//! ```no_run
//! # use wbdata::{Climate, Interval, Model};
//! let climate = Climate::new()?;
//! let temps = climate.get_temp_instrumental(&["GB", "302"], Interval::Year)?;
//! let precip = climate.get_precip_modelled("mavg", &["BR"], &Model::Ensemble, Some("a2"), &[50])?;
//! # Ok::<(), wbdata::Error>(())
//! ```
use crate::countries::{CodeConverter, IsoCodes};
use crate::error::{Error, Result};
use crate::fetch::{DefaultFetcher, Fetch, default_fetcher};
use crate::models::{
    InstrumentalMapping, ModelKey, ModelledMapping, ModelledValue, Observation, TimeKey,
};
use serde_json::Value;
use std::fmt;

/// Start years of the 19-year windows served for GCM and ensemble pr/tas data.
pub const MODEL_WINDOWS: [i32; 8] = [1920, 1940, 1960, 1980, 2020, 2040, 2060, 2080];

/// Start years of the windows served for derived statistics.
pub const DERIVED_STAT_WINDOWS: [i32; 3] = [1961, 2046, 2081];

const WINDOW_LENGTH: i32 = 19;

/// Instrumental/modelled climate variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateVariable {
    Precipitation,
    Temperature,
}

impl ClimateVariable {
    /// API code: `pr` or `tas`.
    pub fn code(self) -> &'static str {
        match self {
            ClimateVariable::Precipitation => "pr",
            ClimateVariable::Temperature => "tas",
        }
    }
}

/// Aggregation of instrumental data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Year,
    Month,
    Decade,
}

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::Year => "year",
            Interval::Month => "month",
            Interval::Decade => "decade",
        }
    }
}

impl std::str::FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "year" => Ok(Interval::Year),
            "month" => Ok(Interval::Month),
            "decade" => Ok(Interval::Decade),
            other => Err(format!("unknown interval {:?} (year, month, decade)", other)),
        }
    }
}

/// Where a climate request is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// River basin id.
    Basin(u32),
    /// Country code, as given by the caller.
    Country(String),
}

impl Location {
    /// Integers are basin ids, anything else is a country code.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<u32>() {
            Ok(id) => Location::Basin(id),
            Err(_) => Location::Country(s.trim().to_string()),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Location::Basin(_) => "basin",
            Location::Country(_) => "country",
        }
    }

    /// Path token (alpha-3 for countries) and result key (alpha-2 for countries).
    fn tokens(&self, codes: &dyn CodeConverter) -> (String, String) {
        match self {
            Location::Basin(id) => (id.to_string(), id.to_string()),
            Location::Country(code) => {
                let alpha3 = codes.to_alpha3(code);
                let alpha2 = codes.to_alpha2(&alpha3);
                (alpha3, alpha2)
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Basin(id) => write!(f, "{}", id),
            Location::Country(code) => f.write_str(code),
        }
    }
}

/// Which modelled series to request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Model {
    /// Every GCM the API returns.
    #[default]
    All,
    /// Only these GCMs (matched case-insensitively).
    Gcms(Vec<String>),
    /// Ensemble percentiles across all GCMs.
    Ensemble,
}

impl Model {
    /// `[]` -> `All`, `["ensemble"]` -> `Ensemble`, otherwise `Gcms`.
    pub fn from_names(names: &[&str]) -> Self {
        match names {
            [] => Model::All,
            [one] if one.eq_ignore_ascii_case("ensemble") => Model::Ensemble,
            _ => Model::Gcms(names.iter().map(|n| n.to_lowercase()).collect()),
        }
    }
}

/// `aavg` -> `annualavg`, `aanom` -> `annualanom`; `m…` and spelled-out names
/// are returned unchanged.
pub fn expand_data_type(data_type: &str) -> String {
    match data_type.strip_prefix('a') {
        Some(rest) if !data_type.starts_with("annual") => format!("annual{}", rest),
        _ => data_type.to_string(),
    }
}

/// `(start, end)` windows requested for one modelled call.
pub fn model_windows(variable: &str, ensemble: bool) -> Vec<(i32, i32)> {
    let direct = matches!(variable, "pr" | "tas");
    if ensemble && !direct {
        DERIVED_STAT_WINDOWS
            .iter()
            .map(|&start| {
                // The 1961 window is the 1961-2000 baseline used for anomalies.
                let end = if start == 1961 { 2000 } else { start + WINDOW_LENGTH };
                (start, end)
            })
            .collect()
    } else {
        MODEL_WINDOWS
            .iter()
            .map(|&start| (start, start + WINDOW_LENGTH))
            .collect()
    }
}

pub struct Climate<F = DefaultFetcher> {
    pub base_url: String,
    fetcher: F,
    codes: Box<dyn CodeConverter + Send + Sync>,
}

impl Climate {
    /// Client over HTTP with the default one-day disk cache.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(default_fetcher()?))
    }
}

impl<F: Fetch> Climate<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            base_url: "https://climatedataapi.worldbank.org/climateweb/rest/".into(),
            fetcher,
            codes: Box::new(IsoCodes),
        }
    }

    /// Replace the built-in ISO table used to normalise country codes.
    pub fn with_code_converter(mut self, codes: impl CodeConverter + Send + Sync + 'static) -> Self {
        self.codes = Box::new(codes);
        self
    }

    /// Historical precipitation, `location > year or month (1-12) > mm`.
    pub fn get_precip_instrumental(
        &self,
        locations: &[&str],
        interval: Interval,
    ) -> Result<InstrumentalMapping> {
        self.fetch_instrumental(ClimateVariable::Precipitation, locations, interval)
    }

    /// Historical temperature, `location > year or month (1-12) > degrees C`.
    pub fn get_temp_instrumental(
        &self,
        locations: &[&str],
        interval: Interval,
    ) -> Result<InstrumentalMapping> {
        self.fetch_instrumental(ClimateVariable::Temperature, locations, interval)
    }

    /// Modelled precipitation. See [`Climate::fetch_modelled`].
    pub fn get_precip_modelled(
        &self,
        data_type: &str,
        locations: &[&str],
        model: &Model,
        scenario: Option<&str>,
        percentiles: &[u32],
    ) -> Result<ModelledMapping> {
        self.fetch_modelled("pr", data_type, locations, model, scenario, percentiles)
    }

    /// Modelled temperature. See [`Climate::fetch_modelled`].
    pub fn get_temp_modelled(
        &self,
        data_type: &str,
        locations: &[&str],
        model: &Model,
        scenario: Option<&str>,
        percentiles: &[u32],
    ) -> Result<ModelledMapping> {
        self.fetch_modelled("tas", data_type, locations, model, scenario, percentiles)
    }

    /// Derived statistic (e.g. `tmin_means`, `ppt_days`), always from the ensemble.
    pub fn get_derived_stat(
        &self,
        data_type: &str,
        stat: &str,
        locations: &[&str],
        scenario: Option<&str>,
        percentiles: &[u32],
    ) -> Result<ModelledMapping> {
        self.fetch_modelled(
            stat,
            data_type,
            locations,
            &Model::Ensemble,
            scenario,
            percentiles,
        )
    }

    /// One request per location; the month index from the API (0-11) is shifted to
    /// 1-12, other intervals are keyed by year.
    pub fn fetch_instrumental(
        &self,
        variable: ClimateVariable,
        locations: &[&str],
        interval: Interval,
    ) -> Result<InstrumentalMapping> {
        let mut results = InstrumentalMapping::new();
        for loc in locations.iter().map(|l| Location::parse(l)) {
            let (token, key) = loc.tokens(&*self.codes);
            let url = format!(
                "{}/v1/{}/cru/{}/{}/{}.json",
                self.base_url.trim_end_matches('/'),
                loc.kind(),
                variable.code(),
                interval.as_str(),
                token
            );
            let series = results.entry(key).or_default();
            for obs in self.fetch_observations(&url)? {
                let period = match interval {
                    Interval::Month => obs.month.map(|m| m + 1),
                    Interval::Year | Interval::Decade => obs.year,
                };
                let (Some(period), Some(value)) = (period, obs.data) else {
                    return Err(Error::malformed(
                        &url,
                        format!("{} observation without period or data", interval.as_str()),
                    ));
                };
                series.insert(period, value);
            }
        }
        Ok(results)
    }

    /// Fetch modelled data for every (window, location) pair and fold it into
    /// `model > location > time > value`.
    ///
    /// - `variable`: `pr`, `tas` or a derived statistic name.
    /// - `data_type`: `mavg`, `manom`, `aavg`/`annualavg`, `aanom`/`annualanom`, ...
    /// - `model`: GCM selection or ensemble.
    /// - `scenario`: keep only future values for this emissions scenario (e.g. `a2`,
    ///   `b1`); historical values carry no scenario and are always kept.
    /// - `percentiles`: ensemble percentiles to keep (e.g. `[10, 50, 90]`); empty keeps all.
    pub fn fetch_modelled(
        &self,
        variable: &str,
        data_type: &str,
        locations: &[&str],
        model: &Model,
        scenario: Option<&str>,
        percentiles: &[u32],
    ) -> Result<ModelledMapping> {
        let data_type = expand_data_type(data_type);
        let ensemble = matches!(model, Model::Ensemble);
        let locations: Vec<Location> = locations.iter().map(|l| Location::parse(l)).collect();

        let mut requests = Vec::new();
        for (start, end) in model_windows(variable, ensemble) {
            for loc in &locations {
                let (token, key) = loc.tokens(&*self.codes);
                let series = if ensemble {
                    format!("{}/ensemble/{}", data_type, variable)
                } else {
                    format!("{}/{}", data_type, variable)
                };
                let url = format!(
                    "{}/v1/{}/{}/{}/{}/{}.json",
                    self.base_url.trim_end_matches('/'),
                    loc.kind(),
                    series,
                    start,
                    end,
                    token
                );
                requests.push((key, url));
            }
        }

        let mut results = ModelledMapping::new();
        for (key, url) in requests {
            for obs in self.fetch_observations(&url)? {
                let model_key = if ensemble {
                    match obs.percentile {
                        Some(percentile) => ModelKey::Ensemble { percentile },
                        None => return Err(Error::malformed(&url, "ensemble value without percentile")),
                    }
                } else {
                    match &obs.gcm {
                        Some(gcm) => ModelKey::Gcm(gcm.clone()),
                        None => return Err(Error::malformed(&url, "modelled value without gcm")),
                    }
                };
                let Some(year) = obs.from_year else {
                    return Err(Error::malformed(&url, "modelled value without fromYear"));
                };
                let time = match &obs.scenario {
                    Some(s) => TimeKey::with_scenario(year, s.clone()),
                    None => TimeKey::year(year),
                };
                let value = if let Some(months) = &obs.month_vals {
                    ModelledValue::Monthly((1u8..).zip(months.iter().copied()).collect())
                } else if let Some(&annual) = obs.annual_val.as_ref().and_then(|v| v.first()) {
                    ModelledValue::Annual(annual)
                } else {
                    log::debug!("skipping value-less observation from {}", url);
                    continue;
                };

                results
                    .entry(model_key)
                    .or_default()
                    .entry(key.clone())
                    .or_default()
                    .insert(time, value);
            }
        }

        filter_modelled(&mut results, model, scenario, percentiles);
        Ok(results)
    }

    fn fetch_observations(&self, url: &str) -> Result<Vec<Observation>> {
        log::debug!("fetching {}", url);
        let body = self.fetcher.fetch(url).map_err(|e| Error::Transport {
            url: url.to_string(),
            source: e.into(),
        })?;
        let v: Value = serde_json::from_str(&body).map_err(|source| Error::Json {
            url: url.to_string(),
            source,
        })?;
        if !v.is_array() {
            return Err(Error::malformed(url, "not a top-level array"));
        }
        serde_json::from_value(v).map_err(|e| Error::malformed(url, e.to_string()))
    }
}

/// Drop model keys outside the GCM/percentile allow-lists and time keys whose
/// scenario differs from `scenario` (case-insensitive).
pub fn filter_modelled(
    results: &mut ModelledMapping,
    model: &Model,
    scenario: Option<&str>,
    percentiles: &[u32],
) {
    if let Model::Gcms(gcms) = model {
        results.retain(|k, _| match k {
            ModelKey::Gcm(name) => gcms.iter().any(|g| g.eq_ignore_ascii_case(name)),
            ModelKey::Ensemble { .. } => false,
        });
    }
    if !percentiles.is_empty() {
        results.retain(|k, _| match k {
            ModelKey::Ensemble { percentile } => percentiles.contains(percentile),
            ModelKey::Gcm(_) => true,
        });
    }
    if let Some(wanted) = scenario {
        for by_location in results.values_mut() {
            for by_time in by_location.values_mut() {
                by_time.retain(|t, _| match &t.scenario {
                    Some(s) => s.eq_ignore_ascii_case(wanted),
                    None => true,
                });
            }
        }
    }
}
