//! Synchronous client for the **World Bank Indicators API**.
//!
//! Covers the data endpoint (`countries/{codes}/indicators/{code}`) and the metadata
//! endpoints (indicators, countries, income levels, lending types, regions, topics,
//! sources). Responses are paged `[header, content]` envelopes; all pages are
//! fetched and concatenated before results are folded into keyed maps.
//!
//! ### Notes
//! - The API sometimes serializes `per_page` as a **string**; we accept both string/number.
//! - Country codes may be given as alpha-2 or alpha-3; they are sent as alpha-3.
//! - Results are keyed by the alpha-2 ids the API returns.
//!
//! Typical usage:
//! ```no_run
//! # use wbdata::{Indicators, Options, DateSpec};
//! let client = Indicators::new()?;
//! let (data, info) = client.get_country_indicators(
//!     &["SP.POP.TOTL"],
//!     &["USA", "GBR"],
//!     &Options::new().date(DateSpec::Range { start: 2010, end: 2020 }),
//! )?;
//! println!("{:?}", data["SP.POP.TOTL"]["US"]);
//! # Ok::<(), wbdata::Error>(())
//! ```
use crate::countries::{CodeConverter, IsoCodes};
use crate::error::{Error, Result};
use crate::fetch::{DefaultFetcher, Fetch, default_fetcher};
use crate::matching::match_data;
use crate::models::{DataMapping, EntityMapping, Entry, InfoMapping, Meta, Named};
use crate::options::Options;
use crate::url::{build_url, enc_join};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Page listing the indicators featured on the World Bank data site.
pub const COMMON_INDICATORS_URL: &str = "https://data.worldbank.org/indicator/all";

// Safety cap to avoid pathological jobs
const MAX_PAGES: u32 = 1000;

static INDICATOR_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://data\.worldbank\.org/indicator/([A-Za-z0-9.]+)">"#)
        .unwrap_or_else(|_| unreachable!())
});

pub struct Indicators<F = DefaultFetcher> {
    pub base_url: String,
    fetcher: F,
    codes: Box<dyn CodeConverter + Send + Sync>,
}

impl Indicators {
    /// Client over HTTP with the default one-day disk cache.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(default_fetcher()?))
    }
}

impl<F: Fetch> Indicators<F> {
    /// Client over any [`Fetch`] implementation, e.g. a closure serving canned JSON.
    pub fn with_fetcher(fetcher: F) -> Self {
        Self {
            base_url: "https://api.worldbank.org/v2/".into(),
            fetcher,
            codes: Box::new(IsoCodes),
        }
    }

    /// Replace the built-in ISO table used to normalise country codes.
    pub fn with_code_converter(mut self, codes: impl CodeConverter + Send + Sync + 'static) -> Self {
        self.codes = Box::new(codes);
        self
    }

    /// Fetch indicator values for countries.
    ///
    /// - `indicator_codes`: e.g. `"SP.POP.TOTL"`; one request (plus paging) per code.
    /// - `country_codes`: alpha-2 or alpha-3 codes; empty means all countries.
    /// - `options`: language, date, mrv, gapfill, frequency, ...
    ///
    /// ### Returns
    /// The data as `indicator id > country id > date > value`, and the display names
    /// of every indicator and country seen. When a (indicator, country, date) triple
    /// repeats, the first value is kept.
    pub fn get_country_indicators(
        &self,
        indicator_codes: &[&str],
        country_codes: &[&str],
        options: &Options,
    ) -> Result<(DataMapping, InfoMapping)> {
        let country_string = if country_codes.is_empty() {
            "all".to_string()
        } else {
            let alpha3: Vec<String> = country_codes
                .iter()
                .map(|c| self.codes.to_alpha3(c))
                .collect();
            enc_join(alpha3.iter().map(String::as_str))
        };

        let mut records = Vec::new();
        for indicator in indicator_codes {
            let fragment = format!(
                "countries/{}/indicators/{}?",
                country_string,
                enc_join([*indicator])
            );
            let url = build_url(&self.base_url, &fragment, options)?;
            records.extend(self.fetch_pages(&url)?);
        }

        let mut data = DataMapping::new();
        let mut info = InfoMapping::default();
        for record in records {
            let entry: Entry = serde_json::from_value(record)
                .map_err(|e| Error::malformed(&self.base_url, format!("dataset point: {}", e)))?;
            data.entry(entry.indicator.id.clone())
                .or_default()
                .entry(entry.country.id.clone())
                .or_default()
                .entry(entry.date)
                .or_insert(entry.value);
            info.indicators
                .entry(entry.indicator.id)
                .or_insert(Named {
                    value: entry.indicator.value,
                });
            info.countries.entry(entry.country.id).or_insert(Named {
                value: entry.country.value,
            });
        }
        Ok((data, info))
    }

    /// Indicator codes and descriptions, keyed by id.
    ///
    /// With no codes, all indicators are listed (several thousand). `common_only`
    /// keeps just the indicators featured on the data.worldbank.org indicator page,
    /// which are the ones with wide country coverage. Use `options` for language,
    /// source or topic.
    pub fn get_indicators(
        &self,
        indicator_codes: &[&str],
        filter: Option<&str>,
        common_only: bool,
        options: &Options,
    ) -> Result<EntityMapping> {
        let results = self.fetch_entities(indicator_codes, "indicator", "id", filter, options)?;
        if !common_only {
            return Ok(results);
        }

        let page = self
            .fetcher
            .fetch(COMMON_INDICATORS_URL)
            .map_err(|e| Error::Transport {
                url: COMMON_INDICATORS_URL.to_string(),
                source: e.into(),
            })?;
        let common = common_indicator_codes(&page);
        log::debug!("{} common indicator codes found", common.len());
        Ok(results
            .into_iter()
            .filter(|(_, v)| {
                let text = v.to_string().to_lowercase();
                common.iter().any(|code| text.contains(code.as_str()))
            })
            .collect())
    }

    /// Country records (ISO codes, capital, region, income level, coordinates, ...),
    /// keyed by alpha-2 code. Use `options` for language, incomeLevel, lendingType
    /// or region.
    pub fn get_countries(
        &self,
        country_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        let alpha3: Vec<String> = country_codes
            .iter()
            .map(|c| self.codes.to_alpha3(c))
            .collect();
        let ids: Vec<&str> = alpha3.iter().map(String::as_str).collect();
        self.fetch_entities(&ids, "country", "iso2Code", filter, options)
    }

    /// Income level categories, keyed by 3-letter id.
    pub fn get_income_levels(
        &self,
        income_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        self.fetch_entities(income_codes, "incomelevel", "id", filter, options)
    }

    /// Lending type categories, keyed by id.
    pub fn get_lending_types(
        &self,
        lending_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        self.fetch_entities(lending_codes, "lendingtype", "id", filter, options)
    }

    /// Regions and aggregates, keyed by region code.
    pub fn get_regions(
        &self,
        region_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        self.fetch_entities(region_codes, "region", "code", filter, options)
    }

    /// Topics (Health, Private Sector, ...), keyed by id. A topic id can be passed
    /// as `Options::topic` to [`Indicators::get_indicators`].
    pub fn get_topics(
        &self,
        topic_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        self.fetch_entities(topic_codes, "topic", "id", filter, options)
    }

    /// Data sources, keyed by id. A source id can be passed as `Options::source`
    /// to [`Indicators::get_indicators`].
    pub fn get_sources(
        &self,
        source_codes: &[&str],
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        self.fetch_entities(source_codes, "source", "id", filter, options)
    }

    /// Fetch a metadata collection and key its records by `response_key`.
    ///
    /// `ids` narrow the request to `rest_url/{id;id;...}`. When an id repeats
    /// across pages, the first record wins.
    pub fn fetch_entities(
        &self,
        ids: &[&str],
        rest_url: &str,
        response_key: &str,
        filter: Option<&str>,
        options: &Options,
    ) -> Result<EntityMapping> {
        let fragment = if ids.is_empty() {
            format!("{}?", rest_url)
        } else {
            format!("{}/{}?", rest_url, enc_join(ids.iter().copied()))
        };
        let url = build_url(&self.base_url, &fragment, options)?;

        let mut results = EntityMapping::new();
        for record in self.fetch_pages(&url)? {
            let key = match record.get(response_key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(Error::malformed(
                        &url,
                        format!("record without `{}`: {}", response_key, record),
                    ));
                }
            };
            results.entry(key).or_insert(record);
        }

        Ok(match filter {
            Some(needle) => match_data(needle, &results),
            None => results,
        })
    }

    /// Fetch `url` and every following page, returning the concatenated content
    /// arrays in page order.
    ///
    /// ### Errors
    /// - [`Error::Transport`] / [`Error::Json`] for fetch and decode failures
    /// - [`Error::Api`] when the API returns its error payload
    /// - [`Error::MalformedResponse`] when a page is not a `[header, content]` pair
    pub fn fetch_pages(&self, url: &str) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut page_url = url.to_string();
        let mut fetched = 0u32;
        loop {
            fetched += 1;
            if fetched > MAX_PAGES {
                return Err(Error::malformed(
                    url,
                    format!("page limit exceeded ({})", MAX_PAGES),
                ));
            }

            let v = self.fetch_json(&page_url)?;
            let (meta, content) = split_envelope(&page_url, v)?;
            log::debug!(
                "page {}/{} of {}: {} records",
                meta.page,
                meta.pages,
                url,
                content.len()
            );
            out.extend(content);

            if meta.page >= meta.pages {
                break;
            }
            page_url = format!("{}&page={}", url, meta.page + 1);
        }
        Ok(out)
    }

    fn fetch_json(&self, url: &str) -> Result<Value> {
        log::debug!("fetching {}", url);
        let body = self.fetcher.fetch(url).map_err(|e| Error::Transport {
            url: url.to_string(),
            source: e.into(),
        })?;
        serde_json::from_str(&body).map_err(|source| Error::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Split one page into its header and records.
fn split_envelope(url: &str, v: Value) -> Result<(Meta, Vec<Value>)> {
    // The API returns [Meta, [Entry, ...]], or a "message" object in position 0 on error.
    let Value::Array(mut arr) = v else {
        return Err(Error::malformed(url, "not a top-level array"));
    };
    if let Some(message) = arr.first().and_then(|h| h.get("message")) {
        return Err(Error::Api {
            url: url.to_string(),
            message: message.to_string(),
        });
    }
    if arr.len() != 2 {
        return Err(Error::malformed(
            url,
            format!("expected [header, content], got {} elements", arr.len()),
        ));
    }

    let content = arr.pop().unwrap_or(Value::Null);
    let header = arr.pop().unwrap_or(Value::Null);
    let meta: Meta = serde_json::from_value(header)
        .map_err(|e| Error::malformed(url, format!("page header: {}", e)))?;
    let records = match content {
        Value::Array(records) => records,
        // Empty result sets come back as `null`.
        Value::Null => Vec::new(),
        other => {
            return Err(Error::malformed(
                url,
                format!("content is not an array: {}", other),
            ));
        }
    };
    Ok((meta, records))
}

/// Lower-cased indicator codes linked from the data site's indicator listing.
fn common_indicator_codes(page: &str) -> Vec<String> {
    let mut codes: Vec<String> = INDICATOR_LINK
        .captures_iter(page)
        .map(|c| c[1].to_lowercase())
        .collect();
    codes.sort();
    codes.dedup();
    codes
}
