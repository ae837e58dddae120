//! wbdata
//!
//! A small Rust client for the World Bank **Indicators** and **Climate Data** APIs.
//! Paginated and multi-request responses are merged into nested maps keyed by
//! indicator code, ISO alpha-2 country code and date/period.
//!
//! ### Features
//! - Indicator values per country: `indicator > country > date > value`
//! - Metadata lookups: indicators, countries, income levels, lending types,
//!   regions, topics, sources
//! - Historical (instrumental) and modelled climate series for countries and basins
//! - Substring filtering (`match_data`) and code listings (`format_codes`)
//! - Pluggable transport: HTTP with a one-day disk cache by default, or any
//!   `Fn(&str) -> anyhow::Result<String>`
//!
//! ### Example
//! ```no_run
//! use wbdata::{Indicators, Options};
//!
//! let client = Indicators::new()?;
//! let topics = client.get_topics(&[], None, &Options::new())?;
//! wbdata::print_codes(&topics, Some("health"));
//!
//! let (data, info) = client.get_country_indicators(
//!     &["SP.POP.TOTL"],
//!     &["USA", "GBR"],
//!     &Options::new().mrv(5),
//! )?;
//! println!("{:#?}", data);
//! print!("{}", wbdata::format_info(&info, None));
//! # Ok::<(), wbdata::Error>(())
//! ```

pub mod climate;
pub mod countries;
pub mod error;
pub mod fetch;
pub mod indicators;
pub mod matching;
pub mod models;
pub mod options;
pub mod url;

pub use climate::{Climate, ClimateVariable, Interval, Location, Model};
pub use countries::{CodeConverter, IsoCodes};
pub use error::{Error, Result};
pub use fetch::{CachedFetcher, DefaultFetcher, Fetch, HttpFetcher};
pub use indicators::Indicators;
pub use matching::{format_codes, format_info, match_data, print_codes};
pub use models::{
    DataMapping, EntityMapping, InfoMapping, InstrumentalMapping, ModelKey, ModelledMapping,
    ModelledValue, TimeKey,
};
pub use options::{DateSpec, OptionValue, Options};
