mod common;

use common::{one_page, serve};
use std::cell::RefCell;
use std::collections::BTreeMap;
use wbdata::models::Named;
use wbdata::{DataMapping, DateSpec, Error, Indicators, Options};

const POPULATION: &str = r#"[
  {"indicator":{"id":"SP.POP.TOTL","value":"Population, total"},
   "country":{"id":"US","value":"United States"},
   "countryiso3code":"USA","date":"2020","value":331000000,
   "unit":"","obs_status":"","decimal":0},
  {"indicator":{"id":"SP.POP.TOTL","value":"Population, total"},
   "country":{"id":"GB","value":"United Kingdom"},
   "countryiso3code":"GBR","date":"2020","value":67000000,
   "unit":"","obs_status":"","decimal":0}
]"#;

#[test]
fn population_for_two_countries() {
    let body = one_page(POPULATION);
    let routes = [("", body.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let (data, info) = client
        .get_country_indicators(&["SP.POP.TOTL"], &["USA", "GBR"], &Options::new())
        .unwrap();

    let mut expected = DataMapping::new();
    let by_country = expected.entry("SP.POP.TOTL".to_string()).or_default();
    by_country.insert(
        "US".to_string(),
        BTreeMap::from([("2020".to_string(), Some(331_000_000.0))]),
    );
    by_country.insert(
        "GB".to_string(),
        BTreeMap::from([("2020".to_string(), Some(67_000_000.0))]),
    );
    assert_eq!(data, expected);

    assert_eq!(
        info.indicators["SP.POP.TOTL"],
        Named {
            value: "Population, total".into()
        }
    );
    assert_eq!(info.countries["GB"].value, "United Kingdom");
    assert_eq!(info.countries.len(), 2);

    assert_eq!(
        *requested.borrow(),
        ["https://api.worldbank.org/v2/countries/USA;GBR/indicators/SP.POP.TOTL?format=json&per_page=10000&mrv=1"]
    );
}

#[test]
fn alpha2_inputs_are_sent_as_alpha3() {
    let body = one_page(POPULATION);
    let routes = [("", body.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    client
        .get_country_indicators(&["SP.POP.TOTL"], &["us", "gb", "EUU"], &Options::new())
        .unwrap();
    assert!(requested.borrow()[0].contains("/countries/USA;GBR;EUU/indicators/"));
}

#[test]
fn no_countries_means_all() {
    let body = one_page("[]");
    let routes = [("", body.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let (data, info) = client
        .get_country_indicators(&["SP.POP.TOTL"], &[], &Options::new())
        .unwrap();
    assert!(data.is_empty());
    assert!(info.indicators.is_empty());
    assert!(requested.borrow()[0].contains("/countries/all/indicators/SP.POP.TOTL?"));
}

#[test]
fn one_request_per_indicator_merged() {
    let gdp = one_page(
        r#"[{"indicator":{"id":"NY.GDP.MKTP.CD","value":"GDP (current US$)"},
             "country":{"id":"US","value":"United States"},
             "date":"2019","value":2.14e13}]"#,
    );
    let pop = one_page(POPULATION);
    let routes = [("NY.GDP.MKTP.CD", gdp.as_str()), ("SP.POP.TOTL", pop.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let (data, info) = client
        .get_country_indicators(
            &["SP.POP.TOTL", "NY.GDP.MKTP.CD"],
            &["USA"],
            &Options::new().date(DateSpec::Range {
                start: 2019,
                end: 2020,
            }),
        )
        .unwrap();

    assert_eq!(requested.borrow().len(), 2);
    assert!(requested.borrow().iter().all(|u| u.contains("date=2019:2020")));
    assert_eq!(data.len(), 2);
    assert_eq!(data["NY.GDP.MKTP.CD"]["US"]["2019"], Some(2.14e13));
    assert_eq!(info.indicators.len(), 2);
}

#[test]
fn repeated_points_keep_the_first_value_and_nulls_survive() {
    let body = one_page(
        r#"[{"indicator":{"id":"X","value":"X name"},"country":{"id":"FR","value":"France"},"date":"2001","value":1.0},
            {"indicator":{"id":"X","value":"other name"},"country":{"id":"FR","value":"Francia"},"date":"2001","value":2.0},
            {"indicator":{"id":"X","value":"X name"},"country":{"id":"FR","value":"France"},"date":"2002","value":null}]"#,
    );
    let routes = [("", body.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let (data, info) = client
        .get_country_indicators(&["X"], &["FR"], &Options::new().mrv(2))
        .unwrap();
    assert_eq!(data["X"]["FR"]["2001"], Some(1.0));
    assert_eq!(data["X"]["FR"]["2002"], None);
    assert_eq!(info.indicators["X"].value, "X name");
    assert_eq!(info.countries["FR"].value, "France");
}

#[test]
fn conflicting_options_fail_before_any_request() {
    let routes: [(&str, &str); 0] = [];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let err = client
        .get_country_indicators(&["X"], &[], &Options::new().topic(1).source(2))
        .unwrap_err();
    assert!(matches!(err, Error::ConfigurationConflict { .. }));
    assert!(requested.borrow().is_empty());
}

#[test]
fn point_without_country_is_malformed() {
    let body = one_page(r#"[{"indicator":{"id":"X","value":"X"},"date":"2001","value":1.0}]"#);
    let routes = [("", body.as_str())];
    let requested = RefCell::new(Vec::new());
    let client = Indicators::with_fetcher(serve(&routes, &requested));

    let err = client
        .get_country_indicators(&["X"], &["FR"], &Options::new())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { .. }));
}
