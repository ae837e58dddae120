//! Live API tests. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use wbdata::{Climate, DateSpec, Indicators, Interval, Model, Options};

#[test]
fn population_for_two_countries() {
    let client = Indicators::new().unwrap();
    let (data, info) = client
        .get_country_indicators(
            &["SP.POP.TOTL"],
            &["DE", "FRA"],
            &Options::new().date(DateSpec::Range {
                start: 2019,
                end: 2020,
            }),
        )
        .unwrap();
    let pop = &data["SP.POP.TOTL"];
    assert!(pop.contains_key("DE"));
    assert!(pop.contains_key("FR"));
    assert!(pop["DE"].contains_key("2019"));
    assert!(info.countries.contains_key("FR"));
}

#[test]
fn topics_and_regions() {
    let client = Indicators::new().unwrap();
    let topics = client.get_topics(&[], None, &Options::new()).unwrap();
    assert!(topics.len() > 10);
    let regions = client.get_regions(&["EAS"], None, &Options::new()).unwrap();
    assert!(regions.contains_key("EAS"));
}

#[test]
fn instrumental_temperature() {
    let climate = Climate::new().unwrap();
    let res = climate
        .get_temp_instrumental(&["GB"], Interval::Month)
        .unwrap();
    assert_eq!(res["GB"].len(), 12);
}

#[test]
fn modelled_ensemble_median() {
    let climate = Climate::new().unwrap();
    let res = climate
        .get_precip_modelled("aavg", &["GB"], &Model::Ensemble, Some("a2"), &[50])
        .unwrap();
    assert!(res.len() <= 1);
}
