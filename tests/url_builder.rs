use wbdata::url::build_url;
use wbdata::{DateSpec, Error, Options};

const BASE: &str = "https://api.worldbank.org/v2/";

#[test]
fn topic_and_source_cannot_be_combined() {
    let opts = Options::new().topic(5).source(2);
    let err = build_url(BASE, "indicator?", &opts).unwrap_err();
    assert!(matches!(err, Error::ConfigurationConflict { .. }));

    // Same when both arrive through the generic setter.
    let opts = Options::new().set("Topic", 1).set("SOURCE", "11");
    assert!(matches!(
        build_url(BASE, "indicator", &opts),
        Err(Error::ConfigurationConflict { .. })
    ));
}

#[test]
fn format_and_per_page_are_fixed() {
    let opts = Options::new()
        .set("format", "xml")
        .set("per_page", 50)
        .set("Per_Page", "7");
    let url = build_url(BASE, "topic?", &opts).unwrap();
    assert!(url.contains("format=json"));
    assert!(url.contains("per_page=10000"));
    assert!(!url.contains("xml"));
    assert!(!url.contains("per_page=50"));
    assert!(!url.contains("per_page=7"));
}

#[test]
fn language_is_outermost_then_topic_then_fragment() {
    let opts = Options::new().language("fr").topic(5);
    let url = build_url(BASE, "indicator?", &opts).unwrap();
    assert!(
        url.starts_with("https://api.worldbank.org/v2/fr/topic/5/indicator?"),
        "{}",
        url
    );
}

#[test]
fn source_goes_into_the_path() {
    let opts = Options::new().source(2);
    let url = build_url(BASE, "indicator", &opts).unwrap();
    assert_eq!(
        url,
        "https://api.worldbank.org/v2/source/2/indicator?format=json&per_page=10000&mrv=1"
    );
}

#[test]
fn most_recent_value_is_the_default() {
    let url = build_url(BASE, "region?", &Options::new()).unwrap();
    assert!(url.contains("mrv=1"));

    let url = build_url(BASE, "region?", &Options::new().date(DateSpec::Year(2010))).unwrap();
    assert!(url.contains("date=2010"));
    assert!(!url.contains("mrv"));

    let url = build_url(BASE, "region?", &Options::new().mrv(3)).unwrap();
    assert!(url.contains("mrv=3"));
    assert!(!url.contains("mrv=1"));
}

#[test]
fn page_is_never_forwarded() {
    let url = build_url(BASE, "country?", &Options::new().set("PAGE", 4)).unwrap();
    assert!(!url.contains("page="));
}

#[test]
fn option_names_are_case_insensitive() {
    let opts = Options::new().set("LANGUAGE", "es").set("IncomeLevel", "LIC");
    let url = build_url(BASE, "country?", &opts).unwrap();
    assert!(url.starts_with("https://api.worldbank.org/v2/es/country?"));
    assert!(url.contains("&incomelevel=LIC"));
}

#[test]
fn query_string_is_deterministic() {
    let opts = Options::new()
        .set("gapfill", "Y")
        .set("frequency", "Q")
        .set("region", &["EAS", "SAS"][..])
        .date(DateSpec::Range {
            start: 2000,
            end: 2010,
        });
    let url = build_url(BASE, "countries/all/indicators/SP.POP.TOTL?", &opts).unwrap();
    assert_eq!(
        url,
        "https://api.worldbank.org/v2/countries/all/indicators/SP.POP.TOTL?\
         format=json&per_page=10000&date=2000:2010&frequency=Q&gapfill=Y&region=EAS;SAS"
    );
    assert_eq!(
        build_url(BASE, "countries/all/indicators/SP.POP.TOTL?", &opts).unwrap(),
        url
    );
}

#[test]
fn numeric_values_are_stringified() {
    let opts = Options::new().set("mrnev", 2).set("scale", 1.5);
    let url = build_url(BASE, "x", &opts).unwrap();
    assert!(url.ends_with("&mrnev=2&scale=1.5"), "{}", url);
}
