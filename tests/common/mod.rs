#![allow(dead_code)]

use std::cell::RefCell;

/// A fetcher that serves canned bodies and records every URL it is asked for.
///
/// Routes are `(needle, body)` pairs; the first route whose needle occurs in the
/// URL wins, so put specific needles before catch-alls (`""`).
pub fn serve<'a>(
    routes: &'a [(&'a str, &'a str)],
    requested: &'a RefCell<Vec<String>>,
) -> impl Fn(&str) -> anyhow::Result<String> + 'a {
    move |url: &str| {
        requested.borrow_mut().push(url.to_string());
        routes
            .iter()
            .find(|(needle, _)| url.contains(needle))
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| anyhow::anyhow!("no canned response for {}", url))
    }
}

/// Wrap records in a single-page `[header, content]` envelope.
pub fn one_page(records: &str) -> String {
    format!(
        r#"[{{"page":1,"pages":1,"per_page":"10000","total":0}},{}]"#,
        records
    )
}
