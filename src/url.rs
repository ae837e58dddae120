//! Request URL construction for the Indicators API.
use crate::error::{Error, Result};
use crate::options::{FIXED_OPTIONS, Options};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Percent-encode each code and join with `;`, the API's list separator.
pub fn enc_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(|s| percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Build a fully-qualified Indicators API URL.
///
/// `fragment` is the endpoint path relative to the API root, e.g. `"indicator"` or
/// `"countries/USA;GBR/indicators/SP.POP.TOTL"`; a trailing `?` is added if missing.
///
/// - `source`/`topic` are prepended as `source/<id>/` or `topic/<id>/` and
///   `language` as `<lang>/` outside of that.
/// - `format=json` and `per_page=10000` are always sent.
/// - Without `date` or `mrv`, `mrv=1` is sent (most recent value only).
/// - Remaining options follow in name order.
///
/// ### Errors
/// [`Error::ConfigurationConflict`] when both `topic` and `source` are set.
///
/// ### Example
/// ```
/// use wbdata::Options;
/// use wbdata::url::build_url;
///
/// let url = build_url(
///     "https://api.worldbank.org/v2/",
///     "indicator?",
///     &Options::new().language("fr").topic(5),
/// )?;
/// assert_eq!(
///     url,
///     "https://api.worldbank.org/v2/fr/topic/5/indicator?format=json&per_page=10000&mrv=1"
/// );
/// # Ok::<(), wbdata::Error>(())
/// ```
pub fn build_url(base_url: &str, fragment: &str, options: &Options) -> Result<String> {
    if options.get_topic().is_some() && options.get_source().is_some() {
        return Err(Error::ConfigurationConflict {
            first: "topic",
            second: "source",
        });
    }

    let mut path = fragment.trim_start_matches('/').to_string();
    if !path.ends_with('?') {
        path.push('?');
    }
    if let Some(source) = options.get_source() {
        path = format!("source/{}/{}", source, path);
    }
    if let Some(topic) = options.get_topic() {
        path = format!("topic/{}/{}", topic, path);
    }
    // Language goes last so it ends up at the front.
    if let Some(language) = options.get_language() {
        path = format!("{}/{}", language, path);
    }

    let mut query: Vec<String> = FIXED_OPTIONS
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    if let Some(date) = options.get_date() {
        query.push(format!("date={}", date.to_query_param()));
    }
    match options.get_mrv() {
        Some(mrv) => query.push(format!("mrv={}", mrv)),
        None if options.get_date().is_none() => query.push("mrv=1".to_string()),
        None => {}
    }
    for (k, v) in options.extra() {
        query.push(format!("{}={}", k, v.to_query_value()));
    }

    Ok(format!(
        "{}/{}{}",
        base_url.trim_end_matches('/'),
        path,
        query.join("&")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enc_join_escapes_unsafe_characters() {
        assert_eq!(enc_join(["USA", " GBR "]), "USA;GBR");
        assert_eq!(enc_join(["SP.POP.TOTL", "a b"]), "SP.POP.TOTL;a%20b");
    }

    #[test]
    fn leading_slash_in_fragment_is_ignored() {
        let url = build_url("http://x/", "/region", &Options::new()).unwrap();
        assert_eq!(url, "http://x/region?format=json&per_page=10000&mrv=1");
    }
}
