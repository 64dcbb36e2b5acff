use std::{fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer};

lazy_static! {
    static ref HTTP_URL: Regex = Regex::new(r"^https?://[^\s/?#]+[^\s]*$").unwrap();
}

pub fn is_http_url(raw: &str) -> bool {
    HTTP_URL.is_match(raw)
}

/// Length in characters, not bytes, within `min..=max`.
pub fn char_len_between(raw: &str, min: usize, max: usize) -> bool {
    let n = raw.chars().count();
    (min..=max).contains(&n)
}

/// Optional query-string value where a blank entry (`?minPrice=`) counts as absent.
pub fn blank_as_none<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(d)? {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map(Some).map_err(de::Error::custom),
        _ => Ok(None),
    }
}
