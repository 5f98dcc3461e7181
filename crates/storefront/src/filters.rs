//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use crate::api::parse_timestamp;

/// Shown where the shop API has no image for a product or banner.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats a shop API timestamp as `dd/mm/yyyy HH:MM`.
///
/// Values that do not parse are shown as received.
///
/// Usage in templates: `{{ created_at|datetime }}`
#[askama::filter_fn]
pub fn datetime(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_date(&value.to_string()))
}

/// Substitutes the placeholder for an empty image URL.
///
/// Usage in templates: `{{ line.image|image_or_placeholder }}`
#[askama::filter_fn]
pub fn image_or_placeholder(
    value: impl Display,
    _env: &dyn askama::Values,
) -> askama::Result<String> {
    let url = value.to_string();
    Ok(if url.trim().is_empty() {
        PLACEHOLDER_IMAGE.to_string()
    } else {
        url
    })
}

fn format_date(raw: &str) -> String {
    parse_timestamp(raw).map_or_else(
        || raw.to_string(),
        |dt| dt.format("%d/%m/%Y %H:%M").to_string(),
    )
}
