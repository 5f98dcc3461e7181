//! Cookie helpers for state kept in the visitor's browser.
//!
//! Both the `auth_data` session and the `aether_cart` cart are stored as
//! base64url JSON blobs (see [`aether_core::decode`]), so their values are
//! always plain ASCII.

use axum::http::{
    HeaderMap, HeaderName, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};
use tracing::warn;

/// Value of the cookie called `name`, if the request carries a non-empty one.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Site-wide, script-inaccessible cookie kept for `max_age`.
#[must_use]
pub fn persistent_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(max_age)
        .same_site(SameSite::Lax)
        .secure(secure)
        .http_only(true)
        .build()
}

/// Cookie that deletes the cookie called `name`.
#[must_use]
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path("/")
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

/// `Set-Cookie` header for a cookie.
///
/// Conversion only fails for non-ASCII values, which the blobs never
/// contain; such a cookie is logged and dropped.
#[must_use]
pub fn set_cookie_header(cookie: &Cookie<'_>) -> Option<(HeaderName, HeaderValue)> {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => Some((SET_COOKIE, value)),
        Err(e) => {
            warn!(error = %e, "Dropping unencodable cookie");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie_by_name() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("aether_session=abc; aether_cart=xyz; auth_data="),
        );
        assert_eq!(read_cookie(&headers, "aether_cart").as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "auth_data"), None);
        assert_eq!(read_cookie(&headers, "theme"), None);
    }

    #[test]
    fn test_set_cookie_header_drops_non_ascii() {
        let cookie = persistent_cookie("aether_cart", "đèn".to_string(), Duration::days(1), false);
        assert!(set_cookie_header(&cookie).is_none());

        let cookie = persistent_cookie("aether_cart", "abc".to_string(), Duration::days(1), false);
        let (name, value) = set_cookie_header(&cookie).unwrap();
        assert_eq!(name, SET_COOKIE);
        assert!(value.to_str().unwrap().contains("HttpOnly"));
    }
}
