use std::fmt;

use async_trait::async_trait;
use wmgate_common::Browser;

pub(crate) const PSID: &str = "__Secure-1PSID";
pub(crate) const PSIDTS: &str = "__Secure-1PSIDTS";

/// The two session cookies that authenticate against the web backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub psid: String,
    pub psidts: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("psid", &"<redacted>")
            .field("psidts", &"<redacted>")
            .finish()
    }
}

/// Opaque credential source backed by an installed browser's cookie store.
#[async_trait]
pub trait CookieSource: Send + Sync {
    /// `Ok(None)` when the browser holds no session for the backend.
    async fn read(&self, browser: Browser) -> Result<Option<Credentials>, String>;
}

/// Source used when no browser integration is compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBrowserCookies;

#[async_trait]
impl CookieSource for NoBrowserCookies {
    async fn read(&self, browser: Browser) -> Result<Option<Credentials>, String> {
        Err(format!(
            "reading cookies from {browser:?} is not supported by this build"
        ))
    }
}

/// Insertion-ordered cookie jar serialized into a single `Cookie` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CookieJar {
    entries: Vec<(String, String)>,
}

impl CookieJar {
    pub(crate) fn from_credentials(credentials: &Credentials) -> Self {
        let mut jar = Self::default();
        jar.set(PSID, &credentials.psid);
        jar.set(PSIDTS, &credentials.psidts);
        jar
    }

    pub(crate) fn set(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Merges `Set-Cookie` header values. Only the leading `name=value` pair
    /// is used; rows with an empty name or value are ignored.
    pub(crate) fn merge_set_cookie<'a>(&mut self, rows: impl IntoIterator<Item = &'a str>) {
        for row in rows {
            let first = row.split(';').next().unwrap_or_default().trim();
            let Some((name, value)) = first.split_once('=') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if !name.is_empty() && !value.is_empty() {
                self.set(name, value);
            }
        }
    }

    pub(crate) fn header_value(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar() -> CookieJar {
        CookieJar::from_credentials(&Credentials {
            psid: "a".to_string(),
            psidts: "b".to_string(),
        })
    }

    #[test]
    fn header_keeps_insertion_order() {
        assert_eq!(jar().header_value(), "__Secure-1PSID=a; __Secure-1PSIDTS=b");
    }

    #[test]
    fn set_cookie_rows_are_merged() {
        let mut jar = jar();
        jar.merge_set_cookie([
            "NID=511; expires=Fri, 01-Jan-2027 00:00:00 GMT; path=/",
            "__Secure-1PSIDTS=rotated; Secure",
            "=orphan",
            "EMPTY=; path=/",
            "garbage",
        ]);
        assert_eq!(jar.get("NID"), Some("511"));
        assert_eq!(jar.get(PSIDTS), Some("rotated"));
        assert_eq!(jar.get("EMPTY"), None);
        assert_eq!(
            jar.header_value(),
            "__Secure-1PSID=a; __Secure-1PSIDTS=rotated; NID=511"
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credentials = Credentials {
            psid: "secret".to_string(),
            psidts: "secret".to_string(),
        };
        assert!(!format!("{credentials:?}").contains("secret"));
    }
}
