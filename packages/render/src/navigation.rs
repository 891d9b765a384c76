//! In-memory navigation for one render.
//!
//! There is no browser history on the server: the history is the configured
//! list of entries and the current location is the last one.

use url::Url;

use crate::config::NavigationConfig;
use crate::error::{RenderError, Result};

/// A parsed location relative to the application's basename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// Parse `entry` (a path with optional query and fragment).
    pub fn parse(entry: &str) -> Result<Self> {
        let base = Url::parse("http://localhost/").map_err(|source| RenderError::Location {
            url: entry.to_string(),
            source,
        })?;
        let url = base.join(entry).map_err(|source| RenderError::Location {
            url: entry.to_string(),
            source,
        })?;
        Ok(Self {
            pathname: url.path().to_string(),
            search: url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
            hash: url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
        })
    }

    /// `pathname` + `search` + `hash`.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    /// Query parameters, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match Url::parse(&format!("http://localhost/{}", self.search)) {
            Ok(url) => url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// History entries plus the current location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    basename: String,
    entries: Vec<String>,
    location: Location,
}

impl Navigation {
    pub fn new(config: &NavigationConfig) -> Result<Self> {
        let basename = normalize_basename(&config.basename);
        let current = config
            .initial_entries
            .last()
            .map(String::as_str)
            .unwrap_or("/");
        let location = Location::parse(&strip_basename(&basename, current))?;
        Ok(Self {
            basename,
            entries: config.initial_entries.clone(),
            location,
        })
    }

    /// Normalized basename, always ending in `/`.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The current location, with the basename stripped.
    pub fn location(&self) -> &Location {
        &self.location
    }
}

fn normalize_basename(basename: &str) -> String {
    let trimmed = basename.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

fn strip_basename(basename: &str, entry: &str) -> String {
    let prefix = basename.trim_end_matches('/');
    if prefix.is_empty() {
        return entry.to_string();
    }
    match entry.strip_prefix(prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with(['/', '?', '#']) => {
            if rest.starts_with('/') {
                rest.to_string()
            } else {
                format!("/{}", rest)
            }
        }
        _ => entry.to_string(),
    }
}
