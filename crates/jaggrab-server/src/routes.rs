//! Request keyword routing.
//!
//! Clients name what they want with a keyword after `JAGGRAB /`, optionally
//! followed by a suffix the server ignores (`crc12345` asks for `crc`). The
//! route table maps each keyword to a cache file or to the CRC table.
//!
//! Tables can be loaded from JSON:
//!
//! ```json
//! {
//!     "title": { "kind": "file", "archive": 0, "file": 1 },
//!     "crc": { "kind": "checksums" }
//! }
//! ```

use crate::error::RouteError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// What a keyword resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    /// A single cache file
    File {
        /// Archive (index store) number
        archive: u32,
        /// File id within the archive
        file: u32,
    },
    /// The CRC reference table
    Checksums,
}

/// Keyword to route mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        let files = [
            "title",
            "config",
            "interface",
            "media",
            "versionlist",
            "textures",
            "wordenc",
            "sounds",
        ];

        let mut routes: BTreeMap<String, Route> = files
            .iter()
            .zip(1..)
            .map(|(keyword, file)| ((*keyword).to_string(), Route::File { archive: 0, file }))
            .collect();
        routes.insert("crc".to_string(), Route::Checksums);

        Self { routes }
    }
}

impl RouteTable {
    /// Build a table from keyword and route pairs.
    ///
    /// # Errors
    ///
    /// Returns `RouteError` if a keyword is empty or there are no routes.
    pub fn new<K: Into<String>>(
        routes: impl IntoIterator<Item = (K, Route)>,
    ) -> Result<Self, RouteError> {
        let routes: BTreeMap<String, Route> =
            routes.into_iter().map(|(k, r)| (k.into(), r)).collect();

        if routes.is_empty() {
            return Err(RouteError::Empty);
        }
        if routes.keys().any(String::is_empty) {
            return Err(RouteError::EmptyKeyword);
        }

        Ok(Self { routes })
    }

    /// Parse a table from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, RouteError> {
        let routes: BTreeMap<String, Route> = serde_json::from_str(json)?;
        Self::new(routes)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, RouteError> {
        let json = std::fs::read_to_string(path).map_err(|source| RouteError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Resolve a request path to the route of the longest keyword it starts with.
    pub fn resolve(&self, path: &str) -> Option<Route> {
        self.routes
            .iter()
            .filter(|(keyword, _)| path.starts_with(keyword.as_str()))
            .max_by_key(|(keyword, _)| keyword.len())
            .map(|(_, route)| *route)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over keywords and routes in keyword order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Route)> {
        self.routes.iter().map(|(k, r)| (k.as_str(), *r))
    }
}
