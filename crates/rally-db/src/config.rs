//! Connection settings for the rally database.
//!
//! URL resolution (flag, environment, config file) happens in the CLI; this
//! type only interprets an already chosen URL.

use std::fmt;

/// Database configuration: a single PostgreSQL connection URL.
#[derive(Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, possibly carrying a password.
    pub database_url: String,
}

impl DbConfig {
    /// The URL used when nothing else is configured.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/rally";

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// The URL with any password replaced by `***`, for logs and errors.
    pub fn redacted_url(&self) -> String {
        let url = &self.database_url;
        let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
            return url.clone();
        };
        let authority_end = url[scheme_end..]
            .find(['/', '?'])
            .map_or(url.len(), |i| scheme_end + i);
        let authority = &url[scheme_end..authority_end];
        let Some(at) = authority.rfind('@') else {
            return url.clone();
        };
        match authority[..at].split_once(':') {
            Some((user, _password)) => format!(
                "{}{user}:***{}",
                &url[..scheme_end],
                &url[scheme_end + at..]
            ),
            None => url.clone(),
        }
    }

    /// Name of the target database, if the URL has one that `rally db-init`
    /// can create: ASCII letters, digits and underscores only.
    pub fn database_name(&self) -> Option<&str> {
        let (_, path) = self.authority_and_path()?;
        let valid = !path.is_empty()
            && path.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        valid.then_some(path)
    }

    /// URL of the `postgres` maintenance database on the same server, keeping
    /// credentials and query parameters such as `sslmode`.
    pub fn maintenance_url(&self) -> String {
        let base = match self.authority_and_path() {
            Some((authority, _)) => authority,
            None => self.split_query().0,
        };
        match self.split_query().1 {
            Some(q) => format!("{base}/postgres?{q}"),
            None => format!("{base}/postgres"),
        }
    }

    /// `scheme://user:pw@host:port` and the path after it, without the query.
    fn authority_and_path(&self) -> Option<(&str, &str)> {
        let (url, _) = self.split_query();
        let host_start = url.find("://")? + 3;
        let slash = host_start + url[host_start..].find('/')?;
        Some((&url[..slash], &url[slash + 1..]))
    }

    fn split_query(&self) -> (&str, Option<&str>) {
        match self.database_url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.database_url.as_str(), None),
        }
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("database_url", &self.redacted_url())
            .finish()
    }
}
