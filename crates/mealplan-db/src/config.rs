use std::env;

/// Database configuration.
///
/// Reads from the `MEALPLAN_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/mealplan` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/mealplan";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "MEALPLAN_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(head, _)| head);
        let (_, name) = without_query.split_once("://")?.1.split_once('/')?;
        Some(name).filter(|s| !s.is_empty())
    }

    /// Return a URL pointing at the `postgres` maintenance database on the
    /// same host, keeping any query parameters (e.g. `sslmode`). Used to
    /// issue `CREATE DATABASE` when the target DB does not yet exist.
    pub fn maintenance_url(&self) -> String {
        let (head, query) = match self.database_url.split_once('?') {
            Some((head, query)) => (head, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let authority_start = head.find("://").map_or(0, |i| i + 3);
        let base = match head[authority_start..].find('/') {
            Some(pos) => &head[..authority_start + pos],
            None => head,
        };

        let mut url = format!("{base}/postgres");
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
