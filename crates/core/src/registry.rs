use indexmap::IndexMap;
use secrecy::SecretString;

use crate::config::{is_postgres_url, ConfigError};

/// Explicit name -> connection URI mapping handed to whoever needs to pick a
/// database. Names are stored lowercased and looked up case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct DatabaseRegistry {
    entries: IndexMap<String, SecretString>,
}

impl DatabaseRegistry {
    /// Expands `names` against a shared server URI, `<base_url>/<name>`.
    pub fn from_base<'a>(
        base_url: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ConfigError::Validation("registry.base_url must not be empty".to_string()));
        }

        let mut registry = Self::default();
        for name in names {
            registry.insert(name, &format!("{base_url}/{}", name.trim()))?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: &str, url: &str) -> Result<(), ConfigError> {
        let key = name.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(ConfigError::Validation(
                "registry database names must not be empty".to_string(),
            ));
        }
        if !is_postgres_url(url) {
            return Err(ConfigError::Validation(format!(
                "registry entry `{key}` must be a postgres URL"
            )));
        }

        self.entries.insert(key, SecretString::from(url.to_string()));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&SecretString, ConfigError> {
        let key = name.trim().to_ascii_lowercase();
        self.entries.get(&key).ok_or_else(|| ConfigError::UnknownDatabase {
            name: key,
            known: self.names().map(str::to_string).collect(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretString)> + '_ {
        self.entries.iter().map(|(name, url)| (name.as_str(), url))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Masks the password component of a connection URI for display.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return "<redacted>".to_string();
    };
    let (base, query) = match rest.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (rest, None),
    };

    let base = match base.rsplit_once('@') {
        Some((credentials, host)) => match credentials.split_once(':') {
            Some((user, _)) => format!("{user}:***@{host}"),
            None => format!("{credentials}@{host}"),
        },
        None => base.to_string(),
    };

    match query {
        Some(query) => format!("{scheme}://{base}?{}", redact_query(query)),
        None => format!("{scheme}://{base}"),
    }
}

/// Masks `password=` style parameters, including `sslpassword`.
fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.to_ascii_lowercase().ends_with("password") => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
