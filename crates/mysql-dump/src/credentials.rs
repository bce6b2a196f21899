//! Per-environment database connection settings.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

/// Database name plus optional connection credentials for one environment.
///
/// Every present field is rendered as a single-quoted command-line flag.
/// Values are not escaped, so they must not contain single quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database (schema) name
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    /// Unix socket path
    #[serde(default)]
    pub socket: Option<String>,

    /// Port, accepted as an integer or a string
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<String>,
}

impl DatabaseConfig {
    /// Create a config naming only the database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Credential fields in flag order, paired with their flag.
    fn flags(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("-u", self.username.as_deref()),
            ("-p", self.password.as_deref()),
            ("-h", self.host.as_deref()),
            ("-S", self.socket.as_deref()),
            ("-P", self.port.as_deref()),
        ]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<PortValue>::deserialize(deserializer)?.map(|port| match port {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s,
        }),
    )
}

/// Render `-u'…' -p'…' -h'…' -S'…' -P'…'` for the fields that are set.
///
/// Empty strings count as absent, so no empty flag is ever emitted.
pub fn credential_params(config: &DatabaseConfig) -> String {
    config
        .flags()
        .into_iter()
        .filter_map(|(flag, value)| match value {
            Some(v) if !v.is_empty() => Some(format!("{flag}'{v}'")),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prefix a bare table name with `database`; `db.table` passes through.
pub fn qualify_table<'a>(table: &'a str, database: &str) -> Cow<'a, str> {
    if table.contains('.') {
        Cow::Borrowed(table)
    } else {
        Cow::Owned(format!("{database}.{table}"))
    }
}
