// Datasource resource: uid + resource version metadata around the datasource settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceAccess {
    #[default]
    Proxy,
    Direct,
}

impl DataSourceAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceAccess::Proxy => "proxy",
            DataSourceAccess::Direct => "direct",
        }
    }

    /// Parse a stored access mode; anything unrecognized is treated as proxy.
    pub fn from_db(s: &str) -> Self {
        match s {
            "direct" => DataSourceAccess::Direct,
            _ => DataSourceAccess::Proxy,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub access: DataSourceAccess,
    pub url: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub basic_auth: bool,
    #[serde(default)]
    pub basic_auth_user: String,
    #[serde(default)]
    pub basic_auth_password: String,
    #[serde(default)]
    pub with_credentials: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub json_data: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub uid: String,
    /// Stored version as a string; must be echoed back unchanged on update.
    #[serde(default)]
    pub resource_version: String,
    pub spec: DataSourceSpec,
}
