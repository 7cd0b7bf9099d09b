// Row <-> resource mapping. The integer row version is exposed as the string resource_version.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::error::StoreError;
use crate::models::{DataSource, DataSourceAccess, DataSourceSpec};

pub(super) const SELECT_COLUMNS: &str = "uid, version, name, type, access, url, password, \
    database_name, user_name, basic_auth, basic_auth_user, basic_auth_password, \
    with_credentials, is_default, json_data";

pub(super) fn from_row(row: &SqliteRow) -> Result<DataSource, StoreError> {
    let version: i64 = row.try_get("version")?;
    let access: String = row.try_get("access")?;
    let json_data: String = row.try_get("json_data")?;
    let json_data = if json_data.is_empty() {
        serde_json::Map::new()
    } else {
        serde_json::from_str(&json_data)?
    };
    Ok(DataSource {
        uid: row.try_get("uid")?,
        resource_version: version.to_string(),
        spec: DataSourceSpec {
            name: row.try_get("name")?,
            type_: row.try_get("type")?,
            access: DataSourceAccess::from_db(&access),
            url: row.try_get("url")?,
            password: row.try_get("password")?,
            database: row.try_get("database_name")?,
            user: row.try_get("user_name")?,
            basic_auth: row.try_get("basic_auth")?,
            basic_auth_user: row.try_get("basic_auth_user")?,
            basic_auth_password: row.try_get("basic_auth_password")?,
            with_credentials: row.try_get("with_credentials")?,
            is_default: row.try_get("is_default")?,
            json_data,
        },
    })
}

pub(super) fn parse_resource_version(resource_version: &str) -> Result<i64, StoreError> {
    resource_version
        .trim()
        .parse::<i64>()
        .map_err(|_| StoreError::InvalidResourceVersion(resource_version.to_string()))
}
