// Library for tests to access modules

pub mod config;
pub mod datasource_store;
pub mod error;
pub mod level;
pub mod logs_volume;
pub mod loki_client;
pub mod models;
pub mod panel_registry;
pub mod query_client;
pub mod query_expr;
pub mod routes;
pub mod version;
