// Loki query_range client: one HTTP request per target, one partial response per target.

use futures_util::StreamExt;
use futures_util::stream;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::models::{
    DataSource, LokiQuery, QueryRequest, QueryResponse, RawResult, TimeRange, TimeSeries,
};
use crate::query_client::{QueryClient, QueryClientFactory, QueryResponseStream};
use crate::query_expr::interpolate_interval;
use crate::version;

pub const LOKI_TYPE: &str = "loki";
const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";
const NANOS_PER_MILLI: i64 = 1_000_000;

#[derive(Debug, Clone)]
struct BasicAuth {
    user: String,
    password: String,
}

#[derive(Clone)]
pub struct LokiClient {
    http: reqwest::Client,
    base_url: String,
    basic_auth: Option<BasicAuth>,
    default_max_lines: u32,
}

impl LokiClient {
    pub fn new(base_url: &str, timeout: Duration, default_max_lines: u32) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_auth: None,
            default_max_lines,
        })
    }

    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn from_datasource(datasource: &DataSource, config: &QueryConfig) -> Result<Self, QueryError> {
        let spec = &datasource.spec;
        let client = Self::new(
            &spec.url,
            Duration::from_secs(config.timeout_secs),
            config.max_lines,
        )?;
        Ok(if spec.basic_auth {
            client.with_basic_auth(&spec.basic_auth_user, &spec.basic_auth_password)
        } else {
            client
        })
    }

    #[instrument(skip_all, fields(ref_id = %target.ref_id))]
    async fn query_target(
        &self,
        request: &QueryRequest,
        target: &LokiQuery,
    ) -> Result<QueryResponse, QueryError> {
        let expr = interpolate_interval(&target.expr, &request.interval, request.interval_ms);
        let step_secs = (request.interval_ms / 1000).max(1);
        let limit = target.max_lines.unwrap_or(self.default_max_lines);

        let (start, end) = range_nanos(&request.range)?;

        let params = [
            ("query", expr),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("step", step_secs.to_string()),
            ("limit", limit.to_string()),
            ("direction", "backward".to_string()),
        ];

        let mut builder = self
            .http
            .get(format!("{}{}", self.base_url, QUERY_RANGE_PATH))
            .query(&params);
        if let Some(auth) = &self.basic_auth {
            builder = builder.basic_auth(&auth.user, Some(&auth.password));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueryError::Http {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }
        let body = response.text().await?;
        let data = parse_query_range(&body, &target.ref_id)?;
        debug!(series = data.len(), "loki query_range done");
        Ok(QueryResponse {
            key: Some(target.ref_id.clone()),
            ..QueryResponse::new(data)
        })
    }
}

impl QueryClient for LokiClient {
    fn query(&self, request: QueryRequest) -> QueryResponseStream {
        let client = self.clone();
        let request = Arc::new(request);
        let targets: Vec<LokiQuery> = request
            .targets
            .iter()
            .filter(|t| !t.hide)
            .cloned()
            .collect();
        stream::iter(targets)
            .then(move |target| {
                let client = client.clone();
                let request = request.clone();
                async move { client.query_target(&request, &target).await }
            })
            .boxed()
    }
}

/// Range bounds in nanoseconds. Fails instead of overflowing on out-of-range millis.
fn range_nanos(range: &TimeRange) -> Result<(i64, i64), QueryError> {
    let to_nanos = |ms: i64| {
        ms.checked_mul(NANOS_PER_MILLI)
            .ok_or_else(|| QueryError::Request(format!("time {}ms out of range", ms)))
    };
    Ok((to_nanos(range.from)?, to_nanos(range.to)?))
}

#[derive(Debug, Deserialize)]
struct QueryRangeResponse {
    status: String,
    data: QueryRangeData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRangeData {
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MatrixSeries {
    metric: BTreeMap<String, String>,
    values: Vec<(f64, String)>,
}

/// Parses a query_range body. Only matrix results (metric queries) are accepted.
pub fn parse_query_range(body: &str, ref_id: &str) -> Result<Vec<RawResult>, QueryError> {
    let response: QueryRangeResponse =
        serde_json::from_str(body).map_err(|e| QueryError::Decode(e.to_string()))?;
    if response.status != "success" {
        return Err(QueryError::Datasource(format!(
            "query_range status {}",
            response.status
        )));
    }
    if response.data.result_type != "matrix" {
        return Err(QueryError::Decode(format!(
            "expected matrix result, got {}",
            response.data.result_type
        )));
    }
    let series: Vec<MatrixSeries> = serde_json::from_value(response.data.result)
        .map_err(|e| QueryError::Decode(e.to_string()))?;
    Ok(series
        .into_iter()
        .map(|s| RawResult::TimeSeries(matrix_to_time_series(s, ref_id)))
        .collect())
}

fn matrix_to_time_series(series: MatrixSeries, ref_id: &str) -> TimeSeries {
    let datapoints = series
        .values
        .into_iter()
        .map(|(ts_secs, value)| (parse_sample(&value), (ts_secs * 1000.0).round() as i64))
        .collect();
    TimeSeries {
        target: selector(&series.metric),
        datapoints,
        tags: Some(series.metric),
        ref_id: Some(ref_id.to_string()),
    }
}

/// Sample value; `NaN` and infinities count as missing.
fn parse_sample(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `{a="1", b="2"}`
fn selector(labels: &BTreeMap<String, String>) -> String {
    let inner: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}={:?}", k, v))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

/// Builds Loki clients for stored datasources of type `loki`.
pub struct LokiClientFactory {
    config: QueryConfig,
}

impl LokiClientFactory {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }
}

impl QueryClientFactory for LokiClientFactory {
    fn client_for(&self, datasource: &DataSource) -> Result<Arc<dyn QueryClient>, QueryError> {
        if datasource.spec.type_ != LOKI_TYPE {
            return Err(QueryError::UnsupportedDatasource(
                datasource.spec.type_.clone(),
            ));
        }
        Ok(Arc::new(LokiClient::from_datasource(datasource, &self.config)?))
    }
}
