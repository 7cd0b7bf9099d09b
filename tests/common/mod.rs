// Shared test helpers: frame builders and a scripted dispatch client

#![allow(dead_code)]

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use logvolume::error::QueryError;
use logvolume::models::*;
use logvolume::query_client::{QueryClient, QueryResponseStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Time + labelled Value frame, one value per timestamp.
pub fn volume_frame(level: Option<&str>, times: &[i64], values: &[Option<f64>]) -> Frame {
    let mut value = Field::number("Value", values.to_vec());
    if let Some(level) = level {
        value = value.with_labels(labels(&[("level", level)]));
    }
    Frame::new(vec![
        Field::time("Time", times.iter().map(|t| Some(*t)).collect()),
        value,
    ])
}

pub fn request(exprs: &[&str]) -> QueryRequest {
    QueryRequest {
        request_id: "explore_left".into(),
        interval: "1m".into(),
        interval_ms: 60_000,
        range: TimeRange {
            from: 1_700_000_000_000,
            to: 1_700_003_600_000,
        },
        targets: exprs
            .iter()
            .enumerate()
            .map(|(i, expr)| LokiQuery {
                ref_id: ((b'A' + i as u8) as char).to_string(),
                expr: expr.to_string(),
                ..Default::default()
            })
            .collect(),
    }
}

/// Decrements `active` and counts a release when the upstream stream is dropped.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Replays a fixed script for every dispatch. With `hang`, the stream never completes.
pub struct FakeQueryClient {
    script: Vec<Result<QueryResponse, QueryError>>,
    hang: bool,
    pub dispatched: Arc<AtomicUsize>,
    pub active: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub requests: Mutex<Vec<QueryRequest>>,
}

impl FakeQueryClient {
    pub fn new(script: Vec<Result<QueryResponse, QueryError>>) -> Self {
        Self {
            script,
            hang: false,
            dispatched: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn hanging(script: Vec<Result<QueryResponse, QueryError>>) -> Self {
        Self {
            hang: true,
            ..Self::new(script)
        }
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<QueryRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl QueryClient for FakeQueryClient {
    fn query(&self, request: QueryRequest) -> QueryResponseStream {
        self.requests.lock().unwrap().push(request);
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard {
            active: self.active.clone(),
            released: self.released.clone(),
        };
        let tail: BoxStream<'static, Result<QueryResponse, QueryError>> = if self.hang {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };
        stream::iter(self.script.clone())
            .chain(tail)
            .map(move |item| {
                let _guard = &guard;
                item
            })
            .boxed()
    }
}

pub fn partial(frames: Vec<Frame>) -> QueryResponse {
    QueryResponse::new(frames.into_iter().map(RawResult::Frame).collect())
}

pub fn loki_datasource(uid: &str, name: &str) -> DataSource {
    DataSource {
        uid: uid.into(),
        resource_version: String::new(),
        spec: DataSourceSpec {
            name: name.into(),
            type_: "loki".into(),
            url: "http://localhost:3100".into(),
            ..Default::default()
        },
    }
}
