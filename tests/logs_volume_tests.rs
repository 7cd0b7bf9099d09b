// Provider lifecycle tests: snapshot sequence, supersession, release on drop

mod common;

use common::{FakeQueryClient, partial, request, volume_frame};
use futures_util::{FutureExt, StreamExt};
use logvolume::error::QueryError;
use logvolume::logs_volume::{LogsVolumeProvider, LogsVolumeStream};
use logvolume::models::*;
use std::sync::Arc;

/// Polls once without waiting; `None` means the stream is pending.
fn poll_now(stream: &mut LogsVolumeStream) -> Option<Option<LogsVolume>> {
    stream.next().now_or_never()
}

fn provider(client: &Arc<FakeQueryClient>, exprs: &[&str]) -> LogsVolumeProvider {
    LogsVolumeProvider::new(client.clone(), request(exprs))
}

#[tokio::test]
async fn stream_is_lazy_until_polled() {
    let client = Arc::new(FakeQueryClient::new(vec![]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let stream = p.get_data();
    assert_eq!(client.dispatched(), 0);
    drop(stream);
    assert_eq!(client.dispatched(), 0);
}

#[tokio::test]
async fn empty_upstream_yields_loading_then_empty_success() {
    let client = Arc::new(FakeQueryClient::new(vec![]));
    let mut p = provider(&client, &["{app=\"api\"}"]);
    let mut stream = p.get_data();

    assert_eq!(stream.next().await, Some(LogsVolume::loading()));
    let done = stream.next().await.unwrap();
    assert!(!done.is_loading);
    assert_eq!(done.error, None);
    assert!(done.data.is_empty());
    assert_eq!(stream.next().await, None);
    assert_eq!(client.dispatched(), 1);
    assert_eq!(client.active(), 0);
}

#[tokio::test]
async fn partials_are_accumulated_then_aggregated_once() {
    let client = Arc::new(FakeQueryClient::new(vec![
        Ok(partial(vec![volume_frame(Some("error"), &[1, 2], &[Some(1.0), None])])),
        Ok(partial(vec![
            volume_frame(Some("error"), &[1, 2], &[Some(2.0), None]),
            volume_frame(Some("info"), &[1, 2], &[None, Some(5.0)]),
        ])),
    ]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let snapshots: Vec<LogsVolume> = p.get_data().collect().await;
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].is_loading);

    let done = &snapshots[1];
    assert!(!done.is_loading);
    assert_eq!(done.data.len(), 2);
    assert_eq!(
        done.data[0].fields[1].values,
        FieldValues::Number(vec![Some(3.0), None])
    );
    assert_eq!(
        done.data[1].fields[1].config.display_name_from_ds.as_deref(),
        Some("info")
    );
}

#[tokio::test]
async fn time_series_results_are_converted_before_aggregation() {
    let series = TimeSeries {
        target: "{level=\"warn\"}".into(),
        datapoints: vec![(Some(4.0), 1000), (None, 2000)],
        tags: Some(common::labels(&[("level", "warn")])),
        ref_id: Some("A".into()),
    };
    let client = Arc::new(FakeQueryClient::new(vec![Ok(QueryResponse::new(vec![
        RawResult::TimeSeries(series),
    ]))]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let snapshots: Vec<LogsVolume> = p.get_data().collect().await;
    let done = snapshots.last().unwrap();
    assert_eq!(done.data.len(), 1);
    assert_eq!(
        done.data[0].fields[0].values,
        FieldValues::Time(vec![Some(1000), Some(2000)])
    );
    assert_eq!(
        done.data[0].fields[1].config.display_name_from_ds.as_deref(),
        Some("warning")
    );
}

#[tokio::test]
async fn upstream_error_yields_single_error_snapshot() {
    let failure = QueryError::Http {
        status: 500,
        message: "boom".into(),
    };
    let client = Arc::new(FakeQueryClient::new(vec![
        Ok(partial(vec![volume_frame(Some("error"), &[1], &[Some(1.0)])])),
        Err(failure.clone()),
        Ok(partial(vec![volume_frame(Some("info"), &[1], &[Some(1.0)])])),
    ]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let snapshots: Vec<LogsVolume> = p.get_data().collect().await;
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots[0].is_loading);
    assert_eq!(snapshots[1], LogsVolume::failed(failure));
    assert!(snapshots[1].data.is_empty());
    assert_eq!(client.active(), 0);
}

#[tokio::test]
async fn second_get_data_releases_first_subscription() {
    let client = Arc::new(FakeQueryClient::hanging(vec![]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let mut first = p.get_data();
    assert_eq!(poll_now(&mut first), Some(Some(LogsVolume::loading())));
    assert_eq!(poll_now(&mut first), None);
    assert_eq!(client.active(), 1);

    let mut second = p.get_data();
    assert!(first.subscription().is_closed());
    assert_eq!(client.active(), 0);
    assert_eq!(client.released(), 1);

    assert_eq!(poll_now(&mut second), Some(Some(LogsVolume::loading())));
    assert_eq!(client.dispatched(), 2);
    assert_eq!(client.active(), 1);

    // The superseded stream ends without further snapshots.
    assert_eq!(poll_now(&mut first), Some(None));
    assert!(!second.subscription().is_closed());
    assert!(
        !p.current_subscription().unwrap().is_closed(),
        "provider tracks the latest subscription"
    );
}

#[tokio::test]
async fn superseded_stream_never_dispatches() {
    let client = Arc::new(FakeQueryClient::hanging(vec![]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let mut first = p.get_data();
    let _second = p.get_data();
    assert_eq!(poll_now(&mut first), Some(None));
    assert_eq!(client.dispatched(), 0);
}

#[tokio::test]
async fn dropping_stream_releases_upstream() {
    let client = Arc::new(FakeQueryClient::hanging(vec![Ok(partial(vec![
        volume_frame(Some("error"), &[1], &[Some(1.0)]),
    ]))]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let mut stream = p.get_data();
    assert_eq!(poll_now(&mut stream), Some(Some(LogsVolume::loading())));
    assert_eq!(poll_now(&mut stream), None);
    assert_eq!(client.active(), 1);

    drop(stream);
    assert_eq!(client.active(), 0);
    assert_eq!(client.released(), 1);
    assert!(p.current_subscription().unwrap().is_closed());
}

#[tokio::test]
async fn each_call_starts_from_an_empty_buffer() {
    let client = Arc::new(FakeQueryClient::new(vec![Ok(partial(vec![volume_frame(
        Some("error"),
        &[1],
        &[Some(2.0)],
    )]))]));
    let mut p = provider(&client, &["{app=\"api\"}"]);

    let first: Vec<LogsVolume> = p.get_data().collect().await;
    let second: Vec<LogsVolume> = p.get_data().collect().await;
    assert_eq!(first.last(), second.last());
    assert_eq!(
        second.last().unwrap().data[0].fields[1].values,
        FieldValues::Number(vec![Some(2.0)])
    );
}

#[tokio::test]
async fn dispatched_request_is_rewritten_and_base_is_untouched() {
    let client = Arc::new(FakeQueryClient::new(vec![]));
    let mut p = provider(
        &client,
        &["{app=\"api\"} |= \"error\"", "rate({app=\"api\"}[5m])"],
    );

    let _: Vec<LogsVolume> = p.get_data().collect().await;
    let sent = client.last_request().unwrap();
    assert_eq!(sent.targets.len(), 1);
    assert_eq!(sent.targets[0].ref_id, "A");
    assert_eq!(
        sent.targets[0].expr,
        "count_over_time({app=\"api\"} |= \"error\"[$__interval])"
    );
    assert_eq!(sent.range, p.request().range);
    assert_eq!(sent.interval, p.request().interval);

    assert_eq!(p.request().targets.len(), 2);
    assert_eq!(p.request().targets[0].expr, "{app=\"api\"} |= \"error\"");
}

#[tokio::test]
async fn unsubscribe_is_idempotent() {
    let client = Arc::new(FakeQueryClient::hanging(vec![]));
    let mut p = provider(&client, &["{app=\"api\"}"]);
    let mut stream = p.get_data();
    let _ = poll_now(&mut stream);

    let subscription = stream.subscription().clone();
    subscription.unsubscribe();
    subscription.unsubscribe();
    drop(stream);
    assert_eq!(client.released(), 1);
}
