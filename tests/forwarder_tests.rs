mod common;

use common::MockLoki;
use std::time::Duration;
use sysloki::cli::run::Forwarder;
use sysloki::config::parse::{parse_config, ConfigFormat};
use sysloki::config::Config;
use sysloki::labels::LabelSet;
use sysloki::pipeline::{Entry, FlushOutcome, StreamFragment};
use tokio::net::UdpSocket;

fn config(loki_url: &str, flush_interval: &str) -> Config {
    let text = format!(
        r#"{{
            "syslog_bind": "127.0.0.1:0",
            "loki_server": "{}",
            "scrape_config": [
                {{"tag": "app1", "labels": {{"service": "app1"}}}},
                {{"tag": "127.0.0.1", "labels": {{"service": "localhost"}}}}
            ],
            "pipeline": {{
                "flush_interval": "{}",
                "ready_interval": "200ms"
            }},
            "loki": {{"request_timeout": "2s"}}
        }}"#,
        loki_url, flush_interval
    );
    parse_config(&text, ConfigFormat::Json).unwrap()
}

async fn send_syslog(forwarder: &Forwarder, payload: &str) {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(payload.as_bytes(), forwarder.syslog_addr())
        .await
        .unwrap();
}

fn streams(body: &serde_json::Value) -> &Vec<serde_json::Value> {
    body["streams"].as_array().expect("streams array")
}

#[tokio::test]
async fn test_tagged_records_merged_into_one_stream() {
    let loki = MockLoki::start().await;
    let forwarder = Forwarder::start(&config(&loki.url(), "100ms")).await.unwrap();

    send_syslog(&forwarder, "<14>Oct 11 22:14:15 web01 app1[7]: hello\n").await;
    send_syslog(&forwarder, "<14>Oct 11 22:14:16 web01 app1[7]: world\n").await;

    let pushes = loki.wait_for_pushes(1, Duration::from_secs(5)).await;
    assert_eq!(pushes.len(), 1);

    let streams = streams(&pushes[0].body);
    assert_eq!(streams.len(), 1);
    let stream = &streams[0];
    assert_eq!(stream["stream"]["service"], "app1");
    assert_eq!(stream["stream"]["tag"], "app1");
    assert_eq!(stream["stream"]["hostname"], "web01");
    assert_eq!(stream["stream"]["severity"], "6");
    assert_eq!(stream["stream"]["facility"], "1");

    let values = stream["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0][1], "hello");
    assert_eq!(values[1][1], "world");

    forwarder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_tag_uses_sender_host_rule() {
    let loki = MockLoki::start().await;
    let forwarder = Forwarder::start(&config(&loki.url(), "100ms")).await.unwrap();

    send_syslog(&forwarder, "<13>Oct 11 22:14:15 web01 cron: tick").await;

    let pushes = loki.wait_for_pushes(1, Duration::from_secs(5)).await;
    assert_eq!(pushes.len(), 1);
    let stream = &streams(&pushes[0].body)[0];
    assert_eq!(stream["stream"]["service"], "localhost");
    assert_eq!(stream["stream"]["tag"], "127.0.0.1");

    forwarder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_logs_held_until_loki_ready() {
    let loki = MockLoki::start().await;
    loki.set_ready_status(503);
    let forwarder = Forwarder::start(&config(&loki.url(), "100ms")).await.unwrap();

    send_syslog(&forwarder, "<14>Oct 11 22:14:15 web01 app1: queued").await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(loki.pushes().is_empty());
    assert!(loki.ready_hits() >= 3);

    loki.set_ready_status(200);
    let pushes = loki.wait_for_pushes(1, Duration::from_secs(5)).await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(streams(&pushes[0].body)[0]["values"][0][1], "queued");

    forwarder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_push_is_not_retried() {
    let loki = MockLoki::start().await;
    loki.set_push_status(500);
    let forwarder = Forwarder::start(&config(&loki.url(), "100ms")).await.unwrap();

    send_syslog(&forwarder, "<14>Oct 11 22:14:15 web01 app1: lost").await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    loki.set_push_status(204);
    send_syslog(&forwarder, "<14>Oct 11 22:14:16 web01 app1: kept").await;

    let pushes = loki.wait_for_pushes(1, Duration::from_secs(5)).await;
    assert_eq!(pushes.len(), 1);
    let values = streams(&pushes[0].body)[0]["values"].as_array().unwrap().clone();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0][1], "kept");

    forwarder.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_flushes_pending_logs() {
    let loki = MockLoki::start().await;
    let forwarder = Forwarder::start(&config(&loki.url(), "1h")).await.unwrap();

    forwarder
        .sender()
        .submit(StreamFragment::new(
            LabelSet::from([("tag", "direct")]),
            Entry("1".to_string(), "last words".to_string()),
        ))
        .await
        .unwrap();

    let outcome = forwarder.shutdown().await.unwrap();

    assert!(matches!(outcome, FlushOutcome::Delivered { entries: 1, .. }));
    let pushes = loki.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(streams(&pushes[0].body)[0]["values"][0][1], "last words");
}

#[tokio::test]
async fn test_invalid_loki_url_refuses_to_start() {
    let mut config = config("http://unused", "1s");
    config.loki_server = "loki:3100".to_string();

    assert!(Forwarder::start(&config).await.is_err());
}
