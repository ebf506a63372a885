//! E2E tests for the HTTP transport
//!
//! Each test starts a real server on an ephemeral port, backed by a control
//! thread and scripted devices, and talks to it over HTTP and WebSocket.

use futures_util::StreamExt;
use pushup_core::device::sim::{RecordingActuator, ScriptedSampler};
use pushup_core::{Devices, GameConfig};
use pushup_server::{AppState, BroadcastNotifier, ControlHandle, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

async fn spawn_player(sampler: ScriptedSampler) -> String {
    let notifier = BroadcastNotifier::default();
    let devices = Devices::new(
        Arc::new(sampler),
        Arc::new(RecordingActuator::new()),
        Arc::new(notifier.clone()),
    );
    let config = GameConfig {
        sample_period_ms: 2,
        blink_period_ms: 2,
        fake_pushup_pause_ms: 0,
        ..GameConfig::default()
    };

    let surface = pushup_core::init_player(devices, config);
    let control = ControlHandle::spawn(surface).expect("Control thread should spawn");
    let server_config = ServerConfig {
        port: 0,
        bind_addr: "127.0.0.1".to_string(),
    };
    let state = AppState::new(control, &notifier, server_config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind an ephemeral port");
    let addr = listener.local_addr().expect("Listener has an address");
    tokio::spawn(pushup_server::serve(listener, state, std::future::pending()));

    format!("{addr}")
}

fn frame_text(frame: Option<Result<Message, WsError>>) -> String {
    frame
        .expect("Stream open")
        .expect("Valid frame")
        .to_text()
        .expect("Text frame")
        .to_string()
}

async fn get_count(client: &reqwest::Client, addr: &str) -> String {
    client
        .get(format!("http://{addr}/count"))
        .send()
        .await
        .expect("GET /count")
        .text()
        .await
        .expect("Count body")
}

#[tokio::test]
async fn test_count_is_plain_text() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let resp = reqwest::get(format!("http://{addr}/count")).await.unwrap();

    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"), "Got {content_type}");
    assert_eq!(resp.text().await.unwrap(), "0");
}

#[tokio::test]
async fn test_assign_color() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("http://{addr}/assign_color"))
        .body("2")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204, "Color assignment is acknowledged");

    let status: serde_json::Value = client
        .get(format!("http://{addr}/api/v1/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["color"], "green");
    assert_eq!(status["version"], pushup_core::VERSION);
}

#[tokio::test]
async fn test_invalid_color_is_rejected() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("http://{addr}/assign_color"))
        .body("purple")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(resp.text().await.unwrap().contains("purple"));

    let status: serde_json::Value = client
        .get(format!("http://{addr}/api/v1/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["color"], "off", "Rejected command mutates nothing");
}

#[tokio::test]
async fn test_unknown_resource_is_not_found() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/teleport"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_fake_pushups_and_history() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .post(format!("http://{addr}/fake_pushup"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);
    }
    assert_eq!(get_count(&client, &addr).await, "2");

    let history: serde_json::Value = client
        .get(format!("http://{addr}/api/v1/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["total_fake"], 2);
    assert_eq!(history["events"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_well_known_core() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let resp = reqwest::get(format!("http://{addr}/.well-known/core"))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/link-format");
    let body = resp.text().await.unwrap();
    assert!(body.contains("</count>;ct=0;rt=\"pushups_player\";obs"));
    assert!(body.contains("</reset>;rt=\"pushups_player\""));
}

#[tokio::test]
async fn test_start_counts_then_reset_clears() {
    let cycle = [0, -260, 260, 0];
    let samples: Vec<i32> = cycle.iter().copied().cycle().take(cycle.len() * 2).collect();
    let addr = spawn_player(ScriptedSampler::with_baseline(1000, &samples)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/start"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let mut count = String::new();
    for _ in 0..300 {
        count = get_count(&client, &addr).await;
        if count == "2" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(count, "2", "Detector should count both repetitions");

    client
        .post(format!("http://{addr}/reset"))
        .send()
        .await
        .unwrap();
    assert_eq!(get_count(&client, &addr).await, "0");

    let status: serde_json::Value = client
        .get(format!("http://{addr}/api/v1/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["round_active"], false);
    assert_eq!(status["detector_running"], false);
}

#[tokio::test]
async fn test_observer_receives_counts() {
    let addr = spawn_player(ScriptedSampler::constant(0)).await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/count/observe"))
        .await
        .expect("WebSocket should connect");

    let first = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Initial count in time");
    assert_eq!(frame_text(first), "0");

    reqwest::Client::new()
        .post(format!("http://{addr}/fake_pushup"))
        .send()
        .await
        .unwrap();

    let update = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("Notification in time");
    assert_eq!(frame_text(update), "1");
}
