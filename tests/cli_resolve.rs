//! Integration tests for `snag resolve` and `snag probe` against a local mock CDN.
//!
//! The binary runs on a blocking thread while the mock server keeps serving
//! from the test runtime.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
hd/index.m3u8
";

fn snag() -> Command {
    Command::cargo_bin("snag").expect("binary 'snag' should be built")
}

/// A config path that never exists, so runs use built-in defaults.
fn no_config() -> PathBuf {
    std::env::temp_dir().join("snag-tests-no-such-dir").join("config.toml")
}

async fn mock_cdn() -> MockServer {
    let server = MockServer::start().await;
    for ok in ["/master.m3u8", "/movie_480p.mp4"] {
        Mock::given(method("HEAD"))
            .and(path(ok))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MASTER))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/protected.mp4"))
        .and(header("Referer", "https://player.example.com/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolve_expands_manifest_and_ranks() {
    let server = mock_cdn().await;
    let base = server.uri();

    let args = vec![
        "--config".to_string(),
        no_config().display().to_string(),
        "resolve".to_string(),
        format!("{base}/movie_480p.mp4"),
        format!("{base}/dead.mp4"),
        format!("{base}/master.m3u8"),
        "--title".to_string(),
        "Big Buck Bunny".to_string(),
        "--json".to_string(),
    ];

    let output = tokio::task::spawn_blocking(move || snag().args(&args).output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());

    let streams: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let streams = streams.as_array().unwrap();
    let urls: Vec<&str> = streams.iter().map(|s| s["url"].as_str().unwrap()).collect();

    assert_eq!(
        urls,
        [
            format!("{base}/hd/index.m3u8"),
            format!("{base}/movie_480p.mp4"),
            format!("{base}/low/index.m3u8"),
        ]
    );
    assert_eq!(streams[0]["quality"], "1080p");
    assert_eq!(streams[1]["quality"], "480p");
    assert_eq!(streams[2]["quality"], "360p");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolve_passes_headers_to_validation() {
    let server = mock_cdn().await;
    let base = server.uri();

    let args = vec![
        "--config".to_string(),
        no_config().display().to_string(),
        "resolve".to_string(),
        format!("{base}/protected.mp4"),
        "-t".to_string(),
        "Sintel".to_string(),
        "-H".to_string(),
        "Referer: https://player.example.com/".to_string(),
        "--json".to_string(),
    ];

    let output = tokio::task::spawn_blocking(move || snag().args(&args).output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());

    let streams: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(streams.as_array().unwrap().len(), 1);
    assert_eq!(
        streams[0]["headers"]["Referer"],
        "https://player.example.com/"
    );
}

#[test]
fn resolve_with_no_usable_links_prints_empty_list() {
    snag()
        .args(["--config"])
        .arg(no_config())
        .args(["resolve", "ftp://mirror.example.com/a.mp4", "-t", "Sintel", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

#[test]
fn resolve_rejects_zero_season() {
    snag()
        .args(["--config"])
        .arg(no_config())
        .args([
            "resolve",
            "https://cdn.example.com/a.mp4",
            "-t",
            "Show",
            "--season",
            "0",
            "--episode",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid media query"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn probe_reports_each_url() {
    let server = mock_cdn().await;
    let base = server.uri();

    let args = vec![
        "--config".to_string(),
        no_config().display().to_string(),
        "probe".to_string(),
        format!("{base}/movie_480p.mp4"),
        format!("{base}/dead.mp4"),
    ];

    let output = tokio::task::spawn_blocking(move || snag().args(&args).output().unwrap())
        .await
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(&format!("200 {base}/movie_480p.mp4")));
    assert!(stdout.contains(&format!("404 {base}/dead.mp4")));
    assert!(stdout.contains("1/2 reachable"));
}
