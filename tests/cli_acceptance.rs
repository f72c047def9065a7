/// Acceptance tests for the scriptcache binary
///
/// Each test gets its own store directory; scripts are served by wiremock.
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to get the scriptcache binary with an isolated store dir
fn scriptcache(store_dir: &Path) -> Command {
    let mut cmd = Command::new(std::env!("CARGO_BIN_EXE_scriptcache"));
    cmd.env("SCRIPTCACHE_STORE_DIR", store_dir)
        .env_remove("SCRIPTCACHE_CONFIG")
        .env_remove("SCRIPTCACHE_ORIGIN")
        .env("SCRIPTCACHE_LOG_FORMAT", "compact");
    cmd
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_require_miss_then_hit_then_stale() {
    let server = MockServer::start().await;
    serve(&server, "/lib.js", "window.lib = 'cli';").await;
    let store = TempDir::new().unwrap();
    let url = format!("{}/lib.js", server.uri());

    scriptcache(store.path())
        .args(["require", "lib", "1.0.0", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("window.lib = 'cli';"))
        .stderr(predicate::str::contains("MISS"));

    scriptcache(store.path())
        .args(["require", "lib", "1.0.0", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("window.lib = 'cli';"))
        .stderr(predicate::str::contains("HIT"));

    scriptcache(store.path())
        .args(["require", "lib", "2.0.0", &url])
        .assert()
        .success()
        .stderr(predicate::str::contains("STALE (replaced 1.0.0)"));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    scriptcache(store.path())
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lib@2.0.0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_require_writes_output_file() {
    let server = MockServer::start().await;
    serve(&server, "/app.js", "start();").await;
    let store = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("index.html");

    scriptcache(store.path())
        .args([
            "require",
            "app",
            "7",
            &format!("{}/app.js", server.uri()),
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.contains("<script type=\"text/javascript\">start();</script>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_require_fetch_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let store = TempDir::new().unwrap();
    let url = format!("{}/gone.js", server.uri());

    scriptcache(store.path())
        .args(["require", "gone", "1.0.0", &url])
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!("error loading {}", url)));

    scriptcache(store.path())
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cached scripts."));
}

#[test]
fn test_require_without_store_references_url() {
    let store = TempDir::new().unwrap();

    scriptcache(store.path())
        .args([
            "require",
            "lib",
            "1.0.0",
            "https://cdn.example.invalid/lib.js",
            "--no-store",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "src=\"https://cdn.example.invalid/lib.js\"",
        ))
        .stderr(predicate::str::contains("DIRECT"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cache_show_remove_clear() {
    let server = MockServer::start().await;
    serve(&server, "/a.js", "a();").await;
    serve(&server, "/b.js", "b();").await;
    let store = TempDir::new().unwrap();

    for name in ["a", "b"] {
        scriptcache(store.path())
            .args(["require", name, "1", &format!("{}/{}.js", server.uri(), name)])
            .assert()
            .success();
    }

    scriptcache(store.path())
        .args(["cache", "show", "a", "--content"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Version: 1"))
        .stdout(predicate::str::contains("a();"));

    scriptcache(store.path())
        .args(["cache", "remove", "a"])
        .assert()
        .success();

    scriptcache(store.path())
        .args(["cache", "show", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No cached script named 'a'"));

    scriptcache(store.path())
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 cached scripts."));
}

#[test]
fn test_cache_probe() {
    let store = TempDir::new().unwrap();

    scriptcache(store.path())
        .args(["cache", "probe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AVAILABLE"));
}

#[test]
fn test_config_generate_and_validate() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("scriptcache.toml");

    let output = Command::new(std::env!("CARGO_BIN_EXE_scriptcache"))
        .args(["config", "generate"])
        .output()
        .unwrap();
    assert!(output.status.success());
    fs::write(&config_path, output.stdout).unwrap();

    Command::new(std::env!("CARGO_BIN_EXE_scriptcache"))
        .args(["config", "validate", config_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Origin: app.example.com"));
}
