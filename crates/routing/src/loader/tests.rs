use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use notify::event::{DataChange, ModifyKind};
use notify::{Event, EventKind};
use tempfile::TempDir;

use super::watcher::is_config_change;
use super::*;
use crate::schema::{ConfigOpts, PromDuration};

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("alertmanager.yml");
    fs::write(&path, body).unwrap();
    path
}

/// Serve `body` with `status` to a single request, returning the base URL.
fn serve_once(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

// ── File loader ─────────────────────────────────────────────────────

#[test]
fn file_loader_reads_and_keeps_original_text() {
    let dir = TempDir::new().unwrap();
    let body = "route:\n  receiver: team\nreceivers:\n  - name: team\n";
    let path = write_config(&dir, body);

    let mut cfg = Config::default();
    FileLoader::new(&path).load(&mut cfg).unwrap();
    assert_eq!(cfg.original(), body);
    assert_eq!(cfg.root_route().unwrap().receiver, "team");
}

#[test]
fn file_loader_rejects_unknown_fields() {
    let err = load_str("route:\n  receiver: team\nrecievers: []\n").unwrap_err();
    assert!(err.to_string().contains("recievers"), "{err}");
}

#[test]
fn file_loader_requires_route_without_continue() {
    assert!(load_str("").unwrap_err().to_string().contains("no route provided"));
    assert!(load_str("receivers: [{name: a}]").unwrap_err().to_string().contains("no route provided"));
    assert!(load_str("route: {receiver: a, continue: true}")
        .unwrap_err()
        .to_string()
        .contains("cannot have continue in root route"));
}

#[test]
fn file_loader_resolves_relative_paths() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
global:
  slack_api_url_file: secrets/slack
templates: [templates/*.tmpl]
route: {receiver: team}
receivers:
  - name: team
    webhook_configs:
      - url: http://hook.local/
        http_config: {bearer_token_file: token}
"#,
    );
    let cfg = load_file(&path).unwrap();
    let base = dir.path().to_string_lossy().into_owned();
    assert_eq!(cfg.global.as_ref().unwrap().slack_api_url_file, format!("{base}/secrets/slack"));
    assert_eq!(cfg.templates[0], format!("{base}/templates/*.tmpl"));
    let http = cfg.receivers[0].webhook_configs[0].http_config.as_ref().unwrap();
    assert_eq!(http.bearer_token_file, format!("{base}/token"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_file(std::path::Path::new("/nonexistent/herald.yml")).unwrap_err();
    assert!(matches!(err, crate::ConfigError::Io(_)));
}

// ── Channel payloads ────────────────────────────────────────────────

#[test]
fn channel_payload_splits_route_and_receiver() {
    let (route, receiver) = decode_channel(
        r#"{"name":"ops-hook","webhook_configs":[{"url":"http://hook.local/a"}],"group_by":["alertname"],"repeat_interval":"1h"}"#,
    )
    .unwrap();
    assert_eq!(receiver.name, "ops-hook");
    assert_eq!(receiver.webhook_configs.len(), 1);
    assert_eq!(route.receiver, "ops-hook");
    assert_eq!(route.group_by, ["alertname"]);
    assert_eq!(route.repeat_interval, Some(PromDuration::from_secs(3600)));
}

#[test]
fn channel_payload_must_be_an_object() {
    assert!(decode_channel("[1,2]").is_err());
    assert!(decode_channel("not json").is_err());
    assert!(decode_channel(r#"{"name":"x","bogus":1}"#).is_err());
}

// ── Remote loader ───────────────────────────────────────────────────

#[test]
fn channel_loader_builds_channel_url() {
    let a = ChannelLoader::new("http://query:8080").unwrap();
    let b = ChannelLoader::new("http://query:8080/").unwrap();
    assert_eq!(a.channel_url(), "http://query:8080/api/v1/channels");
    assert_eq!(a.channel_url(), b.channel_url());
    assert!(ChannelLoader::new("").is_err());
}

#[test]
fn channel_loader_adds_every_channel() {
    let base = serve_once(
        200,
        r#"{"data":[
            {"id":1,"name":"a","type":"webhook","data":"{\"name\":\"a\",\"webhook_configs\":[{\"url\":\"http://hook.local/a\"}]}"},
            {"id":2,"name":"b","type":"webhook","data":"{\"name\":\"b\",\"webhook_configs\":[{\"url\":\"http://hook.local/b\"}]}"}
        ]}"#,
    );
    let mut cfg = Config::initial(&ConfigOpts::default());
    ChannelLoader::new(&base).unwrap().load(&mut cfg).unwrap();
    assert_eq!(cfg.receivers.len(), 3);
    let routes = &cfg.root_route().unwrap().routes;
    assert_eq!(routes.len(), 2);
    assert!(routes.iter().all(|r| r.continue_matching));
    cfg.validate().unwrap();
}

#[test]
fn channel_loader_keeps_going_and_returns_last_error() {
    let base = serve_once(
        200,
        r#"{"data":[
            {"id":1,"name":"dup","type":"webhook","data":"{\"name\":\"default-receiver\"}"},
            {"id":2,"name":"ok","type":"webhook","data":"{\"name\":\"ok\"}"},
            {"id":3,"name":"broken","type":"webhook","data":"{oops"}
        ]}"#,
    );
    let mut cfg = Config::initial(&ConfigOpts::default());
    let err = ChannelLoader::new(&base).unwrap().load(&mut cfg).unwrap_err();
    assert!(matches!(err, crate::ConfigError::Json(_)), "{err}");
    assert!(cfg.receiver("ok").is_some());
    assert_eq!(cfg.receivers.len(), 2);
}

#[test]
fn channel_loader_tolerates_empty_list() {
    let base = serve_once(200, r#"{"data":null}"#);
    let mut cfg = Config::initial(&ConfigOpts::default());
    ChannelLoader::new(&base).unwrap().load(&mut cfg).unwrap();
    assert_eq!(cfg.receivers.len(), 1);
}

#[test]
fn channel_loader_reports_server_errors() {
    let base = serve_once(500, r#"{"error":"down"}"#);
    let mut cfg = Config::initial(&ConfigOpts::default());
    let err = ChannelLoader::new(&base).unwrap().load(&mut cfg).unwrap_err();
    assert!(err.to_string().contains("received an error from query service"), "{err}");
}

// ── Watcher ─────────────────────────────────────────────────────────

#[test]
fn watcher_filters_by_file_name_and_kind() {
    let name = Some(std::ffi::OsString::from("alertmanager.yml"));
    let modify = EventKind::Modify(ModifyKind::Data(DataChange::Content));

    let hit = Event::new(modify).add_path(PathBuf::from("/etc/herald/alertmanager.yml"));
    assert!(is_config_change(&hit, name.as_ref()));

    let other = Event::new(modify).add_path(PathBuf::from("/etc/herald/other.yml"));
    assert!(!is_config_change(&other, name.as_ref()));

    let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
        .add_path(PathBuf::from("/etc/herald/alertmanager.yml"));
    assert!(!is_config_change(&access, name.as_ref()));
}

#[test]
fn watcher_reports_writes_to_the_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "route: {receiver: a}\n");
    let (tx, rx) = std::sync::mpsc::channel();
    let _watcher = watch_config_file(&path, move || {
        let _ = tx.send(());
    })
    .unwrap();

    fs::write(&path, "route: {receiver: b}\n").unwrap();
    rx.recv_timeout(std::time::Duration::from_secs(10))
        .expect("no change event for the config file");
}
