//! Tests for router provisioning

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

use flowkeys_runtime::deps::HttpResponse;

use super::*;
use crate::test_helpers::{MemoryFileSystem, MockEnvironmentMock, MockHttpClientMock, credential};

const TEMPLATE: &str = r#"{
  "LOG": false,
  "Providers": [
    {"name": "op-provider", "api_base_url": "https://apis.iflow.cn/v1/chat/completions", "api_key": "", "models": ["glm-5"], "transformer": {"use": ["header"]}}
  ],
  "transformers": [
    {"path": "/Users/dypbi/.claude-code-router/plugins/header.js"}
  ]
}"#;

fn serving(header: (u16, &'static str), template: (u16, &'static str)) -> MockHttpClientMock {
    let mut http = MockHttpClientMock::new();
    http.expect_get()
        .withf(|url| url == HEADER_SCRIPT_URL)
        .returning(move |_| {
            Ok(HttpResponse {
                status: header.0,
                body: header.1.to_string(),
            })
        });
    http.expect_get()
        .withf(|url| url == CONFIG_TEMPLATE_URL)
        .returning(move |_| {
            Ok(HttpResponse {
                status: template.0,
                body: template.1.to_string(),
            })
        });
    http
}

fn layout() -> RouterLayout {
    RouterLayout::from_base("/home/alice/.claude-code-router")
}

#[rstest]
#[case(Platform::Windows, "C:/Users/alice/.claude-code-router")]
#[case(Platform::MacOs, "/Users/alice/.claude-code-router")]
#[case(Platform::Linux, "/home/alice/.claude-code-router")]
#[case(Platform::Other("freebsd"), "/home/alice/.claude-code-router")]
fn test_platform_base_dir(#[case] platform: Platform, #[case] expected: &str) {
    assert_eq!(platform_base_dir(platform, "alice"), PathBuf::from(expected));
}

#[test]
fn test_layout_from_base() {
    let layout = layout();

    assert_eq!(
        layout.plugins,
        PathBuf::from("/home/alice/.claude-code-router/plugins")
    );
    assert_eq!(
        layout.header_script,
        PathBuf::from("/home/alice/.claude-code-router/plugins/header.js")
    );
    assert_eq!(
        layout.config,
        PathBuf::from("/home/alice/.claude-code-router/config.json")
    );
}

#[test]
fn test_layout_resolve_prefers_explicit_home() {
    let mut env = MockEnvironmentMock::new();
    env.expect_login_name().never();

    let layout = RouterLayout::resolve(Some(Path::new("/tmp/router")), &env).unwrap();

    assert_eq!(layout.base, PathBuf::from("/tmp/router"));
}

#[test]
fn test_layout_resolve_uses_login_name() {
    let mut env = MockEnvironmentMock::new();
    env.expect_login_name()
        .returning(|| Ok("bob".to_string()));
    env.expect_platform().returning(|| Platform::MacOs);

    let layout = RouterLayout::resolve(None, &env).unwrap();

    assert_eq!(layout.base, PathBuf::from("/Users/bob/.claude-code-router"));
}

#[test]
fn test_router_status() {
    let layout = layout();
    let fs = MemoryFileSystem::new().with_file(&layout.config, "{}");

    let status = router_status(&fs, Platform::Linux, &layout);

    assert!(status.config_exists);
    assert!(!status.header_exists);
    assert_eq!(status.base, layout.base);
}

#[tokio::test]
async fn test_initialize_writes_script_and_adapted_config() {
    let fs = MemoryFileSystem::new();
    let http = serving((200, "module.exports = {};"), (200, TEMPLATE));
    let roster = Roster {
        accounts: vec![
            credential("t1", "k1", "a", ""),
            credential("t2", "", "b", ""),
            credential("t3", "k3", "c", ""),
        ],
    };

    let report = initialize(&http, &fs, &layout(), "alice", &roster)
        .await
        .unwrap();

    assert!(report.created_plugins_dir);
    assert!(report.provider_updated);
    assert_eq!(report.key_count, 2);
    assert_eq!(report.patched_transformers, 1);
    assert_eq!(fs.created_dirs(), vec![layout().plugins]);
    assert_eq!(
        fs.content(&layout().header_script).as_deref(),
        Some("module.exports = {};")
    );

    let config: Value = serde_json::from_str(&fs.content(&layout().config).unwrap()).unwrap();
    assert_eq!(config["Providers"][0]["api_key"], "k1,k3");
    assert_eq!(
        config["transformers"],
        json!([{"path": "/Users/alice/.claude-code-router/plugins/header.js"}])
    );
    assert_eq!(config["LOG"], Value::Bool(false));
}

#[tokio::test]
async fn test_initialize_without_keys_writes_placeholder() {
    let fs = MemoryFileSystem::new();
    let http = serving((200, "script"), (200, TEMPLATE));

    let report = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap();

    assert_eq!(report.key_count, 0);
    let config: Value = serde_json::from_str(&fs.content(&layout().config).unwrap()).unwrap();
    assert_eq!(config["Providers"][0]["api_key"], "YOUR_API_KEY_HERE");
}

#[tokio::test]
async fn test_initialize_never_appends_provider() {
    let fs = MemoryFileSystem::new();
    let http = serving((200, "script"), (200, r#"{"Providers": []}"#));
    let roster = Roster {
        accounts: vec![credential("t", "k", "n", "")],
    };

    let report = initialize(&http, &fs, &layout(), "alice", &roster)
        .await
        .unwrap();

    assert!(!report.provider_updated);
    let config: Value = serde_json::from_str(&fs.content(&layout().config).unwrap()).unwrap();
    assert_eq!(config["Providers"], json!([]));
}

#[tokio::test]
async fn test_initialize_preserves_template_fields() {
    let fs = MemoryFileSystem::new();
    let template = r#"{"Router": {}, "Providers": [{"name": "gemini", "models": [], "api_base_url": ""}, {"name": "op-provider", "api_key": "", "models": [{"id": "glm-5"}], "transformer": null}], "transformers": [{"path": "/home/dypbi/h.js", "options": {"a": 1}}], "LOG": true}"#;
    let http = serving((200, "script"), (200, template));
    let roster = Roster {
        accounts: vec![credential("t", "k", "n", "")],
    };

    initialize(&http, &fs, &layout(), "alice", &roster)
        .await
        .unwrap();

    let written = fs.content(&layout().config).unwrap();
    let config: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(
        config,
        json!({
            "Router": {},
            "Providers": [
                {"name": "gemini", "models": [], "api_base_url": ""},
                {"name": "op-provider", "api_key": "k", "models": [{"id": "glm-5"}], "transformer": null}
            ],
            "transformers": [{"path": "/home/alice/h.js", "options": {"a": 1}}],
            "LOG": true
        })
    );
    assert!(written.find("\"Router\"") < written.find("\"Providers\""));
}

#[tokio::test]
async fn test_initialize_keeps_existing_plugins_dir() {
    let fs = MemoryFileSystem::new();
    fs.create_dir_all(&layout().plugins).unwrap();
    let http = serving((200, "script"), (200, TEMPLATE));

    let report = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap();

    assert!(!report.created_plugins_dir);
    assert_eq!(fs.created_dirs().len(), 1);
}

#[tokio::test]
async fn test_initialize_script_failure_writes_nothing() {
    let fs = MemoryFileSystem::new();
    let http = serving((404, "missing"), (200, TEMPLATE));

    let err = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::DownloadStatus { status: 404, .. }));
    assert!(fs.writes().is_empty());
}

#[tokio::test]
async fn test_initialize_template_failure_writes_nothing() {
    let fs = MemoryFileSystem::new();
    let http = serving((200, "script"), (500, ""));

    let err = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::DownloadStatus { status: 500, .. }));
    assert!(fs.writes().is_empty());
}

#[tokio::test]
async fn test_initialize_network_error() {
    let fs = MemoryFileSystem::new();
    let mut http = MockHttpClientMock::new();
    http.expect_get()
        .returning(|url| Err(anyhow::anyhow!("Failed to fetch {url}: connection refused")));

    let err = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Download { .. }));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_initialize_malformed_template() {
    let fs = MemoryFileSystem::new();
    let http = serving((200, "script"), (200, "<html>rate limited</html>"));

    let err = initialize(&http, &fs, &layout(), "alice", &Roster::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::MalformedTemplate { .. }));
    assert!(fs.writes().is_empty());
}
