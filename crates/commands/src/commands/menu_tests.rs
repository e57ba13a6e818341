//! Unit tests for the interactive menu

use std::path::PathBuf;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use flowkeys_runtime::Settings;
use flowkeys_runtime::deps::{
    Clock, Environment, FileSystem, HttpClient, Platform, UserInterface,
};

use crate::commands::menu::*;
use crate::router::{RestartOutcome, RouterRestarter};
use crate::test_helpers::*;
use crate::upstream::CredentialSource;

const STORE_PATH: &str = "/data/accounts.json";
const ROUTER_HOME: &str = "/home/alice/.claude-code-router";
const CONFIG_PATH: &str = "/home/alice/.claude-code-router/config.json";

fn settings() -> Settings {
    Settings {
        store_path: PathBuf::from(STORE_PATH),
        router_home: Some(PathBuf::from(ROUTER_HOME)),
        api_base_url: "http://localhost".to_string(),
    }
}

struct TestFixture {
    ui: Arc<TestUserInterface>,
    file_system: Arc<MemoryFileSystem>,
    source: MockCredentialSourceMock,
    restarter: MockRouterRestarterMock,
}

impl TestFixture {
    fn with_inputs(inputs: &[&str]) -> Self {
        Self {
            ui: Arc::new(TestUserInterface::with_inputs(inputs.iter().copied())),
            file_system: Arc::new(MemoryFileSystem::new()),
            source: MockCredentialSourceMock::new(),
            restarter: MockRouterRestarterMock::new(),
        }
    }

    #[allow(clippy::wrong_self_convention)]
    fn to_deps(self) -> MenuDependencies {
        let mut environment = MockEnvironmentMock::new();
        environment.expect_platform().returning(|| Platform::Linux);
        environment
            .expect_login_name()
            .returning(|| Ok("alice".to_string()));

        MenuDependencies {
            ui: self.ui as Arc<dyn UserInterface>,
            clock: Arc::new(FixedClock::at("2025-03-10 12:00")) as Arc<dyn Clock>,
            file_system: self.file_system as Arc<dyn FileSystem>,
            environment: Arc::new(environment) as Arc<dyn Environment>,
            http_client: Arc::new(MockHttpClientMock::new()) as Arc<dyn HttpClient>,
            source: Arc::new(self.source) as Arc<dyn CredentialSource>,
            restarter: Arc::new(self.restarter) as Arc<dyn RouterRestarter>,
        }
    }
}

fn menu_lines(ui: &TestUserInterface) -> Vec<String> {
    ui.get_output()
        .into_iter()
        .filter(|line| line.starts_with("  ["))
        .collect()
}

#[test]
fn test_available_choices_hide_delete_for_empty_roster() {
    assert_eq!(MenuChoice::available(0).len(), 6);
    assert!(!MenuChoice::available(0).contains(&MenuChoice::Delete));
    assert_eq!(MenuChoice::available(2).len(), 7);
}

#[test]
fn test_parse_choice() {
    let offered = MenuChoice::available(0);

    assert_eq!(MenuChoice::parse(" 1 ", &offered), Some(MenuChoice::Add));
    assert_eq!(MenuChoice::parse("7", &offered), Some(MenuChoice::Exit));
    assert_eq!(MenuChoice::parse("4", &offered), None);
    assert_eq!(MenuChoice::parse("x", &offered), None);
}

#[tokio::test]
async fn test_exit_prints_farewell() {
    let fixture = TestFixture::with_inputs(&["7"]);
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("No accounts yet"));
    assert!(ui.output_contains("[ Router status ]"));
    assert_eq!(menu_lines(&ui).len(), 6);
    assert_eq!(ui.get_output().last().map(String::as_str), Some("Goodbye! 🐱"));
}

#[tokio::test]
async fn test_invalid_choice_reprompts() {
    let fixture = TestFixture::with_inputs(&["9", "4", "7"]);
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    let invalid = ui
        .get_output()
        .iter()
        .filter(|line| line.contains("Invalid option"))
        .count();
    assert_eq!(invalid, 2);
    assert_eq!(ui.get_prompts().len(), 3);
}

#[tokio::test]
async fn test_ctrl_c_at_menu_says_goodbye() {
    let fixture = TestFixture::with_inputs(&[TestUserInterface::INTERRUPT]);
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("Goodbye!"));
}

#[tokio::test]
async fn test_ctrl_c_inside_an_action_says_goodbye() {
    let fixture = TestFixture::with_inputs(&["1", TestUserInterface::INTERRUPT]);
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("Goodbye!"));
}

#[tokio::test]
async fn test_add_then_auto_sync() {
    let mut fixture = TestFixture::with_inputs(&["1", "session-1", "7"]);
    fixture
        .source
        .expect_resolve_display_name()
        .returning(|_| "136****8852".to_string());
    fixture
        .source
        .expect_resolve_key_info()
        .times(1)
        .returning(|_| Some(key_info("sk-1", "2025-03-17 12:00")));
    fixture.restarter.expect_restart().times(1).returning(|| RestartOutcome::Restarted {
        stdout: String::new(),
    });
    fixture.file_system.insert(CONFIG_PATH, r#"{"Providers": []}"#);
    let ui = fixture.ui.clone();
    let fs = fixture.file_system.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(fs.content(STORE_PATH).unwrap().contains("session-1"));
    assert!(fs.content(CONFIG_PATH).unwrap().contains("\"api_key\": \"sk-1\""));
    assert!(ui.output_contains("Syncing router config..."));
    // the second cycle shows the new account and offers delete
    assert_eq!(menu_lines(&ui).len(), 6 + 7);
}

#[tokio::test]
async fn test_smart_refresh_with_nothing_due_skips_sync() {
    let mut fixture = TestFixture::with_inputs(&["2", "7"]);
    fixture.file_system.insert(
        STORE_PATH,
        roster_json(&[credential("t", "sk", "n", "2025-03-20 12:00")]),
    );
    fixture.source.expect_resolve_key_info().never();
    fixture.restarter.expect_restart().never();
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("nothing to refresh"));
    assert!(!ui.output_contains("Syncing router config..."));
}

#[tokio::test]
async fn test_delete_then_auto_sync() {
    let mut fixture = TestFixture::with_inputs(&["4", "1", "y", "7"]);
    fixture.file_system.insert(
        STORE_PATH,
        roster_json(&[
            credential("t1", "sk-1", "first", "2025-03-20 12:00"),
            credential("t2", "sk-2", "second", "2025-03-20 12:00"),
        ]),
    );
    fixture.file_system.insert(CONFIG_PATH, r#"{"Providers": []}"#);
    fixture.restarter.expect_restart().times(1).returning(|| RestartOutcome::Restarted {
        stdout: String::new(),
    });
    let fs = fixture.file_system.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(!fs.content(STORE_PATH).unwrap().contains("first"));
    assert!(fs.content(CONFIG_PATH).unwrap().contains("\"api_key\": \"sk-2\""));
}

#[tokio::test]
async fn test_sync_failure_returns_to_menu() {
    let mut fixture = TestFixture::with_inputs(&["5", "7"]);
    fixture.restarter.expect_restart().never();
    let ui = fixture.ui.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("router config not found"));
    assert!(ui.output_contains("Goodbye!"));
}

#[tokio::test]
async fn test_malformed_store_keeps_menu_open() {
    let fixture = TestFixture::with_inputs(&["1", "7"]);
    fixture.file_system.insert(STORE_PATH, "{ broken");
    let ui = fixture.ui.clone();
    let fs = fixture.file_system.clone();

    execute_with_deps(&settings(), &fixture.to_deps())
        .await
        .unwrap();

    assert!(ui.output_contains("not valid JSON"));
    assert!(ui.output_contains("Invalid option"));
    assert_eq!(
        menu_lines(&ui),
        vec![
            "  [6] 🔧 Initialize router config".to_string(),
            "  [7] 🚪 Exit".to_string(),
        ]
    );
    assert!(ui.output_contains("Goodbye!"));
    assert_eq!(fs.content(STORE_PATH).as_deref(), Some("{ broken"));
    assert!(fs.writes().is_empty());
}
