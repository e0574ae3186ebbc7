#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use testrig::test::debug_sync::{DebugEvent, DebugHost, DebugSession};
use testrig::test::launch_config::LaunchConfiguration;
use tokio::sync::broadcast;

pub const LAUNCH_JSON: &str = r#"{
    "version": "0.2.0",
    "configurations": [
        { "name": "Debug tests", "type": "chrome", "request": "attach", "port": 9333 }
    ]
}"#;

/// Create a workspace with optional launch.json and runner command override.
pub fn workspace(launch_json: Option<&str>, runner_command: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    if let Some(content) = launch_json {
        std::fs::create_dir_all(dir.path().join(".vscode")).unwrap();
        std::fs::write(dir.path().join(".vscode/launch.json"), content).unwrap();
    }
    let settings = serde_json::json!({ "runner.kind": "karma", "runner.command": runner_command });
    std::fs::create_dir_all(dir.path().join(".testrig")).unwrap();
    std::fs::write(dir.path().join(".testrig/settings.json"), settings.to_string()).unwrap();
    dir
}

pub fn session(id: &str, name: &str, parent: Option<&str>) -> DebugSession {
    DebugSession { id: id.into(), name: name.into(), parent_id: parent.map(String::from) }
}

/// Debugging service stand-in: events are pushed by the test, start/stop
/// calls are recorded.
pub struct FakeHost {
    pub events: broadcast::Sender<DebugEvent>,
    pub started: Mutex<Vec<String>>,
    pub stopped: Mutex<Vec<DebugSession>>,
    pub fail_start: bool,
}

impl FakeHost {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            started: Mutex::new(vec![]),
            stopped: Mutex::new(vec![]),
            fail_start: false,
        }
    }

    pub fn emit(&self, event: DebugEvent) {
        self.events.send(event).unwrap();
    }
}

impl DebugHost for FakeHost {
    fn subscribe(&self) -> broadcast::Receiver<DebugEvent> {
        self.events.subscribe()
    }

    fn start_debugging(&self, _workspace_root: &Path, configuration: &LaunchConfiguration) -> testrig::Result<()> {
        if self.fail_start {
            return Err(testrig::Error::DebugStartFailed("adapter not installed".to_string()));
        }
        self.started.lock().unwrap().push(configuration.name.clone());
        Ok(())
    }

    fn stop_debugging(&self, session: &DebugSession) {
        self.stopped.lock().unwrap().push(session.clone());
    }
}

/// Poll `check` every 10ms for up to 5s.
pub async fn eventually(mut check: impl FnMut() -> bool, what: &str) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}
