use serde::Deserialize;
use std::path::Path;

use crate::test::RunnerKind;

pub const DEFAULT_DEBUG_CONFIGURATION: &str = "Debug tests";

/// All configurable settings with their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TestrigSettings {
    /// Runner back-end. None = auto-detect from the workspace.
    pub runner_kind: Option<RunnerKind>,
    /// Replaces the adapter's fixed invocation tokens when set.
    pub runner_command: Option<Vec<String>>,
    /// Caller base arguments placed right after the `--` separator.
    pub runner_args: Vec<String>,
    /// Name of the attach configuration used by debug runs.
    pub debug_configuration: String,
}

impl Default for TestrigSettings {
    fn default() -> Self {
        Self {
            runner_kind: None,
            runner_command: None,
            runner_args: Vec::new(),
            debug_configuration: DEFAULT_DEBUG_CONFIGURATION.to_string(),
        }
    }
}

/// Raw JSON representation — all fields optional for partial overrides.
#[derive(Debug, Deserialize, Default)]
struct SettingsFile {
    #[serde(rename = "runner.kind")]
    runner_kind: Option<String>,
    #[serde(rename = "runner.command")]
    runner_command: Option<String>,
    #[serde(rename = "runner.args")]
    runner_args: Option<Vec<String>>,
    #[serde(rename = "debug.configuration")]
    debug_configuration: Option<String>,
}

/// Resolve settings: defaults → user global → project-local.
pub fn resolve(workspace_root: Option<&Path>) -> TestrigSettings {
    let global_path = dirs::home_dir()
        .map(|h| h.join(".testrig/settings.json"));
    let project_path = workspace_root
        .map(|r| r.join(".testrig/settings.json"));
    resolve_with_paths(
        global_path.as_deref(),
        project_path.as_deref(),
    )
}

/// Testable resolver that accepts explicit file paths (no home dir dependency).
fn resolve_with_paths(
    global_path: Option<&Path>,
    project_path: Option<&Path>,
) -> TestrigSettings {
    let mut settings = TestrigSettings::default();

    if let Some(path) = global_path {
        apply_file(&mut settings, path);
    }
    if let Some(path) = project_path {
        apply_file(&mut settings, path);
    }

    settings
}

fn apply_file(settings: &mut TestrigSettings, path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else { return };
    let Ok(file) = serde_json::from_str::<SettingsFile>(&content) else {
        tracing::warn!("Invalid settings file, ignoring: {}", path.display());
        return;
    };
    if let Some(kind) = file.runner_kind {
        match kind.parse::<RunnerKind>() {
            Ok(k) => settings.runner_kind = Some(k),
            Err(_) => tracing::warn!(
                "runner.kind ({}) is not a known runner, keeping {:?}",
                kind, settings.runner_kind
            ),
        }
    }
    if let Some(command) = file.runner_command {
        match shell_words::split(&command) {
            Ok(tokens) if !tokens.is_empty() => settings.runner_command = Some(tokens),
            _ => tracing::warn!("runner.command ({:?}) could not be split, ignoring", command),
        }
    }
    if let Some(args) = file.runner_args {
        settings.runner_args = args.into_iter().filter(|a| !a.is_empty()).collect();
    }
    if let Some(name) = file.debug_configuration {
        if name.trim().is_empty() {
            tracing::warn!("debug.configuration is empty, using {:?}", settings.debug_configuration);
        } else {
            settings.debug_configuration = name;
        }
    }
}
