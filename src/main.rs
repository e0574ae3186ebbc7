use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use testrig::test::continuous::{ChangeBus, ContinuousRun, TestTree};
use testrig::test::item::TestItem;
use testrig::test::{ProfileKind, RunContext, RunRequest, RunnerKind, RunningTests, TestRunner};
use testrig::{Error, Result};

#[derive(Parser)]
#[command(name = "testrig", version, about = "Run a selection of JS tests through karma or jest")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the runner command line for a selection
    Args(Selection),
    /// Run a selection once
    Run(Selection),
    /// Run, then re-run the affected tests whenever files change
    Watch(Selection),
}

#[derive(clap::Args)]
struct Selection {
    /// Workspace root
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
    /// Runner back-end, overrides settings and detection
    #[arg(long)]
    runner: Option<RunnerKind>,
    /// Run every test in a file (workspace-relative)
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<String>,
    /// Run one suite: `src/app.spec.ts=AppComponent`
    #[arg(long = "suite", value_name = "PATH=NAME")]
    suites: Vec<String>,
    /// Run one test by full name: `src/app.spec.ts=AppComponent should create`
    #[arg(long = "case", value_name = "PATH=FULL NAME")]
    cases: Vec<String>,
    #[arg(long)]
    coverage: bool,
    /// Pass the runner's own watch flag (ignored by `watch`)
    #[arg(long)]
    continuous: bool,
}

impl Selection {
    fn context(&self) -> RunContext {
        let mut settings = testrig::config::resolve(Some(&self.workspace));
        if self.runner.is_some() {
            settings.runner_kind = self.runner;
        }
        RunContext::new(&self.workspace, settings)
    }

    fn request(&self) -> Result<RunRequest> {
        let mut files: HashMap<String, Arc<TestItem>> = HashMap::new();
        let mut file_node = |path: &str| -> Arc<TestItem> {
            let node = files
                .entry(path.to_string())
                .or_insert_with(|| TestItem::file(&self.workspace, path));
            Arc::clone(node)
        };

        let mut include = vec![];
        for path in &self.files {
            include.push(file_node(path));
        }
        for spec in &self.suites {
            let (path, name) = split_selector(spec)?;
            include.push(TestItem::suite(&file_node(path), name));
        }
        for spec in &self.cases {
            let (path, name) = split_selector(spec)?;
            include.push(TestItem::case(&file_node(path), name));
        }

        let profile = if self.coverage { ProfileKind::Coverage } else { ProfileKind::Run };
        let mut request = RunRequest::selecting(include, profile);
        request.continuous = self.continuous;
        Ok(request)
    }
}

fn split_selector(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once('=') {
        Some((path, name)) if !path.is_empty() && !name.is_empty() => Ok((path, name)),
        _ => Err(Error::ValidationError(format!("expected PATH=NAME, got '{}'", spec))),
    }
}

/// Spec/test files under the workspace, one node per file.
struct WorkspaceTree {
    root: PathBuf,
}

impl TestTree for WorkspaceTree {
    fn file_item(&self, uri: &Path) -> Option<Arc<TestItem>> {
        let name = uri.file_name()?.to_str()?;
        if !(name.contains(".spec.") || name.contains(".test.")) || !uri.is_file() {
            return None;
        }
        let relative = uri.strip_prefix(&self.root).ok()?;
        Some(TestItem::file(&self.root, relative.to_string_lossy()))
    }
}

/// Forward the runner's output and wait for it to exit.
async fn forward_and_wait(mut running: RunningTests) -> Result<i32> {
    let stdout = running.child.stdout.take();
    let stderr = running.child.stderr.take();
    let out = tokio::spawn(async move {
        if let Some(mut stdout) = stdout {
            let _ = tokio::io::copy(&mut stdout, &mut tokio::io::stdout()).await;
        }
    });
    let err = tokio::spawn(async move {
        if let Some(mut stderr) = stderr {
            let _ = tokio::io::copy(&mut stderr, &mut tokio::io::stderr()).await;
        }
    });

    let status = running.wait().await?;
    let _ = tokio::join!(out, err);
    Ok(status.code().unwrap_or(1))
}

async fn watch(selection: &Selection) -> Result<()> {
    let ctx = selection.context();
    let runner = TestRunner::new();
    let request = selection.request()?;

    let bus = ChangeBus::new();
    let watcher = bus.watch(&ctx.workspace_root)?;
    let (tx, mut reruns) = mpsc::unbounded_channel();
    let tree = Arc::new(WorkspaceTree { root: ctx.workspace_root.clone() });
    let scheduler = ContinuousRun::spawn(request.clone(), &bus, tree, CancellationToken::new(), move |req| {
        let _ = tx.send(req);
    });

    let mut next = Some(request);
    'outer: while let Some(mut request) = next.take() {
        // Reruns come from the change bus, so each runner process runs once.
        request.continuous = false;
        match runner.start(&ctx, &request, None) {
            Ok(running) => tokio::select! {
                code = forward_and_wait(running) => match code {
                    Ok(code) => tracing::info!("Run finished with exit code {}", code),
                    Err(e) => tracing::warn!("Run failed: {}", e),
                },
                _ = tokio::signal::ctrl_c() => break 'outer,
            },
            Err(e) => tracing::warn!("Could not start run: {}", e),
        }
        tokio::select! {
            rerun = reruns.recv() => next = rerun,
            _ = tokio::signal::ctrl_c() => break 'outer,
        }
    }

    scheduler.cancel();
    watcher.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Args(selection) => {
            let ctx = selection.context();
            let runner = TestRunner::new();
            let adapter = runner.detect_adapter(&ctx.workspace_root, ctx.settings.runner_kind);
            let command = adapter.prepare_args(&ctx, &selection.request()?)?;
            println!("{}", command.command_line());
            Ok(())
        }
        Command::Run(selection) => {
            let ctx = selection.context();
            let running = TestRunner::new().start(&ctx, &selection.request()?, None)?;
            let code = forward_and_wait(running).await?;
            std::process::exit(code);
        }
        Command::Watch(selection) => watch(selection).await,
    }
}
