//! `vizier` command-line client
//!
//! Prints the notebook of a branch head and cancels running workflows.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vizier_client::{ApiClient, ClientConfig, ModulePoller, ReconciliationEngine, Session};
use vizier_notebook::{Notebook, NotebookCell};

const LOG_ENV: &str = "VIZIER_LOG";
const LOG_FORMAT_ENV: &str = "VIZIER_LOG_FORMAT";
const DEFAULT_FILTER: &str = "vizier=info,warn";

fn cli() -> Command {
    Command::new("vizier")
        .version(vizier_client::VERSION)
        .about("Vizier notebook client")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML configuration file"),
        )
        .subcommand(
            Command::new("show")
                .about("Print the cells of a branch head")
                .arg(
                    Arg::new("url")
                        .required(true)
                        .help("Branch head URL"),
                )
                .arg(
                    Arg::new("follow")
                        .long("follow")
                        .action(ArgAction::SetTrue)
                        .help("Wait for pending and running cells to settle"),
                ),
        )
        .subcommand(
            Command::new("cancel")
                .about("Cancel the running workflow of a branch head")
                .arg(
                    Arg::new("url")
                        .required(true)
                        .help("Branch head URL"),
                ),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(ClientConfig::default().with_env_overrides()),
    }
}

fn load_session(config: &ClientConfig) -> anyhow::Result<Arc<Session>> {
    let session = match &config.session_file {
        Some(path) => Session::load(path).with_context(|| format!("loading session {}", path.display()))?,
        None => Session::new(),
    };
    Ok(Arc::new(session))
}

/// `index state package.command output-tag [frozen]`
fn render_cell(notebook: &Notebook, index: usize, cell: &NotebookCell) -> String {
    let mut line = format!(
        "{index:>3} {:<8} {}.{} {}",
        cell.module.state,
        cell.module.command.package_id,
        cell.module.command.command_id,
        cell.output.tag()
    );
    if notebook.is_frozen(index) {
        line.push_str(" frozen");
    }
    line
}

fn print_notebook(notebook: &Notebook) {
    if notebook.workflow().read_only {
        println!("version {} (read-only)", notebook.workflow().version);
    } else {
        println!("version {}", notebook.workflow().version);
    }
    for (index, cell) in notebook.cells().enumerate() {
        println!("{}", render_cell(notebook, index, cell));
    }
}

async fn follow(api: Arc<ApiClient>, notebook: &Notebook) {
    let poller = ModulePoller::new(api);
    let mut watches = Vec::new();
    for cell in notebook.cells().filter(|c| c.module.is_active()) {
        watches.push(poller.watch(&cell.module));
    }
    for (handle, mut rx) in watches {
        while let Some(module) = rx.recv().await {
            println!("    {} {}", module.id, module.state);
        }
        handle.cancel();
    }
}

async fn show(api: Arc<ApiClient>, url: &str, follow_active: bool) -> anyhow::Result<()> {
    let json = api
        .fetch_workflow_json(url)
        .await
        .with_context(|| format!("fetching {url}"))?;
    let notebook = Notebook::from_workflow_json(&json);
    print_notebook(&notebook);

    if follow_active && notebook.cells().any(|c| c.module.is_active()) {
        follow(Arc::clone(&api), &notebook).await;
        let json = api.fetch_workflow_json(url).await?;
        print_notebook(&notebook.update_workflow(&json, None));
    }
    Ok(())
}

async fn cancel(api: Arc<ApiClient>, url: &str) -> anyhow::Result<()> {
    let json = api
        .fetch_workflow_json(url)
        .await
        .with_context(|| format!("fetching {url}"))?;
    let engine = ReconciliationEngine::new(api, Notebook::from_workflow_json(&json)).with_head_url(url);
    let notebook = engine.cancel_execution().await?;
    for error in engine.errors().entries() {
        eprintln!("{}: {}", error.title, error.message);
    }
    print_notebook(&notebook);
    Ok(())
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let session = load_session(&config)?;
    let api = Arc::new(ApiClient::with_reqwest(config.clone(), Arc::clone(&session))?);

    match matches.subcommand() {
        Some(("show", args)) => {
            let url = args.get_one::<String>("url").context("missing url")?;
            show(api, url, args.get_flag("follow")).await?;
        }
        Some(("cancel", args)) => {
            let url = args.get_one::<String>("url").context("missing url")?;
            cancel(api, url).await?;
        }
        _ => anyhow::bail!("unknown subcommand"),
    }

    if let Some(path) = &config.session_file {
        session.persist(path)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    run(cli().get_matches()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cli_parses_global_config() {
        let matches = cli()
            .try_get_matches_from(["vizier", "show", "http://x/head", "--config", "vizier.toml"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("vizier.toml"))
        );
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "show");
        assert!(!args.get_flag("follow"));
    }

    #[test]
    fn cells_after_failure_are_marked_frozen() {
        let notebook = Notebook::from_workflow_json(&json!({
            "version": "3",
            "modules": [
                {"id": "a", "state": 4, "command": {"packageId": "vizual", "commandId": "load"},
                 "stdout": [{"type": "text/plain", "value": "ok"}]},
                {"id": "b", "state": 3, "command": {"packageId": "sql", "commandId": "query"}},
                {"id": "c", "state": 0, "command": {"packageId": "vizual", "commandId": "dropDataset"}}
            ]
        }));
        let lines: Vec<String> = notebook
            .cells()
            .enumerate()
            .map(|(i, c)| render_cell(&notebook, i, c))
            .collect();
        assert_eq!(lines[0], "  0 SUCCESS  vizual.load text");
        assert!(lines[1].ends_with("frozen"));
        assert!(lines[2].starts_with("  2 PENDING  vizual.dropDataset"));
        assert!(lines[2].ends_with("frozen"));
    }
}
