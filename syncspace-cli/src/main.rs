//! SyncSpace terminal client.
//!
//! Connects to the workspace event channel and REST API, opens one view
//! (chat, document, board or notifications), prints what the view renders
//! and reads user actions from stdin.

mod render;
mod session;

use clap::{Parser, Subcommand};
use log::info;
use tokio::sync::mpsc;

use syncspace_collab::{ApiError, ClientConfig, CollabError, SessionContext, Ui, UiEvent};
use syncspace_core::Identity;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("could not set up the session: {0}")]
    Setup(#[from] CollabError),
    #[error("could not list workspaces: {0}")]
    Directory(#[from] ApiError),
}

#[derive(Parser, Debug)]
#[command(name = "syncspace", about = "SyncSpace real-time workspace client")]
struct Cli {
    #[arg(long, env = "SYNCSPACE_WS_URL", default_value = "ws://localhost:5000/ws")]
    ws_url: String,

    #[arg(long, env = "SYNCSPACE_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    #[arg(long, env = "SYNCSPACE_TOKEN")]
    token: Option<String>,

    #[arg(long, env = "SYNCSPACE_USER_ID")]
    user_id: String,

    #[arg(long, env = "SYNCSPACE_USERNAME")]
    username: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Workspace chat room.
    Chat { workspace_id: String },
    /// Collaborative document editor.
    Document { document_id: String },
    /// Workspace kanban board.
    Board { workspace_id: String },
    /// Personal notification feed.
    Notifications,
    /// Workspaces with their projects and documents.
    Workspaces,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_url: self.ws_url.clone(),
            api_base_url: self.api_url.clone(),
            token: self.token.clone(),
            ..ClientConfig::default()
        }
    }
}

fn spawn_printer(mut ui_rx: mpsc::UnboundedReceiver<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = ui_rx.recv().await {
            for line in render::describe(&event) {
                println!("{line}");
            }
        }
    })
}

async fn run_view(ctx: &SessionContext, command: &Command) {
    let status = ctx.forward_status();

    // A failed first connect is reported as a status and retried on the
    // next emit, so the view still opens.
    if let Err(e) = ctx.connection.connect().await {
        log::warn!("Initial connect failed: {e}");
    }

    match command {
        Command::Chat { workspace_id } => session::chat(ctx.clone(), workspace_id).await,
        Command::Document { document_id } => session::document(ctx.clone(), document_id).await,
        Command::Board { workspace_id } => session::board(ctx.clone(), workspace_id).await,
        Command::Notifications => session::notifications(ctx.clone()).await,
        // Listed by `run` without a connection.
        Command::Workspaces => {}
    }

    ctx.connection.disconnect().await;
    status.abort();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let identity = Identity::new(cli.user_id.clone(), cli.username.clone());
    let (ui, ui_rx) = Ui::channel();
    let printer = spawn_printer(ui_rx);

    let ctx = SessionContext::from_config(&cli.client_config(), identity, ui)?;
    let result = match &cli.command {
        Command::Workspaces => session::directory(&ctx).await.map_err(CliError::from),
        view => {
            run_view(&ctx, view).await;
            Ok(())
        }
    };

    drop(ctx);
    let _ = printer.await;
    info!("Session closed");
    result
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    info!("Starting SyncSpace client as {}", cli.username);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_view_and_identity() {
        let cli = Cli::try_parse_from([
            "syncspace",
            "--user-id",
            "u1",
            "--username",
            "Ann",
            "--token",
            "abc",
            "document",
            "d1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Document { ref document_id } if document_id == "d1"));

        let config = cli.client_config();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.connection.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_cli_parses_workspaces() {
        let cli = Cli::try_parse_from(["syncspace", "--user-id", "u1", "--username", "Ann", "workspaces"])
            .unwrap();
        assert!(matches!(cli.command, Command::Workspaces));
    }

    #[test]
    fn test_cli_requires_identity() {
        let res = Cli::try_parse_from(["syncspace", "notifications"]);
        if std::env::var_os("SYNCSPACE_USER_ID").is_none() {
            assert!(res.is_err());
        }
    }
}
