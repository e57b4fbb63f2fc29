//! Interactive loops: one per view, each driving its manager alongside
//! stdin until Ctrl-C or end of input.

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use syncspace_collab::{
    ApiError, ChatRoom, DocumentSession, KanbanBoard, NotificationCenter, SessionContext,
    WorkspacePresence,
};
use syncspace_core::{Caret, NewTask};

use crate::render;

type Input = Lines<BufReader<Stdin>>;

fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

/// What the user asked for on one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    /// Plain text: a chat message, or the new document body.
    Text(String),
    Typing,
    Caret(usize),
    Append(String),
    Flush,
    Show,
    Move { task_id: String, column: String },
    Create(String),
    Delete(String),
    Reload,
    Open,
    Read,
    Clear,
    Unknown(String),
}

/// Lines starting with `/` are commands; anything else is text.
pub fn parse_action(line: &str) -> Action {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(command) = line.strip_prefix('/') else {
        return Action::Text(line.to_string());
    };
    let mut parts = command.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();
    match name {
        "quit" | "q" => Action::Quit,
        "help" => Action::Help,
        "typing" => Action::Typing,
        "caret" => match rest.parse() {
            Ok(offset) => Action::Caret(offset),
            Err(_) => Action::Unknown(line.to_string()),
        },
        "append" => Action::Append(rest.to_string()),
        "flush" => Action::Flush,
        "show" => Action::Show,
        "move" => match rest.split_once(' ') {
            Some((task_id, column)) => Action::Move {
                task_id: task_id.to_string(),
                column: column.trim().to_string(),
            },
            None => Action::Unknown(line.to_string()),
        },
        "create" if !rest.is_empty() => Action::Create(rest.to_string()),
        "delete" if !rest.is_empty() => Action::Delete(rest.to_string()),
        "reload" => Action::Reload,
        "open" => Action::Open,
        "read" => Action::Read,
        "clear" => Action::Clear,
        _ => Action::Unknown(line.to_string()),
    }
}

const CHAT_HELP: &str = "text sends a message; /typing, /quit";
const DOCUMENT_HELP: &str = "text replaces the body; /append <text>, /caret <n>, /flush, /show, /quit";
const BOARD_HELP: &str = "/move <task> <column>, /create <title>, /delete <task>, /reload, /show, /quit";
const NOTIFICATIONS_HELP: &str = "/open, /read, /clear, /show, /quit";

fn unknown(action: &Action, help: &str) {
    if let Action::Unknown(line) = action {
        println!("unknown command '{line}'");
    }
    println!("{help}");
}

/// Print every workspace the user belongs to with its projects and
/// documents. Uses only the REST API.
pub async fn directory(ctx: &SessionContext) -> Result<(), ApiError> {
    let workspaces = ctx.api.workspaces().await?;
    if workspaces.is_empty() {
        println!("No workspaces yet.");
        return Ok(());
    }
    let projects = ctx.api.projects().await?;
    for workspace in &workspaces {
        let documents = ctx.api.documents(&workspace.id).await.unwrap_or_else(|e| {
            log::warn!("Error loading documents of {}: {e}", workspace.id);
            Vec::new()
        });
        for line in render::workspace_entry(workspace, &ctx.identity().id, &projects, &documents) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn chat(ctx: SessionContext, workspace_id: &str) {
    let mut presence = WorkspacePresence::join(ctx.clone(), workspace_id).await;
    let mut room = ChatRoom::open(ctx, workspace_id).await;
    let mut input = stdin_lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                match parse_action(&line) {
                    Action::Quit => break,
                    Action::Text(text) => {
                        room.send(&text).await;
                    }
                    Action::Typing => room.input().await,
                    other => unknown(&other, CHAT_HELP),
                }
            }
            alive = room.step() => if !alive { break },
            alive = presence.step() => if !alive { break },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    room.close().await;
    presence.leave().await;
}

pub async fn document(ctx: SessionContext, document_id: &str) {
    let mut doc = DocumentSession::open(ctx, document_id).await;
    let mut input = stdin_lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                match parse_action(&line) {
                    Action::Quit => break,
                    Action::Text(text) => {
                        let caret = Caret::new(text.chars().count());
                        doc.edit(text, Some(caret)).await;
                    }
                    Action::Append(text) => {
                        let content = format!("{}{text}", doc.content());
                        let caret = Caret::new(content.chars().count());
                        doc.edit(content, Some(caret)).await;
                    }
                    Action::Caret(offset) => doc.move_caret(Caret::new(offset), "body"),
                    Action::Flush => {
                        if !doc.flush() {
                            println!("nothing to save");
                        }
                    }
                    Action::Show => {
                        println!("== {} ==", doc.title());
                        println!("{}", doc.content());
                    }
                    other => unknown(&other, DOCUMENT_HELP),
                }
            }
            alive = doc.step() => if !alive { break },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Keep the last edit rather than discarding it with the debounce.
    doc.flush();
    doc.run_for(std::time::Duration::from_millis(500)).await;
    doc.close().await;
}

pub async fn board(ctx: SessionContext, workspace_id: &str) {
    let mut presence = WorkspacePresence::join(ctx.clone(), workspace_id).await;
    let mut board = KanbanBoard::open(ctx, workspace_id).await;
    let mut input = stdin_lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                // Failures are already surfaced as toasts.
                match parse_action(&line) {
                    Action::Quit => break,
                    Action::Move { task_id, column } => {
                        board.begin_drag(&task_id);
                        let _ = board.drop_on(&column).await;
                    }
                    Action::Create(title) => {
                        let _ = board.create_task(NewTask::new(workspace_id, title)).await;
                    }
                    Action::Delete(task_id) => {
                        let _ = board.delete_task(&task_id).await;
                    }
                    Action::Reload => {
                        board.reload().await;
                    }
                    Action::Show => {
                        for view in board.state().columns() {
                            println!("{} ({})", view.column.title, view.tasks.len());
                            for task in view.tasks {
                                println!("  {} {} [{}]", task.id, task.title, task.priority);
                            }
                        }
                    }
                    other => unknown(&other, BOARD_HELP),
                }
            }
            alive = board.step() => if !alive { break },
            alive = presence.step() => if !alive { break },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    board.close();
    presence.leave().await;
}

pub async fn notifications(ctx: SessionContext) {
    let mut center = NotificationCenter::open(ctx).await;
    let mut input = stdin_lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Ok(Some(line)) = line else { break };
                match parse_action(&line) {
                    Action::Quit => break,
                    Action::Open => center.opened(),
                    Action::Read => center.mark_all_read().await,
                    Action::Clear => center.clear().await,
                    Action::Show => {
                        for n in &center.feed().notifications {
                            let marker = if n.read { ' ' } else { '*' };
                            println!("{marker} [{}] {}", n.kind, n.message);
                        }
                    }
                    other => unknown(&other, NOTIFICATIONS_HELP),
                }
            }
            alive = center.step() => if !alive { break },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}
