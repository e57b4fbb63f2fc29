//! Text rendering of presentation events.

use syncspace_collab::{ToastLevel, UiEvent};
use syncspace_core::{ChatMessage, DocumentSummary, ProjectSummary, WorkspaceSummary};

fn chat_line(message: &ChatMessage, own: bool) -> String {
    let time = message
        .timestamp
        .as_deref()
        .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    let author = if own { "you" } else { message.username.as_str() };
    format!("[{time}] {author}: {}", message.message)
}

/// Lines for one workspace of the directory listing.
pub fn workspace_entry(
    workspace: &WorkspaceSummary,
    user_id: &str,
    projects: &[ProjectSummary],
    documents: &[DocumentSummary],
) -> Vec<String> {
    let role = workspace.role_of(user_id).unwrap_or("member");
    let mut lines = vec![format!(
        "{} [{}] {} members, {role}",
        workspace.name,
        workspace.id,
        workspace.members.len()
    )];
    for project in projects.iter().filter(|p| p.workspace_id == workspace.id) {
        lines.push(format!(
            "  project {} ({} tasks, {}%)",
            project.name, project.tasks_count, project.progress
        ));
    }
    for doc in documents {
        lines.push(format!("  doc {} [{}]", doc.display_title(), doc.id));
    }
    lines
}

/// One or more terminal lines for `event`.
pub fn describe(event: &UiEvent) -> Vec<String> {
    match event {
        UiEvent::Toast { level, message } => {
            let tag = match level {
                ToastLevel::Info => "info",
                ToastLevel::Success => "ok",
                ToastLevel::Warning => "warn",
                ToastLevel::Error => "error",
            };
            vec![format!("({tag}) {message}")]
        }
        UiEvent::Connection { status, .. } => vec![format!("~ {}", status.label())],
        UiEvent::ChatLoaded { messages } => {
            if messages.is_empty() {
                return vec!["No messages yet. Start the conversation!".to_string()];
            }
            messages.iter().map(|m| chat_line(m, false)).collect()
        }
        UiEvent::ChatAppended { message, own } => vec![chat_line(message, *own)],
        UiEvent::TypingIndicator { username, typing, .. } => {
            if *typing {
                vec![format!("{username} is typing...")]
            } else {
                Vec::new()
            }
        }
        UiEvent::DocumentLoaded { title, content } => {
            let mut lines = vec![format!("== {title} ==")];
            lines.extend(content.lines().map(str::to_string));
            lines
        }
        UiEvent::DocumentReplaced { content, caret, author } => {
            let mut lines = vec![format!("-- updated by {author} --")];
            lines.extend(content.lines().map(str::to_string));
            if caret.is_none() {
                lines.push("(caret reset)".to_string());
            }
            lines
        }
        UiEvent::SaveStatus(status) => vec![format!("[{}]", status.label())],
        UiEvent::CursorMoved { username, position, .. } => {
            vec![format!("{username} @ {}", position.offset)]
        }
        UiEvent::ActiveUsers { online_count, users, .. } => {
            let names: Vec<&str> = users.iter().map(|u| u.username.as_str()).collect();
            vec![format!("{online_count} online: {}", names.join(", "))]
        }
        UiEvent::BoardRendered { columns } => columns
            .iter()
            .map(|(column, tasks)| format!("{column} ({}): {}", tasks.len(), tasks.join(" ")))
            .collect(),
        UiEvent::NotificationsChanged { badge, latest, .. } => {
            let mut lines = Vec::new();
            if let Some(n) = latest {
                lines.push(format!("* {}", n.message));
            }
            match badge {
                Some(badge) => lines.push(format!("[{badge} unread]")),
                None => lines.push("[no unread notifications]".to_string()),
            }
            lines
        }
    }
}
