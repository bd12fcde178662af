//! Interactive terminal front-end for a running chat server.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use radic_chat::conversation::{ConversationView, QuickAction, Role, Turn};
use radic_chat::{ChatBackend, RenderSegment};

/// What one line of terminal input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Quit,
    Help,
    QuickAction(QuickAction),
    /// Send whatever is in the draft.
    SendDraft,
    Send(String),
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::SendDraft;
    }
    match line.strip_prefix('/') {
        Some("quit") | Some("exit") => Input::Quit,
        Some("help") => Input::Help,
        Some(command) => match QuickAction::from_label(command) {
            Some(action) => Input::QuickAction(action),
            None => Input::Unknown(command.to_string()),
        },
        None => Input::Send(line.to_string()),
    }
}

/// Flatten segments for a plain terminal: links print as `label (url)`.
pub fn format_segments(segments: &[RenderSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            RenderSegment::Text { text } => out.push_str(text),
            RenderSegment::LineBreak => out.push('\n'),
            RenderSegment::Link { url, label } => {
                out.push_str(label);
                out.push_str(" (");
                out.push_str(url);
                out.push(')');
            }
        }
    }
    out
}

fn print_turn(turn: &Turn) {
    let speaker = match turn.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    println!("{}: {}\n", speaker, format_segments(&turn.segments()));
}

fn print_help() {
    let actions: Vec<String> = QuickAction::ALL
        .iter()
        .map(|a| format!("/{}", a.label().to_lowercase()))
        .collect();
    println!("Type a question and press Enter.");
    println!("Quick actions: {} (fills the draft, Enter sends it)", actions.join(", "));
    println!("/help shows this, /quit leaves.\n");
}

pub async fn run(backend: &dyn ChatBackend) -> anyhow::Result<()> {
    let mut view = ConversationView::new();
    if let Some(greeting) = view.transcript().last() {
        print_turn(greeting);
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Unknown(command) => println!("Unknown command /{}. Try /help.\n", command),
            Input::QuickAction(action) => {
                view.apply_quick_action(action);
                println!("Draft: {}\n", view.draft());
            }
            Input::SendDraft => send_draft(&mut view, backend).await,
            Input::Send(text) => {
                view.set_draft(text);
                send_draft(&mut view, backend).await;
            }
        }
    }

    tracing::debug!(turns = view.transcript().len(), "Chat session ended");
    Ok(())
}

async fn send_draft(view: &mut ConversationView, backend: &dyn ChatBackend) {
    if !view.can_send() {
        return;
    }
    println!("Assistant is typing...");
    if let Some(turn) = view.send(backend).await {
        print_turn(turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radic_chat::render;

    #[test]
    fn parses_commands_and_text() {
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input(" /Fees "), Input::QuickAction(QuickAction::Fees));
        assert_eq!(parse_input("/contact"), Input::QuickAction(QuickAction::Contact));
        assert_eq!(parse_input("/bogus"), Input::Unknown("bogus".into()));
        assert_eq!(parse_input(""), Input::SendDraft);
        assert_eq!(parse_input("  what are the fees? "), Input::Send("what are the fees?".into()));
    }

    #[test]
    fn links_print_with_label_and_url() {
        let text = format_segments(&render("**Apply** at https://www.icai.org/apply\nThanks"));
        assert_eq!(text, "Apply at icai.org/apply (https://www.icai.org/apply)\nThanks");
    }
}
