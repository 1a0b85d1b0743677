//! Line-oriented exploration session on stdin/stdout.

use std::io::Write;

use anyhow::{Context, Result};
use delve_core::{NodeId, Session};
use delve_net::Explorer;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::render::render_node;

pub const HELP: &str = "\
Type a topic to explore it, or a follow-up number to ask that question.
  :back          previous node in history
  :forward       next node in history
  :nodes         list every node in this session
  :go <id>       jump to node <id>
  :help          this text
  :quit          leave";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Explore(String),
    FollowUp(usize),
    Back,
    Forward,
    Nodes,
    Go(NodeId),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if let Ok(n) = line.parse::<usize>() {
        return Command::FollowUp(n);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Explore(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("back" | "b"), None, _) => Command::Back,
        (Some("forward" | "f"), None, _) => Command::Forward,
        (Some("nodes" | "n"), None, _) => Command::Nodes,
        (Some("go"), Some(id), None) => match id.parse() {
            Ok(id) => Command::Go(id),
            Err(_) => Command::Unknown(line.to_string()),
        },
        (Some("help" | "h"), None, _) => Command::Help,
        (Some("quit" | "q"), None, _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Drive a session until `:quit` or end of input. Returns the session so
/// callers can inspect what was explored.
pub async fn run<R, W>(explorer: &Explorer, input: R, out: &mut W) -> Result<Session>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = Session::new();
    let mut lines = input.lines();
    writeln!(out, "{HELP}")?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Unknown(cmd) => writeln!(out, "unknown command: {cmd} (try :help)")?,
            Command::Explore(query) => {
                let (node, image) = explorer.explore(&mut session, &query).await;
                write!(out, "{}", render_node(node, Some(&image)))?;
            }
            Command::FollowUp(n) => {
                let question = session
                    .selected()
                    .and_then(|node| node.follow_up(n))
                    .map(str::to_string);
                match question {
                    Some(q) => {
                        writeln!(out, "-> {q}")?;
                        let (node, image) = explorer.explore(&mut session, &q).await;
                        write!(out, "{}", render_node(node, Some(&image)))?;
                    }
                    None => writeln!(out, "no follow-up question {n}")?,
                }
            }
            Command::Back => match session.back() {
                Some(node) => write!(out, "{}", render_node(node, None))?,
                None => writeln!(out, "already at the oldest node")?,
            },
            Command::Forward => match session.forward() {
                Some(node) => write!(out, "{}", render_node(node, None))?,
                None => writeln!(out, "already at the newest node")?,
            },
            Command::Go(id) => match session.select(id) {
                Some(node) => write!(out, "{}", render_node(node, None))?,
                None => writeln!(out, "no node {id}")?,
            },
            Command::Nodes => {
                if session.is_empty() {
                    writeln!(out, "(no nodes yet)")?;
                }
                let current = session.selected().map(|n| n.id);
                for node in session.nodes() {
                    let marker = if Some(node.id) == current { '*' } else { ' ' };
                    writeln!(out, "{marker} [{}] {}", node.id, node.title)?;
                }
            }
        }
    }

    writeln!(out)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use delve_net::{ImageLookup, LanguageModel, LookupConfig};

    /// Answers about whatever sits in the current-query tag.
    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, prompt: &str) -> delve_net::Result<String> {
            let query = prompt
                .split("<current_query>")
                .nth(1)
                .and_then(|s| s.split("</current_query>").next())
                .unwrap_or("")
                .trim()
                .to_string();
            Ok(serde_json::json!({
                "html_content": format!("<p>About {query}</p>"),
                "follow_up_questions": [format!("More on {query}?")],
                "image_queries": [""],
            })
            .to_string())
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    fn explorer() -> Explorer {
        // Blank image queries fall back to the user query; the lookup URL is
        // unroutable so every lookup fails fast without a fake server.
        let lookup = ImageLookup::new(LookupConfig {
            api_url: "http://127.0.0.1:9/w/api.php".into(),
            min_interval_ms: 1,
            request_timeout_ms: 500,
            ..LookupConfig::default()
        })
        .unwrap();
        Explorer::new(Arc::new(EchoModel), Arc::new(lookup))
    }

    async fn drive(script: &str) -> (Session, String) {
        let mut out = Vec::new();
        let session = run(&explorer(), script.as_bytes(), &mut out).await.unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("volcanoes"), Command::Explore("volcanoes".into()));
        assert_eq!(parse_command(" 2 "), Command::FollowUp(2));
        assert_eq!(parse_command(":back"), Command::Back);
        assert_eq!(parse_command(":f"), Command::Forward);
        assert_eq!(parse_command(":nodes"), Command::Nodes);
        assert_eq!(parse_command(":go 3"), Command::Go(3));
        assert_eq!(parse_command(":q"), Command::Quit);
        assert_eq!(parse_command(":go x"), Command::Unknown(":go x".into()));
        assert_eq!(parse_command(":back 2"), Command::Unknown(":back 2".into()));
    }

    #[test]
    fn test_number_inside_text_is_a_query() {
        assert_eq!(
            parse_command("apollo 11"),
            Command::Explore("apollo 11".into())
        );
    }

    #[tokio::test]
    async fn test_explore_then_follow_up() {
        let (session, out) = drive("volcanoes\n1\n:quit\n").await;
        assert_eq!(session.len(), 2);
        assert_eq!(session.nodes()[1].title, "More on volcanoes?");
        assert!(out.contains("[1] volcanoes"));
        assert!(out.contains("About volcanoes"));
        assert!(out.contains("-> More on volcanoes?"));
        assert!(out.contains("[2] More on volcanoes?"));
        assert!(out.contains("Image: (none:"));
    }

    #[tokio::test]
    async fn test_history_navigation() {
        let (session, out) = drive("a\nb\n:back\n:back\n:forward\n:go 1\n:nodes\n").await;
        assert_eq!(session.selected().unwrap().id, 1);
        assert!(out.contains("already at the oldest node"));
        assert!(out.contains("* [1] a"));
        assert!(out.contains("  [2] b"));
    }

    #[tokio::test]
    async fn test_bad_commands_are_reported() {
        let (session, out) = drive("5\n:go 9\n:frobnicate\n:nodes\n").await;
        assert!(session.is_empty());
        assert!(out.contains("no follow-up question 5"));
        assert!(out.contains("no node 9"));
        assert!(out.contains("unknown command: :frobnicate"));
        assert!(out.contains("(no nodes yet)"));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let (session, _) = drive("tides").await;
        assert_eq!(session.len(), 1);
    }
}
