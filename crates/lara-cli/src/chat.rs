//! Interactive chat loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use colored::Colorize;
use lara_core::AppCore;
use lara_core::identity::{self, Identity};
use lara_core::models::TurnRole;
use lara_core::session::{ConversationSession, SessionLifecycle, SubmitRejected};
use tokio::io::{AsyncBufReadExt, BufReader};

const SESSION_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    SignIn(&'a str),
    SignOut,
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "signin" if !arg.is_empty() => Input::SignIn(arg),
        "signout" => Input::SignOut,
        "history" => Input::History,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line),
    }
}

pub async fn run(core: Arc<AppCore>, user: Option<String>) -> Result<()> {
    let hub = identity::global();
    let lifecycle = Arc::new(SessionLifecycle::new(core.session_services()));
    let follower = lifecycle.clone().attach(hub);
    let _subscription = hub.subscribe(|identity| match identity {
        Some(identity) => tracing::info!(user_id = %identity.user_id, "Identity changed"),
        None => tracing::info!("Identity cleared"),
    });

    println!("{}", "Lara - type /help for commands".bold());
    if let Some(user) = user {
        sign_in(&lifecycle, &user).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&lifecycle);
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::SignIn(user) => {
                if let Err(error) = sign_in(&lifecycle, user).await {
                    eprintln!("{} {}", "error:".red(), error);
                }
            }
            Input::SignOut => {
                sign_out(&lifecycle).await;
                println!("{}", "Signed out.".dimmed());
            }
            Input::History => match lifecycle.active() {
                Some(session) => print_history(&session),
                None => println!("{}", "Sign in first with /signin <user>.".yellow()),
            },
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Unknown(command) => {
                println!("{} {}", "Unknown command:".yellow(), command);
            }
            Input::Message(text) => {
                let Some(session) = lifecycle.active() else {
                    println!("{}", "Sign in first with /signin <user>.".yellow());
                    continue;
                };
                match session.submit(text).await {
                    Ok(reply) => println!("{} {}", "lara>".cyan().bold(), reply.content),
                    Err(SubmitRejected::Empty) => {}
                    Err(rejected) => println!("{}", rejected.to_string().yellow()),
                }
            }
        }
    }

    sign_out(&lifecycle).await;
    follower.abort();
    Ok(())
}

async fn sign_in(lifecycle: &SessionLifecycle, user: &str) -> Result<()> {
    identity::global().sign_in(Identity::new(user));

    let mut active = lifecycle.watch_active();
    let ready = tokio::time::timeout(
        SESSION_WAIT,
        active.wait_for(|session| session.as_ref().is_some_and(|s| s.user_id() == user)),
    )
    .await;

    match ready {
        Ok(Ok(session)) => {
            let turns = session.as_ref().map(|s| s.snapshot().len()).unwrap_or(0);
            println!(
                "{} {} ({} stored turns)",
                "Signed in as".green(),
                user.bold(),
                turns
            );
            Ok(())
        }
        _ => bail!("Could not open a conversation for {}", user),
    }
}

async fn sign_out(lifecycle: &SessionLifecycle) {
    if !identity::global().sign_out() {
        return;
    }
    let mut active = lifecycle.watch_active();
    if tokio::time::timeout(SESSION_WAIT, active.wait_for(Option::is_none))
        .await
        .is_err()
    {
        tracing::warn!("Timed out waiting for session to close");
    }
}

fn prompt(lifecycle: &SessionLifecycle) {
    let who = lifecycle
        .active()
        .map(|session| session.user_id().to_string())
        .unwrap_or_else(|| "guest".to_string());
    println!("{}", format!("{}>", who).blue());
}

fn print_history(session: &ConversationSession) {
    let conversation = session.snapshot();
    if conversation.has_summary() {
        println!("{}", "Summary so far:".bold());
        println!("{}\n", conversation.summary.dimmed());
    }
    for turn in conversation.unsummarized() {
        let label = match turn.role {
            TurnRole::User => "you>".blue(),
            TurnRole::Assistant => "lara>".cyan(),
            TurnRole::System => "system>".dimmed(),
        };
        println!("{} {}", label, turn.content);
    }
}

fn print_help() {
    println!("  /signin <user>  sign in and load your conversation");
    println!("  /signout        sign out");
    println!("  /history        show the current conversation");
    println!("  /quit           exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  hello  "), Input::Message("hello"));
        assert_eq!(parse_input("/signin alice"), Input::SignIn("alice"));
        assert_eq!(parse_input("/signin"), Input::Unknown("/signin"));
        assert_eq!(parse_input("/signout"), Input::SignOut);
        assert_eq!(parse_input("/exit"), Input::Quit);
        assert_eq!(parse_input("/dance now"), Input::Unknown("/dance now"));
    }
}
