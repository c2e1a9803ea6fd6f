use std::{path::PathBuf, thread};

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use gl_gimbal::{GimbalSnapshot, InterpretError, ManualCommand};
use gl_llm::GatewayError;
use prettytable::{Cell, Row, Table};
use rustyline::{error::ReadlineError, Editor};
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::session::{Session, SessionError};

/// Everything that can follow a leading `/`.
#[derive(Parser, Debug, PartialEq)]
#[clap(setting(clap::AppSettings::NoBinaryName))]
#[clap(rename_all = "kebab-case")]
enum ReplCommand {
    #[clap(flatten)]
    Manual(ManualCommand),

    /// show the current gimbal state
    Status,

    /// leave the program
    Exit,
}

#[derive(Debug, PartialEq)]
enum Input {
    Empty,
    Text(String),
    Command(ReplCommand),
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

fn parse_line(line: &str) -> Input {
    let line = line.trim();

    if line.is_empty() {
        return Input::Empty;
    }

    match line.strip_prefix('/') {
        Some(rest) => match ReplCommand::try_parse_from(rest.split_ascii_whitespace()) {
            Ok(command) => Input::Command(command),
            Err(err) => Input::Invalid(err.to_string()),
        },
        None => Input::Text(line.to_owned()),
    }
}

fn script_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn error_label(err: &SessionError) -> &'static str {
    match err {
        SessionError::Interpret(InterpretError::Unrecognized(_)) => "not understood",
        SessionError::Interpret(InterpretError::AmbiguousMagnitude(_)) => "ambiguous",
        SessionError::Interpret(InterpretError::OutOfRangeRequest { .. }) => "out of range",
        SessionError::Gateway(GatewayError::Unavailable { .. }) => "llm unavailable",
        SessionError::Gateway(GatewayError::Timeout { .. }) => "llm timed out",
        SessionError::Gimbal(_) => "gimbal error",
    }
}

fn report(result: Result<GimbalSnapshot, SessionError>) {
    match result {
        Ok(snapshot) => println!(
            "{} {} ({})",
            "ok".green().bold(),
            snapshot.state,
            snapshot.status
        ),
        Err(err) => {
            debug!("request failed: {:?}", err);
            println!("{} {}", error_label(&err).red().bold(), err);
        }
    }
}

fn print_status(snapshot: &GimbalSnapshot) {
    let last_command = snapshot
        .last_command
        .as_ref()
        .map_or_else(|| "none".to_owned(), ToString::to_string);

    let mut table = Table::new();
    let rows = [
        ("pan", format!("{:.1}°", snapshot.state.pan_degrees())),
        ("tilt", format!("{:.1}°", snapshot.state.tilt_degrees())),
        ("speed", snapshot.state.speed().to_string()),
        ("status", snapshot.status.to_string()),
        ("last command", last_command),
        ("updates", snapshot.sequence.to_string()),
        ("updated at", snapshot.at.format("%H:%M:%S%.3f").to_string()),
    ];

    for (name, value) in rows {
        table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
    }

    table.printstd();
}

async fn handle_line(session: &mut Session, line: &str) -> Flow {
    match parse_line(line) {
        Input::Empty => {}
        Input::Invalid(message) => println!("{}", message),
        Input::Command(ReplCommand::Exit) => return Flow::Exit,
        Input::Command(ReplCommand::Status) => match session.status().await {
            Ok(snapshot) => print_status(&snapshot),
            Err(err) => report(Err(err)),
        },
        Input::Command(ReplCommand::Manual(manual)) => {
            let command = manual.into_command(session.manual_step());
            report(session.submit_manual(command).await);
        }
        Input::Text(text) => report(session.submit_text(&text).await),
    }

    Flow::Continue
}

/// Like [`handle_line`], but gives up as soon as `cancel` fires, so a slow
/// LLM call doesn't hold up shutdown. `None` means cancelled.
async fn handle_line_until_cancelled(
    session: &mut Session,
    line: &str,
    cancel: &CancellationToken,
) -> Option<Flow> {
    select! {
        _ = cancel.cancelled() => None,
        flow = handle_line(session, line) => Some(flow),
    }
}

/// Runs the line editor on its own thread. After each line it waits for an
/// acknowledgement, so nothing new can be typed while a request is running.
fn spawn_reader(prompt: String) -> (flume::Receiver<String>, flume::Sender<()>) {
    let (line_tx, line_rx) = flume::bounded(1);
    let (ack_tx, ack_rx) = flume::bounded::<()>(1);

    thread::spawn(move || {
        let mut editor = Editor::<()>::new();

        loop {
            match editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        editor.add_history_entry(line.as_str());
                    }

                    if line_tx.send(line).is_err() || ack_rx.recv().is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    error!("interactive error: {:#?}", err);
                    break;
                }
            }
        }
    });

    (line_rx, ack_tx)
}

pub async fn run_interactive_cli(
    mut session: Session,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    println!(
        "talking to {}. type what the gimbal should do, or /help for manual commands",
        session.backend().bold()
    );

    let (line_rx, ack_tx) = spawn_reader(format!("{}> ", session.backend()));

    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                break;
            }
            line = line_rx.recv_async() => {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => {
                        info!("input closed");
                        break;
                    }
                };

                let flow =
                    handle_line_until_cancelled(&mut session, &line, &cancellation_token).await;

                // reader may already be gone
                let _ = ack_tx.send(());

                if flow != Some(Flow::Continue) {
                    info!("exiting");
                    break;
                }
            }
        }
    }

    cancellation_token.cancel();

    Ok(())
}

pub async fn run_script(
    mut session: Session,
    path: PathBuf,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read script {:?}", path))?;

    for line in script_lines(&text) {
        println!("{} {}", ">".dimmed(), line);

        let flow = handle_line_until_cancelled(&mut session, line, &cancellation_token).await;
        if flow != Some(Flow::Continue) {
            break;
        }
    }

    cancellation_token.cancel();

    Ok(())
}
