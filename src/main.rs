//! StockScan console
//!
//! Usage:
//!     stockscan --config ./stockscan.toml --screen stock
//!
//! Lines typed on stdin are scans, as a keyboard-wedge scanner would send
//! them; lines starting with `:` are actions (see `:help`).

use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stockscan::{
    init_logging, App, ConsoleCommand, ConsoleInput, FeedbackSink, FieldId, PublishOutcome,
    ScreenId, TriggerAction, WorkflowEvent, WorkflowState, BUILD_DATE, VERSION,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(name = "stockscan", version, about = "Barcode-driven stock handling")]
struct Args {
    /// Settings file (TOML or JSON); defaults to the user config directory
    #[arg(long, env = "STOCKSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Screen to open at start
    #[arg(long, default_value = "lookup")]
    screen: ScreenId,
}

/// Terminal bell as the confirmation cue.
struct TerminalBell;

impl FeedbackSink for TerminalBell {
    fn play_confirmation(&self) {
        eprint!("\x07");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = Args::parse();
    tracing::info!("StockScan {} (built {})", VERSION, BUILD_DATE);

    let app = App::open(args.config, Arc::new(TerminalBell))?;
    for screen in ScreenId::ALL {
        let events = app.registry().handle(screen)?.subscribe();
        tokio::spawn(print_events(screen, events));
    }
    app.open_screen(args.screen)?;
    println!("StockScan {} on the {} screen, :help for commands", VERSION, args.screen);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ConsoleInput::parse(&line) {
                    Ok(ConsoleInput::Empty) => {}
                    Ok(ConsoleInput::Scan(raw)) => scan(&app, &raw),
                    Ok(ConsoleInput::Command(ConsoleCommand::Quit)) => break,
                    Ok(ConsoleInput::Command(command)) => {
                        if let Err(e) = run(&app, command).await {
                            println!("! {}", e);
                        }
                    }
                    Err(e) => println!("! {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    app.shutdown();
    Ok(())
}

fn scan(app: &App, raw: &str) {
    match app.wedge_scan(raw) {
        Ok(PublishOutcome::Duplicate) => println!("(same value as the last scan, ignored)"),
        Ok(PublishOutcome::Retained) => println!("(held until a screen is listening)"),
        Ok(PublishOutcome::Delivered(_)) => {}
        Err(e) => println!("! {}", e),
    }
}

async fn run(app: &App, command: ConsoleCommand) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Screen { screen } => {
            app.open_screen(screen)?;
            println!("screen: {}", screen);
        }
        ConsoleCommand::Target { target } => sent(app.active()?.select_target(target))?,
        ConsoleCommand::Set { field, text } => {
            sent(app.active()?.edit(field, text.join(" ")))?
        }
        ConsoleCommand::Enter { field, text } => {
            sent(app.active()?.enter(field, text.join(" ")))?
        }
        ConsoleCommand::Submit => sent(app.active()?.submit())?,
        ConsoleCommand::Mode { mode } => sent(app.active()?.set_mode(mode))?,
        ConsoleCommand::Reset => sent(app.active()?.reset())?,
        ConsoleCommand::State => {
            let handle = app.active()?;
            print_state(handle.name(), &handle.snapshot().await?);
        }
        ConsoleCommand::Cam { payload } => match app.camera_scan(&payload).await? {
            Some(value) => println!("camera read '{}'", value),
            None => println!("camera saw nothing"),
        },
        ConsoleCommand::Suspend => app.registry().suspend(),
        ConsoleCommand::Resume => app.registry().resume()?,
        ConsoleCommand::Key { code } => match app.press_key(code) {
            Some(TriggerAction::OpenScanner(screen)) => {
                println!("trigger: scanner opened on the {} screen", screen)
            }
            None => println!("key {} does nothing", code),
        },
        ConsoleCommand::Bind { code, name } => {
            let name = name.join(" ");
            app.bind_trigger_key(code, &name)?;
            println!("trigger key bound to {} ({})", name, code);
        }
        ConsoleCommand::Server { url } => app.set_server_address(&url)?,
        ConsoleCommand::Appcode { code } => {
            app.set_barcode_app_code(&code)?;
            println!("app code saved");
        }
        ConsoleCommand::Health => match app.health().await {
            Ok(message) => println!("server: {}", message),
            Err(e) => println!("! {}", e.user_message()),
        },
        ConsoleCommand::Help => println!("{}", ConsoleCommand::help()),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

fn sent(delivered: bool) -> anyhow::Result<()> {
    if !delivered {
        bail!("the screen has stopped");
    }
    Ok(())
}

async fn print_events(screen: ScreenId, mut events: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match events.recv().await {
            Ok(WorkflowEvent::Notice(notice)) => {
                println!("[{}] {:?}: {}", screen, notice.level(), notice.message())
            }
            Ok(event) => println!("[{}] {}", screen, event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("{} screen: {} event(s) not shown", screen, n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_state(name: &str, state: &WorkflowState) {
    println!(
        "{}: {} (next scan -> {}, mode {})",
        name, state.phase, state.current_target, state.mode
    );
    for field in FieldId::ALL {
        if let Some(value) = state.value(field) {
            println!("  {:<9} {}", field.name(), value);
        }
    }
    if let Some(item) = &state.item {
        println!(
            "  item      {} '{}' qty {} at {}",
            item.code,
            item.name,
            item.quantity,
            item.known_location().unwrap_or("-")
        );
    }
}
