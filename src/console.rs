//! Console front-end input
//!
//! Every stdin line is either a scanned value (what a keyboard-wedge scanner
//! types) or, when it starts with `:`, a UI action parsed by clap.

use clap::{CommandFactory, Parser, Subcommand};
use stockscan_core::ScanTarget;
use stockscan_workflow::{FieldId, ScreenId, StockMode};

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    /// Blank line.
    Empty,
    /// A value from the scanner.
    Scan(String),
    /// A UI action.
    Command(ConsoleCommand),
}

#[derive(Parser, Debug)]
#[command(
    name = ":",
    no_binary_name = true,
    disable_help_subcommand = true,
    about = "Scan by typing a value and pressing Enter, or run one of these"
)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

/// UI actions available from the console.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Switch screen (lookup, add, stock, move)
    #[command(alias = "s")]
    Screen { screen: ScreenId },

    /// Pick the field the next scan fills
    #[command(alias = "t")]
    Target {
        #[arg(value_parser = parse_target)]
        target: ScanTarget,
    },

    /// Type into a field without confirming; no text clears it
    Set {
        field: FieldId,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Type into a field and press Enter
    #[command(alias = "e")]
    Enter {
        field: FieldId,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Submit the form
    Submit,

    /// Stock screen direction (in, out)
    Mode { mode: StockMode },

    /// Clear the form
    Reset,

    /// Show the current form
    State,

    /// Scan a payload with the virtual camera
    #[command(alias = "camera")]
    Cam { payload: String },

    /// Cover the screen
    Suspend,

    /// Uncover the screen
    Resume,

    /// Press a hardware key
    Key { code: u32 },

    /// Bind the scanner trigger key
    Bind {
        code: u32,
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },

    /// Change the catalog server
    Server { url: String },

    /// Set the barcode lookup app code
    Appcode { code: String },

    /// Check the catalog server
    Health,

    /// List the commands
    #[command(aliases = ["h", "?"])]
    Help,

    #[command(aliases = ["q", "exit"])]
    Quit,
}

impl ConsoleInput {
    /// Parse one line
    ///
    /// Errors carry clap's rendered usage message.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleInput::Empty);
        }
        match line.strip_prefix(':') {
            Some(command) => ConsoleLine::try_parse_from(command.split_whitespace())
                .map(|parsed| ConsoleInput::Command(parsed.command))
                .map_err(|e| e.render().to_string().trim_end().to_string()),
            None => Ok(ConsoleInput::Scan(line.to_string())),
        }
    }
}

impl ConsoleCommand {
    /// Help text listing every command
    pub fn help() -> String {
        ConsoleLine::command().render_help().to_string()
    }
}

fn parse_target(text: &str) -> Result<ScanTarget, String> {
    match text.to_ascii_lowercase().as_str() {
        "primary" | "p" => Ok(ScanTarget::Primary),
        "secondary" | "s" => Ok(ScanTarget::Secondary),
        other => Err(format!("unknown target '{}'", other)),
    }
}
