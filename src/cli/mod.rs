pub mod args;
pub mod commands;

pub use args::{CompileArgs, ImportArgs, ReplayArgs, ValidateArgs};
use clap::{Parser, Subcommand};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "flowbuilder")]
#[command(version = crate::VERSION)]
#[command(about = "Validate, compile and replay workflow authoring documents")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a document, compile it to runtime steps, replay recorded builder events to audit the command log."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Report every validation issue in a document",
        long_about = "Validate runs every rule against the document and prints the issues as JSON. Exits non-zero when any issue is found.",
        after_help = "Example:\n    flowbuilder validate onboarding.json --statuses statuses.json"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Lower a document into runtime steps",
        long_about = "Compile validates the document and lowers its nested steps into the flat, goto-addressed runtime step list.",
        after_help = "Example:\n    flowbuilder compile onboarding.json --output runtime.json"
    )]
    Compile(CompileArgs),
    #[command(
        about = "Replay builder events and print the command log",
        long_about = "Replay dispatches a JSON-lines file of builder events through a session and prints the definition commands they produced.",
        after_help = "Example:\n    flowbuilder replay onboarding.json events.jsonl --state-output state.json"
    )]
    Replay(ReplayArgs),
    #[command(
        about = "Read the authoring document out of a persisted record",
        long_about = "Import reads an opaque record, upgrades legacy trigger shapes and rebuilds the document from runtime steps when the authoring key is missing.",
        after_help = "Example:\n    flowbuilder import record.json"
    )]
    Import(ImportArgs),
}

impl Command {
    /// Workspace directory named on the command line, if any.
    pub fn workspace(&self) -> Option<&Path> {
        match self {
            Command::Validate(args) => args.workspace.as_deref(),
            Command::Compile(args) => args.workspace.as_deref(),
            Command::Replay(args) => args.workspace.as_deref(),
            Command::Import(args) => args.workspace.as_deref(),
        }
    }
}

pub fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Validate(validate_args) => commands::validate(validate_args),
        Command::Compile(compile_args) => commands::compile(compile_args),
        Command::Replay(replay_args) => commands::replay(replay_args),
        Command::Import(import_args) => commands::import(import_args),
    }
}
