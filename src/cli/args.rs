use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Authoring document or persisted envelope record (JSON)
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// JSON array of statuses that replaces the document's own list
    #[arg(long, value_name = "FILE")]
    pub statuses: Option<PathBuf>,

    /// Directory holding flowbuilder.toml (default: current directory)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub workspace: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Authoring document or persisted envelope record (JSON)
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// JSON array of statuses that replaces the document's own list
    #[arg(long, value_name = "FILE")]
    pub statuses: Option<PathBuf>,

    /// Write the runtime steps here instead of stdout
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub output: Option<PathBuf>,

    /// Directory holding flowbuilder.toml (default: current directory)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub workspace: Option<PathBuf>,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Starting authoring document or persisted envelope record (JSON)
    #[arg(value_name = "DEFINITION")]
    pub definition: PathBuf,

    /// Builder events, one JSON object per line
    #[arg(value_name = "EVENTS")]
    pub events: PathBuf,

    /// Write the final session state (document + selection) here
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub state_output: Option<PathBuf>,

    /// Directory holding flowbuilder.toml (default: current directory)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub workspace: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Persisted record (JSON object) that may or may not carry an authoring document
    #[arg(value_name = "RECORD")]
    pub record: PathBuf,

    /// Write the authoring document here instead of stdout
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub output: Option<PathBuf>,

    /// Directory holding flowbuilder.toml (default: current directory)
    #[arg(long, value_name = "DIR", help_heading = "Configuration")]
    pub workspace: Option<PathBuf>,
}
