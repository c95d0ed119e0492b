use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "ideastack",
    version,
    about = "Track project ideas and their tasks"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $IDEASTACK_HOME, then ~/.ideastack)"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "file",
        help = "Storage backend"
    )]
    pub backend: BackendArg,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Idea(IdeaCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    Export(ExportArgs),
    Import(ImportArgs),
    /// Print a line whenever another process changes the stored data
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum IdeaCommand {
    Add(IdeaAdd),
    List(IdeaList),
    Show(IdeaShow),
    Update(IdeaUpdate),
    Status(IdeaStatus),
    Remove(IdeaRemove),
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List(TaskList),
    Done(TaskRef),
    Undo(TaskRef),
    Update(TaskUpdate),
    Remove(TaskRef),
}

#[derive(Args, Debug)]
pub struct IdeaAdd {
    pub title: String,
    #[arg(long, value_enum, ignore_case = true, default_value = "other")]
    pub category: CategoryArg,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, value_enum, ignore_case = true, default_value = "concept")]
    pub status: StatusArg,
    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Args, Debug)]
pub struct IdeaList {
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdeaShow {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct IdeaUpdate {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, value_enum, ignore_case = true)]
    pub category: Option<CategoryArg>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum, ignore_case = true)]
    pub status: Option<StatusArg>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args, Debug)]
pub struct IdeaStatus {
    pub id: String,
    #[arg(value_enum, ignore_case = true)]
    pub status: StatusArg,
}

#[derive(Args, Debug)]
pub struct IdeaRemove {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    pub idea_id: String,
    pub title: String,
    #[arg(long, value_name = "DATE", help = "RFC 3339 timestamp or YYYY-MM-DD")]
    pub due: Option<String>,
}

#[derive(Args, Debug)]
pub struct TaskList {
    #[arg(long, help = "Only open tasks due in the future")]
    pub upcoming: bool,
}

#[derive(Args, Debug)]
pub struct TaskRef {
    pub idea_id: String,
    pub task_id: String,
}

#[derive(Args, Debug)]
pub struct TaskUpdate {
    pub idea_id: String,
    pub task_id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
    pub due: Option<String>,
    #[arg(long)]
    pub clear_due: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, short, value_name = "PATH", help = "Write to a file instead of stdout")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(long, short, value_name = "PATH", help = "Read from a file instead of stdin")]
    pub file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BackendArg {
    File,
    Sqlite,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum CategoryArg {
    Business,
    Tech,
    Study,
    Investment,
    Personal,
    Other,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StatusArg {
    Concept,
    Prototype,
    Testing,
    Implementation,
}
