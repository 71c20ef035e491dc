use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rtdb",
    about = "Read and write a hierarchical JSON tree database",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML client configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database root URL; overrides the configuration file
    #[arg(long, global = true, env = "RTDB_DATABASE_URL")]
    pub url: Option<String>,

    /// OAuth2 access token; overrides the configuration file
    #[arg(long, global = true, env = "RTDB_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read the value at a path
    Get(GetArgs),
    /// Overwrite the value at a path
    Set(SetArgs),
    /// Write selected children of a path
    Update(UpdateArgs),
    /// Append a value under a generated key
    Push(PushArgs),
    /// Remove the value at a path
    Delete(DeleteArgs),
    /// Run an ordered, filtered read
    Query(QueryArgs),
    /// Atomically add to a numeric value
    Incr(IncrArgs),
}

#[derive(Args)]
pub struct GetArgs {
    pub path: String,
    /// Also print the version token
    #[arg(long, conflicts_with = "shallow")]
    pub etag: bool,
    /// Only read one level below the path
    #[arg(long)]
    pub shallow: bool,
}

#[derive(Args)]
pub struct SetArgs {
    pub path: String,
    /// JSON value to store
    pub value: String,
    /// Only write if the current version token matches
    #[arg(long)]
    pub if_match: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub path: String,
    /// JSON object of relative child paths to values
    pub patch: String,
}

#[derive(Args)]
pub struct PushArgs {
    pub path: String,
    /// JSON value to store under the new key
    pub value: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    pub path: String,
}

#[derive(Args)]
#[command(group(
    clap::ArgGroup::new("ordering")
        .required(true)
        .args(["by_key", "by_value", "by_child"]),
))]
pub struct QueryArgs {
    pub path: String,
    #[arg(long)]
    pub by_key: bool,
    #[arg(long)]
    pub by_value: bool,
    /// Order by the value at this relative child path
    #[arg(long)]
    pub by_child: Option<String>,
    #[arg(long)]
    pub first: Option<u32>,
    #[arg(long)]
    pub last: Option<u32>,
    /// Lower bound, as JSON
    #[arg(long)]
    pub start_at: Option<String>,
    /// Upper bound, as JSON
    #[arg(long)]
    pub end_at: Option<String>,
    /// Exact match, as JSON
    #[arg(long)]
    pub equal_to: Option<String>,
}

#[derive(Args)]
pub struct IncrArgs {
    pub path: String,
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    pub by: f64,
}
