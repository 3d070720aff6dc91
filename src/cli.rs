use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Elasticsearch for your bookmarks", long_about = None)]
pub struct Args {
    /// Directory holding config.yaml
    /// [env: ELASTICBOOK_BASE_PATH]
    #[clap(long)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AliasAction {
    /// Bind an alias to a generation.
    /// Refused when the alias already points to another generation.
    Add { generation: String, alias: String },

    /// Unbind an alias from a generation
    Remove { generation: String, alias: String },

    /// Move the default search alias to a generation
    Default { generation: String },

    /// Remove an alias from every generation carrying it
    Unset { alias: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Check that the bookmarks export can be parsed
    Parse {
        /// Bookmarks export, defaults to the browser profile
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Count bookmarks per root folder
    Count {
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Only print the count of the root folder with this display name
        #[clap(long)]
        folder: Option<String>,
    },

    /// Index bookmarks into a new generation and promote it
    Index {
        #[clap(short, long)]
        file: Option<PathBuf>,

        /// Attempt every entry even after a failure
        #[clap(long, default_value = "false")]
        keep_going: bool,

        /// Leave the default alias where it is
        #[clap(long, default_value = "false")]
        no_promote: bool,
    },

    /// List generations, oldest first
    Generations {},

    /// List indices with document counts and aliases
    Indices {},

    /// List alias bindings
    Aliases {
        /// Print alias names only
        #[clap(long, default_value = "false")]
        names: bool,
    },

    /// Manage aliases
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },

    /// Delete a generation
    Delete {
        generation: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Show cluster health
    Health {},

    /// Show search engine version
    Version {},
}
