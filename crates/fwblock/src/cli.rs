//! Clap derive structures for the `fwblock` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use fwblock_core::{Direction, EndpointType, GroupType};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fwblock -- batch block and unblock addresses on a cloud firewall
#[derive(Debug, Parser)]
#[command(
    name = "fwblock",
    version,
    about = "Batch block and unblock addresses on a cloud firewall",
    long_about = "Packs IPs, CIDRs and domains into managed address books, each guarded by\n\
        a deny control policy, and reports a per-address outcome for every batch.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (default: $FWBLOCK_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Firewall API endpoint URL (overrides config)
    #[arg(long, short = 'e', env = "FWBLOCK_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Region the firewall lives in
    #[arg(long, short = 'r', env = "FWBLOCK_REGION", global = true)]
    pub region: Option<String>,

    /// API key
    #[arg(long, env = "FWBLOCK_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FWBLOCK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Instance name used for the log file
    #[arg(long, env = "FWBLOCK_INSTANCE", global = true)]
    pub instance: Option<String>,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DirectionArg {
    /// Traffic entering the network
    In,
    /// Traffic leaving the network
    Out,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::In => Self::In,
            DirectionArg::Out => Self::Out,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GroupTypeArg {
    Ip,
    Domain,
    Port,
}

impl From<GroupTypeArg> for GroupType {
    fn from(t: GroupTypeArg) -> Self {
        match t {
            GroupTypeArg::Ip => Self::Ip,
            GroupTypeArg::Domain => Self::Domain,
            GroupTypeArg::Port => Self::Port,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EndpointTypeArg {
    Net,
    Group,
    Domain,
    Location,
}

impl From<EndpointTypeArg> for EndpointType {
    fn from(t: EndpointTypeArg) -> Self {
        match t {
            EndpointTypeArg::Net => Self::Net,
            EndpointTypeArg::Group => Self::Group,
            EndpointTypeArg::Domain => Self::Domain,
            EndpointTypeArg::Location => Self::Location,
        }
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Block a batch of addresses
    Block(BatchArgs),

    /// Unblock a batch of addresses
    Unblock(BatchArgs),

    /// Manage address books
    #[command(alias = "ab")]
    AddressBooks(AddressBooksArgs),

    /// Manage control policies
    #[command(alias = "acl")]
    Policies(PoliciesArgs),

    /// Run a named action with JSON parameters
    Action(ActionArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Addresses: IPs, CIDRs or domains, separated by commas, semicolons or whitespace
    #[arg(required = true, num_args = 1..)]
    pub addresses: Vec<String>,

    /// Traffic direction
    #[arg(long, short = 'd', value_enum)]
    pub direction: DirectionArg,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ADDRESS BOOKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AddressBooksArgs {
    #[command(subcommand)]
    pub command: AddressBooksCommand,
}

#[derive(Debug, Subcommand)]
pub enum AddressBooksCommand {
    /// List address books
    #[command(alias = "ls")]
    List {
        /// Name filter
        #[arg(long)]
        query: Option<String>,

        /// Only books of this type
        #[arg(long = "type", value_enum)]
        group_type: Option<GroupTypeArg>,
    },

    /// Create an address book
    Create {
        /// Book name
        #[arg(long)]
        name: String,

        /// Book type
        #[arg(long = "type", value_enum, default_value = "ip")]
        group_type: GroupTypeArg,

        /// Description (defaults to the name)
        #[arg(long)]
        description: Option<String>,

        /// Members, comma separated
        #[arg(long, value_delimiter = ',')]
        addresses: Vec<String>,
    },

    /// Replace an address book's members
    Update {
        /// Book UUID
        uuid: String,

        /// Book name
        #[arg(long)]
        name: String,

        /// Description (defaults to the name)
        #[arg(long)]
        description: Option<String>,

        /// Members, comma separated
        #[arg(long, value_delimiter = ',')]
        addresses: Vec<String>,
    },

    /// Delete an address book
    Delete {
        /// Book UUID
        uuid: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  POLICIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PoliciesArgs {
    #[command(subcommand)]
    pub command: PoliciesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PoliciesCommand {
    /// List control policies
    #[command(alias = "ls")]
    List {
        #[arg(long, short = 'd', value_enum)]
        direction: DirectionArg,

        /// Description filter
        #[arg(long)]
        description: Option<String>,
    },

    /// Create a control policy
    Create {
        #[arg(long, short = 'd', value_enum)]
        direction: DirectionArg,

        #[arg(long, value_enum)]
        source_type: EndpointTypeArg,

        #[arg(long)]
        source: String,

        #[arg(long, value_enum)]
        destination_type: EndpointTypeArg,

        #[arg(long)]
        destination: String,

        #[arg(long)]
        description: String,

        /// Policy action (default from config)
        #[arg(long)]
        action: Option<String>,

        /// Protocol (default from config)
        #[arg(long)]
        proto: Option<String>,

        /// Priority (default from config)
        #[arg(long)]
        priority: Option<i32>,
    },

    /// Delete a control policy
    Delete {
        /// Rule ID
        rule_id: String,

        #[arg(long, short = 'd', value_enum)]
        direction: DirectionArg,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACTION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ActionArgs {
    /// Action identifier, e.g. TestConnectivity or AutoBlockTask
    pub action_id: String,

    /// Parameters as a JSON object
    #[arg(long, short = 'p', conflicts_with = "params_file")]
    pub params: Option<String>,

    /// Read parameters from a JSON file
    #[arg(long, short = 'F')]
    pub params_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the merged configuration (API key masked)
    Show,

    /// Print the config file path in use
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
