use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hivekit",
    about = "hivekit — inspect and edit hive files",
    version,
)]
pub struct Cli {
    /// Hive file to operate on
    pub hive: PathBuf,

    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Open the hive without write access
    #[arg(long, global = true)]
    pub read_only: bool,

    /// TOML file with open options
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new, empty hive file
    Init,
    /// List the subkeys and values of a key
    Ls(LsArgs),
    /// Print one value
    Get(GetArgs),
    /// Set one value, creating the key if needed
    Set(SetArgs),
    /// Delete one value
    RmValue(RmValueArgs),
    /// Delete a key and everything below it
    RmKey(RmKeyArgs),
    /// Print a whole subtree
    Dump(DumpArgs),
}

#[derive(Args)]
pub struct LsArgs {
    /// Key path, `\`-separated; empty for the root
    #[arg(default_value = "")]
    pub path: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub path: String,
    pub name: String,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("value")
        .required(true)
        .args(["dword", "string", "multi"]),
))]
pub struct SetArgs {
    pub path: String,
    pub name: String,
    /// Store a REG_DWORD
    #[arg(long, allow_negative_numbers = true)]
    pub dword: Option<i32>,
    /// Store a REG_SZ
    #[arg(long)]
    pub string: Option<String>,
    /// Store a REG_MULTI_SZ (zero or more items)
    #[arg(long, num_args = 0..)]
    pub multi: Option<Vec<String>>,
    /// Only write if the stored value differs
    #[arg(long)]
    pub if_changed: bool,
}

#[derive(Args)]
pub struct RmValueArgs {
    pub path: String,
    pub name: String,
}

#[derive(Args)]
pub struct RmKeyArgs {
    pub path: String,
}

#[derive(Args)]
pub struct DumpArgs {
    #[arg(default_value = "")]
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["hivekit", "SYSTEM", "init"]).unwrap();
        assert_eq!(cli.hive, PathBuf::from("SYSTEM"));
        assert!(matches!(cli.command, Command::Init));
    }

    #[test]
    fn parse_ls_defaults_to_root() {
        let cli = Cli::try_parse_from(["hivekit", "SYSTEM", "ls"]).unwrap();
        if let Command::Ls(args) = cli.command {
            assert_eq!(args.path, "");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_dword() {
        let cli = Cli::try_parse_from([
            "hivekit", "SYSTEM", "set", "Select", "Current", "--dword", "-1",
        ])
        .unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.path, "Select");
            assert_eq!(args.name, "Current");
            assert_eq!(args.dword, Some(-1));
            assert!(args.string.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_set_empty_multi() {
        let cli =
            Cli::try_parse_from(["hivekit", "SYSTEM", "set", "A", "List", "--multi"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.multi, Some(vec![]));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn set_requires_exactly_one_value() {
        assert!(Cli::try_parse_from(["hivekit", "SYSTEM", "set", "A", "B"]).is_err());
        assert!(Cli::try_parse_from([
            "hivekit", "SYSTEM", "set", "A", "B", "--dword", "1", "--string", "x"
        ])
        .is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "hivekit", "SYSTEM", "dump", "--read-only", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.read_only);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
