use std::path::PathBuf;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(name = "lucide-svg-rs", author, version, about, long_about = None)]
pub struct Cli {
    /// Icon set to use: a directory of SVGs or a `.tar`/`.tar.gz` archive.
    /// Defaults to the config file's `icons_dir`, then the bundled icons
    #[clap(long, global = true, env = "LUCIDE_ICONS_DIR")]
    pub dir: Option<PathBuf>,
    /// Config file to read instead of the per-user `config.toml`
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// More diagnostics on stderr (-v info, -vv debug)
    #[clap(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum Commands {
    /// List available icons
    List {
        /// Only list icons whose name contains this pattern
        #[clap(short, long)]
        search: Option<String>,
        /// Number of icons to display (default: all)
        #[clap(short, long)]
        limit: Option<usize>,
        /// Print a JSON array of names
        #[clap(long)]
        json: bool,
    },
    /// Search icons by name
    Search {
        query: String,
        /// Print a JSON array of names
        #[clap(long)]
        json: bool,
    },
    /// Preview an icon's SVG content
    Preview {
        /// Icon name, with or without `.svg`
        icon: String,
        /// Disable colored output
        #[clap(long)]
        no_color: bool,
    },
    /// Export specific icons by name
    Export {
        /// Icon names, with or without `.svg`
        #[clap(required = true)]
        icons: Vec<String>,
        /// Output directory
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// Export every icon of the set
    ExportAll {
        /// Output directory
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// Refresh a local icon directory from the upstream Lucide repository (needs network)
    Sync {
        /// Directory to download into
        #[clap(short, long)]
        out: Option<PathBuf>,
        /// Override the GitHub contents API URL
        #[clap(long)]
        api_url: Option<String>,
    },
    /// Remove cached release archives
    Clean,
    /// Work with the package descriptors this tool is distributed with
    #[command(subcommand)]
    Formula(FormulaCommand),
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum FormulaCommand {
    /// Check descriptors for consistency. Fails if any error or conflict is found
    Check {
        /// Formula files or directories (default: `packaging/homebrew`)
        paths: Vec<PathBuf>,
    },
    /// Print a formula, optionally populated for a release
    Render {
        file: PathBuf,
        #[clap(long, requires = "sha256")]
        version: Option<String>,
        #[clap(long, requires = "version")]
        sha256: Option<String>,
    },
    /// Print a templated formula for a new package
    New {
        name: String,
        #[clap(long)]
        homepage: String,
        #[clap(long, default_value = "Offline Lucide icons CLI and library")]
        description: String,
        /// Release artifact platform suffix (default: the host, e.g. `macos-x86_64`)
        #[clap(long)]
        platform: Option<String>,
    },
    /// Fetch, verify and install the binary a formula describes
    Install {
        file: PathBuf,
        /// Directory the binary is copied into
        #[clap(long)]
        bin_dir: PathBuf,
        #[clap(long, requires = "sha256")]
        version: Option<String>,
        #[clap(long, requires = "version")]
        sha256: Option<String>,
        /// Neither read nor write the archive cache
        #[clap(long)]
        no_cache: bool,
    },
    /// Remove the binary a formula installed
    Uninstall {
        file: PathBuf,
        #[clap(long)]
        bin_dir: PathBuf,
    },
}
