//! # lucide-svg-rs
//!
//! Offline access to the [Lucide](https://lucide.dev) icon set, as a library and
//! as the `lucide-svg-rs` CLI.
//!
//! Icons are read from a local directory of SVGs or a `.tar`/`.tar.gz` archive;
//! a small set ships with the crate under [`ICONS_DIR`]. Nothing touches the
//! network except the explicit `sync` refresh and `formula install`.
//!
//! ## Modules Overview
//! - [`icons`] – Loading an icon set, listing, searching and exporting icons
//! - [`preview`] – Terminal previews of SVG content
//! - [`remote`] – Refreshing a local icon directory from the upstream repository
//! - [`formula`] – Package descriptors (Homebrew formulas): parsing, rendering, consistency checks
//! - [`installer`] – Fetch, checksum verification and install of a descriptor's binary
//! - [`config`] – The optional `config.toml`
//! - [`global`] – Per-user directories and the release archive cache
//! - [`util`] – Shared helpers (hashing, versions, names)

pub mod cli;
pub mod config;
pub mod error;
pub mod execute;
pub mod formula;
pub mod global;
pub mod icons;
pub mod installer;
pub mod logging;
pub mod preview;
pub mod remote;
pub mod util;

pub use cli::*;
pub use config::*;
pub use error::*;
pub use execute::run_cli;
pub use formula::*;
pub use global::cache::*;
pub use icons::*;
pub use installer::*;
pub use remote::*;
pub use util::*;
