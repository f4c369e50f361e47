use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::info;
use crate::cli::{Cli, Commands, FormulaCommand};
use crate::config::Settings;
use crate::formula::{check_duplicates, PackageDescriptor, Severity};
use crate::global::cache::ArchiveCache;
use crate::icons::LucideClient;
use crate::installer::{uninstall, Installer};
use crate::preview::render_preview;
use crate::remote::RemoteCatalog;
use crate::util::current_platform_suffix;

/// Formula location used by `formula check` when no path is given.
pub const DEFAULT_FORMULA_DIR: &str = "packaging/homebrew";

/// Runs one CLI invocation and returns what should be printed on stdout.
pub fn run_cli(cli: Cli) -> Result<String> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let dir = cli.dir.as_deref();
    match cli.command {
        Commands::List { search, limit, json } => {
            execute_list(&open_icons(&settings, dir)?, search.as_deref(), limit, json)
        }
        Commands::Search { query, json } => {
            execute_search(&open_icons(&settings, dir)?, &query, json)
        }
        Commands::Preview { icon, no_color } => {
            execute_preview(&open_icons(&settings, dir)?, &icon, !no_color)
        }
        Commands::Export { icons, out } => {
            let out = settings.output_dir(out.as_deref());
            execute_export(&open_icons(&settings, dir)?, &icons, &out)
        }
        Commands::ExportAll { out } => {
            let out = settings.output_dir(out.as_deref());
            execute_export_all(&open_icons(&settings, dir)?, &out)
        }
        Commands::Sync { out, api_url } => {
            execute_sync(&settings, out, api_url)
        }
        Commands::Clean => {
            execute_clean()
        }
        Commands::Formula(command) => {
            execute_formula(command)
        }
    }
}

fn open_icons(settings: &Settings, dir: Option<&Path>) -> Result<LucideClient> {
    let source = settings.icons_source(dir);
    info!(source = %source.display(), "opening icon set");
    LucideClient::new(&source)
        .with_context(|| format!("Could not open icon set {}", source.display()))
}

fn format_names(header: String, names: &[String], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(names)?);
    }
    let mut out = header;
    for name in names {
        write!(out, "\n  {name}")?;
    }
    Ok(out)
}

pub fn execute_list(
    client: &LucideClient,
    search: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<String> {
    let mut names = match search {
        Some(pattern) => client.search_icons(pattern),
        None => client.list_icons(),
    };
    if let Some(limit) = limit {
        names.truncate(limit);
    }
    format_names(format!("Found {} icons:", names.len()), &names, json)
}

pub fn execute_search(client: &LucideClient, query: &str, json: bool) -> Result<String> {
    let names = client.search_icons(query);
    format_names(
        format!("Found {} icons matching '{}':", names.len(), query),
        &names,
        json,
    )
}

pub fn execute_preview(client: &LucideClient, icon: &str, color: bool) -> Result<String> {
    let content = client.get_icon_content(icon)?;
    Ok(render_preview(crate::util::normalize_icon_name(icon), &content, color))
}

pub fn execute_export(client: &LucideClient, icons: &[String], out: &Path) -> Result<String> {
    let results = client.export_icons(icons, out)?;
    let mut report = String::new();
    let mut failed = 0;
    for (name, result) in &results {
        match result {
            Ok(_) => writeln!(report, "✓ {}", name.green())?,
            Err(e) => {
                writeln!(report, "✗ {}: {}", name.red(), e)?;
                failed += 1;
            }
        }
    }
    write!(
        report,
        "Exported {} of {} icons to {}",
        results.len() - failed,
        results.len(),
        out.display()
    )?;
    if failed == results.len() {
        bail!("{report}");
    }
    Ok(report)
}

pub fn execute_export_all(client: &LucideClient, out: &Path) -> Result<String> {
    let summary = client.export_all(out)?;
    let mut report = format!("Copied {} icons to {}", summary.exported, out.display());
    for (name, e) in &summary.failed {
        write!(report, "\n  failed {}: {}", name.red(), e)?;
    }
    Ok(report)
}

pub fn execute_sync(settings: &Settings, out: Option<PathBuf>, api_url: Option<String>) -> Result<String> {
    let dest = out
        .or_else(|| settings.icons_dir.clone().filter(|path| path.is_dir()))
        .context("No destination: pass --out or set `icons_dir` to a directory in the config")?;
    let mut catalog = RemoteCatalog::new();
    if let Some(user_agent) = &settings.user_agent {
        catalog = catalog.with_user_agent(user_agent.clone());
    }
    if let Some(api_url) = api_url {
        catalog = catalog.with_api_url(api_url);
    }
    let summary = catalog.sync(&dest)?;
    let mut report = format!(
        "Downloaded {} icons, {} already up to date, into {}",
        summary.downloaded,
        summary.skipped,
        dest.display()
    );
    for failure in &summary.failed {
        write!(report, "\n  failed {}", failure.red())?;
    }
    Ok(report)
}

pub fn execute_clean() -> Result<String> {
    let cache = ArchiveCache::global()?;
    cache.clean()?;
    Ok(format!("Cleaned {}", cache.dir().display()))
}

fn load_formulas(paths: &[PathBuf]) -> Result<Vec<PackageDescriptor>> {
    let defaults = [PathBuf::from(DEFAULT_FORMULA_DIR)];
    let paths = if paths.is_empty() { &defaults[..] } else { paths };
    let mut descriptors = Vec::new();
    for path in paths {
        if path.is_dir() {
            descriptors.extend(PackageDescriptor::load_dir(path)?);
        } else {
            descriptors.push(PackageDescriptor::load(path)?);
        }
    }
    Ok(descriptors)
}

fn load_release(file: &Path, version: Option<String>, sha256: Option<String>) -> Result<PackageDescriptor> {
    let descriptor = PackageDescriptor::load(file)?;
    Ok(match (version, sha256) {
        (Some(version), Some(sha256)) => descriptor.with_release(&version, &sha256),
        _ => descriptor,
    })
}

pub fn execute_formula(command: FormulaCommand) -> Result<String> {
    match command {
        FormulaCommand::Check { paths } => execute_formula_check(&paths),
        FormulaCommand::Render { file, version, sha256 } => {
            Ok(load_release(&file, version, sha256)?.render())
        }
        FormulaCommand::New { name, homepage, description, platform } => {
            let platform = platform.unwrap_or_else(current_platform_suffix);
            Ok(PackageDescriptor::template(&name, &description, &homepage, &platform).render())
        }
        FormulaCommand::Install { file, bin_dir, version, sha256, no_cache } => {
            let descriptor = load_release(&file, version, sha256)?;
            let installer = if no_cache { Installer::new().without_cache() } else { Installer::new() };
            let path = installer
                .install(&descriptor, &bin_dir)
                .with_context(|| format!("Installing {} failed", descriptor.name))?;
            Ok(format!("Installed {} to {}", descriptor.name, path.display()))
        }
        FormulaCommand::Uninstall { file, bin_dir } => {
            let descriptor = PackageDescriptor::load(&file)?;
            Ok(match uninstall(&descriptor, &bin_dir)? {
                true => format!("Removed {}", descriptor.install_target),
                false => format!("{} is not installed", descriptor.install_target),
            })
        }
    }
}

pub fn execute_formula_check(paths: &[PathBuf]) -> Result<String> {
    let descriptors = load_formulas(paths)?;
    if descriptors.is_empty() {
        bail!("No formulas found");
    }

    let mut report = String::new();
    let mut errors = 0;
    for descriptor in &descriptors {
        let issues = descriptor.validate();
        let status = if issues.is_empty() { "ok".green() } else { "issues".yellow() };
        writeln!(report, "{} ({}): {}", descriptor.name, descriptor.label(), status)?;
        for issue in &issues {
            if issue.severity == Severity::Error {
                errors += 1;
            }
            writeln!(report, "  {issue}")?;
        }
    }
    let conflicts = check_duplicates(&descriptors);
    for conflict in &conflicts {
        writeln!(report, "{}: {conflict}", "conflict".red())?;
    }
    errors += conflicts.len();
    write!(report, "Checked {} formulas: {} errors", descriptors.len(), errors)?;

    if errors > 0 {
        bail!("{report}");
    }
    Ok(report)
}
