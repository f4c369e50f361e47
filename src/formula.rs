//! Package descriptors: the Homebrew formulas this project is distributed with.
//!
//! A descriptor says where a release archive lives, what it must hash to, and
//! which file inside it is the binary. Descriptors are authored once per release
//! and never mutated; [`PackageDescriptor::with_release`] returns a new value.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use regex::Regex;
use reqwest::Url;
use walkdir::WalkDir;
use crate::error::FormulaError;
use crate::util::{
    format_hash, is_valid_checksum, is_valid_version, url_file_name, CHECKSUM_PLACEHOLDER,
    VERSION_PLACEHOLDER,
};

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*class\s+([A-Z][A-Za-z0-9]*)\s*<\s*Formula\b").expect("valid class regex")
});

static INSTALL_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*bin\.install\s+(?:'([^']*)'|"((?:[^"\\]|\\.)*)")"#)
        .expect("valid install regex")
});

static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9+._-]*$").expect("valid name regex"));

fn field_regex(key: &str) -> Regex {
    Regex::new(&format!(r#"(?m)^\s*{key}\s+(?:'([^']*)'|"((?:[^"\\]|\\.)*)")"#))
        .expect("valid field regex")
}

fn quoted(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    match (caps.get(1), caps.get(2)) {
        (Some(single), _) => Some(single.as_str().to_string()),
        (None, Some(double)) => Some(unescape(double.as_str())),
        (None, None) => None,
    }
}

/// Escapes a value for a Ruby double-quoted string literal.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '"' => {
                out.push('\\');
                out.push(c);
            }
            '#' if matches!(chars.peek(), Some(&('{' | '$' | '@'))) => out.push_str("\\#"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]. Other escape sequences are kept verbatim.
fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '"' | '#')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// `LucideSvgRs` → `lucide-svg-rs`.
pub fn class_to_name(class: &str) -> String {
    let mut name = String::with_capacity(class.len() + 4);
    for (i, c) in class.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                name.push('-');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// `lucide-svg-rs` → `LucideSvgRs`.
pub fn name_to_class(name: &str) -> String {
    name.split(['-', '_', '.', '+'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Declarative record describing how to fetch and install one prebuilt package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Package identifier, e.g. `lucide-svg-rs`.
    pub name: String,
    pub description: String,
    /// Informational only.
    pub homepage: String,
    /// Release version, or [`VERSION_PLACEHOLDER`] while templated.
    pub version: String,
    /// Download URL with [`VERSION_PLACEHOLDER`] where the version goes.
    pub url_template: String,
    /// Expected SHA-256 of the archive, or [`CHECKSUM_PLACEHOLDER`] while templated.
    pub checksum: String,
    /// The one file copied into the binary directory.
    pub install_target: String,
    /// File the descriptor was loaded from, if any.
    pub origin: Option<PathBuf>,
}

impl PackageDescriptor {
    /// A templated descriptor for a GitHub-style release layout:
    /// `<homepage>/releases/download/v<VERSION>/<name>-<platform>.zip`.
    pub fn template(name: &str, description: &str, homepage: &str, platform: &str) -> Self {
        let url_template = format!(
            "{}/releases/download/v{}/{}-{}.zip",
            homepage.trim_end_matches('/'),
            VERSION_PLACEHOLDER,
            name,
            platform
        );
        Self {
            name: name.to_string(),
            description: description.to_string(),
            homepage: homepage.to_string(),
            version: VERSION_PLACEHOLDER.to_string(),
            url_template,
            checksum: CHECKSUM_PLACEHOLDER.to_string(),
            install_target: name.to_string(),
            origin: None,
        }
    }

    /// Reads a formula from its Ruby source.
    ///
    /// Single and double quoted strings are both accepted. A concrete URL is
    /// turned back into a template by replacing the literal version.
    ///
    /// # Errors
    /// Returns an error if the class declaration or a required field is missing.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        let class = CLASS_DECL
            .captures(text)
            .map(|caps| caps[1].to_string())
            .ok_or(FormulaError::MissingClass)?;
        let required = |key: &'static str| {
            quoted(&field_regex(key), text).ok_or_else(|| FormulaError::MissingField {
                class: class.clone(),
                field: key,
            })
        };

        let description = required("desc")?;
        let homepage = required("homepage")?;
        let version = required("version")?;
        let url = required("url")?;
        let checksum = required("sha256")?;
        let install_target = quoted(&INSTALL_STEP, text).ok_or_else(|| FormulaError::MissingField {
            class: class.clone(),
            field: "bin.install",
        })?;

        let url_template = if version != VERSION_PLACEHOLDER && !version.is_empty() {
            url.replace(&version, VERSION_PLACEHOLDER)
        } else {
            url
        };

        Ok(Self {
            name: class_to_name(&class),
            description,
            homepage,
            version,
            url_template,
            checksum,
            install_target,
            origin: None,
        })
    }

    /// Loads a formula file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormulaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| FormulaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut descriptor = Self::parse(&text)?;
        descriptor.origin = Some(path.to_path_buf());
        Ok(descriptor)
    }

    /// Loads every `*.rb` formula below `dir`, in path order.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Self>, FormulaError> {
        let mut descriptors = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let is_formula = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "rb");
            if is_formula {
                descriptors.push(Self::load(entry.path())?);
            }
        }
        Ok(descriptors)
    }

    pub fn is_version_populated(&self) -> bool {
        self.version != VERSION_PLACEHOLDER
    }

    pub fn is_checksum_populated(&self) -> bool {
        self.checksum != CHECKSUM_PLACEHOLDER
    }

    /// Both the version and the checksum are concrete.
    pub fn is_populated(&self) -> bool {
        self.is_version_populated() && self.is_checksum_populated()
    }

    /// The download URL with the version substituted.
    /// While templated, the template itself is returned.
    pub fn download_url(&self) -> String {
        if self.is_version_populated() {
            self.url_template.replace(VERSION_PLACEHOLDER, &self.version)
        } else {
            self.url_template.clone()
        }
    }

    /// Archive file name, taken from the last URL segment.
    pub fn archive_name(&self) -> Option<String> {
        url_file_name(&self.download_url()).map(str::to_string)
    }

    /// Returns a copy populated for a concrete release.
    pub fn with_release(&self, version: &str, checksum: &str) -> Self {
        Self {
            version: version.to_string(),
            checksum: format_hash(checksum),
            ..self.clone()
        }
    }

    /// The Homebrew class name for this package.
    pub fn class_name(&self) -> String {
        name_to_class(&self.name)
    }

    /// Emits the formula source.
    pub fn render(&self) -> String {
        format!(
            "class {class} < Formula\n  desc \"{desc}\"\n  homepage \"{homepage}\"\n  version \"{version}\"\n  url \"{url}\"\n  sha256 \"{sha}\"\n\n  def install\n    bin.install \"{target}\"\n  end\nend\n",
            class = self.class_name(),
            desc = escape(&self.description),
            homepage = escape(&self.homepage),
            version = escape(&self.version),
            url = escape(&self.download_url()),
            sha = escape(&self.checksum),
            target = escape(&self.install_target),
        )
    }

    /// Data-consistency checks for this descriptor alone.
    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut push = |severity, field, message: String| {
            issues.push(Issue { severity, field, message })
        };

        if !PACKAGE_NAME.is_match(&self.name) {
            push(Severity::Error, "name", format!("`{}` is not a valid package name", self.name));
        }
        if self.description.trim().is_empty() {
            push(Severity::Warning, "desc", "description is empty".to_string());
        }
        match Url::parse(&self.homepage) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => push(
                Severity::Error,
                "homepage",
                format!("`{}` is not a well-formed http(s) URL", self.homepage),
            ),
        }

        if !self.is_version_populated() {
            push(Severity::Warning, "version", "version is unpopulated".to_string());
        } else if self.version.starts_with('v') {
            push(
                Severity::Error,
                "version",
                format!("`{}` has a leading `v`; the tag prefix belongs in the URL", self.version),
            );
        } else if !is_valid_version(&self.version) {
            push(Severity::Error, "version", format!("`{}` is not a semantic version", self.version));
        }

        let url = self.download_url();
        match Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => push(Severity::Error, "url", format!("`{url}` is not a well-formed http(s) URL")),
        }
        if !self.url_template.contains(VERSION_PLACEHOLDER) {
            push(
                Severity::Error,
                "url",
                "download URL does not carry the version".to_string(),
            );
        }

        if !self.is_checksum_populated() {
            push(Severity::Warning, "sha256", "checksum is unpopulated".to_string());
        } else if !is_valid_checksum(&self.checksum) {
            push(
                Severity::Error,
                "sha256",
                format!("`{}` is not a 64-character SHA-256 hex digest", self.checksum),
            );
        }

        if self.install_target.is_empty() || self.install_target.contains(['/', '\\']) {
            push(
                Severity::Error,
                "bin.install",
                format!("`{}` is not a single file name", self.install_target),
            );
        } else {
            match self.archive_name() {
                Some(archive) if archive.starts_with(&format!("{}-", self.install_target))
                    || archive.starts_with(&format!("{}.", self.install_target)) => {}
                Some(archive) => push(
                    Severity::Error,
                    "bin.install",
                    format!("archive `{archive}` is not named after binary `{}`", self.install_target),
                ),
                None => push(Severity::Error, "url", "download URL has no archive name".to_string()),
            }
        }

        issues
    }

    /// Short label used in reports: the origin path if known, else the name.
    pub fn label(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One failed data-consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.field, self.message)
    }
}

/// Descriptors that describe the same thing but disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// What the descriptors have in common, e.g. `name lucide-svg-rs`.
    pub key: String,
    /// The field they disagree on.
    pub field: &'static str,
    /// `(descriptor label, value)` for every member of the group.
    pub values: Vec<(String, String)>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "descriptors sharing {} disagree on {}:", self.key, self.field)?;
        for (label, value) in &self.values {
            write!(f, "\n    {label}: {value}")?;
        }
        Ok(())
    }
}

/// Upstream repository name, i.e. the last segment of the homepage URL.
fn project_key(descriptor: &PackageDescriptor) -> Option<String> {
    let url = Url::parse(&descriptor.homepage).ok()?;
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}

/// Cross-descriptor consistency.
///
/// Descriptors sharing a package name, an install target, or an upstream
/// repository name must agree on homepage and install target. Every
/// disagreement is reported once; none is resolved. A disagreement already
/// covered by a larger group is not repeated for its subgroups.
pub fn check_duplicates(descriptors: &[PackageDescriptor]) -> Vec<Conflict> {
    let mut groups: BTreeMap<(u8, String), Vec<usize>> = BTreeMap::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        groups.entry((0, format!("name `{}`", descriptor.name))).or_default().push(index);
        groups
            .entry((1, format!("binary `{}`", descriptor.install_target)))
            .or_default()
            .push(index);
        if let Some(project) = project_key(descriptor) {
            groups.entry((2, format!("project `{project}`"))).or_default().push(index);
        }
    }

    let mut groups: Vec<_> = groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .collect();
    // Largest groups first; ties keep name, binary, project order.
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

    let fields: [(&'static str, fn(&PackageDescriptor) -> &str); 2] = [
        ("homepage", |d| d.homepage.as_str()),
        ("bin.install", |d| d.install_target.as_str()),
    ];
    let mut reported: Vec<(&'static str, Vec<usize>)> = Vec::new();
    let mut conflicts = Vec::new();
    for ((_, key), members) in groups {
        for (field, get) in fields {
            let first = get(&descriptors[members[0]]);
            if members.iter().all(|&i| get(&descriptors[i]) == first) {
                continue;
            }
            let covered = reported.iter().any(|(seen, group)| {
                *seen == field && members.iter().all(|i| group.contains(i))
            });
            if covered {
                continue;
            }
            conflicts.push(Conflict {
                key: key.clone(),
                field,
                values: members
                    .iter()
                    .map(|&i| (descriptors[i].label(), get(&descriptors[i]).to_string()))
                    .collect(),
            });
            reported.push((field, members.clone()));
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_QUOTED: &str = "# frozen_string_literal: true\n\nclass LucideSvgRs < Formula\n  desc 'Offline Lucide icons CLI and library'\n  homepage 'https://github.com/crabtools-rs/lucide-svg-rs'\n  version '<VERSION>'\n  url 'https://github.com/crabtools-rs/lucide-svg-rs/releases/download/v<VERSION>/lucide-svg-rs-macos-x86_64.zip'\n  sha256 '<SHA256>'\n  def install\n    bin.install 'lucide-svg-rs'\n  end\nend\n";

    const SHA: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    fn released() -> PackageDescriptor {
        PackageDescriptor::parse(SINGLE_QUOTED).unwrap().with_release("0.3.0", SHA)
    }

    #[test]
    fn test_class_name_conversion() {
        assert_eq!(class_to_name("LucideOfflineCli"), "lucide-offline-cli");
        assert_eq!(name_to_class("lucide-svg-rs"), "LucideSvgRs");
        assert_eq!(name_to_class(&class_to_name("LucideSvgRs")), "LucideSvgRs");
    }

    #[test]
    fn test_parse_single_quoted_template() {
        let d = PackageDescriptor::parse(SINGLE_QUOTED).unwrap();
        assert_eq!(d.name, "lucide-svg-rs");
        assert_eq!(d.homepage, "https://github.com/crabtools-rs/lucide-svg-rs");
        assert_eq!(d.install_target, "lucide-svg-rs");
        assert!(!d.is_populated());
        assert_eq!(d.download_url(), d.url_template);
    }

    #[test]
    fn test_parse_reports_missing_field() {
        let text = SINGLE_QUOTED.replace("  sha256 '<SHA256>'\n", "");
        let err = PackageDescriptor::parse(&text).unwrap_err();
        assert!(matches!(err, FormulaError::MissingField { field: "sha256", .. }));
        assert!(matches!(
            PackageDescriptor::parse("puts 'hello'").unwrap_err(),
            FormulaError::MissingClass
        ));
    }

    #[test]
    fn test_download_url_substitutes_version() {
        let d = released();
        assert_eq!(
            d.download_url(),
            "https://github.com/crabtools-rs/lucide-svg-rs/releases/download/v0.3.0/lucide-svg-rs-macos-x86_64.zip"
        );
        assert_eq!(d.archive_name().as_deref(), Some("lucide-svg-rs-macos-x86_64.zip"));
    }

    #[test]
    fn test_render_then_parse_keeps_descriptor() {
        let d = released();
        let rendered = d.render();
        assert!(rendered.starts_with("class LucideSvgRs < Formula\n"));
        assert!(rendered.contains("url \"https://github.com/crabtools-rs/lucide-svg-rs/releases/download/v0.3.0/"));
        assert_eq!(PackageDescriptor::parse(&rendered).unwrap(), d);
    }

    #[test]
    fn test_template_descriptor_layout() {
        let d = PackageDescriptor::template(
            "lucide-svg-rs",
            "Offline Lucide icons CLI and library",
            "https://github.com/crabtools-rs/lucide-svg-rs/",
            "linux-x86_64",
        );
        assert_eq!(
            d.url_template,
            "https://github.com/crabtools-rs/lucide-svg-rs/releases/download/v<VERSION>/lucide-svg-rs-linux-x86_64.zip"
        );
        assert!(d.validate().iter().all(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn test_templated_descriptor_only_warns() {
        let issues = PackageDescriptor::parse(SINGLE_QUOTED).unwrap().validate();
        let fields: Vec<_> = issues.iter().map(|i| (i.severity, i.field)).collect();
        assert_eq!(
            fields,
            vec![(Severity::Warning, "version"), (Severity::Warning, "sha256")]
        );
    }

    #[test]
    fn test_populated_descriptor_is_clean() {
        assert!(released().validate().is_empty());
    }

    #[test]
    fn test_invalid_checksum_and_version() {
        let d = PackageDescriptor::parse(SINGLE_QUOTED)
            .unwrap()
            .with_release("v0.3.0", "abc123");
        let errors: Vec<_> = d
            .validate()
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.field)
            .collect();
        assert_eq!(errors, vec!["version", "sha256"]);
    }

    #[test]
    fn test_install_target_must_match_archive_exactly() {
        let mut d = released();
        d.install_target = "Lucide-Svg-Rs".to_string();
        let issues = d.validate();
        assert!(issues.iter().any(|i| i.field == "bin.install" && i.severity == Severity::Error));
    }

    #[test]
    fn test_url_without_version_is_an_error() {
        let mut d = released();
        d.url_template = "https://example.com/lucide-svg-rs-latest.zip".to_string();
        assert!(d.validate().iter().any(|i| i.field == "url"));
    }

    #[test]
    fn test_check_duplicates_flags_divergent_homepages() {
        let a = PackageDescriptor::parse(SINGLE_QUOTED).unwrap();
        let mut b = a.clone();
        b.homepage = "https://github.com/soulcorrea/lucide-svg-rs".to_string();
        let conflicts = check_duplicates(&[a.clone(), b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "name `lucide-svg-rs`");
        assert_eq!(conflicts[0].field, "homepage");
        assert!(check_duplicates(&[a.clone(), a]).is_empty());
    }

    #[test]
    fn test_check_duplicates_reports_subgroup_once() {
        let a = PackageDescriptor::parse(SINGLE_QUOTED).unwrap();
        let mut b = a.clone();
        b.homepage = "https://github.com/soulcorrea/lucide-svg-rs".to_string();
        let c = PackageDescriptor::template(
            "lucide-offline-cli",
            "Offline Lucide icons CLI and library",
            "https://github.com/soulcorrea/lucide-svg-rs",
            "macos-x86_64",
        );
        let conflicts = check_duplicates(&[a, b, c]);
        let keys: Vec<_> = conflicts.iter().map(|c| (c.key.as_str(), c.field)).collect();
        assert_eq!(
            keys,
            vec![
                ("project `lucide-svg-rs`", "homepage"),
                ("project `lucide-svg-rs`", "bin.install"),
            ]
        );
        assert_eq!(conflicts[0].values.len(), 3);
    }

    #[test]
    fn test_render_escapes_quotes_and_backslashes() {
        let text = SINGLE_QUOTED.replace(
            "desc 'Offline Lucide icons CLI and library'",
            r#"desc 'Say "hi" to icons \ #{offline}'"#,
        );
        let d = PackageDescriptor::parse(&text).unwrap();
        assert_eq!(d.description, r#"Say "hi" to icons \ #{offline}"#);

        let rendered = d.render();
        assert!(rendered.contains(r#"desc "Say \"hi\" to icons \\ \#{offline}""#));
        assert_eq!(PackageDescriptor::parse(&rendered).unwrap(), d);
    }

    #[test]
    fn test_parse_double_quoted_escapes() {
        let text = SINGLE_QUOTED.replace(
            "desc 'Offline Lucide icons CLI and library'",
            r#"desc "Offline \"Lucide\" icons""#,
        );
        let d = PackageDescriptor::parse(&text).unwrap();
        assert_eq!(d.description, r#"Offline "Lucide" icons"#);
    }

    #[test]
    fn test_check_duplicates_flags_divergent_binaries_in_project() {
        let a = PackageDescriptor::parse(SINGLE_QUOTED).unwrap();
        let b = PackageDescriptor::template(
            "lucide-offline-cli",
            "Offline Lucide icons CLI and library",
            "https://github.com/crabtools-rs/lucide-svg-rs",
            "macos-x86_64",
        );
        let conflicts = check_duplicates(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, "project `lucide-svg-rs`");
        assert_eq!(conflicts[0].field, "bin.install");
    }
}
