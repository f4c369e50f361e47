use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;
use crate::error::LucideError;
use crate::util::normalize_icon_name;

/// The icon set bundled with the crate.
pub const ICONS_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/icons");

/// The bundled icon set packed as a plain tar archive.
pub const ICONS_TAR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/icons.tar");

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Where an icon set is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Every `*.svg` file below this directory.
    Directory(PathBuf),
    /// Every `*.svg` entry of a `.tar` or gzip-compressed tar archive.
    Archive(PathBuf),
}

impl IconSource {
    /// Chooses the source kind from what is on disk at `path`.
    ///
    /// # Errors
    /// Returns [`LucideError::IconSetNotFound`] if nothing exists at `path`.
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Self, LucideError> {
        let path = path.as_ref();
        let meta = fs::metadata(path)
            .map_err(|_| LucideError::IconSetNotFound(path.to_path_buf()))?;
        if meta.is_dir() {
            Ok(IconSource::Directory(path.to_path_buf()))
        } else {
            Ok(IconSource::Archive(path.to_path_buf()))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            IconSource::Directory(path) | IconSource::Archive(path) => path,
        }
    }

    /// Reads every icon of the source into a name → SVG map.
    fn load(&self) -> Result<BTreeMap<String, String>, LucideError> {
        let icons = match self {
            IconSource::Directory(dir) => load_directory(dir)?,
            IconSource::Archive(archive) => load_archive(archive)?,
        };
        debug!(source = %self.path().display(), count = icons.len(), "icon set loaded");
        Ok(icons)
    }
}

fn svg_stem(path: &Path) -> Option<String> {
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    if !is_svg {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().to_string())
}

fn insert_icon(icons: &mut BTreeMap<String, String>, name: String, bytes: Vec<u8>, origin: &Path) {
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            warn!(icon = %name, origin = %origin.display(), "icon is not valid UTF-8, skipped");
            return;
        }
    };
    if icons.contains_key(&name) {
        warn!(icon = %name, origin = %origin.display(), "duplicate icon ignored");
        return;
    }
    icons.insert(name, content);
}

fn load_directory(dir: &Path) -> Result<BTreeMap<String, String>, LucideError> {
    let mut icons = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = svg_stem(entry.path()) {
            let bytes = fs::read(entry.path())?;
            insert_icon(&mut icons, name, bytes, entry.path());
        }
    }
    Ok(icons)
}

fn load_archive(path: &Path) -> Result<BTreeMap<String, String>, LucideError> {
    let bytes = fs::read(path)?;
    let reader: Box<dyn Read> = if bytes.starts_with(&GZIP_MAGIC) {
        Box::new(GzDecoder::new(Cursor::new(bytes)))
    } else {
        Box::new(Cursor::new(bytes))
    };

    let mut icons = BTreeMap::new();
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_path = entry.path()?.to_path_buf();
        if let Some(name) = svg_stem(&entry_path) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            insert_icon(&mut icons, name, bytes, &entry_path);
        }
    }
    Ok(icons)
}

/// Metadata of one icon in the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconInfo {
    /// Icon name without the `.svg` extension.
    pub name: String,
    /// Size of the SVG in bytes.
    pub size: u64,
}

/// Outcome of exporting a whole icon set.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: Vec<(String, LucideError)>,
}

/// Read-only view over an offline icon set.
///
/// The set is loaded once on construction and kept in memory sorted by name.
#[derive(Debug)]
pub struct LucideClient {
    source: IconSource,
    icons: BTreeMap<String, String>,
}

impl LucideClient {
    /// Opens the icon set at `path` (directory or tar archive).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lucide_svg_rs::{LucideClient, ICONS_DIR};
    ///
    /// let client = LucideClient::new(ICONS_DIR).unwrap();
    /// let svg = client.get_icon_content("heart").unwrap();
    /// assert!(svg.contains("<svg"));
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, LucideError> {
        Self::from_source(IconSource::detect(path)?)
    }

    pub fn from_source(source: IconSource) -> Result<Self, LucideError> {
        let icons = source.load()?;
        Ok(Self { source, icons })
    }

    pub fn source(&self) -> &IconSource {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// All icon names, sorted.
    pub fn list_icons(&self) -> Vec<String> {
        self.icons.keys().cloned().collect()
    }

    /// All icons with their sizes, sorted by name.
    pub fn icons(&self) -> Vec<IconInfo> {
        self.icons
            .iter()
            .map(|(name, content)| IconInfo {
                name: name.clone(),
                size: content.len() as u64,
            })
            .collect()
    }

    /// Icon names containing `query`, case-insensitively. An empty query matches everything.
    pub fn search_icons(&self, query: &str) -> Vec<String> {
        let query = normalize_icon_name(query).to_lowercase();
        self.icons
            .keys()
            .filter(|name| name.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.icons.contains_key(normalize_icon_name(name))
    }

    /// Get SVG content as string without saving to file.
    /// `name` may be given with or without the `.svg` extension.
    pub fn get_icon_content(&self, name: &str) -> Result<String, LucideError> {
        self.icons
            .get(normalize_icon_name(name))
            .cloned()
            .ok_or_else(|| LucideError::IconNotFound(name.to_string()))
    }

    /// Writes a single icon to `output_path`, creating parent directories.
    pub fn export_icon(&self, name: &str, output_path: &Path) -> Result<PathBuf, LucideError> {
        let content = self.get_icon_content(name)?;
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, content)?;
        Ok(output_path.to_path_buf())
    }

    /// Writes each named icon to `output_dir/<name>.svg`.
    ///
    /// A missing icon is reported in its own entry and does not stop the batch.
    pub fn export_icons<S: AsRef<str>>(
        &self,
        names: &[S],
        output_dir: &Path,
    ) -> Result<BTreeMap<String, Result<PathBuf, LucideError>>, LucideError> {
        fs::create_dir_all(output_dir)?;
        let mut results = BTreeMap::new();
        for name in names {
            let name = normalize_icon_name(name.as_ref());
            let output_path = output_dir.join(format!("{name}.svg"));
            results.insert(name.to_string(), self.export_icon(name, &output_path));
        }
        Ok(results)
    }

    /// Writes every icon of the set into `output_dir`.
    pub fn export_all(&self, output_dir: &Path) -> Result<ExportSummary, LucideError> {
        fs::create_dir_all(output_dir)?;
        let mut summary = ExportSummary::default();
        for (index, name) in self.icons.keys().enumerate() {
            let output_path = output_dir.join(format!("{name}.svg"));
            match self.export_icon(name, &output_path) {
                Ok(_) => {
                    summary.exported += 1;
                    if (index + 1) % 50 == 0 {
                        debug!("progress: {}/{} icons exported", index + 1, self.icons.len());
                    }
                }
                Err(e) => {
                    warn!(icon = %name, error = %e, "export failed");
                    summary.failed.push((name.clone(), e));
                }
            }
        }
        Ok(summary)
    }
}
