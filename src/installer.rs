use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use flate2::read::GzDecoder;
use reqwest::Url;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use crate::error::InstallError;
use crate::formula::PackageDescriptor;
use crate::global::cache::ArchiveCache;
use crate::util::{format_hash, is_valid_checksum, sha256_hex};

#[cfg(windows)]
const EXEC_EXT: &str = "exe";

/// Archive formats a release may ship in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveKind {
    /// Picks the format from an archive file name.
    pub fn from_name(name: &str) -> Result<Self, InstallError> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Ok(ArchiveKind::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(ArchiveKind::TarGz)
        } else if lower.ends_with(".tar") {
            Ok(ArchiveKind::Tar)
        } else {
            Err(InstallError::UnsupportedArchive(name.to_string()))
        }
    }
}

/// Checks `bytes` against the expected SHA-256.
///
/// The comparison ignores case and a `sha256:` prefix.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), InstallError> {
    let actual = sha256_hex(bytes);
    let expected = format_hash(expected);
    if actual != expected {
        return Err(InstallError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

fn file_name_matches(entry_path: &Path, target: &str) -> bool {
    entry_path
        .file_name()
        .is_some_and(|name| name.to_string_lossy() == target)
}

fn extract_from_tar<R: Read>(reader: R, target: &str) -> Result<Option<Vec<u8>>, InstallError> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        if file_name_matches(&entry.path()?, target) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(Some(bytes));
        }
    }
    Ok(None)
}

fn extract_from_zip(bytes: &[u8], target: &str) -> Result<Option<Vec<u8>>, InstallError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if !file.is_file() {
            continue;
        }
        let Some(entry_path) = file.enclosed_name() else {
            warn!(entry = %file.name(), "skipping zip entry with unsafe path");
            continue;
        };
        if file_name_matches(&entry_path, target) {
            let mut out = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut out)?;
            return Ok(Some(out));
        }
    }
    Ok(None)
}

/// Pulls the file named exactly `install_target` (case-sensitive, any directory
/// depth) out of an archive.
pub fn extract_binary(
    bytes: &[u8],
    archive_name: &str,
    install_target: &str,
) -> Result<Vec<u8>, InstallError> {
    let found = match ArchiveKind::from_name(archive_name)? {
        ArchiveKind::Zip => extract_from_zip(bytes, install_target)?,
        ArchiveKind::Tar => extract_from_tar(Cursor::new(bytes), install_target)?,
        ArchiveKind::TarGz => extract_from_tar(GzDecoder::new(Cursor::new(bytes)), install_target)?,
    };
    found.ok_or_else(|| InstallError::BinaryNotInArchive {
        target: install_target.to_string(),
        archive: archive_name.to_string(),
    })
}

/// Path the descriptor's binary is installed to inside `bin_dir`.
pub fn installed_path(descriptor: &PackageDescriptor, bin_dir: &Path) -> PathBuf {
    let path = bin_dir.join(&descriptor.install_target);
    #[cfg(windows)]
    let path = if path.extension().is_none() { path.with_extension(EXEC_EXT) } else { path };
    path
}

fn ensure_populated(descriptor: &PackageDescriptor) -> Result<(), InstallError> {
    if !descriptor.is_version_populated() {
        return Err(InstallError::Unpopulated { name: descriptor.name.clone(), field: "version" });
    }
    if !descriptor.is_checksum_populated() || !is_valid_checksum(&descriptor.checksum) {
        return Err(InstallError::Unpopulated { name: descriptor.name.clone(), field: "sha256" });
    }
    Ok(())
}

/// Verifies `archive` against the descriptor and installs its binary into `bin_dir`.
///
/// The binary is written to a temporary file in `bin_dir` and renamed into
/// place, so a failure at any step leaves `bin_dir` untouched.
pub fn install_from_bytes(
    descriptor: &PackageDescriptor,
    archive: &[u8],
    bin_dir: &Path,
) -> Result<PathBuf, InstallError> {
    ensure_populated(descriptor)?;
    verify_checksum(archive, &descriptor.checksum)?;

    let url = descriptor.download_url();
    let archive_name = descriptor
        .archive_name()
        .ok_or_else(|| InstallError::InvalidUrl(url.clone()))?;
    let binary = extract_binary(archive, &archive_name, &descriptor.install_target)?;

    std::fs::create_dir_all(bin_dir)?;
    let mut tmp = NamedTempFile::new_in(bin_dir)?;
    tmp.write_all(&binary)?;
    tmp.flush()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o755))?;
    }

    let target = installed_path(descriptor, bin_dir);
    tmp.persist(&target).map_err(|e| InstallError::Io(e.error))?;
    info!(package = %descriptor.name, path = %target.display(), "installed");
    Ok(target)
}

/// Removes an installed binary. Returns `false` if nothing was installed.
pub fn uninstall(descriptor: &PackageDescriptor, bin_dir: &Path) -> Result<bool, InstallError> {
    let path = installed_path(descriptor, bin_dir);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path)?;
    info!(package = %descriptor.name, path = %path.display(), "uninstalled");
    Ok(true)
}

/// Runs the fetch → verify → install sequence for a descriptor.
#[derive(Debug, Clone)]
pub struct Installer {
    cache: Option<ArchiveCache>,
    user_agent: String,
}

impl Default for Installer {
    fn default() -> Self {
        Self::new()
    }
}

impl Installer {
    /// Installer using the per-user archive cache when one can be located.
    pub fn new() -> Self {
        let cache = ArchiveCache::global()
            .inspect_err(|e| debug!(error = %e, "archive cache unavailable"))
            .ok();
        Self {
            cache,
            user_agent: format!("lucide-svg-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_cache(mut self, cache: ArchiveCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn cache(&self) -> Option<&ArchiveCache> {
        self.cache.as_ref()
    }

    /// Downloads an archive. `file://` URLs are read from disk.
    pub fn fetch_archive(&self, url: &str) -> Result<Vec<u8>, InstallError> {
        let parsed = Url::parse(url).map_err(|_| InstallError::InvalidUrl(url.to_string()))?;
        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| InstallError::InvalidUrl(url.to_string()))?;
                debug!(path = %path.display(), "reading local archive");
                Ok(std::fs::read(path)?)
            }
            "http" | "https" => {
                debug!(%url, "downloading archive");
                let client = reqwest::blocking::Client::builder()
                    .user_agent(&self.user_agent)
                    .build()?;
                let response = client.get(parsed).send()?;
                if !response.status().is_success() {
                    return Err(InstallError::HttpStatus {
                        url: url.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Ok(response.bytes()?.to_vec())
            }
            other => Err(InstallError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Fetches, verifies and installs the descriptor's binary into `bin_dir`.
    ///
    /// A cached archive is reused only if it still matches the checksum.
    /// Verified downloads are added to the cache; a cache write failure is
    /// logged and does not fail the install.
    pub fn install(
        &self,
        descriptor: &PackageDescriptor,
        bin_dir: &Path,
    ) -> Result<PathBuf, InstallError> {
        ensure_populated(descriptor)?;
        let url = descriptor.download_url();

        let cached = self.cache.as_ref().and_then(|cache| {
            cache
                .get(&url, &descriptor.checksum)
                .inspect_err(|e| warn!(error = %e, "archive cache lookup failed"))
                .ok()
                .flatten()
        });
        let archive = match cached {
            Some(bytes) => bytes,
            None => {
                let bytes = self.fetch_archive(&url)?;
                verify_checksum(&bytes, &descriptor.checksum)?;
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store(&url, &bytes) {
                        warn!(error = %e, "could not cache archive");
                    }
                }
                bytes
            }
        };

        install_from_bytes(descriptor, &archive, bin_dir)
    }
}
