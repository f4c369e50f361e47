use std::fs::File;
use std::io::Read;
use std::path::Path;
use semver::Version;
use sha2::{Digest, Sha256};

/// Placeholder left in templated descriptors where the release version goes.
pub const VERSION_PLACEHOLDER: &str = "<VERSION>";
/// Placeholder left in templated descriptors where the archive checksum goes.
pub const CHECKSUM_PLACEHOLDER: &str = "<SHA256>";

const BUF_SIZE: usize = 64 * 1024;

/// Strips the `sha256:` prefix from a hash if present and lowercases it.
/// This is useful for comparing hashes uniformly.
pub fn format_hash(hash: &str) -> String {
    let hash = hash.trim();
    hash.strip_prefix("sha256:")
        .unwrap_or(hash)
        .to_ascii_lowercase()
}

/// Returns `true` if `hash` is a populated SHA-256 digest (64 hex characters,
/// optionally prefixed with `sha256:`).
pub fn is_valid_checksum(hash: &str) -> bool {
    let hash = format_hash(hash);
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// SHA-256 of an in-memory buffer as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of a file as lowercase hex, read in chunks.
pub fn sha256_path(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Returns the release-artifact platform suffix for the host,
/// e.g. `macos-x86_64` or `linux-aarch64`.
pub fn current_platform_suffix() -> String {
    let arch = std::env::consts::ARCH;
    let os = std::env::consts::OS;
    format!("{}-{}", os, arch)
}

/// Validates whether a version string is a concrete SemVer version.
/// A leading `v` is not accepted: it belongs to the release tag, not the version.
pub fn is_valid_version(version: &str) -> bool {
    Version::parse(version).is_ok()
}

/// Strips surrounding whitespace and a trailing `.svg` from an icon name.
pub fn normalize_icon_name(name: &str) -> &str {
    let name = name.trim();
    name.strip_suffix(".svg").unwrap_or(name)
}

/// Returns the last path segment of a URL (the archive file name for release URLs).
pub fn url_file_name(url: &str) -> Option<&str> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Checks if a given path is an executable file on Unix.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
/// Checks if a given path has a Windows executable extension (.exe, .bat, .cmd).
#[cfg(windows)]
pub fn is_executable(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        let ext = ext.to_ascii_lowercase();
        matches!(ext.as_str(), "exe" | "bat" | "cmd")
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_hash_removes_prefix() {
        let input = "sha256:ABCDEF123456";
        let expected = "abcdef123456";
        assert_eq!(format_hash(input), expected);
    }

    #[test]
    fn test_format_hash_without_prefix() {
        let input = "abcdef123456";
        assert_eq!(format_hash(input), input);
    }

    #[test]
    fn test_is_valid_checksum() {
        let empty = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(is_valid_checksum(empty));
        assert!(is_valid_checksum(&format!("sha256:{}", empty.to_uppercase())));
        assert!(!is_valid_checksum(CHECKSUM_PLACEHOLDER));
        assert!(!is_valid_checksum(&empty[..63]));
        assert!(!is_valid_checksum(&format!("{}g", &empty[..63])));
    }

    #[test]
    fn test_sha256_hex_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_path_matches_buffer_hash() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
        assert_eq!(digest, sha256_hex(b"hello\n"));
    }

    #[test]
    fn test_platform_suffix_has_os_and_arch() {
        let suffix = current_platform_suffix();
        assert!(suffix.starts_with(std::env::consts::OS));
        assert!(suffix.ends_with(std::env::consts::ARCH));
    }

    #[test]
    fn test_is_valid_version_valid() {
        assert!(is_valid_version("1.2.3"));
        assert!(is_valid_version("1.2.3-alpha.1"));
    }

    #[test]
    fn test_is_valid_version_invalid() {
        assert!(!is_valid_version("1.2")); // incomplete semver
        assert!(!is_valid_version("v1.2.3"));
        assert!(!is_valid_version(VERSION_PLACEHOLDER));
    }

    #[test]
    fn test_normalize_icon_name() {
        assert_eq!(normalize_icon_name("heart.svg"), "heart");
        assert_eq!(normalize_icon_name("  heart "), "heart");
        assert_eq!(normalize_icon_name("book-heart"), "book-heart");
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(
            url_file_name("https://example.com/releases/download/v1.0.0/tool-macos-x86_64.zip"),
            Some("tool-macos-x86_64.zip")
        );
        assert_eq!(url_file_name("https://example.com/"), Some("example.com"));
        assert_eq!(url_file_name(""), None);
    }
}
