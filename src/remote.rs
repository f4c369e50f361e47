use std::fs;
use std::path::Path;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};
use crate::error::LucideError;

/// GitHub contents listing of the upstream Lucide icon directory.
pub const LUCIDE_API_URL: &str = "https://api.github.com/repos/lucide-icons/lucide/contents/icons";

/// One icon as listed by the upstream repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIcon {
    /// File name, including the `.svg` extension.
    pub name: String,
    /// Raw download URL of the SVG.
    pub download_url: String,
    /// Size of the SVG in bytes, as reported by GitHub.
    pub size: u64,
}

/// A single entry of a GitHub contents API listing.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
    #[serde(default)]
    size: u64,
}

/// Parses a GitHub contents listing, keeping only `.svg` files, sorted by name.
///
/// # Errors
///
/// Returns an error if the body is not a JSON array of content entries.
pub fn parse_listing(json: &str) -> Result<Vec<RemoteIcon>, LucideError> {
    let entries: Vec<ContentEntry> = serde_json::from_str(json)?;
    let mut icons: Vec<RemoteIcon> = entries
        .into_iter()
        .filter(|entry| entry.kind == "file" && entry.name.ends_with(".svg"))
        .filter_map(|entry| {
            Some(RemoteIcon {
                download_url: entry.download_url?,
                name: entry.name,
                size: entry.size,
            })
        })
        .collect();
    icons.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(icons)
}

/// Outcome of refreshing a local icon directory from upstream.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
}

/// Client for the upstream Lucide repository.
///
/// Only used to refresh a local icon set; every other operation works offline.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    api_url: String,
    user_agent: String,
}

impl Default for RemoteCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteCatalog {
    /// Catalog for the upstream repository with the default user agent.
    pub fn new() -> Self {
        Self {
            api_url: LUCIDE_API_URL.to_string(),
            user_agent: format!("lucide-svg-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn client(&self) -> Result<Client, LucideError> {
        Ok(Client::builder().user_agent(&self.user_agent).build()?)
    }

    fn get_text(&self, client: &Client, url: &str) -> Result<String, LucideError> {
        let response = client.get(url).send()?;
        if !response.status().is_success() {
            return Err(LucideError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.text()?)
    }

    /// Fetches the list of available SVG icons from upstream.
    pub fn list(&self) -> Result<Vec<RemoteIcon>, LucideError> {
        let client = self.client()?;
        let body = self.get_text(&client, &self.api_url)?;
        parse_listing(&body)
    }

    /// Downloads every upstream icon into `dest`.
    ///
    /// Files already present with the size upstream reports are skipped.
    /// A failed icon is recorded and the sync carries on.
    pub fn sync(&self, dest: &Path) -> Result<SyncSummary, LucideError> {
        let client = self.client()?;
        let body = self.get_text(&client, &self.api_url)?;
        let icons = parse_listing(&body)?;
        fs::create_dir_all(dest)?;
        info!(count = icons.len(), dest = %dest.display(), "syncing icons");

        let mut summary = SyncSummary::default();
        for (index, icon) in icons.iter().enumerate() {
            let output_path = dest.join(&icon.name);
            let up_to_date = fs::metadata(&output_path)
                .map(|meta| meta.len() == icon.size)
                .unwrap_or(false);
            if up_to_date {
                debug!(icon = %icon.name, "already present, skipping");
                summary.skipped += 1;
                continue;
            }

            match self
                .get_text(&client, &icon.download_url)
                .and_then(|svg| fs::write(&output_path, svg).map_err(LucideError::from))
            {
                Ok(()) => summary.downloaded += 1,
                Err(e) => {
                    warn!(icon = %icon.name, error = %e, "download failed");
                    summary.failed.push(format!("{}: {}", icon.name, e));
                }
            }
            if (index + 1) % 50 == 0 {
                info!("progress: {}/{} icons", index + 1, icons.len());
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::tempdir;

    const HEART: &str = "<svg><path d=\"M19 14\"/></svg>";

    /// Serves a two-icon listing on 127.0.0.1: `heart.svg` downloads,
    /// `broken.svg` answers 404. Returns the listing URL.
    fn serve_listing() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let listing = format!(
            r#"[
                {{"name": "heart.svg", "type": "file", "size": {}, "download_url": "{base}/heart.svg"}},
                {{"name": "broken.svg", "type": "file", "size": 10, "download_url": "{base}/broken.svg"}}
            ]"#,
            HEART.len()
        );
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let Ok(read_half) = stream.try_clone() else { continue };
                let mut reader = BufReader::new(read_half);
                let mut request = String::new();
                if reader.read_line(&mut request).is_err() {
                    continue;
                }
                let mut line = String::new();
                while matches!(reader.read_line(&mut line), Ok(n) if n > 2) {
                    line.clear();
                }
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = match path.as_str() {
                    "/contents/icons" => ("200 OK", listing.clone()),
                    "/heart.svg" => ("200 OK", HEART.to_string()),
                    _ => ("404 Not Found", String::new()),
                };
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("{base}/contents/icons")
    }

    #[test]
    fn test_sync_downloads_then_skips_up_to_date_icons() {
        let catalog = RemoteCatalog::new().with_api_url(serve_listing());
        let dest = tempdir().unwrap();

        let first = catalog.sync(dest.path()).unwrap();
        assert_eq!(first.downloaded, 1);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.failed.len(), 1);
        assert!(first.failed[0].starts_with("broken.svg: "));
        assert_eq!(fs::read_to_string(dest.path().join("heart.svg")).unwrap(), HEART);
        assert!(!dest.path().join("broken.svg").exists());

        let second = catalog.sync(dest.path()).unwrap();
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(second.failed.len(), 1);
    }

    #[test]
    fn test_sync_redownloads_when_size_differs() {
        let catalog = RemoteCatalog::new().with_api_url(serve_listing());
        let dest = tempdir().unwrap();
        fs::write(dest.path().join("heart.svg"), "<svg/>").unwrap();

        let summary = catalog.sync(dest.path()).unwrap();
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(fs::read_to_string(dest.path().join("heart.svg")).unwrap(), HEART);
    }

    #[test]
    fn test_list_reads_listing() {
        let catalog = RemoteCatalog::new().with_api_url(serve_listing());
        let names: Vec<_> = catalog.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["broken.svg", "heart.svg"]);
    }

    const LISTING: &str = r#"[
        {"name": "heart.svg", "type": "file", "size": 352,
         "download_url": "https://raw.githubusercontent.com/lucide-icons/lucide/main/icons/heart.svg"},
        {"name": "heart.json", "type": "file", "size": 120,
         "download_url": "https://raw.githubusercontent.com/lucide-icons/lucide/main/icons/heart.json"},
        {"name": "activity.svg", "type": "file", "size": 280,
         "download_url": "https://raw.githubusercontent.com/lucide-icons/lucide/main/icons/activity.svg"},
        {"name": "nested.svg", "type": "dir", "size": 0, "download_url": null}
    ]"#;

    #[test]
    fn test_parse_listing_keeps_sorted_svg_files() {
        let icons = parse_listing(LISTING).unwrap();
        let names: Vec<_> = icons.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["activity.svg", "heart.svg"]);
        assert_eq!(icons[1].size, 352);
        assert!(icons[1].download_url.ends_with("/icons/heart.svg"));
    }

    #[test]
    fn test_parse_listing_rejects_non_array() {
        assert!(matches!(
            parse_listing(r#"{"message": "API rate limit exceeded"}"#),
            Err(LucideError::Json(_))
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let catalog = RemoteCatalog::new()
            .with_user_agent("my-app/1.0")
            .with_api_url("http://localhost:9/icons");
        assert_eq!(catalog.user_agent(), "my-app/1.0");
        assert_eq!(catalog.api_url, "http://localhost:9/icons");
        assert!(RemoteCatalog::default().user_agent().starts_with("lucide-svg-rs/"));
    }
}
