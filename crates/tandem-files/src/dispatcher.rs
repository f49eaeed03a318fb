//! File content dispatcher

use std::path::{Path, PathBuf};
use url::Url;
use uuid::Uuid;

use tandem_tabs::{DispatchedFile, PaneSide};

use crate::classify::{classify, ContentKind, WrapKind};
use crate::error::FileError;
use crate::Result;

/// Text files larger than this are cut off in the host document.
const MAX_TEXT_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Load `marker.document_url` into the pane and keep the marker on the tab
    Load { marker: DispatchedFile },
    /// Hand the file to the system
    OpenExternally { path: PathBuf },
}

pub struct FileContentDispatcher {
    staging_dir: PathBuf,
}

impl FileContentDispatcher {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self { staging_dir }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Work out how to show `path` in the `side` pane, staging whatever the
    /// engine needs to load.
    pub async fn dispatch(&self, path: &Path, side: PaneSide) -> Result<Dispatch> {
        let display_url = file_url(path)?;
        let metadata = tokio::fs::metadata(path).await?;

        let kind = if metadata.is_dir() {
            ContentKind::External
        } else {
            classify(path)
        };
        tracing::debug!(path = %path.display(), kind = ?kind, "Dispatching file");

        let staged = match kind {
            ContentKind::Direct => match self.stage_copy(path).await {
                Ok(staged) => Some(staged),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Direct staging failed, wrapping");
                    self.try_stage_wrapped(path, &display_url, WrapKind::Embed).await
                }
            },
            ContentKind::Wrapped(wrap) => self.try_stage_wrapped(path, &display_url, wrap).await,
            ContentKind::External => None,
        };

        let Some(staged) = staged else {
            tracing::info!(path = %path.display(), "Opening file externally");
            return Ok(Dispatch::OpenExternally {
                path: path.to_path_buf(),
            });
        };

        let document_url = file_url(&staged)?;
        tracing::info!(
            path = %path.display(),
            document = %document_url,
            side = %side,
            "Staged file for display"
        );

        Ok(Dispatch::Load {
            marker: DispatchedFile {
                side,
                display_url,
                document_url,
            },
        })
    }

    /// Delete a staged document once no pane shows it. Urls outside the
    /// staging directory are left alone. Returns whether a file was removed.
    pub async fn release(&self, document_url: &str) -> Result<bool> {
        let path = Url::parse(document_url)
            .ok()
            .and_then(|url| url.to_file_path().ok());
        let Some(path) = path.filter(|p| p.starts_with(&self.staging_dir)) else {
            tracing::debug!(document = %document_url, "Not a staged document, keeping it");
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed staged document");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Empty the staging directory. Nothing staged survives a restart, so
    /// this runs before the first dispatch.
    pub async fn purge(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to purge staged file"),
            }
        }

        if removed > 0 {
            tracing::info!(removed, dir = %self.staging_dir.display(), "Purged staging directory");
        }
        Ok(removed)
    }

    async fn stage_copy(&self, path: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let staged = self.staging_dir.join(format!("{}-{}", Uuid::new_v4(), name));

        tokio::fs::copy(path, &staged).await?;
        Ok(staged)
    }

    async fn try_stage_wrapped(&self, path: &Path, display_url: &str, wrap: WrapKind) -> Option<PathBuf> {
        match self.stage_wrapped(path, display_url, wrap).await {
            Ok(staged) => Some(staged),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Wrapped staging failed");
                None
            }
        }
    }

    async fn stage_wrapped(&self, path: &Path, display_url: &str, wrap: WrapKind) -> Result<PathBuf> {
        let text = match wrap {
            WrapKind::Text => {
                let bytes = tokio::fs::read(path).await?;
                let end = bytes.len().min(MAX_TEXT_BYTES);
                Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => None,
        };

        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let document = host_document(&title, display_url, wrap, text.as_deref());

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let staged = self.staging_dir.join(format!("{}.html", Uuid::new_v4()));
        tokio::fs::write(&staged, document).await?;

        Ok(staged)
    }
}

fn file_url(path: &Path) -> Result<String> {
    Url::from_file_path(path)
        .map(|url| url.to_string())
        .map_err(|_| FileError::NotAbsolute(path.to_path_buf()))
}

fn host_document(title: &str, src: &str, wrap: WrapKind, text: Option<&str>) -> String {
    let src = escape_html(src);
    let body = match wrap {
        WrapKind::Image => format!(r#"<img src="{}" alt="">"#, src),
        WrapKind::Audio => format!(r#"<audio src="{}" controls autoplay></audio>"#, src),
        WrapKind::Video => format!(r#"<video src="{}" controls autoplay></video>"#, src),
        WrapKind::Embed => format!(r#"<embed src="{}">"#, src),
        WrapKind::Text => format!("<pre>{}</pre>", escape_html(text.unwrap_or_default())),
    };

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>html,body{{margin:0;height:100%}}body{{display:flex;align-items:center;justify-content:center}}\
         img,video,embed{{max-width:100%;max-height:100%}}embed{{width:100%;height:100%}}\
         pre{{align-self:flex-start;margin:1em;white-space:pre-wrap}}</style></head>\
         <body>{}</body></html>\n",
        escape_html(title),
        body
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
