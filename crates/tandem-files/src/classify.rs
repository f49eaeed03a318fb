//! MIME based classification of local files

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapKind {
    Image,
    Audio,
    Video,
    Text,
    /// Natively renderable content embedded in a host document
    Embed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Direct,
    Wrapped(WrapKind),
    External,
}

/// Classify a file by the MIME type guessed from its extension.
pub fn classify(path: &Path) -> ContentKind {
    let Some(guess) = mime_guess::from_path(path).first() else {
        return ContentKind::External;
    };

    if matches!(
        guess.essence_str(),
        "text/html" | "application/pdf" | "image/svg+xml" | "application/xhtml+xml"
    ) {
        return ContentKind::Direct;
    }

    match (guess.type_().as_str(), guess.subtype().as_str()) {
        ("image", _) => ContentKind::Wrapped(WrapKind::Image),
        ("audio", _) => ContentKind::Wrapped(WrapKind::Audio),
        ("video", _) => ContentKind::Wrapped(WrapKind::Video),
        ("text", _) => ContentKind::Wrapped(WrapKind::Text),
        ("application", "json" | "javascript" | "xml" | "toml" | "x-sh" | "x-python") => {
            ContentKind::Wrapped(WrapKind::Text)
        }
        _ => ContentKind::External,
    }
}
