//! Extension → `Content-Type` for uploads.

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Resolve the MIME type sent with an upload. Unknown extensions fall back
/// to [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "js" => "application/javascript",
        // Scene files are JSON documents.
        "json" | "scene" => "application/json",
        "html" => "text/html",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "ogg" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("app.js", "application/javascript")]
    #[case("level.scene", "application/json")]
    #[case("INDEX.HTML", "text/html")]
    #[case("icons/logo.svg", "image/svg+xml")]
    #[case("fonts/a.woff2", "font/woff2")]
    #[case("sfx/hit.mp3", "audio/mpeg")]
    #[case("favicon.ico", "image/x-icon")]
    #[case("data.bin", DEFAULT_CONTENT_TYPE)]
    #[case("Makefile", DEFAULT_CONTENT_TYPE)]
    fn resolves_by_extension(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(content_type_for(Path::new(path)), expected);
    }
}
