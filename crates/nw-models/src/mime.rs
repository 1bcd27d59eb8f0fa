//! MIME type lookup for uploaded recordings.

/// Fallback when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Guess the MIME type of a recording from its file extension.
pub fn mime_for_file_name(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return DEFAULT_MIME_TYPE,
    };

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mpeg" | "mpg" => "video/mpeg",
        "ogv" => "video/ogg",
        "gif" => "image/gif",
        _ => DEFAULT_MIME_TYPE,
    }
}
