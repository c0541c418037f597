use crate::extension;

/// Fallback MIME type for unknown or missing extensions.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Best-effort MIME type guess from a file name's extension.
#[must_use]
pub fn mime_type(name: &str) -> &'static str {
    let Some(ext) = extension(name) else {
        return DEFAULT_MIME;
    };
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "py" => "text/x-python",
        "js" => "text/javascript",
        "java" => "text/x-java-source",
        "cpp" => "text/x-c++src",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "sql" => "application/sql",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        _ => DEFAULT_MIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a.pdf", "application/pdf")]
    #[case("A.JPG", "image/jpeg")]
    #[case("notes.txt", "text/plain")]
    #[case("data.json", "application/json")]
    #[case("unknown.qqq", DEFAULT_MIME)]
    #[case("no_extension", DEFAULT_MIME)]
    fn test_mime_type(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(mime_type(name), expected);
    }
}
