/// Built-in MIME-type → category path table (spec §6 layout).
pub static BUILTIN_MIME_TABLE: &[(&str, &[&str])] = &[
    ("image/jpeg", &["images", "jpg"]),
    ("image/jpg", &["images", "jpg"]),
    ("image/png", &["images", "png"]),
    ("image/gif", &["images", "gif"]),
    ("image/svg+xml", &["images", "svg"]),
    ("image/webp", &["images", "webp"]),
    ("image/bmp", &["images", "bmp"]),
    ("video/mp4", &["videos", "mp4"]),
    ("video/x-msvideo", &["videos", "avi"]),
    ("video/quicktime", &["videos", "mov"]),
    ("video/x-matroska", &["videos", "mkv"]),
    ("video/webm", &["videos", "webm"]),
    ("video/x-flv", &["videos", "flv"]),
    ("audio/mpeg", &["audio", "mp3"]),
    ("audio/mp3", &["audio", "mp3"]),
    ("audio/wav", &["audio", "wav"]),
    ("audio/x-wav", &["audio", "wav"]),
    ("audio/flac", &["audio", "flac"]),
    ("audio/ogg", &["audio", "ogg"]),
    ("application/pdf", &["documents", "pdf"]),
    ("application/msword", &["documents", "doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &["documents", "docx"],
    ),
    ("text/plain", &["documents", "txt"]),
    ("application/rtf", &["documents", "rtf"]),
    ("text/markdown", &["documents", "md"]),
    ("application/epub+zip", &["documents", "epub"]),
    ("application/x-mobipocket-ebook", &["documents", "mobi"]),
    ("application/vnd.ms-excel", &["spreadsheets", "xls"]),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &["spreadsheets", "xlsx"],
    ),
    ("text/csv", &["spreadsheets", "csv"]),
    ("application/vnd.ms-powerpoint", &["presentations", "ppt"]),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        &["presentations", "pptx"],
    ),
    ("application/zip", &["archives", "zip"]),
    ("application/x-tar", &["archives", "tar"]),
    ("application/gzip", &["archives", "gz"]),
    ("application/x-gzip", &["archives", "gz"]),
    ("application/x-rar-compressed", &["archives", "rar"]),
    ("application/vnd.rar", &["archives", "rar"]),
    ("text/x-python", &["code", "py"]),
    ("application/javascript", &["code", "js"]),
    ("text/javascript", &["code", "js"]),
    ("text/x-go", &["code", "go"]),
    ("text/x-java-source", &["code", "java"]),
    ("text/x-c++src", &["code", "cpp"]),
];

/// Built-in filename-extension → category path table, consulted after the
/// MIME table misses (spec §4.1 step (b)).
pub static BUILTIN_EXTENSION_TABLE: &[(&str, &[&str])] = &[
    ("jpg", &["images", "jpg"]),
    ("jpeg", &["images", "jpg"]),
    ("png", &["images", "png"]),
    ("gif", &["images", "gif"]),
    ("svg", &["images", "svg"]),
    ("webp", &["images", "webp"]),
    ("bmp", &["images", "bmp"]),
    ("mp4", &["videos", "mp4"]),
    ("avi", &["videos", "avi"]),
    ("mov", &["videos", "mov"]),
    ("mkv", &["videos", "mkv"]),
    ("webm", &["videos", "webm"]),
    ("flv", &["videos", "flv"]),
    ("mp3", &["audio", "mp3"]),
    ("wav", &["audio", "wav"]),
    ("flac", &["audio", "flac"]),
    ("ogg", &["audio", "ogg"]),
    ("pdf", &["documents", "pdf"]),
    ("doc", &["documents", "doc"]),
    ("docx", &["documents", "docx"]),
    ("txt", &["documents", "txt"]),
    ("rtf", &["documents", "rtf"]),
    ("md", &["documents", "md"]),
    ("epub", &["documents", "epub"]),
    ("mobi", &["documents", "mobi"]),
    ("xls", &["spreadsheets", "xls"]),
    ("xlsx", &["spreadsheets", "xlsx"]),
    ("csv", &["spreadsheets", "csv"]),
    ("ppt", &["presentations", "ppt"]),
    ("pptx", &["presentations", "pptx"]),
    ("zip", &["archives", "zip"]),
    ("tar", &["archives", "tar"]),
    ("gz", &["archives", "gz"]),
    ("rar", &["archives", "rar"]),
    ("py", &["code", "py"]),
    ("js", &["code", "js"]),
    ("go", &["code", "go"]),
    ("java", &["code", "java"]),
    ("cpp", &["code", "cpp"]),
];
