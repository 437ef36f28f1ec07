// Built-in MIME extension/content-type table, grouped by media type.
//
// SPEC_FULL.md §4.1 treats the actual MIME registry as external data (the
// original tool loaded it from a directory of per-media-type CSVs at
// runtime, pickled once, via `mime_types.load()`). That loader also carried
// a bug (REDESIGN FLAG iii): it keyed its output dict with an undefined
// `type` variable instead of the per-file `file_type` it had just computed.
// We sidestep both the external-file dependency and the bug by embedding a
// representative table as a Rust constant, keyed correctly by media group.
// A deployment that needs the full IANA registry can replace this module
// with one backed by the `mime_guess` crate or a loaded `/etc/mime.types`.

pub struct MediaGroup {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub codes: &'static [&'static str],
}

pub const GROUPS: &[MediaGroup] = &[
    MediaGroup {
        name: "image",
        extensions: &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico", "tiff", "avif"],
        codes: &[
            "image/png",
            "image/jpeg",
            "image/gif",
            "image/webp",
            "image/svg+xml",
            "image/bmp",
            "image/vnd.microsoft.icon",
            "image/tiff",
            "image/avif",
        ],
    },
    MediaGroup {
        name: "video",
        extensions: &["mp4", "webm", "ogv", "mov", "avi", "mkv"],
        codes: &[
            "video/mp4",
            "video/webm",
            "video/ogg",
            "video/quicktime",
            "video/x-msvideo",
            "video/x-matroska",
        ],
    },
    MediaGroup {
        name: "audio",
        extensions: &["mp3", "wav", "ogg", "oga", "flac", "aac", "weba"],
        codes: &[
            "audio/mpeg",
            "audio/wav",
            "audio/ogg",
            "audio/flac",
            "audio/aac",
            "audio/webm",
        ],
    },
    MediaGroup {
        name: "font",
        extensions: &["woff", "woff2", "ttf", "otf", "eot"],
        codes: &[
            "font/woff",
            "font/woff2",
            "font/ttf",
            "font/otf",
            "application/vnd.ms-fontobject",
        ],
    },
    MediaGroup {
        name: "model",
        extensions: &["gltf", "glb", "obj", "stl"],
        codes: &["model/gltf+json", "model/gltf-binary", "model/obj", "model/stl"],
    },
    MediaGroup {
        name: "text",
        extensions: &["css", "csv", "txt", "html", "xml"],
        codes: &["text/css", "text/csv", "text/plain", "text/html", "text/xml"],
    },
    MediaGroup {
        name: "application",
        extensions: &["pdf", "zip", "gz", "wasm", "json", "xml", "doc", "xls"],
        codes: &[
            "application/pdf",
            "application/zip",
            "application/gzip",
            "application/wasm",
            "application/json",
            "application/xml",
            "application/msword",
            "application/vnd.ms-excel",
        ],
    },
];

/// Extensions/codes always pruned regardless of media-group whitelisting
/// (the original tool's fixed ecosystem list: JavaScript, ECMAScript,
/// favicons).
pub const ALWAYS_PRUNED_EXTENSIONS: &[&str] = &["js", "es", "esm", "ico"];
pub const ALWAYS_PRUNED_CODES: &[&str] = &[
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "application/x-ecmascript",
    "vnd.microsoft.icon",
];

/// Extension/code pairs that stay prunable-eligible media types (`text`,
/// `application`) are nonetheless excluded from pruning, because a trace
/// reducer needs to see structured bodies.
pub const WHITELIST: &[(&str, &str)] = &[
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("html", "text/html"),
    ("xml", "text/xml"),
];

/// Compute the final prunable extension/content-type sets: every group's
/// entries, plus the fixed ecosystem list, minus the whitelist, all
/// lowercased.
pub fn prunable_extensions_and_codes() -> (Vec<String>, Vec<String>) {
    let mut extensions: Vec<String> = ALWAYS_PRUNED_EXTENSIONS.iter().map(|s| s.to_lowercase()).collect();
    let mut codes: Vec<String> = ALWAYS_PRUNED_CODES.iter().map(|s| s.to_lowercase()).collect();

    for group in GROUPS {
        extensions.extend(group.extensions.iter().map(|s| s.to_lowercase()));
        codes.extend(group.codes.iter().map(|s| s.to_lowercase()));
    }

    for (ext, code) in WHITELIST {
        extensions.retain(|e| e != ext);
        codes.retain(|c| c != code);
    }

    (extensions, codes)
}
