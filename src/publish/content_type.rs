use std::path::Path;

pub const HTML: &str = "text/html";
pub const JAVASCRIPT: &str = "application/javascript";
pub const CSS: &str = "text/css";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type for a served file, from its extension alone
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };

    if ext.eq_ignore_ascii_case("html") {
        HTML
    } else if ext.eq_ignore_ascii_case("js") {
        JAVASCRIPT
    } else if ext.eq_ignore_ascii_case("css") {
        CSS
    } else {
        OCTET_STREAM
    }
}
