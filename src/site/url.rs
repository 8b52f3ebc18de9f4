//! URL normalization and shape predicates used by dispatch rules.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Extensions that mark a URL as a web page rather than a downloadable file.
pub const WEB_PAGE_EXTENSIONS: [&str; 11] = [
    "asp", "aspx", "cfm", "cfml", "css", "htm", "html", "js", "php", "php3", "xhtml",
];

/// `/<name>.<ext>` at the end of a normalized URL, 3-4 char extension.
#[allow(clippy::expect_used)]
static FILE_SUFFIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/.*\.\w{3,4}(\?[\w;&=]*)?$").expect("file suffix regex is valid")
});

#[allow(clippy::expect_used)]
static WEB_PAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^.*/.*\.({})$",
        WEB_PAGE_EXTENSIONS.join("|")
    ))
    .expect("web page extension regex is valid")
});

#[allow(clippy::expect_used)]
static SELF_POST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^reddit\.com/r/").expect("self post regex is valid"));

/// Reduces a URL to `host[:port]/path`, dropping scheme, a leading `www.`,
/// query string, and fragment.
///
/// Scheme-less input (`www.example.com/a.png`) is accepted.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).or_else(|_| Url::parse(&format!("http://{trimmed}")));

    let joined = match parsed {
        Ok(url) if url.host_str().is_some() => {
            let host = url.host_str().unwrap_or_default();
            let authority = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let path = if url.path() == "/" { "" } else { url.path() };
            format!("{authority}{path}")
        }
        _ => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    strip_www(&joined).to_string()
}

fn strip_www(value: &str) -> &str {
    value.strip_prefix("www.").unwrap_or(value)
}

/// True when the normalized URL ends in a file-like `/<name>.<ext>` suffix.
#[must_use]
pub fn has_file_suffix(normalized: &str) -> bool {
    FILE_SUFFIX_PATTERN.is_match(normalized)
}

/// True when the normalized URL ends in a web-page extension (`.html`, `.php`, ...).
#[must_use]
pub fn is_web_resource(normalized: &str) -> bool {
    WEB_PAGE_PATTERN.is_match(normalized)
}

/// True for a file-shaped URL that is not a web page.
#[must_use]
pub fn is_direct_file(normalized: &str) -> bool {
    has_file_suffix(normalized) && !is_web_resource(normalized)
}

/// True for feed-internal self-post URLs (`reddit.com/r/...`).
#[must_use]
pub fn is_self_post(normalized: &str) -> bool {
    SELF_POST_PATTERN.is_match(normalized)
}

/// Lowercase extension of the URL's last path segment, without the dot.
pub(crate) fn extension_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index + 1..];
    if ext.is_empty() || ext.len() > 11 || !ext.chars().all(char::is_alphanumeric) {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scheme_less_www() {
        assert_eq!(normalize_url("www.test.com/test.png"), "test.com/test.png");
    }

    #[test]
    fn test_normalize_drops_query() {
        assert_eq!(
            normalize_url("www.test.com/test.png?test_value=random"),
            "test.com/test.png"
        );
        assert_eq!(
            normalize_url("https://youtube.com/watch?v=Gv8Wz74FjVA"),
            "youtube.com/watch"
        );
    }

    #[test]
    fn test_normalize_keeps_subdomain() {
        assert_eq!(
            normalize_url("https://i.imgur.com/BuzvZwb.gifv"),
            "i.imgur.com/BuzvZwb.gifv"
        );
    }

    #[test]
    fn test_normalize_drops_fragment_and_bare_root() {
        assert_eq!(normalize_url("https://www.google.com/"), "google.com");
        assert_eq!(normalize_url("https://example.com/a#frag"), "example.com/a");
    }

    #[test]
    fn test_normalize_keeps_port() {
        assert_eq!(
            normalize_url("http://127.0.0.1:8080/img.png"),
            "127.0.0.1:8080/img.png"
        );
    }

    #[test]
    fn test_is_web_resource() {
        for (url, expected) in [
            ("example.com/test.asp", true),
            ("example.com/test.html", true),
            ("example.com/test.HTML", true),
            ("example.com/test.js", true),
            ("example.com/test.xhtml", true),
            ("example.com/test.mp4", false),
            ("example.com/test.png", false),
        ] {
            assert_eq!(is_web_resource(url), expected, "{url}");
        }
    }

    #[test]
    fn test_has_file_suffix_requires_three_or_four_chars() {
        assert!(has_file_suffix("i.redd.it/affyv0axd5k61.png"));
        assert!(has_file_suffix("imgur.com/3ls94yv.jpeg"));
        assert!(!has_file_suffix("i.imgur.com/OGeVuAe.giffff"));
        assert!(!has_file_suffix("example.com/file.7z"));
        assert!(!has_file_suffix("google.com/test"));
    }

    #[test]
    fn test_is_self_post() {
        assert!(is_self_post("reddit.com/r/test/abc123"));
        assert!(!is_self_post("reddit.com/gallery/lu93m7"));
        assert!(!is_self_post("example.com/r/test"));
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://i.redd.it/abc.PNG?x=1"),
            Some("png".to_string())
        );
        assert_eq!(extension_from_url("https://example.com/no-extension"), None);
        assert_eq!(extension_from_url("not a url"), None);
    }
}
