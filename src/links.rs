use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://[^\s<>()]+").expect("valid URL regex"));

/// Returns the first `http(s)://` link in `text`, or None.
pub fn extract_first_url(text: &str) -> Option<&str> {
    URL_RE.find(text).map(|m| m.as_str().trim())
}

/// Bare lowercase host of a URL: scheme, path, query, fragment and port
/// stripped. Returns an empty string when there is nothing left.
pub fn domain_of(url: &str) -> String {
    let u = url.to_lowercase();
    let u = u
        .strip_prefix("https://")
        .or_else(|| u.strip_prefix("http://"))
        .unwrap_or(&u);
    let u = u.split('/').next().unwrap_or("");
    let u = u.split('?').next().unwrap_or("");
    let u = u.split('#').next().unwrap_or("");
    let u = u.split(':').next().unwrap_or("");
    u.to_string()
}

/// True iff the URL's domain equals an allow-list entry exactly or is a
/// dot-suffixed subdomain of one. Entries are comma-separated, trimmed and
/// lowercased; empty entries are ignored. An unextractable domain never
/// passes.
pub fn is_domain_allowed(url: &str, allow_domains_csv: &str) -> bool {
    let domain = domain_of(url);
    if domain.is_empty() {
        return false;
    }
    allow_domains_csv
        .split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|entry| domain == entry || domain.ends_with(&format!(".{}", entry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_url() {
        assert_eq!(
            extract_first_url("check this out https://youtu.be/abc123 nice"),
            Some("https://youtu.be/abc123")
        );
        assert_eq!(
            extract_first_url("HTTP://EXAMPLE.COM/x then https://b.com"),
            Some("HTTP://EXAMPLE.COM/x")
        );
        // Bracket and whitespace characters terminate the match.
        assert_eq!(
            extract_first_url("(https://a.com/track)"),
            Some("https://a.com/track")
        );
        assert_eq!(extract_first_url("no links here"), None);
        assert_eq!(extract_first_url(""), None);
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(
            domain_of("https://Open.Spotify.com/track/x?si=1#t"),
            "open.spotify.com"
        );
        assert_eq!(domain_of("http://youtu.be:443/abc"), "youtu.be");
        assert_eq!(domain_of("https://soundcloud.com"), "soundcloud.com");
        assert_eq!(domain_of("https://"), "");
    }

    #[test]
    fn test_subdomain_boundary() {
        assert!(is_domain_allowed("https://open.spotify.com/track/x", "spotify.com"));
        assert!(is_domain_allowed("https://open.spotify.com/track/x", "open.spotify.com"));
        // No dot boundary: not a subdomain.
        assert!(!is_domain_allowed("https://evilopen.spotify.com/x", "open.spotify.com"));
        // Parent domains are not covered by a more specific entry.
        assert!(!is_domain_allowed("https://spotify.com/x", "open.spotify.com"));
        assert!(is_domain_allowed("https://music.youtube.com/watch", "youtube.com"));
    }

    #[test]
    fn test_allow_list_parsing() {
        assert!(is_domain_allowed("https://youtu.be/x", " youtu.be , ,YOUTUBE.COM"));
        assert!(is_domain_allowed("https://youtube.com/x", " youtu.be , ,YOUTUBE.COM"));
        assert!(!is_domain_allowed("https://vimeo.com/x", "youtu.be,youtube.com"));
        assert!(!is_domain_allowed("https://youtu.be/x", ""));
        assert!(!is_domain_allowed("https:///nope", "nope"));
    }
}
