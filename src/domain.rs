/// Hostname extraction used for rule lookup
use url::Url;

/// Extract the bare hostname a rule is matched against
///
/// Algorithm:
/// 1. Parse the URL (scheme required, as browsers report tab URLs)
/// 2. Take the hostname, lowercased by the parser
/// 3. Strip a single leading "www."
///
/// No subdomain folding: "docs.github.com" stays "docs.github.com".
///
/// Examples:
/// - https://www.github.com/x → github.com
/// - https://gist.github.com → gist.github.com
/// - http://localhost:3000/app → localhost
pub fn bare_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    normalize_host(host)
}

/// Normalize a user-entered domain the same way tab hostnames are normalized
pub fn normalize_host(host: &str) -> Option<String> {
    let host = host.trim().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).trim_end_matches('.');

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
