//! Root-domain derivation for cross-subdomain cookies.

/// Registrable root of `hostname`.
///
/// `www.abc.com` gives `abc.com`. When both of the last two labels are two
/// characters long the name is treated as a country-code second level
/// domain, so `sub.abc.co.kr` gives `abc.co.kr`. Names with two labels or
/// fewer come back unchanged.
pub fn root_domain(hostname: &str) -> String {
    let labels: Vec<&str> = hostname.split('.').collect();
    let len = labels.len();
    if len <= 2 {
        return hostname.to_string();
    }
    let (second, top) = (labels[len - 2], labels[len - 1]);
    if second.len() == 2 && top.len() == 2 {
        format!("{}.{second}.{top}", labels[len - 3])
    } else {
        format!("{second}.{top}")
    }
}

/// Cookie `Domain` attribute that shares a cookie across every subdomain of
/// `hostname`. Browsers reject a dotted domain for `localhost`, so that one
/// is returned bare.
pub fn cookie_domain(hostname: &str) -> String {
    let root = root_domain(hostname);
    if root == "localhost" {
        root
    } else {
        format!(".{root}")
    }
}

/// True when a cookie scoped to `domain` is visible to `host`.
pub(crate) fn domain_matches(domain: &str, host: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}
