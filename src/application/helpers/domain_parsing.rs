use crate::domain::entities::business::CanonicalPreference;

/// Normalize a hostname and strip a leading `www.`
/// e.g., "WWW.Example.com." -> "example.com"
pub fn apex_hostname(hostname: &str) -> String {
    let normalized = hostname.trim().trim_end_matches('.').to_lowercase();
    match normalized.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => normalized,
    }
}

/// e.g., "example.com" -> "www.example.com", "www.example.com" -> "www.example.com"
pub fn www_hostname(hostname: &str) -> String {
    format!("www.{}", apex_hostname(hostname))
}

/// The hostname that carries the certificate for this preference.
pub fn canonical_hostname(hostname: &str, preference: Option<CanonicalPreference>) -> String {
    match preference {
        Some(CanonicalPreference::Www) => www_hostname(hostname),
        Some(CanonicalPreference::Apex) | None => apex_hostname(hostname),
    }
}

/// Domains re-added at the provider during a rebuild. Only the canonical
/// variant is registered; the alias is served through the provider's redirect.
pub fn determine_domains_to_add(
    hostname: &str,
    preference: Option<CanonicalPreference>,
) -> Vec<String> {
    vec![canonical_hostname(hostname, preference)]
}
