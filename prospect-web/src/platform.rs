use url::Url;

const KNOWN_PLATFORMS: &[(&str, &str)] = &[
    ("linkedin.com", "LinkedIn"),
    ("github.com", "GitHub"),
    ("stackoverflow.com", "Stack Overflow"),
    ("gitlab.com", "GitLab"),
    ("twitter.com", "Twitter"),
    ("x.com", "Twitter"),
    ("medium.com", "Medium"),
    ("dev.to", "DEV"),
    ("behance.net", "Behance"),
    ("dribbble.com", "Dribbble"),
];

/// Display name of the site a URL points at, derived from its host.
///
/// Known sites get their brand name (subdomains included); anything else is
/// the host without `www.`.
pub fn platform_for_url(raw: &str) -> String {
    let Some(host) = Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return "unknown".to_string();
    };
    for (domain, name) in KNOWN_PLATFORMS {
        if host == *domain || host.ends_with(&format!(".{domain}")) {
            return (*name).to_string();
        }
    }
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hosts_map_to_brand_names() {
        assert_eq!(platform_for_url("https://www.linkedin.com/in/jane"), "LinkedIn");
        assert_eq!(platform_for_url("https://uk.linkedin.com/in/jane"), "LinkedIn");
        assert_eq!(platform_for_url("https://gist.github.com/x"), "GitHub");
    }

    #[test]
    fn unknown_hosts_drop_www() {
        assert_eq!(platform_for_url("https://www.janedoe.dev/about"), "janedoe.dev");
        assert_eq!(platform_for_url("not a url"), "unknown");
    }

    #[test]
    fn lookalike_domains_are_not_matched() {
        assert_eq!(platform_for_url("https://notgithub.com/"), "notgithub.com");
    }
}
