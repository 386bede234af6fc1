use serde_json::{json, Map, Value};

use super::fingerprint::UserAgentProfile;

/// Chrome command-line arguments for a session presenting `profile`.
pub fn chrome_arguments(profile: &UserAgentProfile, headless: bool, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-background-networking".to_string(),
        "--mute-audio".to_string(),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
        format!("--lang={}", profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args.extend(extra.iter().cloned());
    args
}

/// WebDriver capabilities. Navigation returns at DOMContentLoaded.
pub fn capabilities(args: Vec<String>) -> Map<String, Value> {
    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("pageLoadStrategy".to_string(), json!("eager"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserAgentProfile {
        UserAgentProfile {
            user_agent: "agent/1.0".into(),
            viewport: (1280, 720),
            platform: "Linux x86_64".into(),
            languages: vec!["en-US".into(), "en".into()],
        }
    }

    #[test]
    fn arguments_carry_profile_and_headless_flags() {
        let args = chrome_arguments(&profile(), true, &["--proxy-bypass-list=*".into()]);
        assert!(args.contains(&"--user-agent=agent/1.0".to_string()));
        assert!(args.contains(&"--window-size=1280,720".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--proxy-bypass-list=*"));
    }

    #[test]
    fn capabilities_use_eager_page_loads() {
        let caps = capabilities(chrome_arguments(&profile(), false, &[]));
        assert_eq!(caps["pageLoadStrategy"], "eager");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }
}
