use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// User agent, viewport, and locale presented by one browser or HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
}

impl UserAgentProfile {
    fn desktop(user_agent: &str, viewport: (u32, u32), platform: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            viewport,
            platform: platform.to_string(),
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

/// Fixed rotation pool of plausible desktop profiles.
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    profiles: Vec<UserAgentProfile>,
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            profiles: vec![
                UserAgentProfile::desktop(
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
                    (1920, 1080),
                    "Win32",
                ),
                UserAgentProfile::desktop(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
                    (1440, 900),
                    "MacIntel",
                ),
                UserAgentProfile::desktop(
                    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
                    (1366, 768),
                    "Linux x86_64",
                ),
                UserAgentProfile::desktop(
                    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
                    (1536, 864),
                    "Win32",
                ),
                UserAgentProfile::desktop(
                    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
                    (1680, 1050),
                    "MacIntel",
                ),
            ],
        }
    }
}

impl UserAgentPool {
    /// Build a pool from user-agent strings, keeping the default viewport.
    /// An empty list yields the default pool.
    pub fn from_user_agents<I, S>(agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let profiles: Vec<_> = agents
            .into_iter()
            .map(|ua| UserAgentProfile::desktop(ua.as_ref(), (1920, 1080), "Win32"))
            .collect();
        if profiles.is_empty() {
            Self::default()
        } else {
            Self { profiles }
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn profiles(&self) -> &[UserAgentProfile] {
        &self.profiles
    }

    pub fn random_profile(&self) -> UserAgentProfile {
        let mut rng = rand::thread_rng();
        match self.profiles.choose(&mut rng) {
            Some(p) => p.clone(),
            None => Self::default().profiles[0].clone(),
        }
    }

    pub fn random_user_agent(&self) -> String {
        self.random_profile().user_agent
    }
}
