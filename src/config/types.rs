use serde::Deserialize;

/// Main configuration structure for Roundabout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Root of the crawl; only resources on this host are fetched
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of fetches kept in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent")]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// URL patterns that must never be fetched (`*` matches any run of characters)
    #[serde(default)]
    pub reject: Vec<String>,

    /// Also follow stylesheets, scripts and images embedded by pages
    #[serde(rename = "follow-assets", default = "default_follow_assets")]
    pub follow_assets: bool,
}

/// Identity of this crawl node
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7331,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory under which dated mirrors are written
    #[serde(rename = "mirror-root")]
    pub mirror_root: String,

    /// Versioned subfolder inside each dated mirror; rewritten links point into it
    #[serde(default = "default_subfolder")]
    pub subfolder: String,

    /// Remove an existing mirror for the same day before crawling
    #[serde(default = "default_clean")]
    pub clean: bool,
}

fn default_max_concurrent() -> u32 {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_follow_assets() -> bool {
    true
}

fn default_subfolder() -> String {
    "v2".to_string()
}

fn default_clean() -> bool {
    true
}
