use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BlockingConfig {
    /// Address returned in the A answer for blocked names.
    #[serde(default = "default_redirect_address")]
    pub redirect_address: IpAddr,

    /// Refresh every list daily at 04:00 local time.
    #[serde(default = "default_true")]
    pub auto_update: bool,

    #[serde(default = "default_lists_dir")]
    pub lists_dir: String,

    #[serde(default)]
    pub show_console_progress: bool,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_stats_refresh_interval_secs")]
    pub stats_refresh_interval_secs: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Lists added to the list table on first start.
    #[serde(default = "default_lists")]
    pub default_lists: Vec<String>,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            redirect_address: default_redirect_address(),
            auto_update: true,
            lists_dir: default_lists_dir(),
            show_console_progress: false,
            download_timeout_secs: default_download_timeout_secs(),
            stats_refresh_interval_secs: default_stats_refresh_interval_secs(),
            queue_capacity: default_queue_capacity(),
            default_lists: default_lists(),
        }
    }
}

fn default_redirect_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_lists_dir() -> String {
    "./blocklists".to_string()
}

fn default_download_timeout_secs() -> u64 {
    60
}

fn default_stats_refresh_interval_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    32
}

fn default_lists() -> Vec<String> {
    vec!["https://raw.githubusercontent.com/StevenBlack/hosts/master/hosts".to_string()]
}

fn default_true() -> bool {
    true
}
