use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_v4")]
    pub listen_v4: Vec<Ipv4Addr>,

    #[serde(default = "default_listen_v6")]
    pub listen_v6: Vec<Ipv6Addr>,

    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    /// Response size limit for UDP clients that send no EDNS record.
    #[serde(default = "default_max_udp_payload")]
    pub max_udp_payload: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_v4: default_listen_v4(),
            listen_v6: default_listen_v6(),
            dns_port: default_dns_port(),
            max_udp_payload: default_max_udp_payload(),
        }
    }
}

fn default_listen_v4() -> Vec<Ipv4Addr> {
    vec![Ipv4Addr::UNSPECIFIED]
}

fn default_listen_v6() -> Vec<Ipv6Addr> {
    vec![Ipv6Addr::UNSPECIFIED]
}

fn default_dns_port() -> u16 {
    53
}

fn default_max_udp_payload() -> u16 {
    512
}
