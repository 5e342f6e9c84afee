use std::net::Ipv4Addr;

const DASHBOARD_PORT: &str = "DASHBOARD_PORT";

const DEFAULT_PORT: u16 = 5000;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(DASHBOARD_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const DASHBOARD_ADDR: &str = "DASHBOARD_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 0);

pub fn get_addr() -> Ipv4Addr {
    let addr_from_env = std::env::var(DASHBOARD_ADDR);
    addr_from_env.map_or(DEFAULT_ADDR, |res| res.parse().unwrap_or(DEFAULT_ADDR))
}

/// Connector names end up as a path component, so separators and `..` are refused.
pub fn is_safe_component_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}
