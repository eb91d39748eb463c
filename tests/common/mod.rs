//! Helpers shared by the router tests

use axum::Router;

use healer_portal::config::PortalConfig;
use healer_portal::{build_state, server};

/// Router over fresh in-memory state with no delays
pub fn app() -> Router {
    server::create_router(build_state(PortalConfig::for_tests()).unwrap())
}

/// `application/x-www-form-urlencoded` body from ordered pairs
pub fn form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
