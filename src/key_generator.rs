//! Client identity resolution and rate-limit key generation.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// How a limiter scopes its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// One counter per client across every route the limiter guards
    ClientIp,
    /// One counter per client and endpoint path
    ClientIpAndPath,
}

/// Generates store keys for a single limiter
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    prefix: &'static str,
    strategy: KeyStrategy,
}

impl KeyGenerator {
    pub fn new(prefix: &'static str, strategy: KeyStrategy) -> Self {
        Self { prefix, strategy }
    }

    pub fn generate_key(&self, client_ip: &str, path: &str) -> String {
        match self.strategy {
            KeyStrategy::ClientIp => format!("{}:ip:{}", self.prefix, client_ip),
            KeyStrategy::ClientIpAndPath => format!(
                "{}:ip:{}:{}",
                self.prefix,
                client_ip,
                Self::sanitize_key(path)
            ),
        }
    }

    /// Replaces characters that would be ambiguous inside a composite key
    pub fn sanitize_key(key: &str) -> String {
        key.chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

/// Resolves the client address behind a fixed number of trusted proxies.
///
/// The connection peer is the nearest hop. Each trusted hop lets us step one
/// entry further back through `X-Forwarded-For`, never past its first entry.
/// With zero trusted hops the header is ignored entirely.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpResolver {
    trusted_hops: usize,
}

impl ClientIpResolver {
    pub fn new(trusted_hops: usize) -> Self {
        Self { trusted_hops }
    }

    pub fn resolve(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let peer = peer
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if self.trusted_hops == 0 {
            return peer;
        }

        // nearest hop first
        let mut chain = vec![peer];
        for value in headers.get_all("x-forwarded-for") {
            if let Ok(value) = value.to_str() {
                chain.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|ip| !ip.is_empty())
                        .map(str::to_string),
                );
            }
        }
        chain[1..].reverse();

        let index = self.trusted_hops.min(chain.len() - 1);
        chain.swap_remove(index)
    }
}

impl Default for ClientIpResolver {
    fn default() -> Self {
        Self::new(1)
    }
}
