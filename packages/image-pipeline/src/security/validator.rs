//! URL validation for SSRF protection.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;
use url::{Host, Url};

use crate::error::{SecurityError, SecurityResult};

/// URL validator for SSRF protection.
///
/// Rejects, before any outbound call is made:
/// - Non-HTTP(S) schemes (file://, ftp://)
/// - Loopback and internal hostnames (localhost, *.localhost, metadata services)
/// - IP literals in private, loopback, link-local or CGNAT ranges, including
///   IPv4-mapped IPv6 and the numeric forms the URL parser normalizes
///   (`http://2130706433/` is 127.0.0.1)
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<IpNet>,
    /// Hosts that bypass every other check
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a new URL validator with default security rules.
    pub fn new() -> Self {
        let blocked_cidrs = [
            "0.0.0.0/8",
            "10.0.0.0/8",
            "100.64.0.0/10", // Carrier-grade NAT
            "127.0.0.0/8",
            "169.254.0.0/16", // Link-local / cloud metadata
            "172.16.0.0/12",
            "192.168.0.0/16",
            "::/128",
            "::1/128",
            "fc00::/7",  // Unique local
            "fe80::/10", // Link-local
        ]
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect();

        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_cidrs,
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into().to_ascii_lowercase());
        self
    }

    /// Block an additional CIDR range.
    pub fn block_cidr(mut self, cidr: IpNet) -> Self {
        self.blocked_cidrs.push(cidr);
        self
    }

    /// Validate a URL and return it parsed.
    pub fn validate(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url.trim())?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host().ok_or(SecurityError::NoHost)?;
        match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                if self.allowed_hosts.contains(&domain) {
                    return Ok(parsed);
                }
                if self.blocked_hosts.contains(&domain) || domain.ends_with(".localhost") {
                    return Err(SecurityError::BlockedHost(domain));
                }
            }
            Host::Ipv4(ip) => self.check_ip(IpAddr::V4(ip))?,
            Host::Ipv6(ip) => self.check_ip(IpAddr::V6(ip))?,
        }

        Ok(parsed)
    }

    /// Validate a URL and resolve DNS to check the actual IP.
    ///
    /// This catches hostnames that resolve to an internal address. The
    /// connection made later resolves again, so a rebinding resolver can
    /// still race this check.
    pub async fn validate_with_dns(&self, url: &str) -> SecurityResult<Url> {
        let parsed = self.validate(url)?;

        let domain = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_ascii_lowercase(),
            // IP literals were fully checked above
            _ => return Ok(parsed),
        };
        if self.allowed_hosts.contains(&domain) {
            return Ok(parsed);
        }

        let port = parsed.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host((domain.as_str(), port))
            .await
            .map_err(|e| SecurityError::DnsResolution(e.to_string()))?;

        for addr in addrs {
            self.check_ip(addr.ip()).map_err(|_| {
                SecurityError::BlockedCidr(format!(
                    "DNS for {} resolved to blocked IP {}",
                    domain,
                    addr.ip()
                ))
            })?;
        }

        Ok(parsed)
    }

    fn check_ip(&self, ip: IpAddr) -> SecurityResult<()> {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };

        if self.allowed_hosts.contains(&ip.to_string()) {
            return Ok(());
        }
        if self.blocked_cidrs.iter().any(|cidr| cidr.contains(&ip)) {
            return Err(SecurityError::BlockedCidr(ip.to_string()));
        }
        Ok(())
    }
}
