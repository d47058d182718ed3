//! The Via header (RFC 3261 §20.42, §8.1.1.7 branch rules, RFC 3581 rport).

use std::fmt;
use std::net::IpAddr;

use crate::error::{Error, Result};
use crate::param::{self, Param};
use crate::uri::Host;

pub const MAGIC_COOKIE: &str = "z9hG4bK";

/// One Via entry. A request's Via *list* (spec §3) is `Vec<Via>`, top-of-stack
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub protocol_name: String,
    pub protocol_version: String,
    pub transport: String,
    pub host: Host,
    pub port: Option<u16>,
    pub params: Vec<Param>,
}

impl Via {
    pub fn new(
        transport: impl Into<String>,
        host: Host,
        port: Option<u16>,
        params: Vec<Param>,
    ) -> Self {
        Via {
            protocol_name: "SIP".into(),
            protocol_version: "2.0".into(),
            transport: transport.into(),
            host,
            port,
            params,
        }
    }

    pub fn branch(&self) -> Option<&str> {
        param::find_value(&self.params, "branch")
    }

    pub fn set_branch(&mut self, branch: impl Into<String>) {
        param::set(&mut self.params, "branch", Some(branch.into()));
    }

    pub fn received(&self) -> Option<&str> {
        param::find_value(&self.params, "received")
    }

    /// Append `received=<ip>` per spec §4.C rule 1. Always applied on
    /// inbound processing, unconditionally, per RFC 3261 §18.2.1.
    pub fn set_received(&mut self, addr: IpAddr) {
        param::set(&mut self.params, "received", Some(addr.to_string()));
    }

    pub fn has_rport_flag(&self) -> bool {
        param::find(&self.params, "rport")
            .map(|p| p.value.is_none())
            .unwrap_or(false)
    }

    /// RFC 3581: a valueless `rport` requests that the response be sent back
    /// to the port the request actually arrived from; this fills it in.
    pub fn set_rport(&mut self, port: u16) {
        param::set(&mut self.params, "rport", Some(port.to_string()));
    }

    /// `z9hG4bK…` required by RFC 3261 §8.1.1.7.
    pub fn is_rfc3261_compliant(&self) -> bool {
        self.branch()
            .map(|b| b.starts_with(MAGIC_COOKIE))
            .unwrap_or(false)
    }

    /// `sent-by` (host + port-or-default) used in transaction matching
    /// (spec §4.D, key includes `sent-by-host, sent-by-port`).
    pub fn sent_by(&self) -> (String, u16) {
        (self.host.to_string(), self.port.unwrap_or(5060))
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} {}",
            self.protocol_name, self.protocol_version, self.transport, self.host
        )?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for p in &self.params {
            write!(f, ";{}", p)?;
        }
        Ok(())
    }
}

/// Ensures a branch carries the magic cookie, generating one if absent.
/// Idempotent: calling it twice on an already-compliant branch is a no-op
/// (spec §8 round-trip law).
pub fn ensure_rfc3261_compliance(branch: &str) -> String {
    if branch.starts_with(MAGIC_COOKIE) {
        branch.to_string()
    } else {
        format!("{}{}", MAGIC_COOKIE, branch)
    }
}

/// Validates that a freshly-parsed Via carries a compliant branch; used by
/// the parser's `missing_required_header`/`bad_via` checks (spec §4.B).
pub fn require_branch(via: &Via) -> Result<&str> {
    let branch = via.branch().ok_or(Error::MissingBranch("Via"))?;
    if !branch.starts_with(MAGIC_COOKIE) {
        return Err(Error::NonCompliantBranch(branch.to_string()));
    }
    Ok(branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliance_is_idempotent() {
        let b = ensure_rfc3261_compliance("z9hG4bK776asdhds");
        assert_eq!(ensure_rfc3261_compliance(&b), b);
        assert!(b.ends_with("776asdhds"));
    }

    #[test]
    fn rport_flag_then_filled() {
        let mut via = Via::new(
            "UDP",
            Host::Hostname("pc33.atlanta.com".into()),
            Some(5060),
            vec![Param::branch("z9hG4bK776asdhds"), Param::flag("rport")],
        );
        assert!(via.has_rport_flag());
        via.set_rport(9001);
        assert_eq!(param::find_value(&via.params, "rport"), Some("9001"));
    }
}
