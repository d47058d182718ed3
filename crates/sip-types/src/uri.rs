//! SIP/SIPS/tel URI model (spec §3: "URI is a structured value").

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::param::Param;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Sip,
    Sips,
    Tel,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scheme::Sip => "sip",
            Scheme::Sips => "sips",
            Scheme::Tel => "tel",
        })
    }
}

/// `host-type ∈ {hostname, ipv4, ipv6}` per spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    Hostname(String),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Hostname(h) => f.write_str(h),
            Host::Ipv4(a) => write!(f, "{}", a),
            Host::Ipv6(a) => write!(f, "[{}]", a),
        }
    }
}

/// A structured SIP/SIPS/tel URI: `scheme:[userinfo@]host[:port][;params][?headers]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: Scheme,
    pub user: Option<String>,
    pub host: Host,
    pub port: Option<u16>,
    pub params: Vec<Param>,
    pub headers: Vec<(String, String)>,
}

impl Uri {
    pub fn sip(host: impl Into<String>) -> Self {
        Uri {
            scheme: Scheme::Sip,
            user: None,
            host: Host::Hostname(host.into()),
            port: None,
            params: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_parameter(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn transport(&self) -> Option<&str> {
        crate::param::find_value(&self.params, "transport")
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for p in &self.params {
            write!(f, ";{}", p)?;
        }
        if !self.headers.is_empty() {
            write!(f, "?")?;
            for (i, (k, v)) in self.headers.iter().enumerate() {
                if i > 0 {
                    write!(f, "&")?;
                }
                write!(f, "{}={}", k, v)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minimal_uri() {
        let uri = Uri::sip("example.com").with_user("alice");
        assert_eq!(uri.to_string(), "sip:alice@example.com");
    }

    #[test]
    fn formats_with_port_and_params() {
        let uri = Uri::sip("example.com")
            .with_user("bob")
            .with_port(5060)
            .with_parameter(Param::new("transport", Some("udp".into())));
        assert_eq!(uri.to_string(), "sip:bob@example.com:5060;transport=udp");
    }
}
