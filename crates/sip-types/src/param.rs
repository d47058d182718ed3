//! Generic name=value parameters shared by Via, URI, and address headers.

use std::fmt;

/// A single `;name=value` or valueless `;name` parameter.
///
/// Parameter names are matched case-insensitively per RFC 3261 §7.3.1, but
/// the original case is kept for round-trip fidelity of unrecognized
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub value: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Param { name: name.into(), value }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Param { name: name.into(), value: None }
    }

    pub fn branch(value: impl Into<String>) -> Self {
        Param::new("branch", Some(value.into()))
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Param::new("tag", Some(value.into()))
    }

    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Looks up a parameter by name (case-insensitive) in an ordered list,
/// preserving the RFC 3261 rule that parameter order on the wire is
/// significant for re-serialization but not for lookup.
pub fn find<'a>(params: &'a [Param], name: &str) -> Option<&'a Param> {
    params.iter().find(|p| p.name_matches(name))
}

pub fn find_value<'a>(params: &'a [Param], name: &str) -> Option<&'a str> {
    find(params, name).and_then(|p| p.value.as_deref())
}

pub fn has_flag(params: &[Param], name: &str) -> bool {
    find(params, name).is_some()
}

/// Insert-or-replace: used when rewriting `received`/`rport` on inbound Via
/// processing (spec §4.C) where a parameter must be set exactly once.
pub fn set(params: &mut Vec<Param>, name: &str, value: Option<String>) {
    if let Some(existing) = params.iter_mut().find(|p| p.name_matches(name)) {
        existing.value = value;
    } else {
        params.push(Param::new(name, value));
    }
}
