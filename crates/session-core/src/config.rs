//! `Config`: every option spec §6 "Configuration" names, read-only once a
//! `UserAgent` is built from it (spec §5: "Configuration: read-only after
//! startup"). Mirrors the teacher's `unified.rs` config-with-builder
//! pattern (`rvoip-dialog-core::config`).

use std::net::IpAddr;

use rtp_core::PayloadType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportOptions {
    pub listen_addr: IpAddr,
    pub listen_port: u16,
    pub exposed_addr: Option<IpAddr>,
    pub exposed_port: Option<u16>,
    pub max_burst: usize,
    pub sip_trace: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        TransportOptions { listen_addr: "0.0.0.0".parse().unwrap(), listen_port: 0, exposed_addr: None, exposed_port: None, max_burst: 10, sip_trace: false }
    }
}

/// `check_scheme`/`to_tag` are left as enums rather than arbitrary
/// predicates/strings; the teacher's own config layer resolves this the
/// same way for anything that would otherwise require boxing a closure
/// into a `Deserialize`d config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToTagPolicy {
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UasOptions {
    pub accepted_schemes: Vec<String>,
    pub to_tag: ToTagPolicy,
    pub min_se: u32,
    pub max_forwards: u8,
}

impl Default for UasOptions {
    fn default() -> Self {
        UasOptions { accepted_schemes: vec!["sip".into(), "sips".into(), "tel".into()], to_tag: ToTagPolicy::Auto, min_se: 90, max_forwards: 70 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSourceKind {
    File,
    Device,
    Silence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSinkKind {
    None,
    Device,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaOptions {
    pub audio_source: AudioSourceKind,
    pub audio_sink: AudioSinkKind,
    pub audio_file: Option<String>,
    pub output_file: Option<String>,
    pub input_device_id: Option<String>,
    pub output_device_id: Option<String>,
    #[serde(skip, default = "default_codec_preference")]
    pub supported_codecs: Vec<PayloadType>,
    pub rtp_port_range: (u16, u16),
    pub max_port_attempts: u32,
}

fn default_codec_preference() -> Vec<PayloadType> {
    media_core::codec::DEFAULT_PREFERENCE.to_vec()
}

impl Default for MediaOptions {
    fn default() -> Self {
        MediaOptions {
            audio_source: AudioSourceKind::Silence,
            audio_sink: AudioSinkKind::None,
            audio_file: None,
            output_file: None,
            input_device_id: None,
            output_device_id: None,
            supported_codecs: default_codec_preference(),
            rtp_port_range: (16384, 32768),
            max_port_attempts: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub transport: TransportOptions,
    pub allowed_methods: Vec<String>,
    pub uas_options: UasOptions,
    pub log_transactions: bool,
    pub media: MediaOptions,
}

impl Config {
    pub fn new() -> Self {
        Config { allowed_methods: default_allowed_methods(), ..Default::default() }
    }

    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.transport.listen_port = port;
        self
    }

    pub fn with_listen_addr(mut self, addr: IpAddr) -> Self {
        self.transport.listen_addr = addr;
        self
    }

    pub fn with_supported_codecs(mut self, codecs: Vec<PayloadType>) -> Self {
        self.media.supported_codecs = codecs;
        self
    }

    pub fn with_sip_trace(mut self, enabled: bool) -> Self {
        self.transport.sip_trace = enabled;
        self
    }

    pub fn allows_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

fn default_allowed_methods() -> Vec<String> {
    ["INVITE", "ACK", "BYE", "CANCEL", "OPTIONS", "INFO", "REGISTER", "SUBSCRIBE", "NOTIFY", "PUBLISH", "MESSAGE", "UPDATE", "PRACK"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_allows_the_spec_method_set() {
        let config = Config::new();
        assert!(config.allows_method("INVITE"));
        assert!(config.allows_method("bye"));
        assert!(!config.allows_method("PURGE"));
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = Config::new().with_listen_port(5060).with_supported_codecs(vec![PayloadType::Pcma]);
        assert_eq!(config.transport.listen_port, 5060);
        assert_eq!(config.media.supported_codecs, vec![PayloadType::Pcma]);
    }
}
