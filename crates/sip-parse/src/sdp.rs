//! SDP offer/answer wire format (spec §6: RFC 4566/3264).
//!
//! Only the subset this platform needs is modeled: one origin/session/time
//! line each, an optional session-level connection line, and any number of
//! `m=` media sections each carrying their own connection line, `rtpmap`
//! attributes, and a direction attribute.

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub sess_id: u64,
    pub sess_version: u64,
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub address: Ipv4Addr,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IN IP4 {}", self.address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDirection {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl MediaDirection {
    fn as_attr(self) -> &'static str {
        match self {
            MediaDirection::SendRecv => "sendrecv",
            MediaDirection::SendOnly => "sendonly",
            MediaDirection::RecvOnly => "recvonly",
            MediaDirection::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

impl fmt::Display for RtpMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.payload_type, self.encoding_name, self.clock_rate)?;
        if let Some(ch) = self.channels {
            write!(f, "/{}", ch)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    pub media: String,
    pub port: u16,
    pub proto: String,
    pub formats: Vec<u8>,
    pub connection: Option<ConnectionInfo>,
    pub rtpmaps: Vec<RtpMap>,
    pub direction: MediaDirection,
}

impl MediaDescription {
    pub fn rtpmap_for(&self, pt: u8) -> Option<&RtpMap> {
        self.rtpmaps.iter().find(|r| r.payload_type == pt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub origin: Origin,
    pub session_name: String,
    pub connection: Option<ConnectionInfo>,
    pub time: (u64, u64),
    pub media: Vec<MediaDescription>,
}

impl SessionDescription {
    /// First audio `m=` line, or `None` (spec §4.G "no_audio_media").
    pub fn audio_media(&self) -> Option<&MediaDescription> {
        self.media.iter().find(|m| m.media == "audio")
    }

    /// Connection address for a given media section, falling back to the
    /// session-level connection line per RFC 4566 §5.7.
    pub fn connection_for<'a>(&'a self, media: &'a MediaDescription) -> Option<&'a ConnectionInfo> {
        media.connection.as_ref().or(self.connection.as_ref())
    }
}

pub fn parse_sdp(input: &str) -> Result<SessionDescription> {
    let mut origin = None;
    let mut session_name = None;
    let mut session_connection = None;
    let mut time = None;
    let mut media: Vec<MediaDescription> = Vec::new();

    for raw_line in input.lines() {
        let line = raw_line.trim_end_matches('\r');
        if line.len() < 2 || line.as_bytes()[1] != b'=' {
            continue;
        }
        let (kind, value) = (line.as_bytes()[0] as char, &line[2..]);
        match kind {
            'o' => origin = Some(parse_origin(value)?),
            's' => session_name = Some(value.to_string()),
            'c' => {
                let conn = parse_connection(value)?;
                if let Some(last) = media.last_mut() {
                    last.connection = Some(conn);
                } else {
                    session_connection = Some(conn);
                }
            }
            't' => time = Some(parse_time(value)?),
            'm' => media.push(parse_media(value)?),
            'a' => apply_attribute(&mut media, value),
            _ => {}
        }
    }

    Ok(SessionDescription {
        origin: origin.ok_or_else(|| Error::BadHeader { name: "sdp".into(), value: "missing o=".into() })?,
        session_name: session_name.unwrap_or_default(),
        connection: session_connection,
        time: time.unwrap_or((0, 0)),
        media,
    })
}

fn parse_origin(value: &str) -> Result<Origin> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(Error::BadHeader { name: "sdp".into(), value: format!("o={}", value) });
    }
    Ok(Origin {
        username: parts[0].to_string(),
        sess_id: parts[1].parse().unwrap_or(0),
        sess_version: parts[2].parse().unwrap_or(0),
        address: parts[5].parse().map_err(|_| Error::BadHeader { name: "sdp".into(), value: value.into() })?,
    })
}

fn parse_connection(value: &str) -> Result<ConnectionInfo> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    let address = parts
        .get(2)
        .ok_or_else(|| Error::BadHeader { name: "sdp".into(), value: format!("c={}", value) })?
        .parse()
        .map_err(|_| Error::BadHeader { name: "sdp".into(), value: value.into() })?;
    Ok(ConnectionInfo { address })
}

fn parse_time(value: &str) -> Result<(u64, u64)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    Ok((parts.first().and_then(|s| s.parse().ok()).unwrap_or(0), parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0)))
}

fn parse_media(value: &str) -> Result<MediaDescription> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(Error::BadHeader { name: "sdp".into(), value: format!("m={}", value) });
    }
    let port = parts[1].parse().map_err(|_| Error::BadHeader { name: "sdp".into(), value: value.into() })?;
    let formats = parts[3..].iter().filter_map(|p| p.parse().ok()).collect();
    Ok(MediaDescription {
        media: parts[0].to_string(),
        port,
        proto: parts[2].to_string(),
        formats,
        connection: None,
        rtpmaps: Vec::new(),
        direction: MediaDirection::SendRecv,
    })
}

fn apply_attribute(media: &mut [MediaDescription], value: &str) {
    let Some(last) = media.last_mut() else { return };
    if let Some(rest) = value.strip_prefix("rtpmap:") {
        if let Some(rtpmap) = parse_rtpmap(rest) {
            last.rtpmaps.push(rtpmap);
        }
    } else {
        last.direction = match value {
            "sendrecv" => MediaDirection::SendRecv,
            "sendonly" => MediaDirection::SendOnly,
            "recvonly" => MediaDirection::RecvOnly,
            "inactive" => MediaDirection::Inactive,
            _ => last.direction,
        };
    }
}

fn parse_rtpmap(value: &str) -> Option<RtpMap> {
    let (pt_str, rest) = value.split_once(' ')?;
    let payload_type: u8 = pt_str.parse().ok()?;
    let mut parts = rest.split('/');
    let encoding_name = parts.next()?.to_string();
    let clock_rate: u32 = parts.next()?.parse().ok()?;
    let channels = parts.next().and_then(|c| c.parse().ok());
    Some(RtpMap { payload_type, encoding_name, clock_rate, channels })
}

pub fn format_sdp(sdp: &SessionDescription) -> String {
    let mut out = String::new();
    out.push_str("v=0\r\n");
    out.push_str(&format!(
        "o={} {} {} IN IP4 {}\r\n",
        sdp.origin.username, sdp.origin.sess_id, sdp.origin.sess_version, sdp.origin.address
    ));
    out.push_str(&format!("s={}\r\n", if sdp.session_name.is_empty() { "-" } else { &sdp.session_name }));
    if let Some(conn) = &sdp.connection {
        out.push_str(&format!("c={}\r\n", conn));
    }
    out.push_str(&format!("t={} {}\r\n", sdp.time.0, sdp.time.1));
    for media in &sdp.media {
        let formats: Vec<String> = media.formats.iter().map(u8::to_string).collect();
        out.push_str(&format!("m={} {} {} {}\r\n", media.media, media.port, media.proto, formats.join(" ")));
        if let Some(conn) = &media.connection {
            out.push_str(&format!("c={}\r\n", conn));
        }
        for rtpmap in &media.rtpmaps {
            out.push_str(&format!("a=rtpmap:{}\r\n", rtpmap));
        }
        out.push_str(&format!("a={}\r\n", media.direction.as_attr()));
    }
    out
}
