//! SDP offer/answer negotiation (spec §4.G, RFC 3264). Wire-format parsing
//! and formatting are already implemented in `sip_parse::sdp`; this module
//! is the negotiation policy layered on top of it — building an offer from
//! local state, and picking a codec from a remote offer.

use std::net::{Ipv4Addr, SocketAddr};

use rtp_core::PayloadType;
use sip_parse::sdp::{ConnectionInfo, MediaDescription, MediaDirection, Origin, RtpMap, SessionDescription};

use crate::error::{Error, Result};

/// Builds an offer (or an answer) SDP for one local RTP endpoint and codec
/// list, in local preference order (spec §4.G "Offer construction (UAC)").
pub fn build_sdp(local_addr: Ipv4Addr, local_port: u16, session_id: u64, codecs: &[PayloadType]) -> SessionDescription {
    let formats = codecs.iter().map(|c| c.number()).collect();
    let rtpmaps = codecs
        .iter()
        .map(|c| RtpMap { payload_type: c.number(), encoding_name: c.rtpmap_encoding().to_string(), clock_rate: c.clock_rate(), channels: Some(c.channels()) })
        .collect();

    SessionDescription {
        origin: Origin { username: "-".into(), sess_id: session_id, sess_version: session_id, address: local_addr },
        session_name: "-".into(),
        connection: Some(ConnectionInfo { address: local_addr }),
        time: (0, 0),
        media: vec![MediaDescription {
            media: "audio".into(),
            port: local_port,
            proto: "RTP/AVP".into(),
            formats,
            connection: Some(ConnectionInfo { address: local_addr }),
            rtpmaps,
            direction: MediaDirection::SendRecv,
        }],
    }
}

/// Offer processing (spec §4.G "Offer processing (UAS)"): extracts the
/// remote media address/port and negotiates a codec. Fails with
/// `NoAudioMedia`/`NoCommonCodec` per spec §7.
pub fn negotiate(remote: &SessionDescription, local_preference: &[PayloadType]) -> Result<(PayloadType, SocketAddr)> {
    let audio = remote.audio_media().ok_or(Error::Media(media_core::Error::NoAudioMedia))?;
    let connection = remote.connection_for(audio).ok_or(Error::Media(media_core::Error::NoAudioMedia))?;

    let selected = media_core::codec::select_codec(&audio.formats, local_preference).ok_or(Error::Media(media_core::Error::NoCommonCodec))?;

    Ok((selected, SocketAddr::new(connection.address.into(), audio.port)))
}

#[cfg(test)]
mod tests {
    use sip_parse::sdp::parse_sdp;

    use super::*;

    fn offer() -> SessionDescription {
        parse_sdp(
            "v=0\r\n\
             o=alice 123 456 IN IP4 10.0.0.1\r\n\
             s=-\r\n\
             c=IN IP4 10.0.0.1\r\n\
             t=0 0\r\n\
             m=audio 30000 RTP/AVP 8 0\r\n\
             a=rtpmap:8 PCMA/8000\r\n\
             a=rtpmap:0 PCMU/8000\r\n\
             a=sendrecv\r\n",
        )
        .unwrap()
    }

    #[test]
    fn negotiate_picks_by_local_preference() {
        let (codec, addr) = negotiate(&offer(), &[PayloadType::Pcma, PayloadType::Pcmu]).unwrap();
        assert_eq!(codec, PayloadType::Pcma);
        assert_eq!(addr, "10.0.0.1:30000".parse().unwrap());
    }

    #[test]
    fn negotiate_fails_without_a_common_codec() {
        let result = negotiate(&offer(), &[PayloadType::Opus]);
        assert!(matches!(result, Err(Error::Media(media_core::Error::NoCommonCodec))));
    }

    #[test]
    fn build_sdp_emits_one_audio_section_per_codec() {
        let sdp = build_sdp("127.0.0.1".parse().unwrap(), 20000, 1, &[PayloadType::Pcma, PayloadType::Pcmu]);
        let audio = sdp.audio_media().unwrap();
        assert_eq!(audio.formats, vec![8, 0]);
        assert_eq!(audio.port, 20000);
    }
}
