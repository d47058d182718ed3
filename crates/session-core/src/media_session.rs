//! The media session entity and its lifecycle state machine (spec §3
//! "Media session entity", §4.G "Lifecycle state machine").

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use media_core::{MediaPipeline, NullSink, SilenceSource};
use rtp_core::{PayloadType, RtpSocket};
use sip_parse::sdp::{format_sdp, parse_sdp, SessionDescription};
use sip_types::dialog_id::DialogKey;
use tracing::debug;

use crate::error::{Error, Result};
use crate::negotiation;
use crate::port_allocator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Uac,
    Uas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Idle,
    Negotiating,
    Ready,
    Active,
    Paused,
    Terminated,
}

/// One negotiated audio stream (spec §3 Media session entity). Owns its
/// allocated RTP port and running pipeline exclusively (spec §5
/// ownership rule); the dialog layer only ever references it by
/// `dialog_key` through the process-wide registry.
pub struct MediaSession {
    pub id: u64,
    pub dialog_key: DialogKey,
    pub role: Role,
    pub state: MediaState,
    local_addr: IpAddr,
    local_sdp: Option<SessionDescription>,
    remote_sdp: Option<SessionDescription>,
    codec: Option<PayloadType>,
    remote_media_addr: Option<SocketAddr>,
    socket: Option<RtpSocket>,
    pipeline: Option<MediaPipeline>,
}

impl MediaSession {
    pub fn new(id: u64, dialog_key: DialogKey, role: Role, local_addr: IpAddr) -> Self {
        MediaSession {
            id,
            dialog_key,
            role,
            state: MediaState::Idle,
            local_addr,
            local_sdp: None,
            remote_sdp: None,
            codec: None,
            remote_media_addr: None,
            socket: None,
            pipeline: None,
        }
    }

    /// UAC path: `idle` → `negotiating` (spec §4.G transitions).
    pub async fn generate_offer(&mut self, codecs: &[PayloadType], port_range: (u16, u16), max_attempts: u32) -> Result<String> {
        self.require_state(MediaState::Idle)?;
        let socket = port_allocator::allocate(self.local_addr, port_range, max_attempts).await?;
        let local_port = socket.local_addr()?.port();
        let local_addr_v4 = match self.local_addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => std::net::Ipv4Addr::LOCALHOST,
        };
        let sdp = negotiation::build_sdp(local_addr_v4, local_port, self.id, codecs);
        let wire = format_sdp(&sdp);
        self.local_sdp = Some(sdp);
        self.socket = Some(socket);
        self.state = MediaState::Negotiating;
        debug!(session = self.id, port = local_port, "generated SDP offer");
        Ok(wire)
    }

    /// UAC path: `negotiating` → `ready` on receiving the answer.
    pub fn process_answer(&mut self, answer_sdp: &str) -> Result<()> {
        self.require_state(MediaState::Negotiating)?;
        let remote = parse_sdp(answer_sdp)?;
        let audio = remote.audio_media().ok_or(Error::Media(media_core::Error::NoAudioMedia))?;
        let connection = remote.connection_for(audio).ok_or(Error::Media(media_core::Error::NoAudioMedia))?;
        let codec = audio.formats.first().and_then(|&pt| PayloadType::from_number(pt)).ok_or(Error::Media(media_core::Error::NoCommonCodec))?;

        self.remote_media_addr = Some(SocketAddr::new(connection.address.into(), audio.port));
        self.codec = Some(codec);
        self.remote_sdp = Some(remote);
        self.state = MediaState::Ready;
        Ok(())
    }

    /// UAS path: `idle` → `ready` in one step (spec §4.G: offer processing
    /// allocates a port, picks a codec, and returns the answer already).
    pub async fn process_offer(&mut self, offer_sdp: &str, local_preference: &[PayloadType], port_range: (u16, u16), max_attempts: u32) -> Result<String> {
        self.require_state(MediaState::Idle)?;
        let remote = parse_sdp(offer_sdp)?;
        let (codec, remote_addr) = negotiation::negotiate(&remote, local_preference)?;

        let socket = port_allocator::allocate(self.local_addr, port_range, max_attempts).await?;
        let local_port = socket.local_addr()?.port();
        let local_addr_v4 = match self.local_addr {
            IpAddr::V4(v4) => v4,
            IpAddr::V6(_) => std::net::Ipv4Addr::LOCALHOST,
        };
        let answer = negotiation::build_sdp(local_addr_v4, local_port, self.id, &[codec]);
        let wire = format_sdp(&answer);

        self.remote_sdp = Some(remote);
        self.local_sdp = Some(answer);
        self.codec = Some(codec);
        self.remote_media_addr = Some(remote_addr);
        self.socket = Some(socket);
        self.state = MediaState::Ready;
        Ok(wire)
    }

    /// `ready` → `active`: binds the remote address onto the RTP socket
    /// and spawns the pipeline (spec §4.G pipeline orchestration). Uses
    /// silence/null source and sink, the only concrete implementations
    /// this workspace carries (see `media_core::source`/`sink`).
    pub fn start_media(&mut self) -> Result<()> {
        self.require_state(MediaState::Ready)?;
        let codec = self.codec.expect("codec set once state reaches ready");
        let remote = self.remote_media_addr.expect("remote address set once state reaches ready");
        let mut socket = self.socket.take().expect("socket set once state reaches ready");
        socket.set_remote(remote);

        let pipeline = media_core::spawn(Arc::new(socket), codec, Box::new(SilenceSource), Box::new(NullSink::default()))?;
        self.pipeline = Some(pipeline);
        self.state = MediaState::Active;
        Ok(())
    }

    /// `active` → `paused`. Reserved per spec §9's pause/resume Open
    /// Question: the state is represented but no media effect is wired to
    /// it (this workspace does not tear down or mute the pipeline).
    pub fn pause_media(&mut self) -> Result<()> {
        self.require_state(MediaState::Active)?;
        self.state = MediaState::Paused;
        Ok(())
    }

    pub fn resume_media(&mut self) -> Result<()> {
        self.require_state(MediaState::Paused)?;
        self.state = MediaState::Active;
        Ok(())
    }

    /// Any state → `terminated` (owner death or explicit teardown).
    pub fn terminate(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
        self.state = MediaState::Terminated;
    }

    pub fn codec(&self) -> Option<PayloadType> {
        self.codec
    }

    fn require_state(&self, expected: MediaState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::WrongMediaState { state: self.state, expected })
        }
    }
}

#[cfg(test)]
mod tests {
    use sip_types::dialog_id::DialogKey;

    use super::*;

    fn key() -> DialogKey {
        DialogKey::new("call-1", "local-tag", "remote-tag")
    }

    #[tokio::test]
    async fn uac_offer_then_answer_reaches_ready_and_active() {
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let mut uac = MediaSession::new(1, key(), Role::Uac, local);

        let offer = uac.generate_offer(&[PayloadType::Pcma], (16384, 32768), 10).await.unwrap();
        assert_eq!(uac.state, MediaState::Negotiating);

        let offer_sdp = parse_sdp(&offer).unwrap();
        let offer_port = offer_sdp.audio_media().unwrap().port;
        assert!((16384..32768).contains(&offer_port));

        // Fabricate an answer on some other local port, as the remote peer would send.
        let answer_sdp = negotiation::build_sdp("127.0.0.1".parse().unwrap(), 40000, 2, &[PayloadType::Pcma]);
        uac.process_answer(&format_sdp(&answer_sdp)).unwrap();
        assert_eq!(uac.state, MediaState::Ready);
        assert_eq!(uac.codec(), Some(PayloadType::Pcma));

        uac.start_media().unwrap();
        assert_eq!(uac.state, MediaState::Active);

        uac.terminate();
        assert_eq!(uac.state, MediaState::Terminated);
    }

    #[tokio::test]
    async fn uas_process_offer_reaches_ready_directly() {
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let mut uas = MediaSession::new(2, key(), Role::Uas, local);

        let offer = negotiation::build_sdp("10.0.0.1".parse().unwrap(), 30000, 1, &[PayloadType::Pcma, PayloadType::Pcmu]);
        let answer = uas.process_offer(&format_sdp(&offer), &[PayloadType::Pcma], (16384, 32768), 10).await.unwrap();
        assert_eq!(uas.state, MediaState::Ready);

        let answer_sdp = parse_sdp(&answer).unwrap();
        assert_eq!(answer_sdp.audio_media().unwrap().formats, vec![8]);
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_state() {
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let mut session = MediaSession::new(3, key(), Role::Uas, local);
        let offer = negotiation::build_sdp("10.0.0.1".parse().unwrap(), 30000, 1, &[PayloadType::Pcma]);
        session.process_offer(&format_sdp(&offer), &[PayloadType::Pcma], (16384, 32768), 10).await.unwrap();
        session.start_media().unwrap();

        session.pause_media().unwrap();
        assert_eq!(session.state, MediaState::Paused);
        session.resume_media().unwrap();
        assert_eq!(session.state, MediaState::Active);
    }

    #[tokio::test]
    async fn wrong_state_transition_is_rejected() {
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let mut session = MediaSession::new(4, key(), Role::Uac, local);
        assert!(session.start_media().is_err());
    }
}
