//! Pipeline orchestration (spec §4.G): wires source → chunker → encoder →
//! payloader → pacer → socket for the outbound leg, and socket →
//! depayloader → decoder → sink for the inbound leg, one task per
//! direction. `PipelineFactory` is the seam a session builds a pipeline
//! through without naming the concrete stage types itself — "the
//! controller is polymorphic over {selected codec, source, sink}".

use std::sync::Arc;
use std::time::Duration;

use rtp_core::{PayloadType, RtpSocket};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::chunker::Chunker;
use crate::codec;
use crate::payloader::Payloader;
use crate::pacer::Pacer;
use crate::sink::AudioSink;
use crate::source::AudioSource;

const FRAME_DURATION: Duration = Duration::from_millis(20);

/// The two running legs of one media session's pipeline. Dropping this (or
/// calling `stop`) aborts both tasks.
pub struct MediaPipeline {
    outbound: JoinHandle<()>,
    inbound: JoinHandle<()>,
}

impl MediaPipeline {
    pub fn stop(self) {
        self.outbound.abort();
        self.inbound.abort();
    }
}

/// Builds and spawns both legs of a pipeline for one negotiated codec.
/// Grounded on spec §4.G's stage list; the `PipelineFactory` seam is this
/// free function rather than a trait object, since this workspace has
/// exactly one concrete pipeline shape and no plugin point beyond codec
/// selection (which `codec::build` already supplies).
pub fn spawn(socket: Arc<RtpSocket>, payload_type: PayloadType, source: Box<dyn AudioSource>, sink: Box<dyn AudioSink>) -> crate::error::Result<MediaPipeline> {
    let outbound = spawn_outbound(socket.clone(), payload_type, source)?;
    let inbound = spawn_inbound(socket, payload_type, sink)?;
    Ok(MediaPipeline { outbound, inbound })
}

fn spawn_outbound(socket: Arc<RtpSocket>, payload_type: PayloadType, mut source: Box<dyn AudioSource>) -> crate::error::Result<JoinHandle<()>> {
    let mut codec = codec::build(payload_type)?;
    let frame_len = codec.frame_samples();
    let mut chunker = Chunker::new(frame_len, FRAME_DURATION);
    let mut payloader = Payloader::new(payload_type);
    let mut pacer = Pacer::new(FRAME_DURATION);

    Ok(tokio::spawn(async move {
        loop {
            pacer.wait_for_slot().await;
            let Some(raw) = source.next(frame_len) else {
                debug!("outbound source exhausted, stopping pipeline leg");
                break;
            };
            for frame in chunker.push(&raw) {
                let encoded = match codec.encode(&frame.samples) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(error = %e, "dropping frame, encode failed");
                        continue;
                    }
                };
                let packet = payloader.payload(encoded);
                if let Err(e) = socket.send(&packet).await {
                    warn!(error = %e, "dropping outbound RTP packet, send failed");
                }
            }
        }
    }))
}

fn spawn_inbound(socket: Arc<RtpSocket>, payload_type: PayloadType, mut sink: Box<dyn AudioSink>) -> crate::error::Result<JoinHandle<()>> {
    let mut codec = codec::build(payload_type)?;

    Ok(tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        loop {
            match socket.recv(&mut buf).await {
                Ok(Some((packet, _from))) => {
                    if packet.payload_type != payload_type.number() {
                        warn!(got = packet.payload_type, want = payload_type.number(), "dropping packet, unexpected payload type");
                        continue;
                    }
                    match codec.decode(&packet.payload) {
                        Ok(samples) => sink.accept(&samples),
                        Err(e) => warn!(error = %e, "dropping packet, decode failed"),
                    }
                }
                Ok(None) => continue, // already logged by the socket layer
                Err(e) => {
                    warn!(error = %e, "inbound RTP socket error, stopping pipeline leg");
                    break;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use super::*;
    use crate::sink::NullSink;
    use crate::source::SilenceSource;

    #[tokio::test]
    async fn pipeline_moves_silence_end_to_end() {
        let local: IpAddr = "127.0.0.1".parse().unwrap();
        let mut a = RtpSocket::bind(local, 0).await.unwrap();
        let b = RtpSocket::bind(local, 0).await.unwrap();
        a.set_remote(b.local_addr().unwrap());
        let mut b = b;
        b.set_remote(a.local_addr().unwrap());

        let pipeline = spawn(Arc::new(a), PayloadType::Pcma, Box::new(SilenceSource), Box::new(NullSink::default())).unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        pipeline.stop();

        // `b` was never wired into a pipeline here; this test only proves
        // the outbound leg runs without panicking under a real socket.
        drop(b);
    }
}
