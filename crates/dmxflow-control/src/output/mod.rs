//! DMX output
//!
//! A [`DmxTransport`] moves one 512-byte frame to the wire. [`DmxOutput`]
//! is the frame subscriber that encodes each sample set and hands it to a
//! transport.

mod artnet;

pub use artnet::{ArtNetSender, MAX_UNIVERSE};

use std::sync::Arc;

use parking_lot::Mutex;

use dmxflow_core::{DmxFrame, OutputSettings};

use crate::error::Result;
use crate::sampling::{FrameSubscriber, SampleSet};

/// Destination of DMX frames
pub trait DmxTransport: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    fn send_frame(&mut self, frame: &DmxFrame) -> Result<()>;
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullTransport;

impl DmxTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn send_frame(&mut self, _frame: &DmxFrame) -> Result<()> {
        Ok(())
    }
}

/// Keeps every frame in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct FrameRecorder {
    frames: Arc<Mutex<Vec<DmxFrame>>>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn last(&self) -> Option<DmxFrame> {
        self.frames.lock().last().cloned()
    }

    pub fn frames(&self) -> Vec<DmxFrame> {
        self.frames.lock().clone()
    }
}

impl DmxTransport for FrameRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn send_frame(&mut self, frame: &DmxFrame) -> Result<()> {
        self.frames.lock().push(frame.clone());
        Ok(())
    }
}

/// Build the transport named by the engine settings
pub fn transport_from_settings(settings: &OutputSettings) -> Result<Box<dyn DmxTransport>> {
    match settings {
        OutputSettings::ArtNet { target, universe } => {
            Ok(Box::new(ArtNetSender::new(*universe, target)?))
        }
        OutputSettings::Null => Ok(Box::new(NullTransport)),
    }
}

/// Frame subscriber writing every sample set to a transport
pub struct DmxOutput {
    transport: Box<dyn DmxTransport>,
    name: String,
    frames_sent: u64,
}

impl DmxOutput {
    pub fn new(transport: Box<dyn DmxTransport>) -> Self {
        let name = format!("dmx-{}", transport.name());
        Self {
            transport,
            name,
            frames_sent: 0,
        }
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

impl FrameSubscriber for DmxOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_sample(&mut self, samples: &SampleSet) -> Result<()> {
        let frame = samples.frame();
        self.transport.send_frame(&frame)?;
        self.frames_sent += 1;
        tracing::trace!("{} sent frame {}: {:?}", self.name, samples.tick, frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_clones_share_frames() {
        let recorder = FrameRecorder::new();
        let mut output = DmxOutput::new(Box::new(recorder.clone()));
        assert_eq!(output.name(), "dmx-recorder");

        output.on_sample(&SampleSet::default()).unwrap();
        output.on_sample(&SampleSet::default()).unwrap();
        assert_eq!(recorder.len(), 2);
        assert_eq!(output.frames_sent(), 2);
        assert_eq!(recorder.last(), Some(DmxFrame::new()));
    }

    #[test]
    fn test_transport_from_settings() {
        let null = transport_from_settings(&OutputSettings::Null).unwrap();
        assert_eq!(null.name(), "null");

        let artnet = transport_from_settings(&OutputSettings::ArtNet {
            target: "127.0.0.1:6454".into(),
            universe: 1,
        })
        .unwrap();
        assert_eq!(artnet.name(), "artnet");

        assert!(transport_from_settings(&OutputSettings::ArtNet {
            target: "nowhere".into(),
            universe: 0,
        })
        .is_err());
    }
}
