//! Prints sample sets as JSON lines on stdout

use dmxflow_control::{ControlError, FrameSubscriber, SampleSet, SampledDevice};

/// Writes a line whenever a sampled value changes
#[derive(Default)]
pub struct Monitor {
    last: Option<Vec<SampledDevice>>,
}

impl FrameSubscriber for Monitor {
    fn name(&self) -> &str {
        "monitor"
    }

    fn on_sample(&mut self, samples: &SampleSet) -> dmxflow_control::Result<()> {
        if self.last.as_ref() == Some(&samples.devices) {
            return Ok(());
        }
        let line = serde_json::to_string(samples).map_err(ControlError::from)?;
        println!("{}", line);
        self.last = Some(samples.devices.clone());
        Ok(())
    }
}
