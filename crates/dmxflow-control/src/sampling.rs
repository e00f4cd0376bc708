//! Sampling loop
//!
//! Once per tick the loop pushes the show's current style document into the
//! renderer (when its revision moved), lets the renderer recompute, reads
//! every device back into control values and hands the resulting
//! [`SampleSet`] to each [`FrameSubscriber`].
//!
//! The show lock is held only while sampling; subscribers run after it is
//! released. A subscriber that errors or panics is logged and skipped, the
//! remaining subscribers and the next tick are unaffected.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use dmxflow_control::{HeadlessRenderer, SamplingLoop};
//! use dmxflow_core::Show;
//!
//! # async fn run() {
//! let show = Arc::new(Mutex::new(Show::new()));
//! let mut handle = SamplingLoop::new(show, HeadlessRenderer::new()).spawn(60);
//! // ...
//! handle.stop();
//! # }
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use dmxflow_core::input::{input_state_attribute, input_value_property};
use dmxflow_core::registry::device_types;
use dmxflow_core::{sample_control_values, ControlValues, DeviceId, DmxFrame, Show};

use crate::error::Result;
use crate::render::StyleRenderer;

/// Control values read back for one device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledDevice {
    pub id: DeviceId,
    pub device_type_key: String,
    pub start_channel: u16,
    pub values: ControlValues,
}

/// Everything read back in one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSet {
    /// Monotonic tick counter of the loop
    pub tick: u64,
    /// Show revision the sample was taken from
    pub revision: u64,
    /// Devices in display order
    pub devices: Vec<SampledDevice>,
}

impl SampleSet {
    pub fn get(&self, id: &DeviceId) -> Option<&SampledDevice> {
        self.devices.iter().find(|device| &device.id == id)
    }

    /// Encode the sampled values into one universe
    ///
    /// Later devices overwrite earlier ones where channels overlap.
    pub fn frame(&self) -> DmxFrame {
        let registry = device_types();
        let mut frame = DmxFrame::new();
        for device in &self.devices {
            if let Some(device_type) = registry.get(&device.device_type_key) {
                frame.write_device(device_type, device.start_channel as usize, &device.values);
            }
        }
        frame
    }
}

/// Receives every sample set
pub trait FrameSubscriber: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    fn on_sample(&mut self, samples: &SampleSet) -> Result<()>;
}

/// Input changes forwarded to the renderer before a tick
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// New value of an input control component
    Value { property: String, value: f64 },
    /// New state of an input control, `None` clears it
    State {
        attribute: String,
        state: Option<String>,
    },
}

impl InputEvent {
    pub fn value(device_id: &str, control_id: &str, component: Option<&str>, value: f64) -> Self {
        InputEvent::Value {
            property: input_value_property(device_id, control_id, component),
            value,
        }
    }

    pub fn state(device_id: &str, control_id: &str, state: Option<&str>) -> Self {
        InputEvent::State {
            attribute: input_state_attribute(device_id, control_id),
            state: state.map(str::to_string),
        }
    }

    fn apply<R: StyleRenderer>(&self, renderer: &mut R) {
        match self {
            InputEvent::Value { property, value } => renderer.set_input_value(property, *value),
            InputEvent::State { attribute, state } => {
                renderer.set_input_state(attribute, state.as_deref())
            }
        }
    }
}

/// Counters of a running loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub subscriber_failures: u64,
}

/// Drives a renderer and feeds subscribers
pub struct SamplingLoop<R: StyleRenderer> {
    show: Arc<Mutex<Show>>,
    renderer: R,
    subscribers: Vec<Box<dyn FrameSubscriber>>,
    applied_revision: Option<u64>,
    previous: HashMap<DeviceId, ControlValues>,
    clock: Instant,
    stats: LoopStats,
}

impl<R: StyleRenderer> SamplingLoop<R> {
    pub fn new(show: Arc<Mutex<Show>>, renderer: R) -> Self {
        Self {
            show,
            renderer,
            subscribers: Vec::new(),
            applied_revision: None,
            previous: HashMap::new(),
            clock: Instant::now(),
            stats: LoopStats::default(),
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn FrameSubscriber>) {
        tracing::info!("Frame subscriber '{}' attached", subscriber.name());
        self.subscribers.push(subscriber);
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn input(&mut self, event: &InputEvent) {
        event.apply(&mut self.renderer);
    }

    /// Sample and publish at the loop's own clock
    pub fn tick(&mut self) -> SampleSet {
        let now = self.clock.elapsed();
        self.tick_at(now)
    }

    /// Sample and publish with an explicit renderer time
    pub fn tick_at(&mut self, now: Duration) -> SampleSet {
        let samples = self.sample(now);
        self.publish(&samples);
        samples
    }

    /// Read every device back without publishing
    pub fn sample(&mut self, now: Duration) -> SampleSet {
        self.stats.ticks += 1;
        let show = self.show.lock();

        if self.applied_revision != Some(show.revision()) {
            self.renderer.apply_document(show.document());
            self.applied_revision = Some(show.revision());
        }
        self.renderer.recompute(now);

        let registry = device_types();
        let document = show.document();
        let mut samples = SampleSet {
            tick: self.stats.ticks,
            revision: show.revision(),
            devices: Vec::with_capacity(show.devices().len()),
        };

        for device in show.devices().iter() {
            let Some(device_type) = registry.get(&device.device_type_key) else {
                tracing::debug!(
                    "Skipping device '{}' of unknown type '{}'",
                    device.display_name,
                    device.device_type_key
                );
                continue;
            };
            let Some(element) = document.element_id(&device.id) else {
                continue;
            };

            let previous = self
                .previous
                .get(&device.id)
                .unwrap_or(&device.control_values);
            let outcome = sample_control_values(device_type.controls(), previous, |property| {
                self.renderer.computed_value(element, property)
            });

            self.previous.insert(device.id, outcome.values.clone());
            samples.devices.push(SampledDevice {
                id: device.id,
                device_type_key: device.device_type_key.clone(),
                start_channel: device.start_channel,
                values: outcome.values,
            });
        }
        drop(show);

        self.previous
            .retain(|id, _| samples.devices.iter().any(|device| &device.id == id));
        tracing::trace!(
            "Tick {} sampled {} devices",
            samples.tick,
            samples.devices.len()
        );
        samples
    }

    /// Hand a sample set to every subscriber
    pub fn publish(&mut self, samples: &SampleSet) {
        for subscriber in &mut self.subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_sample(samples)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.stats.subscriber_failures += 1;
                    tracing::warn!("Subscriber '{}' failed: {}", subscriber.name(), e);
                }
                Err(panic) => {
                    self.stats.subscriber_failures += 1;
                    tracing::warn!(
                        "Subscriber '{}' panicked: {}",
                        subscriber.name(),
                        panic_message(panic.as_ref())
                    );
                }
            }
        }
    }
}

impl<R: StyleRenderer + 'static> SamplingLoop<R> {
    /// Run the loop on the tokio runtime at `rate_hz` ticks per second
    ///
    /// Ticks that fall behind are skipped rather than bunched up.
    pub fn spawn(mut self, rate_hz: u32) -> SamplingHandle<R> {
        let period = Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<InputEvent>();

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!("Sampling loop started at {} Hz", rate_hz.max(1));

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        while let Ok(event) = input_rx.try_recv() {
                            self.input(&event);
                        }
                        self.tick();
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Sampling loop stopped after {} ticks", self.stats.ticks);
            self
        });

        SamplingHandle {
            stop_tx,
            input_tx,
            task: Some(task),
        }
    }
}

/// Owner of a spawned loop; dropping it stops the loop
pub struct SamplingHandle<R: StyleRenderer> {
    stop_tx: watch::Sender<bool>,
    input_tx: mpsc::UnboundedSender<InputEvent>,
    task: Option<JoinHandle<SamplingLoop<R>>>,
}

impl<R: StyleRenderer> SamplingHandle<R> {
    /// Ask the loop to stop; calling it again does nothing
    pub fn stop(&mut self) {
        if !*self.stop_tx.borrow() {
            // Err only when the loop already exited.
            let _ = self.stop_tx.send(true);
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Forward an input change; ignored once the loop stopped
    pub fn send_input(&self, event: InputEvent) {
        if self.input_tx.send(event).is_err() {
            tracing::debug!("Input dropped, sampling loop is not running");
        }
    }

    /// Stop the loop and wait for it, returning it for inspection
    pub async fn join(mut self) -> Option<SamplingLoop<R>> {
        self.stop();
        let task = self.task.take()?;
        match task.await {
            Ok(sampling) => Some(sampling),
            Err(e) => {
                tracing::warn!("Sampling loop task failed: {}", e);
                None
            }
        }
    }
}

impl<R: StyleRenderer> Drop for SamplingHandle<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
