use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::animation::SharedAnimation;
use crate::color::Pixel;
use crate::command::CommandIngestor;
use crate::config::AnimationConfig;
use crate::error::{AmbientError, Result};
use crate::output::Bus;
use crate::protocol::{EncodedFrame, Waveform, RESET_LATCH};
use crate::renderer::FrameRenderer;

const STATS_INTERVAL: Duration = Duration::from_secs(5);
/// Falling further behind than this many periods drops the backlog.
const MAX_DRIFT_PERIODS: u32 = 2;
const HEX_DUMP_BYTES: usize = 24;

/// Counters shared with whoever wants to watch the loop.
#[derive(Debug, Default)]
pub struct FrameStats {
    pub frames_sent: AtomicU64,
    pub faults: AtomicU64,
}

/// Renders and sends one frame per period until the running flag clears.
pub struct TransmitLoop {
    bus: Box<dyn Bus>,
    waveform: Waveform,
    state: SharedAnimation,
    ingestor: Option<CommandIngestor>,
    renderer: FrameRenderer,
    frame_period: Duration,
    hue_step: u8,
    running: Arc<AtomicBool>,
    stats: Arc<FrameStats>,
}

impl TransmitLoop {
    pub fn new(
        config: &AnimationConfig,
        bus: Box<dyn Bus>,
        state: SharedAnimation,
        ingestor: Option<CommandIngestor>,
    ) -> Self {
        TransmitLoop {
            waveform: bus.waveform(),
            bus,
            state,
            ingestor,
            renderer: FrameRenderer::from_config(config),
            frame_period: config.frame_period(),
            hue_step: config.hue_step,
            running: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(FrameStats::default()),
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stats(&self) -> Arc<FrameStats> {
        Arc::clone(&self.stats)
    }

    pub fn state(&self) -> &SharedAnimation {
        &self.state
    }

    /// Blank the strip, then run the frame loop until the running flag clears.
    ///
    /// Cancellation is observed between ticks, never inside a bus write.
    pub fn run(&mut self) {
        self.send_off_frame("startup");
        info!(
            "transmitting {} LEDs to {} every {:?}",
            self.renderer.led_count(),
            self.bus.name(),
            self.frame_period
        );

        let mut next_frame = Instant::now();
        let mut stats_at = Instant::now() + STATS_INTERVAL;
        let mut last_sent = 0u64;

        while self.running.load(Ordering::Relaxed) {
            self.tick();
            next_frame += self.frame_period;

            let now = Instant::now();
            if now > next_frame + self.frame_period * MAX_DRIFT_PERIODS {
                debug!("frame loop fell behind, resetting schedule");
                next_frame = now;
            }

            if now >= stats_at {
                let sent = self.stats.frames_sent.load(Ordering::Relaxed);
                let fps = (sent - last_sent) as f64 / STATS_INTERVAL.as_secs_f64();
                debug!(
                    "[stats] {:.1} fps, {} frames sent, {} faults",
                    fps,
                    sent,
                    self.stats.faults.load(Ordering::Relaxed)
                );
                last_sent = sent;
                stats_at = now + STATS_INTERVAL;
            }

            if let Some(wait) = next_frame.checked_duration_since(now) {
                thread::sleep(wait);
            }
        }
    }

    /// Stop taking commands, force the strip off and release the bus.
    pub fn shutdown(mut self) {
        if let Some(mut ingestor) = self.ingestor.take() {
            ingestor.stop();
        }
        self.state.force_off();

        let pixels = self.renderer.render(&self.state.snapshot());
        let frame = self.waveform.encode(&pixels);
        if let Err(e) = self.transmit(&frame) {
            warn!("failed to blank {} on shutdown: {}", self.bus.name(), e);
        }
        thread::sleep(RESET_LATCH);
        info!("LEDs off, released {}", self.bus.name());
    }

    fn tick(&mut self) {
        let snapshot = self.state.take_frame_snapshot(self.hue_step);
        let pixels = self.renderer.render(&snapshot);
        let frame = self.waveform.encode(&pixels);
        if let Err(e) = self.transmit(&frame) {
            warn!("transmission fault on {}: {}", self.bus.name(), e);
        }
    }

    fn send_off_frame(&mut self, reason: &str) {
        let frame = self.waveform.encode(&vec![Pixel::OFF; self.renderer.led_count()]);
        if let Err(e) = self.transmit(&frame) {
            warn!("{} blanking of {} failed: {}", reason, self.bus.name(), e);
        }
        thread::sleep(RESET_LATCH);
    }

    fn transmit(&mut self, frame: &EncodedFrame) -> Result<()> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let hex: String = frame
                .as_bytes()
                .iter()
                .take(HEX_DUMP_BYTES)
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            trace!("sending {} bytes to {}: {} ...", frame.len(), self.bus.name(), hex);
        }

        let accepted = self.bus.transmit(frame.as_bytes()).map_err(|e| {
            self.stats.faults.fetch_add(1, Ordering::Relaxed);
            AmbientError::Transmit(e)
        })?;
        if accepted != frame.len() {
            self.stats.faults.fetch_add(1, Ordering::Relaxed);
            return Err(AmbientError::ShortWrite {
                expected: frame.len(),
                actual: accepted,
            });
        }
        self.stats.frames_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
