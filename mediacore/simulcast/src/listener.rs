//! Simulcast layer-selection: forwards the best available spatial layer
//! across N parallel SSRC encodings of the same scene, preserving a
//! strictly monotone output timeline.
//!
//! Grounded on `SimulcastMediaFrameListener.h`'s field layout
//! (`layerDimensions`, `initialTimestamps`, `timestampLayers`, `queue`,
//! `referenceFrameTime`, `lastForwardedTimestamp`). The header's listener
//! registration (`AddMediaListener`/`RemoveMediaListener`) is replaced here
//! by a drain-buffer, matching this workspace's `ChunkDecoder::feed`/
//! `RtmpConnection::take_outbound` style rather than a callback-set, since
//! nothing in this crate owns a `TimeService::Async` equivalent to invoke
//! callbacks on.

use std::collections::{BTreeSet, HashMap, VecDeque};

use logging::Logger;
use rtp::VideoFrame;

/// Tunables for a [`SimulcastMediaFrameListener`].
#[derive(Debug, Clone, Copy)]
pub struct SimulcastConfig {
    pub num_layers: u32,
    pub max_queue_size: usize,
    /// Number of consecutive missed common timestamps on the selected layer
    /// before it is considered silent and eligible for switch-down. The
    /// specification leaves the exact timeout unstated; see `DESIGN.md`.
    pub silence_timeout_frames: u32,
}

impl Default for SimulcastConfig {
    fn default() -> Self {
        SimulcastConfig {
            num_layers: 1,
            max_queue_size: 32,
            silence_timeout_frames: 3,
        }
    }
}

struct TimestampLayers {
    entries: VecDeque<(i64, BTreeSet<u32>)>,
}

impl TimestampLayers {
    fn new() -> Self {
        TimestampLayers { entries: VecDeque::new() }
    }

    /// Records that `ssrc` has a frame at normalized timestamp `ts`,
    /// tolerating the documented one-tick jitter.
    fn record(&mut self, ts: i64, ssrc: u32) {
        if let Some(entry) = self.entries.iter_mut().find(|(existing, _)| (*existing - ts).abs() <= 1) {
            entry.1.insert(ssrc);
            return;
        }
        let pos = self.entries.iter().position(|(existing, _)| *existing > ts).unwrap_or(self.entries.len());
        let mut set = BTreeSet::new();
        set.insert(ssrc);
        self.entries.insert(pos, (ts, set));
    }

    fn front(&self) -> Option<&(i64, BTreeSet<u32>)> {
        self.entries.front()
    }

    fn pop_front(&mut self) -> Option<(i64, BTreeSet<u32>)> {
        self.entries.pop_front()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Selects, per output timestamp, the best currently-live spatial layer out
/// of N parallel encodings and forwards exactly one frame for it.
pub struct SimulcastMediaFrameListener {
    config: SimulcastConfig,
    initialised: bool,
    selected_ssrc: Option<u32>,
    reference_frame_time_ms: Option<u64>,
    last_forwarded_timestamp: Option<i64>,

    initial_timestamps: HashMap<u32, i64>,
    layer_dimensions: HashMap<u32, u32>,
    consecutive_misses: HashMap<u32, u32>,

    queue: VecDeque<VideoFrame>,
    timestamp_layers: TimestampLayers,
    forwarded: Vec<VideoFrame>,

    logger: Logger,
}

impl SimulcastMediaFrameListener {
    pub fn new(config: SimulcastConfig, logger: Logger) -> Self {
        SimulcastMediaFrameListener {
            config,
            initialised: false,
            selected_ssrc: None,
            reference_frame_time_ms: None,
            last_forwarded_timestamp: None,
            initial_timestamps: HashMap::new(),
            layer_dimensions: HashMap::new(),
            consecutive_misses: HashMap::new(),
            queue: VecDeque::new(),
            timestamp_layers: TimestampLayers::new(),
            forwarded: Vec::new(),
            logger,
        }
    }

    pub fn set_num_layers(&mut self, num_layers: u32) {
        self.config.num_layers = num_layers;
    }

    /// Drains frames forwarded since the last call, in emission order.
    pub fn take_forwarded(&mut self) -> Vec<VideoFrame> {
        std::mem::take(&mut self.forwarded)
    }

    /// Feeds one arrived frame for `ssrc`. Normalizes its timestamp onto
    /// the shared timeline, enqueues it, and attempts to flush forwardable
    /// frames. Unexpected conditions (negative normalized timestamp) are
    /// soft failures: the frame is dropped and logged.
    pub fn on_media_frame(&mut self, ssrc: u32, mut frame: VideoFrame) {
        let width = self.layer_dimensions.entry(ssrc).or_insert(0);
        *width = (*width).max(frame.width);

        if !self.initialised {
            self.reference_frame_time_ms = Some(frame.arrival_time_ms);
            self.initialised = true;
        }
        let reference_time = self.reference_frame_time_ms.expect("set above on first frame");

        let initial = *self.initial_timestamps.entry(ssrc).or_insert_with(|| {
            let reference_offset = ((frame.arrival_time_ms as i64 - reference_time as i64)
                * frame.clock_rate as i64)
                / 1000;
            frame.timestamp as i64 - reference_offset
        });

        let normalized_ts = frame.timestamp as i64 - initial;
        if normalized_ts < 0 {
            self.logger.warn(&format!("simulcast: dropping frame with negative normalized timestamp from ssrc {}", ssrc));
            return;
        }

        frame.timestamp = normalized_ts as u32;
        frame.ssrc = ssrc;

        self.timestamp_layers.record(normalized_ts, ssrc);
        self.queue.push_back(frame);

        // Only attempt to resolve the oldest bucket once a newer one
        // exists (proof that layers have moved past it) or the queue is
        // over budget; resolving eagerly on every single push would select
        // the very first layer to report a timestamp instead of waiting
        // to see which layers actually arrive for it.
        if self.timestamp_layers.len() > 1 || self.queue.len() > self.config.max_queue_size {
            self.flush();
        }
    }

    /// Drains the queue without forwarding; called on teardown.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.timestamp_layers.entries.clear();
    }

    fn highest_known_ssrc(&self) -> Option<u32> {
        self.layer_dimensions
            .iter()
            .max_by(|(ssrc_a, width_a), (ssrc_b, width_b)| width_a.cmp(width_b).then(ssrc_b.cmp(ssrc_a)))
            .map(|(ssrc, _)| *ssrc)
    }

    fn frame_at<'a>(queue: &'a VecDeque<VideoFrame>, ssrc: u32, ts: i64) -> Option<&'a VideoFrame> {
        queue.iter().find(|f| f.ssrc == ssrc && f.timestamp as i64 == ts)
    }

    /// Attempts one selection decision for the given arrived set, without
    /// consuming queue state. `None` means "not decidable yet, keep
    /// waiting".
    fn select_for_timestamp(&self, ts: i64, arrived: &BTreeSet<u32>) -> Option<u32> {
        let highest = self.highest_known_ssrc()?;
        let highest_present = arrived.contains(&highest);
        let highest_silent = self
            .consecutive_misses
            .get(&highest)
            .copied()
            .unwrap_or(0)
            >= self.config.silence_timeout_frames;

        match self.selected_ssrc {
            None => arrived.iter().max_by(|a, b| {
                let wa = self.layer_dimensions.get(*a).copied().unwrap_or(0);
                let wb = self.layer_dimensions.get(*b).copied().unwrap_or(0);
                wa.cmp(&wb)
            }).copied(),
            Some(current) if current == highest => {
                if highest_present { Some(highest) } else { None }
            }
            Some(current) => {
                if highest_present {
                    let target_is_intra = Self::frame_at(&self.queue, highest, ts).map(|f| f.is_intra).unwrap_or(false);
                    if target_is_intra {
                        return Some(highest);
                    }
                    if arrived.contains(&current) {
                        return Some(current);
                    }
                    return None;
                }
                if arrived.contains(&current) {
                    return Some(current);
                }
                if highest_silent {
                    return arrived
                        .iter()
                        .filter(|ssrc| **ssrc != highest)
                        .max_by_key(|ssrc| self.layer_dimensions.get(*ssrc).copied().unwrap_or(0))
                        .copied();
                }
                None
            }
        }
    }

    fn flush(&mut self) {
        loop {
            let Some((ts, arrived)) = self.timestamp_layers.front().cloned() else { break };
            match self.select_for_timestamp(ts, &arrived) {
                Some(target) if arrived.contains(&target) => {
                    self.forward_timestamp(ts, target);
                }
                _ => {
                    // Nothing selectable and the queue is already over
                    // budget: this timestamp will never be served, skip it
                    // so later, forwardable timestamps are not starved.
                    self.timestamp_layers.pop_front();
                    self.queue.retain(|f| f.timestamp as i64 != ts);
                    self.logger.debug(&format!("simulcast: skipping unforwardable timestamp {}", ts));
                }
            }
            if self.queue.len() <= self.config.max_queue_size && self.timestamp_layers.len() < 2 {
                break;
            }
        }
    }

    fn forward_timestamp(&mut self, ts: i64, target_ssrc: u32) {
        self.timestamp_layers.pop_front();

        let Some(pos) = self.queue.iter().position(|f| f.ssrc == target_ssrc && f.timestamp as i64 == ts) else {
            return;
        };
        let frame = self.queue.remove(pos).expect("position just found");

        self.consecutive_misses.insert(target_ssrc, 0);
        if let Some(highest) = self.highest_known_ssrc() {
            if highest != target_ssrc {
                *self.consecutive_misses.entry(highest).or_insert(0) += 1;
            }
        }

        self.queue.retain(|f| f.timestamp as i64 != ts);

        if self.last_forwarded_timestamp.map(|last| ts > last).unwrap_or(true) {
            self.last_forwarded_timestamp = Some(ts);
            self.selected_ssrc = Some(target_ssrc);
            self.forwarded.push(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::LogLevel;
    use rtp::VideoCodec;
    use tempfile::tempdir;

    fn test_logger() -> Logger {
        let dir = tempdir().unwrap();
        Logger::new(dir.path().join("test.log"), LogLevel::Debug).unwrap()
    }

    fn frame(ssrc: u32, timestamp: u32, clock_rate: u32, arrival_ms: u64, width: u32, is_intra: bool) -> VideoFrame {
        let mut f = VideoFrame::new(VideoCodec::H264, ssrc, timestamp, clock_rate, arrival_ms);
        f.width = width;
        f.is_intra = is_intra;
        f
    }

    #[test]
    fn synchronized_intra_layers_always_forward_highest_resolution() {
        let config = SimulcastConfig { num_layers: 3, max_queue_size: 8, silence_timeout_frames: 3 };
        let mut listener = SimulcastMediaFrameListener::new(config, test_logger());

        // Synchronized intras across three layers at the same arrival time,
        // each layer's own RTP clock starting from a different raw value.
        listener.on_media_frame(1, frame(1, 10000, 90000, 1000, 480, true));
        listener.on_media_frame(2, frame(2, 20000, 90000, 1000, 960, true));
        listener.on_media_frame(3, frame(3, 30000, 90000, 1000, 1920, true));

        // One extra "trigger" iteration (i=5) is fed so the i=4 bucket has
        // proof a later bucket exists and gets resolved; its own bucket is
        // left pending, so exactly 5 frames end up forwarded.
        for i in 1..6u32 {
            let ts = 10000 + i * 2970;
            let arrival = 1000 + i as u64 * 33;
            listener.on_media_frame(1, frame(1, ts, 90000, arrival, 480, false));
            listener.on_media_frame(2, frame(2, ts + 10000, 90000, arrival, 960, false));
            listener.on_media_frame(3, frame(3, ts + 20000, 90000, arrival, 1920, false));
        }

        let forwarded = listener.take_forwarded();
        let tuples: Vec<(u32, i64, u64)> = forwarded
            .iter()
            .map(|f| (f.width, f.timestamp as i64, f.arrival_time_ms))
            .collect();

        assert_eq!(
            tuples,
            vec![
                (1920, 0, 1000),
                (1920, 2970, 1033),
                (1920, 5940, 1066),
                (1920, 8910, 1099),
                (1920, 11880, 1132),
            ]
        );
    }

    #[test]
    fn missing_high_layer_frame_is_skipped_and_high_layer_continues() {
        let config = SimulcastConfig { num_layers: 2, max_queue_size: 8, silence_timeout_frames: 3 };
        let mut listener = SimulcastMediaFrameListener::new(config, test_logger());

        listener.on_media_frame(1, frame(1, 10000, 90000, 1000, 640, true));
        listener.on_media_frame(2, frame(2, 20000, 90000, 1000, 1920, true));

        for i in 1..5u32 {
            let ts = 10000 + i * 2970;
            let arrival = 1000 + i as u64 * 33;
            listener.on_media_frame(1, frame(1, ts, 90000, arrival, 640, false));
            // High layer (ssrc 2) drops frame index 2 (one missed timestamp,
            // well under the silence timeout), then resumes.
            if i != 2 {
                listener.on_media_frame(2, frame(2, ts + 10000, 90000, arrival, 1920, false));
            }
        }

        let forwarded = listener.take_forwarded();
        let tuples: Vec<(u32, i64)> = forwarded.iter().map(|f| (f.width, f.timestamp as i64)).collect();

        // The timestamp corresponding to the dropped high-layer frame never
        // appears (neither forwarded from the high layer nor from the low
        // one), and the high layer continues being selected afterward.
        assert!(!tuples.iter().any(|(_, ts)| *ts == 5940));
        assert!(tuples.iter().all(|(width, _)| *width == 1920));
    }

    #[test]
    fn output_timestamps_are_strictly_increasing() {
        let config = SimulcastConfig { num_layers: 1, max_queue_size: 8, silence_timeout_frames: 3 };
        let mut listener = SimulcastMediaFrameListener::new(config, test_logger());

        for i in 0..10u32 {
            listener.on_media_frame(1, frame(1, i * 3000, 90000, (i as u64) * 33, 640, i == 0));
        }

        let forwarded = listener.take_forwarded();
        let mut last = None;
        for f in forwarded {
            if let Some(prev) = last {
                assert!(f.timestamp > prev);
            }
            last = Some(f.timestamp);
        }
    }

    #[test]
    fn negative_normalized_timestamp_is_dropped_not_panicked() {
        let config = SimulcastConfig::default();
        let mut listener = SimulcastMediaFrameListener::new(config, test_logger());
        listener.on_media_frame(1, frame(1, 1000, 90000, 1000, 640, true));
        // A later frame whose raw timestamp regresses past the recorded
        // origin would normalize negative; it must be dropped, not panic.
        listener.on_media_frame(1, frame(1, 0, 90000, 1000, 640, false));
        // No assertion beyond "did not panic" and queue stayed sane.
        assert!(listener.take_forwarded().len() <= 1);
    }

    #[test]
    fn stop_drains_queue_without_forwarding() {
        let config = SimulcastConfig::default();
        let mut listener = SimulcastMediaFrameListener::new(config, test_logger());
        listener.on_media_frame(1, frame(1, 1000, 90000, 1000, 640, true));
        listener.stop();
        assert!(listener.take_forwarded().is_empty());
    }
}
