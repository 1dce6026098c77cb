//! Frame timing normalisation.
//!
//! Turns the raw snapshot stream into display frames:
//! 1. raw durations are the gaps between snapshot timestamps, the last
//!    frame getting the loop delay (at least 1 ms);
//! 2. frames shorter than the minimum merge into their successor;
//! 3. durations clamp to the maximum;
//! 4. adjacent screen-equal frames collapse.
//!
//! After normalisation no two adjacent frames are screen-equal, every
//! duration is within [min, max], and the sum of durations is the loop
//! duration of the animation.

use std::sync::Arc;

use svgcast_core::ScreenSnapshot;

use crate::error::Error;
use crate::replay::TimedSnapshot;

/// A snapshot plus the time it stays on screen
#[derive(Debug, Clone)]
pub struct Frame {
    pub screen: Arc<ScreenSnapshot>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TimingOptions {
    pub min_frame_ms: u64,
    pub max_frame_ms: Option<u64>,
    pub loop_delay_ms: u64,
    /// Cap on raw inter-event gaps, from the cast header
    pub idle_time_limit_ms: Option<u64>,
}

impl Default for TimingOptions {
    fn default() -> Self {
        TimingOptions {
            min_frame_ms: 1,
            max_frame_ms: None,
            loop_delay_ms: 1000,
            idle_time_limit_ms: None,
        }
    }
}

/// Normalise the snapshot stream into frames plus the loop duration.
pub fn normalise(
    snapshots: Vec<TimedSnapshot>,
    opts: &TimingOptions,
) -> Result<(Vec<Frame>, u64), Error> {
    if snapshots.is_empty() {
        return Err(Error::EmptyCast);
    }

    let count = snapshots.len();
    let mut frames: Vec<Frame> = Vec::with_capacity(count);
    for (i, snapshot) in snapshots.iter().enumerate() {
        let duration_ms = if i + 1 < count {
            let mut gap = snapshots[i + 1].time_ms - snapshot.time_ms;
            if let Some(limit) = opts.idle_time_limit_ms {
                gap = gap.min(limit);
            }
            gap
        } else {
            opts.loop_delay_ms.max(1)
        };
        frames.push(Frame {
            screen: Arc::clone(&snapshot.screen),
            duration_ms,
        });
    }

    // Undersized frames fold into their successor; an undersized final
    // frame is rounded up instead.
    let mut merged: Vec<Frame> = Vec::with_capacity(frames.len());
    let mut carried = 0u64;
    let last = frames.len() - 1;
    for (i, mut frame) in frames.into_iter().enumerate() {
        frame.duration_ms += carried;
        carried = 0;
        if frame.duration_ms < opts.min_frame_ms {
            if i == last {
                frame.duration_ms = opts.min_frame_ms;
                merged.push(frame);
            } else {
                carried = frame.duration_ms;
            }
        } else {
            merged.push(frame);
        }
    }

    if let Some(max) = opts.max_frame_ms {
        for frame in &mut merged {
            frame.duration_ms = frame.duration_ms.min(max);
        }
    }

    let mut collapsed: Vec<Frame> = Vec::with_capacity(merged.len());
    for frame in merged {
        match collapsed.last_mut() {
            Some(prev) if prev.screen == frame.screen => {
                prev.duration_ms += frame.duration_ms;
            }
            _ => collapsed.push(frame),
        }
    }

    let loop_ms: u64 = collapsed.iter().map(|f| f.duration_ms).sum();
    log::debug!(
        "normalised {} snapshots into {} frames, loop {} ms",
        count,
        collapsed.len(),
        loop_ms
    );
    Ok((collapsed, loop_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgcast_core::Screen;

    fn snapshot_of(text: &str) -> Arc<ScreenSnapshot> {
        let mut screen = Screen::new(20, 4);
        for c in text.chars() {
            screen.put_char(c);
        }
        Arc::new(screen.snapshot())
    }

    fn timed(time_ms: u64, text: &str) -> TimedSnapshot {
        TimedSnapshot {
            time_ms,
            screen: snapshot_of(text),
        }
    }

    #[test]
    fn test_empty_stream_fails() {
        let err = normalise(vec![], &TimingOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyCast));
    }

    #[test]
    fn test_single_snapshot() {
        let opts = TimingOptions {
            loop_delay_ms: 1000,
            ..Default::default()
        };
        let (frames, loop_ms) = normalise(vec![timed(0, "a")], &opts).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].duration_ms, 1000);
        assert_eq!(loop_ms, 1000);
    }

    #[test]
    fn test_single_snapshot_zero_loop_delay() {
        let opts = TimingOptions {
            min_frame_ms: 5,
            loop_delay_ms: 0,
            ..Default::default()
        };
        // Synthetic last duration is at least 1 ms, then rounded up to min
        let (frames, loop_ms) = normalise(vec![timed(0, "a")], &opts).unwrap();
        assert_eq!(frames[0].duration_ms, 5);
        assert_eq!(loop_ms, 5);
    }

    #[test]
    fn test_durations_are_gaps_plus_loop_delay() {
        let opts = TimingOptions {
            loop_delay_ms: 1000,
            ..Default::default()
        };
        let input = vec![timed(0, "a"), timed(40, "ab"), timed(100, "abc")];
        let (frames, loop_ms) = normalise(input, &opts).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].duration_ms, 40);
        assert_eq!(frames[1].duration_ms, 60);
        assert_eq!(frames[2].duration_ms, 1000);
        assert_eq!(loop_ms, 1100);
    }

    #[test]
    fn test_undersized_merge_into_next() {
        let opts = TimingOptions {
            min_frame_ms: 50,
            loop_delay_ms: 1000,
            ..Default::default()
        };
        // First two gaps (10ms each) are below min and fold forward
        let input = vec![
            timed(0, "a"),
            timed(10, "ab"),
            timed(20, "abc"),
            timed(100, "abcd"),
        ];
        let (frames, loop_ms) = normalise(input, &opts).unwrap();
        assert_eq!(frames.len(), 2);
        // The third snapshot carries 10 + 10 + 80 ms
        assert_eq!(frames[0].screen.row_text(0), "abc");
        assert_eq!(frames[0].duration_ms, 100);
        assert_eq!(frames[1].duration_ms, 1000);
        assert_eq!(loop_ms, 1100);
    }

    #[test]
    fn test_collapse_identical_screens() {
        let opts = TimingOptions {
            loop_delay_ms: 1000,
            ..Default::default()
        };
        // Three events all drawing the same screen
        let screen = snapshot_of("x");
        let input = vec![
            TimedSnapshot {
                time_ms: 0,
                screen: Arc::clone(&screen),
            },
            TimedSnapshot {
                time_ms: 10,
                screen: Arc::clone(&screen),
            },
            TimedSnapshot {
                time_ms: 20,
                screen: Arc::clone(&screen),
            },
        ];
        let (frames, loop_ms) = normalise(input, &opts).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].duration_ms, 20 + 1000);
        assert_eq!(loop_ms, 1020);
    }

    #[test]
    fn test_clamp_max() {
        let opts = TimingOptions {
            max_frame_ms: Some(2000),
            loop_delay_ms: 1000,
            ..Default::default()
        };
        let input = vec![timed(0, "a"), timed(10000, "ab")];
        let (frames, loop_ms) = normalise(input, &opts).unwrap();
        assert_eq!(frames[0].duration_ms, 2000);
        assert_eq!(frames[1].duration_ms, 1000);
        assert_eq!(loop_ms, 3000);
    }

    #[test]
    fn test_idle_time_limit_caps_gaps() {
        let opts = TimingOptions {
            idle_time_limit_ms: Some(500),
            loop_delay_ms: 100,
            ..Default::default()
        };
        let input = vec![timed(0, "a"), timed(60_000, "ab")];
        let (frames, _) = normalise(input, &opts).unwrap();
        assert_eq!(frames[0].duration_ms, 500);
    }

    #[test]
    fn test_no_adjacent_equal_frames() {
        let opts = TimingOptions::default();
        let input = vec![
            timed(0, "a"),
            timed(10, "a"),
            timed(20, "ab"),
            timed(30, "ab"),
        ];
        let (frames, _) = normalise(input, &opts).unwrap();
        for pair in frames.windows(2) {
            assert_ne!(pair[0].screen, pair[1].screen);
        }
    }

    #[test]
    fn test_zero_duration_frames_absorbed() {
        let opts = TimingOptions::default();
        // Equal timestamps produce a zero-duration frame, merged forward
        let input = vec![timed(5, "a"), timed(5, "ab"), timed(20, "abc")];
        let (frames, _) = normalise(input, &opts).unwrap();
        assert_eq!(frames.len(), 3 - 1);
        assert_eq!(frames[0].screen.row_text(0), "ab");
    }
}
