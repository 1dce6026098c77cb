//! Replay driver: feeds the cast event stream through the emulator and
//! yields timestamped screen snapshots.
//!
//! For each OUTPUT event the driver advances the session clock to the
//! event time, feeds the bytes, and materialises a snapshot when any row
//! was touched or the cursor changed since the last emission. INPUT
//! events are ignored; RESIZE events are advisory and logged.

use std::sync::Arc;

use svgcast_core::ScreenSnapshot;

use crate::asciicast::{Event, EventData};
use crate::error::Error;
use crate::terminal::Terminal;

/// An immutable screen stamped with its session time
#[derive(Debug, Clone)]
pub struct TimedSnapshot {
    pub time_ms: u64,
    pub screen: Arc<ScreenSnapshot>,
}

/// Drive the emulator over the event stream. The returned snapshots are
/// in non-decreasing time order; equal timestamps are possible and are
/// absorbed later by timing normalisation.
pub fn replay(cols: u16, rows: u16, events: &[Event]) -> Result<Vec<TimedSnapshot>, Error> {
    let cols = cols as usize;
    let rows = rows as usize;
    let mut term = Terminal::new(cols, rows);
    term.take_dirty_rows();

    let mut snapshots: Vec<TimedSnapshot> = Vec::new();
    let mut last_cursor = term.snapshot().cursor;

    for event in events {
        let bytes = match &event.data {
            EventData::Output(bytes) => bytes,
            EventData::Input(_) => continue,
            EventData::Resize {
                cols: new_cols,
                rows: new_rows,
            } => {
                log::debug!("ignoring advisory resize to {}x{}", new_cols, new_rows);
                continue;
            }
        };

        term.process(bytes);

        let dirty = term.take_dirty_rows();
        let snapshot = term.snapshot();
        let cursor_changed = snapshot.cursor != last_cursor;

        if snapshot.rows != rows || snapshot.cols != cols {
            return Err(Error::EmulatorOverflow(format!(
                "screen is {}x{}, session is {}x{}",
                snapshot.cols, snapshot.rows, cols, rows
            )));
        }

        if dirty.is_empty() && !cursor_changed && !snapshots.is_empty() {
            continue;
        }

        last_cursor = snapshot.cursor.clone();
        snapshots.push(TimedSnapshot {
            time_ms: event.time_ms,
            screen: Arc::new(snapshot),
        });
    }

    log::debug!(
        "replay produced {} snapshots from {} events",
        snapshots.len(),
        events.len()
    );
    Ok(snapshots)
}
