//! # Slug Snapshots
//!
//! JSON-lines dump of the live slug layout, one line per rebalance:
//!
//! ```text
//! Logs:
//! {"data":[{"slugName":"lowerSlug","tickLower":-1060,"tickUpper":-1000,...}]}
//! ```
//!
//! Ticks are written in pool order so plotting tools can draw each slug as a
//! `[tickLower, tickUpper]` bar regardless of the sell direction.

use std::io::Write;

use doppler_core::{Position, PositionBook};
use serde::{Deserialize, Serialize};

use crate::error::SimulationResult;

const LOG_HEADER: &str = "Logs:";

/// One live slug at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugSnapshot {
    pub slug_name: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub timestamp: u64,
    pub current_tick: i32,
}

impl SlugSnapshot {
    pub fn new(position: &Position, timestamp: u64, current_tick: i32) -> Self {
        let (tick_lower, tick_upper) = position.pool_ticks();
        Self {
            slug_name: position.kind().name(),
            tick_lower,
            tick_upper,
            liquidity: position.liquidity,
            timestamp,
            current_tick,
        }
    }
}

/// A full layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFrame {
    pub data: Vec<SlugSnapshot>,
}

impl SnapshotFrame {
    /// Live slugs of `book`; placeholders are left out
    pub fn capture(book: &PositionBook, timestamp: u64, current_tick: i32) -> Self {
        Self {
            data: book
                .active()
                .map(|position| SlugSnapshot::new(position, timestamp, current_tick))
                .collect(),
        }
    }
}

/// Writes frames under a single `Logs:` header
pub struct SnapshotRecorder<W: Write> {
    writer: W,
    header_written: bool,
    frames: usize,
}

impl<W: Write> SnapshotRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            frames: 0,
        }
    }

    pub fn record(&mut self, frame: &SnapshotFrame) -> SimulationResult<()> {
        if !self.header_written {
            writeln!(self.writer, "{LOG_HEADER}")?;
            self.header_written = true;
        }
        serde_json::to_writer(&mut self.writer, frame)?;
        writeln!(self.writer)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn finish(mut self) -> SimulationResult<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doppler_core::{LOWER_SLUG_ID, UPPER_SLUG_ID};

    fn book() -> PositionBook {
        let mut book = PositionBook::default();
        book.insert(Position {
            tick_lower: 120,
            tick_upper: 60,
            liquidity: 5,
            id: LOWER_SLUG_ID,
        });
        book.insert(Position::placeholder(60, UPPER_SLUG_ID));
        book
    }

    #[test]
    fn test_capture_orders_ticks_and_skips_placeholders() {
        let frame = SnapshotFrame::capture(&book(), 42, 60);
        assert_eq!(frame.data.len(), 1);
        let slug = &frame.data[0];
        assert_eq!(slug.slug_name, "lowerSlug");
        assert_eq!((slug.tick_lower, slug.tick_upper), (60, 120));
        assert_eq!(slug.current_tick, 60);
    }

    #[test]
    fn test_recorder_writes_header_once() {
        let mut recorder = SnapshotRecorder::new(Vec::new());
        let frame = SnapshotFrame::capture(&book(), 42, 60);
        recorder.record(&frame).unwrap();
        recorder.record(&frame).unwrap();
        assert_eq!(recorder.frames(), 2);

        let output = String::from_utf8(recorder.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Logs:");
        assert!(lines[1].contains("\"slugName\":\"lowerSlug\""));
        assert!(lines[1].contains("\"currentTick\":60"));
        let parsed: SnapshotFrame = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed, frame);
    }
}
