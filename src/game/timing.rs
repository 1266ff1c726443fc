use crate::parsing::notes::BeatRow;
use log::info;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmPoint {
    pub beat: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimingError {
    Empty,
    InvalidPoint { beat: f64, bpm: f64 },
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingError::Empty => write!(f, "BPM map is empty"),
            TimingError::InvalidPoint { beat, bpm } => {
                write!(f, "BPM {} at beat {} is not a finite positive tempo", bpm, beat)
            }
        }
    }
}

impl Error for TimingError {}

/// Piecewise-constant tempo map. The first point is the origin of the timeline.
#[derive(Debug, Clone)]
pub struct BpmTimeline {
    points: Vec<BpmPoint>,
}

impl BpmTimeline {
    pub fn new(mut points: Vec<BpmPoint>) -> Result<Self, TimingError> {
        if points.is_empty() {
            return Err(TimingError::Empty);
        }
        if let Some(bad) = points
            .iter()
            .find(|p| !p.beat.is_finite() || !p.bpm.is_finite() || p.bpm <= 0.0)
        {
            return Err(TimingError::InvalidPoint {
                beat: bad.beat,
                bpm: bad.bpm,
            });
        }
        points.sort_by(|a, b| a.beat.total_cmp(&b.beat));
        Ok(Self { points })
    }

    pub fn points(&self) -> &[BpmPoint] {
        &self.points
    }

    /// Index of the segment in effect at `beat`: the last point at or before it, else 0.
    fn segment_index_at(&self, beat: f64) -> usize {
        self.points.partition_point(|p| p.beat <= beat).saturating_sub(1)
    }

    pub fn bpm_at_beat(&self, beat: f64) -> f64 {
        self.points[self.segment_index_at(beat)].bpm
    }

    /// Seconds elapsed between two beats, integrating across every tempo change in between.
    pub fn elapsed_time(&self, start_beat: f64, end_beat: f64) -> f64 {
        if end_beat < start_beat {
            return -self.elapsed_time(end_beat, start_beat);
        }

        let mut index = self.segment_index_at(start_beat);
        let mut cursor = start_beat;
        let mut elapsed = 0.0;
        loop {
            let next_change = self
                .points
                .get(index + 1)
                .map_or(f64::INFINITY, |p| p.beat);
            let next = end_beat.min(next_change);
            elapsed += (next - cursor) / self.points[index].bpm * 60.0;
            cursor = next;
            index += 1;
            if cursor >= end_beat {
                break;
            }
        }
        elapsed
    }

    /// Absolute chart time of `beat` given the simfile offset. A positive offset moves notes earlier.
    pub fn time_for_beat(&self, beat: f64, offset_sec: f64) -> f64 {
        -offset_sec + self.elapsed_time(0.0, beat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedRow {
    pub beat: f64,
    pub time_sec: f64,
    pub raw: String,
}

/// Gives every row an absolute time. The first row is integrated from beat 0; each later
/// row accumulates the interval from its predecessor.
pub fn assign_times(rows: Vec<BeatRow>, offset_sec: f64, timeline: &BpmTimeline) -> Vec<TimedRow> {
    let mut timed = Vec::with_capacity(rows.len());
    let mut previous: Option<(f64, f64)> = None;
    for row in rows {
        let time_sec = match previous {
            None => timeline.time_for_beat(row.beat, offset_sec),
            Some((prev_beat, prev_time)) => prev_time + timeline.elapsed_time(prev_beat, row.beat),
        };
        previous = Some((row.beat, time_sec));
        timed.push(TimedRow {
            beat: row.beat,
            time_sec,
            raw: row.raw,
        });
    }
    info!("Assigned times to {} note rows.", timed.len());
    timed
}
