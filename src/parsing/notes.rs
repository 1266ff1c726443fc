use crate::game::note::NoteType;
use log::{debug, info};

/// One measure: its row strings in chart order, one glyph per track.
pub type Measure = Vec<String>;

/// A row of the chart grid with its musical position.
#[derive(Clone, Debug, PartialEq)]
pub struct BeatRow {
    pub beat: f64,
    pub raw: String,
}

/// Measures are always 4 beats long, whatever `#NOTES` meter says.
pub const BEATS_PER_MEASURE: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Seeking,
    Accumulating,
    Flush,
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Splits a `#NOTES` grid body into measures.
///
/// Lines are scanned with a small state machine: comment and blank lines are skipped until
/// content shows up, content rows are collected until a `,`/`;` separator (or a blank line)
/// closes the measure.
pub fn segment_measures(grid: &str) -> Vec<Measure> {
    let lines: Vec<&str> = grid.lines().collect();
    let mut measures = Vec::new();
    let mut current: Measure = Vec::new();
    let mut state = ScanState::Seeking;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        match state {
            ScanState::Seeking => {
                if !strip_comment(line).trim().is_empty() {
                    state = ScanState::Accumulating;
                } else {
                    i += 1;
                }
            }
            ScanState::Accumulating => {
                let trimmed = line.trim();
                if trimmed.starts_with("//") {
                    i += 1;
                } else if !line.contains(',') && !line.contains(';') && !trimmed.is_empty() {
                    let row = strip_comment(trimmed).trim_end();
                    current.push(row.to_string());
                    i += 1;
                } else {
                    state = ScanState::Flush;
                }
            }
            ScanState::Flush => {
                if !current.is_empty() {
                    measures.push(std::mem::take(&mut current));
                }
                i += 1;
                state = ScanState::Seeking;
            }
        }
    }
    if !current.is_empty() {
        measures.push(current);
    }

    debug!("Segmented chart grid into {} measures.", measures.len());
    measures
}

/// Spreads each measure's rows evenly over its 4 beats.
pub fn assign_beats(measures: &[Measure]) -> Vec<BeatRow> {
    let mut rows = Vec::with_capacity(measures.iter().map(Vec::len).sum());
    let mut running_beat = 0.0;
    for measure in measures {
        let step = BEATS_PER_MEASURE / measure.len() as f64;
        for (k, raw) in measure.iter().enumerate() {
            rows.push(BeatRow {
                beat: running_beat + k as f64 * step,
                raw: raw.clone(),
            });
        }
        running_beat += BEATS_PER_MEASURE;
    }
    rows
}

#[inline(always)]
pub fn is_blank_row(raw: &str) -> bool {
    raw.bytes().all(|b| b == NoteType::NONE_GLYPH)
}

pub fn remove_blank_rows(rows: Vec<BeatRow>) -> Vec<BeatRow> {
    rows.into_iter().filter(|row| !is_blank_row(&row.raw)).collect()
}

/// Runs the whole grid pipeline: measures, then beats, then blank-row removal.
pub fn parse_note_rows(grid: &str) -> Vec<BeatRow> {
    let measures = segment_measures(grid);
    let rows = remove_blank_rows(assign_beats(&measures));
    info!(
        "Pre-parsed {} note rows from {} measures.",
        rows.len(),
        measures.len()
    );
    rows
}
