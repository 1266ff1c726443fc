use crate::game::note::{Note, NoteType};
use crate::game::timing::{BpmTimeline, TimedRow, assign_times};
use crate::parsing::notes::parse_note_rows;
use crate::parsing::simfile::{ParseError, Simfile};
use log::{info, warn};
use std::hash::Hasher;
use twox_hash::XxHash64;

#[derive(Clone, Debug)]
pub struct ChartData {
    pub chart_type: String,
    pub difficulty: String,
    pub meter: String,
    pub step_artist: String,
    pub short_hash: String,
    /// One time-ordered note list per input track.
    pub tracks: Vec<Vec<Note>>,
}

impl ChartData {
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }
}

pub fn short_hash(grid: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(grid.as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Distributes timed rows into per-track note lists.
///
/// Mines are not judged and never enter a track; roll heads stay roll heads and are
/// judged like hold heads.
pub fn build_tracks(rows: &[TimedRow]) -> Vec<Vec<Note>> {
    let num_tracks = rows.iter().map(|r| r.raw.len()).max().unwrap_or(0);
    let mut tracks: Vec<Vec<Note>> = vec![Vec::new(); num_tracks];
    let mut mines_skipped = 0usize;

    for row in rows {
        if row.raw.len() != num_tracks {
            warn!(
                "Row '{}' at beat {:.3} has {} columns, expected {}.",
                row.raw,
                row.beat,
                row.raw.len(),
                num_tracks
            );
        }
        for (column, glyph) in row.raw.bytes().enumerate() {
            match NoteType::from_glyph(glyph) {
                NoteType::None => {}
                NoteType::Mine => mines_skipped += 1,
                note_type => {
                    let track = &mut tracks[column];
                    debug_assert!(
                        track.last().is_none_or(|n| n.time_sec < row.time_sec),
                        "track times must be strictly increasing"
                    );
                    track.push(Note::new(note_type, row.time_sec, row.beat));
                }
            }
        }
    }

    if mines_skipped > 0 {
        info!("Skipped {} mines (not judged).", mines_skipped);
    }
    tracks
}

/// Parses the selected `#NOTES` section into timed per-track notes.
pub fn build_chart(simfile: &Simfile, mode_index: usize) -> Result<ChartData, ParseError> {
    let mode = simfile.mode(mode_index)?;
    let timeline = BpmTimeline::new(simfile.bpms.clone())?;

    let rows = parse_note_rows(&mode.notes);
    let timed = assign_times(rows, simfile.offset, &timeline);
    let tracks = build_tracks(&timed);

    let total: usize = tracks.iter().map(Vec::len).sum();
    info!(
        "Built chart {} {} ({}): {} notes over {} tracks.",
        mode.chart_type,
        mode.difficulty,
        mode.meter,
        total,
        tracks.len()
    );

    Ok(ChartData {
        chart_type: mode.chart_type.clone(),
        difficulty: mode.difficulty.clone(),
        meter: mode.meter.clone(),
        step_artist: mode.author.clone(),
        short_hash: short_hash(&mode.notes),
        tracks,
    })
}
