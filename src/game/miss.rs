use crate::game::judgment::AccuracySettings;
use crate::game::note::{NoteState, NoteType};
use crate::game::playfield::Playfield;
use log::debug;

/// Per-frame sweep that fails every note whose hit window has closed unpressed.
#[derive(Clone, Debug)]
pub struct MissManager {
    settings: AccuracySettings,
    next_unmissed: Vec<usize>,
}

impl MissManager {
    pub fn new(settings: AccuracySettings, num_tracks: usize) -> Self {
        Self {
            settings,
            next_unmissed: vec![0; num_tracks],
        }
    }

    /// Per-track index of the first note the sweep has not passed yet.
    pub fn cursors(&self) -> &[usize] {
        &self.next_unmissed
    }

    pub fn reset(&mut self) {
        self.next_unmissed.iter_mut().for_each(|c| *c = 0);
    }

    #[inline(always)]
    pub fn miss_boundary(&self, current_time: f64) -> f64 {
        current_time + self.settings.miss_upper_ms() / 1000.0
    }

    /// Marks newly expired notes as missed. Returns how many notes were swept.
    pub fn update(&mut self, field: &mut Playfield, current_time: f64) -> usize {
        // Without a miss catch-all there is no band to sweep into.
        if !self.settings.has_miss_band() {
            return 0;
        }
        let boundary = self.miss_boundary(current_time);
        if self.next_unmissed.len() < field.num_tracks() {
            self.next_unmissed.resize(field.num_tracks(), 0);
        }

        let mut swept = 0;
        for track in 0..field.num_tracks() {
            let old = self.next_unmissed[track];
            let new = field
                .notes
                .find_index_of_first_note_after_time(boundary, track, old)
                .unwrap_or(field.notes.track(track).len())
                .max(old);

            for index in old..new {
                let Some(note) = field.notes.note_mut(track, index) else {
                    break;
                };
                if note.state != NoteState::Default {
                    continue;
                }
                note.set_state(NoteState::Missed);
                let is_tail = note.note_type == NoteType::Tail;
                field
                    .log
                    .record(self.settings.miss_name(), track, f64::NEG_INFINITY, current_time);
                if is_tail {
                    field.holds.force_release(track);
                }
                swept += 1;
            }
            self.next_unmissed[track] = new;
        }

        if swept > 0 {
            debug!("Miss sweep at {:.3}s marked {} notes.", current_time, swept);
        }
        swept
    }
}
