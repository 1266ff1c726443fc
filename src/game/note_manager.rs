use crate::game::note::Note;
use std::ops::Range;

/// Owns the per-track note lists of a chart and answers time-window queries over them.
#[derive(Clone, Debug, Default)]
pub struct NoteManager {
    tracks: Vec<Vec<Note>>,
}

impl NoteManager {
    pub fn new(tracks: Vec<Vec<Note>>) -> Self {
        Self { tracks }
    }

    #[inline(always)]
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Vec<Note>] {
        &self.tracks
    }

    pub fn track(&self, track: usize) -> &[Note] {
        self.tracks.get(track).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn note(&self, track: usize, index: usize) -> Option<&Note> {
        self.tracks.get(track)?.get(index)
    }

    pub fn note_mut(&mut self, track: usize, index: usize) -> Option<&mut Note> {
        self.tracks.get_mut(track)?.get_mut(index)
    }

    /// Index of the first note at or after `search_start` whose time is strictly after `time`.
    pub fn find_index_of_first_note_after_time(
        &self,
        time: f64,
        track: usize,
        search_start: usize,
    ) -> Option<usize> {
        let notes = self.track(track);
        if search_start >= notes.len() {
            return None;
        }
        let index = search_start + notes[search_start..].partition_point(|n| n.time_sec <= time);
        (index < notes.len()).then_some(index)
    }

    /// Index range of the notes with `least < time <= greatest`.
    pub fn get_notes_by_time_range(&self, least: f64, greatest: f64, track: usize) -> Range<usize> {
        let Some(first) = self.find_index_of_first_note_after_time(least, track, 0) else {
            return 0..0;
        };
        let end = self
            .find_index_of_first_note_after_time(greatest, track, first)
            .unwrap_or(self.track(track).len());
        first..end.max(first)
    }

    pub fn earliest_note(&self) -> Option<&Note> {
        self.tracks
            .iter()
            .filter_map(|t| t.first())
            .min_by(|a, b| a.time_sec.total_cmp(&b.time_sec))
    }

    pub fn latest_note(&self) -> Option<&Note> {
        self.tracks
            .iter()
            .filter_map(|t| t.last())
            .max_by(|a, b| a.time_sec.total_cmp(&b.time_sec))
    }

    pub fn total_notes(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }

    /// Puts every note back into its unjudged state, for replaying a chart.
    pub fn reset_states(&mut self) {
        for note in self.tracks.iter_mut().flatten() {
            note.state = Default::default();
        }
    }
}
