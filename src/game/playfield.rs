use crate::game::hold::HoldManager;
use crate::game::judgment::AccuracyLog;
use crate::game::note::Note;
use crate::game::note_manager::NoteManager;

/// The mutable play state shared by the hit and miss passes.
#[derive(Clone, Debug, Default)]
pub struct Playfield {
    pub notes: NoteManager,
    pub holds: HoldManager,
    pub log: AccuracyLog,
}

impl Playfield {
    pub fn new(tracks: Vec<Vec<Note>>) -> Self {
        let num_tracks = tracks.len();
        Self {
            notes: NoteManager::new(tracks),
            holds: HoldManager::new(num_tracks),
            log: AccuracyLog::new(num_tracks),
        }
    }

    #[inline(always)]
    pub fn num_tracks(&self) -> usize {
        self.notes.num_tracks()
    }

    /// Clears judgments so the same chart can be played again.
    pub fn reset(&mut self) {
        self.notes.reset_states();
        self.holds = HoldManager::new(self.num_tracks());
        self.log = AccuracyLog::new(self.num_tracks());
    }
}
