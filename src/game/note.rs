use log::warn;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NoteType {
    None,
    Normal,
    HoldHead,
    Tail,
    RollHead,
    Mine,
}

impl NoteType {
    pub const NONE_GLYPH: u8 = b'0';

    /// Maps a single chart glyph to its note type. Unknown glyphs are treated as empty.
    pub fn from_glyph(glyph: u8) -> Self {
        match glyph {
            b'1' => NoteType::Normal,
            b'2' => NoteType::HoldHead,
            b'3' => NoteType::Tail,
            b'4' => NoteType::RollHead,
            b'M' | b'm' => NoteType::Mine,
            _ => NoteType::None,
        }
    }

    /// Hold and roll heads share one lifecycle: pressed -> held -> released on the tail.
    #[inline(always)]
    pub fn is_hold_head(self) -> bool {
        matches!(self, NoteType::HoldHead | NoteType::RollHead)
    }

    /// Whether a key-down can land on this note.
    #[inline(always)]
    pub fn is_pressable(self) -> bool {
        matches!(self, NoteType::Normal | NoteType::HoldHead | NoteType::RollHead)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum NoteState {
    #[default]
    Default,
    Hit,
    Held,
    Missed,
}

impl NoteState {
    pub fn can_transition_to(self, next: NoteState) -> bool {
        match (self, next) {
            (NoteState::Default, NoteState::Hit | NoteState::Held | NoteState::Missed) => true,
            (NoteState::Held, NoteState::Hit | NoteState::Missed) => true,
            _ => false,
        }
    }

    #[inline(always)]
    pub fn is_terminal(self) -> bool {
        matches!(self, NoteState::Hit | NoteState::Missed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub note_type: NoteType,
    pub time_sec: f64,
    pub beat: f64,
    pub state: NoteState,
}

impl Note {
    pub fn new(note_type: NoteType, time_sec: f64, beat: f64) -> Self {
        Self {
            note_type,
            time_sec,
            beat,
            state: NoteState::Default,
        }
    }

    /// Moves the note to `next` if the state machine allows it. Returns whether it moved.
    pub fn set_state(&mut self, next: NoteState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            warn!(
                "Refusing note state change {:?} -> {:?} ({:?} at {:.3}s)",
                self.state, next, self.note_type, self.time_sec
            );
            false
        }
    }
}
