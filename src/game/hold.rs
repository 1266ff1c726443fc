use log::debug;

/// Per-track hold flags. A track is held from the moment its hold head is pressed
/// until the tail is released or missed.
#[derive(Clone, Debug, Default)]
pub struct HoldManager {
    held_tracks: Vec<bool>,
}

impl HoldManager {
    pub fn new(num_tracks: usize) -> Self {
        Self {
            held_tracks: vec![false; num_tracks],
        }
    }

    pub fn hold_note(&mut self, track: usize) {
        if let Some(held) = self.held_tracks.get_mut(track) {
            *held = true;
        }
    }

    /// Clears the flag. Returns whether the track was held.
    pub fn release(&mut self, track: usize) -> bool {
        self.held_tracks
            .get_mut(track)
            .is_some_and(|held| std::mem::replace(held, false))
    }

    pub fn force_release(&mut self, track: usize) {
        if self.release(track) {
            debug!("Forced hold release on track {}.", track);
        }
    }

    #[inline(always)]
    pub fn is_held(&self, track: usize) -> bool {
        self.held_tracks.get(track).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_then_release() {
        let mut holds = HoldManager::new(4);
        holds.hold_note(2);
        assert!(holds.is_held(2));
        assert!(!holds.is_held(1));
        assert!(holds.release(2));
        assert!(!holds.release(2), "second release finds nothing held");
    }

    #[test]
    fn out_of_range_tracks_are_never_held() {
        let mut holds = HoldManager::new(1);
        holds.hold_note(5);
        assert!(!holds.is_held(5));
        holds.force_release(5);
    }
}
