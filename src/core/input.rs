use log::{debug, warn};
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    Up,
    Down,
}

/// A key edge on a track, stamped with the game time it happened at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerKeyAction {
    pub game_time: f64,
    pub track: usize,
    pub key_state: KeyState,
}

impl PlayerKeyAction {
    pub fn new(game_time: f64, track: usize, key_state: KeyState) -> Self {
        Self {
            game_time,
            track,
            key_state,
        }
    }
}

pub const DEFAULT_KEY_BINDINGS: [&str; 4] = ["E", "F", "K", "O"];

#[inline(always)]
fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Maps key names to tracks and filters OS key repeat.
#[derive(Clone, Debug)]
pub struct KeyHandler {
    bindings: HashMap<String, usize>,
    held_keys: HashSet<String>,
}

impl Default for KeyHandler {
    fn default() -> Self {
        Self::new(&DEFAULT_KEY_BINDINGS)
    }
}

impl KeyHandler {
    /// `keys[i]` drives track `i`. Key names are case-insensitive.
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        let mut bindings = HashMap::with_capacity(keys.len());
        for (track, key) in keys.iter().enumerate() {
            let key = normalize_key(key.as_ref());
            if key.is_empty() {
                continue;
            }
            if let Some(previous) = bindings.insert(key.clone(), track) {
                warn!("Key '{}' bound to both track {} and {}; using {}.", key, previous, track, track);
            }
        }
        Self {
            bindings,
            held_keys: HashSet::new(),
        }
    }

    #[inline(always)]
    pub fn track_for_key(&self, key: &str) -> Option<usize> {
        self.bindings.get(&normalize_key(key)).copied()
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held_keys.contains(&normalize_key(key))
    }

    /// Repeated downs for a key that is already held are dropped.
    pub fn key_down(&mut self, key: &str, game_time: f64) -> Option<PlayerKeyAction> {
        let track = self.track_for_key(key)?;
        if !self.held_keys.insert(normalize_key(key)) {
            return None;
        }
        debug!("Key '{}' down on track {} at {:.3}s", key, track, game_time);
        Some(PlayerKeyAction::new(game_time, track, KeyState::Down))
    }

    /// Ups only count for keys that were seen going down.
    pub fn key_up(&mut self, key: &str, game_time: f64) -> Option<PlayerKeyAction> {
        let track = self.track_for_key(key)?;
        if !self.held_keys.remove(&normalize_key(key)) {
            return None;
        }
        debug!("Key '{}' up on track {} at {:.3}s", key, track, game_time);
        Some(PlayerKeyAction::new(game_time, track, KeyState::Up))
    }

    pub fn clear_held(&mut self) {
        self.held_keys.clear();
    }
}
