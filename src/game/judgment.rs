use crate::config::ConfigError;
use crate::core::input::{KeyState, PlayerKeyAction};
use crate::game::note::{NoteState, NoteType};
use crate::game::playfield::Playfield;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_ACCURACY: &str = "ERROR: Unknown accuracy";
pub const RELEASE_PREFIX: &str = "Release ";

/// A named band of timing offsets in milliseconds (`note time - press time`).
///
/// A band without a lower bound is the miss catch-all and may only come first; a band
/// without an upper bound is the boo catch-all and may only come last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyWindow {
    pub name: String,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl AccuracyWindow {
    pub fn new(name: &str, lower_bound: Option<f64>, upper_bound: Option<f64>) -> Self {
        Self {
            name: name.to_string(),
            lower_bound,
            upper_bound,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccuracySettings {
    windows: Vec<AccuracyWindow>,
}

impl Default for AccuracySettings {
    fn default() -> Self {
        Self {
            windows: vec![
                AccuracyWindow::new("Miss", None, Some(-117.0)),
                AccuracyWindow::new("Average", Some(-117.0), Some(-83.0)),
                AccuracyWindow::new("Good", Some(-83.0), Some(-50.0)),
                AccuracyWindow::new("Perfect", Some(-50.0), Some(-17.0)),
                AccuracyWindow::new("Amazing", Some(-17.0), Some(17.0)),
                AccuracyWindow::new("Perfect", Some(17.0), Some(50.0)),
                AccuracyWindow::new("Good", Some(50.0), Some(83.0)),
                AccuracyWindow::new("Average", Some(83.0), Some(117.0)),
                AccuracyWindow::new("Boo", Some(117.0), None),
            ],
        }
    }
}

impl AccuracySettings {
    /// Validates an ordered band list. Gaps and overlaps between neighbours are allowed
    /// but logged.
    pub fn new(windows: Vec<AccuracyWindow>) -> Result<Self, ConfigError> {
        let invalid = |msg: String| Err(ConfigError::InvalidAccuracySettings(msg));
        if windows.len() < 2 {
            return invalid(format!("need at least 2 accuracy bands, got {}", windows.len()));
        }
        let last = windows.len() - 1;
        for (i, w) in windows.iter().enumerate() {
            if w.lower_bound.is_some_and(|b| !b.is_finite())
                || w.upper_bound.is_some_and(|b| !b.is_finite())
            {
                return invalid(format!("band '{}' has a non-finite bound", w.name));
            }
            match (w.lower_bound, w.upper_bound) {
                (None, None) => return invalid(format!("band '{}' has no bounds", w.name)),
                (None, Some(_)) if i != 0 => {
                    return invalid(format!("only the first band may omit its lower bound ('{}')", w.name));
                }
                (Some(_), None) if i != last => {
                    return invalid(format!("only the last band may omit its upper bound ('{}')", w.name));
                }
                (Some(lo), Some(hi)) if lo >= hi => {
                    return invalid(format!("band '{}' has lower bound {} >= upper bound {}", w.name, lo, hi));
                }
                _ => {}
            }
        }
        // The hittable window is built from the non-catch-all edges.
        if windows[0].lower_bound.is_none() && windows[1].lower_bound.is_none() {
            return invalid("no finite earliest hit bound".to_string());
        }
        if windows[last].upper_bound.is_none() && windows[last - 1].upper_bound.is_none() {
            return invalid("no finite latest hit bound".to_string());
        }

        for pair in windows.windows(2) {
            if let (Some(prev_hi), Some(next_lo)) = (pair[0].upper_bound, pair[1].lower_bound) {
                if prev_hi != next_lo {
                    warn!(
                        "Accuracy bands '{}' and '{}' {} ({} vs {} ms).",
                        pair[0].name,
                        pair[1].name,
                        if prev_hi < next_lo { "leave a gap" } else { "overlap" },
                        prev_hi,
                        next_lo
                    );
                }
            }
        }

        let settings = Self { windows };
        let (least, greatest) = settings.hittable_range_sec();
        if least >= greatest {
            return invalid(format!(
                "earliest hit bound {} ms is not before latest hit bound {} ms",
                least * 1000.0,
                greatest * 1000.0
            ));
        }
        Ok(settings)
    }

    pub fn windows(&self) -> &[AccuracyWindow] {
        &self.windows
    }

    fn first(&self) -> &AccuracyWindow {
        &self.windows[0]
    }

    fn last(&self) -> &AccuracyWindow {
        &self.windows[self.windows.len() - 1]
    }

    /// The first band is a miss catch-all (no lower bound).
    #[inline(always)]
    pub fn has_miss_band(&self) -> bool {
        self.first().lower_bound.is_none()
    }

    /// The last band is a boo catch-all (no upper bound).
    #[inline(always)]
    pub fn is_configured_for_boos(&self) -> bool {
        self.last().upper_bound.is_none()
    }

    pub fn miss_name(&self) -> &str {
        &self.first().name
    }

    /// Upper bound of the first band in ms; notes older than this are swept as misses.
    pub fn miss_upper_ms(&self) -> f64 {
        self.first().upper_bound.unwrap_or(0.0)
    }

    /// The last hittable offset in ms (upper bound of the last non-catch-all band).
    pub fn earliest_accuracy_ms(&self) -> f64 {
        let n = self.windows.len();
        self.windows[n - 1]
            .upper_bound
            .or(self.windows[n - 2].upper_bound)
            .unwrap_or(0.0)
    }

    /// (least, greatest) hittable offsets in seconds, relative to the press time.
    pub fn hittable_range_sec(&self) -> (f64, f64) {
        let least = self.windows[0]
            .lower_bound
            .or(self.windows[1].lower_bound)
            .unwrap_or(0.0);
        (least / 1000.0, self.earliest_accuracy_ms() / 1000.0)
    }

    pub fn get_accuracy_name(&self, diff_ms: f64) -> &str {
        if let (None, Some(upper)) = (self.first().lower_bound, self.first().upper_bound) {
            if diff_ms < upper {
                return &self.first().name;
            }
        }
        if let (Some(lower), None) = (self.last().lower_bound, self.last().upper_bound) {
            if diff_ms >= lower {
                return &self.last().name;
            }
        }
        self.windows
            .iter()
            .find(|w| match (w.lower_bound, w.upper_bound) {
                (Some(lo), Some(hi)) => lo < diff_ms && diff_ms <= hi,
                _ => false,
            })
            .map_or(UNKNOWN_ACCURACY, |w| w.name.as_str())
    }
}

/// One judgment. `accuracy_ms` is `+inf` for boos and early releases, `-inf` for sweeps.
#[derive(Clone, Debug, PartialEq)]
pub struct AccuracyEvent {
    pub name: String,
    pub track: usize,
    pub accuracy_ms: f64,
    pub game_time: f64,
}

/// Append-only per-track record of every judgment made during a session.
#[derive(Clone, Debug, Default)]
pub struct AccuracyLog {
    tracks: Vec<Vec<AccuracyEvent>>,
}

impl AccuracyLog {
    pub fn new(num_tracks: usize) -> Self {
        Self {
            tracks: vec![Vec::new(); num_tracks],
        }
    }

    pub fn record(&mut self, name: &str, track: usize, accuracy_ms: f64, game_time: f64) {
        if accuracy_ms.is_infinite() {
            debug!("Track #{} {}", track + 1, name);
        } else {
            debug!("Track #{} {} ({} ms)", track + 1, name, accuracy_ms.round());
        }
        if track >= self.tracks.len() {
            self.tracks.resize_with(track + 1, Vec::new);
        }
        self.tracks[track].push(AccuracyEvent {
            name: name.to_string(),
            track,
            accuracy_ms,
            game_time,
        });
    }

    pub fn track(&self, track: usize) -> &[AccuracyEvent] {
        self.tracks.get(track).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccuracyEvent> {
        self.tracks.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.tracks.iter_mut().for_each(Vec::clear);
    }
}

/// Turns key presses and releases into note judgments.
#[derive(Clone, Debug, Default)]
pub struct AccuracyManager {
    settings: AccuracySettings,
}

impl AccuracyManager {
    pub fn new(settings: AccuracySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AccuracySettings {
        &self.settings
    }

    pub fn get_accuracy_name(&self, diff_ms: f64) -> &str {
        self.settings.get_accuracy_name(diff_ms)
    }

    pub fn handle_player_action(&self, field: &mut Playfield, action: &PlayerKeyAction) {
        match action.key_state {
            KeyState::Down => self.try_to_hit_note(field, action.game_time, action.track),
            KeyState::Up => {
                if field.holds.release(action.track) {
                    self.try_to_release_note(field, action.game_time, action.track);
                }
            }
        }
    }

    fn earliest_unjudged_in_window(&self, field: &Playfield, game_time: f64, track: usize) -> Option<usize> {
        let (least, greatest) = self.settings.hittable_range_sec();
        field
            .notes
            .get_notes_by_time_range(game_time + least, game_time + greatest, track)
            .find(|&i| field.notes.track(track)[i].state == NoteState::Default)
    }

    pub fn try_to_hit_note(&self, field: &mut Playfield, game_time: f64, track: usize) {
        let Some(index) = self.earliest_unjudged_in_window(field, game_time, track) else {
            if self.settings.is_configured_for_boos() {
                let name = self.get_accuracy_name(f64::INFINITY);
                field.log.record(name, track, f64::INFINITY, game_time);
            }
            return;
        };

        let Some(note) = field.notes.note_mut(track, index) else {
            return;
        };
        let accuracy_ms = (note.time_sec - game_time) * 1000.0;
        match note.note_type {
            NoteType::Normal => {
                note.set_state(NoteState::Hit);
            }
            t if t.is_hold_head() => {
                note.set_state(NoteState::Held);
                field.holds.hold_note(track);
            }
            // Tails and mines can't be pressed.
            _ => return,
        }
        let name = self.get_accuracy_name(accuracy_ms);
        field.log.record(name, track, accuracy_ms, game_time);
    }

    pub fn try_to_release_note(&self, field: &mut Playfield, game_time: f64, track: usize) {
        if let Some(index) = self.earliest_unjudged_in_window(field, game_time, track) {
            let tail_time = field.notes.track(track)[index].time_sec;
            if field.notes.track(track)[index].note_type != NoteType::Tail {
                return;
            }
            self.resolve_hold(field, track, index);
            let accuracy_ms = (tail_time - game_time) * 1000.0;
            let name = format!("{}{}", RELEASE_PREFIX, self.get_accuracy_name(accuracy_ms));
            field.log.record(&name, track, accuracy_ms, game_time);
            return;
        }

        // Let go before the tail's window opened.
        let notes = &field.notes;
        let tail_index = notes
            .find_index_of_first_note_after_time(game_time, track, 0)
            .filter(|&i| i > 0);
        let matched = tail_index.filter(|&i| {
            let (head, tail) = (&notes.track(track)[i - 1], &notes.track(track)[i]);
            tail.note_type == NoteType::Tail
                && tail.state == NoteState::Default
                && head.note_type.is_hold_head()
                && head.state == NoteState::Held
        });
        match matched {
            Some(index) => {
                self.resolve_hold(field, track, index);
                let name = format!("{}{}", RELEASE_PREFIX, self.get_accuracy_name(f64::INFINITY));
                field.log.record(&name, track, f64::INFINITY, game_time);
            }
            None => debug!(
                "Release on track {} at {:.3}s matched no open hold, ignoring.",
                track, game_time
            ),
        }
    }

    fn resolve_hold(&self, field: &mut Playfield, track: usize, tail_index: usize) {
        if let Some(head) = tail_index.checked_sub(1).and_then(|i| field.notes.note_mut(track, i)) {
            head.set_state(NoteState::Hit);
        }
        if let Some(tail) = field.notes.note_mut(track, tail_index) {
            tail.set_state(NoteState::Hit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::Note;

    fn playfield(track: Vec<(NoteType, f64)>) -> Playfield {
        Playfield::new(vec![
            track.into_iter().map(|(t, s)| Note::new(t, s, 0.0)).collect(),
        ])
    }

    fn press(m: &AccuracyManager, f: &mut Playfield, t: f64) {
        m.handle_player_action(f, &PlayerKeyAction::new(t, 0, KeyState::Down));
    }

    fn lift(m: &AccuracyManager, f: &mut Playfield, t: f64) {
        m.handle_player_action(f, &PlayerKeyAction::new(t, 0, KeyState::Up));
    }

    fn names(f: &Playfield) -> Vec<String> {
        f.log.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn classifies_default_bands() {
        let s = AccuracySettings::default();
        assert_eq!(s.get_accuracy_name(0.0), "Amazing");
        assert_eq!(s.get_accuracy_name(17.0), "Amazing");
        assert_eq!(s.get_accuracy_name(17.5), "Perfect");
        assert_eq!(s.get_accuracy_name(-100.0), "Average");
        assert_eq!(s.get_accuracy_name(-116.9), "Average");
        assert_eq!(s.get_accuracy_name(-117.0), UNKNOWN_ACCURACY);
        assert_eq!(s.get_accuracy_name(-117.1), "Miss");
        assert_eq!(s.get_accuracy_name(117.0), "Boo");
        assert_eq!(s.get_accuracy_name(200.0), "Boo");
        assert_eq!(s.get_accuracy_name(f64::INFINITY), "Boo");
        assert_eq!(s.get_accuracy_name(f64::NEG_INFINITY), "Miss");
    }

    #[test]
    fn unclassifiable_offsets_get_the_sentinel() {
        let s = AccuracySettings::new(vec![
            AccuracyWindow::new("Early", Some(-50.0), Some(0.0)),
            AccuracyWindow::new("Late", Some(10.0), Some(50.0)),
        ])
        .expect("valid bands");
        assert_eq!(s.get_accuracy_name(5.0), UNKNOWN_ACCURACY);
        assert_eq!(s.get_accuracy_name(f64::INFINITY), UNKNOWN_ACCURACY);
        assert!(!s.is_configured_for_boos());
        assert!(!s.has_miss_band());
    }

    #[test]
    fn hittable_range_skips_catch_alls() {
        let s = AccuracySettings::default();
        let (least, greatest) = s.hittable_range_sec();
        assert!((least + 0.117).abs() < 1e-12);
        assert!((greatest - 0.117).abs() < 1e-12);
        assert_eq!(s.earliest_accuracy_ms(), 117.0);
    }

    #[test]
    fn rejects_malformed_band_lists() {
        let one = vec![AccuracyWindow::new("Only", Some(-10.0), Some(10.0))];
        assert!(AccuracySettings::new(one).is_err());
        let misplaced_catch_all = vec![
            AccuracyWindow::new("A", Some(-10.0), Some(10.0)),
            AccuracyWindow::new("Miss", None, Some(20.0)),
        ];
        assert!(AccuracySettings::new(misplaced_catch_all).is_err());
        let inverted = vec![
            AccuracyWindow::new("A", Some(10.0), Some(-10.0)),
            AccuracyWindow::new("B", Some(10.0), Some(20.0)),
        ];
        assert!(AccuracySettings::new(inverted).is_err());
    }

    #[test]
    fn rejects_catch_alls_that_leave_no_hittable_window() {
        let crossed = vec![
            AccuracyWindow::new("Miss", None, Some(-100.0)),
            AccuracyWindow::new("Boo", Some(100.0), None),
        ];
        assert!(matches!(
            AccuracySettings::new(crossed),
            Err(ConfigError::InvalidAccuracySettings(_))
        ));
        let touching = vec![
            AccuracyWindow::new("Miss", None, Some(0.0)),
            AccuracyWindow::new("Boo", Some(0.0), None),
        ];
        assert!(AccuracySettings::new(touching).is_err());
    }

    #[test]
    fn on_time_press_is_amazing() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::Normal, 1.0)]);
        press(&m, &mut f, 1.0);
        assert_eq!(f.notes.track(0)[0].state, NoteState::Hit);
        assert_eq!(names(&f), vec!["Amazing"]);
        assert_eq!(f.log.track(0)[0].accuracy_ms, 0.0);
    }

    #[test]
    fn press_outside_window_is_a_boo() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::Normal, 1.0)]);
        press(&m, &mut f, 0.8);
        assert_eq!(f.notes.track(0)[0].state, NoteState::Default);
        let event = &f.log.track(0)[0];
        assert_eq!(event.name, "Boo");
        assert_eq!(event.accuracy_ms, f64::INFINITY);
    }

    #[test]
    fn late_press_classifies_negative_offset() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::Normal, 1.0)]);
        press(&m, &mut f, 1.1);
        assert_eq!(names(&f), vec!["Average"]);
        assert!((f.log.track(0)[0].accuracy_ms + 100.0).abs() < 1e-6);
    }

    #[test]
    fn hit_notes_are_not_judged_twice() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::Normal, 1.0)]);
        press(&m, &mut f, 1.0);
        press(&m, &mut f, 1.01);
        assert_eq!(names(&f), vec!["Amazing", "Boo"]);
    }

    #[test]
    fn hold_press_and_release_on_time() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::HoldHead, 1.0), (NoteType::Tail, 2.0)]);
        press(&m, &mut f, 1.0);
        assert_eq!(f.notes.track(0)[0].state, NoteState::Held);
        assert!(f.holds.is_held(0));
        lift(&m, &mut f, 2.0);
        assert!(!f.holds.is_held(0));
        assert!(f.notes.track(0).iter().all(|n| n.state == NoteState::Hit));
        let releases: Vec<String> = names(&f).into_iter().filter(|n| n.starts_with(RELEASE_PREFIX)).collect();
        assert_eq!(releases, vec!["Release Amazing"]);
    }

    #[test]
    fn roll_heads_are_held_like_hold_heads() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::RollHead, 1.0), (NoteType::Tail, 2.0)]);
        press(&m, &mut f, 1.0);
        assert!(f.holds.is_held(0));
    }

    #[test]
    fn early_release_resolves_the_hold() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::HoldHead, 1.0), (NoteType::Tail, 3.0)]);
        press(&m, &mut f, 1.0);
        lift(&m, &mut f, 1.5);
        assert!(f.notes.track(0).iter().all(|n| n.state == NoteState::Hit));
        let last = f.log.iter().last().expect("release recorded");
        assert_eq!(last.name, "Release Boo");
        assert_eq!(last.accuracy_ms, f64::INFINITY);
    }

    #[test]
    fn release_without_hold_is_ignored() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::HoldHead, 1.0), (NoteType::Tail, 3.0)]);
        lift(&m, &mut f, 1.5);
        assert!(f.log.is_empty());
        assert!(f.notes.track(0).iter().all(|n| n.state == NoteState::Default));
    }

    #[test]
    fn tails_cannot_be_pressed() {
        let m = AccuracyManager::default();
        let mut f = playfield(vec![(NoteType::Tail, 1.0)]);
        press(&m, &mut f, 1.0);
        assert!(f.log.is_empty());
        assert_eq!(f.notes.track(0)[0].state, NoteState::Default);
    }

    #[test]
    fn window_parses_camel_case_json() {
        let json = r#"[{"name":"Miss","lowerBound":null,"upperBound":-100},{"name":"Hit","lowerBound":-100,"upperBound":100}]"#;
        let windows: Vec<AccuracyWindow> = serde_json::from_str(json).expect("valid json");
        assert_eq!(windows[0], AccuracyWindow::new("Miss", None, Some(-100.0)));
        assert!(AccuracySettings::new(windows).is_ok());
    }
}
