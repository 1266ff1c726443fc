use crate::config::Config;
use crate::core::input::{KeyHandler, KeyState, PlayerKeyAction};
use crate::core::timing::GameClock;
use crate::game::chart::ChartData;
use crate::game::judgment::{AccuracyManager, AccuracySettings};
use crate::game::miss::MissManager;
use crate::game::note::NoteType;
use crate::game::note_manager::NoteManager;
use crate::game::playfield::Playfield;
use crate::game::results::{ResultsSummary, summarize};
use log::{debug, info};
use std::collections::VecDeque;
use std::time::Instant;

/// How long play continues past the last judgeable moment when the audio runs longer.
pub const SONG_END_GRACE_SEC: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    NotStarted,
    Playing,
    Results,
}

#[derive(Clone, Debug)]
struct KeyEdge {
    key: String,
    pressed: bool,
    timestamp: Instant,
}

/// Pause that keeps the first note out of its hit window when play starts.
pub fn default_pause_at_start(
    notes: &NoteManager,
    settings: &AccuracySettings,
    lead_in_sec: f64,
    initial_game_time: f64,
) -> f64 {
    let Some(earliest) = notes.earliest_note() else {
        return 0.0;
    };
    let minimum = lead_in_sec.max(settings.earliest_accuracy_ms() / 1000.0);
    let natural = earliest.time_sec - initial_game_time;
    (minimum - natural).max(0.0)
}

/// Time after which nothing is left to judge, stretched toward the end of the audio.
pub fn game_end_time(
    notes: &NoteManager,
    settings: &AccuracySettings,
    audio_duration_sec: Option<f64>,
) -> f64 {
    let latest = notes.latest_note().map_or(0.0, |n| n.time_sec);
    let notes_end = latest + settings.earliest_accuracy_ms() / 1000.0;
    match audio_duration_sec {
        Some(audio) => (notes_end + SONG_END_GRACE_SEC).min(audio).max(notes_end),
        None => notes_end,
    }
}

fn autoplay_actions(notes: &NoteManager) -> Vec<PlayerKeyAction> {
    let mut actions = Vec::new();
    for (track, notes) in notes.tracks().iter().enumerate() {
        for note in notes {
            let key_state = match note.note_type {
                NoteType::Tail => KeyState::Up,
                t if t.is_pressable() => KeyState::Down,
                _ => continue,
            };
            actions.push(PlayerKeyAction::new(note.time_sec, track, key_state));
        }
    }
    actions
}

/// A single play of one chart. Owns all mutable play state; input and frame updates are
/// applied in order through `&mut self`.
pub struct GameSession {
    pub chart: ChartData,
    field: Playfield,
    judge: AccuracyManager,
    misses: MissManager,
    keys: KeyHandler,
    clock: GameClock,
    pending_edges: VecDeque<KeyEdge>,
    audio_duration_sec: Option<f64>,
    end_time: f64,
    mode: GameMode,
}

impl GameSession {
    pub fn new(config: &Config, chart: ChartData) -> Self {
        let settings = config.accuracy_settings.clone();
        let field = Playfield::new(chart.tracks.clone());
        let mut clock = GameClock::new(config.additional_offset_sec, 0.0);
        clock.pause_at_start_sec = match config.pause_at_start_sec {
            Some(pause) => pause,
            None => default_pause_at_start(
                &field.notes,
                &settings,
                config.lead_in_sec,
                clock.initial_game_time(),
            ),
        };
        let end_time = game_end_time(&field.notes, &settings, None);
        info!(
            "Session ready: {} notes, pause at start {:.3}s, ends at {:.3}s.",
            field.notes.total_notes(),
            clock.pause_at_start_sec,
            end_time
        );

        Self {
            misses: MissManager::new(settings.clone(), field.num_tracks()),
            judge: AccuracyManager::new(settings),
            keys: KeyHandler::new(config.key_bindings.as_slice()),
            chart,
            field,
            clock,
            pending_edges: VecDeque::new(),
            audio_duration_sec: None,
            end_time,
            mode: GameMode::NotStarted,
        }
    }

    #[inline(always)]
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn playfield(&self) -> &Playfield {
        &self.field
    }

    pub fn settings(&self) -> &AccuracySettings {
        self.judge.settings()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn audio_duration_sec(&self) -> Option<f64> {
        self.audio_duration_sec
    }

    pub fn set_audio_duration(&mut self, audio_duration_sec: Option<f64>) {
        self.audio_duration_sec = audio_duration_sec;
        self.end_time = game_end_time(&self.field.notes, self.judge.settings(), audio_duration_sec);
        debug!("Audio duration {:?}, session now ends at {:.3}s.", audio_duration_sec, self.end_time);
    }

    pub fn start(&mut self, now: Instant) {
        if self.mode != GameMode::NotStarted {
            return;
        }
        self.clock.start(now);
        self.mode = GameMode::Playing;
        info!("Session started at game time {:.3}s.", self.clock.initial_game_time());
    }

    /// Throws away all judgments and returns to the not-started state.
    pub fn restart(&mut self) {
        self.field.reset();
        self.misses.reset();
        self.keys.clear_held();
        self.pending_edges.clear();
        self.clock = GameClock::new(self.clock.additional_offset_sec, self.clock.pause_at_start_sec);
        self.mode = GameMode::NotStarted;
    }

    /// Queues a raw key edge; it is judged at its own timestamp on the next update.
    pub fn queue_key_edge(&mut self, key: &str, pressed: bool, timestamp: Instant) {
        self.pending_edges.push_back(KeyEdge {
            key: key.to_string(),
            pressed,
            timestamp,
        });
    }

    /// Applies a key edge at an explicit game time. Returns the action it produced, if any.
    pub fn handle_key(&mut self, key: &str, key_state: KeyState, game_time: f64) -> Option<PlayerKeyAction> {
        if self.mode != GameMode::Playing {
            return None;
        }
        let action = match key_state {
            KeyState::Down => self.keys.key_down(key, game_time),
            KeyState::Up => self.keys.key_up(key, game_time),
        }?;
        self.handle_action(&action);
        Some(action)
    }

    pub fn handle_action(&mut self, action: &PlayerKeyAction) {
        if self.mode == GameMode::Playing && action.track < self.field.num_tracks() {
            self.judge.handle_player_action(&mut self.field, action);
        }
    }

    fn process_key_edges(&mut self) {
        while let Some(edge) = self.pending_edges.pop_front() {
            let game_time = self.clock.game_time_at(edge.timestamp);
            let key_state = if edge.pressed { KeyState::Down } else { KeyState::Up };
            self.handle_key(&edge.key, key_state, game_time);
        }
    }

    /// Frame update from wall-clock time.
    pub fn update_at(&mut self, now: Instant) -> GameMode {
        if self.mode == GameMode::Playing {
            self.process_key_edges();
        }
        let game_time = self.clock.game_time_at(now);
        self.update(game_time)
    }

    /// Frame update at an explicit game time: sweeps misses, then ends the song when due.
    pub fn update(&mut self, game_time: f64) -> GameMode {
        if self.mode != GameMode::Playing {
            return self.mode;
        }
        self.misses.update(&mut self.field, game_time);
        if game_time >= self.end_time {
            self.mode = GameMode::Results;
            info!(
                "Song ended at {:.3}s with {} judgments.",
                game_time,
                self.field.log.len()
            );
        }
        self.mode
    }

    /// Plays the chart perfectly: every press lands on its note and every hold is released
    /// on its tail. Starts the session if needed and runs it to the end.
    pub fn run_autoplay(&mut self, now: Instant) -> ResultsSummary {
        self.start(now);
        let mut actions = autoplay_actions(&self.field.notes);
        actions.sort_by(|a, b| a.game_time.total_cmp(&b.game_time));
        for action in &actions {
            self.update(action.game_time);
            self.handle_action(action);
        }
        let end_time = self.end_time;
        self.update(end_time);
        self.summary()
    }

    pub fn summary(&self) -> ResultsSummary {
        summarize(self.judge.settings(), &self.field.log, self.field.notes.total_notes())
    }

    pub fn results(&self) -> Option<ResultsSummary> {
        (self.mode == GameMode::Results).then(|| self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::note::{Note, NoteState};
    use std::time::Duration;

    fn chart(tracks: Vec<Vec<(NoteType, f64)>>) -> ChartData {
        ChartData {
            chart_type: "dance-single".to_string(),
            difficulty: "Easy".to_string(),
            meter: "1".to_string(),
            step_artist: String::new(),
            short_hash: String::new(),
            tracks: tracks
                .into_iter()
                .map(|t| t.into_iter().map(|(ty, s)| Note::new(ty, s, 0.0)).collect())
                .collect(),
        }
    }

    fn four_tracks(first: Vec<(NoteType, f64)>) -> ChartData {
        chart(vec![first, vec![], vec![], vec![]])
    }

    #[test]
    fn end_time_follows_audio_within_grace() {
        let notes = NoteManager::new(vec![vec![Note::new(NoteType::Normal, 10.0, 0.0)]]);
        let settings = AccuracySettings::default();
        let notes_end = 10.117;
        assert!((game_end_time(&notes, &settings, None) - notes_end).abs() < 1e-9);
        assert!((game_end_time(&notes, &settings, Some(12.0)) - 12.0).abs() < 1e-9);
        assert!((game_end_time(&notes, &settings, Some(60.0)) - (notes_end + 5.0)).abs() < 1e-9);
        assert!((game_end_time(&notes, &settings, Some(3.0)) - notes_end).abs() < 1e-9);
    }

    #[test]
    fn default_pause_keeps_first_note_out_of_reach() {
        let notes = NoteManager::new(vec![vec![Note::new(NoteType::Normal, 0.25, 0.0)]]);
        let settings = AccuracySettings::default();
        let pause = default_pause_at_start(&notes, &settings, 1.0, 0.0);
        assert!((pause - 0.75).abs() < 1e-9);
        assert_eq!(default_pause_at_start(&notes, &settings, 0.1, -5.0), 0.0);
        assert_eq!(default_pause_at_start(&NoteManager::default(), &settings, 1.0, 0.0), 0.0);
    }

    #[test]
    fn configured_pause_is_used_verbatim() {
        let config = Config {
            pause_at_start_sec: Some(2.5),
            ..Config::default()
        };
        let session = GameSession::new(&config, four_tracks(vec![(NoteType::Normal, 0.0)]));
        assert_eq!(session.clock().pause_at_start_sec, 2.5);
    }

    #[test]
    fn input_is_ignored_until_started() {
        let mut session = GameSession::new(&Config::default(), four_tracks(vec![(NoteType::Normal, 1.0)]));
        assert!(session.handle_key("E", KeyState::Down, 1.0).is_none());
        assert_eq!(session.update(1.0), GameMode::NotStarted);
        assert!(session.playfield().log.is_empty());
    }

    #[test]
    fn plays_through_to_results() {
        let mut session = GameSession::new(
            &Config::default(),
            four_tracks(vec![(NoteType::Normal, 1.0), (NoteType::Normal, 2.0)]),
        );
        session.start(Instant::now());
        assert_eq!(session.mode(), GameMode::Playing);

        let action = session.handle_key("e", KeyState::Down, 1.0).expect("bound key");
        assert_eq!(action.track, 0);
        assert!(session.handle_key("E", KeyState::Down, 1.01).is_none(), "key repeat");
        session.handle_key("E", KeyState::Up, 1.05);

        assert_eq!(session.update(2.0), GameMode::Playing);
        assert!(session.results().is_none());
        assert_eq!(session.update(2.2), GameMode::Results);
        assert_eq!(session.playfield().notes.track(0)[1].state, NoteState::Missed);

        let results = session.results().expect("song ended");
        let count = |name: &str| results.counts.iter().find(|c| c.name == name).map_or(0, |c| c.count);
        assert_eq!(count("Amazing"), 1);
        assert_eq!(count("Miss"), 1);
        assert_eq!(results.total_notes, 2);
    }

    #[test]
    fn queued_edges_are_judged_at_their_timestamp() {
        let config = Config {
            pause_at_start_sec: Some(0.0),
            ..Config::default()
        };
        let mut session = GameSession::new(&config, four_tracks(vec![(NoteType::Normal, 0.5)]));
        let t0 = Instant::now();
        session.start(t0);
        session.queue_key_edge("E", true, t0 + Duration::from_millis(500));
        session.update_at(t0 + Duration::from_millis(550));
        let event = &session.playfield().log.track(0)[0];
        assert_eq!(event.name, "Amazing");
        assert!(event.accuracy_ms.abs() < 1e-6);
    }

    #[test]
    fn restart_clears_judgments() {
        let mut session = GameSession::new(&Config::default(), four_tracks(vec![(NoteType::Normal, 1.0)]));
        session.start(Instant::now());
        session.handle_key("E", KeyState::Down, 1.0);
        session.restart();
        assert_eq!(session.mode(), GameMode::NotStarted);
        assert!(session.playfield().log.is_empty());
        assert_eq!(session.playfield().notes.track(0)[0].state, NoteState::Default);
    }

    #[test]
    fn autoplay_hits_everything() {
        let mut session = GameSession::new(
            &Config::default(),
            chart(vec![
                vec![(NoteType::Normal, 1.0), (NoteType::HoldHead, 2.0), (NoteType::Tail, 3.0)],
                vec![(NoteType::RollHead, 1.5), (NoteType::Tail, 2.5)],
            ]),
        );
        let results = session.run_autoplay(Instant::now());
        assert_eq!(session.mode(), GameMode::Results);
        assert!(session
            .playfield()
            .notes
            .tracks()
            .iter()
            .flatten()
            .all(|n| n.state == NoteState::Hit));
        let names: Vec<&str> = session.playfield().log.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names.iter().filter(|n| **n == "Release Amazing").count(), 2);
        assert_eq!(results.counts.iter().find(|c| c.name == "Amazing").map(|c| c.count), Some(5));
        assert_eq!(results.std_dev_ms, Some(0.0));
    }
}
