use std::time::Instant;
use stepsync::config::Config;
use stepsync::core::input::KeyState;
use stepsync::game::chart::build_chart;
use stepsync::game::gameplay::{GameMode, GameSession};
use stepsync::game::note::{NoteState, NoteType};
use stepsync::parsing::simfile::parse_simfile;

const EPS: f64 = 1e-9;

fn simfile_text(bpms: &str, offset: &str, grid: &str) -> String {
    format!(
        "#TITLE:Session Test;\n#ARTIST:Nobody;\n#OFFSET:{};\n#BPMS:{};\n\
         #NOTES:\n     dance-single:\n     tester:\n     Medium:\n     5:\n     0.1,0.2,0.3,0.4,0.5:\n{}\n;\n",
        offset, bpms, grid
    )
}

fn session(bpms: &str, offset: &str, grid: &str) -> GameSession {
    let simfile = parse_simfile(&simfile_text(bpms, offset, grid)).expect("simfile parses");
    let chart = build_chart(&simfile, 0).expect("chart builds");
    let config = Config {
        pause_at_start_sec: Some(0.0),
        ..Config::default()
    };
    let mut session = GameSession::new(&config, chart);
    session.start(Instant::now());
    session
}

#[test]
fn first_row_lands_on_zero_and_offset_shifts_it() {
    let s = session("0=120", "0", "1000\n0000\n0000\n0000");
    assert_eq!(s.playfield().notes.track(0)[0].time_sec, 0.0);

    let s = session("0=120", "0.5", "1000\n0000\n0000\n0000");
    assert!((s.playfield().notes.track(0)[0].time_sec + 0.5).abs() < EPS);
}

#[test]
fn tempo_change_places_beat_eight_at_six_seconds() {
    let grid = "0000\n0000\n0000\n0000\n,\n0000\n0000\n0000\n0000\n,\n0100\n0000\n0000\n0000";
    let s = session("0=120,4=60", "0", grid);
    let note = &s.playfield().notes.track(1)[0];
    assert_eq!(note.beat, 8.0);
    assert!((note.time_sec - 6.0).abs() < EPS);
}

#[test]
fn on_time_press_and_stray_press() {
    let mut s = session("0=120", "0", "1000\n0000\n0000\n0000");
    s.handle_key("E", KeyState::Down, 0.0);
    s.handle_key("E", KeyState::Up, 0.05);
    s.handle_key("E", KeyState::Down, 0.2);

    let events = s.playfield().log.track(0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, "Amazing");
    assert_eq!(events[0].accuracy_ms, 0.0);
    assert_eq!(events[1].name, "Boo");
    assert_eq!(events[1].accuracy_ms, f64::INFINITY);
}

#[test]
fn hold_emits_one_release_event() {
    // Head at beat 0 (0s), tail at beat 2 (1s).
    let mut s = session("0=120", "0", "2000\n0000\n3000\n0000");
    s.handle_key("E", KeyState::Down, 0.0);
    assert_eq!(s.playfield().notes.track(0)[0].state, NoteState::Held);
    s.update(0.5);
    s.handle_key("E", KeyState::Up, 1.0);

    let track = s.playfield().notes.track(0);
    assert_eq!(track[1].note_type, NoteType::Tail);
    assert!(track.iter().all(|n| n.state == NoteState::Hit));
    let releases = s
        .playfield()
        .log
        .iter()
        .filter(|e| e.name.starts_with("Release "))
        .count();
    assert_eq!(releases, 1);
    assert!(!s.playfield().holds.is_held(0));
}

#[test]
fn miss_sweep_is_monotonic_and_ends_the_song() {
    let grid = "1000\n0100\n0010\n0001\n,\n1111\n0000\n0000\n0000";
    let mut s = session("0=120", "0", grid);
    let total = s.playfield().notes.total_notes();

    let mut previous_missed = 0;
    for step in 0..40 {
        let t = step as f64 * 0.1;
        s.update(t);
        let missed = s
            .playfield()
            .notes
            .tracks()
            .iter()
            .flatten()
            .filter(|n| n.state == NoteState::Missed)
            .count();
        assert!(missed >= previous_missed, "missed count went down at {}s", t);
        previous_missed = missed;
    }
    assert_eq!(previous_missed, total);
    assert_eq!(s.playfield().log.len(), total, "each note is missed once");
    assert_eq!(s.mode(), GameMode::Results);
    let results = s.results().expect("song ended");
    assert_eq!(results.counts.iter().find(|c| c.name == "Miss").map(|c| c.count), Some(total));
}

#[test]
fn autoplay_scores_only_amazings() {
    let grid = "1000\n0200\n0010\n0301\n,\n4000\n0000\n3000\n0M00";
    let mut s = session("0=150,3=75", "-0.02", grid);
    let results = s.run_autoplay(Instant::now());
    let amazing = results.counts.iter().find(|c| c.name == "Amazing").map_or(0, |c| c.count);
    assert_eq!(amazing, s.playfield().log.len());
    assert_eq!(results.total_notes, 7, "mines are not counted");
}
