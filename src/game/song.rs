use crate::parsing::bpm::compute_bpm_range;
use crate::parsing::simfile::Simfile;
use std::cmp::Ordering;

/// One selectable `#NOTES` section. `id` is its index in the simfile.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeOption {
    pub chart_type: String,
    pub difficulty: String,
    pub meter: String,
    pub id: usize,
}

#[derive(Clone, Debug)]
pub struct SongData {
    pub title: String,
    pub artist: String,
    pub offset: f64,
    pub sample_start: Option<f64>,
    pub sample_length: Option<f64>,
    pub min_bpm: i32,
    pub max_bpm: i32,
    pub modes: Vec<ModeOption>,
}

impl SongData {
    pub fn from_simfile(simfile: &Simfile) -> Self {
        let (min_bpm, max_bpm) = compute_bpm_range(&simfile.bpms);
        Self {
            title: simfile.title().to_string(),
            artist: simfile.artist().to_string(),
            offset: simfile.offset,
            sample_start: simfile.sample_start,
            sample_length: simfile.sample_length,
            min_bpm,
            max_bpm,
            modes: mode_options(simfile),
        }
    }

    /// Formats the BPM for display, e.g. "128" or "90 - 180".
    pub fn formatted_display_bpm(&self) -> String {
        if self.min_bpm == self.max_bpm {
            format!("{}", self.min_bpm)
        } else {
            format!("{} - {}", self.min_bpm, self.max_bpm)
        }
    }
}

pub fn difficulty_rank(difficulty: &str) -> u8 {
    match difficulty.to_ascii_uppercase().as_str() {
        "BEGINNER" => 0,
        "EASY" => 1,
        "MEDIUM" => 2,
        "HARD" => 3,
        "CHALLENGE" => 4,
        "EDIT" => 5,
        _ => 6,
    }
}

fn compare_modes(a: &ModeOption, b: &ModeOption) -> Ordering {
    let meter = |m: &ModeOption| m.meter.trim().parse::<f64>().unwrap_or(f64::INFINITY);
    a.chart_type
        .to_uppercase()
        .cmp(&b.chart_type.to_uppercase())
        .then_with(|| difficulty_rank(&a.difficulty).cmp(&difficulty_rank(&b.difficulty)))
        .then_with(|| meter(a).total_cmp(&meter(b)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Lists the simfile's charts sorted by type, difficulty, meter, then file order.
pub fn mode_options(simfile: &Simfile) -> Vec<ModeOption> {
    let mut options: Vec<ModeOption> = simfile
        .modes
        .iter()
        .enumerate()
        .map(|(id, mode)| ModeOption {
            chart_type: mode.chart_type.clone(),
            difficulty: mode.difficulty.clone(),
            meter: mode.meter.clone(),
            id,
        })
        .collect();
    options.sort_by(compare_modes);
    options
}
