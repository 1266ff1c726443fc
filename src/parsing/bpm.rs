use crate::game::timing::BpmPoint;
use crate::parsing::simfile::ParseError;
use log::warn;

/// Parses a `#BPMS` value such as `0.000=120.000,64.000=180.000`.
///
/// Empty segments (a trailing comma) are skipped. Any segment that is not a
/// `beat=bpm` pair of finite numbers fails the whole map.
pub fn parse_bpm_map(bpms: &str) -> Result<Vec<BpmPoint>, ParseError> {
    let mut points = Vec::new();
    for chunk in bpms.split(',').map(str::trim) {
        if chunk.is_empty() {
            continue;
        }
        let Some((beat_str, bpm_str)) = chunk.split_once('=') else {
            warn!("Malformed BPM segment: '{}'", chunk);
            return Err(ParseError::InvalidBpms(chunk.to_string()));
        };
        let beat = parse_finite(beat_str).ok_or_else(|| ParseError::InvalidBpms(chunk.to_string()))?;
        let bpm = parse_finite(bpm_str).ok_or_else(|| ParseError::InvalidBpms(chunk.to_string()))?;
        points.push(BpmPoint { beat, bpm });
    }
    points.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    Ok(points)
}

fn parse_finite(s: &str) -> Option<f64> {
    s.trim_matches(|c: char| c.is_control() || c.is_whitespace())
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Returns the rounded (min, max) BPM across the map.
pub fn compute_bpm_range(bpm_map: &[BpmPoint]) -> (i32, i32) {
    if bpm_map.is_empty() {
        return (0, 0);
    }
    let mut min_bpm = f64::MAX;
    let mut max_bpm = f64::MIN;
    for point in bpm_map {
        min_bpm = min_bpm.min(point.bpm);
        max_bpm = max_bpm.max(point.bpm);
    }
    (min_bpm.round() as i32, max_bpm.round() as i32)
}
