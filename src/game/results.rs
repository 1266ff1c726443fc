use crate::game::judgment::{AccuracyLog, AccuracySettings, AccuracyWindow};

#[derive(Clone, Debug, PartialEq)]
pub struct AccuracyCount {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultsSummary {
    /// Best accuracy first.
    pub counts: Vec<AccuracyCount>,
    pub total_notes: usize,
    pub mean_ms: Option<f64>,
    pub std_dev_ms: Option<f64>,
}

fn sort_value(window: &AccuracyWindow) -> f64 {
    match (window.lower_bound, window.upper_bound) {
        (None, Some(hi)) => hi.abs(),
        (Some(lo), None) => lo.abs(),
        (Some(lo), Some(hi)) => ((hi + lo) / 2.0).abs(),
        (None, None) => f64::INFINITY,
    }
}

/// Unique accuracy names, ordered by the mean distance of their bands from zero.
pub fn results_accuracy_names(settings: &AccuracySettings) -> Vec<String> {
    let mut merged: Vec<(String, f64, usize)> = Vec::new();
    for window in settings.windows() {
        let value = sort_value(window);
        match merged.iter_mut().find(|(name, _, _)| *name == window.name) {
            Some((_, sum, n)) => {
                *sum += value;
                *n += 1;
            }
            None => merged.push((window.name.clone(), value, 1)),
        }
    }
    let mut table: Vec<(String, f64)> = merged
        .into_iter()
        .map(|(name, sum, n)| (name, sum / n as f64))
        .collect();
    // Stable, so equal values keep band order.
    table.sort_by(|a, b| a.1.total_cmp(&b.1));
    table.into_iter().map(|(name, _)| name).collect()
}

pub fn summarize(settings: &AccuracySettings, log: &AccuracyLog, total_notes: usize) -> ResultsSummary {
    let mut counts: Vec<AccuracyCount> = results_accuracy_names(settings)
        .into_iter()
        .map(|name| AccuracyCount { name, count: 0 })
        .collect();
    for event in log.iter() {
        let name = settings.get_accuracy_name(event.accuracy_ms);
        if let Some(entry) = counts.iter_mut().find(|c| c.name == name) {
            entry.count += 1;
        }
    }

    let finite: Vec<f64> = log
        .iter()
        .map(|e| e.accuracy_ms)
        .filter(|a| a.is_finite())
        .collect();
    let (mean_ms, std_dev_ms) = if finite.is_empty() {
        (None, None)
    } else {
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        (Some(mean), Some(variance.sqrt()))
    };

    ResultsSummary {
        counts,
        total_notes,
        mean_ms,
        std_dev_ms,
    }
}
