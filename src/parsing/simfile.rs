use crate::game::timing::{BpmPoint, TimingError};
use crate::parsing::bpm::parse_bpm_map;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

// Any `#KEY:value;` tag. `#NOTES` sections also match here and are skipped by key.
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([^:;#]+):([^;]*);").expect("tag regex is valid"));

// type:author:difficulty:meter:radar:grid; the grid keeps its terminating `;`.
static NOTES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#NOTES:([^:]*):([^:]*):([^:]*):([^:]*):([^:]*):([^;]+;)")
        .expect("notes regex is valid")
});

#[derive(Debug)]
pub enum ParseError {
    Io(io::Error),
    UnsupportedExtension(String),
    MissingTag(String),
    InvalidNumber { tag: String, value: String },
    InvalidBpms(String),
    Timing(TimingError),
    NoCharts,
    ModeOutOfRange { index: usize, count: usize },
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> Self {
        ParseError::Io(err)
    }
}

impl From<TimingError> for ParseError {
    fn from(err: TimingError) -> Self {
        ParseError::Timing(err)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(e) => write!(f, "IO Error: {}", e),
            ParseError::UnsupportedExtension(ext) => {
                write!(f, "Unsupported file extension: {}", ext)
            }
            ParseError::MissingTag(tag) => write!(f, "Missing required tag: #{}", tag),
            ParseError::InvalidNumber { tag, value } => {
                write!(f, "Invalid number for tag '#{}': '{}'", tag, value)
            }
            ParseError::InvalidBpms(segment) => write!(f, "Invalid #BPMS segment: '{}'", segment),
            ParseError::Timing(e) => write!(f, "Invalid timing data: {}", e),
            ParseError::NoCharts => write!(f, "No charts found in simfile"),
            ParseError::ModeOutOfRange { index, count } => {
                write!(f, "Mode index {} out of range ({} modes)", index, count)
            }
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParseError::Io(e) => Some(e),
            ParseError::Timing(e) => Some(e),
            _ => None,
        }
    }
}

/// One `#NOTES:` section of a simfile.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartMode {
    pub chart_type: String,
    pub author: String,
    pub difficulty: String,
    pub meter: String, // Parsed but never used for timing: measures are always 4 beats.
    pub radar: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct Simfile {
    tags: HashMap<String, String>,
    pub bpms: Vec<BpmPoint>,
    pub offset: f64,
    pub sample_start: Option<f64>,
    pub sample_length: Option<f64>,
    pub modes: Vec<ChartMode>,
}

impl Simfile {
    /// Looks up a metadata tag by (case-insensitive) key. Empty values count as absent.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> &str {
        self.tag("TITLE").unwrap_or("")
    }

    pub fn artist(&self) -> &str {
        self.tag("ARTIST").unwrap_or("")
    }

    pub fn mode(&self, index: usize) -> Result<&ChartMode, ParseError> {
        self.modes.get(index).ok_or(ParseError::ModeOutOfRange {
            index,
            count: self.modes.len(),
        })
    }
}

pub fn clean_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| !c.is_control() && *c != '\u{200b}')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collects every non-`NOTES` tag, keyed by its upper-cased name. Later duplicates win.
pub fn parse_metadata_tags(content: &str) -> HashMap<String, String> {
    let mut tags = HashMap::new();
    for caps in TAG_RE.captures_iter(content) {
        let key = clean_tag(&caps[1]).to_ascii_uppercase();
        if key == "NOTES" {
            continue;
        }
        tags.insert(key, clean_tag(&caps[2]));
    }
    tags
}

pub fn parse_modes(content: &str) -> Vec<ChartMode> {
    NOTES_RE
        .captures_iter(content)
        .map(|caps| ChartMode {
            chart_type: clean_tag(&caps[1]),
            author: clean_tag(&caps[2]),
            difficulty: clean_tag(&caps[3]),
            meter: clean_tag(&caps[4]),
            radar: clean_tag(&caps[5]),
            notes: caps[6].to_string(),
        })
        .collect()
}

fn parse_number_tag(tags: &HashMap<String, String>, tag: &str) -> Result<Option<f64>, ParseError> {
    let Some(value) = tags.get(tag).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseError::InvalidNumber {
            tag: tag.to_string(),
            value: value.clone(),
        }),
    }
}

pub fn parse_simfile(content: &str) -> Result<Simfile, ParseError> {
    let tags = parse_metadata_tags(content);

    let bpms_str = tags
        .get("BPMS")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ParseError::MissingTag("BPMS".to_string()))?;
    let bpms = parse_bpm_map(bpms_str)?;
    if bpms.is_empty() {
        return Err(ParseError::InvalidBpms(bpms_str.clone()));
    }

    let offset = parse_number_tag(&tags, "OFFSET")?.unwrap_or_else(|| {
        debug!("No #OFFSET tag, defaulting to 0.");
        0.0
    });
    let sample_start = parse_number_tag(&tags, "SAMPLESTART")?;
    let sample_length = parse_number_tag(&tags, "SAMPLELENGTH")?;

    let modes = parse_modes(content);
    if modes.is_empty() {
        return Err(ParseError::NoCharts);
    }

    info!(
        "Parsed simfile '{}': {} tags, {} BPM points, {} modes.",
        tags.get("TITLE").map(String::as_str).unwrap_or(""),
        tags.len(),
        bpms.len(),
        modes.len()
    );

    Ok(Simfile {
        tags,
        bpms,
        offset,
        sample_start,
        sample_length,
        modes,
    })
}

pub fn load_simfile(path: &Path) -> Result<Simfile, ParseError> {
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case("sm") {
        warn!("Refusing to load '{:?}': not an .sm file.", path);
        return Err(ParseError::UnsupportedExtension(extension.to_string()));
    }
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    parse_simfile(&content)
}
