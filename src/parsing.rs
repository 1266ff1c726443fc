pub mod bpm;
pub mod notes;
pub mod simfile;
