pub mod chart;
pub mod gameplay;
pub mod hold;
pub mod judgment;
pub mod miss;
pub mod note;
pub mod note_manager;
pub mod playfield;
pub mod results;
pub mod song;
pub mod timing;
