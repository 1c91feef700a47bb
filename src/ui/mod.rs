pub mod indicators;
pub mod panels;
pub mod plot;
