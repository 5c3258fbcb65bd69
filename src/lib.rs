pub mod config;
pub mod detect;
pub mod gait;
pub mod landmark;
pub mod range;
pub mod report;
