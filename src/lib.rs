pub mod audio;
pub mod config;
pub mod control;
pub mod convert;
pub mod engine;
pub mod midi;
pub mod note;
pub mod osc;
pub mod scene;
pub mod synth;
mod util;
