#![deny(warnings)]

pub mod config;
pub mod decode;
pub mod playback;
pub mod session;
pub mod tts;
pub mod util;
pub mod voice;
