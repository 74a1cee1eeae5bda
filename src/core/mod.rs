//! Partial file fingerprinting

pub mod partial_hash;
pub mod sampling;

pub use partial_hash::{md5_of_first_kilobyte, partial_md5};
pub use sampling::{sample_windows, SampleWindow, SampleWindows};
