// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)]
// Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::identity_op)] // e.g., `x + 0`, `x * 1`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![warn(clippy::unwrap_used)] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![deny(missing_docs)] // Documentation is a must for release

//! # sinemodel
//!
//! A sinusoidal modeling library: partial-tracking analysis, spectral editing
//! transforms, and phase-continuous additive resynthesis for monophonic
//! audio.
//!
//! ## Overview
//!
//! The library extracts a sparse sinusoidal representation (a set of
//! [`Partial`] trajectories) from a mono sample buffer, models the leftover
//! noise residual as a time-varying band envelope, lets the partial set be
//! edited as plain data, and resynthesizes audio with independent time and
//! pitch scaling. It is a pure library boundary: no file formats, no audio
//! devices, no UI. The host owns the project state (signal, partials,
//! envelope) and passes it into each call; the core keeps no state between
//! calls.
//!
//! Whole buffers are processed ahead of time; there is no streaming mode.
//! Long passes report progress through callbacks at fixed frame intervals so
//! a single-threaded host can stay responsive.
//!
//! ## Quick Start
//!
//! ```rust
//! use sinemodel::{analyze, synthesize, AnalysisConfig, SynthesisConfig};
//! use sinemodel::generation::sine_wave;
//! use std::time::Duration;
//!
//! // Analyze one second of a 440 Hz tone into partials.
//! let signal = sine_wave(440.0, Duration::from_secs(1), 44_100, 0.5);
//! let partials = analyze(&signal, 44_100, &AnalysisConfig::default())?;
//! assert_eq!(partials.len(), 1);
//!
//! // Resynthesize at half speed: double the duration, unchanged pitch.
//! let config = SynthesisConfig { playback_rate: 0.5, ..SynthesisConfig::default() };
//! let stretched = synthesize(&partials, None, &config)?;
//! assert!(stretched.len() > signal.len());
//! # Ok::<(), sinemodel::SineModelError>(())
//! ```
//!
//! ## Error Handling
//!
//! Every fallible entry point returns [`SineModelResult`]. Configuration
//! mistakes (an FFT size that is not a power of two, a hop larger than the
//! frame) are rejected before any processing starts; nothing in the core is
//! retried, since every operation is a deterministic function of its inputs.
//! Degenerate numeric ranges inside editing transforms fall back to a unit
//! range or the identity rather than producing NaN.
//!
//! ## Serialization
//!
//! [`Partial`], [`Point`], [`NoiseEnvelope`], and the configuration types
//! implement `serde::{Serialize, Deserialize}` so the host can persist them
//! in whatever container it likes.

pub mod analysis;
pub mod config;
pub mod edits;
pub mod error;
pub mod generation;
pub mod model;
pub mod peaks;
pub mod residual;
pub mod spectrum;
pub mod synth;
pub mod tracker;

pub use analysis::{
    analyze, analyze_with_progress, downmix_mono, AnalysisProgress, AnalysisStage,
};
pub use config::{AnalysisConfig, NoiseConfig, SynthesisConfig, WindowType};
pub use error::{SineModelError, SineModelResult};
pub use model::{
    band_center_frequencies, Frame, NoiseEnvelope, Partial, Peak, Point,
};
pub use residual::{analyze_residual, NoiseAnalysis};
pub use synth::synthesize;
pub use tracker::{track_partials, track_partials_with_progress, TrackerProgress};
