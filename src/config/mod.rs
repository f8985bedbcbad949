//! Configuration models for the reconciler, channels, and presentation.

pub mod settings;

pub use settings::{ChannelConfig, MusterConfig, ReconcilerConfig};
