//! Leaf components of the Turbotype input augmentation engine.
//!
//! Nothing in this crate knows about documents or event loops: it holds the
//! tunables, the two user toggles, text measurement, field and key
//! classification, and the completion client that talks to a language model.

pub mod completion;
pub mod config;
pub mod field;
pub mod keys;
pub mod metrics;
pub mod settings;
