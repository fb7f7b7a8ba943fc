//! Built-in language-model capabilities for hosts without their own.

pub mod http;
