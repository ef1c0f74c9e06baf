//! Core of mvnsecrets
//!
//! Turns a secret held in a secrets store into a short-lived build-tool
//! settings file and runs the build tool against it:
//!
//! 1. [`Pipeline::fetch`] reads the username/password pair
//! 2. [`Template::render`] substitutes `${env.NAME}` placeholders
//! 3. [`RenderedConfig`] holds the result in an owner-only temp file
//! 4. [`ProcessRunner`] runs `<tool> -s <file> <args...>`
//! 5. the temp file is removed, whatever happened in between

pub mod config;
mod error;
pub mod pipeline;
pub mod rendered;
pub mod runner;
pub mod template;

pub use config::{Config, ConfigOverrides};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PlaceholderSource};
pub use rendered::RenderedConfig;
pub use runner::{ProcessRunner, RunError, TerminationSignals};
pub use template::{Bindings, RenderError, Template};
