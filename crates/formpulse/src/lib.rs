//! Core library for the formpulse survey service.
//!
//! The crate is organized around the submission capture path: a declarative
//! [`schema`] describes a form's pages and elements, the [`renderer`] walks
//! that schema one page at a time while the validation engine gates page
//! advancement, and the [`capture`] service merges the resulting payloads
//! into stored submissions and fans lifecycle events out through the
//! [`pipeline`] dispatcher.

pub mod capture;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod schema;
pub mod telemetry;
