use std::error::Error;

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod shell;
pub mod storage;
pub mod sync;
pub mod ui;

/// Flattens an error and its sources into one `a: b: c` line for logs.
pub fn unpack_error(err: &dyn Error) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}
