//! Request logging helpers.
//!
//! Every request gets a short trace id and exactly two log lines: one on
//! entry, one on exit. Query strings are never part of either line.

mod trace_context;

pub use trace_context::{generate_trace_id, RequestSpan, TraceContext};
