//! Agent runtime - the Santa persona and its SWAIG functions
//!
//! This crate provides the "brain" of the Santa service. The hosted voice
//! platform runs the language model; we describe the agent to it and answer
//! its function calls:
//! - Renders the SWML document that configures the AI verb (prompt, voice,
//!   media, hints, function definitions)
//! - Executes SWAIG function calls (`search_gifts`, `select_gift`,
//!   `check_nice_list`) against per-call gift state
//! - Searches the gift catalog (RapidAPI, with a canned fallback)
//!
//! # Architecture
//!
//! 1. **Document** (`swml`) - persona + tool definitions → SWML JSON
//! 2. **Function call** (`swaig`) - platform POST → `FunctionCall`
//! 3. **Tool execution** (`tools`) - `FunctionCall` → `FunctionResult`
//!    with global data, step changes and UI events
//!
//! # State
//!
//! The runtime keeps no per-call memory. All conversation state travels in
//! the call's global data and is echoed back by the platform on every call.

pub mod catalog;
pub mod persona;
pub mod runtime;
pub mod swaig;
pub mod swml;
pub mod tools;
