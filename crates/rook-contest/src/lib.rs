//! Rook contest: several rooks wander a shared board, contending for cells.
//!
//! This crate wires the board kernel into a runnable contest:
//! - [`contest`] owns configuration and the run lifecycle
//! - [`event_log`] prints every board event and tallies them
//! - [`results`] captures a run for later inspection

pub mod contest;
pub mod event_log;
pub mod results;
