#![no_std]

// Shared logic for the bay occupancy indicator.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library and exposing abstractions the other crates can
// adopt. Everything with algorithmic content lives here: the oscillator
// calibrator, the interrupt-fed sense counter, the rolling occupancy window,
// and the hysteresis state machine that drives the two-color indicator.

pub mod calibration;
pub mod decision;
pub mod fault;
pub mod sampling;
