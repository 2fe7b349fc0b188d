//! Backend bridge: the worker thread that owns the store and its runtime.

pub mod commands;
pub mod runtime;
