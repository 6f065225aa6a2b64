// src/exec/mod.rs

//! Process launching, pipe draining, and streamed table parsing.

pub mod line_proxy;
pub mod orchestrator;
pub mod table_stream;

pub use line_proxy::{prefix_lines, spawn_line_proxy};
pub use orchestrator::Orchestrator;
pub use table_stream::{ColumnLayout, RowCollector, spawn_table_rows};
