//! Port definitions.
//!
//! Renderers implement [`RecordSink`]; the engine never knows whether a
//! report becomes CSV, text or a terminal table.

mod record_sink;

pub use record_sink::RecordSink;
