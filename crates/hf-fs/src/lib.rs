//! Filesystem primitives shared by every component that touches the
//! repository root: atomic JSON persistence, NDJSON audit appends, path and
//! filename validation, and the streaming digest-tee writer (spec §4.2, §6).

pub mod atomic;
pub mod filename;
pub mod ndjson;
pub mod path;
pub mod writer;

pub use atomic::{read_json, write_json_atomic};
pub use filename::{sanitize_base_name, sanitize_hint, validate_filename};
pub use ndjson::append_ndjson;
pub use path::validate_relative_path;
pub use writer::FastWriter;
