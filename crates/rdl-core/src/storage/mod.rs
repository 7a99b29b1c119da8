//! Output file I/O.
//!
//! The output file is opened once per download and sized to the resource's
//! content length (fallocate on Linux when available, else set_len). Workers
//! share one `StorageWriter` and write their pieces with positional writes
//! (pwrite); piece ranges are disjoint so writes need no lock.

mod builder;
mod writer;

pub use builder::StorageWriterBuilder;
pub use writer::StorageWriter;
