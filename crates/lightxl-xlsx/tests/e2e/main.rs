//! End-to-end tests for lightxl-xlsx.
//!
//! Each test builds the archive it needs in memory with `zip::ZipWriter`,
//! reads it with `XlsxReader`, and where relevant writes it back and reads
//! the result again.

mod common;
mod reading;
mod writing;

pub use common::*;
