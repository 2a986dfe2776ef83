//! Reading tests - archives built in memory, read with `XlsxReader`.

mod cells;
mod structure;
