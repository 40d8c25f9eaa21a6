//! Integration tests: full poll cycles against an in-memory provider and
//! sink.

mod poll_cycle;
