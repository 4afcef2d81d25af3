//! Board and search test suites.

mod draw;
mod make_unmake;
mod perft;
mod proptest;
