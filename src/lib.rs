//! UCI chess engine: bitboard move generation, NNUE-evaluated
//! alpha-beta search with Lazy-SMP, and the UCI front end.

pub mod board;
pub mod engine;
pub mod tt;
pub mod uci;

/// One-time process initialization (attack tables, Zobrist keys, cuckoo
/// tables, reduction tables). The UCI loop calls this before anything
/// else; library users should too.
pub fn init() {
    board::init();
}
