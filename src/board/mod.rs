//! Board representation and game logic.
//!
//! Bitboard-based position with incremental Zobrist hashing, legal move
//! generation via check/pin masks and magic slider lookups, static
//! exchange evaluation, NNUE accumulator maintenance, and the search on
//! top of it all.

mod attack_tables;
mod cuckoo;
mod error;
mod fen;
mod make_unmake;
pub mod movegen;
pub mod nnue;
pub mod search;
mod see;
mod state;
mod types;
mod zobrist;

#[cfg(test)]
mod tests;

// Public API - types users need
pub use error::{FenError, MoveParseError, SquareError};
pub use fen::START_FEN;
pub use movegen::GenMode;
pub use state::{Position, UnmakeInfo, MAX_PLY};
pub use types::{Bitboard, CastlingRights, Color, Move, MoveList, Piece, Square};

/// Build every process-wide table (attacks, Zobrist keys, cuckoo,
/// reduction tables). Must run before the first search; harmless to call
/// again.
pub fn init() {
    attack_tables::init();
    once_cell::sync::Lazy::force(&zobrist::KEYS);
    cuckoo::init();
    once_cell::sync::Lazy::force(&search::constants::REDUCTIONS);
    once_cell::sync::Lazy::force(&search::constants::LMP_MARGIN);
}
