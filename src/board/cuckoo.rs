//! Upcoming-repetition detection via Zobrist cuckoo hashing.
//!
//! Two 8192-slot open-addressed tables map the XOR-difference of two
//! position keys back to the single reversible non-pawn move connecting
//! them. At search time a node can then detect that the side to move is
//! able to force a repetition of a position already on the played stack,
//! and score it as at least a draw without searching the shuffle.

use once_cell::sync::Lazy;

use super::attack_tables;
use super::state::Position;
use super::types::{Bitboard, Color, Move, Piece, Square, NOMOVE};
use super::zobrist;

const TABLE_SIZE: usize = 8192;

/// Entries produced by inserting every reversible non-pawn (piece, a, b)
/// move pair. A fixed property of the key set.
#[cfg(debug_assertions)]
const EXPECTED_ENTRIES: usize = 3668;

#[inline]
fn h1(key: u64) -> usize {
    (key & 0x1FFF) as usize
}

#[inline]
fn h2(key: u64) -> usize {
    ((key >> 16) & 0x1FFF) as usize
}

struct CuckooTables {
    keys: [u64; TABLE_SIZE],
    moves: [Move; TABLE_SIZE],
}

static TABLES: Lazy<Box<CuckooTables>> = Lazy::new(|| {
    let mut tables = Box::new(CuckooTables {
        keys: [0; TABLE_SIZE],
        moves: [NOMOVE; TABLE_SIZE],
    });

    #[cfg(debug_assertions)]
    let mut count = 0usize;

    for color in [Color::White, Color::Black] {
        for piece in [
            Piece::Knight,
            Piece::Bishop,
            Piece::Rook,
            Piece::Queen,
            Piece::King,
        ] {
            for a in 0..64usize {
                for b in (a + 1)..64usize {
                    let sq_a = Square::from_index(a);
                    let sq_b = Square::from_index(b);
                    if !attack_tables::piece_attacks(piece, sq_a, Bitboard::EMPTY)
                        .contains(sq_b)
                    {
                        continue;
                    }

                    let mut mv = Move::quiet(sq_a, sq_b, color, piece);
                    let mut key = zobrist::piece_key(color, piece, sq_a)
                        ^ zobrist::piece_key(color, piece, sq_b)
                        ^ zobrist::side_key();

                    // Cuckoo insertion: evict and relocate until a slot
                    // frees up
                    let mut slot = h1(key);
                    loop {
                        std::mem::swap(&mut tables.keys[slot], &mut key);
                        std::mem::swap(&mut tables.moves[slot], &mut mv);
                        if mv == NOMOVE {
                            break;
                        }
                        slot = if slot == h1(key) { h2(key) } else { h1(key) };
                    }

                    #[cfg(debug_assertions)]
                    {
                        count += 1;
                    }
                }
            }
        }
    }

    #[cfg(debug_assertions)]
    debug_assert_eq!(count, EXPECTED_ENTRIES);

    tables
});

/// Force table construction at startup
pub fn init() {
    Lazy::force(&TABLES);
}

impl Position {
    /// True when the side to move can force a repetition of a position
    /// already on the played stack (and, below the root, when the
    /// repetition would fall entirely inside the search tree).
    #[must_use]
    pub(crate) fn has_game_cycle(&self, height: usize) -> bool {
        let end = usize::from(self.fifty_move.min(self.ply_from_null));
        if end < 3 {
            return false;
        }

        let total = self.played_positions.len();
        let old_key = |i: usize| self.played_positions[total - i];

        let occupancy = self.all_occupied;
        let original = self.poskey;
        let mut other = original ^ old_key(1) ^ zobrist::side_key();

        let mut i = 3;
        while i <= end && i <= total {
            let curr = old_key(i);
            other ^= curr ^ old_key(i - 1) ^ zobrist::side_key();

            if other != 0 {
                i += 2;
                continue;
            }

            let diff = original ^ curr;
            let mut slot = h1(diff);
            if diff != TABLES.keys[slot] {
                slot = h2(diff);
            }
            if diff != TABLES.keys[slot] {
                i += 2;
                continue;
            }

            let mv = TABLES.moves[slot];
            let from = mv.from();
            let to = mv.to();

            // The connecting move must be playable: nothing between its
            // endpoints on the current board
            if (attack_tables::between(from, to) & occupancy).is_empty() {
                // Repetition strictly after the root is decisive
                if height > i {
                    return true;
                }

                // Crossing the root: only count it for the side owning
                // the cycling piece
                let piece = self
                    .piece_at(from)
                    .or_else(|| self.piece_at(to));
                if let Some((color, _)) = piece {
                    if color == self.side {
                        return true;
                    }
                }
            }
            i += 2;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::colored_index;

    #[test]
    fn test_tables_build() {
        init();
        // The move stored for a key difference must reverse it
        let mut stored = 0usize;
        for slot in 0..TABLE_SIZE {
            let key = TABLES.keys[slot];
            if key == 0 {
                continue;
            }
            stored += 1;
            let mv = TABLES.moves[slot];
            let (color, piece) = mv.piece();
            let expected = zobrist::piece_key(color, piece, mv.from())
                ^ zobrist::piece_key(color, piece, mv.to())
                ^ zobrist::side_key();
            assert_eq!(key, expected);
            assert!(colored_index(color, piece) < 12);
        }
        assert_eq!(stored, 3668);
    }

    #[test]
    fn test_upcoming_repetition_detected() {
        // Shuffle knights out and back: after white's knight returns and
        // black's knight has stepped out, black to move can repeat
        let mut pos = Position::startpos();
        for text in ["g1f3", "g8f6", "f3g1"] {
            let mv = pos.parse_move(text).unwrap();
            pos.make_move(mv);
        }
        // Black can play f6g8 restoring the start position
        assert!(pos.has_game_cycle(4));
    }

    #[test]
    fn test_no_cycle_from_start() {
        let pos = Position::startpos();
        assert!(!pos.has_game_cycle(0));
    }
}
