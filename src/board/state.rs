//! Position representation and incremental state.
//!
//! The position keeps piece bitboards, a mailbox mirror, three Zobrist
//! hashes (main, pawn-only, non-pawn per color), checker and pin
//! bitboards refreshed on every make/unmake, the played-position list for
//! repetition detection, and the NNUE accumulator stack.

use std::fmt;

use super::attack_tables;
use super::nnue::{NnueAccumulator, NnueNetwork};
use super::types::{Bitboard, CastlingRights, Color, Move, Piece, Square, ALL_PIECES};
use super::zobrist;

/// Maximum search depth in plies
pub const MAX_PLY: usize = 128;

/// Upper bound on the moves of a single game, for stack preallocation
pub(crate) const MAX_GAME_MOVES: usize = 1024;

/// State needed to reverse a move, returned by `make_move` and consumed by
/// `unmake_move`. Everything not derivable from the move itself.
#[derive(Clone, Debug)]
pub struct UnmakeInfo {
    pub(crate) captured: Option<(Color, Piece)>,
    pub(crate) prev_ep_square: Option<Square>,
    pub(crate) prev_castling: CastlingRights,
    pub(crate) prev_fifty_move: u16,
    pub(crate) prev_ply_from_null: u16,
    pub(crate) prev_checkers: Bitboard,
    pub(crate) prev_pinned: [Bitboard; 2],
    pub(crate) prev_poskey: u64,
    pub(crate) prev_pawnkey: u64,
    pub(crate) prev_nonpawn_key: [u64; 2],
}

/// A chess position with incremental update support.
#[derive(Clone)]
pub struct Position {
    /// One bitboard per (color, piece type)
    pub(crate) bitboards: [[Bitboard; 6]; 2],
    /// Occupancy per color
    pub(crate) occupancies: [Bitboard; 2],
    /// Union of both occupancies
    pub(crate) all_occupied: Bitboard,
    /// Per-square mirror of the bitboards
    pub(crate) mailbox: [Option<(Color, Piece)>; 64],
    pub(crate) side: Color,
    pub(crate) ep_square: Option<Square>,
    pub(crate) castling: CastlingRights,
    /// Halfmoves since the last pawn push or capture
    pub(crate) fifty_move: u16,
    /// Halfmoves since the last null move (scopes repetition scans)
    pub(crate) ply_from_null: u16,
    pub(crate) fullmove: u16,
    /// Pieces currently giving check to the side to move
    pub(crate) checkers: Bitboard,
    /// Own pieces pinned to the own king, per color
    pub(crate) pinned: [Bitboard; 2],
    pub(crate) poskey: u64,
    pub(crate) pawnkey: u64,
    pub(crate) nonpawn_key: [u64; 2],
    /// Zobrist keys of every position reached this game, search plies
    /// included; append-only under make, popped under unmake
    pub(crate) played_positions: Vec<u64>,
    pub(crate) accumulator: NnueAccumulator,
    pub(crate) accumulator_stack: Vec<NnueAccumulator>,
}

impl Position {
    /// An empty board with white to move. Used as the FEN parsing base.
    #[must_use]
    pub(crate) fn empty() -> Self {
        Position {
            bitboards: [[Bitboard::EMPTY; 6]; 2],
            occupancies: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            mailbox: [None; 64],
            side: Color::White,
            ep_square: None,
            castling: CastlingRights::none(),
            fifty_move: 0,
            ply_from_null: 0,
            fullmove: 1,
            checkers: Bitboard::EMPTY,
            pinned: [Bitboard::EMPTY; 2],
            poskey: 0,
            pawnkey: 0,
            nonpawn_key: [0; 2],
            played_positions: Vec::with_capacity(MAX_GAME_MOVES + MAX_PLY),
            accumulator: NnueAccumulator::default(),
            accumulator_stack: Vec::with_capacity(MAX_PLY + 1),
        }
    }

    /// The standard starting position
    #[must_use]
    pub fn startpos() -> Self {
        use super::fen::START_FEN;
        Self::from_fen(START_FEN).expect("start position FEN is valid")
    }

    /// The piece on a square, if any
    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        self.mailbox[sq.index()]
    }

    /// The side to move
    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side
    }

    /// The current en passant target square, if any
    #[inline]
    #[must_use]
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// The main Zobrist key
    #[inline]
    #[must_use]
    pub fn key(&self) -> u64 {
        self.poskey
    }

    /// Halfmove clock (fifty-move rule counter)
    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u16 {
        self.fifty_move
    }

    /// Bitboard of one piece type for one color
    #[inline]
    #[must_use]
    pub(crate) fn piece_bb(&self, color: Color, piece: Piece) -> Bitboard {
        self.bitboards[color.index()][piece.index()]
    }

    /// Bitboard of one piece type for both colors
    #[inline]
    #[must_use]
    pub(crate) fn piece_type_bb(&self, piece: Piece) -> Bitboard {
        self.bitboards[0][piece.index()] | self.bitboards[1][piece.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn occupancy(&self, color: Color) -> Bitboard {
        self.occupancies[color.index()]
    }

    /// The square of a color's king. Exactly one king per side is a
    /// representation invariant.
    #[inline]
    #[must_use]
    pub(crate) fn king_sq(&self, color: Color) -> Square {
        self.piece_bb(color, Piece::King).lsb()
    }

    /// Bitboard of pieces currently giving check to the side to move
    #[inline]
    #[must_use]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }

    /// True when the side to move is in check
    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.checkers.any()
    }

    /// All pieces of either color attacking `sq` under the given occupancy
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        let bishops = self.piece_type_bb(Piece::Bishop) | self.piece_type_bb(Piece::Queen);
        let rooks = self.piece_type_bb(Piece::Rook) | self.piece_type_bb(Piece::Queen);

        (attack_tables::pawn_attacks(Color::White, sq) & self.piece_bb(Color::Black, Piece::Pawn))
            | (attack_tables::pawn_attacks(Color::Black, sq)
                & self.piece_bb(Color::White, Piece::Pawn))
            | (attack_tables::knight_attacks(sq) & self.piece_type_bb(Piece::Knight))
            | (attack_tables::king_attacks(sq) & self.piece_type_bb(Piece::King))
            | (attack_tables::bishop_attacks(sq, occupancy) & bishops)
            | (attack_tables::rook_attacks(sq, occupancy) & rooks)
    }

    /// True if `by` attacks `sq` under the given occupancy
    #[must_use]
    pub(crate) fn is_square_attacked_occ(
        &self,
        sq: Square,
        by: Color,
        occupancy: Bitboard,
    ) -> bool {
        (self.attackers_to(sq, occupancy) & self.occupancy(by)).any()
    }

    /// True if `by` attacks `sq` on the current board
    #[inline]
    #[must_use]
    pub(crate) fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        self.is_square_attacked_occ(sq, by, self.all_occupied)
    }

    /// Refresh the checker and pin bitboards. Called at the end of every
    /// make/unmake so move generation never recomputes them.
    pub(crate) fn update_checkers_and_pins(&mut self) {
        let king = self.king_sq(self.side);
        self.checkers = self.attackers_to(king, self.all_occupied)
            & self.occupancy(self.side.opponent());

        for color in [Color::White, Color::Black] {
            self.pinned[color.index()] = self.compute_pinned(color);
        }
    }

    /// Own pieces of `color` that sit alone on a ray between their king
    /// and an enemy slider.
    fn compute_pinned(&self, color: Color) -> Bitboard {
        let king = self.king_sq(color);
        let enemy = color.opponent();
        let mut pinned = Bitboard::EMPTY;

        let diag_sliders = (self.piece_bb(enemy, Piece::Bishop)
            | self.piece_bb(enemy, Piece::Queen))
            & attack_tables::bishop_attacks(king, Bitboard::EMPTY);
        let ortho_sliders = (self.piece_bb(enemy, Piece::Rook)
            | self.piece_bb(enemy, Piece::Queen))
            & attack_tables::rook_attacks(king, Bitboard::EMPTY);

        for slider in (diag_sliders | ortho_sliders).iter() {
            let blockers = attack_tables::between(king, slider) & self.all_occupied;
            if blockers.is_single() && (blockers & self.occupancy(color)).any() {
                pinned |= blockers;
            }
        }
        pinned
    }

    /// True if `color` has any piece besides pawns and the king (the null
    /// move guard against zugzwang)
    #[must_use]
    pub(crate) fn has_non_pawns(&self, color: Color) -> bool {
        (self.occupancy(color)
            ^ self.piece_bb(color, Piece::Pawn)
            ^ self.piece_bb(color, Piece::King))
        .any()
    }

    /// Recompute all three Zobrist hashes from scratch. Used after FEN
    /// parsing and by the consistency checks.
    pub(crate) fn refresh_keys(&mut self) {
        let mut poskey = 0u64;
        let mut pawnkey = 0u64;
        let mut nonpawn = [0u64; 2];

        for sq in 0..64 {
            let square = Square::from_index(sq);
            if let Some((color, piece)) = self.mailbox[sq] {
                let key = zobrist::piece_key(color, piece, square);
                poskey ^= key;
                if piece == Piece::Pawn {
                    pawnkey ^= key;
                } else {
                    nonpawn[color.index()] ^= key;
                }
            }
        }
        if self.side == Color::Black {
            poskey ^= zobrist::side_key();
        }
        if let Some(ep) = self.ep_square {
            poskey ^= zobrist::en_passant_key(ep);
        }
        poskey ^= zobrist::castling_key(self.castling.as_u8());

        self.poskey = poskey;
        self.pawnkey = pawnkey;
        self.nonpawn_key = nonpawn;
    }

    /// The main key recomputed from scratch, for invariant checks
    #[must_use]
    pub(crate) fn key_from_scratch(&self) -> u64 {
        let mut key = 0u64;
        for sq in 0..64 {
            if let Some((color, piece)) = self.mailbox[sq] {
                key ^= zobrist::piece_key(color, piece, Square::from_index(sq));
            }
        }
        if self.side == Color::Black {
            key ^= zobrist::side_key();
        }
        if let Some(ep) = self.ep_square {
            key ^= zobrist::en_passant_key(ep);
        }
        key ^ zobrist::castling_key(self.castling.as_u8())
    }

    /// Estimate of the key after `mv`, good enough for TT prefetching.
    /// Promotions, castles and en passant fall back to the current key.
    #[must_use]
    pub(crate) fn key_after(&self, mv: Move) -> u64 {
        if mv.is_promotion() || mv.is_castling() || mv.is_en_passant() {
            return self.poskey;
        }
        let (color, piece) = mv.piece();
        let mut key = self.poskey
            ^ zobrist::side_key()
            ^ zobrist::piece_key(color, piece, mv.from())
            ^ zobrist::piece_key(color, piece, mv.to());
        if let Some((cap_color, cap_piece)) = self.piece_at(mv.to()) {
            key ^= zobrist::piece_key(cap_color, cap_piece, mv.to());
        }
        key
    }

    /// Rebuild the NNUE accumulator for the current board and clear the
    /// snapshot stack. Called after FEN setup, never during search.
    pub fn refresh_accumulator(&mut self, network: &NnueNetwork) {
        let pieces: Vec<(Color, Piece, Square)> = (0..64)
            .filter_map(|sq| {
                self.mailbox[sq].map(|(c, p)| (c, p, Square::from_index(sq)))
            })
            .collect();
        self.accumulator.refresh(network, pieces.into_iter());
        self.accumulator_stack.clear();
    }

    /// Evaluate the position with the given network, side-to-move relative
    #[inline]
    #[must_use]
    pub fn evaluate(&self, network: &NnueNetwork) -> i32 {
        network.evaluate(&self.accumulator, self.side)
    }

    /// Two-fold repetition inside the search tree, or three-fold overall.
    /// `height` is the distance from the search root; repetitions that
    /// occurred entirely inside the subtree count immediately.
    #[must_use]
    pub(crate) fn is_repetition(&self, height: usize) -> bool {
        let distance = usize::from(self.fifty_move.min(self.ply_from_null));
        let total = self.played_positions.len();
        let mut counter = 0;

        let mut index = 4;
        while index <= distance && index <= total {
            if self.played_positions[total - index] == self.poskey {
                // Found strictly inside the current search subtree
                if index < height {
                    return true;
                }
                counter += 1;
                if counter >= 2 {
                    return true;
                }
            }
            index += 2;
        }
        false
    }

    /// Draw by insufficient material: bare kings, a lone minor, or only
    /// same-colored bishops.
    #[must_use]
    pub(crate) fn is_insufficient_material(&self) -> bool {
        let pawns = self.piece_type_bb(Piece::Pawn);
        let rooks = self.piece_type_bb(Piece::Rook);
        let queens = self.piece_type_bb(Piece::Queen);
        if (pawns | rooks | queens).any() {
            return false;
        }

        let knights = self.piece_type_bb(Piece::Knight);
        let bishops = self.piece_type_bb(Piece::Bishop);
        let minors = knights.popcount() + bishops.popcount();

        if minors <= 1 {
            return true;
        }
        if knights.is_empty() {
            return (bishops & Bitboard::LIGHT_SQUARES).is_empty()
                || (bishops & Bitboard::DARK_SQUARES).is_empty();
        }
        false
    }

    /// Check the representation invariants. Reaching an inconsistent
    /// state is a programmer error; the tests call this after every
    /// make/unmake they perform.
    pub(crate) fn assert_consistent(&self) {
        let mut all = Bitboard::EMPTY;
        for color in [Color::White, Color::Black] {
            let mut occ = Bitboard::EMPTY;
            for piece in ALL_PIECES {
                occ |= self.piece_bb(color, piece);
            }
            assert_eq!(occ, self.occupancy(color));
            assert!((all & occ).is_empty());
            all |= occ;
        }
        assert_eq!(all, self.all_occupied);

        for sq in 0..64 {
            let square = Square::from_index(sq);
            match self.mailbox[sq] {
                Some((color, piece)) => assert!(self.piece_bb(color, piece).contains(square)),
                None => assert!(!self.all_occupied.contains(square)),
            }
        }

        assert_eq!(self.poskey, self.key_from_scratch());
        assert_eq!(
            self.checkers,
            self.attackers_to(self.king_sq(self.side), self.all_occupied)
                & self.occupancy(self.side.opponent())
        );
    }

    /// Place a piece without touching hashes or the accumulator; FEN
    /// parsing only.
    pub(crate) fn put_piece_unhashed(&mut self, color: Color, piece: Piece, sq: Square) {
        let bit = Bitboard::from_square(sq);
        self.bitboards[color.index()][piece.index()] |= bit;
        self.occupancies[color.index()] |= bit;
        self.all_occupied |= bit;
        self.mailbox[sq.index()] = Some((color, piece));
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::startpos()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let ch = match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => piece.to_fen_char(color),
                    None => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        writeln!(f, "fen: {}", self.to_fen())?;
        write!(f, "key: {:016x}", self.poskey)
    }
}
