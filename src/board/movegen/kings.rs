//! King move targets and castling.

use crate::board::attack_tables;
use crate::board::state::Position;
use crate::board::types::{Bitboard, Color, Move, MoveList, Square};

use super::GenCtx;

impl Position {
    /// Legal king target squares: enemy attacks are computed with the king
    /// removed from the occupancy, so sliders see through it.
    pub(super) fn king_targets(&self, from: Square) -> Bitboard {
        let enemy = self.side.opponent();
        let occupancy_without_king = self.all_occupied ^ Bitboard::from_square(from);

        let mut targets = Bitboard::EMPTY;
        for to in (attack_tables::king_attacks(from) & !self.occupancy(self.side)).iter() {
            if !self.is_square_attacked_occ(to, enemy, occupancy_without_king) {
                targets |= Bitboard::from_square(to);
            }
        }
        targets
    }

    /// Emit castle moves. Only callable when not in check; the rights bit,
    /// the empty path, and the attacked-square tests are all verified
    /// here.
    pub(super) fn generate_castles(&self, ctx: &GenCtx, list: &mut MoveList) {
        debug_assert!(ctx.check_mask == Bitboard::ALL);

        let color = self.side;
        if self.castling.has(color, true) && self.castle_path_ok(color, true) {
            let (from, to) = castle_king_squares(color, true);
            list.push(Move::castle_kingside(from, to, color));
        }
        if self.castling.has(color, false) && self.castle_path_ok(color, false) {
            let (from, to) = castle_king_squares(color, false);
            list.push(Move::castle_queenside(from, to, color));
        }
    }

    /// Squares between king and rook empty, and no square the king
    /// crosses (including its own) attacked.
    pub(super) fn castle_path_ok(&self, color: Color, kingside: bool) -> bool {
        let enemy = color.opponent();
        let base = if color == Color::White { 0 } else { 56 };

        let (empties, safe): (&[usize], &[usize]) = if kingside {
            (&[5, 6], &[4, 5, 6])
        } else {
            (&[1, 2, 3], &[4, 3, 2])
        };

        empties
            .iter()
            .all(|&f| !self.all_occupied.contains(Square::from_index(base + f)))
            && safe
                .iter()
                .all(|&f| !self.is_square_attacked(Square::from_index(base + f), enemy))
    }
}

/// King from/to squares for a castle
pub(super) fn castle_king_squares(color: Color, kingside: bool) -> (Square, Square) {
    let base = if color == Color::White { 0 } else { 56 };
    let to = if kingside { base + 6 } else { base + 2 };
    (Square::from_index(base + 4), Square::from_index(to))
}
