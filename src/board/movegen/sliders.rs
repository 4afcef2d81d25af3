//! Slider (bishop, rook, queen) move targets.

use crate::board::attack_tables;
use crate::board::state::Position;
use crate::board::types::{Bitboard, Piece, Square};

use super::GenCtx;

impl Position {
    /// Legal target squares for the slider on `from`. Pinned sliders are
    /// restricted to the line through their own square and the king, which
    /// collapses to nothing when the pin direction doesn't match the
    /// piece's movement.
    pub(super) fn slider_targets(&self, ctx: &GenCtx, piece: Piece, from: Square) -> Bitboard {
        let attacks = match piece {
            Piece::Bishop => attack_tables::bishop_attacks(from, self.all_occupied),
            Piece::Rook => attack_tables::rook_attacks(from, self.all_occupied),
            _ => attack_tables::queen_attacks(from, self.all_occupied),
        };

        let mut targets = attacks & !self.occupancy(self.side) & ctx.check_mask;
        if ctx.pinned.contains(from) {
            targets &= attack_tables::line_through(ctx.king, from);
        }
        targets
    }
}
