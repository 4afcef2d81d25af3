//! Knight move targets.

use crate::board::attack_tables;
use crate::board::state::Position;
use crate::board::types::{Bitboard, Square};

use super::GenCtx;

impl Position {
    /// Legal target squares for the knight on `from`. A pinned knight can
    /// never move: none of its targets lie on a line through its own
    /// square.
    pub(super) fn knight_targets(&self, ctx: &GenCtx, from: Square) -> Bitboard {
        if ctx.pinned.contains(from) {
            return Bitboard::EMPTY;
        }
        attack_tables::knight_attacks(from) & !self.occupancy(self.side) & ctx.check_mask
    }
}
