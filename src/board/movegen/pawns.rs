//! Pawn move targets.

use crate::board::attack_tables;
use crate::board::state::Position;
use crate::board::types::{Bitboard, Color, Piece, Square};

use super::GenCtx;

impl Position {
    /// All legal target squares for the pawn on `from`, pushes and
    /// captures combined. Capture / double-push / en-passant flags are
    /// recovered from the target square when the move is emitted.
    pub(super) fn pawn_targets(&self, ctx: &GenCtx, from: Square, tactical_only: bool) -> Bitboard {
        let color = self.side;
        let white = color == Color::White;
        let empty = !self.all_occupied;
        let enemy = self.occupancy(color.opponent());

        let line_ok = if ctx.pinned.contains(from) {
            attack_tables::line_through(ctx.king, from)
        } else {
            Bitboard::ALL
        };

        let start_rank = if white { Bitboard::RANK_2 } else { Bitboard::RANK_7 };
        let single = Bitboard::from_square(from.pawn_push(white)) & empty;
        let double = if Bitboard::from_square(from) & start_rank != Bitboard::EMPTY
            && single.any()
        {
            Bitboard::from_square(from.pawn_push(white).pawn_push(white)) & empty
        } else {
            Bitboard::EMPTY
        };

        let mut pushes = (single | double) & line_ok & ctx.check_mask;
        if tactical_only {
            // Only promoting pushes are tactical
            pushes &= Bitboard::BACK_RANKS;
        }

        let attacks = attack_tables::pawn_attacks(color, from);
        let mut captures = attacks & enemy & line_ok & ctx.check_mask;

        if let Some(ep) = self.ep_square {
            let ep_bit = Bitboard::from_square(ep);
            let victim = ep.pawn_push(!white);
            // The capture must resolve the current check (by taking the
            // checking pawn or landing on the blocking square), respect a
            // pin ray, and must not uncover a slider on the king.
            if (attacks & ep_bit).any()
                && (ctx.check_mask.contains(victim) || ctx.check_mask.contains(ep))
                && line_ok.contains(ep)
                && self.en_passant_is_safe(from, ep, victim)
            {
                captures |= ep_bit;
            }
        }

        pushes | captures
    }

    /// Verify an en passant capture does not expose the own king: both
    /// pawns leave their squares at once, so a rook on the shared rank (or
    /// a bishop through the victim's square) can be revealed.
    fn en_passant_is_safe(&self, from: Square, ep: Square, victim: Square) -> bool {
        let color = self.side;
        let enemy = color.opponent();
        let king = self.king_sq(color);

        let occupancy = (self.all_occupied
            ^ Bitboard::from_square(from)
            ^ Bitboard::from_square(victim))
            | Bitboard::from_square(ep);

        let bishops = self.piece_bb(enemy, Piece::Bishop) | self.piece_bb(enemy, Piece::Queen);
        let rooks = self.piece_bb(enemy, Piece::Rook) | self.piece_bb(enemy, Piece::Queen);

        (attack_tables::bishop_attacks(king, occupancy) & bishops).is_empty()
            && (attack_tables::rook_attacks(king, occupancy) & rooks).is_empty()
    }
}
