//! Legal move generation.
//!
//! Emits fully legal moves using the checker and pin bitboards the
//! position maintains across make/unmake. In double check only king moves
//! are generated; in single check every move is intersected with the
//! check mask (capture the checker or block its ray). Pinned pieces are
//! restricted to the line through their king.

mod kings;
mod knights;
mod pawns;
mod sliders;

use super::attack_tables;
use super::state::Position;
use super::types::{Bitboard, Move, MoveList, Piece, Square, PROMOTION_PIECES};

/// What to generate: everything, or only captures and promotions
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GenMode {
    All,
    Tactical,
}

/// Per-generation context derived from the position's checkers/pins
pub(crate) struct GenCtx {
    pub king: Square,
    pub check_mask: Bitboard,
    pub pinned: Bitboard,
}

impl Position {
    fn gen_ctx(&self) -> GenCtx {
        let king = self.king_sq(self.side);
        let check_mask = match self.checkers.popcount() {
            0 => Bitboard::ALL,
            _ => {
                let checker = self.checkers.lsb();
                attack_tables::between(king, checker) | self.checkers
            }
        };
        GenCtx {
            king,
            check_mask,
            pinned: self.pinned[self.side.index()],
        }
    }

    /// Generate legal moves into `list`
    pub fn generate_moves(&self, list: &mut MoveList, mode: GenMode) {
        list.clear();
        let ctx = self.gen_ctx();
        let color = self.side;
        let tactical = mode == GenMode::Tactical;

        // In double check only the king may move
        if self.checkers.popcount() < 2 {
            for from in self.piece_bb(color, Piece::Pawn).iter() {
                let targets = self.pawn_targets(&ctx, from, tactical);
                for to in targets.iter() {
                    self.push_pawn_move(list, from, to);
                }
            }

            for from in self.piece_bb(color, Piece::Knight).iter() {
                let targets = self.knight_targets(&ctx, from);
                self.push_piece_moves(list, Piece::Knight, from, targets, tactical);
            }

            for piece in [Piece::Bishop, Piece::Rook, Piece::Queen] {
                for from in self.piece_bb(color, piece).iter() {
                    let targets = self.slider_targets(&ctx, piece, from);
                    self.push_piece_moves(list, piece, from, targets, tactical);
                }
            }
        }

        let king = ctx.king;
        let king_targets = self.king_targets(king);
        self.push_piece_moves(list, Piece::King, king, king_targets, tactical);

        if !tactical && ctx.check_mask == Bitboard::ALL {
            self.generate_castles(&ctx, list);
        }
    }

    /// Emit non-pawn moves for one piece from its target bitboard
    fn push_piece_moves(
        &self,
        list: &mut MoveList,
        piece: Piece,
        from: Square,
        targets: Bitboard,
        tactical_only: bool,
    ) {
        let color = self.side;
        let enemy = self.occupancy(color.opponent());
        let filtered = if tactical_only { targets & enemy } else { targets };

        for to in filtered.iter() {
            let mv = if enemy.contains(to) {
                Move::capture(from, to, color, piece)
            } else {
                Move::quiet(from, to, color, piece)
            };
            list.push(mv);
        }
    }

    /// Emit one pawn move, expanding promotions into all four choices
    fn push_pawn_move(&self, list: &mut MoveList, from: Square, to: Square) {
        let color = self.side;
        let is_capture = self.occupancy(color.opponent()).contains(to);

        if Bitboard::BACK_RANKS.contains(to) {
            for promoted in PROMOTION_PIECES {
                list.push(Move::promotion(from, to, color, promoted, is_capture));
            }
        } else if self.ep_square == Some(to) && !is_capture {
            list.push(Move::en_passant(from, to, color));
        } else if is_capture {
            list.push(Move::capture(from, to, color, Piece::Pawn));
        } else if (to.index() as i32 - from.index() as i32).abs() == 16 {
            list.push(Move::double_pawn_push(from, to, color));
        } else {
            list.push(Move::quiet(from, to, color, Piece::Pawn));
        }
    }

    /// Check a move for legality in the current position. The staged move
    /// picker emits transposition-table and killer moves before any
    /// generation, and those may have gone stale; this validates them
    /// against the same masks the generator uses.
    #[must_use]
    pub fn is_legal(&self, mv: Move) -> bool {
        if mv == Move::null() {
            return false;
        }

        let (color, piece) = mv.piece();
        if color != self.side {
            return false;
        }
        let from = mv.from();
        let to = mv.to();
        if self.piece_at(from) != Some((color, piece)) {
            return false;
        }

        if self.checkers.popcount() >= 2 && piece != Piece::King {
            return false;
        }

        if mv.is_castling() {
            let kingside = mv.is_castle_kingside();
            let (cfrom, cto) = kings::castle_king_squares(color, kingside);
            return from == cfrom
                && to == cto
                && !self.in_check()
                && self.castling.has(color, kingside)
                && self.castle_path_ok(color, kingside);
        }

        let ctx = self.gen_ctx();
        let occupant = self.piece_at(to);

        // Flag / board agreement
        if mv.is_en_passant() {
            if self.ep_square != Some(to) || piece != Piece::Pawn {
                return false;
            }
        } else if mv.is_capture() {
            match occupant {
                Some((occ_color, _)) if occ_color != color => {}
                _ => return false,
            }
        } else if occupant.is_some() {
            return false;
        }

        match piece {
            Piece::Pawn => {
                let is_promo_rank = Bitboard::BACK_RANKS.contains(to);
                if mv.is_promotion() != is_promo_rank {
                    return false;
                }
                let is_double = (to.index() as i32 - from.index() as i32).abs() == 16;
                if mv.is_double_pawn_push() != (is_double && !mv.is_capture()) {
                    return false;
                }
                self.pawn_targets(&ctx, from, false).contains(to)
            }
            Piece::Knight => self.knight_targets(&ctx, from).contains(to),
            Piece::Bishop | Piece::Rook | Piece::Queen => {
                self.slider_targets(&ctx, piece, from).contains(to)
            }
            Piece::King => self.king_targets(from).contains(to),
        }
    }

    /// True if the side to move has at least one legal move
    #[must_use]
    pub fn has_legal_moves(&self) -> bool {
        let mut list = MoveList::new();
        self.generate_moves(&mut list, GenMode::All);
        !list.is_empty()
    }

    /// Fifty-move-rule draw. At 100 halfmoves while in check, the side
    /// must still have a legal reply, otherwise it is checkmate.
    #[must_use]
    pub(crate) fn is_50mr_draw(&self) -> bool {
        if self.fifty_move < 100 {
            return false;
        }
        !self.in_check() || self.has_legal_moves()
    }

    /// Combined draw predicate used by the search. `height` is the
    /// distance from the search root (repetition scoping).
    #[must_use]
    pub fn is_draw(&self, height: usize) -> bool {
        self.is_repetition(height) || self.is_50mr_draw() || self.is_insufficient_material()
    }

    /// Count leaf nodes of the legal move tree to the given depth
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let mut list = MoveList::new();
        self.generate_moves(&mut list, GenMode::All);
        if depth == 1 {
            return list.len() as u64;
        }

        let mut nodes = 0;
        for &mv in list.as_slice() {
            let info = self.make_move(mv);
            nodes += self.perft(depth - 1);
            self.unmake_move(mv, info);
        }
        nodes
    }

    /// Perft split by root move, for movegen debugging
    pub fn perft_divide(&mut self, depth: usize) -> Vec<(Move, u64)> {
        let mut list = MoveList::new();
        self.generate_moves(&mut list, GenMode::All);

        let mut results = Vec::with_capacity(list.len());
        for &mv in list.as_slice() {
            let info = self.make_move(mv);
            let nodes = if depth > 1 { self.perft(depth - 1) } else { 1 };
            self.unmake_move(mv, info);
            results.push((mv, nodes));
        }
        results
    }

    /// Find the legal move matching a long-algebraic string (`e2e4`,
    /// `e7e8q`), if any
    #[must_use]
    pub fn parse_move(&self, text: &str) -> Option<Move> {
        let mut list = MoveList::new();
        self.generate_moves(&mut list, GenMode::All);
        list.iter().copied().find(|mv| mv.to_string() == text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::Color;

    fn count_moves(fen: &str) -> usize {
        let pos = Position::from_fen(fen).unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        list.len()
    }

    #[test]
    fn test_startpos_has_twenty_moves() {
        let pos = Position::startpos();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert_eq!(list.len(), 20);
    }

    #[test]
    fn test_no_move_leaves_king_in_check() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        for &mv in list.as_slice() {
            let mover = pos.side_to_move();
            let info = pos.make_move(mv);
            assert!(
                !pos.is_square_attacked(pos.king_sq(mover), pos.side_to_move()),
                "move {mv} leaves own king in check"
            );
            pos.unmake_move(mv, info);
        }
    }

    #[test]
    fn test_en_passant_discovered_check_forbidden() {
        // Horizontal rook pin through both pawns: cxd6 would expose the king
        let pos = Position::from_fen("8/8/8/K1Pp3r/8/8/8/7k w - d6 0 1").unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert!(
            !list.iter().any(|mv| mv.is_en_passant()),
            "en passant must be rejected when it uncovers a rook"
        );
    }

    #[test]
    fn test_en_passant_allowed_when_safe() {
        let pos = Position::from_fen(
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        )
        .unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert!(list.iter().any(|mv| mv.is_en_passant()));
    }

    #[test]
    fn test_double_check_only_king_moves() {
        // Knight on f6 and rook on e8 both give check
        let pos =
            Position::from_fen("4r2k/8/8/8/8/5n2/8/4K3 w - - 0 1").unwrap();
        assert_eq!(pos.checkers().popcount(), 2);
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert!(list.iter().all(|mv| mv.piece().1 == Piece::King));
    }

    #[test]
    fn test_pinned_knight_cannot_move() {
        // Knight on d2 pinned by the rook on d8
        let pos = Position::from_fen("3r3k/8/8/8/8/8/3N4/3K4 w - - 0 1").unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert!(list
            .iter()
            .all(|mv| mv.piece().1 != Piece::Knight));
    }

    #[test]
    fn test_castle_blocked_by_attack() {
        // Black rook on f8 attacks f1: white may not castle kingside but
        // may castle queenside
        assert_eq!(
            count_moves("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1"),
            count_moves("5r1k/8/8/8/8/8/8/R3K2R w Q - 0 1")
        );
        let pos = Position::from_fen("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        assert!(!list.iter().any(|mv| mv.is_castle_kingside()));
        assert!(list.iter().any(|mv| mv.is_castling()));
    }

    #[test]
    fn test_tactical_mode_subset() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let mut all = MoveList::new();
        let mut tactical = MoveList::new();
        pos.generate_moves(&mut all, GenMode::All);
        pos.generate_moves(&mut tactical, GenMode::Tactical);

        assert!(tactical.len() < all.len());
        for &mv in tactical.as_slice() {
            assert!(mv.is_tactical());
            assert!(all.contains(mv));
        }
        // Every tactical move of the full list is in the tactical list
        for &mv in all.as_slice() {
            if mv.is_capture() || mv.is_promotion() {
                assert!(tactical.contains(mv));
            }
        }
    }

    #[test]
    fn test_is_legal_agrees_with_generation() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            let mut list = MoveList::new();
            pos.generate_moves(&mut list, GenMode::All);
            for &mv in list.as_slice() {
                assert!(pos.is_legal(mv), "{fen}: generated move {mv:?} fails is_legal");
            }
        }
    }

    #[test]
    fn test_is_legal_rejects_foreign_moves() {
        let pos = Position::startpos();
        // A move whose piece is not on the from square
        let bogus = Move::quiet(
            Square::new(3, 3),
            Square::new(4, 3),
            Color::White,
            Piece::Queen,
        );
        assert!(!pos.is_legal(bogus));
        // A black move when white is to move
        let wrong_side = Move::quiet(
            Square::new(6, 0),
            Square::new(5, 0),
            Color::Black,
            Piece::Pawn,
        );
        assert!(!pos.is_legal(wrong_side));
        assert!(!pos.is_legal(Move::null()));
    }

    #[test]
    fn test_parse_move() {
        let pos = Position::startpos();
        let mv = pos.parse_move("e2e4").unwrap();
        assert!(mv.is_double_pawn_push());
        assert!(pos.parse_move("e2e5").is_none());
        assert!(pos.parse_move("junk").is_none());
    }
}
