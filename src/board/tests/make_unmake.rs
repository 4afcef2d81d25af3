//! Make/unmake round-trip invariants.

use crate::board::movegen::GenMode;
use crate::board::nnue::NnueNetwork;
use crate::board::types::MoveList;
use crate::board::Position;

const TRICKY_FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
    "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
];

/// Snapshot of every observable field of a position
fn snapshot(pos: &Position) -> (String, u64, u64, [u64; 2], u64, usize, usize) {
    (
        pos.to_fen(),
        pos.key(),
        pos.pawnkey,
        pos.nonpawn_key,
        pos.checkers().0,
        pos.played_positions.len(),
        pos.accumulator_stack.len(),
    )
}

#[test]
fn test_every_move_round_trips() {
    for fen in TRICKY_FENS {
        let mut pos = Position::from_fen(fen).unwrap();
        let before = snapshot(&pos);

        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);

        for &mv in list.as_slice() {
            let info = pos.make_move(mv);
            pos.assert_consistent();
            pos.unmake_move(mv, info);
            assert_eq!(snapshot(&pos), before, "{fen}: {mv} did not round-trip");
            pos.assert_consistent();
        }
    }
}

#[test]
fn test_hash_matches_from_scratch_along_a_line() {
    let mut pos = Position::startpos();
    for text in ["e2e4", "d7d5", "e4d5", "d8d5", "b1c3", "d5a5", "e1e2"] {
        let mv = pos.parse_move(text).unwrap();
        pos.make_move(mv);
        assert_eq!(pos.key(), pos.key_from_scratch(), "after {text}");
        pos.assert_consistent();
    }
}

#[test]
fn test_null_move_round_trips() {
    let pos = Position::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let mut pos = pos;
    let before = snapshot(&pos);

    let info = pos.make_null();
    assert_ne!(pos.key(), before.1);
    assert_eq!(pos.ply_from_null, 0);
    pos.unmake_null(info);
    assert_eq!(snapshot(&pos), before);
}

#[test]
fn test_null_move_clears_en_passant() {
    let mut pos = Position::from_fen(
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
    )
    .unwrap();
    let before_ep = pos.ep_square();
    assert!(before_ep.is_some());

    let info = pos.make_null();
    assert_eq!(pos.ep_square(), None);
    pos.unmake_null(info);
    assert_eq!(pos.ep_square(), before_ep);
    assert_eq!(pos.key(), pos.key_from_scratch());
}

/// A network with nonzero weights, to make accumulator bugs visible
fn patterned_network() -> NnueNetwork {
    let mut net = NnueNetwork::zeroed();
    for (i, row) in net.feature_weights.iter_mut().enumerate() {
        for (j, weight) in row.iter_mut().enumerate() {
            *weight = ((i * 37 + j * 13) % 151) as i16 - 75;
        }
    }
    net
}

#[test]
fn test_accumulator_matches_refresh_after_make_unmake() {
    let net = patterned_network();

    for fen in TRICKY_FENS {
        let mut pos = Position::from_fen(fen).unwrap();
        pos.refresh_accumulator(&net);

        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);

        for &mv in list.as_slice() {
            let info = pos.make_move_nnue(mv, &net);

            // The incrementally updated accumulator must equal a scratch
            // rebuild of the new position
            let mut fresh = pos.clone();
            fresh.refresh_accumulator(&net);
            assert!(
                pos.accumulator == fresh.accumulator,
                "{fen}: accumulator diverged after {mv}"
            );

            pos.unmake_move_nnue(mv, info);
            let mut restored = pos.clone();
            restored.refresh_accumulator(&net);
            assert!(pos.accumulator == restored.accumulator);
            assert!(pos.accumulator_stack.is_empty());
        }
    }
}

#[test]
fn test_accumulator_stack_depth_tracks_ply() {
    let net = patterned_network();
    let mut pos = Position::startpos();
    pos.refresh_accumulator(&net);

    let mut undos = Vec::new();
    for text in ["e2e4", "e7e5", "g1f3", "b8c6"] {
        let mv = pos.parse_move(text).unwrap();
        undos.push((mv, pos.make_move_nnue(mv, &net)));
        assert_eq!(pos.accumulator_stack.len(), undos.len());
    }
    while let Some((mv, info)) = undos.pop() {
        pos.unmake_move_nnue(mv, info);
        assert_eq!(pos.accumulator_stack.len(), undos.len());
    }
}

#[test]
fn test_deep_line_round_trips_exactly() {
    // Walk a long line with castles, captures and promotions, then back
    let mut pos = Position::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    let before = snapshot(&pos);

    let line = ["e1g1", "h3g2", "f1e1", "a6e2", "e1e2", "e8c8"];
    let mut undos = Vec::new();
    for text in line {
        let mv = pos
            .parse_move(text)
            .unwrap_or_else(|| panic!("move {text} should be legal"));
        undos.push((mv, pos.make_move(mv)));
        pos.assert_consistent();
    }
    while let Some((mv, info)) = undos.pop() {
        pos.unmake_move(mv, info);
    }
    assert_eq!(snapshot(&pos), before);
}
