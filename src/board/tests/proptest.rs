//! Property tests: random legal move sequences preserve every invariant.

use proptest::prelude::*;

use crate::board::movegen::GenMode;
use crate::board::types::MoveList;
use crate::board::Position;

const START_FENS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];

/// Play `picks.len()` pseudo-random legal moves, then unmake them all.
fn play_and_unwind(fen: &str, picks: &[usize]) {
    let mut pos = Position::from_fen(fen).unwrap();
    let original = pos.to_fen();
    let original_key = pos.key();

    let mut undo = Vec::new();
    for &pick in picks {
        let mut list = MoveList::new();
        pos.generate_moves(&mut list, GenMode::All);
        if list.is_empty() {
            break;
        }
        let mv = list.as_slice()[pick % list.len()];
        undo.push((mv, pos.make_move(mv)));

        pos.assert_consistent();
        assert_eq!(pos.key(), pos.key_from_scratch());
    }

    while let Some((mv, info)) = undo.pop() {
        pos.unmake_move(mv, info);
        pos.assert_consistent();
    }

    assert_eq!(pos.to_fen(), original);
    assert_eq!(pos.key(), original_key);
    assert!(pos.played_positions.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_lines_round_trip(
        fen_idx in 0..START_FENS.len(),
        picks in prop::collection::vec(0usize..4096, 0..40),
    ) {
        play_and_unwind(START_FENS[fen_idx], &picks);
    }

    #[test]
    fn generated_moves_never_leave_king_in_check(
        fen_idx in 0..START_FENS.len(),
        picks in prop::collection::vec(0usize..4096, 0..24),
    ) {
        let mut pos = Position::from_fen(START_FENS[fen_idx]).unwrap();
        for &pick in &picks {
            let mut list = MoveList::new();
            pos.generate_moves(&mut list, GenMode::All);
            if list.is_empty() {
                break;
            }

            // Every generated move is legal; every generated move passes
            // the standalone legality check
            for &mv in list.as_slice() {
                prop_assert!(pos.is_legal(mv));
            }

            let mover = pos.side_to_move();
            let mv = list.as_slice()[pick % list.len()];
            pos.make_move(mv);
            prop_assert!(
                !pos.is_square_attacked(pos.king_sq(mover), pos.side_to_move())
            );
        }
    }
}
