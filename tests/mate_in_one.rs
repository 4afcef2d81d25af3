//! Mate detection through the public search API.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;

use basalt::board::nnue::NnueNetwork;
use basalt::board::search::{search_position, IterationReport, SearchSettings, ThreadData};
use basalt::board::Position;
use basalt::engine::time::TimeManager;
use basalt::tt::{TranspositionTable, MATE_SCORE};

fn best_move_and_score(fen: &str, depth: i32) -> (String, i32) {
    basalt::init();

    let pos = Position::from_fen(fen).expect("valid FEN");
    let mut tds = vec![ThreadData::new(0)];
    let tt = Arc::new(TranspositionTable::new(16));
    let net = Arc::new(NnueNetwork::zeroed());
    let stop = Arc::new(AtomicBool::new(false));
    let time = Arc::new(TimeManager::infinite());
    let settings = SearchSettings { depth, multipv: 1 };

    let reports: Mutex<Vec<IterationReport>> = Mutex::new(Vec::new());
    let collect = |report: IterationReport| reports.lock().push(report);

    let outcome = search_position(
        &mut tds,
        &pos,
        &tt,
        &net,
        &stop,
        time,
        &settings,
        Some(&collect),
    );

    let score = reports.lock().last().expect("iterations ran").score;
    (outcome.best_move.to_string(), score)
}

#[test]
fn test_back_rank_mate_in_one() {
    let (best, score) = best_move_and_score("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 6);
    assert_eq!(best, "a1a8");
    assert_eq!(score, MATE_SCORE - 1);
}

#[test]
fn test_queen_mate_in_one() {
    // Qh5xf7 is mate (scholar's mate pattern)
    let (best, score) = best_move_and_score(
        "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 0 1",
        6,
    );
    assert_eq!(best, "h5f7");
    assert_eq!(score, MATE_SCORE - 1);
}
