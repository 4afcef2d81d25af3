//! Search constants and precomputed parameter tables.

use once_cell::sync::Lazy;

pub use crate::tt::{MATE_FOUND, MATE_SCORE, MAX_SCORE, SCORE_NONE};

/// Aspiration windows start only once the previous score is reliable
pub const ASPIRATION_MIN_DEPTH: i32 = 3;
/// Initial half-width of the aspiration window
pub const ASPIRATION_DELTA: i32 = 12;

/// Reverse futility applies below this depth
pub const RFP_MAX_DEPTH: i32 = 10;
pub const RFP_DEPTH_MARGIN: i32 = 91;
pub const RFP_IMPROVING_MARGIN: i32 = 58;
pub const RFP_IIR_MARGIN: i32 = 19;

pub const NMP_MIN_DEPTH: i32 = 3;
pub const NMP_EVAL_DIVISOR: i32 = 200;
/// Below this eval deficit against beta the static guard blocks NMP
pub const NMP_STATIC_COEFF: i32 = 30;
pub const NMP_STATIC_BASE: i32 = 170;
/// Depth from which a passing null-move search gets verified
pub const NMP_VERIFICATION_DEPTH: i32 = 15;

pub const RAZORING_MAX_DEPTH: i32 = 5;
pub const RAZORING_COEFF: i32 = 256;

pub const PROBCUT_MIN_DEPTH: i32 = 4;
pub const PROBCUT_MARGIN: i32 = 300;
pub const PROBCUT_IMPROVING_MARGIN: i32 = 50;
/// Probcut re-searches at `depth - PROBCUT_DEPTH_REDUCTION - 1`
pub const PROBCUT_DEPTH_REDUCTION: i32 = 3;

/// Internal iterative reductions kick in at this depth without a TT bound
pub const IIR_MIN_DEPTH: i32 = 4;

pub const SE_MIN_DEPTH: i32 = 6;
/// TT depth must be within this of the node depth to try singularity
pub const SE_TT_DEPTH_MARGIN: i32 = 3;
pub const SE_DOUBLE_MARGIN: i32 = 10;
pub const SE_TRIPLE_MARGIN: i32 = 75;

/// Futility pruning of quiets applies below this reduced depth
pub const FUTILITY_MAX_DEPTH: i32 = 11;
pub const FUTILITY_BASE: i32 = 250;
pub const FUTILITY_SCALE: i32 = 150;

/// SEE pruning thresholds, scaled by (squared) reduced depth
pub const SEE_QUIET_MARGIN: i32 = -80;
pub const SEE_NOISY_MARGIN: i32 = -30;

/// History-to-reduction conversion divisors
pub const HISTORY_LMR_DIVISOR_QUIET: i32 = 8192;
pub const HISTORY_LMR_DIVISOR_NOISY: i32 = 6144;
pub const LMR_DEPTH_HISTORY_DIVISOR: i32 = 8192;

/// Margin for deepening a reduced search that beat expectations
pub const DO_DEEPER_BASE_MARGIN: i32 = 53;

/// Quiescence futility base added to the static eval
pub const QS_FUTILITY_MARGIN: i32 = 192;

/// SEE threshold separating good from bad tacticals in the move picker
pub const PICKER_SEE_THRESHOLD: i32 = -107;

/// Base reduction table, indexed `[is_quiet][depth][move_number]`
pub static REDUCTIONS: Lazy<Box<[[[i32; 64]; 64]; 2]>> = Lazy::new(|| {
    let mut table = Box::new([[[0i32; 64]; 64]; 2]);
    for depth in 1..64 {
        for moves in 1..64 {
            let product = (depth as f64).ln() * (moves as f64).ln();
            table[0][depth][moves] = (-0.25 + product / 2.25) as i32;
            table[1][depth][moves] = (1.00 + product / 2.00) as i32;
        }
    }
    table
});

/// Move-count pruning margins, indexed `[depth][improving]`
pub static LMP_MARGIN: Lazy<Box<[[i32; 2]; 64]>> = Lazy::new(|| {
    let mut table = Box::new([[0i32; 2]; 64]);
    for (depth, row) in table.iter_mut().enumerate() {
        let d = depth as f64;
        row[0] = (1.5 + 0.5 * d * d) as i32;
        row[1] = (3.0 + d * d) as i32;
    }
    table
});
