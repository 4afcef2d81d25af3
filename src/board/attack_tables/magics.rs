//! Magic bitboard construction.
//!
//! Per-square magic multipliers are searched once at startup with a seeded
//! RNG, so the tables are deterministic across runs. A sparse random
//! candidate is accepted when it maps every relevant occupancy subset to a
//! distinct index (constructive collisions, where two subsets share an
//! attack set, are allowed).

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

const MAGIC_SEED: u64 = 0x5ca1_ab1e_0b5e_55ed;

/// Magic lookup data for one square
#[derive(Clone, Copy, Default)]
pub(crate) struct Magic {
    pub mask: u64,
    pub magic: u64,
    pub shift: u32,
    pub offset: usize,
}

impl Magic {
    #[inline]
    pub(crate) fn index(&self, occupancy: u64) -> usize {
        self.offset + (((occupancy & self.mask).wrapping_mul(self.magic)) >> self.shift) as usize
    }
}

/// Both slider tables plus the shared attack array they index into
pub(crate) struct MagicTables {
    pub bishop: [Magic; 64],
    pub rook: [Magic; 64],
    pub attacks: Vec<u64>,
}

/// Slider attacks by ray scan, the reference the magic tables are built
/// from (and validated against in tests).
pub(crate) fn slider_attacks_slow(sq: usize, occupancy: u64, bishop: bool) -> u64 {
    const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
    const ROOK_DIRS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    let dirs = if bishop { BISHOP_DIRS } else { ROOK_DIRS };
    let mut attacks = 0u64;
    for (dr, df) in dirs {
        let mut r = (sq / 8) as i32 + dr;
        let mut f = (sq % 8) as i32 + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let bit = 1u64 << (r * 8 + f);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

/// Relevant occupancy mask: the attack rays on an empty board with the
/// board edge trimmed off (an edge blocker never changes the attack set).
fn relevant_mask(sq: usize, bishop: bool) -> u64 {
    let rank = sq / 8;
    let file = sq % 8;
    let mut edges = 0u64;
    if rank != 0 {
        edges |= 0xFF;
    }
    if rank != 7 {
        edges |= 0xFF << 56;
    }
    if file != 0 {
        edges |= 0x0101_0101_0101_0101;
    }
    if file != 7 {
        edges |= 0x8080_8080_8080_8080;
    }
    slider_attacks_slow(sq, 0, bishop) & !edges
}

/// Enumerate every subset of `mask` (carry-rippler)
fn subsets(mask: u64) -> Vec<u64> {
    let mut result = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;
    loop {
        result.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    result
}

fn sparse_random(rng: &mut StdRng) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// Find a magic for one square and fill its slice of the attack table
fn find_magic(
    sq: usize,
    bishop: bool,
    attacks: &mut Vec<u64>,
    rng: &mut StdRng,
) -> Magic {
    let mask = relevant_mask(sq, bishop);
    let bits = mask.count_ones();
    let shift = 64 - bits;
    let size = 1usize << bits;
    let offset = attacks.len();

    let occupancies = subsets(mask);
    let references: Vec<u64> = occupancies
        .iter()
        .map(|&occ| slider_attacks_slow(sq, occ, bishop))
        .collect();

    let mut table = vec![0u64; size];
    loop {
        let magic = sparse_random(rng);
        // Reject candidates that don't mix the mask's high bits
        if (mask.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }

        table.iter_mut().for_each(|slot| *slot = 0);
        let mut ok = true;
        for (&occ, &reference) in occupancies.iter().zip(&references) {
            let idx = (occ.wrapping_mul(magic) >> shift) as usize;
            if table[idx] == 0 {
                table[idx] = reference;
            } else if table[idx] != reference {
                ok = false;
                break;
            }
        }

        if ok {
            attacks.extend_from_slice(&table);
            return Magic {
                mask,
                magic,
                shift,
                offset,
            };
        }
    }
}

impl MagicTables {
    pub(crate) fn build() -> Self {
        let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
        // 5248 bishop + 102400 rook entries for plain (non-overlapping) magics
        let mut attacks = Vec::with_capacity(107_648);
        let mut bishop = [Magic::default(); 64];
        let mut rook = [Magic::default(); 64];

        for sq in 0..64 {
            bishop[sq] = find_magic(sq, true, &mut attacks, &mut rng);
        }
        for sq in 0..64 {
            rook[sq] = find_magic(sq, false, &mut attacks, &mut rng);
        }

        MagicTables {
            bishop,
            rook,
            attacks,
        }
    }
}
