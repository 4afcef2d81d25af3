//! NNUE (Efficiently Updatable Neural Network) evaluation.
//!
//! Provides neural network based position evaluation with incremental
//! accumulator updates. The accumulator lives in the `Position` and is
//! snapshotted per ply; the network itself is stateless and shared
//! read-only between search workers.

pub mod network;

pub use network::{NnueAccumulator, NnueNetwork, HIDDEN_SIZE};
