//! Lattice segmentation decoding.

mod lattice;

pub use lattice::{LatticeSegmentation, SEGMENTATION_BLOCK};
