pub mod city;
pub mod generation;
pub mod grid;

pub use city::*;
pub use grid::{HexGrid, distance};
