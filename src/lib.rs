//! One-dimensional cutting-stock optimization for rolls of strip material,
//! plus power-supply sizing for the resulting pieces.

pub mod patterns;
pub mod power;
pub mod render;
pub mod solver;
pub mod types;
