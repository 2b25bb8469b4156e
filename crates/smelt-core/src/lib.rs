//! smelt-core — a small SSA optimizer.
//!
//! The IR is an arena of blocks and instructions with explicit phi
//! instructions at merge points. The main transform is [`transforms::Mem2Reg`],
//! which promotes stack slots to SSA values; [`transforms::DeadCodeElimination`]
//! cleans up afterwards.

pub mod analysis;
pub mod entity;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod transforms;
