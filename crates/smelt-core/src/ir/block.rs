use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::inst::InstId;

define_entity!(BlockId);

/// A basic block: an ordered sequence of instruction handles.
///
/// Phi instructions, when present, occupy the front of the sequence so
/// they are visited before ordinary instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    pub insts: Vec<InstId>,
}
