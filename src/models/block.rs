//! Block identifiers, variable types and token occurrence records

use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::columns;

/// Opaque identifier of a basic block, unique within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Create a new block id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which part of an instruction a token was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariableType {
    /// Instruction mnemonic
    Instruction,
    /// First (destination) operand
    LeftOperand,
    /// Second (source) operand
    RightOperand,
}

impl VariableType {
    /// Every variable type, in table order
    pub const ALL: [VariableType; 3] = [
        VariableType::Instruction,
        VariableType::LeftOperand,
        VariableType::RightOperand,
    ];

    /// Label used in the tabular contracts
    pub fn label(&self) -> &'static str {
        match self {
            VariableType::Instruction => columns::INSTRUCTION,
            VariableType::LeftOperand => columns::LEFT_OPERAND,
            VariableType::RightOperand => columns::RIGHT_OPERAND,
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VariableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Left Operand", "LeftOperand" and "left_operand" all name the same type
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "instruction" => Ok(VariableType::Instruction),
            "leftoperand" => Ok(VariableType::LeftOperand),
            "rightoperand" => Ok(VariableType::RightOperand),
            _ => Err(format!("unknown variable type '{}'", s.trim())),
        }
    }
}

/// One observed occurrence of a token in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Block the token was observed in
    pub block_id: BlockId,
    /// Part of the instruction the token came from
    pub var_type: VariableType,
    /// Mnemonic or operand text
    pub token: String,
}

impl TokenRecord {
    /// Create a new record
    pub fn new(block_id: impl Into<BlockId>, var_type: VariableType, token: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            var_type,
            token: token.into(),
        }
    }
}
