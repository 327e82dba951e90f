pub mod config;
pub mod error;
pub mod instantiate;
pub mod instructions;
pub mod operands;
pub mod registers;
pub mod target;

pub use config::{EngineConfig, FallbackPolicy};
pub use error::VocabularyViolation;
pub use instantiate::Instantiator;
pub use instructions::{InstantiatedInstruction, InstructionDescriptor, Operands};
pub use operands::{OperandTables, Resolution};
pub use registers::{PhysicalRegister, RegisterFile, RegisterName, RegisterNamespace, RegisterWidth};
pub use target::{AssemblerDialect, BranchFiller, BranchWidth};

#[cfg(feature = "serde")]
pub use serde;
