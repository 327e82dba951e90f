use smallvec::SmallVec;
use std::fmt::Display;

use crate::registers::RegisterNamespace;

/// Operand lists rarely exceed four entries.
pub type Operands = SmallVec<[String; 4]>;

/// An instruction form as listed by the instruction database: a mnemonic,
/// its operand templates in declaration order, and the register namespace
/// the instantiation should draw general registers from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionDescriptor {
    pub mnemonic: String,
    pub operands: Operands,
    pub encoding: RegisterNamespace,
}

impl InstructionDescriptor {
    pub fn new<M, I, S>(mnemonic: M, operands: I, encoding: RegisterNamespace) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mnemonic: mnemonic.into(),
            operands: operands.into_iter().map(Into::into).collect(),
            encoding,
        }
    }

    /// A form encodable without a REX prefix.
    pub fn legacy<M, I, S>(mnemonic: M, operands: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(mnemonic, operands, RegisterNamespace::Legacy)
    }

    /// A form that needs a REX prefix.
    pub fn extended<M, I, S>(mnemonic: M, operands: I) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(mnemonic, operands, RegisterNamespace::Extended)
    }

    pub fn is_legacy(&self) -> bool {
        self.encoding == RegisterNamespace::Legacy
    }

    pub fn operand(&self, index: usize) -> Option<&str> {
        self.operands.get(index).map(String::as_str)
    }
}

impl Display for InstructionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_instruction(f, &self.mnemonic, &self.operands)
    }
}

/// An instruction with every operand template replaced by an example value.
/// Omitted operands are dropped; the rest keep their relative order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstantiatedInstruction {
    pub mnemonic: String,
    pub operands: Operands,
}

impl InstantiatedInstruction {
    pub fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            operands: Operands::new(),
        }
    }

    pub fn push_operand(&mut self, operand: impl Into<String>) {
        self.operands.push(operand.into());
    }
}

/// Intel syntax, destination first: `ADD ecx, 0x7e`.
impl Display for InstantiatedInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_instruction(f, &self.mnemonic, &self.operands)
    }
}

fn write_instruction(
    f: &mut std::fmt::Formatter<'_>,
    mnemonic: &str,
    operands: &[String],
) -> std::fmt::Result {
    if operands.is_empty() {
        write!(f, "{mnemonic}")
    } else {
        write!(f, "{mnemonic} {}", operands.join(", "))
    }
}
