use std::fmt::Display;

pub mod gas;
pub mod nasm;

/// Displacement width of a relative branch placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchWidth {
    Rel8,
    Rel16,
    Rel32,
}

impl BranchWidth {
    pub fn template(self) -> &'static str {
        match self {
            BranchWidth::Rel8 => "rel8",
            BranchWidth::Rel16 => "rel16",
            BranchWidth::Rel32 => "rel32",
        }
    }

    pub fn displacement_bits(self) -> u32 {
        match self {
            BranchWidth::Rel8 => 8,
            BranchWidth::Rel16 => 16,
            BranchWidth::Rel32 => 32,
        }
    }

    /// Number of one-byte filler instructions between the branch and its
    /// target. Above `rel8` the count overflows the next smaller
    /// displacement, so the assembler cannot relax the branch to a shorter
    /// encoding.
    pub fn filler_len(self) -> usize {
        match self {
            BranchWidth::Rel8 => 64,
            BranchWidth::Rel16 => 0x100,
            BranchWidth::Rel32 => 0x10000,
        }
    }
}

impl Display for BranchWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.template())
    }
}

/// Expands a relative branch placeholder into the label operand plus the
/// filler that keeps the label out of reach of shorter encodings.
///
/// The result is spliced into the assembler source verbatim, so it usually
/// spans several lines: the label, the filler, then the label definition.
pub trait BranchFiller: Send + Sync {
    fn label_operand(&self, width: BranchWidth) -> String;
}

/// The assembler the generated source is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum AssemblerDialect {
    /// GNU as and the LLVM integrated assembler in Intel syntax mode.
    #[default]
    Gas,
    Nasm,
}

impl AssemblerDialect {
    pub fn filler(self, label: &str) -> Box<dyn BranchFiller> {
        match self {
            AssemblerDialect::Gas => Box::new(gas::Gas::new(label)),
            AssemblerDialect::Nasm => Box::new(nasm::Nasm::new(label)),
        }
    }
}
