use lazy_regex::regex_is_match;
use std::collections::HashMap;
use tracing::{trace, warn};

use crate::registers::is_fixed_register;
use crate::target::{BranchFiller, BranchWidth};

/// The implicit first vector register of SSE4.1 blends. It is fixed by the
/// encoding and never written out.
pub const IMPLICIT_XMM0: &str = "<XMM0>";

// Indirect addressing through a register. With a bare displacement the
// assembler may pick between a ModR/M and an immediate encoding, and it
// usually picks the wrong one.
macro_rules! memory {
    ($size:literal) => {
        concat!($size, " ptr[RSI]")
    };
}

macro_rules! offset_memory {
    ($size:literal) => {
        concat!($size, " ptr DS:[RSI]")
    };
}

/// What a template in the translation table expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Example {
    Literal(&'static str),
    Branch(BranchWidth),
    /// The operand is implied by the encoding and omitted from the syntax.
    Absent,
}

/// Outcome of looking a template up in one of the tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Operand(String),
    Absent,
    /// The table has no rule for the template; the next stage decides.
    Unhandled,
}

impl Resolution {
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Resolution::Unhandled)
    }
}

use Example::*;

/// Definitions are applied in order, so a key listed twice keeps its last
/// value. Vector templates each get a different register so that forms with
/// several vector operands never alias.
pub static DEFINITIONS: &[(&str, Example)] = &[
    ("CR0-CR7", Literal("CR0")),
    ("DR0-DR7", Literal("DR0")),
    (IMPLICIT_XMM0, Absent),
    ("ST(i)", Literal("ST(2)")),
    ("bnd", Literal("bnd2")),
    ("imm8", Literal("0x7e")),
    ("imm16", Literal("0x7ffe")),
    ("imm32", Literal("0x7ffffffe")),
    ("imm64", Literal("0x400000000002d06d")),
    ("rel8", Branch(BranchWidth::Rel8)),
    ("rel16", Branch(BranchWidth::Rel16)),
    ("rel32", Branch(BranchWidth::Rel32)),
    ("m8", Literal(memory!("byte"))),
    ("mib", Literal(memory!("qword"))),
    ("moffs8", Literal(offset_memory!("byte"))),
    ("m", Literal(memory!("word"))),
    ("m16", Literal(memory!("word"))),
    ("m16&16", Literal(memory!("word"))),
    ("m16&64", Literal(memory!("qword"))),
    ("m16int", Literal(memory!("word"))),
    ("moffs16", Literal(offset_memory!("word"))),
    ("m2byte", Literal(memory!("word"))),
    // LLVM spells the FPU environment operands as dword.
    ("m14byte", Literal(memory!("dword"))),
    ("m28byte", Literal(memory!("dword"))),
    ("m32", Literal(memory!("dword"))),
    ("m32&32", Literal(memory!("dword"))),
    ("moffs32", Literal(offset_memory!("dword"))),
    ("m32fp", Literal(memory!("dword"))),
    ("m32int", Literal(memory!("dword"))),
    ("m64", Literal(memory!("qword"))),
    ("moffs64", Literal(offset_memory!("qword"))),
    ("mem", Literal(memory!("xmmword"))),
    ("m64fp", Literal(memory!("qword"))),
    ("m64int", Literal(memory!("dword"))),
    ("m80dec", Literal(memory!("xword"))),
    ("m80bcd", Literal(memory!("xword"))),
    ("m80fp", Literal(memory!("xword"))),
    ("m128", Literal(memory!("xmmword"))),
    ("m256", Literal(memory!("ymmword"))),
    ("m512", Literal(memory!("ymmword"))),
    ("m94byte", Literal(memory!("dword"))),
    ("m108byte", Literal(memory!("dword"))),
    ("m512byte", Literal(memory!("opaque"))),
    ("ptr16:16", Literal("0x7f16:0x7f16")),
    ("ptr16:32", Literal("0x3039:0x30393039")),
    ("m16:16", Literal(memory!("word"))),
    ("m16:32", Literal(memory!("dword"))),
    ("m16:64", Literal(memory!("qword"))),
    ("xmm", Literal("xmm5")),
    ("ymm", Literal("ymm7")),
    ("mm", Literal("mm6")),
    ("Sreg", Literal("cs")),
    // Second definition of the x87 slot; it wins and is reported as a
    // duplicate when the table is built.
    ("ST(i)", Literal("ST(3)")),
    ("vm32x", Literal("[rsp + 4* xmm9]")),
    ("vm32y", Literal("[rsp + 4* ymm10]")),
    ("vm64x", Literal("[rsp + 8* xmm11]")),
    ("vm64y", Literal("[rsp + 8* ymm12]")),
];

/// A key that was defined more than once with different values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub template: &'static str,
    pub discarded: Example,
    pub kept: Example,
}

/// The direct template translation table.
///
/// Built once and then only read, so one instance can be shared by any
/// number of threads.
#[derive(Debug, Clone)]
pub struct OperandTables {
    examples: HashMap<&'static str, Example>,
    duplicates: Vec<DuplicateKey>,
}

impl OperandTables {
    pub fn new() -> Self {
        Self::from_definitions(DEFINITIONS)
    }

    pub fn from_definitions(definitions: &[(&'static str, Example)]) -> Self {
        let mut examples = HashMap::with_capacity(definitions.len());
        let mut duplicates = Vec::new();

        for &(template, example) in definitions {
            match examples.insert(template, example) {
                Some(discarded) if discarded != example => {
                    warn!(
                        template,
                        ?discarded,
                        kept = ?example,
                        "operand template defined twice, keeping the last definition"
                    );
                    duplicates.push(DuplicateKey {
                        template,
                        discarded,
                        kept: example,
                    });
                }
                _ => {}
            }
        }

        trace!(templates = examples.len(), "built operand translation table");

        Self {
            examples,
            duplicates,
        }
    }

    pub fn example(&self, template: &str) -> Option<Example> {
        self.examples.get(template).copied()
    }

    /// Returns the example for `template`, or [`Resolution::Unhandled`] when
    /// the table does not know it.
    pub fn translate(&self, template: &str, filler: &dyn BranchFiller) -> Resolution {
        match self.example(template) {
            Some(Literal(value)) => Resolution::Operand(value.to_string()),
            Some(Branch(width)) => Resolution::Operand(filler.label_operand(width)),
            Some(Absent) => Resolution::Absent,
            None => Resolution::Unhandled,
        }
    }

    pub fn duplicate_keys(&self) -> &[DuplicateKey] {
        &self.duplicates
    }

    pub fn templates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.examples.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

impl Default for OperandTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Templates that are already valid assembler operands: explicitly named
/// registers (`AL`, `RAX`, `ST(0)`, ...) and small constants such as the `1`
/// of the shift-by-one forms.
pub fn is_identity_fallback(template: &str) -> bool {
    is_fixed_register(template)
        || regex_is_match!(r"^ST(\(0\))?$", template)
        || regex_is_match!(r"^[0-9]+$", template)
}
