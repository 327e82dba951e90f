use std::sync::LazyLock;

pub use exemplar_core::*;

static DEFAULT_TABLES: LazyLock<OperandTables> = LazyLock::new(OperandTables::new);

static DEFAULT_ENGINE: LazyLock<Instantiator<'static>> = LazyLock::new(|| {
    tracing::debug!("building the default operand instantiator");
    Instantiator::new(&DEFAULT_TABLES, &EngineConfig::default())
});

/// The translation table shared by [`instantiate`], built on first use.
pub fn default_tables() -> &'static OperandTables {
    &DEFAULT_TABLES
}

/// The process-wide instantiator: GNU as branch filler, strict fallback.
pub fn default_instantiator() -> &'static Instantiator<'static> {
    &DEFAULT_ENGINE
}

/// Instantiates `instruction` with the default configuration.
pub fn instantiate(
    instruction: &InstructionDescriptor,
) -> Result<InstantiatedInstruction, VocabularyViolation> {
    DEFAULT_ENGINE.instantiate(instruction)
}

/// Builds an [`InstructionDescriptor`].
///
/// ```
/// use exemplar::descriptor;
///
/// let add = descriptor!("ADD", "r32", "imm8");
/// assert!(add.is_legacy());
///
/// let rex = descriptor!(rex "MOV", "r64", "imm64");
/// assert!(!rex.is_legacy());
/// ```
#[macro_export]
macro_rules! descriptor {
    (rex $mnemonic: literal $(, $operand: literal)* $(,)?) => {{
        let operands: &[&str] = &[$($operand),*];
        $crate::InstructionDescriptor::extended($mnemonic, operands.iter().copied())
    }};
    ($mnemonic: literal $(, $operand: literal)* $(,)?) => {{
        let operands: &[&str] = &[$($operand),*];
        $crate::InstructionDescriptor::legacy($mnemonic, operands.iter().copied())
    }};
}
