use smallvec::SmallVec;
use tracing::{debug, error};

use crate::config::{EngineConfig, FallbackPolicy};
use crate::error::VocabularyViolation;
use crate::instructions::{InstantiatedInstruction, InstructionDescriptor};
use crate::operands::{is_identity_fallback, OperandTables, Resolution, IMPLICIT_XMM0};
use crate::registers::{RegisterFile, RegisterName, RegisterWidth};
use crate::target::BranchFiller;

/// `MOV r64, imm64` has to be spelled `MOVABS`, the generic `MOV` gives the
/// assembler no way to ask for a 64-bit immediate.
pub const MOVABS: &str = "MOVABS";

/// A resolved operand. Generated registers are relocatable: they may be
/// swapped for a spare when another operand already uses the register.
/// Fixed registers and everything else are written as resolved.
struct Resolved {
    text: String,
    relocatable: bool,
}

/// Turns instruction descriptors into instantiated instructions.
///
/// Holds no per-call state: one instantiator can serve any number of threads
/// at once.
pub struct Instantiator<'a> {
    tables: &'a OperandTables,
    filler: Box<dyn BranchFiller>,
    fallback: FallbackPolicy,
}

impl<'a> Instantiator<'a> {
    pub fn new(tables: &'a OperandTables, config: &EngineConfig) -> Self {
        Self {
            tables,
            filler: config.dialect.filler(&config.label),
            fallback: config.fallback,
        }
    }

    /// Uses `filler` for relative branches instead of one of the built-in
    /// dialects.
    pub fn with_filler(
        tables: &'a OperandTables,
        filler: Box<dyn BranchFiller>,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            tables,
            filler,
            fallback,
        }
    }

    pub fn tables(&self) -> &'a OperandTables {
        self.tables
    }

    pub fn instantiate(
        &self,
        instruction: &InstructionDescriptor,
    ) -> Result<InstantiatedInstruction, VocabularyViolation> {
        let mut result = InstantiatedInstruction::new(emitted_mnemonic(instruction));
        let width = RegisterWidth::infer(instruction.operands.as_slice());
        let mut registers = RegisterFile::new(instruction.encoding);
        let mut resolved = SmallVec::<[(&str, Resolved); 4]>::new();

        for template in instruction.operands.iter() {
            match self.resolve(instruction, template, width)? {
                Some(operand) => {
                    // Fixed operands are claimed first so generated registers
                    // can move out of their way.
                    if !operand.relocatable {
                        registers.reserve(&operand.text);
                    }
                    resolved.push((template.as_str(), operand));
                }
                None if template == IMPLICIT_XMM0 => {}
                None => {
                    return Err(self.violation(VocabularyViolation::UnexpectedAbsence {
                        mnemonic: instruction.mnemonic.clone(),
                        template: template.clone(),
                    }));
                }
            }
        }

        for (template, operand) in resolved {
            if !operand.relocatable {
                result.push_operand(operand.text);
                continue;
            }
            match registers.allocate(&operand.text) {
                Some(register) => result.push_operand(register),
                None => {
                    return Err(self.violation(VocabularyViolation::RegistersExhausted {
                        mnemonic: instruction.mnemonic.clone(),
                        template: template.to_string(),
                    }));
                }
            }
        }

        debug!(instruction = %instruction, instantiated = %result, "instantiated operands");
        Ok(result)
    }

    /// Instantiates a batch, stopping at the first violation. Nothing is
    /// returned for the instructions that did succeed.
    pub fn instantiate_all<'d, I>(
        &self,
        instructions: I,
    ) -> Result<Vec<InstantiatedInstruction>, VocabularyViolation>
    where
        I: IntoIterator<Item = &'d InstructionDescriptor>,
    {
        instructions
            .into_iter()
            .map(|instruction| self.instantiate(instruction))
            .collect()
    }

    /// Table, then register roles, then the fallback policy. `None` means
    /// the operand is omitted.
    fn resolve(
        &self,
        instruction: &InstructionDescriptor,
        template: &str,
        width: RegisterWidth,
    ) -> Result<Option<Resolved>, VocabularyViolation> {
        let mut resolution = self.tables.translate(template, self.filler.as_ref());
        if resolution.is_unhandled() {
            resolution = instruction.encoding.resolve(template, width);
        }

        let operand = match resolution {
            Resolution::Operand(text) => Resolved {
                relocatable: RegisterName::parse(&text).is_some(),
                text,
            },
            Resolution::Absent => return Ok(None),
            Resolution::Unhandled => Resolved {
                text: self.fall_back(instruction, template)?,
                relocatable: false,
            },
        };

        Ok((!operand.text.is_empty()).then_some(operand))
    }

    fn fall_back(
        &self,
        instruction: &InstructionDescriptor,
        template: &str,
    ) -> Result<String, VocabularyViolation> {
        match self.fallback {
            FallbackPolicy::Passthrough => Ok(template.to_string()),
            FallbackPolicy::Strict if is_identity_fallback(template) => Ok(template.to_string()),
            FallbackPolicy::Strict => Err(self.violation(VocabularyViolation::UnknownTemplate {
                mnemonic: instruction.mnemonic.clone(),
                template: template.to_string(),
            })),
        }
    }

    fn violation(&self, violation: VocabularyViolation) -> VocabularyViolation {
        error!(
            mnemonic = violation.mnemonic(),
            template = violation.template(),
            "{violation}"
        );
        violation
    }
}

fn emitted_mnemonic(instruction: &InstructionDescriptor) -> &str {
    if instruction.mnemonic == "MOV" && instruction.operand(1) == Some("imm64") {
        debug!(instruction = %instruction, "rewriting to {MOVABS}");
        MOVABS
    } else {
        &instruction.mnemonic
    }
}
