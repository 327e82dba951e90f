use thiserror::Error;

/// An operand template the engine has no rule for.
///
/// The template vocabulary is fixed when the instruction database is built,
/// so a violation always means the database and the engine disagree. It is
/// never recoverable: callers stop the whole batch instead of retrying or
/// skipping the instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyViolation {
    /// The template resolved to an omitted operand, which only the implicit
    /// `<XMM0>` marker may do.
    #[error("operand `{template}` of `{mnemonic}` could not be translated")]
    UnexpectedAbsence { mnemonic: String, template: String },

    /// The template is unknown to both tables and is not a register or
    /// constant that can be written verbatim.
    #[error("operand `{template}` of `{mnemonic}` is not a known operand template")]
    UnknownTemplate { mnemonic: String, template: String },

    /// Every register that could stand in for the template is already used
    /// by another operand of the same form.
    #[error("no free register left for operand `{template}` of `{mnemonic}`")]
    RegistersExhausted { mnemonic: String, template: String },
}

impl VocabularyViolation {
    pub fn mnemonic(&self) -> &str {
        match self {
            VocabularyViolation::UnexpectedAbsence { mnemonic, .. }
            | VocabularyViolation::UnknownTemplate { mnemonic, .. }
            | VocabularyViolation::RegistersExhausted { mnemonic, .. } => mnemonic,
        }
    }

    pub fn template(&self) -> &str {
        match self {
            VocabularyViolation::UnexpectedAbsence { template, .. }
            | VocabularyViolation::UnknownTemplate { template, .. }
            | VocabularyViolation::RegistersExhausted { template, .. } => template,
        }
    }
}
