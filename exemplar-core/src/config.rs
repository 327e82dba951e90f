use crate::target::AssemblerDialect;

/// What to do with a template that neither table knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FallbackPolicy {
    /// Write it verbatim only if it is an explicitly named register or a
    /// numeric constant; anything else is a vocabulary violation.
    #[default]
    Strict,
    /// Write it verbatim.
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineConfig {
    pub dialect: AssemblerDialect,
    pub fallback: FallbackPolicy,
    /// Name of the label relative branches jump to.
    pub label: String,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: AssemblerDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: AssemblerDialect::Gas,
            fallback: FallbackPolicy::Strict,
            label: "Label".to_string(),
        }
    }
}
