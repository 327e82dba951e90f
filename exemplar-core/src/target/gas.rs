use super::{BranchFiller, BranchWidth};

/// `.rept` block of `NOP`s, understood by GNU as and LLVM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gas {
    label: String,
}

impl Gas {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl BranchFiller for Gas {
    fn label_operand(&self, width: BranchWidth) -> String {
        format!(
            "{label}\n.rept {count}\nNOP\n.endr\n{label}: NOP",
            label = self.label,
            count = width.filler_len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rel16_label() {
        assert_eq!(
            Gas::new("Label").label_operand(BranchWidth::Rel16),
            "Label\n.rept 256\nNOP\n.endr\nLabel: NOP"
        );
    }
}
