use super::{BranchFiller, BranchWidth};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nasm {
    label: String,
}

impl Nasm {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl BranchFiller for Nasm {
    fn label_operand(&self, width: BranchWidth) -> String {
        format!(
            "{label}\ntimes {count} nop\n{label}: nop",
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
    fn rel32_label() {
        assert_eq!(
            Nasm::new("target").label_operand(BranchWidth::Rel32),
            "target\ntimes 65536 nop\ntarget: nop"
        );
    }
}
