//! Property-based tests for the instantiation invariants.

use exemplar::{instantiate, InstructionDescriptor, RegisterName, RegisterNamespace};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

/// Templates every engine configuration can instantiate.
fn known_template() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "imm8", "imm16", "imm32", "imm64", "rel8", "rel16", "m8", "m16", "m32", "m64", "m128",
        "m256", "moffs32", "mem", "m80fp", "ptr16:32", "m16:32", "xmm", "ymm", "mm", "Sreg",
        "ST(i)", "vm32x", "vm64y", "CR0-CR7", "DR0-DR7", "bnd", "<XMM0>", "r8", "r16", "r32",
        "r32a", "r32b", "r64", "r64a", "r64b", "reg", "AL", "EAX", "CL", "1",
    ])
}

fn namespace() -> impl Strategy<Value = RegisterNamespace> {
    prop_oneof![Just(RegisterNamespace::Legacy), Just(RegisterNamespace::Extended)]
}

fn mnemonic() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["ADD", "MOV", "VPGATHERDD", "BLENDVPD", "JMP", "FADD"])
}

fn descriptor() -> impl Strategy<Value = InstructionDescriptor> {
    (mnemonic(), prop::collection::vec(known_template(), 0..5), namespace())
        .prop_map(|(mnemonic, operands, ns)| InstructionDescriptor::new(mnemonic, operands, ns))
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn only_the_implicit_marker_is_dropped(instruction in descriptor()) {
        let result = instantiate(&instruction).unwrap();
        let markers = instruction.operands.iter().filter(|t| *t == "<XMM0>").count();

        prop_assert_eq!(result.operands.len(), instruction.operands.len() - markers);
        prop_assert!(result.operands.iter().all(|op| !op.is_empty()));
    }

    #[test]
    fn instantiation_is_deterministic(instruction in descriptor()) {
        prop_assert_eq!(instantiate(&instruction).unwrap(), instantiate(&instruction).unwrap());
    }

    #[test]
    fn imm8_is_always_the_same(instruction in descriptor()) {
        let mut operands = instruction.operands.clone();
        operands.push("imm8".to_string());
        let with_imm8 = InstructionDescriptor { operands, ..instruction };

        let result = instantiate(&with_imm8).unwrap();
        prop_assert_eq!(result.operands.last().map(String::as_str), Some("0x7e"));
    }

    #[test]
    fn general_register_roles_never_alias(
        ns in namespace(),
        (first, second) in prop_oneof![
            Just(("r32a", "r32b")),
            Just(("r64a", "r64b")),
            Just(("r32", "r32a")),
            Just(("r64", "r64b")),
            Just(("reg", "r32")),
            Just(("reg", "r64a")),
            Just(("r32", "r8")),
            Just(("r64", "r16")),
            Just(("r64", "r32")),
            Just(("r32", "r16")),
            Just(("r16", "r8")),
            Just(("xmm", "xmm")),
            Just(("ymm", "xmm")),
            Just(("mm", "mm")),
        ],
    ) {
        let instruction = InstructionDescriptor::new("XCHG", [first, second], ns);
        let result = instantiate(&instruction).unwrap();

        let first = RegisterName::parse(&result.operands[0]).unwrap();
        let second = RegisterName::parse(&result.operands[1]).unwrap();
        prop_assert_ne!(first.physical(), second.physical());
    }

    #[test]
    fn register_operands_never_alias(instruction in descriptor()) {
        // Fixed registers are written by the form itself and may repeat.
        let fixed = instruction
            .operands
            .iter()
            .filter(|t| ["AL", "EAX", "CL"].contains(&t.as_str()))
            .count();
        prop_assume!(fixed <= 1);

        let result = instantiate(&instruction).unwrap();
        let physical: Vec<_> = result
            .operands
            .iter()
            .filter_map(|operand| RegisterName::parse(operand))
            .map(|name| name.physical())
            .collect();

        for (i, register) in physical.iter().enumerate() {
            prop_assert!(!physical[i + 1..].contains(register), "{}", result);
        }
    }

    #[test]
    fn r32_depends_on_namespace(mnemonic in mnemonic()) {
        let legacy = instantiate(&InstructionDescriptor::legacy(mnemonic, ["r32"])).unwrap();
        let rex = instantiate(&InstructionDescriptor::extended(mnemonic, ["r32"])).unwrap();

        prop_assert_eq!(legacy.operands[0].as_str(), "ecx");
        prop_assert_eq!(rex.operands[0].as_str(), "r10d");
    }

    #[test]
    fn unknown_templates_are_rejected(name in "zz[a-z]{0,4}[0-9]{1,3}") {
        let instruction = InstructionDescriptor::legacy("ADD", ["r32", name.as_str()]);

        prop_assert!(instantiate(&instruction).is_err());
    }
}
