use lazy_regex::regex_captures;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::trace;

use crate::operands::Resolution;

/// General-purpose register roles, per namespace.
///
/// `r32a`/`r32b` (and `r64a`/`r64b`) name the first and second register of
/// forms taking two independent general registers, so they must map to
/// different physical registers. `reg` is valid at 32 and 64 bits and takes a
/// register of its own. `clobbers` lists every register a namespace hands
/// out, roles and spares alike; spares are tried in that order when a role's
/// register is already taken by another operand of the same form.
#[macro_export]
macro_rules! register_namespaces {
    ($handler: ident) => {
        $handler! {
            LEGACY = [
                r8 => "ch",
                r16 => "cx",
                r32 => "ecx",
                r32a => "eax",
                r32b => "ebx",
                r64 => "rcx",
                r64a => "rax",
                r64b => "rbx",
            ], reg = ("edx", "rdx"), clobbers = ["rdi", "rbp", "rdx", "rbx", "rax", "rcx"];

            EXTENDED = [
                r8 => "r8b",
                r16 => "r10w",
                r32 => "r10d",
                r32a => "r8d",
                r32b => "r9d",
                r64 => "r10",
                r64a => "r8",
                r64b => "r9",
            ], reg = ("r11d", "r11"), clobbers = ["r12", "r13", "r14", "r15", "r8", "r9", "r10", "r11"];
        }
    };
}

macro_rules! define_namespaces {
    ($(
        $ns: ident = [$($role: ident => $name: literal),* $(,)?],
            reg = ($reg32: literal, $reg64: literal),
            clobbers = [$($clobber: literal),* $(,)?];
    )*) => {
        paste::paste! {
            $(
                pub static [<$ns _ROLES>]: &[(&str, &str)] = &[
                    $((stringify!($role), $name)),*
                ];

                pub static [<$ns _WIDE_ROLE>]: (&str, &str) = ($reg32, $reg64);

                pub static [<$ns _CLOBBERS>]: &[&str] = &[$($clobber),*];

                static [<$ns _TABLE>]: LazyLock<HashMap<&'static str, &'static str>> =
                    LazyLock::new(|| [<$ns _ROLES>].iter().copied().collect());
            )*
        }
    };
}

register_namespaces!(define_namespaces);

/// The role valid at both 32 and 64 bits.
pub const WIDE_ROLE: &str = "reg";

/// Which half of the general-purpose register file an instantiation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum RegisterNamespace {
    /// The eight registers reachable without a REX prefix.
    #[default]
    Legacy,
    /// `r8`..`r15`, which need a REX prefix.
    Extended,
}

impl RegisterNamespace {
    pub fn roles(self) -> &'static [(&'static str, &'static str)] {
        match self {
            RegisterNamespace::Legacy => LEGACY_ROLES,
            RegisterNamespace::Extended => EXTENDED_ROLES,
        }
    }

    /// Every 64-bit register this namespace can hand out, for the clobber
    /// list of the code that runs the instantiated instructions.
    pub fn clobbered_registers(self) -> &'static [&'static str] {
        match self {
            RegisterNamespace::Legacy => LEGACY_CLOBBERS,
            RegisterNamespace::Extended => EXTENDED_CLOBBERS,
        }
    }

    fn table(self) -> &'static HashMap<&'static str, &'static str> {
        match self {
            RegisterNamespace::Legacy => &LEGACY_TABLE,
            RegisterNamespace::Extended => &EXTENDED_TABLE,
        }
    }

    fn wide_role(self, width: RegisterWidth) -> &'static str {
        let (dword, qword) = match self {
            RegisterNamespace::Legacy => LEGACY_WIDE_ROLE,
            RegisterNamespace::Extended => EXTENDED_WIDE_ROLE,
        };

        match width {
            RegisterWidth::Dword => dword,
            RegisterWidth::Qword => qword,
        }
    }

    /// Resolves a general-purpose register role. `width` only matters for
    /// the `reg` role.
    pub fn resolve(self, template: &str, width: RegisterWidth) -> Resolution {
        if template == WIDE_ROLE {
            return Resolution::Operand(self.wide_role(width).to_string());
        }

        match self.table().get(template) {
            Some(name) => Resolution::Operand(name.to_string()),
            None => Resolution::Unhandled,
        }
    }
}

/// Operand size of the `reg` role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterWidth {
    Dword,
    Qword,
}

impl RegisterWidth {
    /// 32-bit when the form has another 32-bit general register operand,
    /// 64-bit otherwise.
    pub fn infer<S: AsRef<str>>(templates: &[S]) -> Self {
        if templates
            .iter()
            .any(|t| matches!(t.as_ref(), "r32" | "r32a" | "r32b"))
        {
            RegisterWidth::Dword
        } else {
            RegisterWidth::Qword
        }
    }
}

#[rustfmt::skip]
static FIXED_REGISTERS: &[&str] = &[
    "AL", "CL", "DL", "BL", "AH", "CH", "DH", "BH",
    "AX", "CX", "DX", "BX", "SP", "BP", "SI", "DI",
    "EAX", "ECX", "EDX", "EBX", "ESP", "EBP", "ESI", "EDI",
    "RAX", "RCX", "RDX", "RBX", "RSP", "RBP", "RSI", "RDI",
    "CS", "DS", "ES", "FS", "GS", "SS",
    "XMM0",
];

/// Registers an instruction form names explicitly, such as the `AL` of
/// `ADD AL, imm8`. They are written as is.
pub fn is_fixed_register(template: &str) -> bool {
    FIXED_REGISTERS.contains(&template)
}

const GPR64: [&str; 8] = ["rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi"];
const GPR32: [&str; 8] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];
const GPR16: [&str; 8] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
const GPR8: [&str; 8] = ["al", "cl", "dl", "bl", "spl", "bpl", "sil", "dil"];
const GPR8_HIGH: [&str; 4] = ["ah", "ch", "dh", "bh"];

/// Vector registers handed out when the table's choice is taken. The VSIB
/// index registers (9-12) come last.
const VECTOR_SPARES: [u8; 12] = [6, 4, 3, 2, 1, 8, 13, 14, 15, 7, 5, 0];

/// A storage location, regardless of the width it is accessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalRegister {
    /// Encoding number: `rax` is 0, `r15` is 15.
    Gpr(u8),
    Mmx(u8),
    /// `xmmN` and `ymmN` share `Vector(N)`.
    Vector(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterView {
    Byte,
    HighByte,
    Word,
    Dword,
    Qword,
    Mm,
    Xmm,
    Ymm,
}

/// A register operand split into the register it names and the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterName {
    physical: PhysicalRegister,
    view: RegisterView,
}

impl RegisterName {
    /// Parses a general purpose, MMX or vector register name, in any case.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        let name = name.as_str();

        let legacy = |table: &[&str], view: RegisterView| {
            table.iter().position(|r| *r == name).map(|i| Self {
                physical: PhysicalRegister::Gpr(i as u8),
                view,
            })
        };
        let found = legacy(&GPR64[..], RegisterView::Qword)
            .or_else(|| legacy(&GPR32[..], RegisterView::Dword))
            .or_else(|| legacy(&GPR16[..], RegisterView::Word))
            .or_else(|| legacy(&GPR8[..], RegisterView::Byte))
            .or_else(|| legacy(&GPR8_HIGH[..], RegisterView::HighByte));
        if found.is_some() {
            return found;
        }

        if let Some((_, number, suffix)) = regex_captures!(r"^r(8|9|1[0-5])([bwd]?)$", name) {
            let view = match suffix {
                "b" => RegisterView::Byte,
                "w" => RegisterView::Word,
                "d" => RegisterView::Dword,
                _ => RegisterView::Qword,
            };
            return Some(Self {
                physical: PhysicalRegister::Gpr(number.parse().ok()?),
                view,
            });
        }

        let (_, kind, number) = regex_captures!(r"^([xy]?)mm([0-9]|[12][0-9]|3[01])$", name)?;
        let number: u8 = number.parse().ok()?;
        match kind {
            "x" => Some(Self {
                physical: PhysicalRegister::Vector(number),
                view: RegisterView::Xmm,
            }),
            "y" => Some(Self {
                physical: PhysicalRegister::Vector(number),
                view: RegisterView::Ymm,
            }),
            _ if number < 8 => Some(Self {
                physical: PhysicalRegister::Mmx(number),
                view: RegisterView::Mm,
            }),
            _ => None,
        }
    }

    pub fn physical(&self) -> PhysicalRegister {
        self.physical
    }

    pub fn view(&self) -> RegisterView {
        self.view
    }

    /// The same view of another register, if it can be encoded.
    pub fn on(&self, physical: PhysicalRegister) -> Option<String> {
        use PhysicalRegister::*;
        use RegisterView::*;

        match (physical, self.view) {
            (Gpr(i @ 0..=7), Qword) => Some(GPR64[i as usize].to_string()),
            (Gpr(i @ 0..=7), Dword) => Some(GPR32[i as usize].to_string()),
            (Gpr(i @ 0..=7), Word) => Some(GPR16[i as usize].to_string()),
            // spl, bpl, sil and dil need a REX prefix.
            (Gpr(i @ 0..=3), Byte) => Some(GPR8[i as usize].to_string()),
            (Gpr(i @ 0..=3), HighByte) => Some(GPR8_HIGH[i as usize].to_string()),
            (Gpr(i @ 8..=15), Qword) => Some(format!("r{i}")),
            (Gpr(i @ 8..=15), Dword) => Some(format!("r{i}d")),
            (Gpr(i @ 8..=15), Word) => Some(format!("r{i}w")),
            (Gpr(i @ 8..=15), Byte) => Some(format!("r{i}b")),
            (Mmx(i @ 0..=7), Mm) => Some(format!("mm{i}")),
            (Vector(i @ 0..=31), Xmm) => Some(format!("xmm{i}")),
            (Vector(i @ 0..=31), Ymm) => Some(format!("ymm{i}")),
            _ => None,
        }
    }

    fn spares(&self, namespace: RegisterNamespace) -> SmallVec<[PhysicalRegister; 12]> {
        match self.physical {
            PhysicalRegister::Gpr(_) => namespace
                .clobbered_registers()
                .iter()
                .filter_map(|name| RegisterName::parse(name))
                .map(|name| name.physical)
                .collect(),
            PhysicalRegister::Mmx(_) => (0..8).map(PhysicalRegister::Mmx).collect(),
            PhysicalRegister::Vector(_) => VECTOR_SPARES
                .iter()
                .map(|&i| PhysicalRegister::Vector(i))
                .collect(),
        }
    }
}

static REGISTER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z][A-Za-z0-9]*\b").unwrap());

/// The registers already used by the operands of one instruction.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    namespace: RegisterNamespace,
    taken: SmallVec<[PhysicalRegister; 8]>,
}

impl RegisterFile {
    pub fn new(namespace: RegisterNamespace) -> Self {
        Self {
            namespace,
            taken: SmallVec::new(),
        }
    }

    pub fn is_taken(&self, physical: PhysicalRegister) -> bool {
        self.taken.contains(&physical)
    }

    /// Marks every register `operand` mentions as used, including the base
    /// and index of a memory operand.
    pub fn reserve(&mut self, operand: &str) {
        for token in REGISTER_TOKEN.find_iter(operand) {
            if let Some(name) = RegisterName::parse(token.as_str()) {
                self.take(name.physical);
            }
        }
    }

    /// Claims the register `operand` names. If another operand already uses
    /// it, returns the same view of the first free spare instead, or `None`
    /// when there is none left. Anything that is not a single register is
    /// reserved and returned as is.
    pub fn allocate(&mut self, operand: &str) -> Option<String> {
        let Some(name) = RegisterName::parse(operand) else {
            self.reserve(operand);
            return Some(operand.to_string());
        };

        if !self.is_taken(name.physical) {
            self.take(name.physical);
            return Some(operand.to_string());
        }

        for spare in name.spares(self.namespace) {
            if self.is_taken(spare) {
                continue;
            }
            if let Some(renamed) = name.on(spare) {
                trace!(operand, renamed = %renamed, "register already in use");
                self.take(spare);
                return Some(renamed);
            }
        }

        None
    }

    fn take(&mut self, physical: PhysicalRegister) {
        if !self.is_taken(physical) {
            self.taken.push(physical);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(ns: RegisterNamespace, template: &str) -> String {
        match ns.resolve(template, RegisterWidth::Qword) {
            Resolution::Operand(name) => name,
            other => panic!("{template} resolved to {other:?}"),
        }
    }

    fn physical(name: &str) -> PhysicalRegister {
        RegisterName::parse(name)
            .unwrap_or_else(|| panic!("unexpected register {name}"))
            .physical()
    }

    #[test]
    fn legacy_roles() {
        let ns = RegisterNamespace::Legacy;
        assert_eq!(resolve(ns, "r8"), "ch");
        assert_eq!(resolve(ns, "r16"), "cx");
        assert_eq!(resolve(ns, "r32"), "ecx");
        assert_eq!(resolve(ns, "r64b"), "rbx");
        assert_eq!(resolve(ns, "reg"), "rdx");
    }

    #[test]
    fn extended_roles() {
        let ns = RegisterNamespace::Extended;
        assert_eq!(resolve(ns, "r8"), "r8b");
        assert_eq!(resolve(ns, "r32"), "r10d");
        assert_eq!(resolve(ns, "r64a"), "r8");
        assert_eq!(resolve(ns, "reg"), "r11");
    }

    #[test]
    fn wide_role_follows_width() {
        assert_eq!(
            RegisterNamespace::Legacy.resolve("reg", RegisterWidth::Dword),
            Resolution::Operand("edx".to_string())
        );
        assert_eq!(
            RegisterNamespace::Extended.resolve("reg", RegisterWidth::Dword),
            Resolution::Operand("r11d".to_string())
        );
    }

    #[test]
    fn infer_width() {
        assert_eq!(RegisterWidth::infer(&["reg", "r32"]), RegisterWidth::Dword);
        assert_eq!(RegisterWidth::infer(&["reg", "xmm"]), RegisterWidth::Qword);
        assert_eq!(RegisterWidth::infer::<&str>(&[]), RegisterWidth::Qword);
    }

    #[test]
    fn unknown_role_is_unhandled() {
        assert!(RegisterNamespace::Legacy
            .resolve("r/m32", RegisterWidth::Qword)
            .is_unhandled());
        assert!(RegisterNamespace::Extended
            .resolve("imm8", RegisterWidth::Qword)
            .is_unhandled());
    }

    #[test]
    fn paired_roles_never_alias() {
        for ns in [RegisterNamespace::Legacy, RegisterNamespace::Extended] {
            for group in [["r32", "r32a", "r32b", "reg"], ["r64", "r64a", "r64b", "reg"]] {
                let mut seen = Vec::new();
                for role in group {
                    let reg = physical(&resolve(ns, role));
                    assert!(!seen.contains(&reg), "{ns:?}: {role} aliases {reg:?}");
                    seen.push(reg);
                }
            }
        }
    }

    #[test]
    fn namespaces_are_disjoint() {
        let legacy: Vec<_> = LEGACY_CLOBBERS.iter().map(|r| physical(r)).collect();
        for name in EXTENDED_CLOBBERS {
            assert!(!legacy.contains(&physical(name)), "{name}");
        }
    }

    #[test]
    fn clobbers_cover_every_role() {
        for ns in [RegisterNamespace::Legacy, RegisterNamespace::Extended] {
            let clobbers: Vec<_> = ns.clobbered_registers().iter().map(|r| physical(r)).collect();
            for width in [RegisterWidth::Dword, RegisterWidth::Qword] {
                let Resolution::Operand(wide) = ns.resolve(WIDE_ROLE, width) else {
                    panic!("reg is unresolved");
                };
                assert!(clobbers.contains(&physical(&wide)));
            }
            for (_, name) in ns.roles() {
                assert!(clobbers.contains(&physical(name)), "{ns:?}: {name}");
            }
        }
    }

    #[test]
    fn fixed_registers() {
        assert!(is_fixed_register("AL"));
        assert!(is_fixed_register("RAX"));
        assert!(is_fixed_register("XMM0"));
        assert!(!is_fixed_register("RAXX"));
        assert!(!is_fixed_register("r32"));
    }

    #[test]
    fn parse_register_names() {
        assert_eq!(physical("ch"), physical("RCX"));
        assert_eq!(physical("r10w"), PhysicalRegister::Gpr(10));
        assert_eq!(physical("xmm9"), physical("ymm9"));
        assert_eq!(physical("mm6"), PhysicalRegister::Mmx(6));
        assert_eq!(RegisterName::parse("dh").map(|r| r.view()), Some(RegisterView::HighByte));

        for name in ["cs", "CR0", "ST(3)", "bnd2", "r16", "mm9", "xmm32", "rept", "ptr"] {
            assert_eq!(RegisterName::parse(name), None, "{name}");
        }
    }

    #[test]
    fn same_view_on_another_register() {
        let ecx = RegisterName::parse("ecx").unwrap();
        assert_eq!(ecx.on(PhysicalRegister::Gpr(7)).as_deref(), Some("edi"));
        assert_eq!(ecx.on(PhysicalRegister::Gpr(12)).as_deref(), Some("r12d"));

        let ch = RegisterName::parse("ch").unwrap();
        assert_eq!(ch.on(PhysicalRegister::Gpr(2)).as_deref(), Some("dh"));
        assert_eq!(ch.on(PhysicalRegister::Gpr(7)), None);
        assert_eq!(ch.on(PhysicalRegister::Gpr(9)), None);
    }

    #[test]
    fn allocate_moves_to_a_free_spare() {
        let mut legacy = RegisterFile::new(RegisterNamespace::Legacy);
        assert_eq!(legacy.allocate("ecx").as_deref(), Some("ecx"));
        assert_eq!(legacy.allocate("ch").as_deref(), Some("dh"));
        assert_eq!(legacy.allocate("rcx").as_deref(), Some("rdi"));

        let mut extended = RegisterFile::new(RegisterNamespace::Extended);
        assert_eq!(extended.allocate("r10d").as_deref(), Some("r10d"));
        assert_eq!(extended.allocate("r10w").as_deref(), Some("r12w"));

        let mut vectors = RegisterFile::new(RegisterNamespace::Legacy);
        vectors.reserve("[rsp + 4* xmm9]");
        assert_eq!(vectors.allocate("xmm5").as_deref(), Some("xmm5"));
        assert_eq!(vectors.allocate("xmm5").as_deref(), Some("xmm6"));
        assert!(vectors.is_taken(PhysicalRegister::Vector(9)));
        assert!(vectors.is_taken(PhysicalRegister::Gpr(4)));
    }

    #[test]
    fn reserve_ignores_non_registers() {
        let mut file = RegisterFile::new(RegisterNamespace::Legacy);
        file.reserve("qword ptr[RSI]");
        file.reserve("0x7e");
        file.reserve("Label\n.rept 64\nNOP\n.endr\nLabel: NOP");

        assert!(file.is_taken(PhysicalRegister::Gpr(6)));
        assert_eq!(file.taken.len(), 1);
    }

    #[test]
    fn high_bytes_run_out() {
        let mut file = RegisterFile::new(RegisterNamespace::Legacy);
        for name in ["ch", "ch", "ch", "ch"] {
            assert!(file.allocate(name).is_some());
        }
        assert_eq!(file.allocate("ch"), None);
    }
}
