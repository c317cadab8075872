//! Zicsr 扩展（CSR 操作）与机器模式特权指令的解码表
//!
//! CSR 指令编码为 I-type 变体（SYSTEM opcode，funct3 区分操作），
//! imm 字段即 CSR 地址。mret/wfi 同样落在 SYSTEM opcode 的
//! funct3 = 0 空间，按 funct7 细分后 overlay 到基础表上。

use crate::cpu::exu;
use crate::isa::decode::{DecodeTables, InstrFormat, Leaf};
use crate::isa::fields::OPC_SYSTEM;

/// mret 编码: 0011000 00010 00000 000 00000 1110011
pub const MRET_ENCODING: u32 = 0x3020_0073;

/// wfi 编码: 0001000 00101 00000 000 00000 1110011
pub const WFI_ENCODING: u32 = 0x1050_0073;

/// 把 Zicsr 与特权指令的叶子安装到 SYSTEM 子表
pub(crate) fn install(t: &mut DecodeTables) {
    use InstrFormat::Sys;

    let sys = t
        .child(t.primary(), OPC_SYSTEM as usize)
        .expect("RV32I must be installed first");

    t.set(sys, 0b001, Leaf::new("csrrw", Sys, exu::zicsr::csrrw));
    t.set(sys, 0b010, Leaf::new("csrrs", Sys, exu::zicsr::csrrs));
    t.set(sys, 0b011, Leaf::new("csrrc", Sys, exu::zicsr::csrrc));
    t.set(sys, 0b101, Leaf::new("csrrwi", Sys, exu::zicsr::csrrwi));
    t.set(sys, 0b110, Leaf::new("csrrsi", Sys, exu::zicsr::csrrsi));
    t.set(sys, 0b111, Leaf::new("csrrci", Sys, exu::zicsr::csrrci));

    // funct3 = 0 的 tertiary 表由 RV32I 建好（ecall/ebreak 在 0x00）
    let sys0 = t.child(sys, 0b000).expect("SYSTEM funct3=0 table");
    t.set(sys0, 0x08, Leaf::new("wfi", Sys, exu::zicsr::wfi));
    t.set(sys0, 0x18, Leaf::new("mret", Sys, exu::zicsr::mret));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::exu::reserved_leaf;
    use crate::isa::fields::DecodedInstr;

    fn tables() -> DecodeTables {
        let mut t = DecodeTables::new(reserved_leaf());
        crate::isa::rv32i::install(&mut t);
        install(&mut t);
        t
    }

    #[test]
    fn test_csr_decode() {
        let t = tables();
        assert_eq!(t.lookup(&DecodedInstr::new(0x34009173)).mnemonic, "csrrw");
        assert_eq!(t.lookup(&DecodedInstr::new(0x340021F3)).mnemonic, "csrrs");
        assert_eq!(t.lookup(&DecodedInstr::new(0x3403B473)).mnemonic, "csrrc");
        assert_eq!(t.lookup(&DecodedInstr::new(0x340FD573)).mnemonic, "csrrwi");
    }

    #[test]
    fn test_priv_decode() {
        let t = tables();
        assert_eq!(t.lookup(&DecodedInstr::new(MRET_ENCODING)).mnemonic, "mret");
        assert_eq!(t.lookup(&DecodedInstr::new(WFI_ENCODING)).mnemonic, "wfi");
        // ecall/ebreak 与特权指令共存
        assert_eq!(t.lookup(&DecodedInstr::new(0x00000073)).mnemonic, "ecall");
    }

    #[test]
    fn test_csr_field_view() {
        // csrrw x2, mscratch(0x340), x1
        let d = DecodedInstr::new(0x34009173);
        assert_eq!(d.csr, 0x340);
        assert_eq!(d.rs1, 1);
        assert_eq!(d.rd, 2);
    }
}
