//! RV32M 扩展（乘除法）解码表
//!
//! M 扩展与 RV32I 共用 OP opcode（0b01100），整套扩展只需把
//! funct7 = 0b0000001 的 8 个 tertiary 槽位 overlay 上去。

use crate::cpu::exu;
use crate::isa::decode::{DecodeTables, InstrFormat, Leaf};
use crate::isa::fields::OPC_OP;

/// M 扩展占用的 funct7 编码
const FUNCT7_MULDIV: usize = 0x01;

/// 把 RV32M 的叶子 overlay 到既有的 OP tertiary 表上
pub(crate) fn install(t: &mut DecodeTables) {
    let op = t
        .child(t.primary(), OPC_OP as usize)
        .expect("RV32I must be installed first");

    let leaves: [(usize, &'static str, crate::isa::decode::ExecFn); 8] = [
        (0b000, "mul", exu::rv32m::mul),
        (0b001, "mulh", exu::rv32m::mulh),
        (0b010, "mulhsu", exu::rv32m::mulhsu),
        (0b011, "mulhu", exu::rv32m::mulhu),
        (0b100, "div", exu::rv32m::div),
        (0b101, "divu", exu::rv32m::divu),
        (0b110, "rem", exu::rv32m::rem),
        (0b111, "remu", exu::rv32m::remu),
    ];

    for (f3, name, exec) in leaves {
        let tbl = t.child(op, f3).expect("OP tertiary table");
        t.set(tbl, FUNCT7_MULDIV, Leaf::new(name, InstrFormat::R, exec));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::exu::reserved_leaf;
    use crate::isa::fields::DecodedInstr;

    #[test]
    fn test_m_overlay() {
        let mut t = DecodeTables::new(reserved_leaf());
        crate::isa::rv32i::install(&mut t);
        install(&mut t);

        assert_eq!(t.lookup(&DecodedInstr::new(0x022080B3)).mnemonic, "mul");
        assert_eq!(t.lookup(&DecodedInstr::new(0x0220C1B3)).mnemonic, "div");
        assert_eq!(t.lookup(&DecodedInstr::new(0x0220E233)).mnemonic, "rem");
        // 基础指令不受 overlay 影响
        assert_eq!(t.lookup(&DecodedInstr::new(0x002081B3)).mnemonic, "add");
    }
}
