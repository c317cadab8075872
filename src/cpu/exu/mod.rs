//! 执行单元（executor）集合，按扩展分模块
//!
//! 所有 handler 使用统一签名 `fn(&mut CpuCore, &DecodedInstr)`，
//! 由解码叶子直接引用。

pub(crate) mod rv32f;
pub(crate) mod rv32i;
pub(crate) mod rv32m;
pub(crate) mod zicsr;

use crate::cpu::CpuCore;
use crate::isa::decode::{InstrFormat, Leaf};
use crate::isa::fields::DecodedInstr;

/// 保留指令 handler：未填充的解码表项统一落到这里
pub(crate) fn reserved(cpu: &mut CpuCore, d: &DecodedInstr) {
    cpu.reserved_instr(d);
}

/// 解码表的默认叶子
pub(crate) fn reserved_leaf() -> Leaf {
    Leaf::new("reserved", InstrFormat::Illegal, reserved)
}
