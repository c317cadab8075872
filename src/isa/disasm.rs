//! 反汇编格式化
//!
//! 按叶子表项的格式标签把指令写入调用方提供的字符串缓冲区，
//! 不使用任何共享的 scratch 缓冲。寄存器一律用 ABI 名称显示。

use std::fmt::Write;

use crate::isa::decode::{InstrFormat, Leaf};
use crate::isa::fields::*;

/// 整数寄存器 ABI 名称
pub const RMAP: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2",
    "s0", "s1", "a0", "a1", "a2", "a3", "a4", "a5",
    "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7",
    "s8", "s9", "s10", "s11", "t3", "t4", "t5", "t6",
];

/// 浮点寄存器 ABI 名称
pub const FMAP: [&str; 32] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7",
    "fs0", "fs1", "fa0", "fa1", "fa2", "fa3", "fa4", "fa5",
    "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7",
    "fs8", "fs9", "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

#[inline]
fn x(r: u8) -> &'static str {
    RMAP[(r & 0x1F) as usize]
}

#[inline]
fn f(r: u8) -> &'static str {
    FMAP[(r & 0x1F) as usize]
}

/// SYSTEM 格式指令共用一个叶子，助记符按编码细分
fn sys_mnemonic(raw: u32) -> &'static str {
    match raw {
        0x0000_0073 => "ecall",
        0x0010_0073 => "ebreak",
        0x3020_0073 => "mret",
        0x1050_0073 => "wfi",
        _ => "system",
    }
}

/// 把一条已解码的指令格式化进 `buf`
///
/// `pc` 用于分支/跳转显示绝对目标地址。具体列布局非规范性约定，
/// 这里统一为「助记符左对齐 9 列 + 操作数」。
pub fn format_into(buf: &mut String, leaf: &Leaf, d: &DecodedInstr, pc: u32) {
    let m = leaf.mnemonic;
    // write! 到 String 不会失败
    let _ = match leaf.format {
        InstrFormat::R => {
            if d.opcode == OPC_OP_FP {
                format_fp_r(buf, m, d)
            } else {
                write!(buf, "{:<9}{},{},{}", m, x(d.rd), x(d.rs1), x(d.rs2))
            }
        }
        InstrFormat::R4 => write!(
            buf,
            "{:<9}{},{},{},{}",
            m,
            f(d.rd),
            f(d.rs1),
            f(d.rs2),
            f(d.rs3)
        ),
        InstrFormat::I => match d.opcode {
            OPC_LOAD => write!(buf, "{:<9}{},{}({})", m, x(d.rd), d.imm_i, x(d.rs1)),
            OPC_LOAD_FP => write!(buf, "{:<9}{},{}({})", m, f(d.rd), d.imm_i, x(d.rs1)),
            OPC_JALR => write!(buf, "{:<9}{},{}({})", m, x(d.rd), d.imm_i, x(d.rs1)),
            OPC_OP_IMM if d.funct3 == 0b001 || d.funct3 == 0b101 => {
                write!(buf, "{:<9}{},{},{}", m, x(d.rd), x(d.rs1), d.shamt)
            }
            OPC_MISC_MEM => write!(buf, "{:<9}", m),
            _ => write!(buf, "{:<9}{},{},{}", m, x(d.rd), x(d.rs1), d.imm_i),
        },
        InstrFormat::S => {
            if d.opcode == OPC_STORE_FP {
                write!(buf, "{:<9}{},{}({})", m, f(d.rs2), d.imm_s, x(d.rs1))
            } else {
                write!(buf, "{:<9}{},{}({})", m, x(d.rs2), d.imm_s, x(d.rs1))
            }
        }
        InstrFormat::B => write!(
            buf,
            "{:<9}{},{},0x{:08x}",
            m,
            x(d.rs1),
            x(d.rs2),
            pc.wrapping_add(d.imm_b as u32)
        ),
        InstrFormat::U => write!(buf, "{:<9}{},0x{:05x}", m, x(d.rd), (d.imm_u as u32) >> 12),
        InstrFormat::J => write!(
            buf,
            "{:<9}{},0x{:08x}",
            m,
            x(d.rd),
            pc.wrapping_add(d.imm_j as u32)
        ),
        InstrFormat::Sys => {
            if d.funct3 == 0 {
                write!(buf, "{:<9}", sys_mnemonic(d.raw))
            } else if d.funct3 & 0b100 != 0 {
                // CSR 立即数版本
                write!(buf, "{:<9}{},0x{:03x},{}", m, x(d.rd), d.csr, d.zimm)
            } else {
                write!(buf, "{:<9}{},0x{:03x},{}", m, x(d.rd), d.csr, x(d.rs1))
            }
        }
        InstrFormat::Illegal => write!(buf, "{:<9}0x{:08x}", m, d.raw),
    };
}

/// OP-FP 的 R 格式：按指令族在 f/x 寄存器之间混排
fn format_fp_r(buf: &mut String, m: &str, d: &DecodedInstr) -> std::fmt::Result {
    match d.funct7 {
        // fcvt.w.s / fcvt.wu.s, fmv.x.w / fclass.s：rd 是整数寄存器
        0x60 | 0x70 => write!(buf, "{:<9}{},{}", m, x(d.rd), f(d.rs1)),
        // fcvt.s.w / fcvt.s.wu, fmv.w.x：rs1 是整数寄存器
        0x68 | 0x78 => write!(buf, "{:<9}{},{}", m, f(d.rd), x(d.rs1)),
        // 比较：rd 是整数寄存器
        0x50 => write!(buf, "{:<9}{},{},{}", m, x(d.rd), f(d.rs1), f(d.rs2)),
        // fsqrt.s 单操作数
        0x2C => write!(buf, "{:<9}{},{}", m, f(d.rd), f(d.rs1)),
        _ => write!(buf, "{:<9}{},{},{}", m, f(d.rd), f(d.rs1), f(d.rs2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::decode::InstrFormat;

    fn nop(_: &mut crate::cpu::CpuCore, _: &DecodedInstr) {}

    fn fmt(leaf: Leaf, raw: u32, pc: u32) -> String {
        let mut s = String::new();
        format_into(&mut s, &leaf, &DecodedInstr::new(raw), pc);
        s
    }

    #[test]
    fn test_format_addi() {
        let s = fmt(Leaf::new("addi", InstrFormat::I, nop), 0x02A00093, 0);
        assert_eq!(s, "addi     ra,zero,42");
    }

    #[test]
    fn test_format_load() {
        let s = fmt(Leaf::new("lw", InstrFormat::I, nop), 0x00412083, 0);
        assert_eq!(s, "lw       ra,4(sp)");
    }

    #[test]
    fn test_format_branch_target() {
        let s = fmt(Leaf::new("beq", InstrFormat::B, nop), 0x00208463, 0x100);
        assert_eq!(s, "beq      ra,sp,0x00000108");
    }

    #[test]
    fn test_format_fp() {
        // fadd.s f1, f2, f3
        let s = fmt(Leaf::new("fadd.s", InstrFormat::R, nop), 0x003100D3, 0);
        assert_eq!(s, "fadd.s   ft1,ft2,ft3");
    }

    #[test]
    fn test_format_sys() {
        let s = fmt(Leaf::new("ecall", InstrFormat::Sys, nop), 0x00000073, 0);
        assert_eq!(s.trim_end(), "ecall");
        let s = fmt(Leaf::new("ecall", InstrFormat::Sys, nop), 0x00100073, 0);
        assert_eq!(s.trim_end(), "ebreak");
    }
}
