//! RISC-V ISA 抽象与多级解码框架
//!
//! 本模块提供表驱动的指令解码系统：
//! - `DecodedInstr`: 解码时一次性提取的字段记录
//! - `DecodeTables`: 四级解码表图（primary → funct3 → funct7 → rm）
//! - `Leaf` / `IndexKind`: 表项变体（叶子或子表引用）
//! - 各扩展模块（`rv32i` / `rv32m` / `rv32f` / `zicsr`）以 overlay
//!   方式把自己的叶子安装到表图上
//! - `disasm`: 反汇编格式化

pub mod decode;
pub mod disasm;
pub mod fields;

pub(crate) mod rv32f;
pub(crate) mod rv32i;
pub(crate) mod rv32m;
pub(crate) mod zicsr;

pub use decode::{DecodeTables, IndexKind, InstrFormat, Leaf};
pub use fields::DecodedInstr;
