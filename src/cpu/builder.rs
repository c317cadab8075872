//! CPU 配置器
//!
//! 统一配置核心的指令集扩展、解码表、架构状态与内存总线。
//! 每个扩展的安装动作包括两部分：把解码叶子 overlay 到表图上，
//! 以及注册本扩展的 CSR。MISA 在这里合成：I 位恒置，M/F 位由
//! 对应扩展的安装动作置起。
//!
//! # 示例
//!
//! ```
//! use rv32_sim::cpu::CpuBuilder;
//!
//! let cpu = CpuBuilder::new(0x1000)
//!     .with_m_extension()
//!     .with_f_extension()
//!     .build();
//! assert_eq!(cpu.pc(), 0x1000);
//! ```

use super::csr_def::*;
use super::exu;
use super::status::Status;
use super::CpuCore;
use crate::isa::decode::DecodeTables;
use crate::isa::{rv32f, rv32i, rv32m, zicsr};
use crate::memory::{FlatMemory, MemBus};

/// 默认内部内存：64KB，基地址 0
const DEFAULT_MEM_SIZE: usize = 64 * 1024;

/// CPU 构建器
pub struct CpuBuilder {
    reset_vector: u32,
    enable_m: bool,
    enable_f: bool,
    enable_zicsr: bool,
    memory: Option<FlatMemory>,
    mtvec: u32,
    mtimecmp: u64,
    halt_on_reserved: bool,
    halt_on_ecall: bool,
    rt_disassem: bool,
}

impl CpuBuilder {
    /// 创建新的 CPU 构建器，默认只启用 RV32I
    pub fn new(reset_vector: u32) -> Self {
        Self {
            reset_vector,
            enable_m: false,
            enable_f: false,
            enable_zicsr: false,
            memory: None,
            mtvec: 0,
            mtimecmp: 0,
            halt_on_reserved: false,
            halt_on_ecall: false,
            rt_disassem: false,
        }
    }

    /// 启用 M 扩展（乘除法）
    pub fn with_m_extension(mut self) -> Self {
        self.enable_m = true;
        self
    }

    /// 启用 F 扩展（单精度浮点，隐含 Zicsr）
    pub fn with_f_extension(mut self) -> Self {
        self.enable_f = true;
        self.enable_zicsr = true;
        self
    }

    /// 启用 Zicsr 扩展（CSR 操作与 mret/wfi）
    pub fn with_zicsr_extension(mut self) -> Self {
        self.enable_zicsr = true;
        self
    }

    /// 挂接内部内存（默认 64KB @ 0）
    pub fn with_memory(mut self, mem: FlatMemory) -> Self {
        self.memory = Some(mem);
        self
    }

    /// 设置 mtvec 初值（简单 trap 模型的固定向量）
    pub fn with_mtvec(mut self, mtvec: u32) -> Self {
        self.mtvec = mtvec;
        self
    }

    /// 设置定时器比较值初值（0 关闭定时器）
    pub fn with_mtimecmp(mut self, mtimecmp: u64) -> Self {
        self.mtimecmp = mtimecmp;
        self
    }

    /// 遇到保留指令时停机而不是 trap
    pub fn halt_on_reserved(mut self, halt: bool) -> Self {
        self.halt_on_reserved = halt;
        self
    }

    /// 遇到 ecall/ebreak 时停机而不是 trap
    pub fn halt_on_ecall(mut self, halt: bool) -> Self {
        self.halt_on_ecall = halt;
        self
    }

    /// 运行时反汇编（trace 级日志）
    pub fn rt_disassem(mut self, on: bool) -> Self {
        self.rt_disassem = on;
        self
    }

    /// ISA 字符串（如 "rv32imf"）
    pub fn isa_string(&self) -> String {
        let mut s = String::from("rv32i");
        if self.enable_m {
            s.push('m');
        }
        if self.enable_f {
            s.push('f');
        }
        if self.enable_zicsr && !self.enable_f {
            s.push_str("_zicsr");
        }
        s
    }

    /// 构建 CPU 核心
    pub fn build(self) -> CpuCore {
        // 1. 解码表：基础 RV32I 先装，扩展逐个 overlay
        let mut tables = DecodeTables::new(exu::reserved_leaf());
        rv32i::install(&mut tables);
        if self.enable_m {
            rv32m::install(&mut tables);
        }
        if self.enable_zicsr {
            zicsr::install(&mut tables);
        }
        if self.enable_f {
            rv32f::install(&mut tables);
        }

        // 2. 架构状态与 CSR
        let mut status = Status::new();
        status.csr.register(BASE_CSRS);
        status.csr.register(M_CSRS);

        let mut misa = MISA_MXL_32 | MISA_EXT_I;
        if self.enable_m {
            misa |= MISA_EXT_M;
        }
        if self.enable_f {
            // F 扩展安装时总是置起 MISA 的 F 位
            misa |= MISA_EXT_F;
            status.enable_fp();
            status.csr.register(F_CSRS);
        }
        status.csr.force(CSR_MISA, misa);
        status.csr.force(CSR_MTVEC, self.mtvec & MTVEC_WR_MASK);

        // 3. 内存总线
        let mut bus = MemBus::new(
            self.memory
                .unwrap_or_else(|| FlatMemory::new(DEFAULT_MEM_SIZE, 0)),
        );
        bus.mtimecmp = self.mtimecmp;

        CpuCore::from_parts(
            self.reset_vector,
            status,
            tables,
            bus,
            self.halt_on_reserved,
            self.halt_on_ecall,
            self.rt_disassem,
        )
    }
}

impl Default for CpuBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_build() {
        let cpu = CpuBuilder::new(0x1000).build();
        assert_eq!(cpu.pc(), 0x1000);
        assert!(!cpu.has_fp());
        assert_eq!(cpu.csr_read(CSR_MISA), MISA_MXL_32 | MISA_EXT_I);
    }

    #[test]
    fn test_misa_extension_bits() {
        let cpu = CpuBuilder::new(0).with_m_extension().with_f_extension().build();
        let misa = cpu.csr_read(CSR_MISA);
        assert_ne!(misa & MISA_EXT_M, 0);
        assert_ne!(misa & MISA_EXT_F, 0, "F 位必须随扩展安装置起");
        assert!(cpu.has_fp());
    }

    #[test]
    fn test_f_registers_csrs() {
        let cpu = CpuBuilder::new(0).with_f_extension().build();
        let snapshot = cpu.snapshot();
        assert!(snapshot.csr.contains_key(&CSR_FFLAGS), "fflags 应已注册");
        assert!(snapshot.csr.contains_key(&CSR_FRM), "frm 应已注册");
        assert!(snapshot.csr.contains_key(&CSR_FCSR), "fcsr 应已注册");
    }

    #[test]
    fn test_mtvec_seed() {
        let cpu = CpuBuilder::new(0).with_mtvec(0x8000_0001).build();
        assert_eq!(cpu.csr_read(CSR_MTVEC), 0x8000_0001);
    }

    #[test]
    fn test_isa_string() {
        assert_eq!(CpuBuilder::new(0).isa_string(), "rv32i");
        assert_eq!(CpuBuilder::new(0).with_m_extension().isa_string(), "rv32im");
        assert_eq!(
            CpuBuilder::new(0).with_m_extension().with_f_extension().isa_string(),
            "rv32imf"
        );
    }
}
