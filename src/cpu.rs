//! CPU 核心与执行引擎
//!
//! 本模块定义单 hart 的 RV32IMF 核心 `CpuCore`：架构状态、内存总线、
//! 多级解码表与运行循环。每个 tick 依次执行：停机检查 → 中断处理 →
//! 取指 → 解码 → 执行 → 周期计数递增。handler 负责自身的 PC 语义
//! （顺序执行由循环预加 4，控制转移与 trap 改写 PC）。

use log::{debug, trace};

use crate::isa::decode::DecodeTables;
use crate::isa::fields::DecodedInstr;
use crate::isa::{self, disasm};
use crate::memory::{MemBus, MemCallback, MemError, Memory};

pub mod csr_def;
pub(crate) mod exu;
mod builder;
mod status;
pub mod trap;

pub use builder::CpuBuilder;
pub use status::{Status, StatusSnapshot};
pub use trap::TrapCause;

use trap::mstatus;

/// CPU 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    /// 正常运行中
    Running,
    /// 停在非法指令上（halt_on_reserved 配置生效）
    IllegalInstruction(u32),
    /// 等待中断 (WFI 指令)
    WaitForInterrupt,
    /// CPU 已停机
    Halted,
}

/// 单 hart CPU 核心
///
/// 设计约定：
/// - x0 永远为 0，写入时丢弃
/// - PC 为字节地址，所有指令 4 字节（压缩指令预留钩子）
/// - 架构状态只被 handler 与 CSR 写路径修改
/// - 内存总线归核心独占，外部回调在运行循环线程上同步调用
pub struct CpuCore {
    /// 架构状态（寄存器文件 + CSR）
    status: Status,
    /// 程序计数器
    pc: u32,
    /// 当前正在执行的指令地址（trap 与控制转移以此为基准）
    exec_pc: u32,
    /// 当前 CPU 状态
    state: CpuState,
    /// 多级解码表
    decode: DecodeTables,
    /// 内存总线（内部 RAM + 外部回调 + mtimecmp）
    pub(crate) bus: MemBus,
    /// 退休指令周期计数，单调不减
    cycle: u64,
    /// 最近一次访存/取指地址（trap 诊断）
    access_addr: u32,
    /// 复位向量
    reset_vector: u32,
    /// 外部停机请求，tick 顶部检查
    halt_req: bool,
    pub(crate) halt_on_reserved: bool,
    pub(crate) halt_on_ecall: bool,
    rt_disassem: bool,
}

impl CpuCore {
    /// 以默认配置（仅 RV32I，64KB 内存）创建核心
    pub fn new(reset_vector: u32) -> Self {
        CpuBuilder::new(reset_vector).build()
    }

    pub(crate) fn from_parts(
        reset_vector: u32,
        status: Status,
        decode: DecodeTables,
        bus: MemBus,
        halt_on_reserved: bool,
        halt_on_ecall: bool,
        rt_disassem: bool,
    ) -> Self {
        CpuCore {
            status,
            pc: reset_vector,
            exec_pc: reset_vector,
            state: CpuState::Running,
            decode,
            bus,
            cycle: 0,
            access_addr: 0,
            reset_vector,
            halt_req: false,
            halt_on_reserved,
            halt_on_ecall,
            rt_disassem,
        }
    }

    // ========== 基本访问接口 ==========

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    /// 当前正在执行的指令地址
    pub(crate) fn exec_pc(&self) -> u32 {
        self.exec_pc
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: CpuState) {
        self.state = state;
    }

    /// 退休指令周期计数
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// 最近一次访存/取指地址
    pub fn last_access_addr(&self) -> u32 {
        self.access_addr
    }

    /// 读取 x0 总是返回 0
    pub fn read_reg(&self, reg: u8) -> u32 {
        self.status.int_read(reg)
    }

    pub fn write_reg(&mut self, reg: u8, value: u32) {
        self.status.int_write(reg, value)
    }

    /// f 寄存器的原始 64-bit 槽位
    pub fn read_fp_raw(&self, reg: u8) -> u64 {
        self.status.fp_read_raw(reg)
    }

    /// 读取 binary32 位模式（含 NaN-box 检查）
    pub fn read_fp_bits32(&self, reg: u8) -> u32 {
        self.status.fp_read_bits32(reg)
    }

    /// 写入 binary32 位模式（NaN-box 到 64-bit 槽位）
    ///
    /// 如果 F 扩展未启用，写入会被忽略
    pub fn write_fp_bits32(&mut self, reg: u8, bits: u32) {
        self.status.fp_write_bits32(reg, bits)
    }

    pub fn read_fp_f32(&self, reg: u8) -> f32 {
        f32::from_bits(self.read_fp_bits32(reg))
    }

    pub fn write_fp_f32(&mut self, reg: u8, value: f32) {
        self.write_fp_bits32(reg, value.to_bits());
    }

    /// 检查是否启用了浮点扩展
    pub fn has_fp(&self) -> bool {
        self.status.fp.is_some()
    }

    /// CSR 值，未实现的地址返回 0（调试/嵌入方便捷接口）
    pub fn csr_read(&self, csr: u16) -> u32 {
        self.csr_read_checked(csr).unwrap_or(0)
    }

    /// 经写掩码写 CSR（嵌入方便捷接口，未实现的地址忽略）
    pub fn csr_write(&mut self, csr: u16, value: u32) {
        self.status.csr_write_masked(csr, value);
    }

    /// 经检查的 CSR 读：未实现的地址返回 None
    ///
    /// cycle/time/instret 族是周期计数器的只读视图，读取时现算。
    pub(crate) fn csr_read_checked(&self, addr: u16) -> Option<u32> {
        use csr_def::*;
        match addr {
            CSR_CYCLE | CSR_TIME | CSR_INSTRET => self
                .status
                .csr
                .is_implemented(addr)
                .then_some(self.cycle as u32),
            CSR_CYCLEH | CSR_TIMEH | CSR_INSTRETH => self
                .status
                .csr
                .is_implemented(addr)
                .then_some((self.cycle >> 32) as u32),
            _ => self.status.csr.read(addr),
        }
    }

    /// 地址是否已实现且可写（只读 CSR 的写访问是非法 CSR 访问）
    pub(crate) fn csr_can_write(&self, addr: u16) -> bool {
        matches!(self.status.csr.wr_mask(addr), Some(m) if m != 0)
    }

    /// 经检查的 CSR 写：未实现或只读的地址返回 false
    pub(crate) fn csr_write_checked(&mut self, addr: u16, value: u32) -> bool {
        match self.status.csr.wr_mask(addr) {
            Some(0) | None => false,
            Some(_) => self.status.csr_write_masked(addr, value),
        }
    }

    pub(crate) fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }

    /// 当前生效的 frm 字段
    pub(crate) fn frm(&self) -> u32 {
        self.status.csr.read(csr_def::CSR_FRM).unwrap_or(0) & 0x7
    }

    /// 注册外部内存访问回调
    pub fn register_mem_callback(&mut self, cb: MemCallback) {
        self.bus.set_callback(cb);
    }

    pub fn bus(&self) -> &MemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MemBus {
        &mut self.bus
    }

    /// 请求停机；在下一个 tick 顶部生效，在途指令总是完整退休
    pub fn request_halt(&mut self) {
        self.halt_req = true;
    }

    /// 复位：清除除 MISA 外的全部寄存器，PC 回到复位向量
    pub fn reset(&mut self) {
        self.status.reset();
        self.pc = self.reset_vector;
        self.exec_pc = self.reset_vector;
        self.state = CpuState::Running;
        self.cycle = 0;
        self.access_addr = 0;
        self.halt_req = false;
    }

    // ========== 访存（handler 专用，失败时自动走 trap 路径）==========

    pub(crate) fn mem_load8(&mut self, addr: u32) -> Option<u8> {
        self.access_addr = addr;
        match self.bus.load8(addr) {
            Ok(v) => Some(v),
            Err(e) => {
                self.mem_trap(e, false);
                None
            }
        }
    }

    pub(crate) fn mem_load16(&mut self, addr: u32) -> Option<u16> {
        self.access_addr = addr;
        match self.bus.load16(addr) {
            Ok(v) => Some(v),
            Err(e) => {
                self.mem_trap(e, false);
                None
            }
        }
    }

    pub(crate) fn mem_load32(&mut self, addr: u32) -> Option<u32> {
        self.access_addr = addr;
        match self.bus.load32(addr) {
            Ok(v) => Some(v),
            Err(e) => {
                self.mem_trap(e, false);
                None
            }
        }
    }

    pub(crate) fn mem_store8(&mut self, addr: u32, value: u8) {
        self.access_addr = addr;
        if let Err(e) = self.bus.store8(addr, value) {
            self.mem_trap(e, true);
        }
    }

    pub(crate) fn mem_store16(&mut self, addr: u32, value: u16) {
        self.access_addr = addr;
        if let Err(e) = self.bus.store16(addr, value) {
            self.mem_trap(e, true);
        }
    }

    pub(crate) fn mem_store32(&mut self, addr: u32, value: u32) {
        self.access_addr = addr;
        if let Err(e) = self.bus.store32(addr, value) {
            self.mem_trap(e, true);
        }
    }

    fn mem_trap(&mut self, e: MemError, is_store: bool) {
        let cause = match (&e, is_store) {
            (MemError::Unaligned { .. }, false) => TrapCause::LoadAddressMisaligned,
            (MemError::Unaligned { .. }, true) => TrapCause::StoreAddressMisaligned,
            (MemError::OutOfRange { .. }, false) => TrapCause::LoadAccessFault,
            (MemError::OutOfRange { .. }, true) => TrapCause::StoreAccessFault,
        };
        debug!("memory fault at pc=0x{:08x}: {}", self.exec_pc, e);
        self.take_trap_at(cause, e.addr(), self.exec_pc);
    }

    // ========== trap ==========

    /// 触发 trap（以当前 PC 作为异常 PC）
    pub fn take_trap(&mut self, cause: TrapCause, tval: u32) {
        self.take_trap_at(cause, tval, self.pc);
    }

    /// 在指定 PC 处触发 trap
    ///
    /// 流程：保存异常 PC 到 mepc、原因到 mcause、附加信息到 mtval，
    /// 将 mstatus.MIE 压栈到 MPIE 并关闭中断，MPP 置为 M-mode，
    /// 随后按 mtvec 的 direct/vectored 模式重定向 PC。
    pub fn take_trap_at(&mut self, cause: TrapCause, tval: u32, epc: u32) {
        use csr_def::*;

        self.status.csr_write_masked(CSR_MEPC, epc);
        self.status.csr.force(CSR_MCAUSE, cause.to_cause_value());
        self.status.csr.force(CSR_MTVAL, tval);

        let old = self.status.csr.read(CSR_MSTATUS).unwrap_or(0);
        let mut new = old;
        if mstatus::read_mie(old) {
            new |= mstatus::MPIE_MASK;
        } else {
            new &= !mstatus::MPIE_MASK;
        }
        new &= !mstatus::MIE_MASK;
        new = mstatus::write_mpp(new, 3);
        self.status.csr.force(CSR_MSTATUS, new);

        let mtvec = self.status.csr.read(CSR_MTVEC).unwrap_or(0);
        self.pc = trap::calculate_trap_pc(mtvec, &cause);
    }

    /// 保留/非法指令的统一出口
    ///
    /// 除 PC（转向 mtvec）与 trap 簿记外不改变任何架构状态。
    pub(crate) fn reserved_instr(&mut self, d: &DecodedInstr) {
        debug!(
            "reserved instruction 0x{:08x} at pc=0x{:08x}",
            d.raw, self.exec_pc
        );
        if self.halt_on_reserved {
            self.pc = self.exec_pc;
            self.state = CpuState::IllegalInstruction(d.raw);
        } else {
            self.take_trap_at(TrapCause::IllegalInstruction, d.raw, self.exec_pc);
        }
    }

    /// 中断处理钩子：简单定时器模型
    ///
    /// cycle 到达 mtimecmp（非 0 时）即置起 mip.MTIP；mie.MTIE 与
    /// mstatus.MIE 都允许时产生机器定时器中断。返回是否陷入。
    fn process_interrupts(&mut self) -> bool {
        use csr_def::*;

        let mtimecmp = self.bus.mtimecmp;
        let pending = mtimecmp != 0 && self.cycle >= mtimecmp;
        self.status
            .csr
            .force(CSR_MIP, if pending { trap::MTI_MASK } else { 0 });
        if !pending {
            return false;
        }

        let mie = self.status.csr.read(CSR_MIE).unwrap_or(0);
        let msta = self.status.csr.read(CSR_MSTATUS).unwrap_or(0);
        if mie & trap::MTI_MASK == 0 || !mstatus::read_mie(msta) {
            return false;
        }

        // 中断的 mepc 指向下一条要执行的指令
        self.take_trap_at(TrapCause::MachineTimerInterrupt, 0, self.pc);
        self.state = CpuState::Running;
        true
    }

    // ========== 运行循环 ==========

    /// 执行单步
    ///
    /// # 流程
    ///
    /// 1. 停机条件检查（外部停机请求、既有停机状态）
    /// 2. 中断处理（可从 WFI 唤醒）
    /// 3. 从 PC 处取指，失败走取指 trap
    /// 4. 解码（未命中的编码由 reserved 叶子处理）
    /// 5. 默认 PC += 4，执行 handler（可能改写 PC）
    /// 6. 周期计数递增
    pub fn step(&mut self) -> CpuState {
        if self.halt_req {
            self.state = CpuState::Halted;
        }
        match self.state {
            CpuState::Running => {
                self.process_interrupts();
            }
            CpuState::WaitForInterrupt => {
                if !self.process_interrupts() {
                    self.cycle += 1;
                    return self.state;
                }
            }
            _ => return self.state,
        }

        let pc = self.pc;
        self.access_addr = pc;
        let word = match self.bus.fetch(pc) {
            Ok(w) => w,
            Err(e) => {
                debug!("fetch fault at pc=0x{:08x}: {}", pc, e);
                let cause = match e {
                    MemError::Unaligned { .. } => TrapCause::InstructionAddressMisaligned,
                    MemError::OutOfRange { .. } => TrapCause::InstructionAccessFault,
                };
                self.take_trap_at(cause, pc, pc);
                self.cycle += 1;
                return self.state;
            }
        };

        let d = DecodedInstr::new(word);
        let leaf = self.decode.lookup(&d);

        if self.rt_disassem {
            let mut text = String::new();
            disasm::format_into(&mut text, &leaf, &d, pc);
            trace!("{:08x}: {:08x}    {}", pc, word, text);
        }

        // 默认顺序执行；控制转移与 trap 在 handler 内改写 PC
        self.exec_pc = pc;
        self.pc = pc.wrapping_add(4);
        (leaf.exec)(self, &d);

        self.cycle += 1;
        self.state
    }

    /// 运行多条指令
    ///
    /// # 返回
    ///
    /// 执行的 tick 数量和最终 CPU 状态
    pub fn run(&mut self, max_instructions: u64) -> (u64, CpuState) {
        let mut executed = 0;
        for _ in 0..max_instructions {
            let state = self.step();
            executed += 1;
            if !matches!(state, CpuState::Running | CpuState::WaitForInterrupt) {
                return (executed, state);
            }
        }
        (executed, self.state)
    }

    /// 反汇编一个指令字到调用方提供的缓冲区
    pub fn disassemble(&self, raw: u32, pc: u32, buf: &mut String) {
        let d = DecodedInstr::new(raw);
        let leaf = self.decode.lookup(&d);
        disasm::format_into(buf, &leaf, &d, pc);
    }

    /// 获取所有整数寄存器的快照
    pub fn regs(&self) -> &[u32; 32] {
        self.status.int.snapshot()
    }

    /// 获取完整架构状态快照
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// 打印所有存在的状态（用于调试）
    pub fn dump_regs(&self) {
        println!("═══════════════════════════════════════════════════════════════════");
        println!(
            "PC: 0x{:08x}  State: {:?}  Cycle: {}",
            self.pc, self.state, self.cycle
        );
        println!("─── Integer Registers (x0-x31) ───────────────────────────────────");
        for i in 0..32u8 {
            if i % 4 == 0 {
                print!("  ");
            }
            print!("{:>4}: 0x{:08x}  ", isa::disasm::RMAP[i as usize], self.read_reg(i));
            if i % 4 == 3 {
                println!();
            }
        }

        if self.has_fp() {
            println!("─── Floating-Point Registers (f0-f31) ────────────────────────────");
            for i in 0..32u8 {
                if i % 4 == 0 {
                    print!("  ");
                }
                print!(
                    "{:>4}: 0x{:08x}  ",
                    isa::disasm::FMAP[i as usize],
                    self.read_fp_bits32(i)
                );
                if i % 4 == 3 {
                    println!();
                }
            }
        }

        let csrs = self.status.csr.snapshot();
        if !csrs.is_empty() {
            println!("─── Control and Status Registers (CSR) ───────────────────────────");
            let mut csr_list: Vec<_> = csrs.into_iter().collect();
            csr_list.sort_by_key(|(addr, _)| *addr);
            for (i, (addr, value)) in csr_list.iter().enumerate() {
                print!("  0x{:03x}: 0x{:08x}", addr, value);
                if i % 3 == 2 {
                    println!();
                } else {
                    print!("  ");
                }
            }
            if csr_list.len() % 3 != 0 {
                println!();
            }
        }
        println!("═══════════════════════════════════════════════════════════════════");
    }
}
