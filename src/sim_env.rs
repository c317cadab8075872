//! 仿真环境初始化模块
//!
//! 本模块负责：
//! - 读取并解析仿真配置
//! - 解析 ELF 文件并把程序段装入内存
//! - 初始化 CPU（入口 PC 即复位向量，默认取 ELF 入口点）
//! - 驱动运行与 HTIF (tohost/fromhost) 测试协议
//!
//! # 示例
//!
//! ```no_run
//! use rv32_sim::sim_env::{SimConfig, SimEnv};
//!
//! let config = SimConfig::default()
//!     .with_elf_path("program.elf")
//!     .with_memory_size(64 * 1024);
//!
//! let mut env = SimEnv::from_config(config).expect("Failed to create sim env");
//! env.run(1000);
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use elf::abi::{EM_RISCV, PF_W, PF_X, PT_LOAD};
use elf::endian::AnyEndian;
use elf::ElfBytes;
use log::{debug, info};

use crate::cpu::{CpuBuilder, CpuCore, CpuState};
use crate::memory::{FlatMemory, MemError, Memory};

/// 仿真配置错误
#[derive(Debug)]
pub enum SimError {
    /// IO 错误
    Io(io::Error),
    /// ELF 解析错误
    ElfParse(String),
    /// 配置错误
    Config(String),
    /// 内存错误
    Memory(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Io(e) => write!(f, "IO error: {}", e),
            SimError::ElfParse(s) => write!(f, "ELF parse error: {}", s),
            SimError::Config(s) => write!(f, "Config error: {}", s),
            SimError::Memory(s) => write!(f, "Memory error: {}", s),
        }
    }
}

impl std::error::Error for SimError {}

impl From<io::Error> for SimError {
    fn from(e: io::Error) -> Self {
        SimError::Io(e)
    }
}

impl From<MemError> for SimError {
    fn from(e: MemError) -> Self {
        SimError::Memory(e.to_string())
    }
}

/// ISA 扩展配置
#[derive(Debug, Clone, Copy, Default)]
pub struct IsaExtensions {
    /// M 扩展（乘除法）
    pub m: bool,
    /// F 扩展（单精度浮点，隐含 Zicsr）
    pub f: bool,
    /// Zicsr 扩展（CSR 操作与 mret/wfi）
    pub zicsr: bool,
}

impl IsaExtensions {
    /// RV32I 基础配置
    pub fn rv32i() -> Self {
        Self::default()
    }

    /// RV32IM 配置
    pub fn rv32im() -> Self {
        Self {
            m: true,
            ..Default::default()
        }
    }

    /// RV32IMF 配置
    pub fn rv32imf() -> Self {
        Self {
            m: true,
            f: true,
            zicsr: true,
        }
    }

    /// 从字符串解析扩展配置
    ///
    /// 格式示例: "rv32imf", "rv32i_zicsr", "imf"
    pub fn parse(s: &str) -> Result<Self, SimError> {
        let lower = s.to_lowercase();
        let body = lower.strip_prefix("rv32").unwrap_or(&lower);

        let mut ext = Self::default();
        let mut rest = body;
        while let Some(c) = rest.chars().next() {
            rest = &rest[c.len_utf8()..];
            match c {
                'i' => {} // 基础指令集，总是启用
                'm' => ext.m = true,
                'f' | 'd' => {
                    // D 仅为钩子：按 F 处理
                    ext.f = true;
                    ext.zicsr = true;
                }
                'g' => {
                    ext.m = true;
                    ext.f = true;
                    ext.zicsr = true;
                }
                '_' => {
                    if let Some(tail) = rest.strip_prefix("zicsr") {
                        ext.zicsr = true;
                        rest = tail;
                    }
                }
                'c' | 'a' | 'e' => {
                    return Err(SimError::Config(format!(
                        "unsupported extension '{}' in ISA string '{}'",
                        c, s
                    )));
                }
                _ => {
                    return Err(SimError::Config(format!(
                        "unrecognized character '{}' in ISA string '{}'",
                        c, s
                    )));
                }
            }
        }

        Ok(ext)
    }
}

/// 内存区域配置
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    /// 区域名称（用于调试）
    pub name: String,
    /// 起始地址
    pub base: u32,
    /// 大小（字节）
    pub size: usize,
}

impl Default for MemoryRegion {
    fn default() -> Self {
        Self {
            name: "ram".to_string(),
            base: 0,
            size: 64 * 1024, // 默认 64KB
        }
    }
}

/// 仿真配置
///
/// 识别的选项与 CLI 一一对应：复位向量、反汇编模式、运行时反汇编、
/// 保留指令/ecall 的停机策略、mtvec、mtimecmp。
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// ELF 文件路径（可选，也可以直接提供二进制）
    pub elf_path: Option<String>,
    /// 原始二进制文件路径（可选）
    pub bin_path: Option<String>,
    /// 二进制加载地址（用于 bin_path）
    pub bin_load_addr: u32,
    /// 复位向量；None 时取 ELF 入口点（或内存基地址）
    pub reset_vector: Option<u32>,
    /// 内存配置
    pub memory: MemoryRegion,
    /// ISA 扩展
    pub extensions: IsaExtensions,
    /// 最大执行指令数（0 表示无限制）
    pub max_instructions: u64,
    /// 只反汇编不执行
    pub disassemble: bool,
    /// 执行时输出反汇编（trace 日志）
    pub rt_disassem: bool,
    /// 遇到保留指令停机而不是 trap
    pub halt_on_reserved: bool,
    /// 遇到 ecall/ebreak 停机而不是 trap
    pub halt_on_ecall: bool,
    /// mtvec 初值
    pub mtvec: u32,
    /// 定时器比较值（0 关闭）
    pub mtimecmp: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            elf_path: None,
            bin_path: None,
            bin_load_addr: 0,
            reset_vector: None,
            memory: MemoryRegion::default(),
            extensions: IsaExtensions::rv32im(),
            max_instructions: 0,
            disassemble: false,
            rt_disassem: false,
            halt_on_reserved: false,
            halt_on_ecall: false,
            mtvec: 0,
            mtimecmp: 0,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elf_path(mut self, path: impl Into<String>) -> Self {
        self.elf_path = Some(path.into());
        self
    }

    pub fn with_bin_path(mut self, path: impl Into<String>, load_addr: u32) -> Self {
        self.bin_path = Some(path.into());
        self.bin_load_addr = load_addr;
        self
    }

    pub fn with_reset_vector(mut self, pc: u32) -> Self {
        self.reset_vector = Some(pc);
        self
    }

    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory.size = size;
        self
    }

    pub fn with_memory_base(mut self, base: u32) -> Self {
        self.memory.base = base;
        self
    }

    pub fn with_memory(mut self, name: impl Into<String>, base: u32, size: usize) -> Self {
        self.memory = MemoryRegion {
            name: name.into(),
            base,
            size,
        };
        self
    }

    pub fn with_extensions(mut self, ext: IsaExtensions) -> Self {
        self.extensions = ext;
        self
    }

    /// 从字符串设置 ISA 扩展
    pub fn with_isa(mut self, isa: &str) -> Result<Self, SimError> {
        self.extensions = IsaExtensions::parse(isa)?;
        Ok(self)
    }

    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    pub fn with_mtvec(mut self, mtvec: u32) -> Self {
        self.mtvec = mtvec;
        self
    }

    pub fn with_mtimecmp(mut self, mtimecmp: u64) -> Self {
        self.mtimecmp = mtimecmp;
        self
    }
}

/// ELF 程序段信息
#[derive(Debug, Clone)]
pub struct ElfSegment {
    /// 虚拟地址
    pub vaddr: u32,
    /// 文件中的大小
    pub file_size: usize,
    /// 内存中的大小
    pub mem_size: usize,
    /// 段数据
    pub data: Vec<u8>,
    /// 是否可执行
    pub executable: bool,
    /// 是否可写
    pub writable: bool,
}

/// ELF 符号信息（只保留 HTIF 需要的）
#[derive(Debug, Clone)]
pub struct ElfSymbol {
    pub name: String,
    pub addr: u32,
}

/// ELF 文件解析结果
#[derive(Debug, Clone)]
pub struct ElfInfo {
    /// 入口点地址
    pub entry: u32,
    /// 程序段
    pub segments: Vec<ElfSegment>,
    /// 符号表（仅 tohost/fromhost）
    pub symbols: Vec<ElfSymbol>,
}

impl ElfInfo {
    /// 解析 ELF 文件
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse_bytes(&data)
    }

    /// 从字节数组解析 ELF
    pub fn parse_bytes(data: &[u8]) -> Result<Self, SimError> {
        let elf_file = ElfBytes::<AnyEndian>::minimal_parse(data)
            .map_err(|e| SimError::ElfParse(format!("Failed to parse ELF: {}", e)))?;

        let header = &elf_file.ehdr;
        if header.e_machine != EM_RISCV {
            return Err(SimError::ElfParse(format!(
                "Not a RISC-V ELF (machine type: 0x{:x}, expected 0x{:x})",
                header.e_machine, EM_RISCV
            )));
        }
        if header.class != elf::file::Class::ELF32 {
            return Err(SimError::ElfParse("Only 32-bit ELF is supported".into()));
        }

        let entry = header.e_entry as u32;

        let mut segments = Vec::new();
        if let Some(phdrs) = elf_file.segments() {
            for phdr in phdrs {
                if phdr.p_type != PT_LOAD {
                    continue;
                }
                let segment_data = elf_file
                    .segment_data(&phdr)
                    .map_err(|e| SimError::ElfParse(format!("Failed to read segment data: {}", e)))?
                    .to_vec();
                segments.push(ElfSegment {
                    vaddr: phdr.p_vaddr as u32,
                    file_size: phdr.p_filesz as usize,
                    mem_size: phdr.p_memsz as usize,
                    data: segment_data,
                    executable: (phdr.p_flags & PF_X) != 0,
                    writable: (phdr.p_flags & PF_W) != 0,
                });
            }
        }

        // 只保留 HTIF mailbox 符号
        let mut symbols = Vec::new();
        if let Ok(Some((symtab, strtab))) = elf_file.symbol_table() {
            for sym in symtab {
                if sym.st_value == 0 {
                    continue;
                }
                if let Ok(name) = strtab.get(sym.st_name as usize) {
                    if name == "tohost" || name == "fromhost" {
                        symbols.push(ElfSymbol {
                            name: name.to_string(),
                            addr: sym.st_value as u32,
                        });
                    }
                }
            }
        }

        Ok(ElfInfo {
            entry,
            segments,
            symbols,
        })
    }

    /// 查找符号地址
    pub fn find_symbol(&self, name: &str) -> Option<u32> {
        self.symbols
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.addr)
    }

    /// 程序使用的最小和最大地址
    pub fn address_range(&self) -> Option<(u32, u32)> {
        if self.segments.is_empty() {
            return None;
        }
        let min_addr = self.segments.iter().map(|s| s.vaddr).min().unwrap();
        let max_addr = self
            .segments
            .iter()
            .map(|s| s.vaddr + s.mem_size as u32)
            .max()
            .unwrap();
        Some((min_addr, max_addr))
    }
}

fn ensure_range(region: &MemoryRegion, addr: u32, len: usize) -> Result<(), SimError> {
    let len_u32: u32 = len
        .try_into()
        .map_err(|_| SimError::Memory(format!("Size {} exceeds 32-bit address space", len)))?;
    let region_end = region.base as u64 + region.size as u64;
    let target_end = addr as u64 + len_u32 as u64;
    if addr < region.base || target_end > region_end {
        return Err(SimError::Memory(format!(
            "Memory region '{}' (0x{:08x}..0x{:08x}) cannot fit range 0x{:08x}..0x{:08x}",
            region.name, region.base, region_end, addr, target_end,
        )));
    }
    Ok(())
}

fn load_segments_into_memory(
    memory: &mut FlatMemory,
    region: &MemoryRegion,
    segments: &[ElfSegment],
) -> Result<(), SimError> {
    for seg in segments {
        ensure_range(region, seg.vaddr, seg.mem_size)?;
        if seg.mem_size == 0 {
            continue;
        }
        memory.write_bytes(seg.vaddr, &seg.data)?;
        if seg.mem_size > seg.file_size {
            // .bss 清零
            let bss_start = seg.vaddr + seg.file_size as u32;
            memory.fill(bss_start, seg.mem_size - seg.file_size, 0)?;
        }
        debug!(
            "loaded segment vaddr=0x{:08x} filesz=0x{:x} memsz=0x{:x} flags={}{}",
            seg.vaddr,
            seg.file_size,
            seg.mem_size,
            if seg.executable { "X" } else { "-" },
            if seg.writable { "W" } else { "R" },
        );
    }
    Ok(())
}

/// ISA 测试结果（HTIF 协议）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    /// 测试通过
    Pass,
    /// 测试失败，包含失败的测试编号
    Fail(u32),
    /// 测试超时或未完成
    Timeout,
}

impl TestResult {
    /// 从 tohost 值解析测试结果
    pub fn from_tohost(value: u32) -> Self {
        if value == 1 {
            TestResult::Pass
        } else if value != 0 {
            // value = (test_num << 1) | 1
            TestResult::Fail(value >> 1)
        } else {
            TestResult::Timeout
        }
    }
}

/// 可执行区间 (start, len)，反汇编模式使用
type ExecRange = (u32, usize);

/// 仿真环境
///
/// 封装 CPU（含内存总线）与仿真配置，提供统一的仿真接口。
pub struct SimEnv {
    /// CPU 核心（内存总线归核心独占）
    pub cpu: CpuCore,
    /// 配置
    pub config: SimConfig,
    /// 已执行的指令数
    pub instructions_executed: u64,
    /// HTIF tohost 地址（用于 ISA 测试）
    pub tohost_addr: Option<u32>,
    /// HTIF fromhost 地址
    pub fromhost_addr: Option<u32>,
    /// 可执行代码区间（反汇编模式）
    exec_ranges: Vec<ExecRange>,
}

impl SimEnv {
    /// 从配置创建仿真环境
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let mut memory = FlatMemory::new(config.memory.size, config.memory.base);
        let mut reset_vector = config.reset_vector.unwrap_or(config.memory.base);
        let mut tohost_addr = None;
        let mut fromhost_addr = None;
        let mut exec_ranges = Vec::new();

        if let Some(ref elf_path) = config.elf_path {
            let elf = ElfInfo::parse(elf_path)?;
            tohost_addr = elf.find_symbol("tohost");
            fromhost_addr = elf.find_symbol("fromhost");

            info!("loaded ELF {}: entry=0x{:08x}, {} segments", elf_path, elf.entry, elf.segments.len());
            load_segments_into_memory(&mut memory, &config.memory, &elf.segments)?;
            for seg in elf.segments.iter().filter(|s| s.executable) {
                exec_ranges.push((seg.vaddr, seg.file_size));
            }

            if config.reset_vector.is_none() {
                reset_vector = elf.entry;
            }
        } else if let Some(ref bin_path) = config.bin_path {
            let data = std::fs::read(bin_path)?;
            ensure_range(&config.memory, config.bin_load_addr, data.len())?;
            info!("loaded binary {}: 0x{:08x}, {} bytes", bin_path, config.bin_load_addr, data.len());
            memory.write_bytes(config.bin_load_addr, &data)?;
            exec_ranges.push((config.bin_load_addr, data.len()));
            if config.reset_vector.is_none() {
                reset_vector = config.bin_load_addr;
            }
        }

        let cpu = Self::build_cpu(&config, reset_vector, memory);

        let mut env = SimEnv {
            cpu,
            config,
            instructions_executed: 0,
            tohost_addr,
            fromhost_addr,
            exec_ranges,
        };
        env.clear_htif_mailboxes();
        Ok(env)
    }

    fn build_cpu(config: &SimConfig, reset_vector: u32, memory: FlatMemory) -> CpuCore {
        let mut builder = CpuBuilder::new(reset_vector)
            .with_memory(memory)
            .with_mtvec(config.mtvec)
            .with_mtimecmp(config.mtimecmp)
            .halt_on_reserved(config.halt_on_reserved)
            .halt_on_ecall(config.halt_on_ecall)
            .rt_disassem(config.rt_disassem);

        let ext = config.extensions;
        if ext.m {
            builder = builder.with_m_extension();
        }
        if ext.f {
            builder = builder.with_f_extension();
        }
        if ext.zicsr {
            builder = builder.with_zicsr_extension();
        }

        debug!("CPU configured: {}", builder.isa_string());
        builder.build()
    }

    /// 从 ELF 文件创建仿真环境（便捷方法）
    pub fn from_elf<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let elf = ElfInfo::parse(&path)?;
        let (min_addr, max_addr) = elf
            .address_range()
            .ok_or_else(|| SimError::ElfParse("No loadable segments".into()))?;

        // 分配足够大的内存（对齐到 4KB，至少 64KB）
        let mem_size = ((max_addr - min_addr) as usize + 0xFFF) & !0xFFF;
        let mem_size = mem_size.max(64 * 1024);

        let config = SimConfig::new()
            .with_elf_path(path.as_ref().to_string_lossy().to_string())
            .with_memory("ram", min_addr, mem_size)
            .with_extensions(IsaExtensions::rv32imf());

        Self::from_config(config)
    }

    /// 执行单步
    pub fn step(&mut self) -> CpuState {
        let state = self.cpu.step();
        self.instructions_executed += 1;
        state
    }

    /// 运行指定数量的指令
    pub fn run(&mut self, max_instructions: u64) -> (u64, CpuState) {
        let (executed, state) = self.cpu.run(max_instructions);
        self.instructions_executed += executed;
        (executed, state)
    }

    /// 运行直到停止条件（停机状态或指令数预算耗尽）
    pub fn run_until_halt(&mut self) -> (u64, CpuState) {
        let max = if self.config.max_instructions > 0 {
            self.config.max_instructions
        } else {
            u64::MAX
        };
        self.run(max)
    }

    pub fn cpu(&self) -> &CpuCore {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CpuCore {
        &mut self.cpu
    }

    /// 反汇编全部可执行区间到输出流（不执行）
    pub fn disassemble_to(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let ranges = self.exec_ranges.clone();
        let mut text = String::new();
        for (start, len) in ranges {
            let end = start + (len as u32 & !3);
            let mut addr = start;
            while addr < end {
                let word = match self.cpu.bus_mut().ram_mut().load32(addr) {
                    Ok(w) => w,
                    Err(_) => break,
                };
                text.clear();
                self.cpu.disassemble(word, addr, &mut text);
                writeln!(out, "{:08x}: {:08x}    {}", addr, word, text)?;
                addr += 4;
            }
        }
        Ok(())
    }

    /// 打印仿真状态
    pub fn dump(&self) {
        println!("=== SimEnv Status ===");
        println!("Instructions executed: {}", self.instructions_executed);
        self.cpu.dump_regs();
    }

    /// 检查 tohost 值并在检测到写入时执行 ACK
    pub fn check_tohost(&mut self) -> Option<u32> {
        let addr = self.tohost_addr?;
        if let Ok(value) = self.cpu.bus_mut().ram_mut().load32(addr) {
            if value != 0 {
                self.acknowledge_tohost(value);
                return Some(value);
            }
        }
        None
    }

    fn clear_htif_mailboxes(&mut self) {
        if let Some(addr) = self.tohost_addr {
            let _ = self.cpu.bus_mut().ram_mut().store32(addr, 0);
        }
        if let Some(addr) = self.fromhost_addr {
            let _ = self.cpu.bus_mut().ram_mut().store32(addr, 0);
        }
    }

    fn acknowledge_tohost(&mut self, value: u32) {
        if let Some(addr) = self.tohost_addr {
            let _ = self.cpu.bus_mut().ram_mut().store32(addr, 0);
        }
        if let Some(addr) = self.fromhost_addr {
            let _ = self.cpu.bus_mut().ram_mut().store32(addr, value);
        }
    }

    /// 运行 ISA 测试：执行到 tohost 被写入或达到指令数上限
    pub fn run_isa_test(&mut self, max_instructions: u64) -> (TestResult, u64) {
        let max = if max_instructions > 0 {
            max_instructions
        } else {
            1_000_000
        };

        if self.tohost_addr.is_none() {
            let (executed, _state) = self.run(max);
            return (TestResult::Timeout, executed);
        }

        self.clear_htif_mailboxes();
        let start = self.instructions_executed;

        for _ in 0..max {
            let state = self.step();
            if let Some(value) = self.check_tohost() {
                return (
                    TestResult::from_tohost(value),
                    self.instructions_executed - start,
                );
            }
            if !matches!(state, CpuState::Running | CpuState::WaitForInterrupt) {
                // CPU 停机但 tohost 未写入
                break;
            }
        }

        (TestResult::Timeout, self.instructions_executed - start)
    }

    /// 重置仿真环境：复位 CPU 并重新装载程序镜像
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.cpu.reset();
        self.instructions_executed = 0;

        if let Some(elf_path) = self.config.elf_path.clone() {
            let elf = ElfInfo::parse(&elf_path)?;
            load_segments_into_memory(
                self.cpu.bus_mut().ram_mut(),
                &self.config.memory,
                &elf.segments,
            )?;
        } else if let Some(bin_path) = self.config.bin_path.clone() {
            let data = std::fs::read(&bin_path)?;
            self.cpu
                .bus_mut()
                .ram_mut()
                .write_bytes(self.config.bin_load_addr, &data)?;
        }

        self.clear_htif_mailboxes();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn test_isa_extensions_parse() {
        let ext = IsaExtensions::parse("rv32im").unwrap();
        assert!(ext.m);
        assert!(!ext.f);

        let ext = IsaExtensions::parse("rv32imf").unwrap();
        assert!(ext.m);
        assert!(ext.f);
        assert!(ext.zicsr, "F 隐含 Zicsr");

        let ext = IsaExtensions::parse("rv32i_zicsr").unwrap();
        assert!(ext.zicsr);
        assert!(!ext.m);

        assert!(IsaExtensions::parse("rv32ic").is_err(), "C 扩展仅为钩子");
        assert!(IsaExtensions::parse("rv32ix").is_err());
    }

    #[test]
    fn test_sim_config_builder() {
        let config = SimConfig::new()
            .with_memory_size(128 * 1024)
            .with_memory_base(0x8000_0000)
            .with_reset_vector(0x8000_0000)
            .with_max_instructions(1000)
            .with_mtvec(0x8000_0100)
            .with_mtimecmp(500);

        assert_eq!(config.memory.size, 128 * 1024);
        assert_eq!(config.memory.base, 0x8000_0000);
        assert_eq!(config.reset_vector, Some(0x8000_0000));
        assert_eq!(config.max_instructions, 1000);
        assert_eq!(config.mtvec, 0x8000_0100);
        assert_eq!(config.mtimecmp, 500);
    }

    #[test]
    fn test_sim_env_basic() {
        let config = SimConfig::new().with_memory_size(4096).with_reset_vector(0);
        let mut env = SimEnv::from_config(config).expect("Failed to create sim env");

        // addi x1, x0, 42
        env.cpu
            .bus_mut()
            .ram_mut()
            .store32(0, 0x02A00093)
            .expect("failed to write test instruction");

        let state = env.step();
        assert_eq!(state, CpuState::Running);
        assert_eq!(env.cpu.read_reg(1), 42);
        assert_eq!(env.instructions_executed, 1);
    }

    #[test]
    fn test_sim_env_with_extensions() {
        let config = SimConfig::new()
            .with_extensions(IsaExtensions::rv32imf())
            .with_memory_size(4096)
            .with_reset_vector(0);
        let env = SimEnv::from_config(config).expect("Failed to create sim env");
        assert!(env.cpu.has_fp());
    }

    #[test]
    fn test_halt_flags_flow_into_cpu() {
        let mut config = SimConfig::new().with_memory_size(4096).with_reset_vector(0);
        config.halt_on_ecall = true;
        let mut env = SimEnv::from_config(config).unwrap();
        env.cpu.bus_mut().ram_mut().store32(0, 0x00000073).unwrap(); // ecall
        let state = env.step();
        assert_eq!(state, CpuState::Halted);
    }

    #[test]
    fn test_run_until_halt_budget() {
        let config = SimConfig::new()
            .with_memory_size(4096)
            .with_reset_vector(0)
            .with_max_instructions(10);
        let mut env = SimEnv::from_config(config).unwrap();
        // 全是 nop
        for i in 0..1024u32 {
            if env.cpu.bus_mut().ram_mut().store32(i * 4, 0x00000013).is_err() {
                break;
            }
        }
        let (executed, _state) = env.run_until_halt();
        assert_eq!(executed, 10);
    }

    #[test]
    fn test_bin_loading_and_disassemble() {
        use std::io::Write as _;
        // 写一个小的原始镜像文件
        let dir = std::env::temp_dir();
        let path = dir.join("rv32_sim_test_prog.bin");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(&0x02A00093u32.to_le_bytes()).unwrap(); // addi x1, x0, 42
            f.write_all(&0x00000073u32.to_le_bytes()).unwrap(); // ecall
        }

        let config = SimConfig::new()
            .with_bin_path(path.to_string_lossy().to_string(), 0)
            .with_memory_size(4096);
        let mut env = SimEnv::from_config(config).unwrap();

        let mut out = Vec::new();
        env.disassemble_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("addi     ra,zero,42"), "got: {}", text);
        assert!(text.contains("ecall"));

        // 正常执行同一镜像
        let mut env2 = SimEnv::from_config(
            SimConfig::new()
                .with_bin_path(path.to_string_lossy().to_string(), 0)
                .with_memory_size(4096),
        )
        .unwrap();
        env2.cpu.csr_write(crate::cpu::csr_def::CSR_MTVEC, 0x100);
        env2.run(2);
        assert_eq!(env2.cpu.read_reg(1), 42);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_test_result_from_tohost() {
        assert_eq!(TestResult::from_tohost(1), TestResult::Pass);
        assert_eq!(TestResult::from_tohost((5 << 1) | 1), TestResult::Fail(5));
        assert_eq!(TestResult::from_tohost(0), TestResult::Timeout);
    }
}
