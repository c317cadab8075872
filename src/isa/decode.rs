//! 多级指令解码表
//!
//! 解码是固定的四级查找：
//!
//! 1. primary（32 项）：以主 opcode（bits 6:2）索引
//! 2. secondary（8 项）：以 funct3 索引
//! 3. tertiary（128 项）：以 funct7 索引
//! 4. quaternary（8 项）：以 rm/funct3 索引（仅 F 扩展的部分指令族）
//!
//! 表项是带标签的变体：`Leaf`（助记符 + 格式 + handler）或 `Sub`
//! （指向子表）。所有表由 `DecodeTables` 统一持有，子表引用是扁平
//! 表向量中的下标而非指针，扩展安装（overlay）时不存在别名问题。
//! 未显式填充的表项一律解析到 reserved 叶子（格式为 `Illegal`）。

use crate::cpu::CpuCore;
use crate::isa::fields::DecodedInstr;

/// 指令格式标签，驱动反汇编的操作数布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrFormat {
    R,
    R4,
    I,
    S,
    B,
    U,
    J,
    /// 无操作数的 SYSTEM 指令（ecall/ebreak/mret/wfi）
    Sys,
    /// 保留/非法编码
    Illegal,
}

/// 执行 handler 的统一签名
///
/// handler 读取解码记录，读写架构状态与内存，并负责自身的 PC 更新
/// 语义（顺序执行由运行循环预加 4，控制转移与 trap 改写 PC）。
pub type ExecFn = fn(&mut CpuCore, &DecodedInstr);

/// 叶子表项：助记符、格式标签与 handler
#[derive(Clone, Copy)]
pub struct Leaf {
    pub mnemonic: &'static str,
    pub format: InstrFormat,
    pub exec: ExecFn,
}

impl Leaf {
    pub const fn new(mnemonic: &'static str, format: InstrFormat, exec: ExecFn) -> Self {
        Self { mnemonic, format, exec }
    }
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("mnemonic", &self.mnemonic)
            .field("format", &self.format)
            .finish()
    }
}

/// 子表的索引字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Funct3,
    Funct7,
    /// rm 字段（与 funct3 同位置；F 扩展第四级解码使用）
    Rm,
}

impl IndexKind {
    #[inline]
    fn index_of(self, d: &DecodedInstr) -> usize {
        match self {
            IndexKind::Funct3 => d.funct3 as usize,
            IndexKind::Funct7 => d.funct7 as usize,
            IndexKind::Rm => d.rm as usize,
        }
    }
}

/// 指向 `DecodeTables` 内部某张表的句柄（扁平向量下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef(usize);

#[derive(Clone, Copy)]
enum Entry {
    Leaf(Leaf),
    Sub { index: IndexKind, table: TableRef },
}

/// primary 表项数：5-bit opcode 空间
pub const NUM_PRIMARY: usize = 32;
/// funct3 索引的表项数
pub const NUM_SECONDARY: usize = 8;
/// funct7 索引的表项数
pub const NUM_TERTIARY: usize = 128;

/// 解码表图
///
/// 持有全部层级的表。扩展通过 `alloc`/`set`/`link` 把自己的叶子
/// 覆盖到父表上：M 扩展补丁 OP 的 tertiary 表，F 扩展安装 LOAD-FP /
/// STORE-FP / MADD 族 primary 槽位以及 OP-FP 子图。
pub struct DecodeTables {
    tables: Vec<Vec<Entry>>,
    reserved: Leaf,
}

impl DecodeTables {
    /// 创建只含 primary 表的解码图，所有表项指向 reserved 叶子
    pub fn new(reserved: Leaf) -> Self {
        Self {
            tables: vec![vec![Entry::Leaf(reserved); NUM_PRIMARY]],
            reserved,
        }
    }

    /// primary 表句柄
    pub fn primary(&self) -> TableRef {
        TableRef(0)
    }

    /// 分配一张新表，所有表项初始化为 reserved 叶子
    pub fn alloc(&mut self, len: usize) -> TableRef {
        self.tables.push(vec![Entry::Leaf(self.reserved); len]);
        TableRef(self.tables.len() - 1)
    }

    /// 在表项安装叶子
    ///
    /// 覆盖非 reserved 表项视为扩展间冲突，debug 构建下直接断言。
    pub fn set(&mut self, table: TableRef, idx: usize, leaf: Leaf) {
        debug_assert!(
            matches!(&self.tables[table.0][idx],
                     Entry::Leaf(l) if l.format == InstrFormat::Illegal),
            "decode slot {}[{}] already occupied",
            table.0,
            idx
        );
        self.tables[table.0][idx] = Entry::Leaf(leaf);
    }

    /// 把表项链接到子表
    pub fn link(&mut self, table: TableRef, idx: usize, index: IndexKind, child: TableRef) {
        self.tables[table.0][idx] = Entry::Sub { index, table: child };
    }

    /// 查询表项链接的子表（扩展 overlay 用来定位既有子图）
    pub fn child(&self, table: TableRef, idx: usize) -> Option<TableRef> {
        match self.tables[table.0].get(idx) {
            Some(Entry::Sub { table, .. }) => Some(*table),
            _ => None,
        }
    }

    /// 四级查找
    ///
    /// 返回命中的叶子；未填充表项与低两位非 0b11 的指令字（压缩
    /// 指令钩子）返回 reserved 叶子。
    pub fn lookup(&self, d: &DecodedInstr) -> Leaf {
        if !d.is_full_width() {
            return self.reserved;
        }

        let mut entry = &self.tables[0][d.opcode as usize];
        loop {
            match entry {
                Entry::Leaf(leaf) => return *leaf,
                Entry::Sub { index, table } => {
                    match self.tables[table.0].get(index.index_of(d)) {
                        Some(next) => entry = next,
                        None => return self.reserved,
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DecodeTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeTables")
            .field("tables", &self.tables.len())
            .finish()
    }
}
