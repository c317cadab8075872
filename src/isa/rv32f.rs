//! RV32F 扩展（单精度浮点）解码表
//!
//! F 扩展安装 LOAD-FP / STORE-FP / MADD / MSUB / NMSUB / NMADD 六个
//! primary 槽位，以及 OP-FP 的三、四级子图：
//!
//! - OP-FP 的 secondary 表 8 个 funct3 槽位全部指向同一张 tertiary
//!   表（算术指令的 funct3 位置是 rm，不能用于区分指令）
//! - tertiary 按 funct7 选出指令族
//! - 符号注入 / 最值 / 移动与分类 / 比较 四个族再按 rm（funct3 位）
//!   做第四级解码

use crate::cpu::exu;
use crate::isa::decode::{DecodeTables, IndexKind, InstrFormat, Leaf, NUM_SECONDARY, NUM_TERTIARY};
use crate::isa::fields::*;

use InstrFormat::{I, R, R4, S};

// ========== OP-FP funct7 族编码 ==========

pub const F7_FADD_S: usize = 0x00;
pub const F7_FSUB_S: usize = 0x04;
pub const F7_FMUL_S: usize = 0x08;
pub const F7_FDIV_S: usize = 0x0C;
pub const F7_FSGNJ_S: usize = 0x10;
pub const F7_FMINMAX_S: usize = 0x14;
pub const F7_FSQRT_S: usize = 0x2C;
pub const F7_FCMP_S: usize = 0x50;
pub const F7_FCVT_W_S: usize = 0x60;
pub const F7_FCVT_S_W: usize = 0x68;
pub const F7_FMV_X_W: usize = 0x70;
pub const F7_FMV_W_X: usize = 0x78;

/// 把 RV32F 的叶子安装到解码图上
pub(crate) fn install(t: &mut DecodeTables) {
    let p = t.primary();

    // ========== 加载/存储 ==========
    let load_fp = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_LOAD_FP as usize, IndexKind::Funct3, load_fp);
    t.set(load_fp, 0b010, Leaf::new("flw", I, exu::rv32f::flw));

    let store_fp = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_STORE_FP as usize, IndexKind::Funct3, store_fp);
    t.set(store_fp, 0b010, Leaf::new("fsw", S, exu::rv32f::fsw));

    // ========== 融合乘加（R4，rs3 在 bits 31:27，rm 在 funct3）==========
    t.set(p, OPC_MADD as usize, Leaf::new("fmadd.s", R4, exu::rv32f::fmadds));
    t.set(p, OPC_MSUB as usize, Leaf::new("fmsub.s", R4, exu::rv32f::fmsubs));
    t.set(p, OPC_NMSUB as usize, Leaf::new("fnmsub.s", R4, exu::rv32f::fnmsubs));
    t.set(p, OPC_NMADD as usize, Leaf::new("fnmadd.s", R4, exu::rv32f::fnmadds));

    // ========== OP-FP ==========
    // secondary 的全部 funct3 槽位指向同一张 tertiary 表
    let fs = t.alloc(NUM_TERTIARY);
    let fsop = t.alloc(NUM_SECONDARY);
    for f3 in 0..NUM_SECONDARY {
        t.link(fsop, f3, IndexKind::Funct7, fs);
    }
    t.link(p, OPC_OP_FP as usize, IndexKind::Funct3, fsop);

    t.set(fs, F7_FADD_S, Leaf::new("fadd.s", R, exu::rv32f::fadds));
    t.set(fs, F7_FSUB_S, Leaf::new("fsub.s", R, exu::rv32f::fsubs));
    t.set(fs, F7_FMUL_S, Leaf::new("fmul.s", R, exu::rv32f::fmuls));
    t.set(fs, F7_FDIV_S, Leaf::new("fdiv.s", R, exu::rv32f::fdivs));
    t.set(fs, F7_FSQRT_S, Leaf::new("fsqrt.s", R, exu::rv32f::fsqrts));
    // FCVT.W.S / FCVT.WU.S 共用一个叶子，rs2 区分有无符号
    t.set(fs, F7_FCVT_W_S, Leaf::new("fcvt.w.s", R, exu::rv32f::fcvt_ws));
    t.set(fs, F7_FCVT_S_W, Leaf::new("fcvt.s.w", R, exu::rv32f::fcvt_sw));
    t.set(fs, F7_FMV_W_X, Leaf::new("fmv.w.x", R, exu::rv32f::fmv_wx));

    // ========== 第四级：按 rm（funct3 位）细分的指令族 ==========
    let sgnj = t.alloc(NUM_SECONDARY);
    t.link(fs, F7_FSGNJ_S, IndexKind::Rm, sgnj);
    t.set(sgnj, 0b000, Leaf::new("fsgnj.s", R, exu::rv32f::fsgnjs));
    t.set(sgnj, 0b001, Leaf::new("fsgnjn.s", R, exu::rv32f::fsgnjns));
    t.set(sgnj, 0b010, Leaf::new("fsgnjx.s", R, exu::rv32f::fsgnjxs));

    let minmax = t.alloc(NUM_SECONDARY);
    t.link(fs, F7_FMINMAX_S, IndexKind::Rm, minmax);
    t.set(minmax, 0b000, Leaf::new("fmin.s", R, exu::rv32f::fmins));
    t.set(minmax, 0b001, Leaf::new("fmax.s", R, exu::rv32f::fmaxs));

    let fcmp = t.alloc(NUM_SECONDARY);
    t.link(fs, F7_FCMP_S, IndexKind::Rm, fcmp);
    t.set(fcmp, 0b000, Leaf::new("fle.s", R, exu::rv32f::fles));
    t.set(fcmp, 0b001, Leaf::new("flt.s", R, exu::rv32f::flts));
    t.set(fcmp, 0b010, Leaf::new("feq.s", R, exu::rv32f::feqs));

    let fmv = t.alloc(NUM_SECONDARY);
    t.link(fs, F7_FMV_X_W, IndexKind::Rm, fmv);
    t.set(fmv, 0b000, Leaf::new("fmv.x.w", R, exu::rv32f::fmv_xw));
    t.set(fmv, 0b001, Leaf::new("fclass.s", R, exu::rv32f::fclasss));
}
