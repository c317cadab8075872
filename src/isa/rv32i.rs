//! RV32I 基础指令集解码表
//!
//! 构建 primary 表与 LOAD/STORE/BRANCH/OP-IMM/OP/MISC-MEM/SYSTEM
//! 的下级表。OP 的 8 张 tertiary 表（以 funct7 索引）在这里全部
//! 分配好，M 扩展随后只 overlay funct7 = 0b0000001 的槽位。

use crate::cpu::exu;
use crate::isa::decode::{DecodeTables, IndexKind, InstrFormat, Leaf, NUM_SECONDARY, NUM_TERTIARY};
use crate::isa::fields::*;

use InstrFormat::{B, I, J, R, S, Sys, U};

/// 把 RV32I 的叶子安装到解码图上
pub(crate) fn install(t: &mut DecodeTables) {
    let p = t.primary();

    // ========== primary 终结项 ==========
    t.set(p, OPC_LUI as usize, Leaf::new("lui", U, exu::rv32i::lui));
    t.set(p, OPC_AUIPC as usize, Leaf::new("auipc", U, exu::rv32i::auipc));
    t.set(p, OPC_JAL as usize, Leaf::new("jal", J, exu::rv32i::jal));
    t.set(p, OPC_JALR as usize, Leaf::new("jalr", I, exu::rv32i::jalr));

    // ========== LOAD ==========
    let load = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_LOAD as usize, IndexKind::Funct3, load);
    t.set(load, 0b000, Leaf::new("lb", I, exu::rv32i::lb));
    t.set(load, 0b001, Leaf::new("lh", I, exu::rv32i::lh));
    t.set(load, 0b010, Leaf::new("lw", I, exu::rv32i::lw));
    t.set(load, 0b100, Leaf::new("lbu", I, exu::rv32i::lbu));
    t.set(load, 0b101, Leaf::new("lhu", I, exu::rv32i::lhu));

    // ========== STORE ==========
    let store = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_STORE as usize, IndexKind::Funct3, store);
    t.set(store, 0b000, Leaf::new("sb", S, exu::rv32i::sb));
    t.set(store, 0b001, Leaf::new("sh", S, exu::rv32i::sh));
    t.set(store, 0b010, Leaf::new("sw", S, exu::rv32i::sw));

    // ========== BRANCH ==========
    let branch = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_BRANCH as usize, IndexKind::Funct3, branch);
    t.set(branch, 0b000, Leaf::new("beq", B, exu::rv32i::beq));
    t.set(branch, 0b001, Leaf::new("bne", B, exu::rv32i::bne));
    t.set(branch, 0b100, Leaf::new("blt", B, exu::rv32i::blt));
    t.set(branch, 0b101, Leaf::new("bge", B, exu::rv32i::bge));
    t.set(branch, 0b110, Leaf::new("bltu", B, exu::rv32i::bltu));
    t.set(branch, 0b111, Leaf::new("bgeu", B, exu::rv32i::bgeu));

    // ========== OP-IMM ==========
    let op_imm = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_OP_IMM as usize, IndexKind::Funct3, op_imm);
    t.set(op_imm, 0b000, Leaf::new("addi", I, exu::rv32i::addi));
    t.set(op_imm, 0b010, Leaf::new("slti", I, exu::rv32i::slti));
    t.set(op_imm, 0b011, Leaf::new("sltiu", I, exu::rv32i::sltiu));
    t.set(op_imm, 0b100, Leaf::new("xori", I, exu::rv32i::xori));
    t.set(op_imm, 0b110, Leaf::new("ori", I, exu::rv32i::ori));
    t.set(op_imm, 0b111, Leaf::new("andi", I, exu::rv32i::andi));

    // 移位立即数按 funct7 走 tertiary
    let sli = t.alloc(NUM_TERTIARY);
    t.link(op_imm, 0b001, IndexKind::Funct7, sli);
    t.set(sli, 0x00, Leaf::new("slli", I, exu::rv32i::slli));

    let sri = t.alloc(NUM_TERTIARY);
    t.link(op_imm, 0b101, IndexKind::Funct7, sri);
    t.set(sri, 0x00, Leaf::new("srli", I, exu::rv32i::srli));
    t.set(sri, 0x20, Leaf::new("srai", I, exu::rv32i::srai));

    // ========== OP ==========
    // 每个 funct3 一张 128 项的 tertiary 表，M 扩展 overlay 其 0x01 槽位
    let op = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_OP as usize, IndexKind::Funct3, op);
    for f3 in 0..NUM_SECONDARY {
        let tbl = t.alloc(NUM_TERTIARY);
        t.link(op, f3, IndexKind::Funct7, tbl);
    }

    let set_op = |t: &mut DecodeTables, f3: usize, f7: usize, leaf: Leaf| {
        let tbl = t.child(op, f3).expect("OP tertiary table");
        t.set(tbl, f7, leaf);
    };
    set_op(t, 0b000, 0x00, Leaf::new("add", R, exu::rv32i::add));
    set_op(t, 0b000, 0x20, Leaf::new("sub", R, exu::rv32i::sub));
    set_op(t, 0b001, 0x00, Leaf::new("sll", R, exu::rv32i::sll));
    set_op(t, 0b010, 0x00, Leaf::new("slt", R, exu::rv32i::slt));
    set_op(t, 0b011, 0x00, Leaf::new("sltu", R, exu::rv32i::sltu));
    set_op(t, 0b100, 0x00, Leaf::new("xor", R, exu::rv32i::xor));
    set_op(t, 0b101, 0x00, Leaf::new("srl", R, exu::rv32i::srl));
    set_op(t, 0b101, 0x20, Leaf::new("sra", R, exu::rv32i::sra));
    set_op(t, 0b110, 0x00, Leaf::new("or", R, exu::rv32i::or));
    set_op(t, 0b111, 0x00, Leaf::new("and", R, exu::rv32i::and));

    // ========== MISC-MEM ==========
    let misc = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_MISC_MEM as usize, IndexKind::Funct3, misc);
    t.set(misc, 0b000, Leaf::new("fence", I, exu::rv32i::fence));
    t.set(misc, 0b001, Leaf::new("fence.i", I, exu::rv32i::fence_i));

    // ========== SYSTEM ==========
    // funct3 = 0 按 funct7 细分：ecall/ebreak (0x00)。mret/wfi 由
    // Zicsr/特权子系统 overlay，CSR 指令占用其余 funct3 槽位。
    let sys = t.alloc(NUM_SECONDARY);
    t.link(p, OPC_SYSTEM as usize, IndexKind::Funct3, sys);
    let sys0 = t.alloc(NUM_TERTIARY);
    t.link(sys, 0b000, IndexKind::Funct7, sys0);
    t.set(sys0, 0x00, Leaf::new("ecall", Sys, exu::rv32i::env_call));
}
