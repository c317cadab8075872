//! Zicsr 扩展与机器模式特权指令的执行单元
//!
//! CSR 访问语义：
//! - CSRRW/CSRRWI：rd = x0 时跳过读（有读副作用的 CSR 不被读取）
//! - CSRRS/CSRRC 及立即数版本：rs1/zimm = 0 时跳过写（纯读取）
//! - 写经过地址的写掩码；未实现的地址或对只读 CSR 的写都是非法
//!   CSR 访问，走非法指令出口

use crate::cpu::csr_def::{CSR_MEPC, CSR_MSTATUS};
use crate::cpu::trap::mstatus;
use crate::cpu::{CpuCore, CpuState};
use crate::isa::fields::DecodedInstr;
use crate::isa::zicsr::{MRET_ENCODING, WFI_ENCODING};

// CSRRW: t = CSR[csr]; CSR[csr] = rs1; rd = t
pub(crate) fn csrrw(cpu: &mut CpuCore, d: &DecodedInstr) {
    // 合法性先行检查：非法访问不得提交任何状态
    if !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    let new = cpu.read_reg(d.rs1);
    if d.rd != 0 {
        let old = cpu.csr_read_checked(d.csr).unwrap_or(0);
        cpu.write_reg(d.rd, old);
    }
    cpu.csr_write_checked(d.csr, new);
}

// CSRRS: t = CSR[csr]; CSR[csr] = t | rs1; rd = t
pub(crate) fn csrrs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let write = d.rs1 != 0;
    if write && !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    let Some(old) = cpu.csr_read_checked(d.csr) else {
        return cpu.reserved_instr(d);
    };
    cpu.write_reg(d.rd, old);
    if write {
        let set = cpu.read_reg(d.rs1);
        cpu.csr_write_checked(d.csr, old | set);
    }
}

// CSRRC: t = CSR[csr]; CSR[csr] = t & ~rs1; rd = t
pub(crate) fn csrrc(cpu: &mut CpuCore, d: &DecodedInstr) {
    let write = d.rs1 != 0;
    if write && !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    let Some(old) = cpu.csr_read_checked(d.csr) else {
        return cpu.reserved_instr(d);
    };
    cpu.write_reg(d.rd, old);
    if write {
        let clear = cpu.read_reg(d.rs1);
        cpu.csr_write_checked(d.csr, old & !clear);
    }
}

// CSRRWI: t = CSR[csr]; CSR[csr] = zimm; rd = t
pub(crate) fn csrrwi(cpu: &mut CpuCore, d: &DecodedInstr) {
    if !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    if d.rd != 0 {
        let old = cpu.csr_read_checked(d.csr).unwrap_or(0);
        cpu.write_reg(d.rd, old);
    }
    cpu.csr_write_checked(d.csr, d.zimm);
}

// CSRRSI: t = CSR[csr]; CSR[csr] = t | zimm; rd = t
pub(crate) fn csrrsi(cpu: &mut CpuCore, d: &DecodedInstr) {
    let write = d.zimm != 0;
    if write && !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    let Some(old) = cpu.csr_read_checked(d.csr) else {
        return cpu.reserved_instr(d);
    };
    cpu.write_reg(d.rd, old);
    if write {
        cpu.csr_write_checked(d.csr, old | d.zimm);
    }
}

// CSRRCI: t = CSR[csr]; CSR[csr] = t & ~zimm; rd = t
pub(crate) fn csrrci(cpu: &mut CpuCore, d: &DecodedInstr) {
    let write = d.zimm != 0;
    if write && !cpu.csr_can_write(d.csr) {
        return cpu.reserved_instr(d);
    }
    let Some(old) = cpu.csr_read_checked(d.csr) else {
        return cpu.reserved_instr(d);
    };
    cpu.write_reg(d.rd, old);
    if write {
        cpu.csr_write_checked(d.csr, old & !d.zimm);
    }
}

/// MRET：从 M-mode trap handler 返回
///
/// mstatus.MIE ← MPIE，MPIE ← 1，PC ← mepc
pub(crate) fn mret(cpu: &mut CpuCore, d: &DecodedInstr) {
    if d.raw != MRET_ENCODING {
        return cpu.reserved_instr(d);
    }

    let old = cpu.csr_read(CSR_MSTATUS);
    let mut new = old;
    if mstatus::read_mpie(old) {
        new |= mstatus::MIE_MASK;
    } else {
        new &= !mstatus::MIE_MASK;
    }
    new |= mstatus::MPIE_MASK;
    cpu.status_mut().csr.force(CSR_MSTATUS, new);

    let mepc = cpu.csr_read(CSR_MEPC);
    cpu.set_pc(mepc);
}

/// WFI：暂停执行直到有中断发生
pub(crate) fn wfi(cpu: &mut CpuCore, d: &DecodedInstr) {
    if d.raw != WFI_ENCODING {
        return cpu.reserved_instr(d);
    }
    cpu.set_state(CpuState::WaitForInterrupt);
}
