//! RV32M（乘除法）执行单元
//!
//! 宽度与符号语义全部显式写出：32×32→64 的乘法先把操作数按变体
//! 各自扩展到 64 位。除法遵循 RISC-V 规范的角落行为，不产生任何
//! 算术异常。

use crate::cpu::CpuCore;
use crate::isa::fields::DecodedInstr;

pub(crate) fn mul(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1);
    let b = cpu.read_reg(d.rs2);
    cpu.write_reg(d.rd, a.wrapping_mul(b));
}

pub(crate) fn mulh(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1) as i32 as i64;
    let b = cpu.read_reg(d.rs2) as i32 as i64;
    cpu.write_reg(d.rd, ((a * b) >> 32) as u32);
}

pub(crate) fn mulhsu(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1) as i32 as i64;
    let b = cpu.read_reg(d.rs2) as u64 as i64;
    cpu.write_reg(d.rd, ((a * b) >> 32) as u32);
}

pub(crate) fn mulhu(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1) as u64;
    let b = cpu.read_reg(d.rs2) as u64;
    cpu.write_reg(d.rd, ((a * b) >> 32) as u32);
}

pub(crate) fn div(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1) as i32;
    let b = cpu.read_reg(d.rs2) as i32;
    let result = if b == 0 {
        // 除零：商为全 1
        -1i32 as u32
    } else if a == i32::MIN && b == -1 {
        // 有符号溢出：商为被除数
        a as u32
    } else {
        (a / b) as u32
    };
    cpu.write_reg(d.rd, result);
}

pub(crate) fn divu(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1);
    let b = cpu.read_reg(d.rs2);
    cpu.write_reg(d.rd, if b == 0 { u32::MAX } else { a / b });
}

pub(crate) fn rem(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1) as i32;
    let b = cpu.read_reg(d.rs2) as i32;
    let result = if b == 0 {
        // 除零：余数为被除数
        a as u32
    } else if a == i32::MIN && b == -1 {
        0
    } else {
        (a % b) as u32
    };
    cpu.write_reg(d.rd, result);
}

pub(crate) fn remu(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_reg(d.rs1);
    let b = cpu.read_reg(d.rs2);
    cpu.write_reg(d.rd, if b == 0 { a } else { a % b });
}

#[cfg(test)]
mod tests {
    use crate::cpu::{CpuBuilder, CpuCore};
    use crate::memory::Memory;

    fn cpu_m() -> CpuCore {
        CpuBuilder::new(0).with_m_extension().build()
    }

    fn exec(cpu: &mut CpuCore, raw: u32) {
        let pc = cpu.pc();
        cpu.bus_mut().ram_mut().store32(pc, raw).unwrap();
        cpu.step();
    }

    #[test]
    fn test_div_overflow() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 0x8000_0000);
        cpu.write_reg(6, 0xFFFF_FFFF);
        exec(&mut cpu, 0x0262C3B3); // div x7, x5, x6
        assert_eq!(cpu.read_reg(7), 0x8000_0000);
        assert_eq!(cpu.pc(), 4);
    }

    #[test]
    fn test_div_rem_by_zero() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 0x1234_5678);
        cpu.write_reg(6, 0);
        exec(&mut cpu, 0x0262C3B3); // div x7, x5, x6
        assert_eq!(cpu.read_reg(7), 0xFFFF_FFFF);
        exec(&mut cpu, 0x0262E3B3); // rem x7, x5, x6
        assert_eq!(cpu.read_reg(7), 0x1234_5678);
    }

    #[test]
    fn test_rem_overflow() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 0x8000_0000);
        cpu.write_reg(6, 0xFFFF_FFFF);
        exec(&mut cpu, 0x0262E3B3); // rem x7, x5, x6
        assert_eq!(cpu.read_reg(7), 0);
    }

    #[test]
    fn test_divu_remu_by_zero() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 42);
        cpu.write_reg(6, 0);
        exec(&mut cpu, 0x0262D3B3); // divu x7, x5, x6
        assert_eq!(cpu.read_reg(7), u32::MAX);
        exec(&mut cpu, 0x0262F3B3); // remu x7, x5, x6
        assert_eq!(cpu.read_reg(7), 42);
    }

    #[test]
    fn test_mulh_variants() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 0xFFFF_FFFF); // -1
        cpu.write_reg(6, 0xFFFF_FFFF); // -1
        exec(&mut cpu, 0x026293B3); // mulh x7, x5, x6 → (-1 * -1) 高 32 位 = 0
        assert_eq!(cpu.read_reg(7), 0);
        exec(&mut cpu, 0x0262B3B3); // mulhu x7, x5, x6 → 高 32 位 = 0xFFFFFFFE
        assert_eq!(cpu.read_reg(7), 0xFFFF_FFFE);
        exec(&mut cpu, 0x0262A3B3); // mulhsu x7, x5, x6 → (-1) * 0xFFFFFFFF
        assert_eq!(cpu.read_reg(7), 0xFFFF_FFFF);
    }

    #[test]
    fn test_mul_low_word() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 0x1234_5678);
        cpu.write_reg(6, 0x1000);
        exec(&mut cpu, 0x026283B3); // mul x7, x5, x6
        assert_eq!(cpu.read_reg(7), 0x4567_8000);
    }

    #[test]
    fn test_div_basic() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, 17);
        cpu.write_reg(6, 5);
        exec(&mut cpu, 0x0262C3B3); // div x7, x5, x6
        assert_eq!(cpu.read_reg(7), 3);
        exec(&mut cpu, 0x0262E3B3); // rem x7, x5, x6
        assert_eq!(cpu.read_reg(7), 2);
    }

    #[test]
    fn test_div_negative() {
        let mut cpu = cpu_m();
        cpu.write_reg(5, (-17i32) as u32);
        cpu.write_reg(6, 5);
        exec(&mut cpu, 0x0262C3B3); // div（向零取整）
        assert_eq!(cpu.read_reg(7) as i32, -3);
        exec(&mut cpu, 0x0262E3B3); // rem（符号随被除数）
        assert_eq!(cpu.read_reg(7) as i32, -2);
    }
}
