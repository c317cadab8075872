//! RV32F（单精度浮点）执行单元
//!
//! 全部算术在软件 IEEE-754 binary32 上求值（simple_soft_float），
//! 每个操作带显式舍入模式，标志从 FPState 读回后累积到 FFLAGS/FCSR，
//! 不触碰宿主 FPU 状态。
//!
//! 寄存器读写经过 NaN-box 检查：写入把 binary32 装箱到 64-bit 槽位
//! 高半全 1，读取遇到未正确装箱的槽位得到规范 qNaN。FMV/FSW 按原始
//! 位模式搬运低 32 位，不做解释。

use simple_soft_float::{FPState, RoundingMode, StatusFlags, F32};

use crate::cpu::csr_def::{FFLAGS_DZ, FFLAGS_NV, FFLAGS_NX, FFLAGS_OF, FFLAGS_UF};
use crate::cpu::CpuCore;
use crate::isa::fields::DecodedInstr;

/// 规范 NaN（Canonical NaN）
const CANONICAL_NAN: u32 = 0x7FC0_0000;

/// 解析生效的舍入模式：rm = 0b111 (DYN) 时取 frm，非法值返回 None
#[inline]
fn effective_rounding(cpu: &CpuCore, instr_rm: u8) -> Option<RoundingMode> {
    let rm = if instr_rm == 0b111 {
        cpu.frm() as u8
    } else {
        instr_rm
    };

    match rm {
        0b000 => Some(RoundingMode::TiesToEven),
        0b001 => Some(RoundingMode::TowardZero),
        0b010 => Some(RoundingMode::TowardNegative),
        0b011 => Some(RoundingMode::TowardPositive),
        0b100 => Some(RoundingMode::TiesToAway),
        _ => None,
    }
}

/// 把软浮点状态里的 IEEE 标志累积到 FFLAGS（粘滞）
#[inline]
fn apply_fp_state(cpu: &mut CpuCore, fp_state: &FPState) {
    let flags = fp_state.status_flags;
    let mut bits = 0;
    if flags.contains(StatusFlags::INVALID_OPERATION) {
        bits |= FFLAGS_NV;
    }
    if flags.contains(StatusFlags::DIVISION_BY_ZERO) {
        bits |= FFLAGS_DZ;
    }
    if flags.contains(StatusFlags::OVERFLOW) {
        bits |= FFLAGS_OF;
    }
    if flags.contains(StatusFlags::UNDERFLOW) {
        bits |= FFLAGS_UF;
    }
    if flags.contains(StatusFlags::INEXACT) {
        bits |= FFLAGS_NX;
    }
    cpu.status_mut().accrue_fflags(bits);
}

#[inline]
fn set_fflags(cpu: &mut CpuCore, bits: u32) {
    cpu.status_mut().accrue_fflags(bits);
}

#[inline]
fn read_soft(cpu: &CpuCore, reg: u8) -> F32 {
    F32::from_bits(cpu.read_fp_bits32(reg))
}

#[inline]
fn write_soft(cpu: &mut CpuCore, reg: u8, value: F32) {
    cpu.write_fp_bits32(reg, value.into_bits());
}

#[inline]
fn is_signaling_nan_bits(bits: u32) -> bool {
    let exp = bits & 0x7F80_0000;
    let frac = bits & 0x007F_FFFF;
    exp == 0x7F80_0000 && frac != 0 && (frac & 0x0040_0000) == 0
}

// ========== Load/Store ==========

pub(crate) fn flw(cpu: &mut CpuCore, d: &DecodedInstr) {
    let addr = cpu.read_reg(d.rs1).wrapping_add(d.imm_i as u32);
    if let Some(value) = cpu.mem_load32(addr) {
        cpu.write_fp_bits32(d.rd, value);
    }
}

pub(crate) fn fsw(cpu: &mut CpuCore, d: &DecodedInstr) {
    let addr = cpu.read_reg(d.rs1).wrapping_add(d.imm_s as u32);
    // 原始位模式的低 32 位，不经解箱
    let value = cpu.read_fp_raw(d.rs2) as u32;
    cpu.mem_store32(addr, value);
}

// ========== 算术 ==========

pub(crate) fn fadds(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    let result = a.add(&b, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fsubs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    let result = a.sub(&b, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fmuls(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    let result = a.mul(&b, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fdivs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    let result = a.div(&b, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fsqrts(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let mut fp_state = FPState::default();
    let result = a.sqrt(Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

// ========== 融合乘加（末端单次舍入，rs3 为第三操作数）==========

/// R4 编码的 fmt 字段（funct7 低 2 位）；非 00 属于 D 等其他精度，保留
#[inline]
fn r4_fmt_ok(d: &DecodedInstr) -> bool {
    d.funct7 & 0x3 == 0
}

pub(crate) fn fmadds(cpu: &mut CpuCore, d: &DecodedInstr) {
    if !r4_fmt_ok(d) {
        return cpu.reserved_instr(d);
    }
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let c = read_soft(cpu, d.rs3);
    let mut fp_state = FPState::default();
    // fmadd: a * b + c
    let result = a.fused_mul_add(&b, &c, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fmsubs(cpu: &mut CpuCore, d: &DecodedInstr) {
    if !r4_fmt_ok(d) {
        return cpu.reserved_instr(d);
    }
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let c = read_soft(cpu, d.rs3);
    let mut fp_state = FPState::default();
    // fmsub: a * b - c = a * b + (-c)
    let mut neg_c = c.clone();
    neg_c.toggle_sign();
    let result = a.fused_mul_add(&b, &neg_c, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fnmsubs(cpu: &mut CpuCore, d: &DecodedInstr) {
    if !r4_fmt_ok(d) {
        return cpu.reserved_instr(d);
    }
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let c = read_soft(cpu, d.rs3);
    let mut fp_state = FPState::default();
    // fnmsub: -(a * b) + c = (-a) * b + c
    let mut neg_a = a.clone();
    neg_a.toggle_sign();
    let result = neg_a.fused_mul_add(&b, &c, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

pub(crate) fn fnmadds(cpu: &mut CpuCore, d: &DecodedInstr) {
    if !r4_fmt_ok(d) {
        return cpu.reserved_instr(d);
    }
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let c = read_soft(cpu, d.rs3);
    let mut fp_state = FPState::default();
    // fnmadd: -(a * b) - c = (-a) * b + (-c)
    let mut neg_a = a.clone();
    neg_a.toggle_sign();
    let mut neg_c = c.clone();
    neg_c.toggle_sign();
    let result = neg_a.fused_mul_add(&b, &neg_c, Some(rounding), Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    write_soft(cpu, d.rd, result);
}

// ========== 符号注入（幅值总是来自 rs1）==========

pub(crate) fn fsgnjs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_fp_bits32(d.rs1);
    let b = cpu.read_fp_bits32(d.rs2);
    cpu.write_fp_bits32(d.rd, (a & 0x7FFF_FFFF) | (b & 0x8000_0000));
}

pub(crate) fn fsgnjns(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_fp_bits32(d.rs1);
    let b = cpu.read_fp_bits32(d.rs2);
    cpu.write_fp_bits32(d.rd, (a & 0x7FFF_FFFF) | (!b & 0x8000_0000));
}

pub(crate) fn fsgnjxs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = cpu.read_fp_bits32(d.rs1);
    let b = cpu.read_fp_bits32(d.rs2);
    cpu.write_fp_bits32(d.rd, a ^ (b & 0x8000_0000));
}

// ========== 最小/最大 ==========

fn min_max(cpu: &mut CpuCore, d: &DecodedInstr, is_min: bool) {
    let a_bits = cpu.read_fp_bits32(d.rs1);
    let b_bits = cpu.read_fp_bits32(d.rs2);
    let a = f32::from_bits(a_bits);
    let b = f32::from_bits(b_bits);

    let mut flag_bits = 0;
    if is_signaling_nan_bits(a_bits) || is_signaling_nan_bits(b_bits) {
        flag_bits |= FFLAGS_NV;
    }

    let result_bits = if a.is_nan() && b.is_nan() {
        CANONICAL_NAN
    } else if a.is_nan() {
        b_bits
    } else if b.is_nan() {
        a_bits
    } else if a == 0.0 && b == 0.0 {
        // -0 严格小于 +0：min 取或（任一为 -0 即 -0），max 取与
        if is_min {
            a_bits | b_bits
        } else {
            a_bits & b_bits
        }
    } else if a_bits == b_bits {
        a_bits
    } else {
        let choose_a = if is_min { a < b } else { a > b };
        if choose_a {
            a_bits
        } else {
            b_bits
        }
    };

    cpu.write_fp_bits32(d.rd, result_bits);

    if flag_bits != 0 {
        set_fflags(cpu, flag_bits);
    }
}

pub(crate) fn fmins(cpu: &mut CpuCore, d: &DecodedInstr) {
    min_max(cpu, d, true);
}

pub(crate) fn fmaxs(cpu: &mut CpuCore, d: &DecodedInstr) {
    min_max(cpu, d, false);
}

// ========== 比较（结果写整数寄存器）==========

pub(crate) fn feqs(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    // quiet 比较只对 signaling NaN 报 NV
    let result = a.compare_quiet(&b, Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    let eq = result == Some(std::cmp::Ordering::Equal);
    cpu.write_reg(d.rd, eq as u32);
}

pub(crate) fn flts(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    // signaling 比较对任何 NaN 报 NV
    let result = a.compare_signaling(&b, Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    let lt = result == Some(std::cmp::Ordering::Less);
    cpu.write_reg(d.rd, lt as u32);
}

pub(crate) fn fles(cpu: &mut CpuCore, d: &DecodedInstr) {
    let a = read_soft(cpu, d.rs1);
    let b = read_soft(cpu, d.rs2);
    let mut fp_state = FPState::default();
    let result = a.compare_signaling(&b, Some(&mut fp_state));
    apply_fp_state(cpu, &fp_state);
    let le = matches!(
        result,
        Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
    );
    cpu.write_reg(d.rd, le as u32);
}

// ========== 分类 ==========

/// 10-bit one-hot 分类掩码
fn fclass_bits(bits: u32) -> u32 {
    let sign = bits >> 31;
    let exp = (bits >> 23) & 0xFF;
    let frac = bits & 0x007F_FFFF;

    if exp == 0xFF {
        if frac == 0 {
            if sign == 0 {
                1 << 7 // +inf
            } else {
                1 << 0 // -inf
            }
        } else if frac & 0x0040_0000 != 0 {
            1 << 9 // quiet NaN
        } else {
            1 << 8 // signaling NaN
        }
    } else if exp == 0 {
        if frac == 0 {
            if sign == 0 {
                1 << 4 // +0
            } else {
                1 << 3 // -0
            }
        } else if sign == 0 {
            1 << 5 // +subnormal
        } else {
            1 << 2 // -subnormal
        }
    } else if sign == 0 {
        1 << 6 // +normal
    } else {
        1 << 1 // -normal
    }
}

pub(crate) fn fclasss(cpu: &mut CpuCore, d: &DecodedInstr) {
    let bits = cpu.read_fp_bits32(d.rs1);
    cpu.write_reg(d.rd, fclass_bits(bits));
}

// ========== 类型转换：浮点 → 整数（rs2 区分 W/WU）==========

pub(crate) fn fcvt_ws(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    let value = read_soft(cpu, d.rs1);
    let bits = value.clone().into_bits();
    let exp = (bits >> 23) & 0xFF;
    let frac = bits & 0x007F_FFFF;
    let is_nan = exp == 0xFF && frac != 0;
    let is_neg = (bits & 0x8000_0000) != 0;

    match d.rs2 {
        0 => {
            // FCVT.W.S
            let mut fp_state = FPState::default();
            let result = value.to_i32(true, Some(rounding), Some(&mut fp_state));
            apply_fp_state(cpu, &fp_state);
            // 溢出/无效时按规范饱和
            let int_result = result.unwrap_or(if is_nan || !is_neg {
                i32::MAX
            } else {
                i32::MIN
            });
            cpu.write_reg(d.rd, int_result as u32);
        }
        1 => {
            // FCVT.WU.S
            let mut fp_state = FPState::default();
            let result = value.to_u32(true, Some(rounding), Some(&mut fp_state));
            apply_fp_state(cpu, &fp_state);
            let int_result = result.unwrap_or(if is_nan || !is_neg { u32::MAX } else { 0 });
            cpu.write_reg(d.rd, int_result);
        }
        _ => cpu.reserved_instr(d),
    }
}

// ========== 类型转换：整数 → 浮点（rs2 区分 W/WU）==========

pub(crate) fn fcvt_sw(cpu: &mut CpuCore, d: &DecodedInstr) {
    let Some(rounding) = effective_rounding(cpu, d.rm) else {
        return cpu.reserved_instr(d);
    };
    match d.rs2 {
        0 => {
            let value = cpu.read_reg(d.rs1) as i32;
            let mut fp_state = FPState::default();
            let result = F32::from_i32(value, Some(rounding), Some(&mut fp_state));
            apply_fp_state(cpu, &fp_state);
            write_soft(cpu, d.rd, result);
        }
        1 => {
            let value = cpu.read_reg(d.rs1);
            let mut fp_state = FPState::default();
            let result = F32::from_u32(value, Some(rounding), Some(&mut fp_state));
            apply_fp_state(cpu, &fp_state);
            write_soft(cpu, d.rd, result);
        }
        _ => cpu.reserved_instr(d),
    }
}

// ========== 位模式移动（不做解释）==========

pub(crate) fn fmv_xw(cpu: &mut CpuCore, d: &DecodedInstr) {
    let value = cpu.read_fp_raw(d.rs1) as u32;
    cpu.write_reg(d.rd, value);
}

pub(crate) fn fmv_wx(cpu: &mut CpuCore, d: &DecodedInstr) {
    let value = cpu.read_reg(d.rs1);
    cpu.write_fp_bits32(d.rd, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::csr_def::*;
    use crate::cpu::{CpuBuilder, CpuCore};
    use crate::memory::Memory;

    fn cpu_f() -> CpuCore {
        let mut cpu = CpuBuilder::new(0).with_f_extension().build();
        cpu.csr_write(CSR_MTVEC, 0x400);
        cpu
    }

    fn exec(cpu: &mut CpuCore, raw: u32) {
        let pc = cpu.pc();
        cpu.bus_mut().ram_mut().store32(pc, raw).unwrap();
        cpu.step();
    }

    /// fadd.s f3, f1, f2（rm=rne）
    const FADD_S_F3_F1_F2: u32 = 0x002081D3;
    /// fdiv.s f3, f1, f2（rm=rne）
    const FDIV_S_F3_F1_F2: u32 = 0x182081D3;
    /// fcvt.w.s x5, f1, rtz
    const FCVT_W_S_X5_F1_RTZ: u32 = 0xC00092D3;
    /// fcvt.wu.s x5, f1, rtz
    const FCVT_WU_S_X5_F1_RTZ: u32 = 0xC01092D3;
    /// fcvt.s.w f1, x5（rm=rne）
    const FCVT_S_W_F1_X5: u32 = 0xD00280D3;
    /// fmv.w.x f1, x5
    const FMV_W_X_F1_X5: u32 = 0xF00280D3;
    /// fmv.x.w x6, f1
    const FMV_X_W_X6_F1: u32 = 0xE0008353;

    #[test]
    fn test_fadd_s() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 2.0);
        exec(&mut cpu, FADD_S_F3_F1_F2);
        assert_eq!(cpu.read_fp_f32(3), 3.0);
        assert_eq!(cpu.csr_read(CSR_FFLAGS), 0, "精确加法不产生标志");
    }

    #[test]
    fn test_fsub_fmul() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 5.0);
        cpu.write_fp_f32(2, 3.0);
        exec(&mut cpu, 0x082081D3); // fsub.s f3, f1, f2
        assert_eq!(cpu.read_fp_f32(3), 2.0);
        exec(&mut cpu, 0x102081D3); // fmul.s f3, f1, f2
        assert_eq!(cpu.read_fp_f32(3), 15.0);
    }

    #[test]
    fn test_fdiv_by_zero_sets_dz() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 0.0);
        exec(&mut cpu, FDIV_S_F3_F1_F2);
        assert_eq!(cpu.read_fp_f32(3), f32::INFINITY);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_DZ, 0);
        // FCSR 低 5 位与 FFLAGS 同步
        assert_eq!(cpu.csr_read(CSR_FCSR) & 0x1F, cpu.csr_read(CSR_FFLAGS));
    }

    #[test]
    fn test_fsqrt() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 16.0);
        exec(&mut cpu, 0x580081D3); // fsqrt.s f3, f1
        assert_eq!(cpu.read_fp_f32(3), 4.0);
    }

    #[test]
    fn test_fsqrt_negative_sets_nv() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, -4.0);
        exec(&mut cpu, 0x580081D3);
        assert!(cpu.read_fp_f32(3).is_nan());
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);
    }

    #[test]
    fn test_fused_family() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 2.0);
        cpu.write_fp_f32(2, 3.0);
        cpu.write_fp_f32(3, 1.0);
        // fmadd.s f4, f1, f2, f3 → 2*3+1 = 7
        exec(&mut cpu, 0x18208243);
        assert_eq!(cpu.read_fp_f32(4), 7.0);
        // fmsub.s f4, f1, f2, f3 → 2*3-1 = 5
        exec(&mut cpu, 0x18208247);
        assert_eq!(cpu.read_fp_f32(4), 5.0);
        // fnmsub.s f4, f1, f2, f3 → -(2*3)+1 = -5
        exec(&mut cpu, 0x1820824B);
        assert_eq!(cpu.read_fp_f32(4), -5.0);
        // fnmadd.s f4, f1, f2, f3 → -(2*3)-1 = -7
        exec(&mut cpu, 0x1820824F);
        assert_eq!(cpu.read_fp_f32(4), -7.0);
    }

    #[test]
    fn test_fsgnj_corner() {
        let mut cpu = cpu_f();
        cpu.write_fp_bits32(1, 0xBFC0_0000); // -1.5
        cpu.write_fp_bits32(2, 0x4000_0000); // +2.0
        exec(&mut cpu, 0x202081D3); // fsgnj.s f3, f1, f2
        assert_eq!(cpu.read_fp_bits32(3), 0x3FC0_0000); // +1.5
        exec(&mut cpu, 0x202091D3); // fsgnjn.s f3, f1, f2
        assert_eq!(cpu.read_fp_bits32(3), 0xBFC0_0000); // -1.5
        exec(&mut cpu, 0x2020A1D3); // fsgnjx.s f3, f1, f2
        assert_eq!(cpu.read_fp_bits32(3), 0xBFC0_0000); // -1.5
    }

    #[test]
    fn test_fmin_fmax_basic() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 5.0);
        exec(&mut cpu, 0x282081D3); // fmin.s f3, f1, f2
        assert_eq!(cpu.read_fp_f32(3), 1.0);
        exec(&mut cpu, 0x282091D3); // fmax.s f3, f1, f2
        assert_eq!(cpu.read_fp_f32(3), 5.0);
    }

    #[test]
    fn test_fmin_fmax_zero_signs() {
        let mut cpu = cpu_f();
        cpu.write_fp_bits32(1, 0x0000_0000); // +0
        cpu.write_fp_bits32(2, 0x8000_0000); // -0
        exec(&mut cpu, 0x282081D3); // fmin → -0
        assert_eq!(cpu.read_fp_bits32(3), 0x8000_0000);
        exec(&mut cpu, 0x282091D3); // fmax → +0
        assert_eq!(cpu.read_fp_bits32(3), 0x0000_0000);
    }

    #[test]
    fn test_fmin_fmax_nan_rules() {
        let mut cpu = cpu_f();
        cpu.write_fp_bits32(1, 0x7FC0_0001); // qNaN
        cpu.write_fp_f32(2, 2.5);
        exec(&mut cpu, 0x282081D3); // fmin → 另一个操作数
        assert_eq!(cpu.read_fp_f32(3), 2.5);
        assert_eq!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0, "qNaN 不报 NV");

        cpu.write_fp_bits32(2, 0x7FC0_0002); // 两个都是 NaN
        exec(&mut cpu, 0x282081D3);
        assert_eq!(cpu.read_fp_bits32(3), 0x7FC0_0000, "规范 qNaN");

        // signaling NaN 报 NV
        cpu.write_fp_bits32(1, 0x7F80_0001); // sNaN
        cpu.write_fp_f32(2, 1.0);
        exec(&mut cpu, 0x282081D3);
        assert_eq!(cpu.read_fp_f32(3), 1.0);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);
    }

    #[test]
    fn test_compare_nan_signalling() {
        let mut cpu = cpu_f();
        cpu.write_fp_bits32(1, 0x7FC0_0000); // qNaN
        cpu.write_fp_f32(2, 1.0);

        // feq.s x5, f1, f2: qNaN → 0，不报 NV
        exec(&mut cpu, 0xA020A2D3);
        assert_eq!(cpu.read_reg(5), 0);
        assert_eq!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);

        // flt.s x5, f1, f2: qNaN → 0，报 NV
        exec(&mut cpu, 0xA02092D3);
        assert_eq!(cpu.read_reg(5), 0);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);
    }

    #[test]
    fn test_compare_ordering() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 2.0);
        exec(&mut cpu, 0xA02092D3); // flt.s x5, f1, f2
        assert_eq!(cpu.read_reg(5), 1);
        exec(&mut cpu, 0xA02082D3); // fle.s x5, f1, f2
        assert_eq!(cpu.read_reg(5), 1);
        exec(&mut cpu, 0xA020A2D3); // feq.s x5, f1, f2
        assert_eq!(cpu.read_reg(5), 0);
        cpu.write_fp_f32(2, 1.0);
        exec(&mut cpu, 0xA020A2D3); // feq.s（相等）
        assert_eq!(cpu.read_reg(5), 1);
    }

    #[test]
    fn test_fclass_one_hot() {
        let mut cpu = cpu_f();
        let cases: &[(u32, u32)] = &[
            (0xFF80_0000, 1 << 0), // -inf
            (0xBFC0_0000, 1 << 1), // -normal
            (0x8000_0001, 1 << 2), // -subnormal
            (0x8000_0000, 1 << 3), // -0
            (0x0000_0000, 1 << 4), // +0
            (0x0000_0001, 1 << 5), // +subnormal
            (0x3FC0_0000, 1 << 6), // +normal
            (0x7F80_0000, 1 << 7), // +inf
            (0x7F80_0001, 1 << 8), // sNaN
            (0x7FC0_0000, 1 << 9), // qNaN
        ];
        for &(bits, expect) in cases {
            cpu.write_fp_bits32(1, bits);
            exec(&mut cpu, 0xE00092D3); // fclass.s x5, f1
            assert_eq!(cpu.read_reg(5), expect, "fclass(0x{:08x})", bits);
        }
    }

    #[test]
    fn test_fcvt_w_s_rtz_truncates() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 3.7);
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5), 3);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NX, 0, "不精确转换报 NX");

        cpu.write_fp_f32(1, -3.7);
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5) as i32, -3);
    }

    #[test]
    fn test_fcvt_w_s_rne() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 42.7);
        exec(&mut cpu, 0xC00082D3); // fcvt.w.s x5, f1, rne
        assert_eq!(cpu.read_reg(5), 43);
    }

    #[test]
    fn test_fcvt_w_s_saturates_with_nv() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 3.0e9); // 超出 i32
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5) as i32, i32::MAX);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);

        cpu.csr_write(CSR_FCSR, 0); // 清标志
        cpu.write_fp_f32(1, -3.0e9);
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5) as i32, i32::MIN);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);

        cpu.csr_write(CSR_FCSR, 0);
        cpu.write_fp_bits32(1, 0x7FC0_0000); // NaN → i32::MAX
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5) as i32, i32::MAX);
    }

    #[test]
    fn test_fcvt_wu_s_negative_saturates_zero() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, -2.0);
        exec(&mut cpu, FCVT_WU_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5), 0);
        assert_ne!(cpu.csr_read(CSR_FFLAGS) & FFLAGS_NV, 0);
    }

    #[test]
    fn test_fcvt_s_w_roundtrip() {
        let mut cpu = cpu_f();
        cpu.write_reg(5, (-42i32) as u32);
        exec(&mut cpu, FCVT_S_W_F1_X5);
        assert_eq!(cpu.read_fp_f32(1), -42.0);
        exec(&mut cpu, FCVT_W_S_X5_F1_RTZ);
        assert_eq!(cpu.read_reg(5) as i32, -42);
    }

    #[test]
    fn test_fcvt_s_wu() {
        let mut cpu = cpu_f();
        cpu.write_reg(5, 0xFFFF_FFFF);
        exec(&mut cpu, 0xD01280D3); // fcvt.s.wu f1, x5
        assert_eq!(cpu.read_fp_f32(1), 4294967296.0); // 舍入到 2^32
    }

    #[test]
    fn test_fmv_roundtrip_preserves_nan_payload() {
        let mut cpu = cpu_f();
        let payload = 0x7FC1_2345; // 带负载的 qNaN
        cpu.write_reg(5, payload);
        exec(&mut cpu, FMV_W_X_F1_X5);
        assert_eq!(cpu.read_fp_raw(1), 0xFFFF_FFFF_0000_0000 | payload as u64);
        exec(&mut cpu, FMV_X_W_X6_F1);
        assert_eq!(cpu.read_reg(6), payload, "位模式精确保持");
        assert_eq!(cpu.csr_read(CSR_FFLAGS), 0, "移动不产生标志");
    }

    #[test]
    fn test_flw_fsw() {
        let mut cpu = cpu_f();
        let pi_bits = std::f32::consts::PI.to_bits();
        cpu.bus_mut().ram_mut().store32(0x100, pi_bits).unwrap();
        cpu.write_reg(1, 0x100);
        cpu.write_reg(2, 0x200);
        exec(&mut cpu, 0x0000A107); // flw f2, 0(x1)
        assert_eq!(cpu.read_fp_bits32(2), pi_bits);
        exec(&mut cpu, 0x00212027); // fsw f2, 0(x2)
        assert_eq!(cpu.bus_mut().ram_mut().load32(0x200).unwrap(), pi_bits);
    }

    #[test]
    fn test_dyn_rounding_uses_frm() {
        let mut cpu = cpu_f();
        cpu.csr_write(CSR_FRM, 0b010); // RDN
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_bits32(2, 0x3380_0000); // 2^-24：1 + 2^-24 不可表示
        // fadd.s f3, f1, f2, dyn → 向负无穷舍入得 1.0
        exec(&mut cpu, 0x0020F1D3);
        assert_eq!(cpu.read_fp_f32(3), 1.0);

        cpu.csr_write(CSR_FRM, 0b011); // RUP
        exec(&mut cpu, 0x0020F1D3); // 向正无穷舍入得 1.0 的下一个数
        assert_eq!(cpu.read_fp_bits32(3), 0x3F80_0001);
    }

    #[test]
    fn test_r4_other_precision_is_reserved() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 1.0);
        cpu.write_fp_f32(3, 1.0);
        // fmadd 的 fmt=01（双精度空间，仅为钩子）
        exec(&mut cpu, 0x1A208243);
        assert_eq!(cpu.pc(), 0x400);
        assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    }

    #[test]
    fn test_reserved_rm_is_illegal() {
        let mut cpu = cpu_f();
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 1.0);
        // fadd.s f3, f1, f2, rm=101（保留）
        exec(&mut cpu, 0x0020D1D3);
        assert_eq!(cpu.pc(), 0x400, "保留 rm 走非法指令 trap");
        assert_eq!(cpu.csr_read(CSR_MCAUSE), 2);
    }

    #[test]
    fn test_dyn_with_invalid_frm_is_illegal() {
        let mut cpu = cpu_f();
        cpu.csr_write(CSR_FRM, 0b101); // 无效的动态模式
        cpu.write_fp_f32(1, 1.0);
        cpu.write_fp_f32(2, 1.0);
        exec(&mut cpu, 0x0020F1D3); // fadd.s dyn
        assert_eq!(cpu.pc(), 0x400);
    }

    #[test]
    fn test_unboxed_slot_reads_canonical_nan() {
        let mut cpu = cpu_f();
        // 复位后槽位为全 0：未装箱，算术视其为规范 qNaN
        cpu.write_fp_f32(2, 1.0);
        exec(&mut cpu, FADD_S_F3_F1_F2); // f1 未初始化
        assert!(cpu.read_fp_f32(3).is_nan());
    }

    #[test]
    fn test_overflow_sets_of_nx() {
        let mut cpu = cpu_f();
        cpu.write_fp_bits32(1, 0x7F7F_FFFF); // f32::MAX
        cpu.write_fp_bits32(2, 0x7F7F_FFFF);
        exec(&mut cpu, 0x102081D3); // fmul.s f3, f1, f2
        assert_eq!(cpu.read_fp_f32(3), f32::INFINITY);
        let fflags = cpu.csr_read(CSR_FFLAGS);
        assert_ne!(fflags & FFLAGS_OF, 0);
        assert_ne!(fflags & FFLAGS_NX, 0);
    }
}
