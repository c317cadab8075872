//! rv32_sim CLI 入口
//!
//! 加载 RISC-V 可执行镜像并仿真执行；识别的选项与库内
//! `SimConfig` 一一对应。

use anyhow::{bail, Context};
use argh::FromArgs;

use rv32_sim::cpu::CpuState;
use rv32_sim::sim_env::{SimConfig, SimEnv, TestResult};

#[derive(FromArgs)]
/// Simulate an RV32IMF hart
struct Args {
    /// executable image (ELF, or raw binary with --bin)
    #[argh(positional)]
    image: String,

    /// treat the image as a raw binary loaded at --load-addr
    #[argh(switch, short = 'b')]
    bin: bool,

    /// load address for raw binaries (default 0)
    #[argh(option, default = "0", from_str_fn(parse_u32))]
    load_addr: u32,

    /// ISA string, e.g. rv32i, rv32im, rv32imf (default rv32imf)
    #[argh(option, short = 'i', default = "String::from(\"rv32imf\")")]
    isa: String,

    /// memory size in bytes (default 1 MiB)
    #[argh(option, short = 'm', default = "1024 * 1024")]
    mem_size: usize,

    /// memory base address (default: lowest loaded address for ELF, 0 otherwise)
    #[argh(option, from_str_fn(parse_u32))]
    mem_base: Option<u32>,

    /// reset vector override (default: ELF entry point)
    #[argh(option, from_str_fn(parse_u32))]
    reset_vector: Option<u32>,

    /// initial mtvec value for the trap vector
    #[argh(option, default = "0", from_str_fn(parse_u32))]
    mtvec: u32,

    /// timer compare value, 0 disables the timer interrupt
    #[argh(option, default = "0")]
    mtimecmp: u64,

    /// maximum instructions to execute (0 = unlimited)
    #[argh(option, short = 'n', default = "0")]
    max_instructions: u64,

    /// disassemble the image instead of executing it
    #[argh(switch, short = 'd')]
    disassemble: bool,

    /// log each retired instruction at trace level
    #[argh(switch, short = 't')]
    rt_disassem: bool,

    /// halt on a reserved instruction instead of trapping
    #[argh(switch)]
    halt_on_reserved: bool,

    /// halt on ecall/ebreak instead of trapping
    #[argh(switch)]
    halt_on_ecall: bool,

    /// dump registers after the run
    #[argh(switch)]
    dump_regs: bool,
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let (body, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };
    u32::from_str_radix(body, radix).map_err(|e| e.to_string())
}

fn build_config(args: &Args) -> anyhow::Result<SimConfig> {
    let mut config = SimConfig::new()
        .with_isa(&args.isa)
        .with_context(|| format!("bad ISA string '{}'", args.isa))?
        .with_memory_size(args.mem_size)
        .with_max_instructions(args.max_instructions)
        .with_mtvec(args.mtvec)
        .with_mtimecmp(args.mtimecmp);

    config.disassemble = args.disassemble;
    config.rt_disassem = args.rt_disassem;
    config.halt_on_reserved = args.halt_on_reserved;
    config.halt_on_ecall = args.halt_on_ecall;

    if let Some(pc) = args.reset_vector {
        config = config.with_reset_vector(pc);
    }

    if args.bin {
        config = config.with_bin_path(&args.image, args.load_addr);
        if let Some(base) = args.mem_base {
            config = config.with_memory_base(base);
        }
    } else {
        config = config.with_elf_path(&args.image);
        // ELF 的内存区域缺省覆盖最低加载地址
        let base = match args.mem_base {
            Some(base) => base,
            None => {
                let elf = rv32_sim::sim_env::ElfInfo::parse(&args.image)
                    .with_context(|| format!("failed to parse {}", args.image))?;
                elf.address_range().map(|(lo, _)| lo).unwrap_or(0)
            }
        };
        config = config.with_memory_base(base);
    }

    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = build_config(&args)?;
    let mut env = SimEnv::from_config(config).context("failed to set up simulation")?;

    if args.disassemble {
        let stdout = std::io::stdout();
        env.disassemble_to(&mut stdout.lock())?;
        return Ok(());
    }

    // HTIF 测试镜像走 tohost 协议，其余运行到停机或预算耗尽
    if env.tohost_addr.is_some() {
        let (result, executed) = env.run_isa_test(args.max_instructions);
        println!("executed {} instructions", executed);
        match result {
            TestResult::Pass => println!("PASS"),
            TestResult::Fail(n) => {
                if args.dump_regs {
                    env.dump();
                }
                bail!("FAIL at test #{}", n);
            }
            TestResult::Timeout => {
                if args.dump_regs {
                    env.dump();
                }
                bail!("TIMEOUT after {} instructions", executed);
            }
        }
    } else {
        let (executed, state) = env.run_until_halt();
        println!("executed {} instructions, final state: {:?}", executed, state);
        if let CpuState::IllegalInstruction(raw) = state {
            bail!(
                "illegal instruction 0x{:08x} at pc=0x{:08x}",
                raw,
                env.cpu.pc()
            );
        }
    }

    if args.dump_regs {
        env.dump();
    }
    Ok(())
}
