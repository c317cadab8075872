//! rv32_sim: 单 hart RV32IMF 指令集仿真库
//!
//! 本库实现了一个功能正确、结构清晰、易扩展的单线程 RV32IMF 仿真引擎。
//! 解码采用多级查找表（primary → funct3 → funct7 → rm），各扩展通过
//! 覆盖（overlay）表项的方式安装，基础表结构保持不变。
//!
//! # 模块结构
//!
//! - `isa`: 指令字段提取、多级解码表与反汇编
//! - `cpu`: hart 核心、执行单元与运行循环
//! - `memory`: 内存抽象层（内部 RAM + 外部访问回调）
//! - `sim_env`: 仿真环境（配置、ELF 加载、初始化）

pub mod cpu;
pub mod isa;
pub mod memory;
pub mod sim_env;
