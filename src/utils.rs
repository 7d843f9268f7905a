//! 工具函数模块
//!
//! 此模块包含了项目中使用的各种工具函数：
//! - 文件名处理工具（扩展名拆分、Content-Type 猜测）

pub mod path;
