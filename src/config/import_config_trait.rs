// ==========================================
// 健康追踪系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::ApplyMode;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ImportConfigReader: Send + Sync {
    /// 获取写入模式
    ///
    /// # 返回
    /// - ApplyMode::BestEffort: 单行失败不影响其他行
    /// - ApplyMode::Atomic: 任一行失败整批回滚
    ///
    /// # 默认值
    /// - best_effort
    fn get_apply_mode(&self) -> Result<ApplyMode, Box<dyn Error>>;

    /// 获取计划数据的默认来源标记
    ///
    /// # 默认值
    /// - manual（最长 80 字符）
    fn get_default_source_tag(&self) -> Result<String, Box<dyn Error>>;

    /// 获取上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 5 MiB
    fn get_max_file_bytes(&self) -> Result<usize, Box<dyn Error>>;
}
