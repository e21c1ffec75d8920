// ==========================================
// 健康追踪系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 仅文件级错误; 行级问题以 RowOutcome 返回
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("CSV 为空或缺少表头")]
    EmptyInput,

    #[error("文件过大: {size} 字节（上限 {limit} 字节）")]
    FileTooLarge { size: usize, limit: usize },

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 表头错误 =====
    #[error("缺少必填列: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("表头规范化后存在重复列: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    // ===== 数据库错误 =====
    #[error("存储层失败: {0}")]
    StorageError(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
