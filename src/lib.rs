// ==========================================
// 健康追踪系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: CSV 导入与对账管道（人工预览后确认落库）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解析、校验、对账
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 宿主接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ApplyMode, ImportMode, ImportSchema, RowStatus, SessionType};

// 领域实体
pub use domain::{ImportReport, ImportSummary, NaturalKey, ParsedRecord, RowOutcome, SubmittedRow};

// 导入引擎
pub use importer::{ImportEngine, ImportError, SchemaCatalog};

// API
pub use api::{ApiError, ApplyInput, ImportApi, ImportApiResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "健康追踪系统";
