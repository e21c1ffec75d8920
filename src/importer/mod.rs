// ==========================================
// 健康追踪系统 - 导入层
// ==========================================
// 职责: CSV 文本 → 校验后的记录 → 对账 → 落库
// 支持: 打卡、营养日、训练课、训练动作、训练宽表
// ==========================================

// 模块声明
pub mod combined_decoder;
pub mod conflict_handler;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_engine;
pub mod import_trait;
pub mod schema_catalog;
pub mod template;
pub mod text_reader;

// 重导出核心类型
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::CsvParser;
pub use import_engine::ImportEngine;
pub use schema_catalog::SchemaCatalog;
pub use template::template_csv;
pub use text_reader::decode_text;

// 重导出 Trait 接口
pub use import_trait::{ConflictHandler, FieldMapper, FileParser, RawTable, RecordValidator};
