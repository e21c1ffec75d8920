// ==========================================
// 健康追踪系统 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 流程: 解析 → 表头映射 → 行校验 → 对账 → 落库
// ==========================================

use crate::domain::records::{FieldMap, HeaderMap, ParsedRow, RawRow};
use crate::domain::report::{ExistingKeySet, RowOutcome};
use crate::domain::types::{Delimiter, ImportSchema};
use crate::importer::error::ImportResult;

/// 切分后的表格: 表头 + 数据行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub delimiter: Delimiter,
    pub header: RawRow,
    pub rows: Vec<RawRow>,
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 分隔符嗅探 + 行切分（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 嗅探分隔符（只看第一行非空行）
    ///
    /// # 返回
    /// - Ok(Delimiter): 计数最高者,并列取候选顺序靠前者,全为 0 取逗号
    /// - Err(EmptyInput): 没有任何非空行
    fn sniff_delimiter(&self, text: &str) -> ImportResult<Delimiter>;

    /// 切分为表头与数据行
    ///
    /// # 说明
    /// - 全空行、提示行（首个非空单元格以 `#` 开头）不计入数据行
    /// - 行号为物理行号
    fn parse_table(&self, text: &str) -> ImportResult<RawTable>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 表头规范化与行映射（阶段 1）
// 实现者: FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 单个表头 → 规范列名（纯函数,不失败）
    fn canonicalize(&self, schema: ImportSchema, header: &str) -> String;

    /// 整行表头 → HeaderMap
    ///
    /// # 返回
    /// - Err(DuplicateColumns): 规范化后出现重复列
    /// - Err(MissingRequiredColumns): 缺少必填列
    fn build_header_map(&self, schema: ImportSchema, header: &RawRow) -> ImportResult<HeaderMap>;

    /// 数据行 → 字段表
    fn map_row(&self, header_map: &HeaderMap, row: &RawRow) -> FieldMap;
}

// ==========================================
// RecordValidator Trait
// ==========================================
// 用途: 类型转换、范围校验、跨字段校验（阶段 2）
// 实现者: DqValidator
pub trait RecordValidator: Send + Sync {
    /// 校验单行; 错误累积到 field_errors,不中断
    fn validate(&self, schema: ImportSchema, line_number: usize, fields: &FieldMap) -> ParsedRow;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 批内去重 + 与已存在键对账（阶段 3）
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 按输入顺序逐行分类为 valid / conflict / invalid
    fn reconcile(
        &self,
        schema: ImportSchema,
        rows: &[ParsedRow],
        existing: &ExistingKeySet,
    ) -> Vec<RowOutcome>;
}
