// ==========================================
// 健康追踪系统 - 文件解析器实现
// ==========================================
// 阶段 0: 分隔符嗅探 + 行切分
// 支持: CSV（逗号 / 分号 / 制表符 / 竖线）
// ==========================================

use crate::domain::records::RawRow;
use crate::domain::types::Delimiter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::{FileParser, RawTable};
use csv::ReaderBuilder;
use tracing::debug;

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn sniff_delimiter(&self, text: &str) -> ImportResult<Delimiter> {
        let first_line = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(ImportError::EmptyInput)?;

        let mut best = Delimiter::Comma;
        let mut best_count = 0usize;
        for candidate in Delimiter::CANDIDATES {
            let count = first_line.matches(candidate.as_char()).count();
            // 严格大于: 并列保留靠前的候选
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }

        debug!(delimiter = ?best, count = best_count, "分隔符嗅探完成");
        Ok(best)
    }

    fn parse_table(&self, text: &str) -> ImportResult<RawTable> {
        let delimiter = self.sniff_delimiter(text)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(text.as_bytes());

        let mut header: Option<RawRow> = None;
        let mut rows = Vec::new();

        for result in reader.records() {
            let record = result?;
            let line_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or_default();
            let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();

            // 跳过完全空白的行
            let first_non_empty = match cells.iter().find(|c| !c.is_empty()) {
                Some(cell) => cell,
                None => continue,
            };

            if header.is_none() {
                header = Some(RawRow { line_number, cells });
                continue;
            }

            // 跳过模板提示行（#TYPE_HINT / #RULE_HINT 等）
            if first_non_empty.starts_with('#') {
                continue;
            }

            rows.push(RawRow { line_number, cells });
        }

        let header = header.ok_or(ImportError::EmptyInput)?;
        debug!(rows = rows.len(), "CSV 切分完成");

        Ok(RawTable {
            delimiter,
            header,
            rows,
        })
    }
}
