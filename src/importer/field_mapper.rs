// ==========================================
// 健康追踪系统 - 字段映射器实现
// ==========================================
// 阶段 1: 表头规范化 + 行映射
// 规则: slug → schema 别名表; 宽表额外识别 exercise<N>_<suffix>
// ==========================================

use crate::domain::records::{FieldMap, HeaderMap, RawRow};
use crate::domain::types::ImportSchema;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::FieldMapper as FieldMapperTrait;
use crate::importer::schema_catalog::{slot_field, SchemaCatalog, COMBINED_EXERCISE_SLOTS};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

pub struct FieldMapper {
    catalog: Arc<SchemaCatalog>,
}

impl FieldMapper {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    /// 宽表槽位列: exercise<N>_<suffix> / exercise_<N>_<suffix> / ex<N>_<suffix> / ex_<N>_<suffix>
    ///
    /// # 返回
    /// - Some(规范列名): N 在 1..=6 且子字段可识别
    /// - None: 不是槽位列
    fn canonical_slot_column(&self, slug: &str) -> Option<String> {
        let (slot, suffix_raw) = split_slot_header(slug)?;
        if !(1..=COMBINED_EXERCISE_SLOTS).contains(&slot) {
            return None;
        }
        let suffix = self.catalog.canonical_suffix(suffix_raw)?;
        Some(slot_field(slot, suffix))
    }
}

impl FieldMapperTrait for FieldMapper {
    fn canonicalize(&self, schema: ImportSchema, header: &str) -> String {
        let slug = normalize_header_name(header);
        let def = self.catalog.def(schema);

        if let Some(canonical) = def.lookup(&slug) {
            return canonical.to_string();
        }

        if schema == ImportSchema::PlanWorkoutCombined {
            if let Some(column) = self.canonical_slot_column(&slug) {
                return column;
            }
        }

        // 未映射的表头保留 slug
        slug
    }

    fn build_header_map(&self, schema: ImportSchema, header: &RawRow) -> ImportResult<HeaderMap> {
        let columns: Vec<String> = header
            .cells
            .iter()
            .map(|h| self.canonicalize(schema, h))
            .collect();

        // 重复列检查（空 slug 视为忽略列,不参与）
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for column in columns.iter().filter(|c| !c.is_empty()) {
            if !seen.insert(column.as_str()) && !duplicates.contains(column) {
                duplicates.push(column.clone());
            }
        }
        if !duplicates.is_empty() {
            warn!(schema = %schema, ?duplicates, "表头规范化后存在重复列");
            return Err(ImportError::DuplicateColumns(duplicates));
        }

        // 必填列检查
        let missing: Vec<String> = self
            .catalog
            .def(schema)
            .required
            .iter()
            .filter(|r| !seen.contains(r.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            warn!(schema = %schema, ?missing, "缺少必填列");
            return Err(ImportError::MissingRequiredColumns(missing));
        }

        debug!(schema = %schema, columns = ?columns, "表头映射完成");
        Ok(HeaderMap::new(columns))
    }

    fn map_row(&self, header_map: &HeaderMap, row: &RawRow) -> FieldMap {
        header_map.project(row)
    }
}

/// 表头 slug
///
/// NFKD 分解后丢弃非 ASCII（去重音）→ trim → 小写 →
/// 空白/`-`/`/` 连续段替换为 `_` → 丢弃 `[a-z0-9_]` 以外字符
pub fn normalize_header_name(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.trim().to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut in_separator = false;
    for c in lowered.chars() {
        if c.is_whitespace() || c == '-' || c == '/' {
            if !in_separator {
                slug.push('_');
                in_separator = true;
            }
            continue;
        }
        in_separator = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            slug.push(c);
        }
    }
    slug
}

/// 拆分槽位列 slug → (槽位号, 原始子字段)
///
/// 接受 `_N_suffix` 与 `N_suffix` / `Nsuffix` 两种形态（前缀 exercise 或 ex）
fn split_slot_header(slug: &str) -> Option<(usize, &str)> {
    let rest = slug
        .strip_prefix("exercise")
        .or_else(|| slug.strip_prefix("ex"))?;

    let (leading_underscore, rest) = match rest.strip_prefix('_') {
        Some(r) => (true, r),
        None => (false, rest),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let (digits, rest) = rest.split_at(digits_len);

    let suffix = match rest.strip_prefix('_') {
        Some(s) => s,
        None if leading_underscore => return None,
        None => rest,
    };
    if suffix.is_empty() {
        return None;
    }

    let slot = digits.parse::<usize>().ok()?;
    Some((slot, suffix))
}
