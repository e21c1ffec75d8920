// ==========================================
// 健康追踪系统 - 数据清洗器实现
// ==========================================
// 职责: 文本截断 / 日期 / 数值（逗号小数）/ Y-N / 照片路径 标准化
// 红线: 单元格级问题只累积错误信息,不中断整行
// ==========================================

use crate::domain::records::FieldMap;
use chrono::NaiveDate;

/// 日期格式（ISO 日历日期）
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 数值范围约束
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

// ==========================================
// 单元格级清洗函数
// ==========================================

/// 折叠空白并按字符数截断
pub fn clip_text(value: &str, max_chars: usize) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(max_chars).collect()
}

/// 解析 YYYY-MM-DD,返回规范化的 ISO 文本
pub fn parse_date(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .map(|d| d.format(DATE_FORMAT).to_string())
}

/// 解析浮点数（接受 `,` 作小数点）
///
/// # 返回
/// - Ok(None): 空值
/// - Err: 非数值（含 NaN/inf）
pub fn parse_float(value: &str) -> Result<Option<f64>, &'static str> {
    let raw = value.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err("not a number"),
    }
}

/// 解析整数（先按浮点解析,非整数值拒绝）
pub fn parse_int(value: &str) -> Result<Option<i64>, &'static str> {
    match parse_float(value) {
        Ok(Some(v)) if v.fract() != 0.0 => Err("must be integer"),
        Ok(Some(v)) if v.abs() > i64::MAX as f64 => Err("not a number"),
        Ok(v) => Ok(v.map(|n| n as i64)),
        Err(_) => Err("not a number"),
    }
}

/// Y/N 标记（大小写不敏感）
pub fn parse_yn(value: &str) -> Result<Option<bool>, &'static str> {
    match value.trim().to_ascii_uppercase().as_str() {
        "" => Ok(None),
        "Y" => Ok(Some(true)),
        "N" => Ok(Some(false)),
        _ => Err("must be Y or N"),
    }
}

/// 进度照片相对路径标准化
///
/// `\` → `/`,去掉开头 `/` 与 `static/` 前缀; 必须位于 `uploads/` 下且不含 `..`。
/// 不合法返回 None。
pub fn normalize_photo_path(value: &str) -> Option<String> {
    let unified = value.trim().replace('\\', "/");
    let rel = unified.trim_start_matches('/');
    if rel.is_empty() {
        return None;
    }
    let rel = rel.strip_prefix("static/").unwrap_or(rel);
    if !rel.starts_with("uploads/") {
        return None;
    }

    let parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
    if parts.iter().any(|p| *p == "..") || parts.len() < 2 {
        return None;
    }
    Some(parts.join("/"))
}

// ==========================================
// DataCleaner - 行级读取器
// ==========================================
// 按字段读取 FieldMap,把单元格错误以 "<label>: <原因>" 累积
pub struct DataCleaner<'a> {
    fields: &'a FieldMap,
    errors: Vec<String>,
}

impl<'a> DataCleaner<'a> {
    pub fn new(fields: &'a FieldMap) -> Self {
        Self {
            fields,
            errors: Vec::new(),
        }
    }

    pub fn raw(&self, field: &str) -> &str {
        self.fields.get(field).map(|s| s.trim()).unwrap_or("")
    }

    pub fn push_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    /// 必填日期; 不合法时返回原始文本
    pub fn date(&mut self, field: &str) -> String {
        let raw = self.raw(field).to_string();
        match parse_date(&raw) {
            Some(iso) => iso,
            None => {
                self.errors
                    .push(format!("{}: invalid date format (expected YYYY-MM-DD)", field));
                raw
            }
        }
    }

    /// 截断文本; required 时空值记错误
    pub fn text(&mut self, field: &str, label: &str, max_chars: usize, required: bool) -> String {
        let value = clip_text(self.raw(field), max_chars);
        if required && value.is_empty() {
            self.errors.push(format!("{}: required", label));
        }
        value
    }

    pub fn float(&mut self, field: &str, label: &str, range: Range, required: bool) -> Option<f64> {
        let parsed = parse_float(self.raw(field));
        self.check_number(parsed, label, range, required)
    }

    pub fn int(&mut self, field: &str, label: &str, range: Range, required: bool) -> Option<i64> {
        let parsed = parse_int(self.raw(field)).map(|v| v.map(|n| n as f64));
        self.check_number(parsed, label, range, required)
            .map(|v| v as i64)
    }

    pub fn yn(&mut self, field: &str) -> Option<bool> {
        match parse_yn(self.raw(field)) {
            Ok(v) => v,
            Err(reason) => {
                self.errors.push(format!("{}: {}", field, reason));
                None
            }
        }
    }

    fn check_number(
        &mut self,
        parsed: Result<Option<f64>, &'static str>,
        label: &str,
        range: Range,
        required: bool,
    ) -> Option<f64> {
        match parsed {
            Err(reason) => {
                self.errors.push(format!("{}: {}", label, reason));
                None
            }
            Ok(None) => {
                if required {
                    self.errors.push(format!("{}: required", label));
                }
                None
            }
            Ok(Some(v)) if !range.contains(v) => {
                self.errors.push(format!(
                    "{}: out of range ({}-{})",
                    label, range.min, range.max
                ));
                None
            }
            Ok(Some(v)) => Some(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_clip_text() {
        assert_eq!(clip_text("  Pollo \n +   arroz ", 600), "Pollo + arroz");
        assert_eq!(clip_text("ñandú", 3), "ñan");
        assert_eq!(clip_text("   ", 10), "");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-03-01"), Some("2026-03-01".to_string()));
        assert_eq!(parse_date("2026-02-30"), None);
        assert_eq!(parse_date("01/03/2026"), None);
        assert_eq!(parse_date("bad-date"), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_float("7,5"), Ok(Some(7.5)));
        assert_eq!(parse_float(""), Ok(None));
        assert_eq!(parse_float("abc"), Err("not a number"));
        assert_eq!(parse_float("inf"), Err("not a number"));
        assert_eq!(parse_int("9500"), Ok(Some(9500)));
        assert_eq!(parse_int("8.0"), Ok(Some(8)));
        assert_eq!(parse_int("8.5"), Err("must be integer"));
    }

    #[test]
    fn test_parse_yn() {
        assert_eq!(parse_yn("y"), Ok(Some(true)));
        assert_eq!(parse_yn("N"), Ok(Some(false)));
        assert_eq!(parse_yn(""), Ok(None));
        assert_eq!(parse_yn("si"), Err("must be Y or N"));
    }

    #[test]
    fn test_normalize_photo_path() {
        assert_eq!(
            normalize_photo_path("/static/uploads/2026/a.jpg"),
            Some("uploads/2026/a.jpg".to_string())
        );
        assert_eq!(
            normalize_photo_path("uploads\\a.jpg"),
            Some("uploads/a.jpg".to_string())
        );
        assert_eq!(normalize_photo_path("uploads/../etc/passwd"), None);
        assert_eq!(normalize_photo_path("/etc/passwd"), None);
        assert_eq!(normalize_photo_path(""), None);
    }

    #[test]
    fn test_cleaner_accumulates_errors() {
        let f = fields(&[("steps", "12.5"), ("sleep_quality", "11"), ("weight_kg", "")]);
        let mut c = DataCleaner::new(&f);
        assert_eq!(c.int("steps", "steps", Range::new(0.0, 200_000.0), false), None);
        assert_eq!(
            c.int("sleep_quality", "sleep_quality", Range::new(1.0, 10.0), false),
            None
        );
        assert_eq!(
            c.float("weight_kg", "weight_kg", Range::new(0.0, 500.0), true),
            None
        );
        assert_eq!(c.date("log_date"), "");
        assert_eq!(
            c.into_errors(),
            vec![
                "steps: must be integer",
                "sleep_quality: out of range (1-10)",
                "weight_kg: required",
                "log_date: invalid date format (expected YYYY-MM-DD)",
            ]
        );
    }
}
