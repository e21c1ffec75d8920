// ==========================================
// 健康追踪系统 - 导入API
// ==========================================
// 职责: 封装 CSV 预览/导入/模板,供宿主调用
// 边界: 字节进,结构化报告出; 文件级错误以 ApiError 返回
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::report::{ImportReport, SubmittedRow};
use crate::domain::types::ImportSchema;
use crate::importer::error::ImportError;
use crate::importer::{decode_text, template_csv, ImportEngine, SchemaCatalog};
use crate::repository::ImportRepositoryImpl;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, warn};

/// 导入API响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 分类/导入报告
    #[serde(flatten)]
    pub report: ImportReport,
    /// 本次调用耗时（毫秒）
    pub elapsed_ms: i64,
}

/// apply 的两种输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ApplyInput {
    /// 上传文件原始字节
    Text(Vec<u8>),
    /// 预览后回传的行
    Rows(Vec<SubmittedRow>),
}

/// 导入API
pub struct ImportApi {
    db_path: String,
    catalog: SchemaCatalog,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            catalog: SchemaCatalog::new(),
        }
    }

    /// 预览导入（不写库）
    ///
    /// # 参数
    /// - schema: schema 名称（如 checkin, plan_diet）
    /// - bytes: 上传文件内容
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 行级分类与汇总
    /// - Err(ApiError): 文件级错误
    pub fn preview(&self, schema: &str, bytes: &[u8]) -> ApiResult<ImportApiResponse> {
        let start = Instant::now();
        let schema = parse_schema(schema)?;
        let engine = self.create_engine()?;

        let text = self.decode_checked(&engine, bytes)?;
        let report = engine.preview(schema, &text)?;
        Ok(respond(report, start))
    }

    /// 执行导入
    ///
    /// # 参数
    /// - schema: schema 名称
    /// - input: 文件字节或预览返回的行
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 行级结果、汇总与批次ID
    /// - Err(ApiError): 文件级错误或存储整体失败
    pub fn apply(&self, schema: &str, input: ApplyInput) -> ApiResult<ImportApiResponse> {
        let start = Instant::now();
        let schema = parse_schema(schema)?;
        let engine = self.create_engine()?;

        let report = match input {
            ApplyInput::Text(bytes) => {
                let text = self.decode_checked(&engine, &bytes)?;
                engine.apply_text(schema, &text)?
            }
            ApplyInput::Rows(rows) => engine.apply_rows(schema, &rows)?,
        };

        info!(
            schema = %schema,
            batch_id = ?report.batch_id,
            imported = report.summary.imported,
            "导入API调用完成"
        );
        Ok(respond(report, start))
    }

    /// 下载模板
    pub fn template(&self, schema: &str) -> ApiResult<String> {
        let schema = parse_schema(schema)?;
        Ok(template_csv(&self.catalog, schema)?)
    }

    /// 可接受列（规范名）
    pub fn accepted_columns(&self, schema: &str) -> ApiResult<Vec<String>> {
        let schema = parse_schema(schema)?;
        Ok(self.catalog.accepted_columns(schema))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn create_engine(&self) -> ApiResult<ImportEngine<ImportRepositoryImpl, ConfigManager>> {
        let import_repo = ImportRepositoryImpl::new(&self.db_path)?;
        let config = ConfigManager::new(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("创建配置管理器失败: {}", e)))?;
        Ok(ImportEngine::with_default_stages(import_repo, config))
    }

    /// 校验大小并解码
    fn decode_checked(
        &self,
        engine: &ImportEngine<ImportRepositoryImpl, ConfigManager>,
        bytes: &[u8],
    ) -> ApiResult<String> {
        let limit = engine
            .config()
            .get_max_file_bytes()
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))?;
        if bytes.len() > limit {
            warn!(size = bytes.len(), limit = limit, "上传文件超过上限");
            return Err(ImportError::FileTooLarge {
                size: bytes.len(),
                limit,
            }
            .into());
        }
        Ok(decode_text(bytes).into_owned())
    }
}

fn parse_schema(raw: &str) -> ApiResult<ImportSchema> {
    ImportSchema::from_str(raw).map_err(ApiError::InvalidInput)
}

fn respond(report: ImportReport, start: Instant) -> ImportApiResponse {
    ImportApiResponse {
        report,
        elapsed_ms: start.elapsed().as_millis() as i64,
    }
}
