// ==========================================
// 健康追踪系统 - 导入引擎
// ==========================================
// 职责: 整合导入流程,从文本/提交行到数据库
// 流程: 解析 → 表头映射 → 行校验 → 合成编号 → 对账 → 落库 → 批次审计
// 红线: preview 不写库; apply(text) 与 apply(rows) 分类一致
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::records::{NaturalKey, ParsedRecord, ParsedRow, PlanExerciseRecord};
use crate::domain::report::{ImportBatch, ImportReport, ImportSummary, RowOutcome, SubmittedRow};
use crate::domain::types::{ImportMode, ImportSchema, RowStatus};
use crate::importer::combined_decoder::SessionIdAllocator;
use crate::importer::conflict_handler::{self, REASON_EXISTS, REASON_WILL_REPLACE};
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper;
use crate::importer::file_parser::CsvParser;
use crate::importer::import_trait::{ConflictHandler, FieldMapper, FileParser, RecordValidator};
use crate::importer::schema_catalog::SchemaCatalog;
use crate::repository::{ImportRepository, WriteKind, WriteOp, WriteResult};
use chrono::Local;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// apply 阶段替换已存在记录时的说明
pub const REASON_REPLACED: &str = "existing entry replaced";

// ==========================================
// ImportEngine - 导入引擎
// ==========================================
pub struct ImportEngine<R, C>
where
    R: ImportRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    import_repo: R,

    // 配置读取器
    config: C,

    // 只读 schema 目录
    catalog: Arc<SchemaCatalog>,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    record_validator: Box<dyn RecordValidator>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<R, C> ImportEngine<R, C>
where
    R: ImportRepository,
    C: ImportConfigReader,
{
    /// 创建新的 ImportEngine 实例
    ///
    /// # 参数
    /// - import_repo: 导入数据仓储
    /// - config: 配置读取器
    /// - catalog: schema 目录
    /// - file_parser: 文件解析器
    /// - field_mapper: 字段映射器
    /// - record_validator: 行校验器
    /// - conflict_handler: 冲突处理器
    pub fn new(
        import_repo: R,
        config: C,
        catalog: Arc<SchemaCatalog>,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        record_validator: Box<dyn RecordValidator>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            import_repo,
            config,
            catalog,
            file_parser,
            field_mapper,
            record_validator,
            conflict_handler,
        }
    }

    /// 使用默认组件创建
    pub fn with_default_stages(import_repo: R, config: C) -> Self {
        let catalog = Arc::new(SchemaCatalog::new());
        Self::new(
            import_repo,
            config,
            catalog.clone(),
            Box::new(CsvParser),
            Box::new(field_mapper::FieldMapper::new(catalog)),
            Box::new(DqValidator),
            Box::new(conflict_handler::ConflictHandler),
        )
    }

    pub fn accepted_columns(&self, schema: ImportSchema) -> Vec<String> {
        self.catalog.accepted_columns(schema)
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    // ===== 对外操作 =====

    /// 预览: 只分类,不写库
    #[instrument(skip(self, text), fields(schema = %schema))]
    pub fn preview(&self, schema: ImportSchema, text: &str) -> ImportResult<ImportReport> {
        let parsed = self.parse_text(schema, text)?;
        let (parsed, outcomes) = self.classify(schema, parsed)?;
        let summary = ImportSummary::tally(&outcomes, &warned_rows(&parsed));

        info!(
            total = summary.total,
            valid = summary.valid,
            conflict = summary.conflict,
            invalid = summary.invalid,
            "预览完成"
        );

        Ok(ImportReport {
            schema,
            mode: ImportMode::Preview,
            summary,
            rows: outcomes,
            accepted_columns: self.accepted_columns(schema),
            batch_id: None,
        })
    }

    /// 从文件文本导入
    #[instrument(skip(self, text), fields(schema = %schema))]
    pub fn apply_text(&self, schema: ImportSchema, text: &str) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let parsed = self.parse_text(schema, text)?;
        self.apply_parsed(schema, parsed, start_time)
    }

    /// 从预览返回的行导入
    ///
    /// # 说明
    /// - 字段名再经过一次规范化,别名同样可用
    /// - 行号沿用提交值
    #[instrument(skip(self, rows), fields(schema = %schema, rows = rows.len()))]
    pub fn apply_rows(
        &self,
        schema: ImportSchema,
        rows: &[SubmittedRow],
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        if rows.is_empty() {
            return Err(ImportError::EmptyInput);
        }

        let parsed = rows
            .iter()
            .map(|row| {
                let fields = row
                    .fields
                    .iter()
                    .map(|(k, v)| (self.field_mapper.canonicalize(schema, k), v.clone()))
                    .filter(|(k, _)| !k.is_empty())
                    .collect();
                self.record_validator
                    .validate(schema, row.line_number, &fields)
            })
            .collect();

        self.apply_parsed(schema, parsed, start_time)
    }

    // ===== 流程步骤 =====

    /// 步骤 1-2: 解析 + 表头映射 + 行校验
    fn parse_text(&self, schema: ImportSchema, text: &str) -> ImportResult<Vec<ParsedRow>> {
        let table = self.file_parser.parse_table(text)?;
        debug!(delimiter = ?table.delimiter, rows = table.rows.len(), "文件切分完成");

        let header_map = self
            .field_mapper
            .build_header_map(schema, &table.header)?;

        let parsed = table
            .rows
            .iter()
            .map(|row| {
                let fields = self.field_mapper.map_row(&header_map, row);
                self.record_validator
                    .validate(schema, row.line_number, &fields)
            })
            .collect();
        Ok(parsed)
    }

    /// 步骤 3: 合成编号 + 对账
    fn classify(
        &self,
        schema: ImportSchema,
        mut parsed: Vec<ParsedRow>,
    ) -> ImportResult<(Vec<ParsedRow>, Vec<RowOutcome>)> {
        if schema == ImportSchema::PlanWorkoutCombined {
            SessionIdAllocator::new().assign(&mut parsed);
        }

        let existing = self.import_repo.existing_keys(schema)?;
        let outcomes = self
            .conflict_handler
            .reconcile(schema, &parsed, &existing);
        Ok((parsed, outcomes))
    }

    /// 步骤 4-5: 落库 + 批次审计
    fn apply_parsed(
        &self,
        schema: ImportSchema,
        parsed: Vec<ParsedRow>,
        start_time: Instant,
    ) -> ImportResult<ImportReport> {
        let apply_mode = self
            .config
            .get_apply_mode()
            .map_err(|e| ImportError::InternalError(format!("配置读取失败: {}", e)))?;
        let source_tag = self
            .config
            .get_default_source_tag()
            .map_err(|e| ImportError::InternalError(format!("配置读取失败: {}", e)))?;

        let (parsed, mut outcomes) = self.classify(schema, parsed)?;
        let ops = build_write_ops(&outcomes);
        debug!(ops = ops.len(), mode = apply_mode.as_str(), "写操作已生成");

        let results = self
            .import_repo
            .apply_writes(&ops, apply_mode, &source_tag)
            .map_err(|e| {
                error!(error = %e, "落库失败");
                ImportError::StorageError(e)
            })?;

        merge_write_results(&mut outcomes, &ops, &results);

        let summary = ImportSummary::tally(&outcomes, &warned_rows(&parsed));
        let elapsed_ms = start_time.elapsed().as_millis() as i64;
        let batch = ImportBatch {
            batch_id: Uuid::new_v4().to_string(),
            schema,
            source_tag,
            total: summary.total,
            imported: summary.imported,
            conflict: summary.conflict,
            invalid: summary.invalid,
            warned: summary.warned,
            imported_at: Local::now().naive_local(),
            elapsed_ms,
        };

        // 数据已提交; 审计失败只记录日志
        let batch_id = match self.import_repo.record_batch(&batch) {
            Ok(()) => Some(batch.batch_id.clone()),
            Err(e) => {
                error!(batch_id = %batch.batch_id, error = %e, "批次审计写入失败");
                None
            }
        };

        info!(
            batch_id = ?batch_id,
            total = summary.total,
            imported = summary.imported,
            conflict = summary.conflict,
            invalid = summary.invalid,
            warned = summary.warned,
            elapsed_ms = elapsed_ms,
            "导入完成"
        );

        Ok(ImportReport {
            schema,
            mode: ImportMode::Apply,
            summary,
            rows: outcomes,
            accepted_columns: self.accepted_columns(schema),
            batch_id,
        })
    }
}

/// 带警告的行下标(与行结果一一对应)
fn warned_rows(parsed: &[ParsedRow]) -> HashSet<usize> {
    parsed
        .iter()
        .enumerate()
        .filter(|(_, row)| !row.warnings.is_empty())
        .map(|(idx, _)| idx)
        .collect()
}

/// 合法行 → 写操作
///
/// 动作行按父训练课分组,每组一个整体替换操作（组顺序按首次出现）
fn build_write_ops(outcomes: &[RowOutcome]) -> Vec<WriteOp> {
    let mut ops = Vec::new();
    let mut exercise_groups: Vec<(NaturalKey, Vec<usize>, Vec<PlanExerciseRecord>)> = Vec::new();

    // 以行结果下标关联,提交行号可能重复
    for (idx, outcome) in outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| o.status == RowStatus::Valid)
    {
        let kind = match &outcome.record {
            ParsedRecord::Checkin(r) => WriteKind::InsertCheckin(r.clone()),
            ParsedRecord::PlanDiet(r) => WriteKind::UpsertPlanDiet(r.clone()),
            ParsedRecord::PlanSession(r) => WriteKind::UpsertSession {
                session: r.clone(),
                exercises: None,
            },
            ParsedRecord::PlanWorkoutCombined(r) => WriteKind::UpsertSession {
                session: r.session.clone(),
                exercises: Some(r.exercises.clone()),
            },
            ParsedRecord::PlanExercise(r) => {
                let parent = NaturalKey::session(&r.log_date, &r.plan_session_id);
                match exercise_groups.iter_mut().find(|(key, _, _)| *key == parent) {
                    Some((_, rows, records)) => {
                        rows.push(idx);
                        records.push(r.clone());
                    }
                    None => exercise_groups.push((parent, vec![idx], vec![r.clone()])),
                }
                continue;
            }
        };
        ops.push(WriteOp {
            rows: vec![idx],
            kind,
        });
    }

    ops.extend(
        exercise_groups
            .into_iter()
            .map(|(parent, rows, exercises)| WriteOp {
                rows,
                kind: WriteKind::ReplaceExercises { parent, exercises },
            }),
    );
    ops
}

/// 写结果回填到行结果
fn merge_write_results(outcomes: &mut [RowOutcome], ops: &[WriteOp], results: &[WriteResult]) {
    for (op, result) in ops.iter().zip(results) {
        for &idx in &op.rows {
            let Some(outcome) = outcomes.get_mut(idx) else {
                continue;
            };
            let line = outcome.line_number;
            match result {
                WriteResult::Written => {
                    outcome.status = RowStatus::Imported;
                    for reason in outcome.reasons.iter_mut() {
                        if reason == REASON_WILL_REPLACE {
                            *reason = REASON_REPLACED.to_string();
                        }
                    }
                }
                WriteResult::Conflict => {
                    outcome.status = RowStatus::Conflict;
                    outcome.reasons.retain(|r| r != REASON_WILL_REPLACE);
                    outcome.reasons.insert(0, REASON_EXISTS.to_string());
                }
                WriteResult::Failed(message) => {
                    warn!(line = line, error = %message, "行写入失败");
                    outcome.status = RowStatus::Invalid;
                    outcome.reasons.retain(|r| r != REASON_WILL_REPLACE);
                    outcome.reasons.insert(0, message.clone());
                }
                WriteResult::RolledBack(message) => {
                    outcome.status = RowStatus::Invalid;
                    outcome.reasons.retain(|r| r != REASON_WILL_REPLACE);
                    outcome.reasons.insert(0, format!("rolled back: {}", message));
                }
            }
        }
    }
}
