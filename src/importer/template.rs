// ==========================================
// 健康追踪系统 - CSV 模板
// ==========================================
// 职责: 每个 schema 输出表头 + 示例行
// 约束: 模板本身可被同一管道无误导入
// ==========================================

use crate::domain::types::ImportSchema;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::schema_catalog::{slot_field, SchemaCatalog};
use std::collections::HashMap;

/// 宽表示例中的一个动作
type SlotExample<'a> = [(&'a str, &'a str); 9];

/// 生成模板 CSV 文本（逗号分隔,`\n` 换行）
pub fn template_csv(catalog: &SchemaCatalog, schema: ImportSchema) -> ImportResult<String> {
    let columns = catalog.accepted_columns(schema);
    let rows: Vec<Vec<String>> = match schema {
        ImportSchema::Checkin => vec![owned(&[
            "2026-03-01", "7.2", "8", "9500", "74.2", "82.3", "96.8", "0", "Y", "N", "",
        ])],
        ImportSchema::PlanDiet => vec![owned(&[
            "2026-03-01",
            "2200",
            "150",
            "220",
            "80",
            "Huevos + ensalada + arepa",
            "Fruta + yogur natural",
            "Pollo + legumbre + aguacate",
            "Queso + zanahoria",
            "Pescado + papa + verduras",
            "Plan de ejemplo",
        ])],
        ImportSchema::PlanSession => vec![owned(&[
            "2026-03-01",
            "A",
            "pesas",
            "Bici 8 min + movilidad cadera",
            "",
            "Caminata 20 min",
            "Estirar 10 min",
            "Abducciones + gemelos",
            "Sesion de ejemplo",
        ])],
        ImportSchema::PlanExercise => vec![owned(&[
            "2026-03-01",
            "A",
            "1",
            "Hip Thrust",
            "4",
            "5",
            "8",
            "120",
            "8",
            "RPE 7-8",
            "+2.5kg cuando completes reps max",
            "+1 rep por serie antes de subir peso",
        ])],
        ImportSchema::PlanWorkoutCombined => combined_rows(&columns),
    };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ImportError::InternalError(format!("模板写出失败: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ImportError::InternalError(e.to_string()))
}

fn owned(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

/// 宽表: 两行提示 + 三行示例
fn combined_rows(columns: &[String]) -> Vec<Vec<String>> {
    let type_hint = hint_row(
        columns,
        "#TYPE_HINT YYYY-MM-DD",
        &[
            ("session_type", "clase|pesas"),
            ("warmup", "texto"),
            ("class_sessions", "texto"),
            ("cardio", "texto"),
            ("mobility_cooldown", "texto"),
            ("additional_exercises", "texto"),
            ("notes", "texto"),
        ],
        |suffix| match suffix {
            "name" => "texto",
            "sets" | "reps_min" | "reps_max" => "entero",
            "weight_kg" | "rpe" => "numero",
            _ => "texto",
        },
    );
    let rule_hint = hint_row(
        columns,
        "#RULE_HINT una fila por sesion",
        &[
            ("session_type", "clase ignora ejercicios"),
            ("notes", "max 700"),
        ],
        |suffix| match suffix {
            "name" => "vacio = sin ejercicio",
            "sets" => "1-12",
            "reps_min" | "reps_max" => "1-100, min <= max",
            "weight_kg" => "0-1000",
            "rpe" => "1-10",
            _ => "",
        },
    );

    let hip_thrust: SlotExample = [
        ("name", "Hip Thrust"),
        ("sets", "4"),
        ("reps_min", "5"),
        ("reps_max", "8"),
        ("weight_kg", "120"),
        ("rpe", "8"),
        ("intensity_target", "RPE 7-8"),
        ("progression_weight_rule", "+2.5kg al cerrar reps"),
        ("progression_reps_rule", "+1 rep/serie antes de subir carga"),
    ];
    let squat: SlotExample = [
        ("name", "Sentadilla"),
        ("sets", "4"),
        ("reps_min", "5"),
        ("reps_max", "8"),
        ("weight_kg", "80"),
        ("rpe", "7"),
        ("intensity_target", "RPE 7"),
        ("progression_weight_rule", "+2kg al cerrar reps"),
        ("progression_reps_rule", "+1 rep/serie"),
    ];
    let bench: SlotExample = [
        ("name", "Press banca"),
        ("sets", "3"),
        ("reps_min", "6"),
        ("reps_max", "8"),
        ("weight_kg", "60"),
        ("rpe", "8"),
        ("intensity_target", "RPE 8"),
        ("progression_weight_rule", "+1.25kg"),
        ("progression_reps_rule", "+1 rep"),
    ];

    vec![
        type_hint,
        rule_hint,
        example_row(
            columns,
            &[
                ("log_date", "2026-03-01"),
                ("session_type", "pesas"),
                ("warmup", "Bici 8 min + movilidad cadera"),
                ("cardio", "Caminata 20 min"),
                ("mobility_cooldown", "Estirar 10 min"),
                ("additional_exercises", "Abducciones + gemelos"),
                ("notes", "Pierna + gluteo · tecnica primero"),
            ],
            &[hip_thrust, squat],
        ),
        example_row(
            columns,
            &[
                ("log_date", "2026-03-01"),
                ("session_type", "clase"),
                ("class_sessions", "Pilates 50 min"),
                ("mobility_cooldown", "Movilidad suave"),
                ("notes", "Clase tecnica + respiracion"),
            ],
            &[],
        ),
        example_row(
            columns,
            &[
                ("log_date", "2026-03-01"),
                ("session_type", "pesas"),
                ("warmup", "Remo 6 min"),
                ("mobility_cooldown", "Estirar 8 min"),
                ("additional_exercises", "Band pull-aparts"),
                ("notes", "Upper body PM"),
            ],
            &[bench],
        ),
    ]
}

/// 提示行: 首列为标记,其余列为说明
fn hint_row(
    columns: &[String],
    marker: &str,
    base: &[(&str, &str)],
    slot_hint: fn(&str) -> &'static str,
) -> Vec<String> {
    let base: HashMap<&str, &str> = base.iter().copied().collect();
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            if idx == 0 {
                return marker.to_string();
            }
            if let Some(v) = base.get(column.as_str()) {
                return v.to_string();
            }
            slot_suffix(column).map(slot_hint).unwrap_or_default().to_string()
        })
        .collect()
}

/// exercise_<N>_<suffix> → suffix
fn slot_suffix(column: &str) -> Option<&str> {
    let rest = column.strip_prefix("exercise_")?;
    let (slot, suffix) = rest.split_once('_')?;
    slot.parse::<usize>().ok().map(|_| suffix)
}

fn example_row(columns: &[String], base: &[(&str, &str)], slots: &[SlotExample]) -> Vec<String> {
    let mut values: HashMap<String, String> = base
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (idx, slot) in slots.iter().enumerate() {
        for (suffix, value) in slot {
            values.insert(slot_field(idx + 1, suffix), value.to_string());
        }
    }
    columns
        .iter()
        .map(|c| values.get(c).cloned().unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkin_template_header_and_row() {
        let catalog = SchemaCatalog::new();
        let text = template_csv(&catalog, ImportSchema::Checkin).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("log_date,sleep_hours,"));
        assert!(lines[1].starts_with("2026-03-01,7.2,8,9500"));
    }

    #[test]
    fn test_combined_template_has_hint_rows() {
        let catalog = SchemaCatalog::new();
        let text = template_csv(&catalog, ImportSchema::PlanWorkoutCombined).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[1].starts_with("#TYPE_HINT"));
        assert!(lines[2].starts_with("#RULE_HINT"));
        assert!(lines[3].contains("Hip Thrust"));
        assert!(lines[3].contains("Sentadilla"));
        assert!(lines[4].contains("Pilates 50 min"));
    }

    #[test]
    fn test_slot_suffix() {
        assert_eq!(slot_suffix("exercise_3_reps_min"), Some("reps_min"));
        assert_eq!(slot_suffix("log_date"), None);
    }
}
