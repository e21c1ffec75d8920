// ==========================================
// 健康追踪系统 - 命令行入口
// ==========================================
// 用法:
//   health-tracker preview  <schema> <file.csv> [db_path]
//   health-tracker apply    <schema> <file.csv> [db_path]
//   health-tracker template <schema>
//   health-tracker columns  <schema>
//   health-tracker config   <key> <value> [db_path]
//
// 结果以 JSON 输出到 stdout,日志输出到 stderr
// ==========================================

use anyhow::{bail, Context};
use health_tracker::api::{ApplyInput, ImportApi};
use health_tracker::config::ConfigManager;
use health_tracker::db::get_default_db_path;
use health_tracker::logging;

const USAGE: &str = "用法: health-tracker <preview|apply> <schema> <file.csv> [db_path]
       health-tracker template <schema>
       health-tracker columns <schema>
       health-tracker config <key> <value> [db_path]";

fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");
    let db_path_at = |idx: usize| {
        args.get(idx)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(get_default_db_path)
    };

    match command {
        "preview" | "apply" => {
            let (schema, file) = match (args.get(1), args.get(2)) {
                (Some(s), Some(f)) => (s, f),
                _ => bail!("{}", USAGE),
            };
            let bytes = std::fs::read(file).with_context(|| format!("读取文件失败: {}", file))?;
            let db_path = db_path_at(3);
            tracing::info!(db_path = %db_path, "使用数据库");

            let api = ImportApi::new(db_path);
            let response = if command == "preview" {
                api.preview(schema, &bytes)?
            } else {
                api.apply(schema, ApplyInput::Text(bytes))?
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        "template" => {
            let Some(schema) = args.get(1) else {
                bail!("{}", USAGE);
            };
            let api = ImportApi::new(String::new());
            print!("{}", api.template(schema)?);
        }
        "columns" => {
            let Some(schema) = args.get(1) else {
                bail!("{}", USAGE);
            };
            let api = ImportApi::new(String::new());
            println!("{}", serde_json::to_string_pretty(&api.accepted_columns(schema)?)?);
        }
        "config" => {
            let (key, value) = match (args.get(1), args.get(2)) {
                (Some(k), Some(v)) => (k, v),
                _ => bail!("{}", USAGE),
            };
            let config = ConfigManager::new(&db_path_at(3))
                .map_err(|e| anyhow::anyhow!("打开配置失败: {}", e))?;
            config
                .set_config_value(key, value)
                .map_err(|e| anyhow::anyhow!("写入配置失败: {}", e))?;
            let snapshot = config
                .get_config_snapshot()
                .map_err(|e| anyhow::anyhow!("读取配置失败: {}", e))?;
            println!("{}", snapshot);
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
