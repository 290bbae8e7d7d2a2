// ==========================================
// 库存批量导入 - 命令行入口
// ==========================================
// 输出: 各命令的响应体以 JSON 打印到 stdout，日志写 stderr
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inventory_import::api::{ApiError, UploadRequest};
use inventory_import::app::{get_default_db_path, AppState};
use inventory_import::domain::ProductPatch;
use inventory_import::logging;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "inventory-import", version, about = "Bulk product import from spreadsheets")]
struct Cli {
    /// 数据库文件路径（默认见 INVENTORY_IMPORT_DB_PATH）
    #[arg(long, global = true)]
    db: Option<String>,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Import a spreadsheet as a new dataset
    Import {
        /// Path to the .xlsx (or .csv) file
        file: PathBuf,
        /// Override the declared content type
        #[arg(long)]
        content_type: Option<String>,
    },
    /// List datasets, newest first
    List,
    /// Show one dataset
    Show { id: i64 },
    /// Rename a dataset
    Rename { id: i64, name: String },
    /// Delete a dataset and its backing table
    Delete { id: i64 },
    /// List, update or delete the rows of a dataset
    Rows {
        id: i64,
        /// Row to update or delete
        #[arg(long)]
        row: Option<i64>,
        /// Delete the row given by --row
        #[arg(long, default_value_t = false, requires = "row")]
        delete: bool,
        /// JSON patch for the row given by --row, e.g. '{"stock": 3}'
        #[arg(long, requires = "row", conflicts_with = "delete")]
        patch: Option<String>,
    },
    /// Drop backing tables no dataset refers to
    Sweep,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "命令执行失败");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    tracing::info!(
        app = inventory_import::APP_NAME,
        version = inventory_import::VERSION,
        db_path = %db_path,
        "使用数据库"
    );

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Import { file, content_type } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("无法读取文件: {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.display().to_string());

            let response = state
                .import_api
                .upload_products(UploadRequest {
                    filename,
                    content_type,
                    bytes,
                })
                .await;

            print_json(&response)?;
            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::List => emit(state.dataset_api.list_datasets().await),
        Commands::Show { id } => emit(state.dataset_api.get_dataset(id).await),
        Commands::Rename { id, name } => emit(state.dataset_api.rename_dataset(id, &name).await),
        Commands::Delete { id } => emit(state.dataset_api.delete_dataset(id).await),
        Commands::Rows {
            id,
            row,
            delete,
            patch,
        } => match (row, delete, patch) {
            (Some(row_id), true, _) => emit(state.dataset_api.delete_row(id, row_id).await),
            (Some(row_id), false, Some(raw)) => {
                let patch: ProductPatch =
                    serde_json::from_str(&raw).context("无法解析 --patch JSON")?;
                emit(state.dataset_api.update_row(id, row_id, patch).await)
            }
            _ => emit(state.dataset_api.list_rows(id).await),
        },
        Commands::Sweep => emit(state.dataset_api.sweep_orphan_tables().await),
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    status: u16,
}

/// 打印 API 结果；错误同样以 JSON 输出
fn emit<T: Serialize>(result: Result<T, ApiError>) -> Result<ExitCode> {
    match result {
        Ok(body) => {
            print_json(&body)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&ErrorBody {
                success: false,
                message: e.to_string(),
                status: e.status_code(),
            })?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
