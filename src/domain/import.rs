// ==========================================
// 库存批量导入 - 导入状态机与结果
// ==========================================
// 主流程: Received → Parsed → Validated → CatalogRegistered → TableCreated → Committed
// 终止态: Rejected（写库前失败，无需清理）/ Aborted（写库后失败，已执行补偿清理）
// ==========================================

use crate::domain::dataset::TableRef;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportState {
    Received,
    Parsed,
    Validated,
    CatalogRegistered,
    TableCreated,
    Committed,
    Rejected,
    Aborted,
}

impl ImportState {
    /// 状态转换表
    pub fn can_transition_to(self, next: ImportState) -> bool {
        use ImportState::*;
        matches!(
            (self, next),
            (Received, Parsed)
                | (Received, Rejected)
                | (Parsed, Validated)
                | (Parsed, Rejected)
                | (Validated, CatalogRegistered)
                | (Validated, Aborted)
                | (CatalogRegistered, TableCreated)
                | (CatalogRegistered, Aborted)
                | (TableCreated, Committed)
                | (TableCreated, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ImportState::Committed | ImportState::Rejected | ImportState::Aborted
        )
    }

    /// 是否已产生持久化副作用（目录行或物理表）
    pub fn has_durable_effects(self) -> bool {
        matches!(
            self,
            ImportState::CatalogRegistered | ImportState::TableCreated | ImportState::Committed
        )
    }
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportState::Received => "RECEIVED",
            ImportState::Parsed => "PARSED",
            ImportState::Validated => "VALIDATED",
            ImportState::CatalogRegistered => "CATALOG_REGISTERED",
            ImportState::TableCreated => "TABLE_CREATED",
            ImportState::Committed => "COMMITTED",
            ImportState::Rejected => "REJECTED",
            ImportState::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

// ==========================================
// ImportReport - 成功导入的结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// 本次导入的追踪 ID（仅用于日志关联）
    pub import_id: String,
    pub dataset_id: i64,
    pub display_name: String,
    /// 原始文件名（含扩展名）
    pub filename: String,
    pub total_rows: usize,
    pub inserted_rows: usize,
    pub table_ref: TableRef,
    pub state: ImportState,
    pub elapsed_ms: u128,
}
