// ==========================================
// 数据集管理API
// ==========================================
// 职责: 数据集目录查询/重命名/删除 + 数据集内商品行 CRUD
// 约定: 行操作均先解析数据集的物理表，调用方不接触表名
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{Dataset, NewProduct, ProductPatch, ProductRow, TableRef};
use crate::repository::DatasetStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// 通用成功响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// 删除结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
}

/// 孤儿表清理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub dropped_tables: Vec<TableRef>,
}

/// 手工新增商品请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductRequest {
    pub product_code: String,
    pub product_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
}

// ==========================================
// DatasetApi
// ==========================================
pub struct DatasetApi<S>
where
    S: DatasetStore,
{
    store: Arc<S>,
}

impl<S> DatasetApi<S>
where
    S: DatasetStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 查询全部数据集（新→旧）
    pub async fn list_datasets(&self) -> ApiResult<ApiResponse<Vec<Dataset>>> {
        let datasets = self.store.list_datasets().await?;
        Ok(ApiResponse::ok("Upload history retrieved", datasets))
    }

    pub async fn get_dataset(&self, dataset_id: i64) -> ApiResult<ApiResponse<Dataset>> {
        let dataset = self.require_dataset(dataset_id).await?;
        Ok(ApiResponse::ok("Upload retrieved", dataset))
    }

    /// 重命名数据集（只修改显示名）
    #[instrument(skip(self))]
    pub async fn rename_dataset(
        &self,
        dataset_id: i64,
        new_name: &str,
    ) -> ApiResult<ApiResponse<Dataset>> {
        if new_name.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "filename must not be empty".to_string(),
            ));
        }

        let dataset = self.store.rename_dataset(dataset_id, new_name).await?;
        info!(dataset_id, "数据集已重命名");
        Ok(ApiResponse::ok("Filename updated", dataset))
    }

    /// 删除数据集（目录行 + 物理表）
    ///
    /// # 说明
    /// - 重复删除同一 id 视为成功，deleted = false
    #[instrument(skip(self))]
    pub async fn delete_dataset(&self, dataset_id: i64) -> ApiResult<ApiResponse<DeleteOutcome>> {
        let deleted = self.store.delete_dataset(dataset_id).await?;
        let message = if deleted {
            "Upload and its table were deleted"
        } else {
            "Upload not found, nothing to delete"
        };
        Ok(ApiResponse::ok(message, DeleteOutcome { deleted }))
    }

    /// 查询数据集内的商品（新→旧）
    ///
    /// # 说明
    /// - 数据集尚未绑定物理表时返回空列表
    pub async fn list_rows(&self, dataset_id: i64) -> ApiResult<ApiResponse<Vec<ProductRow>>> {
        let dataset = self.require_dataset(dataset_id).await?;

        let Some(table) = dataset.table_ref else {
            return Ok(ApiResponse::ok("Upload has no associated table", Vec::new()));
        };

        let rows = self.store.list_rows(&table).await?;
        Ok(ApiResponse::ok("Products retrieved", rows))
    }

    /// 手工新增商品
    #[instrument(skip(self, request), fields(product_code = %request.product_code))]
    pub async fn add_row(
        &self,
        dataset_id: i64,
        request: NewProductRequest,
    ) -> ApiResult<ApiResponse<ProductRow>> {
        let table = self.require_table(dataset_id).await?;

        let code = request.product_code.trim();
        let name = request.product_name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput(
                "product_code and product_name are required".to_string(),
            ));
        }

        let price = request.price.unwrap_or(0.0);
        let stock = request.stock.unwrap_or(0);
        if !price.is_finite() || price < 0.0 || stock < 0 {
            return Err(ApiError::InvalidInput(
                "price and stock must not be negative".to_string(),
            ));
        }

        let product = NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            category: request
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            price,
            stock,
        };

        let row = self.store.insert_row(&table, &product).await?;
        Ok(ApiResponse::ok("Product added", row))
    }

    #[instrument(skip(self, patch))]
    pub async fn update_row(
        &self,
        dataset_id: i64,
        row_id: i64,
        patch: ProductPatch,
    ) -> ApiResult<ApiResponse<ProductRow>> {
        if patch.is_empty() {
            return Err(ApiError::InvalidInput("no fields to update".to_string()));
        }

        let table = self.require_table(dataset_id).await?;
        let row = self.store.update_row(&table, row_id, &patch).await?;
        Ok(ApiResponse::ok("Product updated", row))
    }

    #[instrument(skip(self))]
    pub async fn delete_row(
        &self,
        dataset_id: i64,
        row_id: i64,
    ) -> ApiResult<ApiResponse<ProductRow>> {
        let table = self.require_table(dataset_id).await?;
        let row = self.store.delete_row(&table, row_id).await?;
        Ok(ApiResponse::ok("Product deleted", row))
    }

    /// 清理没有目录行引用的物理表
    pub async fn sweep_orphan_tables(&self) -> ApiResult<ApiResponse<SweepOutcome>> {
        let dropped_tables = self.store.sweep_orphan_tables().await?;
        let message = format!("{} orphan table(s) dropped", dropped_tables.len());
        Ok(ApiResponse::ok(message, SweepOutcome { dropped_tables }))
    }

    async fn require_dataset(&self, dataset_id: i64) -> ApiResult<Dataset> {
        self.store
            .get_dataset(dataset_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Upload {} not found", dataset_id)))
    }

    async fn require_table(&self, dataset_id: i64) -> ApiResult<TableRef> {
        self.require_dataset(dataset_id)
            .await?
            .table_ref
            .ok_or_else(|| ApiError::NotFound(format!("Upload {} has no associated table", dataset_id)))
    }
}
