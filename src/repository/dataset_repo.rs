// ==========================================
// 库存批量导入 - 数据集 Repository Trait
// ==========================================
// 职责: 数据集目录 + 每个数据集的物理商品表（不包含业务逻辑）
// 红线: 物理表名只通过 TableRef 传递，调用方不自行拼接
// ==========================================

use crate::domain::{Dataset, NewProduct, ProductPatch, ProductRow, TableRef};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// DatasetStore Trait
// ==========================================
// 用途: 导入编排器与行级 CRUD 共用的唯一持久化入口
// 实现者: SqliteDatasetStore（使用 rusqlite）
#[async_trait]
pub trait DatasetStore: Send + Sync {
    // ===== 数据集生命周期 =====

    /// 创建数据集目录行（table_ref 为空）
    ///
    /// # 说明
    /// - 立即持久化，不随后续任何回滚撤销
    async fn create_dataset(&self, display_name: &str, total_rows: usize)
        -> RepositoryResult<Dataset>;

    /// 创建数据集的物理表并回写 table_ref
    ///
    /// # 说明
    /// - 结构变更独立提交，不能与 insert_rows 放入同一事务
    /// - 失败时由调用方显式补偿（drop_backing_table），而不是依赖回滚
    ///
    /// # 返回
    /// - Err(NotFound): 数据集不存在
    /// - Err(TableRefAlreadySet): 数据集已绑定物理表
    async fn create_backing_table(&self, dataset_id: i64) -> RepositoryResult<TableRef>;

    /// 批量插入商品（单一事务，全部成功或全部回滚）
    ///
    /// # 返回
    /// - Ok(usize): 插入条数
    /// - Err(DuplicateKey): 编码重复，整批回滚
    async fn insert_rows(&self, table: &TableRef, products: &[NewProduct])
        -> RepositoryResult<usize>;

    /// 重命名数据集（只修改显示名）
    async fn rename_dataset(&self, dataset_id: i64, new_name: &str) -> RepositoryResult<Dataset>;

    /// 删除数据集：先删物理表再删目录行
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 数据集本就不存在（幂等）
    async fn delete_dataset(&self, dataset_id: i64) -> RepositoryResult<bool>;

    async fn list_datasets(&self) -> RepositoryResult<Vec<Dataset>>;

    async fn get_dataset(&self, dataset_id: i64) -> RepositoryResult<Option<Dataset>>;

    // ===== 补偿原语（幂等）=====

    /// DROP TABLE IF EXISTS
    async fn drop_backing_table(&self, table: &TableRef) -> RepositoryResult<()>;

    /// 删除目录行；不存在时返回 Ok(false)
    async fn remove_catalog_entry(&self, dataset_id: i64) -> RepositoryResult<bool>;

    // ===== 行级 CRUD =====

    async fn list_rows(&self, table: &TableRef) -> RepositoryResult<Vec<ProductRow>>;

    async fn get_row(&self, table: &TableRef, row_id: i64) -> RepositoryResult<Option<ProductRow>>;

    /// 手工新增单行
    async fn insert_row(&self, table: &TableRef, product: &NewProduct)
        -> RepositoryResult<ProductRow>;

    async fn update_row(
        &self,
        table: &TableRef,
        row_id: i64,
        patch: &ProductPatch,
    ) -> RepositoryResult<ProductRow>;

    /// 删除单行并返回被删除的行
    async fn delete_row(&self, table: &TableRef, row_id: i64) -> RepositoryResult<ProductRow>;

    async fn count_rows(&self, table: &TableRef) -> RepositoryResult<usize>;

    async fn table_exists(&self, table: &TableRef) -> RepositoryResult<bool>;

    // ===== 对账 =====

    /// 查找没有任何目录行引用的 products_upload_* 表
    async fn find_orphan_tables(&self) -> RepositoryResult<Vec<TableRef>>;

    /// 删除孤儿表，返回已删除的表
    async fn sweep_orphan_tables(&self) -> RepositoryResult<Vec<TableRef>>;
}
