// ==========================================
// 库存批量导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义上传边界与导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 上传边界校验 + 解析器配置
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取单个上传文件的大小上限（字节）
    ///
    /// # 默认值
    /// - 5242880（5 MiB）
    async fn get_max_upload_bytes(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 是否接受 CSV 上传
    ///
    /// # 默认值
    /// - true
    async fn get_accept_csv(&self) -> Result<bool, Box<dyn Error + Send + Sync>>;

    /// 获取读取的工作表名
    ///
    /// # 返回
    /// - None: 读取第一个工作表
    async fn get_sheet_name(&self) -> Result<Option<String>, Box<dyn Error + Send + Sync>>;
}
