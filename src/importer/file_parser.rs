// ==========================================
// 库存批量导入 - 文件解析器实现
// ==========================================
// 阶段: 文件字节 → 原始行（表头校验在此完成）
// 支持: Excel (.xlsx) / CSV (.csv)
// 红线: 纯函数，无副作用
// ==========================================

use crate::domain::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{FileParser, RowParser};
use calamine::{Reader, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// 表头列名（精确匹配，区分大小写）
pub mod columns {
    pub const CODE: &str = "Code";
    pub const NAME: &str = "Name";
    pub const CATEGORY: &str = "Category";
    pub const PRICE: &str = "Price";
    pub const STOCK: &str = "Stock";
}

/// 必需列（规范顺序，Schema 错误按此顺序列出缺失列）
pub const REQUIRED_COLUMNS: [&str; 5] = [
    columns::CODE,
    columns::NAME,
    columns::CATEGORY,
    columns::PRICE,
    columns::STOCK,
];

/// xlsx（zip 容器）文件头
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

// ==========================================
// 通用: 表头 + 数据行 → RawRow
// ==========================================

/// 校验表头是否包含全部必需列
fn check_header(headers: &[String]) -> ImportResult<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h == *required))
        .map(|s| s.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::Schema { missing })
    }
}

/// 按表头组装数据行
///
/// # 参数
/// - headers: 已 TRIM 的表头
/// - data_rows: (真实行号, 单元格文本)
///
/// # 说明
/// - 空单元格不写入字段表；整行为空则跳过，行号不重排
/// - 表头为空的列忽略
fn assemble_rows<I>(headers: Vec<String>, data_rows: I) -> ImportResult<Vec<RawRow>>
where
    I: IntoIterator<Item = (usize, Vec<String>)>,
{
    check_header(&headers)?;

    let mut rows = Vec::new();
    for (row_number, cells) in data_rows {
        let mut raw = RawRow::new(row_number);

        for (col_idx, value) in cells.into_iter().enumerate() {
            let Some(header) = headers.get(col_idx) else {
                continue;
            };
            if header.is_empty() || value.trim().is_empty() {
                continue;
            }
            // 重复表头以第一列为准
            raw.fields.entry(header.clone()).or_insert(value);
        }

        if raw.fields.is_empty() {
            continue;
        }
        rows.push(raw);
    }

    if rows.is_empty() {
        return Err(ImportError::EmptySheet);
    }

    Ok(rows)
}

// ==========================================
// CSV Parser 实现
// ==========================================
#[derive(Default)]
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        let mut records = reader.records();

        // 读取表头（第一行）
        let Some(header_record) = records.next() else {
            return Err(ImportError::EmptySheet);
        };
        let headers: Vec<String> = header_record?
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let mut data_rows = Vec::new();
        for (idx, result) in records.enumerate() {
            let record = result?;
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            data_rows.push((row_number, record.iter().map(str::to_string).collect()));
        }

        assemble_rows(headers, data_rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
#[derive(Default)]
pub struct ExcelParser {
    /// 指定工作表；None 表示第一个工作表
    sheet_name: Option<String>,
}

impl ExcelParser {
    pub fn new(sheet_name: Option<String>) -> Self {
        Self { sheet_name }
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

        let sheet_name = match &self.sheet_name {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ImportError::Parse("workbook has no worksheets".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        // 使用区域可能不从 A1 开始，行号按真实位置计算
        let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
        let mut rows = range.rows();

        let Some(header_row) = rows.next() else {
            return Err(ImportError::EmptySheet);
        };
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        debug!(sheet = %sheet_name, first_row, "读取工作表");

        let data_rows = rows.enumerate().map(|(idx, cells)| {
            (
                first_row + idx + 2,
                cells.iter().map(|c| c.to_string()).collect(),
            )
        });

        assemble_rows(headers, data_rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Default)]
pub struct UniversalFileParser {
    excel: ExcelParser,
    csv: CsvParser,
}

impl UniversalFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定读取的工作表（仅对 xlsx 生效）
    pub fn with_sheet_name(sheet_name: Option<String>) -> Self {
        Self {
            excel: ExcelParser::new(sheet_name),
            csv: CsvParser,
        }
    }
}

impl RowParser for UniversalFileParser {
    fn parse(&self, filename: &str, bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let rows = match ext.as_str() {
            "xlsx" => self.excel.parse_bytes(bytes),
            "csv" => self.csv.parse_bytes(bytes),
            _ if bytes.starts_with(ZIP_SIGNATURE) => self.excel.parse_bytes(bytes),
            _ => Err(ImportError::UnsupportedFormat(if ext.is_empty() {
                filename.to_string()
            } else {
                ext
            })),
        }?;

        debug!(filename, rows = rows.len(), "文件解析完成");
        Ok(rows)
    }
}
