//! 结果导出服务 - 业务能力层
//!
//! 只负责"把结果写成 CSV"能力，不关心流程

use crate::error::{AppError, AppResult};
use crate::models::result::GenerationResult;
use tracing::{debug, info};

/// 结果导出服务
///
/// 每条输入记录对应一行，顺序与输入一致；失败行的生成字段为空
pub struct ResultWriter {
    output_path: String,
    identity_column: Option<String>,
}

impl ResultWriter {
    /// 使用输出路径创建
    ///
    /// # 参数
    /// - `output_path`: 输出 CSV 路径
    /// - `identity_column`: 标识列名，有则额外输出一列
    pub fn new(output_path: impl Into<String>, identity_column: Option<String>) -> Self {
        Self {
            output_path: output_path.into(),
            identity_column,
        }
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    fn header(&self) -> Vec<&str> {
        let mut header = vec!["row"];
        if let Some(column) = &self.identity_column {
            header.push(column.as_str());
        }
        header.extend([
            "generated_title",
            "generated_description",
            "generated_meta_title",
            "generated_meta_description",
            "status",
            "error_message",
        ]);
        header
    }

    /// 编码为 CSV 字节
    pub fn to_csv_bytes(&self, results: &[GenerationResult]) -> AppResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let csv_err = |e| AppError::csv_failed(&self.output_path, e);

        writer.write_record(self.header()).map_err(csv_err)?;

        for result in results {
            let identity = result.identity();
            let mut row = vec![identity.row.to_string()];
            if self.identity_column.is_some() {
                row.push(identity.code.clone().unwrap_or_default());
            }
            match result.card() {
                Some(card) => row.extend([
                    card.title.clone(),
                    card.description.clone(),
                    card.meta_title.clone(),
                    card.meta_description.clone(),
                ]),
                None => row.extend(std::iter::repeat(String::new()).take(4)),
            }
            row.push(result.status_label());
            row.push(result.error_message());
            writer.write_record(&row).map_err(csv_err)?;
        }

        writer
            .into_inner()
            .map_err(|e| AppError::file_write_failed(&self.output_path, e.into_error()))
    }

    /// 写入输出文件
    pub async fn write(&self, results: &[GenerationResult]) -> AppResult<()> {
        debug!("写入结果: {} 行 → {}", results.len(), self.output_path);

        let bytes = self.to_csv_bytes(results)?;
        tokio::fs::write(&self.output_path, bytes)
            .await
            .map_err(|e| AppError::file_write_failed(&self.output_path, e))?;

        info!("💾 结果已写入: {} ({} 行)", self.output_path, results.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationFailure;
    use crate::models::card::GeneratedCard;
    use crate::models::record::RecordIdentity;

    fn results() -> Vec<GenerationResult> {
        let identity = |row: usize, code: &str| RecordIdentity {
            row,
            code: Some(code.to_string()),
        };
        vec![
            GenerationResult::Success(GeneratedCard {
                identity: identity(1, "A-1"),
                title: "Sedia, ergonomica".to_string(),
                description: "Riga uno\nRiga due".to_string(),
                meta_title: "Sedia".to_string(),
                meta_description: "Sedia \"comoda\"".to_string(),
            }),
            GenerationResult::Failure {
                identity: identity(2, "A-2"),
                failure: GenerationFailure::Timeout { attempts: 3 },
            },
            GenerationResult::NotAttempted {
                identity: identity(3, "A-3"),
            },
        ]
    }

    #[test]
    fn test_one_row_per_result_with_status() {
        let writer = ResultWriter::new("out.csv", Some("codice".to_string()));
        let bytes = writer.to_csv_bytes(&results()).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "row");
        assert_eq!(&headers[1], "codice");
        assert_eq!(&headers[6], "status");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);

        assert_eq!(&rows[0][2], "Sedia, ergonomica");
        assert_eq!(&rows[0][3], "Riga uno\nRiga due");
        assert_eq!(&rows[0][5], "Sedia \"comoda\"");
        assert_eq!(&rows[0][6], "success");
        assert_eq!(&rows[0][7], "");

        assert_eq!(&rows[1][1], "A-2");
        assert_eq!(&rows[1][2], "");
        assert_eq!(&rows[1][6], "failure: timeout");
        assert!(!rows[1][7].is_empty());

        assert_eq!(&rows[2][6], "not attempted");
    }

    #[test]
    fn test_without_identity_column() {
        let writer = ResultWriter::new("out.csv", None);
        let bytes = writer.to_csv_bytes(&results()).unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        assert_eq!(reader.headers().unwrap().len(), 7);
    }
}
