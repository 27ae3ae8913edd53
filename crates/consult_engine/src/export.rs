use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use consult_core::{cluster_sizes, Record};
use serde_json::json;

use crate::persist::{AtomicFileWriter, PersistError};

/// Largest clusters listed in the manifest.
const MANIFEST_TOP_CLUSTERS: usize = 10;

const IDENTIFIER_COLUMN: &str = "identifier";
const TRAILING_COLUMNS: [&str; 4] = ["text", "attachment_text", "attachment_error", "cluster"];

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_filename: String,
    pub manifest_filename: Option<String>,
    /// Stamped into the manifest as `exported_utc`.
    pub exported_utc: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_filename: "records.csv".to_string(),
            manifest_filename: Some("manifest.json".to_string()),
            exported_utc: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub record_count: usize,
    pub cluster_count: usize,
    pub output_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv buffer: {0}")]
    Buffer(String),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Writes one CSV row per record: `identifier`, every metadata key seen in
/// any record (sorted), `text`, `attachment_text`, `attachment_error` and
/// `cluster`. Missing values are empty cells. A metadata key that collides
/// with a fixed column is written as `field_<key>`.
pub fn export_records(
    records: &[Record],
    output_dir: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let field_keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.fields.keys().map(String::as_str))
        .collect();

    let mut header = vec![IDENTIFIER_COLUMN.to_string()];
    header.extend(field_keys.iter().map(|key| field_column(key, &field_keys)));
    header.extend(TRAILING_COLUMNS.map(String::from));

    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    csv_writer.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(header.len());
        row.push(record.identifier.clone());
        row.extend(
            field_keys
                .iter()
                .map(|key| record.field(key).unwrap_or_default().to_string()),
        );
        row.push(record.inline_text.clone().unwrap_or_default());
        row.push(record.attachment_text.clone().unwrap_or_default());
        row.push(record.attachment_error.clone().unwrap_or_default());
        row.push(record.cluster_id.map(|id| id.to_string()).unwrap_or_default());
        csv_writer.write_record(&row)?;
    }
    let bytes = csv_writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.to_string()))?;

    let writer = AtomicFileWriter::new(output_dir);
    let output_path = writer.write_bytes(&options.output_filename, &bytes)?;

    let sizes = cluster_sizes(records);
    let manifest_path = match &options.manifest_filename {
        Some(name) => {
            let manifest = json!({
                "records": records.len(),
                "clusters": sizes.len(),
                "clustered_records": records.iter().filter(|r| r.cluster_id.is_some()).count(),
                "largest_clusters": sizes
                    .iter()
                    .take(MANIFEST_TOP_CLUSTERS)
                    .map(|(id, size)| json!({ "cluster": id, "size": size }))
                    .collect::<Vec<_>>(),
                "columns": header,
                "exported_utc": options.exported_utc,
            });
            let content = serde_json::to_string_pretty(&manifest)
                .map_err(|err| ExportError::Buffer(err.to_string()))?;
            Some(writer.write(name, &content)?)
        }
        None => None,
    };

    Ok(ExportSummary {
        record_count: records.len(),
        cluster_count: sizes.len(),
        output_path,
        manifest_path,
    })
}

fn is_reserved(name: &str) -> bool {
    name == IDENTIFIER_COLUMN || TRAILING_COLUMNS.contains(&name)
}

fn field_column(key: &str, field_keys: &BTreeSet<&str>) -> String {
    if !is_reserved(key) {
        return key.to_string();
    }
    let mut name = format!("field_{key}");
    while field_keys.contains(name.as_str()) {
        name.insert_str(0, "field_");
    }
    name
}
