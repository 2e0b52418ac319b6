use crate::cli::PlanFormat;
use comfy_table::{ContentArrangement, Table};
use gsi_manager::model::{IndexConfiguration, IndexInfo, ProvisionedThroughput};
use gsi_manager::{Operation, OperationKind, Preview};
use serde_json::json;

fn throughput_text(throughput: Option<ProvisionedThroughput>) -> String {
    match throughput {
        Some(t) => format!("{}/{}", t.read_capacity_units, t.write_capacity_units),
        None => "on-demand".to_string(),
    }
}

fn keys_text(config: &IndexConfiguration) -> String {
    match &config.sort_key {
        Some(sort) => format!(
            "{} ({}), {} ({})",
            config.partition_key.name,
            config.partition_key.attribute_type.as_str(),
            sort.name,
            sort.attribute_type.as_str()
        ),
        None => format!(
            "{} ({})",
            config.partition_key.name,
            config.partition_key.attribute_type.as_str()
        ),
    }
}

fn observed_keys_text(info: &IndexInfo) -> String {
    match (info.hash_key(), info.range_key()) {
        (Some(hash), Some(range)) => format!("{hash}, {range}"),
        (Some(hash), None) => hash.to_string(),
        _ => String::new(),
    }
}

/// One-line description of what an operation changes.
pub fn operation_detail(op: &Operation) -> String {
    match (op.kind, &op.desired, &op.current) {
        (OperationKind::Create, Some(desired), _) => format!(
            "keys {}; projection {}; throughput {}",
            keys_text(desired),
            desired.projection_type.as_str(),
            throughput_text(desired.provisioned_throughput)
        ),
        (OperationKind::Update, Some(desired), Some(current)) => format!(
            "throughput {} -> {}",
            throughput_text(current.provisioned_throughput),
            throughput_text(desired.provisioned_throughput)
        ),
        (OperationKind::Delete, _, Some(current)) => {
            format!("keys {}", observed_keys_text(current))
        }
        _ => String::new(),
    }
}

pub fn format_preview(preview: &Preview, format: PlanFormat) -> String {
    match format {
        PlanFormat::Json => {
            let operations: Vec<_> = preview
                .operations
                .iter()
                .map(|op| {
                    json!({
                        "operation": op.kind,
                        "indexName": op.index_name,
                        "detail": operation_detail(op),
                    })
                })
                .collect();
            let value = json!({
                "operations": operations,
                "adopted": preview.resolution.adopted,
                "untrackedCount": preview.resolution.untracked_count,
                "inFlight": preview.in_flight,
            });
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        }
        PlanFormat::Table => format_preview_table(preview),
    }
}

fn format_preview_table(preview: &Preview) -> String {
    let mut lines = Vec::new();

    if preview.operations.is_empty() {
        lines.push("No changes. Indexes match the declaration.".to_string());
    } else {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["#", "OPERATION", "INDEX", "DETAIL"]);
        for (position, op) in preview.operations.iter().enumerate() {
            table.add_row(vec![
                (position + 1).to_string(),
                op.kind.to_string(),
                op.index_name.clone(),
                operation_detail(op),
            ]);
        }
        lines.push(table.to_string());
    }

    if preview.resolution.adopted {
        lines.push(format!(
            "{} untracked index(es) adopted for reconciliation",
            preview.resolution.untracked_count
        ));
    } else if preview.resolution.untracked_count > 0 {
        lines.push(format!(
            "{} untracked index(es) left untouched",
            preview.resolution.untracked_count
        ));
    }
    if let Some(index) = &preview.in_flight {
        lines.push(format!("{index} is mid-mutation; nothing new starts until it settles"));
    }

    lines.join("\n")
}

/// Pretty JSON for framework responses.
pub fn format_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
