use crate::models::job::{ExportRow, JobRecord, RelationKind};
use crate::store::{JobFilter, JobStore, StoreError};

pub const CSV_HEADER: [&str; 13] = [
    "id",
    "title",
    "company",
    "location",
    "source",
    "status",
    "skills",
    "experienceRequired",
    "salaryRange",
    "recruiter",
    "applicationCount",
    "createdAt",
    "isDuplicate",
];

fn to_row(record: JobRecord, application_count: u64) -> ExportRow {
    ExportRow {
        id: record.id,
        title: record.title,
        company: record.company,
        location: record.location,
        source: record.source,
        status: record.status,
        skills: record.skills.join(", "),
        experience_required: record.experience_required.unwrap_or_default(),
        salary_range: record.salary_range.unwrap_or_default(),
        recruiter: record
            .recruiter_id
            .map(|id| id.to_string())
            .unwrap_or_default(),
        application_count,
        created_at: record.created_at,
        is_duplicate: record.is_duplicate,
    }
}

/// Flat export rows for every record matching `filter`, in store order.
pub async fn export_rows(
    store: &dyn JobStore,
    filter: &JobFilter,
) -> Result<Vec<ExportRow>, StoreError> {
    let records = store.find_existing(filter).await?;
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let applications = store
            .relations_for(record.id)
            .await?
            .iter()
            .filter(|r| r.kind == RelationKind::Application)
            .count() as u64;
        rows.push(to_row(record, applications));
    }
    Ok(rows)
}

/// RFC 4180 field quoting.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = csv_line(&CSV_HEADER);
    for row in rows {
        let id = row.id.to_string();
        let application_count = row.application_count.to_string();
        let created_at = row.created_at.to_rfc3339();
        out.push_str(&csv_line(&[
            id.as_str(),
            row.title.as_str(),
            row.company.as_str(),
            row.location.as_str(),
            row.source.as_str(),
            row.status.as_str(),
            row.skills.as_str(),
            row.experience_required.as_str(),
            row.salary_range.as_str(),
            row.recruiter.as_str(),
            application_count.as_str(),
            created_at.as_str(),
            if row.is_duplicate { "true" } else { "false" },
        ]));
    }
    out
}
