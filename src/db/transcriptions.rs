//! Transcription record persistence and queries

use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// One row of medical-transcription data
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionRecord {
    pub id: i64,
    pub sample_name: Option<String>,
    pub description: Option<String>,
    pub medical_specialty: String,
    pub transcription: String,
    pub keywords: Option<String>,
    /// Name of the CSV file this record was imported from
    pub source_file: String,
    /// Set by the database on insert; None until the record is loaded back
    pub imported_at: Option<String>,
    /// Generated clinical insight, serialized as JSON
    pub insight: Option<String>,
}

impl TranscriptionRecord {
    /// Create new record with the fields every import row carries
    pub fn new(id: i64, medical_specialty: String, transcription: String, source_file: String) -> Self {
        Self {
            id,
            sample_name: None,
            description: None,
            medical_specialty,
            transcription,
            keywords: None,
            source_file,
            imported_at: None,
            insight: None,
        }
    }
}

/// Filter for record listing
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Exact medical specialty match
    pub specialty: Option<String>,
    /// Substring matched against transcription, description, and keywords
    pub keyword: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Specialty summary entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialtyCount {
    pub specialty: String,
    pub count: i64,
}

const SELECT_COLUMNS: &str = "id, sample_name, description, medical_specialty, transcription, \
     keywords, source_file, imported_at, insight";

/// Insert record, skipping silently when the id already exists.
///
/// Returns true when a row was inserted, false when the id was a duplicate.
pub async fn insert_record(pool: &SqlitePool, record: &TranscriptionRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO transcriptions (
            id, sample_name, description, medical_specialty, transcription,
            keywords, source_file, imported_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(record.id)
    .bind(&record.sample_name)
    .bind(&record.description)
    .bind(&record.medical_specialty)
    .bind(&record.transcription)
    .bind(&record.keywords)
    .bind(&record.source_file)
    .execute(pool)
    .await
    .map_err(|e| classify_write_error(e, record.id))?;

    Ok(result.rows_affected() > 0)
}

/// Update the mutable fields of an existing record
pub async fn update_record(pool: &SqlitePool, record: &TranscriptionRecord) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE transcriptions SET
            sample_name = ?,
            description = ?,
            medical_specialty = ?,
            transcription = ?,
            keywords = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&record.sample_name)
    .bind(&record.description)
    .bind(&record.medical_specialty)
    .bind(&record.transcription)
    .bind(&record.keywords)
    .bind(record.id)
    .execute(pool)
    .await
    .map_err(|e| classify_write_error(e, record.id))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("transcription record {}", record.id)));
    }

    Ok(())
}

/// Store a generated clinical insight on a record
pub async fn attach_insight(pool: &SqlitePool, id: i64, insight: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE transcriptions SET
            insight = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(insight)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("transcription record {}", id)));
    }

    Ok(())
}

/// Load record by id
pub async fn fetch_record(pool: &SqlitePool, id: i64) -> Result<TranscriptionRecord> {
    let sql = format!("SELECT {} FROM transcriptions WHERE id = ?", SELECT_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    match row {
        Some(row) => record_from_row(&row),
        None => Err(Error::NotFound(format!("transcription record {}", id))),
    }
}

/// List records matching the filter, ordered by id
pub async fn list_records(
    pool: &SqlitePool,
    filter: &RecordFilter,
) -> Result<Vec<TranscriptionRecord>> {
    let mut sql = format!("SELECT {} FROM transcriptions", SELECT_COLUMNS);

    let mut clauses = Vec::new();
    if filter.specialty.is_some() {
        clauses.push("medical_specialty = ?");
    }
    if filter.keyword.is_some() {
        clauses.push("(transcription LIKE ? OR description LIKE ? OR keywords LIKE ?)");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");

    let mut query = sqlx::query(&sql);
    if let Some(specialty) = &filter.specialty {
        query = query.bind(specialty);
    }
    if let Some(keyword) = &filter.keyword {
        let pattern = format!("%{}%", keyword);
        query = query.bind(pattern.clone()).bind(pattern.clone()).bind(pattern);
    }
    // SQLite treats LIMIT -1 as unbounded
    query = query.bind(filter.limit.unwrap_or(-1)).bind(filter.offset.unwrap_or(0));

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(record_from_row).collect()
}

/// Count of records per medical specialty, most frequent first
pub async fn specialty_counts(pool: &SqlitePool) -> Result<Vec<SpecialtyCount>> {
    let rows = sqlx::query(
        r#"
        SELECT medical_specialty, COUNT(*) as count
        FROM transcriptions
        GROUP BY medical_specialty
        ORDER BY count DESC, medical_specialty ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| SpecialtyCount {
            specialty: row.get("medical_specialty"),
            count: row.get("count"),
        })
        .collect())
}

/// Total number of stored records
pub async fn count_records(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transcriptions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn record_from_row(row: &SqliteRow) -> Result<TranscriptionRecord> {
    Ok(TranscriptionRecord {
        id: row.get("id"),
        sample_name: row.get("sample_name"),
        description: row.get("description"),
        medical_specialty: row.get("medical_specialty"),
        transcription: row.get("transcription"),
        keywords: row.get("keywords"),
        source_file: row.get("source_file"),
        imported_at: row.get("imported_at"),
        insight: row.get("insight"),
    })
}

/// Surface constraint violations as validation errors per the data contract
fn classify_write_error(e: sqlx::Error, id: i64) -> Error {
    let constraint = match &e {
        sqlx::Error::Database(db) => matches!(
            db.kind(),
            sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation
        ),
        _ => false,
    };

    if constraint {
        Error::Validation(format!("constraint violation on record {}: {}", id, e))
    } else {
        Error::from(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::init_tables(&pool)
            .await
            .expect("Failed to initialize tables");
        pool
    }

    fn sample_record(id: i64, specialty: &str, text: &str) -> TranscriptionRecord {
        let mut record = TranscriptionRecord::new(
            id,
            specialty.to_string(),
            text.to_string(),
            "mtsamples.csv".to_string(),
        );
        record.sample_name = Some(format!("Sample {}", id));
        record.description = Some(format!("Description {}", id));
        record.keywords = Some("cardiology, echocardiogram".to_string());
        record
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let pool = test_pool().await;
        let record = sample_record(1, "Cardiovascular / Pulmonary", "2-D M-MODE: normal LV");

        assert!(insert_record(&pool, &record).await.unwrap());

        let loaded = fetch_record(&pool, 1).await.unwrap();
        assert_eq!(loaded.medical_specialty, "Cardiovascular / Pulmonary");
        assert_eq!(loaded.transcription, "2-D M-MODE: normal LV");
        assert_eq!(loaded.source_file, "mtsamples.csv");
        assert!(loaded.imported_at.is_some());
        assert!(loaded.insight.is_none());
    }

    #[tokio::test]
    async fn fetch_unknown_id_is_not_found() {
        let pool = test_pool().await;
        let err = fetch_record(&pool, 42).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_id_is_skipped_not_overwritten() {
        let pool = test_pool().await;
        let first = sample_record(7, "Neurology", "original text");
        let second = sample_record(7, "Radiology", "replacement text");

        assert!(insert_record(&pool, &first).await.unwrap());
        assert!(!insert_record(&pool, &second).await.unwrap());

        let loaded = fetch_record(&pool, 7).await.unwrap();
        assert_eq!(loaded.medical_specialty, "Neurology");
        assert_eq!(loaded.transcription, "original text");
        assert_eq!(count_records(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn specialty_filter_matches_exactly() {
        let pool = test_pool().await;
        insert_record(&pool, &sample_record(1, "Neurology", "a")).await.unwrap();
        insert_record(&pool, &sample_record(2, "Neurology / Neurosurgery", "b")).await.unwrap();
        insert_record(&pool, &sample_record(3, "Neurology", "c")).await.unwrap();

        let filter = RecordFilter {
            specialty: Some("Neurology".to_string()),
            ..Default::default()
        };
        let results = list_records(&pool, &filter).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.medical_specialty == "Neurology"));
    }

    #[tokio::test]
    async fn keyword_filter_searches_all_text_columns() {
        let pool = test_pool().await;

        let mut in_text = sample_record(1, "Cardiology", "patient shows mitral regurgitation");
        in_text.keywords = None;
        in_text.description = None;
        insert_record(&pool, &in_text).await.unwrap();

        let mut in_description = sample_record(2, "Cardiology", "unrelated");
        in_description.description = Some("mitral valve replacement".to_string());
        in_description.keywords = None;
        insert_record(&pool, &in_description).await.unwrap();

        let mut in_keywords = sample_record(3, "Cardiology", "unrelated");
        in_keywords.description = None;
        in_keywords.keywords = Some("mitral, valve".to_string());
        insert_record(&pool, &in_keywords).await.unwrap();

        insert_record(&pool, &sample_record(4, "Cardiology", "nothing relevant")).await.unwrap();

        let filter = RecordFilter {
            keyword: Some("mitral".to_string()),
            ..Default::default()
        };
        let results = list_records(&pool, &filter).await.unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn limit_and_offset_page_results() {
        let pool = test_pool().await;
        for id in 1..=5 {
            insert_record(&pool, &sample_record(id, "Urology", "text")).await.unwrap();
        }

        let filter = RecordFilter {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        };
        let results = list_records(&pool, &filter).await.unwrap();
        let ids: Vec<i64> = results.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn update_record_rewrites_fields() {
        let pool = test_pool().await;
        let mut record = sample_record(9, "Orthopedic", "initial");
        insert_record(&pool, &record).await.unwrap();

        record.transcription = "revised".to_string();
        record.keywords = None;
        update_record(&pool, &record).await.unwrap();

        let loaded = fetch_record(&pool, 9).await.unwrap();
        assert_eq!(loaded.transcription, "revised");
        assert!(loaded.keywords.is_none());
    }

    #[tokio::test]
    async fn update_missing_record_is_not_found() {
        let pool = test_pool().await;
        let record = sample_record(99, "Orthopedic", "text");
        let err = update_record(&pool, &record).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn attach_insight_stores_json() {
        let pool = test_pool().await;
        insert_record(&pool, &sample_record(3, "Cardiology", "text")).await.unwrap();

        attach_insight(&pool, 3, r#"{"summary":"ok"}"#).await.unwrap();

        let loaded = fetch_record(&pool, 3).await.unwrap();
        assert_eq!(loaded.insight.as_deref(), Some(r#"{"summary":"ok"}"#));

        let err = attach_insight(&pool, 404, "{}").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn specialty_counts_order_by_frequency() {
        let pool = test_pool().await;
        insert_record(&pool, &sample_record(1, "Radiology", "a")).await.unwrap();
        insert_record(&pool, &sample_record(2, "Radiology", "b")).await.unwrap();
        insert_record(&pool, &sample_record(3, "Urology", "c")).await.unwrap();

        let counts = specialty_counts(&pool).await.unwrap();

        assert_eq!(
            counts,
            vec![
                SpecialtyCount { specialty: "Radiology".to_string(), count: 2 },
                SpecialtyCount { specialty: "Urology".to_string(), count: 1 },
            ]
        );
    }
}
