use super::MilestoneRepository;
use crate::db::{format_ts, ts_column};
use crate::domain::milestone::{Evidence, EvidenceFile};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection};

impl MilestoneRepository {
    // ==========================================
    // 证据
    // ==========================================

    /// 写入证据及其附件
    pub fn insert_evidence_tx(conn: &Connection, evidence: &Evidence) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO evidence (evidence_id, milestone_id, submitted_by, note, submitted_at)
               VALUES (?, ?, ?, ?, ?)"#,
            params![
                &evidence.evidence_id,
                &evidence.milestone_id,
                &evidence.submitted_by,
                &evidence.note,
                format_ts(&evidence.submitted_at),
            ],
        )?;

        let mut stmt = conn.prepare(
            r#"INSERT INTO evidence_file (
                file_id, evidence_id, file_name, storage_key, content_type, size_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )?;
        for file in &evidence.files {
            stmt.execute(params![
                &file.file_id,
                &evidence.evidence_id,
                &file.file_name,
                &file.storage_key,
                &file.content_type,
                file.size_bytes,
            ])?;
        }

        Ok(())
    }

    pub fn count_evidence_in(conn: &Connection, milestone_id: &str) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM evidence WHERE milestone_id = ?",
            params![milestone_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 查询里程碑的证据（含附件，按提交时间）
    pub fn find_evidence_in(conn: &Connection, milestone_id: &str) -> RepositoryResult<Vec<Evidence>> {
        let mut stmt = conn.prepare(
            r#"SELECT evidence_id, milestone_id, submitted_by, note, submitted_at
               FROM evidence WHERE milestone_id = ?
               ORDER BY submitted_at ASC, rowid ASC"#,
        )?;
        let mut evidence = stmt
            .query_map(params![milestone_id], |row| {
                Ok(Evidence {
                    evidence_id: row.get(0)?,
                    milestone_id: row.get(1)?,
                    submitted_by: row.get(2)?,
                    note: row.get(3)?,
                    submitted_at: ts_column(row, 4)?,
                    files: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut file_stmt = conn.prepare(
            r#"SELECT file_id, file_name, storage_key, content_type, size_bytes
               FROM evidence_file WHERE evidence_id = ? ORDER BY rowid ASC"#,
        )?;
        for item in evidence.iter_mut() {
            item.files = file_stmt
                .query_map(params![&item.evidence_id], |row| {
                    Ok(EvidenceFile {
                        file_id: row.get(0)?,
                        file_name: row.get(1)?,
                        storage_key: row.get(2)?,
                        content_type: row.get(3)?,
                        size_bytes: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(evidence)
    }
}
