// ==========================================
// 工程项目管理核心 - BOQ 数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: boq_item 历史修订行只插入，不更新
// 并发: boq.revision_no 作为乐观锁字段 (CAS)
// ==========================================

mod items;

use crate::db::{format_ts, opt_ts_column, ts_column};
use crate::domain::boq::{Boq, BoqRevision};
use crate::domain::types::BoqStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

// ==========================================
// BoqRepository - BOQ 仓储
// ==========================================
/// 无状态: 所有操作接收调用方持有的连接或事务
pub struct BoqRepository;

impl BoqRepository {
    // ==========================================
    // 写入操作（事务内调用）
    // ==========================================

    pub fn insert_tx(conn: &Connection, boq: &Boq) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO boq (
                boq_id, project_id, title, status, revision_no,
                approved_at, approved_by, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &boq.boq_id,
                &boq.project_id,
                &boq.title,
                boq.status.to_db_str(),
                boq.revision_no,
                boq.approved_at.as_ref().map(format_ts),
                &boq.approved_by,
                &boq.created_by,
                format_ts(&boq.created_at),
                format_ts(&boq.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn insert_revision_tx(conn: &Connection, revision: &BoqRevision) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO boq_revision (
                boq_id, revision_no, reason, item_count, total_amount, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &revision.boq_id,
                revision.revision_no,
                &revision.reason,
                revision.item_count,
                revision.total_amount,
                &revision.created_by,
                format_ts(&revision.created_at),
            ],
        )?;
        Ok(())
    }

    /// 推进修订号 (带乐观锁检查)
    ///
    /// 新修订一律回到 DRAFT，审批只对具体修订生效
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision_no 不匹配 (其他请求已修订)
    /// - `RepositoryError::NotFound`: boq_id 不存在
    pub fn advance_revision_tx(
        conn: &Connection,
        boq_id: &str,
        expected_revision_no: i32,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<i32> {
        let rows_affected = conn.execute(
            r#"UPDATE boq
               SET revision_no = revision_no + 1, status = 'DRAFT',
                   approved_at = NULL, approved_by = NULL, updated_at = ?
               WHERE boq_id = ? AND revision_no = ?"#,
            params![format_ts(updated_at), boq_id, expected_revision_no],
        )?;

        if rows_affected == 0 {
            return Err(Self::cas_failure(conn, boq_id, expected_revision_no.to_string())?);
        }

        Ok(expected_revision_no + 1)
    }

    /// 审批 BOQ (DRAFT -> APPROVED，带修订号与状态双重检查)
    pub fn approve_tx(
        conn: &Connection,
        boq_id: &str,
        expected_revision_no: i32,
        approved_by: &str,
        approved_at: &NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows_affected = conn.execute(
            r#"UPDATE boq
               SET status = 'APPROVED', approved_at = ?, approved_by = ?, updated_at = ?
               WHERE boq_id = ? AND revision_no = ? AND status = 'DRAFT'"#,
            params![
                format_ts(approved_at),
                approved_by,
                format_ts(approved_at),
                boq_id,
                expected_revision_no,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::cas_failure(
                conn,
                boq_id,
                format!("DRAFT@{}", expected_revision_no),
            )?);
        }

        Ok(())
    }

    /// 判断是记录不存在还是 CAS 冲突
    fn cas_failure(conn: &Connection, boq_id: &str, expected: String) -> RepositoryResult<RepositoryError> {
        let actual: Option<(String, i32)> = conn
            .query_row(
                "SELECT status, revision_no FROM boq WHERE boq_id = ?",
                params![boq_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match actual {
            Some((status, revision_no)) => RepositoryError::OptimisticLockFailure {
                entity: "Boq".to_string(),
                id: boq_id.to_string(),
                expected,
                actual: format!("{}@{}", status, revision_no),
            },
            None => RepositoryError::not_found("Boq", boq_id),
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, boq_id: &str) -> RepositoryResult<Option<Boq>> {
        let boq = conn
            .query_row(
                r#"SELECT boq_id, project_id, title, status, revision_no,
                          approved_at, approved_by, created_by, created_at, updated_at
                   FROM boq WHERE boq_id = ?"#,
                params![boq_id],
                Self::map_row,
            )
            .optional()?;
        Ok(boq)
    }

    /// 修订历史（按修订号升序）
    pub fn list_revisions_in(conn: &Connection, boq_id: &str) -> RepositoryResult<Vec<BoqRevision>> {
        let mut stmt = conn.prepare(
            r#"SELECT boq_id, revision_no, reason, item_count, total_amount, created_by, created_at
               FROM boq_revision WHERE boq_id = ? ORDER BY revision_no ASC"#,
        )?;
        let revisions = stmt
            .query_map(params![boq_id], |row| {
                Ok(BoqRevision {
                    boq_id: row.get(0)?,
                    revision_no: row.get(1)?,
                    reason: row.get(2)?,
                    item_count: row.get(3)?,
                    total_amount: row.get(4)?,
                    created_by: row.get(5)?,
                    created_at: ts_column(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(revisions)
    }

    /// 映射数据库行到Boq对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Boq> {
        let status_str: String = row.get(3)?;
        Ok(Boq {
            boq_id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            status: BoqStatus::from_str(&status_str),
            revision_no: row.get(4)?,
            approved_at: opt_ts_column(row, 5)?,
            approved_by: row.get(6)?,
            created_by: row.get(7)?,
            created_at: ts_column(row, 8)?,
            updated_at: ts_column(row, 9)?,
        })
    }
}
