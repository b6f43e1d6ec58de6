// ==========================================
// 工程项目管理核心 - 里程碑数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（转换合法性由状态机判定）
// 并发: milestone.revision + state 作为 CAS 条件
// ==========================================

mod evidence;

use crate::db::{format_ts, opt_ts_column, ts_column};
use crate::domain::milestone::Milestone;
use crate::domain::types::MilestoneState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

const MILESTONE_COLUMNS: &str = r#"milestone_id, project_id, boq_id, title, state, is_extra,
    extra_approved_at, extra_approved_by, revision, created_by, created_at, updated_at"#;

// ==========================================
// MilestoneRepository - 里程碑仓储
// ==========================================
pub struct MilestoneRepository;

impl MilestoneRepository {
    // ==========================================
    // 写入操作（事务内调用）
    // ==========================================

    pub fn insert_tx(conn: &Connection, milestone: &Milestone) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO milestone (
                milestone_id, project_id, boq_id, title, state, is_extra,
                extra_approved_at, extra_approved_by, revision, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &milestone.milestone_id,
                &milestone.project_id,
                &milestone.boq_id,
                &milestone.title,
                milestone.state.to_db_str(),
                milestone.is_extra,
                milestone.extra_approved_at.as_ref().map(format_ts),
                &milestone.extra_approved_by,
                milestone.revision,
                &milestone.created_by,
                format_ts(&milestone.created_at),
                format_ts(&milestone.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn link_items_tx(conn: &Connection, milestone_id: &str, item_ids: &[String]) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO milestone_boq_item (milestone_id, item_id) VALUES (?1, ?2)",
        )?;
        let mut count = 0;
        for item_id in item_ids {
            count += stmt.execute(params![milestone_id, item_id])?;
        }
        Ok(count)
    }

    /// 更新状态 (带乐观锁检查)
    ///
    /// # 并发控制
    /// 以 (state, revision) 为条件，基于同一基线的并发转换只有一个能成功
    ///
    /// # 返回
    /// - Ok(new_revision)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: 基线已变化
    /// - `RepositoryError::NotFound`: milestone_id不存在
    pub fn update_state_tx(
        conn: &Connection,
        milestone_id: &str,
        from_state: MilestoneState,
        expected_revision: i32,
        to_state: MilestoneState,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<i32> {
        let rows_affected = conn.execute(
            r#"UPDATE milestone
               SET state = ?, revision = revision + 1, updated_at = ?
               WHERE milestone_id = ? AND state = ? AND revision = ?"#,
            params![
                to_state.to_db_str(),
                format_ts(updated_at),
                milestone_id,
                from_state.to_db_str(),
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::cas_failure(
                conn,
                milestone_id,
                format!("{}@{}", from_state, expected_revision),
            )?);
        }

        Ok(expected_revision + 1)
    }

    /// 写入额外工作审批信息（只允许一次）
    pub fn set_extra_approval_tx(
        conn: &Connection,
        milestone_id: &str,
        expected_revision: i32,
        approved_by: &str,
        approved_at: &NaiveDateTime,
    ) -> RepositoryResult<i32> {
        let rows_affected = conn.execute(
            r#"UPDATE milestone
               SET extra_approved_at = ?, extra_approved_by = ?, revision = revision + 1, updated_at = ?
               WHERE milestone_id = ? AND revision = ?
                 AND is_extra = 1 AND extra_approved_at IS NULL"#,
            params![
                format_ts(approved_at),
                approved_by,
                format_ts(approved_at),
                milestone_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::cas_failure(
                conn,
                milestone_id,
                format!("UNAPPROVED@{}", expected_revision),
            )?);
        }

        Ok(expected_revision + 1)
    }

    fn cas_failure(conn: &Connection, milestone_id: &str, expected: String) -> RepositoryResult<RepositoryError> {
        let actual: Option<(String, i32)> = conn
            .query_row(
                "SELECT state, revision FROM milestone WHERE milestone_id = ?",
                params![milestone_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(match actual {
            Some((state, revision)) => RepositoryError::OptimisticLockFailure {
                entity: "Milestone".to_string(),
                id: milestone_id.to_string(),
                expected,
                actual: format!("{}@{}", state, revision),
            },
            None => RepositoryError::not_found("Milestone", milestone_id),
        })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, milestone_id: &str) -> RepositoryResult<Option<Milestone>> {
        let sql = format!("SELECT {} FROM milestone WHERE milestone_id = ?", MILESTONE_COLUMNS);
        let row = conn
            .query_row(&sql, params![milestone_id], Self::map_row)
            .optional()?;
        row.transpose()
    }

    /// 查询挂在某个 BOQ 上的全部里程碑
    pub fn find_by_boq_in(conn: &Connection, boq_id: &str) -> RepositoryResult<Vec<Milestone>> {
        let sql = format!(
            "SELECT {} FROM milestone WHERE boq_id = ? ORDER BY created_at ASC",
            MILESTONE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![boq_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    pub fn linked_item_ids_in(conn: &Connection, milestone_id: &str) -> RepositoryResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT item_id FROM milestone_boq_item WHERE milestone_id = ? ORDER BY item_id",
        )?;
        let ids = stmt
            .query_map(params![milestone_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// 映射数据库行到Milestone对象
    ///
    /// 状态列出现未知值时返回 DataIntegrityError，而不是静默降级为 DRAFT
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<RepositoryResult<Milestone>> {
        let state_str: String = row.get(4)?;
        let state = match MilestoneState::from_db_str(&state_str) {
            Some(s) => s,
            None => {
                return Ok(Err(RepositoryError::DataIntegrityError {
                    field: "milestone.state".to_string(),
                    message: format!("未知状态: {}", state_str),
                }))
            }
        };

        Ok(Ok(Milestone {
            milestone_id: row.get(0)?,
            project_id: row.get(1)?,
            boq_id: row.get(2)?,
            title: row.get(3)?,
            state,
            is_extra: row.get(5)?,
            extra_approved_at: opt_ts_column(row, 6)?,
            extra_approved_by: row.get(7)?,
            revision: row.get(8)?,
            created_by: row.get(9)?,
            created_at: ts_column(row, 10)?,
            updated_at: ts_column(row, 11)?,
        }))
    }
}
