// ==========================================
// 工程项目管理核心 - 付款资格数据仓储
// ==========================================
// 红线: 只由付款资格引擎写入（同事务），不提供手工编辑入口
// ==========================================

use crate::db::{format_ts, ts_column};
use crate::domain::eligibility::{EligibilityVerdict, IneligibleReason};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};

// ==========================================
// EligibilityRepository - 付款资格仓储
// ==========================================
pub struct EligibilityRepository;

impl EligibilityRepository {
    /// 写入（覆盖）里程碑的最新判定
    pub fn upsert_tx(conn: &Connection, verdict: &EligibilityVerdict) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO payment_eligibility (milestone_id, eligible, reason_code, reason, computed_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(milestone_id) DO UPDATE SET
                   eligible = excluded.eligible,
                   reason_code = excluded.reason_code,
                   reason = excluded.reason,
                   computed_at = excluded.computed_at"#,
            params![
                &verdict.milestone_id,
                verdict.eligible,
                verdict.reason_code.map(|r| r.to_db_str()),
                &verdict.reason,
                format_ts(&verdict.computed_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_milestone_in(
        conn: &Connection,
        milestone_id: &str,
    ) -> RepositoryResult<Option<EligibilityVerdict>> {
        let verdict = conn
            .query_row(
                r#"SELECT milestone_id, eligible, reason_code, reason, computed_at
                   FROM payment_eligibility WHERE milestone_id = ?"#,
                params![milestone_id],
                |row| {
                    Ok(EligibilityVerdict {
                        milestone_id: row.get(0)?,
                        eligible: row.get(1)?,
                        reason_code: row
                            .get::<_, Option<String>>(2)?
                            .and_then(|s| IneligibleReason::from_db_str(&s)),
                        reason: row.get(3)?,
                        computed_at: ts_column(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(verdict)
    }
}
