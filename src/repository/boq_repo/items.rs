use super::BoqRepository;
use crate::db::{format_ts, ts_column};
use crate::domain::boq::{BoqItem, BoqItemProgress};
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection};
use std::collections::HashSet;

impl BoqRepository {
    // ==========================================
    // 修订条目
    // ==========================================

    /// 批量写入某一修订的条目快照
    pub fn insert_items_tx(
        conn: &Connection,
        boq_id: &str,
        revision_no: i32,
        items: &[BoqItem],
    ) -> RepositoryResult<usize> {
        let mut stmt = conn.prepare(
            r#"INSERT INTO boq_item (
                boq_id, revision_no, item_id, seq_no, description, unit, planned_quantity, rate
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )?;

        let mut count = 0;
        for item in items {
            stmt.execute(params![
                boq_id,
                revision_no,
                &item.item_id,
                item.seq_no,
                &item.description,
                &item.unit,
                item.planned_quantity,
                item.rate,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 查询指定修订的条目（按序号）
    pub fn find_items_in(conn: &Connection, boq_id: &str, revision_no: i32) -> RepositoryResult<Vec<BoqItem>> {
        let mut stmt = conn.prepare(
            r#"SELECT item_id, seq_no, description, unit, planned_quantity, rate
               FROM boq_item
               WHERE boq_id = ? AND revision_no = ?
               ORDER BY seq_no ASC"#,
        )?;

        let items = stmt
            .query_map(params![boq_id, revision_no], |row| {
                Ok(BoqItem {
                    item_id: row.get(0)?,
                    seq_no: row.get(1)?,
                    description: row.get(2)?,
                    unit: row.get(3)?,
                    planned_quantity: row.get(4)?,
                    rate: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    // ==========================================
    // 进度/付款记录
    // ==========================================

    pub fn insert_progress_tx(conn: &Connection, progress: &BoqItemProgress) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO boq_item_progress (
                progress_id, boq_id, item_id, milestone_id, quantity, amount, recorded_by, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &progress.progress_id,
                &progress.boq_id,
                &progress.item_id,
                &progress.milestone_id,
                progress.quantity,
                progress.amount,
                &progress.recorded_by,
                format_ts(&progress.recorded_at),
            ],
        )?;
        Ok(())
    }

    /// 返回给定条目中已存在进度/付款记录的 item_id 集合
    pub fn item_ids_with_progress_in(
        conn: &Connection,
        boq_id: &str,
        item_ids: &[String],
    ) -> RepositoryResult<HashSet<String>> {
        let mut stmt = conn.prepare(
            "SELECT 1 FROM boq_item_progress WHERE boq_id = ? AND item_id = ? LIMIT 1",
        )?;

        let mut found = HashSet::new();
        for item_id in item_ids {
            if stmt.exists(params![boq_id, item_id])? {
                found.insert(item_id.clone());
            }
        }
        Ok(found)
    }

    pub fn find_progress_by_item_in(
        conn: &Connection,
        boq_id: &str,
        item_id: &str,
    ) -> RepositoryResult<Vec<BoqItemProgress>> {
        let mut stmt = conn.prepare(
            r#"SELECT progress_id, boq_id, item_id, milestone_id, quantity, amount, recorded_by, recorded_at
               FROM boq_item_progress
               WHERE boq_id = ? AND item_id = ?
               ORDER BY recorded_at ASC"#,
        )?;

        let records = stmt
            .query_map(params![boq_id, item_id], |row| {
                Ok(BoqItemProgress {
                    progress_id: row.get(0)?,
                    boq_id: row.get(1)?,
                    item_id: row.get(2)?,
                    milestone_id: row.get(3)?,
                    quantity: row.get(4)?,
                    amount: row.get(5)?,
                    recorded_by: row.get(6)?,
                    recorded_at: ts_column(row, 7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
