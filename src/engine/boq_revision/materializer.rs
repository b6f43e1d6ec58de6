// ==========================================
// BOQ 修订 - 校验与物化（纯函数）
// ==========================================
// 修订 N+1 = 修订 N 去掉 remove → 应用 update → 追加 add
// 历史修订的条目从不修改，物化结果总是新的快照
// ==========================================

use crate::domain::boq::{BoqChanges, BoqItem, BoqItemUpdate, NewBoqItem};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::{HashMap, HashSet};

pub struct RevisionMaterializer;

impl RevisionMaterializer {
    /// 规则 1: 修订原因非空
    pub fn validate_reason(reason: &str) -> EngineResult<String> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::InvalidInput("修订原因不能为空".to_string()));
        }
        Ok(reason.to_string())
    }

    /// 规则 2: 新增条目数量与单价为正
    pub fn validate_new_item(item: &NewBoqItem, field: &str) -> EngineResult<()> {
        if item.description.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!("{}.description 不能为空", field)));
        }
        if item.unit.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!("{}.unit 不能为空", field)));
        }
        require_positive(item.planned_quantity, &format!("{}.planned_quantity", field))?;
        require_positive(item.rate, &format!("{}.rate", field))?;
        Ok(())
    }

    /// 变更请求的形状校验（不依赖存储）
    ///
    /// 覆盖规则 2，以及 update 字段取值、重复 id、同一条目既更新又删除等输入错误
    pub fn validate_shape(changes: &BoqChanges) -> EngineResult<()> {
        if changes.add_items.is_empty() && changes.update_items.is_empty() && changes.remove_item_ids.is_empty() {
            return Err(EngineError::InvalidInput("修订至少需要一项变更".to_string()));
        }

        for (idx, item) in changes.add_items.iter().enumerate() {
            Self::validate_new_item(item, &format!("addItems[{}]", idx))?;
        }

        let mut updated = HashSet::new();
        for (idx, update) in changes.update_items.iter().enumerate() {
            let field = format!("updateItems[{}]", idx);
            if !updated.insert(update.item_id.as_str()) {
                return Err(EngineError::InvalidInput(format!(
                    "{}: 条目 {} 重复更新",
                    field, update.item_id
                )));
            }
            validate_update_fields(update, &field)?;
        }

        let mut removed = HashSet::new();
        for item_id in &changes.remove_item_ids {
            if !removed.insert(item_id.as_str()) {
                return Err(EngineError::InvalidInput(format!("removeItemIds: 条目 {} 重复", item_id)));
            }
            if updated.contains(item_id.as_str()) {
                return Err(EngineError::InvalidInput(format!(
                    "条目 {} 不能同时更新与删除",
                    item_id
                )));
            }
        }

        Ok(())
    }

    /// 规则 3: update / remove 引用的条目必须存在于当前修订
    pub fn check_references(current: &[BoqItem], changes: &BoqChanges) -> EngineResult<()> {
        let ids: HashSet<&str> = current.iter().map(|i| i.item_id.as_str()).collect();

        let referenced = changes
            .update_items
            .iter()
            .map(|u| u.item_id.as_str())
            .chain(changes.remove_item_ids.iter().map(String::as_str));
        for item_id in referenced {
            if !ids.contains(item_id) {
                return Err(EngineError::not_found("BoqItem", item_id));
            }
        }
        Ok(())
    }

    /// 规则 4: 已有进度/付款记录的条目不可删除
    pub fn check_removals(changes: &BoqChanges, with_progress: &HashSet<String>) -> EngineResult<()> {
        match changes.remove_item_ids.iter().find(|id| with_progress.contains(*id)) {
            Some(item_id) => Err(EngineError::Conflict(format!(
                "条目 {} 已有进度/付款记录，不能删除",
                item_id
            ))),
            None => Ok(()),
        }
    }

    /// 规则 5: 物化下一修订的条目集合
    pub fn materialize(current: &[BoqItem], changes: &BoqChanges) -> Vec<BoqItem> {
        let removed: HashSet<&str> = changes.remove_item_ids.iter().map(String::as_str).collect();
        let updates: HashMap<&str, &BoqItemUpdate> = changes
            .update_items
            .iter()
            .map(|u| (u.item_id.as_str(), u))
            .collect();

        let mut next: Vec<BoqItem> = current
            .iter()
            .filter(|item| !removed.contains(item.item_id.as_str()))
            .map(|item| match updates.get(item.item_id.as_str()) {
                Some(update) => apply_update(item, update),
                None => item.clone(),
            })
            .collect();

        let mut seq_no = current.iter().map(|i| i.seq_no).max().unwrap_or(0);
        for add in &changes.add_items {
            seq_no += 1;
            next.push(new_item(add, seq_no));
        }

        next
    }

    /// 初始修订的条目
    pub fn initial_items(items: &[NewBoqItem]) -> Vec<BoqItem> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| new_item(item, idx as i32 + 1))
            .collect()
    }
}

fn require_positive(value: f64, field: &str) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!("{} 必须为正数: {}", field, value)))
    }
}

fn validate_update_fields(update: &BoqItemUpdate, field: &str) -> EngineResult<()> {
    if update.item_id.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{}.item_id 不能为空", field)));
    }
    if matches!(&update.description, Some(d) if d.trim().is_empty()) {
        return Err(EngineError::InvalidInput(format!("{}.description 不能为空", field)));
    }
    if matches!(&update.unit, Some(u) if u.trim().is_empty()) {
        return Err(EngineError::InvalidInput(format!("{}.unit 不能为空", field)));
    }
    if let Some(qty) = update.planned_quantity {
        require_positive(qty, &format!("{}.planned_quantity", field))?;
    }
    if let Some(rate) = update.rate {
        require_positive(rate, &format!("{}.rate", field))?;
    }
    Ok(())
}

fn apply_update(item: &BoqItem, update: &BoqItemUpdate) -> BoqItem {
    BoqItem {
        item_id: item.item_id.clone(),
        seq_no: item.seq_no,
        description: update
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| item.description.clone()),
        unit: update
            .unit
            .as_ref()
            .map(|u| u.trim().to_string())
            .unwrap_or_else(|| item.unit.clone()),
        planned_quantity: update.planned_quantity.unwrap_or(item.planned_quantity),
        rate: update.rate.unwrap_or(item.rate),
    }
}

fn new_item(item: &NewBoqItem, seq_no: i32) -> BoqItem {
    BoqItem {
        item_id: uuid::Uuid::new_v4().to_string(),
        seq_no,
        description: item.description.trim().to_string(),
        unit: item.unit.trim().to_string(),
        planned_quantity: item.planned_quantity,
        rate: item.rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, seq_no: i32, qty: f64, rate: f64) -> BoqItem {
        BoqItem {
            item_id: id.to_string(),
            seq_no,
            description: format!("item {}", id),
            unit: "m3".to_string(),
            planned_quantity: qty,
            rate,
        }
    }

    fn add(qty: f64, rate: f64) -> NewBoqItem {
        NewBoqItem {
            description: "Rebar".to_string(),
            unit: "t".to_string(),
            planned_quantity: qty,
            rate,
        }
    }

    #[test]
    fn test_blank_reason_is_invalid_input() {
        assert!(matches!(
            RevisionMaterializer::validate_reason("   "),
            Err(EngineError::InvalidInput(_))
        ));
        assert_eq!(RevisionMaterializer::validate_reason(" scope ").unwrap(), "scope");
    }

    #[test]
    fn test_add_items_require_positive_quantity_and_rate() {
        for (qty, rate) in [(0.0, 10.0), (-1.0, 10.0), (5.0, 0.0), (5.0, -3.0), (f64::NAN, 1.0)] {
            let changes = BoqChanges {
                add_items: vec![add(qty, rate)],
                ..Default::default()
            };
            assert!(
                matches!(RevisionMaterializer::validate_shape(&changes), Err(EngineError::InvalidInput(_))),
                "qty={} rate={}",
                qty,
                rate
            );
        }
    }

    #[test]
    fn test_empty_changes_rejected() {
        assert!(matches!(
            RevisionMaterializer::validate_shape(&BoqChanges::default()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_update_and_remove_same_item_rejected() {
        let changes = BoqChanges {
            update_items: vec![BoqItemUpdate {
                item_id: "a".to_string(),
                rate: Some(2.0),
                ..Default::default()
            }],
            remove_item_ids: vec!["a".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            RevisionMaterializer::validate_shape(&changes),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_update_reference_is_not_found() {
        let current = vec![item("a", 1, 10.0, 5.0)];
        let changes = BoqChanges {
            update_items: vec![BoqItemUpdate {
                item_id: "zzz".to_string(),
                rate: Some(2.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            RevisionMaterializer::check_references(&current, &changes),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_removing_item_with_progress_is_conflict() {
        let changes = BoqChanges {
            remove_item_ids: vec!["a".to_string()],
            ..Default::default()
        };
        let with_progress: HashSet<String> = ["a".to_string()].into_iter().collect();
        assert!(matches!(
            RevisionMaterializer::check_removals(&changes, &with_progress),
            Err(EngineError::Conflict(_))
        ));
        assert!(RevisionMaterializer::check_removals(&changes, &HashSet::new()).is_ok());
    }

    #[test]
    fn test_materialize_copies_forward_with_overrides() {
        let current = vec![item("a", 1, 10.0, 5.0), item("b", 2, 3.0, 7.0), item("c", 3, 1.0, 1.0)];
        let changes = BoqChanges {
            add_items: vec![add(2.0, 100.0)],
            update_items: vec![BoqItemUpdate {
                item_id: "b".to_string(),
                planned_quantity: Some(4.0),
                ..Default::default()
            }],
            remove_item_ids: vec!["c".to_string()],
        };

        let next = RevisionMaterializer::materialize(&current, &changes);

        assert_eq!(next.len(), 3);
        assert_eq!(next[0], current[0]);
        assert_eq!(next[1].item_id, "b");
        assert_eq!(next[1].planned_quantity, 4.0);
        assert_eq!(next[1].rate, 7.0);
        assert_eq!(next[2].seq_no, 4);
        assert_eq!(next[2].description, "Rebar");
        assert!(next.iter().all(|i| i.item_id != "c"));

        // 原修订保持不变
        assert_eq!(current.len(), 3);
        assert_eq!(current[1].planned_quantity, 3.0);
    }

    #[test]
    fn test_initial_items_numbered_from_one() {
        let items = RevisionMaterializer::initial_items(&[add(1.0, 1.0), add(2.0, 2.0)]);
        assert_eq!(items.iter().map(|i| i.seq_no).collect::<Vec<_>>(), vec![1, 2]);
        assert_ne!(items[0].item_id, items[1].item_id);
    }
}
