// ==========================================
// 工程项目管理核心 - 性能统计
// ==========================================
// SQL 计数与慢查询日志基于 rusqlite trace/profile 回调
// 开关: CPM_PERF_SQL=1 强制开启（debug 构建默认开启）
// 阈值: CPM_SLOW_SQL_MS（默认 debug 50ms / release 200ms）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

static SQL_TRACING_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

const SQL_LOG_MAX_LEN: usize = 300;

thread_local! {
    static ACTIVE_GUARDS: Cell<u32> = const { Cell::new(0) };
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
    static SLOW_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// 为连接安装 SQL 计数与慢查询回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = env_flag("CPM_PERF_SQL").unwrap_or(cfg!(debug_assertions));
    SQL_TRACING_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let default_ms = if cfg!(debug_assertions) { 50 } else { 200 };
    let slow_ms = std::env::var("CPM_SLOW_SQL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_ms);
    SLOW_SQL_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(on_statement));
    conn.profile(Some(on_profile));
}

fn guard_active() -> bool {
    ACTIVE_GUARDS.with(|d| d.get() > 0)
}

fn on_statement(_sql: &str) {
    if SQL_TRACING_ENABLED.load(Ordering::Relaxed) && guard_active() {
        STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_profile(sql: &str, duration: Duration) {
    if !SQL_TRACING_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold == 0 || ms < threshold {
        return;
    }

    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let shown: String = flat.chars().take(SQL_LOG_MAX_LEN).collect();
    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %shown, "slow sql");

    if guard_active() {
        SLOW_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 命令级耗时统计：drop 时输出 elapsed_ms / sql_count / slow_sql_count
///
/// ```ignore
/// let _perf = construction_pm::perf::PerfGuard::new("cmd.revise_boq");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_at_start: u64,
    slow_at_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            statements_at_start: STATEMENTS.with(|c| c.get()),
            slow_at_start: SLOW_STATEMENTS.with(|c| c.get()),
        }
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = STATEMENTS.with(|c| c.get()).saturating_sub(self.statements_at_start);
        let slow_sql_count = SLOW_STATEMENTS.with(|c| c.get()).saturating_sub(self.slow_at_start);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            sql_count,
            slow_sql_count,
            "done"
        );

        ACTIVE_GUARDS.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
