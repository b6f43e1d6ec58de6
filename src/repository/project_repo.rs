// ==========================================
// 工程项目管理核心 - 项目数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{format_ts, ts_column};
use crate::domain::project::{Project, ProjectMember};
use crate::domain::types::{ProjectStatus, Role};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};

// ==========================================
// ProjectRepository - 项目仓储
// ==========================================
pub struct ProjectRepository;

impl ProjectRepository {
    // ==========================================
    // 写入操作（事务内调用）
    // ==========================================

    pub fn insert_tx(conn: &Connection, project: &Project) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO project (
                project_id, name, status, is_example, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                &project.project_id,
                &project.name,
                project.status.to_db_str(),
                project.is_example,
                &project.created_by,
                format_ts(&project.created_at),
            ],
        )?;
        Ok(())
    }

    /// 新增或更新成员角色
    pub fn upsert_member_tx(conn: &Connection, member: &ProjectMember) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO project_member (project_id, user_id, role, joined_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(project_id, user_id) DO UPDATE SET role = excluded.role"#,
            params![
                &member.project_id,
                &member.user_id,
                member.role.to_db_str(),
                format_ts(&member.joined_at),
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, project_id: &str) -> RepositoryResult<Option<Project>> {
        let project = conn
            .query_row(
                r#"SELECT project_id, name, status, is_example, created_by, created_at
                   FROM project WHERE project_id = ?"#,
                params![project_id],
                |row| {
                    Ok(Project {
                        project_id: row.get(0)?,
                        name: row.get(1)?,
                        status: ProjectStatus::from_str(&row.get::<_, String>(2)?),
                        is_example: row.get(3)?,
                        created_by: row.get(4)?,
                        created_at: ts_column(row, 5)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }

    /// 查询项目成员（角色作用域）
    pub fn find_member_in(
        conn: &Connection,
        project_id: &str,
        user_id: &str,
    ) -> RepositoryResult<Option<ProjectMember>> {
        let row = conn
            .query_row(
                r#"SELECT project_id, user_id, role, joined_at
                   FROM project_member WHERE project_id = ? AND user_id = ?"#,
                params![project_id, user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        ts_column(row, 3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((project_id, user_id, role_raw, joined_at)) => {
                let role = Role::from_db_str(&role_raw).ok_or_else(|| {
                    RepositoryError::DataIntegrityError {
                        field: "project_member.role".to_string(),
                        message: format!("未知角色: {}", role_raw),
                    }
                })?;
                Ok(Some(ProjectMember {
                    project_id,
                    user_id,
                    role,
                    joined_at,
                }))
            }
            None => Ok(None),
        }
    }
}
