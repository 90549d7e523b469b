//! # Project Repository
//!
//! Projects and the child rows that drive their derived fields.
//!
//! Every child write ends with [`recompute_project`] inside the same
//! transaction, so a committed project never disagrees with its tasks,
//! time entries and expenses.

use chrono::Utc;
use keystone_core::calc::{project_progress, Variance};
use keystone_core::validation::{
    validate_description, validate_name, validate_non_negative_money,
};
use keystone_core::{
    CodeSeries, Hours, Money, NewProject, NewProjectExpense, NewTask, NewTimeEntry, Page,
    PageRequest, Project, ProjectExpense, Task, TaskStatus, TimeEntry, UpdateProject,
    ValidationError,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{codes, fetch_live, fetch_live_from_pool, fetch_page};
use crate::error::{DbError, DbResult, DuplicateContext};

/// Repository for project database operations.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    /// Creates a new ProjectRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProjectRepository { pool }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub async fn create_project(&self, new: NewProject) -> DbResult<Project> {
        validate_name("name", &new.name, 200)?;
        validate_non_negative_money("budget", new.budget)?;
        if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
            if end < start {
                return Err(ValidationError::InvalidRange {
                    field: "end_date".to_string(),
                }
                .into());
            }
        }

        let mut tx = self.pool.begin().await?;
        let code =
            codes::assign_code(&mut tx, CodeSeries::Project, new.project_code.as_deref()).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO projects (
                project_code, name, description, customer_id, manager_id,
                start_date, end_date, budget, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING id
            "#,
        )
        .bind(&code)
        .bind(new.name.trim())
        .bind(&new.description)
        .bind(new.customer_id)
        .bind(new.manager_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.budget)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .duplicate_value(&code)?;

        let project = recompute_project(&mut tx, id).await?;
        tx.commit().await?;

        info!(project_code = %project.project_code, budget = %project.budget, "Project created");
        Ok(project)
    }

    pub async fn get_project(&self, id: i64) -> DbResult<Project> {
        fetch_live_from_pool(&self.pool, "projects", "Project", id).await
    }

    pub async fn list_projects(&self, page: PageRequest) -> DbResult<Page<Project>> {
        fetch_page(&self.pool, "projects", page).await
    }

    /// Edits header fields. A budget change re-derives the variance.
    pub async fn update_project(&self, id: i64, update: UpdateProject) -> DbResult<Project> {
        let mut tx = self.pool.begin().await?;
        let current: Project = fetch_live(&mut tx, "projects", "Project", id).await?;

        let name = update.name.unwrap_or(current.name);
        validate_name("name", &name, 200)?;
        let budget = update.budget.unwrap_or(current.budget);
        validate_non_negative_money("budget", budget)?;
        let end_date = update.end_date.or(current.end_date);
        if let (Some(start), Some(end)) = (current.start_date, end_date) {
            if end < start {
                return Err(ValidationError::InvalidRange {
                    field: "end_date".to_string(),
                }
                .into());
            }
        }

        sqlx::query(
            r#"
            UPDATE projects
            SET name = ?2, description = ?3, manager_id = ?4, end_date = ?5,
                status = ?6, budget = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name.trim())
        .bind(update.description.or(current.description))
        .bind(update.manager_id.or(current.manager_id))
        .bind(end_date)
        .bind(update.status.unwrap_or(current.status))
        .bind(budget)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let project = recompute_project(&mut tx, id).await?;
        tx.commit().await?;
        Ok(project)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub async fn add_task(&self, project_id: i64, new: NewTask) -> DbResult<Task> {
        validate_name("title", &new.title, 200)?;
        if new.estimated_hours.hundredths() < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "estimated_hours".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        live_project(&mut tx, project_id).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                project_id, title, description, assigned_to, status, priority,
                due_date, estimated_hours, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(new.title.trim())
        .bind(&new.description)
        .bind(new.assigned_to)
        .bind(TaskStatus::Todo)
        .bind(new.priority)
        .bind(new.due_date)
        .bind(new.estimated_hours)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        recompute_project(&mut tx, project_id).await?;
        tx.commit().await?;
        debug!(project_id, task_id = task.id, "Task added");
        Ok(task)
    }

    pub async fn list_tasks(&self, project_id: i64) -> DbResult<Vec<Task>> {
        self.get_project(project_id).await?;
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE project_id = ?1 AND is_deleted = 0 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn update_task_status(
        &self,
        project_id: i64,
        task_id: i64,
        status: TaskStatus,
    ) -> DbResult<Task> {
        let mut tx = self.pool.begin().await?;
        live_project(&mut tx, project_id).await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND project_id = ?2 AND is_deleted = 0
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(project_id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Task", task_id))?;

        recompute_project(&mut tx, project_id).await?;
        tx.commit().await?;
        Ok(task)
    }

    pub async fn remove_task(&self, project_id: i64, task_id: i64) -> DbResult<Project> {
        self.remove_child("tasks", "Task", project_id, task_id).await
    }

    // =========================================================================
    // Time Entries
    // =========================================================================

    pub async fn add_time_entry(&self, project_id: i64, new: NewTimeEntry) -> DbResult<TimeEntry> {
        if new.hours <= Hours::zero() {
            return Err(ValidationError::MustBePositive {
                field: "hours".to_string(),
            }
            .into());
        }
        validate_non_negative_money("hourly_rate", new.hourly_rate)?;

        let mut tx = self.pool.begin().await?;
        live_project(&mut tx, project_id).await?;
        if let Some(task_id) = new.task_id {
            let found: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM tasks WHERE id = ?1 AND project_id = ?2 AND is_deleted = 0",
            )
            .bind(task_id)
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
            if found.is_none() {
                return Err(DbError::not_found("Task", task_id));
            }
        }

        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries (
                project_id, task_id, employee_id, entry_date, hours, hourly_rate,
                billable, billable_amount, description, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(new.task_id)
        .bind(new.employee_id)
        .bind(new.entry_date)
        .bind(new.hours)
        .bind(new.hourly_rate)
        .bind(new.billable)
        .bind(new.billable_amount())
        .bind(&new.description)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        recompute_project(&mut tx, project_id).await?;
        tx.commit().await?;
        debug!(project_id, hours = entry.hours.hundredths(), amount = %entry.billable_amount, "Time logged");
        Ok(entry)
    }

    pub async fn list_time_entries(&self, project_id: i64) -> DbResult<Vec<TimeEntry>> {
        self.get_project(project_id).await?;
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT * FROM time_entries
            WHERE project_id = ?1 AND is_deleted = 0
            ORDER BY entry_date, id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    pub async fn remove_time_entry(&self, project_id: i64, entry_id: i64) -> DbResult<Project> {
        self.remove_child("time_entries", "Time entry", project_id, entry_id)
            .await
    }

    // =========================================================================
    // Project Expenses
    // =========================================================================

    pub async fn add_expense(
        &self,
        project_id: i64,
        new: NewProjectExpense,
    ) -> DbResult<ProjectExpense> {
        validate_description(&new.description)?;
        validate_non_negative_money("amount", new.amount)?;
        if new.markup.bps() < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "markup".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;
        live_project(&mut tx, project_id).await?;

        let expense = sqlx::query_as::<_, ProjectExpense>(
            r#"
            INSERT INTO project_expenses (
                project_id, description, amount, expense_date, markup,
                billable_amount, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(new.description.trim())
        .bind(new.amount)
        .bind(new.expense_date)
        .bind(new.markup)
        .bind(new.billable_amount())
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        recompute_project(&mut tx, project_id).await?;
        tx.commit().await?;
        Ok(expense)
    }

    pub async fn list_expenses(&self, project_id: i64) -> DbResult<Vec<ProjectExpense>> {
        self.get_project(project_id).await?;
        let expenses = sqlx::query_as::<_, ProjectExpense>(
            r#"
            SELECT * FROM project_expenses
            WHERE project_id = ?1 AND is_deleted = 0
            ORDER BY expense_date, id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }

    pub async fn remove_expense(&self, project_id: i64, expense_id: i64) -> DbResult<Project> {
        self.remove_child("project_expenses", "Project expense", project_id, expense_id)
            .await
    }

    /// Soft-deletes one child row and re-derives the project.
    async fn remove_child(
        &self,
        table: &str,
        entity: &str,
        project_id: i64,
        child_id: i64,
    ) -> DbResult<Project> {
        let mut tx = self.pool.begin().await?;
        live_project(&mut tx, project_id).await?;

        let sql = format!(
            r#"
            UPDATE {} SET is_deleted = 1, updated_at = ?3
            WHERE id = ?1 AND project_id = ?2 AND is_deleted = 0
            "#,
            table
        );
        let result = sqlx::query(&sql)
            .bind(child_id)
            .bind(project_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(entity, child_id));
        }

        let project = recompute_project(&mut tx, project_id).await?;
        tx.commit().await?;
        debug!(project_id, table, child_id, "Project child removed");
        Ok(project)
    }
}

// =============================================================================
// Recompute
// =============================================================================

async fn live_project(conn: &mut SqliteConnection, id: i64) -> DbResult<Project> {
    fetch_live(conn, "projects", "Project", id).await
}

/// Re-derives progress, actual cost and budget variance from live children.
pub(crate) async fn recompute_project(conn: &mut SqliteConnection, id: i64) -> DbResult<Project> {
    let (completed, total): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0), COUNT(*)
        FROM tasks
        WHERE project_id = ?1 AND is_deleted = 0
        "#,
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    // Cost is per entry so each product rounds the way TimeEntry::cost does.
    let time: Vec<(Hours, Money)> = sqlx::query_as(
        "SELECT hours, hourly_rate FROM time_entries WHERE project_id = ?1 AND is_deleted = 0",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let time_cost: Money = time
        .into_iter()
        .map(|(hours, rate)| rate.multiply_hours(hours))
        .sum();

    let expense_cost: Money = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM project_expenses WHERE project_id = ?1 AND is_deleted = 0",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    let budget: Money = sqlx::query_scalar("SELECT budget FROM projects WHERE id = ?1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    let actual_cost = time_cost + expense_cost;
    let variance = Variance::headroom(budget, actual_cost);

    let project = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects
        SET progress_percentage = ?2, actual_cost = ?3, budget_variance = ?4,
            budget_variance_percentage = ?5, updated_at = ?6
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(project_progress(completed, total))
    .bind(actual_cost)
    .bind(variance.variance)
    .bind(variance.variance_percentage)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(project)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use keystone_core::{NewEmployee, Percentage, TaskPriority};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn project(budget: i64) -> NewProject {
        NewProject {
            project_code: None,
            name: "Warehouse Move".to_string(),
            description: None,
            customer_id: None,
            manager_id: None,
            start_date: Some(date("2024-05-01")),
            end_date: Some(date("2024-06-30")),
            budget: Money::from_cents(budget),
        }
    }

    fn task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            assigned_to: None,
            priority: TaskPriority::Medium,
            due_date: None,
            estimated_hours: Hours::from_whole(4),
        }
    }

    async fn employee(db: &Database) -> i64 {
        db.hr()
            .create_employee(NewEmployee {
                employee_number: None,
                first_name: "Lin".to_string(),
                last_name: "Ho".to_string(),
                email: "lin@example.com".to_string(),
                phone: None,
                hire_date: date("2023-01-09"),
                department_id: None,
                position_id: None,
                manager_id: None,
                base_salary: Money::zero(),
                hourly_rate: Money::from_cents(8000),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_progress_follows_tasks() {
        let db = db().await;
        let projects = db.projects();
        let p = projects.create_project(project(0)).await.unwrap();
        assert_eq!(p.project_code, "PROJ000001");
        assert!(p.progress_percentage.is_zero());

        let a = projects.add_task(p.id, task("Plan")).await.unwrap();
        projects.add_task(p.id, task("Pack")).await.unwrap();
        let b = projects.add_task(p.id, task("Ship")).await.unwrap();
        projects.add_task(p.id, task("Unpack")).await.unwrap();

        projects
            .update_task_status(p.id, a.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(projects.get_project(p.id).await.unwrap().progress_percentage.bps(), 2500);

        let p = projects.remove_task(p.id, b.id).await.unwrap();
        assert_eq!(p.progress_percentage.bps(), 3333);
        assert_eq!(projects.list_tasks(p.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_actual_cost_and_headroom() {
        let db = db().await;
        let projects = db.projects();
        let employee_id = employee(&db).await;
        let p = projects.create_project(project(100_000)).await.unwrap();
        assert_eq!(p.budget_variance.cents(), 100_000);

        let entry = projects
            .add_time_entry(
                p.id,
                NewTimeEntry {
                    task_id: None,
                    employee_id,
                    entry_date: date("2024-05-02"),
                    hours: Hours::from_hundredths(250),
                    hourly_rate: Money::from_cents(8000),
                    billable: true,
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.billable_amount.cents(), 20_000);

        projects
            .add_time_entry(
                p.id,
                NewTimeEntry {
                    task_id: None,
                    employee_id,
                    entry_date: date("2024-05-03"),
                    hours: Hours::from_whole(1),
                    hourly_rate: Money::from_cents(8000),
                    billable: false,
                    description: Some("internal".to_string()),
                },
            )
            .await
            .unwrap();

        let expense = projects
            .add_expense(
                p.id,
                NewProjectExpense {
                    description: "Truck hire".to_string(),
                    amount: Money::from_cents(10_000),
                    expense_date: date("2024-05-04"),
                    markup: Percentage::from_whole(15),
                },
            )
            .await
            .unwrap();
        assert_eq!(expense.billable_amount.cents(), 11_500);

        // 2.5h + 1h at $80 plus $100 expense
        let p = projects.get_project(p.id).await.unwrap();
        assert_eq!(p.actual_cost.cents(), 38_000);
        assert_eq!(p.budget_variance.cents(), 62_000);
        assert_eq!(p.budget_variance_percentage.bps(), 6200);

        let p = projects.remove_expense(p.id, expense.id).await.unwrap();
        assert_eq!(p.actual_cost.cents(), 28_000);
        assert_eq!(projects.list_expenses(p.id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_budget_change_rederives_variance() {
        let db = db().await;
        let projects = db.projects();
        let p = projects.create_project(project(0)).await.unwrap();
        assert!(p.budget_variance_percentage.is_zero());

        let p = projects
            .update_project(
                p.id,
                UpdateProject {
                    budget: Some(Money::from_cents(50_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(p.budget_variance.cents(), 50_000);
        assert_eq!(p.budget_variance_percentage.bps(), 10_000);
        assert_eq!(p.name, "Warehouse Move");
    }

    #[tokio::test]
    async fn test_child_of_other_project_not_found() {
        let db = db().await;
        let projects = db.projects();
        let first = projects.create_project(project(0)).await.unwrap();
        let second = projects.create_project(project(0)).await.unwrap();
        assert_eq!(second.project_code, "PROJ000002");

        let t = projects.add_task(first.id, task("Plan")).await.unwrap();
        let err = projects.remove_task(second.id, t.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err = projects
            .add_task(second.id, task(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }
}
