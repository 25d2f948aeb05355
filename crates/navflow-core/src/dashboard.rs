use navflow_shared::{
  OrganizationDto,
  ProjectDto,
  TaskDto,
  TaskStatus
};

use crate::datetime::DueWindow;

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct DashboardStats {
  pub projects:        usize,
  pub organizations:   usize,
  pub tasks:           usize,
  pub completed:       usize,
  pub in_progress:     usize,
  /// Whole percent, 0 with no tasks.
  pub completion_rate: u32,
  pub due_today:       usize,
  pub overdue:         usize
}

impl DashboardStats {
  #[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
  pub fn compute(
    projects: &[ProjectDto],
    orgs: &[OrganizationDto],
    tasks: &[TaskDto],
    window: &DueWindow
  ) -> Self {
    let completed = tasks
      .iter()
      .filter(|t| t.status == TaskStatus::Done)
      .count();
    let open = || {
      tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
    };

    let completion_rate = if tasks.is_empty() {
      0
    } else {
      ((completed as f64 / tasks.len() as f64)
        * 100.0)
        .round() as u32
    };

    let stats = DashboardStats {
      projects: projects.len(),
      organizations: orgs.len(),
      tasks: tasks.len(),
      completed,
      in_progress: tasks
        .iter()
        .filter(|t| {
          t.status == TaskStatus::InProgress
        })
        .count(),
      completion_rate,
      due_today: open()
        .filter(|t| {
          t.due_date
            .is_some_and(|d| window.is_today(d))
        })
        .count(),
      overdue: open()
        .filter(|t| {
          t.due_date
            .is_some_and(|d| window.is_overdue(d))
        })
        .count()
    };
    tracing::debug!(?stats, "dashboard stats");
    stats
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };
  use navflow_shared::Priority;

  use super::*;

  fn task(
    id: u64,
    status: TaskStatus,
    due: Option<chrono::DateTime<Utc>>
  ) -> TaskDto {
    TaskDto {
      id,
      title: format!("t{id}"),
      description: None,
      project: Some(1),
      project_name: String::new(),
      section: None,
      section_name: None,
      section_color: None,
      priority: Priority::Medium,
      status,
      assigned_to_email: None,
      due_date: due,
      created_at: Utc::now(),
      updated_at: None,
      time_spent_minutes: None,
      time_spent_display: None,
      is_timer_running: false,
      timer_started_at: None,
      position: 0
    }
  }

  #[test]
  fn completion_rate_rounds_and_handles_empty()
  {
    let now = Utc
      .with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
      .unwrap();
    let window = DueWindow::at(&now);

    let empty =
      DashboardStats::compute(&[], &[], &[], &window);
    assert_eq!(empty.completion_rate, 0);

    let tasks = vec![
      task(1, TaskStatus::Done, None),
      task(
        2,
        TaskStatus::Todo,
        Some(now - Duration::days(1))
      ),
      task(
        3,
        TaskStatus::InProgress,
        Some(now + Duration::hours(2))
      ),
    ];
    let stats = DashboardStats::compute(
      &[],
      &[],
      &tasks,
      &window
    );
    assert_eq!(stats.completion_rate, 33);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.overdue, 1);
    assert_eq!(stats.due_today, 1);
  }
}
