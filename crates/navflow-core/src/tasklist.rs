use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::anyhow;
use navflow_shared::{
  Priority,
  SectionDto,
  TaskDto,
  TaskStatus
};
use tracing::{
  debug,
  trace
};

use crate::datetime::DueWindow;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum ProjectScope {
  #[default]
  All,
  Only(u64)
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum PriorityScope {
  #[default]
  All,
  Only(Priority)
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum StatusScope {
  #[default]
  All,
  Only(TaskStatus)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueBucket {
  Overdue,
  Today,
  Tomorrow,
  ThisWeek,
  NoDate
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum SectionScope {
  #[default]
  All,
  Only(u64)
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum SortField {
  #[default]
  CreatedAt,
  DueDate,
  Priority,
  Title,
  TimeSpent
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc
}

impl SortOrder {
  fn apply(
    self,
    ordering: Ordering
  ) -> Ordering {
    match self {
      | SortOrder::Asc => ordering,
      | SortOrder::Desc => {
        ordering.reverse()
      }
    }
  }
}

/// Everything the task list screen lets
/// the user pick. Evaluation never
/// touches the source slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskQuery {
  pub search:   String,
  pub project:  ProjectScope,
  pub priority: PriorityScope,
  pub status:   StatusScope,
  pub due:      Option<DueBucket>,
  pub section:  SectionScope,
  pub sort:     SortField,
  pub order:    SortOrder
}

/// Badge counts for section tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCounts {
  pub by_section:  BTreeMap<u64, usize>,
  pub unsectioned: usize,
  pub total:       usize
}

impl SectionCounts {
  pub fn get(
    &self,
    section_id: u64
  ) -> usize {
    self
      .by_section
      .get(&section_id)
      .copied()
      .unwrap_or(0)
  }
}

impl TaskQuery {
  /// Search, project, priority, status
  /// and due predicates; section scope is
  /// left out.
  pub fn matches_filters(
    &self,
    task: &TaskDto,
    window: &DueWindow
  ) -> bool {
    let search = self.matches_search(task);
    let project = match self.project {
      | ProjectScope::All => true,
      | ProjectScope::Only(id) => {
        task.project == Some(id)
      }
    };
    let priority = match self.priority {
      | PriorityScope::All => true,
      | PriorityScope::Only(p) => {
        task.priority == p
      }
    };
    let status = match self.status {
      | StatusScope::All => true,
      | StatusScope::Only(s) => {
        task.status == s
      }
    };
    let due = match self.due {
      | None => true,
      | Some(bucket) => {
        due_bucket_matches(
          bucket, task, window
        )
      }
    };

    let ok = search
      && project
      && priority
      && status
      && due;
    trace!(
      task_id = task.id,
      search,
      project,
      priority,
      status,
      due,
      ok,
      "task filter evaluation"
    );
    ok
  }

  pub fn matches(
    &self,
    task: &TaskDto,
    window: &DueWindow
  ) -> bool {
    let in_section = match self.section {
      | SectionScope::All => true,
      | SectionScope::Only(id) => {
        task.section == Some(id)
      }
    };
    in_section
      && self
        .matches_filters(task, window)
  }

  /// Visible tasks in display order.
  #[tracing::instrument(skip_all, fields(total = tasks.len()))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [TaskDto],
    window: &DueWindow
  ) -> Vec<&'a TaskDto> {
    let mut visible: Vec<&TaskDto> =
      tasks
        .iter()
        .filter(|task| {
          self.matches(task, window)
        })
        .collect();
    visible
      .sort_by(|a, b| self.compare(a, b));

    debug!(
      visible = visible.len(),
      sort = ?self.sort,
      order = ?self.order,
      "derived task list"
    );
    visible
  }

  pub fn compare(
    &self,
    a: &TaskDto,
    b: &TaskDto
  ) -> Ordering {
    let ordering = match self.sort {
      | SortField::DueDate => {
        match (a.due_date, b.due_date) {
          | (Some(x), Some(y)) => {
            x.cmp(&y)
          }
          // Undated tasks trail in both
          // directions.
          | (None, Some(_)) => {
            return Ordering::Greater;
          }
          | (Some(_), None) => {
            return Ordering::Less;
          }
          | (None, None) => {
            Ordering::Equal
          }
        }
      }
      | SortField::Priority => a
        .priority
        .rank()
        .cmp(&b.priority.rank()),
      | SortField::Title => {
        compare_titles(&a.title, &b.title)
      }
      | SortField::TimeSpent => a
        .time_spent()
        .cmp(&b.time_spent()),
      | SortField::CreatedAt => {
        a.created_at.cmp(&b.created_at)
      }
    };

    self.order.apply(ordering)
  }

  #[tracing::instrument(skip_all, fields(sections = sections.len()))]
  pub fn section_counts(
    &self,
    tasks: &[TaskDto],
    sections: &[SectionDto],
    window: &DueWindow
  ) -> SectionCounts {
    let mut counts = SectionCounts {
      by_section: sections
        .iter()
        .map(|section| (section.id, 0))
        .collect(),
      ..SectionCounts::default()
    };

    for task in tasks.iter().filter(
      |task| {
        self.matches_filters(task, window)
      }
    ) {
      counts.total += 1;
      match task
        .section
        .and_then(|id| {
          counts.by_section.get_mut(&id)
        }) {
        | Some(slot) => *slot += 1,
        | None => {
          // A section id the board does
          // not know lands on the "All"
          // tab only.
          if let Some(id) = task.section {
            debug!(
              task_id = task.id,
              section_id = id,
              "task references unknown \
               section; counted as \
               unsectioned"
            );
          }
          counts.unsectioned += 1
        }
      }
    }

    debug!(?counts, "section badge counts");
    counts
  }

  fn matches_search(
    &self,
    task: &TaskDto
  ) -> bool {
    if self.search.is_empty() {
      return true;
    }
    let needle = self.search.to_lowercase();

    task
      .title
      .to_lowercase()
      .contains(&needle)
      || task
        .description_text()
        .to_lowercase()
        .contains(&needle)
      || task
        .project_name
        .to_lowercase()
        .contains(&needle)
  }
}

fn due_bucket_matches(
  bucket: DueBucket,
  task: &TaskDto,
  window: &DueWindow
) -> bool {
  match (bucket, task.due_date) {
    | (DueBucket::NoDate, due) => {
      due.is_none()
    }
    | (_, None) => false,
    | (DueBucket::Overdue, Some(due)) => {
      window.is_overdue(due)
    }
    | (DueBucket::Today, Some(due)) => {
      window.is_today(due)
    }
    | (DueBucket::Tomorrow, Some(due)) => {
      window.is_tomorrow(due)
    }
    | (DueBucket::ThisWeek, Some(due)) => {
      window.is_this_week(due)
    }
  }
}

/// Accent- and case-insensitive order,
/// falling back to the raw strings.
fn compare_titles(
  a: &str,
  b: &str
) -> Ordering {
  let key_a =
    deunicode::deunicode(a).to_lowercase();
  let key_b =
    deunicode::deunicode(b).to_lowercase();
  key_a.cmp(&key_b).then_with(|| a.cmp(b))
}

fn parse_all_or<T>(
  s: &str,
  parse: impl FnOnce(&str) -> Option<T>
) -> Option<Option<T>> {
  let trimmed = s.trim();
  if trimmed.is_empty()
    || trimmed.eq_ignore_ascii_case("all")
  {
    return Some(None);
  }
  parse(trimmed).map(Some)
}

impl FromStr for ProjectScope {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_all_or(s, |v| v.parse().ok())
      .map(|id| {
        id.map_or(
          ProjectScope::All,
          ProjectScope::Only
        )
      })
      .ok_or_else(|| {
        anyhow!(
          "project must be 'all' or a \
           numeric id, got: {s}"
        )
      })
  }
}

impl FromStr for SectionScope {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_all_or(s, |v| v.parse().ok())
      .map(|id| {
        id.map_or(
          SectionScope::All,
          SectionScope::Only
        )
      })
      .ok_or_else(|| {
        anyhow!(
          "section must be 'all' or a \
           numeric id, got: {s}"
        )
      })
  }
}

impl FromStr for PriorityScope {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_all_or(s, |v| v.parse().ok())
      .map(|p| {
        p.map_or(
          PriorityScope::All,
          PriorityScope::Only
        )
      })
      .ok_or_else(|| {
        anyhow!(
          "priority must be one of \
           all/low/medium/high/urgent, \
           got: {s}"
        )
      })
  }
}

impl FromStr for StatusScope {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_all_or(s, |v| v.parse().ok())
      .map(|st| {
        st.map_or(
          StatusScope::All,
          StatusScope::Only
        )
      })
      .ok_or_else(|| {
        anyhow!(
          "status must be one of \
           all/todo/in_progress/review/\
           done, got: {s}"
        )
      })
  }
}

impl FromStr for DueBucket {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .replace('-', "_")
      .as_str()
    {
      | "overdue" => Ok(DueBucket::Overdue),
      | "today" => Ok(DueBucket::Today),
      | "tomorrow" => {
        Ok(DueBucket::Tomorrow)
      }
      | "this_week" | "week" => {
        Ok(DueBucket::ThisWeek)
      }
      | "no_date" | "none" => {
        Ok(DueBucket::NoDate)
      }
      | other => Err(anyhow!(
        "unknown due bucket: {other}"
      ))
    }
  }
}

impl FromStr for SortField {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .replace('-', "_")
      .as_str()
    {
      | "created_at" | "created" => {
        Ok(SortField::CreatedAt)
      }
      | "due_date" | "due" => {
        Ok(SortField::DueDate)
      }
      | "priority" | "pri" => {
        Ok(SortField::Priority)
      }
      | "title" => Ok(SortField::Title),
      | "time_spent" | "time" => {
        Ok(SortField::TimeSpent)
      }
      | other => Err(anyhow!(
        "unknown sort field: {other}"
      ))
    }
  }
}

impl FromStr for SortOrder {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "asc" | "ascending" | "+" => {
        Ok(SortOrder::Asc)
      }
      | "desc" | "descending" | "-" => {
        Ok(SortOrder::Desc)
      }
      | other => Err(anyhow!(
        "unknown sort order: {other}"
      ))
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };
  use navflow_shared::{
    Priority,
    TaskDto,
    TaskStatus
  };

  use super::*;

  fn task(
    id: u64,
    title: &str
  ) -> TaskDto {
    TaskDto {
      id,
      title: title.to_string(),
      description: None,
      project: Some(1),
      project_name: "Apollo".to_string(),
      section: None,
      section_name: None,
      section_color: None,
      priority: Priority::Medium,
      status: TaskStatus::Todo,
      assigned_to_email: None,
      due_date: None,
      created_at: Utc
        .with_ymd_and_hms(
          2026, 1, 1, 0, 0, 0
        )
        .unwrap()
        + Duration::minutes(id as i64),
      updated_at: None,
      time_spent_minutes: None,
      time_spent_display: None,
      is_timer_running: false,
      timer_started_at: None,
      position: 0
    }
  }

  #[test]
  fn title_sort_folds_accents_and_case() {
    let tasks = vec![
      task(1, "zebra"),
      task(2, "Éclair"),
      task(3, "apple"),
    ];
    let query = TaskQuery {
      sort: SortField::Title,
      order: SortOrder::Asc,
      ..TaskQuery::default()
    };
    let window = DueWindow::at(&Utc::now());

    let titles: Vec<&str> = query
      .apply(&tasks, &window)
      .into_iter()
      .map(|t| t.title.as_str())
      .collect();
    assert_eq!(
      titles,
      vec!["apple", "Éclair", "zebra"]
    );
  }

  #[test]
  fn time_spent_treats_missing_as_zero() {
    let mut tracked = task(1, "tracked");
    tracked.time_spent_minutes = Some(5);
    let untracked = task(2, "untracked");

    let query = TaskQuery {
      sort: SortField::TimeSpent,
      order: SortOrder::Asc,
      ..TaskQuery::default()
    };
    assert_eq!(
      query.compare(&untracked, &tracked),
      Ordering::Less
    );
  }

  #[test]
  fn created_at_is_default_sort_newest_first()
  {
    let tasks =
      vec![task(1, "old"), task(2, "new")];
    let window = DueWindow::at(&Utc::now());
    let ids: Vec<u64> = TaskQuery::default()
      .apply(&tasks, &window)
      .into_iter()
      .map(|t| t.id)
      .collect();
    assert_eq!(ids, vec![2, 1]);
  }

  #[test]
  fn search_spans_description_and_project()
  {
    let mut described = task(1, "one");
    described.description =
      Some("Needs REVIEW".to_string());
    let plain = task(2, "two");
    let window = DueWindow::at(&Utc::now());

    let query = TaskQuery {
      search: "review".to_string(),
      ..TaskQuery::default()
    };
    assert!(
      query.matches(&described, &window)
    );
    assert!(!query.matches(&plain, &window));

    let by_project = TaskQuery {
      search: "apol".to_string(),
      ..TaskQuery::default()
    };
    assert!(
      by_project.matches(&plain, &window)
    );
  }

  #[test]
  fn search_is_plain_substring_without_trimming()
  {
    let tasks = vec![
      task(1, "Write copy"),
      task(2, "Deploy"),
    ];
    let window = DueWindow::at(&Utc::now());
    let ids = |search: &str| -> Vec<u64> {
      TaskQuery {
        search: search.to_string(),
        order: SortOrder::Asc,
        ..TaskQuery::default()
      }
      .apply(&tasks, &window)
      .into_iter()
      .map(|t| t.id)
      .collect()
    };

    assert_eq!(ids(" "), vec![1]);
    assert!(ids("deploy ").is_empty());
    assert_eq!(ids("DEPLOY"), vec![2]);
    assert_eq!(ids(""), vec![1, 2]);
  }

  #[test]
  fn unknown_section_counts_as_unsectioned()
  {
    let mut orphan = task(1, "orphan");
    orphan.section = Some(99);
    let loose = task(2, "loose");
    let window = DueWindow::at(&Utc::now());

    let counts = TaskQuery::default()
      .section_counts(
        &[orphan, loose],
        &[],
        &window
      );
    assert_eq!(counts.total, 2);
    assert_eq!(counts.unsectioned, 2);
    assert!(counts.by_section.is_empty());
  }

  #[test]
  fn selectors_parse_from_cli_strings() {
    assert_eq!(
      "all".parse::<ProjectScope>().unwrap(),
      ProjectScope::All
    );
    assert_eq!(
      "12".parse::<SectionScope>().unwrap(),
      SectionScope::Only(12)
    );
    assert_eq!(
      "urgent"
        .parse::<PriorityScope>()
        .unwrap(),
      PriorityScope::Only(Priority::Urgent)
    );
    assert_eq!(
      "this-week"
        .parse::<DueBucket>()
        .unwrap(),
      DueBucket::ThisWeek
    );
    assert_eq!(
      "in_progress"
        .parse::<StatusScope>()
        .unwrap(),
      StatusScope::Only(
        TaskStatus::InProgress
      )
    );
    assert!(
      "later".parse::<StatusScope>().is_err()
    );
    assert!("x".parse::<SortField>().is_err());
    assert!(
      "p9".parse::<ProjectScope>().is_err()
    );
  }
}
