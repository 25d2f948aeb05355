use chrono::{DateTime, Duration, TimeZone, Utc};
use navflow_core::datetime::DueWindow;
use navflow_core::tasklist::{
    DueBucket, PriorityScope, ProjectScope, SectionScope, SortField, SortOrder, StatusScope,
    TaskQuery,
};
use navflow_shared::{Priority, SectionDto, TaskDto, TaskStatus};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).single().expect("valid instant")
}

fn task(id: u64, title: &str) -> TaskDto {
    TaskDto {
        id,
        title: title.to_string(),
        description: None,
        project: Some(1),
        project_name: "Website".to_string(),
        section: None,
        section_name: None,
        section_color: None,
        priority: Priority::Medium,
        status: TaskStatus::Todo,
        assigned_to_email: None,
        due_date: None,
        created_at: now() - Duration::days(30) + Duration::minutes(id as i64),
        updated_at: None,
        time_spent_minutes: None,
        time_spent_display: None,
        is_timer_running: false,
        timer_started_at: None,
        position: 0,
    }
}

fn section(id: u64, name: &str) -> SectionDto {
    SectionDto {
        id,
        name: name.to_string(),
        slug: name.to_lowercase(),
        color: "#6B7280".to_string(),
        icon: None,
        position: id as i64,
        project: Some(1),
        is_default: id == 1,
        task_count: None,
    }
}

fn ids(tasks: &[&TaskDto]) -> Vec<u64> {
    tasks.iter().map(|t| t.id).collect()
}

fn mixed_tasks() -> Vec<TaskDto> {
    let mut a = task(1, "Design landing page");
    a.priority = Priority::High;
    a.section = Some(1);
    a.due_date = Some(now() - Duration::days(2));

    let mut b = task(2, "Write copy");
    b.description = Some("landing headline".to_string());
    b.section = Some(2);
    b.due_date = Some(now() + Duration::hours(3));

    let mut c = task(3, "Deploy");
    c.project = Some(2);
    c.project_name = "Infra".to_string();
    c.priority = Priority::Urgent;

    let mut d = task(4, "Review analytics");
    d.priority = Priority::Low;
    d.section = Some(2);
    d.due_date = Some(now() + Duration::days(1));
    d.time_spent_minutes = Some(45);

    vec![a, b, c, d]
}

#[test]
fn filtered_result_is_subset_satisfying_every_predicate() {
    let tasks = mixed_tasks();
    let window = DueWindow::at(&now());
    let query = TaskQuery {
        search: "LANDING".to_string(),
        project: ProjectScope::Only(1),
        priority: PriorityScope::All,
        due: Some(DueBucket::ThisWeek),
        section: SectionScope::Only(2),
        ..TaskQuery::default()
    };

    let visible = query.apply(&tasks, &window);
    assert_eq!(ids(&visible), vec![2]);
    for task in &visible {
        assert!(tasks.iter().any(|t| t.id == task.id));
        assert!(query.matches(task, &window));
    }
}

#[test]
fn applying_twice_is_idempotent_and_leaves_input_alone() {
    let tasks = mixed_tasks();
    let snapshot = tasks.clone();
    let window = DueWindow::at(&now());
    let query = TaskQuery {
        sort: SortField::Priority,
        order: SortOrder::Asc,
        ..TaskQuery::default()
    };

    let first: Vec<TaskDto> = query.apply(&tasks, &window).into_iter().cloned().collect();
    let second: Vec<TaskDto> = query.apply(&first, &window).into_iter().cloned().collect();
    assert_eq!(first, second);
    assert_eq!(tasks, snapshot);
}

#[test]
fn undated_tasks_stay_last_in_both_directions() {
    let mut a = task(1, "A");
    a.due_date = None;
    let mut b = task(2, "B");
    b.due_date = Some(now() + Duration::days(1));
    let mut c = task(3, "C");
    c.due_date = Some(now() - Duration::days(1));
    let tasks = vec![a, b, c];
    let window = DueWindow::at(&now());

    let asc = TaskQuery {
        sort: SortField::DueDate,
        order: SortOrder::Asc,
        ..TaskQuery::default()
    };
    assert_eq!(ids(&asc.apply(&tasks, &window)), vec![3, 2, 1]);

    let desc = TaskQuery {
        order: SortOrder::Desc,
        ..asc
    };
    assert_eq!(ids(&desc.apply(&tasks, &window)), vec![2, 3, 1]);
}

#[test]
fn priority_ascending_puts_urgent_first() {
    let levels = [Priority::Medium, Priority::Urgent, Priority::Low, Priority::High];
    let tasks: Vec<TaskDto> = levels
        .iter()
        .enumerate()
        .map(|(idx, priority)| {
            let mut t = task(idx as u64 + 1, "p");
            t.priority = *priority;
            t
        })
        .collect();
    let query = TaskQuery {
        sort: SortField::Priority,
        order: SortOrder::Asc,
        ..TaskQuery::default()
    };

    let ordered: Vec<Priority> = query
        .apply(&tasks, &DueWindow::at(&now()))
        .into_iter()
        .map(|t| t.priority)
        .collect();
    assert_eq!(
        ordered,
        vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
    );
}

#[test]
fn overdue_means_before_local_midnight() {
    let window = DueWindow::at(&now());
    let overdue = TaskQuery {
        due: Some(DueBucket::Overdue),
        ..TaskQuery::default()
    };

    let mut yesterday = task(1, "late");
    yesterday.due_date = Some(window.today_start - Duration::minutes(1));
    let mut earlier_today = task(2, "today");
    earlier_today.due_date = Some(window.today_start + Duration::minutes(1));
    let undated = task(3, "whenever");

    assert!(overdue.matches(&yesterday, &window));
    assert!(!overdue.matches(&earlier_today, &window));
    assert!(!overdue.matches(&undated, &window));

    let no_date = TaskQuery {
        due: Some(DueBucket::NoDate),
        ..TaskQuery::default()
    };
    assert!(no_date.matches(&undated, &window));
    assert!(!no_date.matches(&yesterday, &window));
}

#[test]
fn section_badges_follow_active_filters() {
    let tasks = mixed_tasks();
    let sections = vec![section(1, "Backlog"), section(2, "Doing")];
    let window = DueWindow::at(&now());

    let unfiltered = TaskQuery::default().section_counts(&tasks, &sections, &window);
    assert_eq!(unfiltered.get(1), 1);
    assert_eq!(unfiltered.get(2), 2);

    let search = TaskQuery {
        search: "analytics".to_string(),
        section: SectionScope::Only(1),
        ..TaskQuery::default()
    };
    let counts = search.section_counts(&tasks, &sections, &window);
    assert_eq!(counts.get(1), 0);
    assert_eq!(counts.get(2), 1);
}

#[test]
fn badges_and_unsectioned_sum_to_filtered_total() {
    let tasks = mixed_tasks();
    let sections = vec![section(1, "Backlog"), section(2, "Doing")];
    let window = DueWindow::at(&now());
    let query = TaskQuery {
        priority: PriorityScope::All,
        ..TaskQuery::default()
    };

    let counts = query.section_counts(&tasks, &sections, &window);
    let visible = query.apply(&tasks, &window);
    let sectioned: usize = counts.by_section.values().sum();
    assert_eq!(sectioned + counts.unsectioned, visible.len());
    assert_eq!(counts.total, visible.len());
    assert_eq!(counts.unsectioned, 1);
}

#[test]
fn empty_match_is_empty_vec() {
    let tasks = mixed_tasks();
    let query = TaskQuery {
        search: "no such words".to_string(),
        ..TaskQuery::default()
    };
    assert!(query.apply(&tasks, &DueWindow::at(&now())).is_empty());
    assert!(query.apply(&[], &DueWindow::at(&now())).is_empty());
}

#[test]
fn day_buckets_split_at_midnight_and_week_end_is_inclusive() {
    let window = DueWindow::at(&now());
    let second = Duration::seconds(1);
    let bucket = |due: DueBucket| TaskQuery {
        due: Some(due),
        ..TaskQuery::default()
    };
    let due_at = |at| {
        let mut t = task(1, "dated");
        t.due_date = Some(at);
        t
    };

    let tomorrow_edge = due_at(window.tomorrow_start);
    assert!(bucket(DueBucket::Tomorrow).matches(&tomorrow_edge, &window));
    assert!(!bucket(DueBucket::Today).matches(&tomorrow_edge, &window));

    let late_tomorrow = due_at(window.day_after_start - second);
    assert!(bucket(DueBucket::Tomorrow).matches(&late_tomorrow, &window));
    assert!(!bucket(DueBucket::Tomorrow).matches(&due_at(window.day_after_start), &window));

    assert!(bucket(DueBucket::Today).matches(&due_at(window.today_start), &window));
    assert!(bucket(DueBucket::ThisWeek).matches(&due_at(window.week_end), &window));
    assert!(!bucket(DueBucket::ThisWeek).matches(&due_at(window.week_end + second), &window));
}

#[test]
fn undated_task_only_lands_in_no_date() {
    let window = DueWindow::at(&now());
    let undated = task(1, "someday");

    for due in [
        DueBucket::Overdue,
        DueBucket::Today,
        DueBucket::Tomorrow,
        DueBucket::ThisWeek,
    ] {
        let query = TaskQuery {
            due: Some(due),
            ..TaskQuery::default()
        };
        assert!(!query.matches(&undated, &window), "{due:?}");
    }
    let no_date = TaskQuery {
        due: Some(DueBucket::NoDate),
        ..TaskQuery::default()
    };
    assert!(no_date.matches(&undated, &window));
}

#[test]
fn status_filter_narrows_list_and_badges() {
    let mut tasks = mixed_tasks();
    tasks[1].status = TaskStatus::Done;
    tasks[3].status = TaskStatus::InProgress;
    let sections = vec![section(1, "Backlog"), section(2, "Doing")];
    let window = DueWindow::at(&now());

    let done = TaskQuery {
        status: StatusScope::Only(TaskStatus::Done),
        ..TaskQuery::default()
    };
    assert_eq!(ids(&done.apply(&tasks, &window)), vec![2]);

    let counts = done.section_counts(&tasks, &sections, &window);
    assert_eq!(counts.get(1), 0);
    assert_eq!(counts.get(2), 1);
    assert_eq!(counts.unsectioned, 0);
    assert_eq!(counts.total, 1);

    let open = TaskQuery {
        status: StatusScope::Only(TaskStatus::Todo),
        order: SortOrder::Asc,
        ..TaskQuery::default()
    };
    assert_eq!(ids(&open.apply(&tasks, &window)), vec![1, 3]);
}
