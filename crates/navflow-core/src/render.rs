use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use chrono::{DateTime, Utc};
use navflow_shared::{
    AuditLogEntry, CommentDto, FocusedTaskDto, InvitationDto, MemberDto, NotificationDto,
    OrgPermissions, OrganizationDto, Priority, ProjectDto, Role, RolePermissions, SectionDto,
    TaskDto, UserDto,
};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::dashboard::DashboardStats;
use crate::datetime::{DueWindow, Zone, format_ago, format_minutes};
use crate::tasklist::SectionCounts;
use crate::ticker::Elapsed;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    zone: Zone,
}

impl Renderer {
    pub fn new(cfg: &Config, zone: Zone) -> anyhow::Result<Self> {
        let color = cfg
            .get_bool("color")
            .context("invalid color setting")?
            .unwrap_or(true);

        Ok(Self { color, zone })
    }

    pub fn message(&self, text: &str) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(rows = tasks.len()))]
    pub fn print_task_table(&self, tasks: &[&TaskDto], window: &DueWindow) -> anyhow::Result<()> {
        let headers = ["ID", "Pri", "Status", "Due", "Section", "Title", "Time"];
        let rows = tasks
            .iter()
            .map(|task| self.task_row(task, window))
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    fn task_row(&self, task: &TaskDto, window: &DueWindow) -> Vec<String> {
        let due = task
            .due_date
            .map(|due| {
                let text = self.zone.format_date(due);
                if task.status == navflow_shared::TaskStatus::Done {
                    text
                } else if window.is_overdue(due) {
                    self.paint(&text, "31")
                } else if window.is_today(due) {
                    self.paint(&text, "33")
                } else {
                    text
                }
            })
            .unwrap_or_default();

        let time = task
            .time_spent_display
            .clone()
            .unwrap_or_else(|| format_minutes(task.time_spent()));
        let time = if task.is_timer_running {
            format!("{time} \u{25b6}")
        } else {
            time
        };

        vec![
            self.paint(&task.id.to_string(), "33"),
            self.priority(task.priority),
            task.status.label().to_string(),
            due,
            task.section_name.clone().unwrap_or_default(),
            task.title.clone(),
            time,
        ]
    }

    fn priority(&self, priority: Priority) -> String {
        match priority {
            Priority::Urgent => self.paint(priority.as_str(), "31"),
            Priority::High => self.paint(priority.as_str(), "33"),
            _ => priority.as_str().to_string(),
        }
    }

    #[tracing::instrument(skip_all, fields(task_id = task.id))]
    pub fn print_task_info(&self, task: &TaskDto) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", task.status.label())?;
        writeln!(out, "priority  {}", self.priority(task.priority))?;
        writeln!(out, "project   {}", task.project_name)?;
        if let Some(section) = &task.section_name {
            writeln!(out, "section   {section}")?;
        }
        if let Some(assignee) = &task.assigned_to_email {
            writeln!(out, "assignee  {assignee}")?;
        }
        if let Some(due) = task.due_date {
            writeln!(out, "due       {}", self.zone.format_datetime(due))?;
        }
        writeln!(out, "created   {}", self.zone.format_datetime(task.created_at))?;
        if let Some(updated) = task.updated_at {
            writeln!(out, "modified  {}", self.zone.format_datetime(updated))?;
        }
        writeln!(out, "tracked   {}", format_minutes(task.time_spent()))?;
        if let (true, Some(started)) = (task.is_timer_running, task.timer_started_at) {
            writeln!(out, "timer     running since {}", self.zone.format_datetime(started))?;
        }
        let description = task.description_text();
        if !description.is_empty() {
            writeln!(out)?;
            writeln!(out, "{description}")?;
        }

        Ok(())
    }

    /// Tab strip: "All" first, then each section with its badge.
    pub fn print_section_tabs(&self, sections: &[SectionDto], counts: &SectionCounts) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let mut tabs = vec![format!("All ({})", counts.total)];
        for section in sections {
            let marker = if section.is_default { "*" } else { "" };
            tabs.push(format!(
                "{}{} ({})",
                section.name,
                marker,
                counts.get(section.id)
            ));
        }
        if counts.unsectioned > 0 {
            tabs.push(format!("Unsectioned ({})", counts.unsectioned));
        }
        writeln!(out, "{}", tabs.join(" | "))?;
        Ok(())
    }

    pub fn print_sections(&self, sections: &[SectionDto]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Color", "Pos", "Default", "Tasks"];
        let rows = sections
            .iter()
            .map(|s| {
                vec![
                    self.paint(&s.id.to_string(), "33"),
                    s.name.clone(),
                    s.color.clone(),
                    s.position.to_string(),
                    if s.is_default { "yes".to_string() } else { String::new() },
                    s.task_count.map(|c| c.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_projects(&self, projects: &[ProjectDto]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Organization", "Status", "Role", "Members", "Tasks"];
        let rows = projects
            .iter()
            .map(|p| {
                vec![
                    self.paint(&p.id.to_string(), "33"),
                    p.name.clone(),
                    p.organization_name.clone(),
                    p.status.clone(),
                    p.user_role.map(|r| r.to_string()).unwrap_or_default(),
                    p.member_count.to_string(),
                    p.task_count.to_string(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_orgs(&self, orgs: &[&OrganizationDto]) -> anyhow::Result<()> {
        let headers = ["ID", "Name", "Role", "Members", "Description"];
        let rows = orgs
            .iter()
            .map(|o| {
                vec![
                    self.paint(&o.id.to_string(), "33"),
                    o.name.clone(),
                    o.user_role.map(|r| r.to_string()).unwrap_or_default(),
                    o.member_count.to_string(),
                    o.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_members(&self, members: &[&MemberDto], counts: &BTreeMap<Role, usize>) -> anyhow::Result<()> {
        let headers = ["Name", "Email", "Role", "Joined"];
        let rows = members
            .iter()
            .map(|m| {
                vec![
                    m.user_name.clone(),
                    m.user_email.clone(),
                    m.role_display.clone().unwrap_or_else(|| m.role.to_string()),
                    m.joined_at.map(|at| self.zone.format_date(at)).unwrap_or_default(),
                ]
            })
            .collect();
        let mut out = io::stdout().lock();
        write_table(&mut out, &headers, rows)?;

        let summary = counts
            .iter()
            .map(|(role, count)| format!("{role}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out)?;
        writeln!(out, "{summary}")?;
        Ok(())
    }

    pub fn print_permissions(&self, permissions: &OrgPermissions) -> anyhow::Result<()> {
        let mut headers = vec!["Capability"];
        headers.extend(Role::ALL.iter().map(|r| r.as_str()));

        let rows = RolePermissions::CAPABILITIES
            .iter()
            .map(|capability| {
                let mut row = vec![capability.to_string()];
                for role in Role::ALL {
                    let allowed = permissions.for_role(role).get(capability).unwrap_or(false);
                    row.push(if allowed {
                        self.paint("yes", "32")
                    } else {
                        "-".to_string()
                    });
                }
                row
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_invitations(&self, invitations: &[InvitationDto]) -> anyhow::Result<()> {
        let headers = ["ID", "Organization", "Email", "Role", "Status", "Invited by"];
        let rows = invitations
            .iter()
            .map(|i| {
                vec![
                    self.paint(&i.id.to_string(), "33"),
                    i.organization_name.clone(),
                    i.email.clone(),
                    i.role.to_string(),
                    format!("{:?}", i.status).to_lowercase(),
                    i.invited_by_email.clone().unwrap_or_default(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_activity(&self, entries: &[AuditLogEntry], now: DateTime<Utc>) -> anyhow::Result<()> {
        let headers = ["When", "User", "Action", "Type", "Object"];
        let rows = entries
            .iter()
            .map(|e| {
                vec![
                    format_ago(e.timestamp, now),
                    e.user_email.clone().unwrap_or_else(|| "system".to_string()),
                    e.action_display.clone().unwrap_or_else(|| e.action.clone()),
                    e.content_type.clone(),
                    e.object_name.clone(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_notifications(&self, items: &[NotificationDto], now: DateTime<Utc>) -> anyhow::Result<()> {
        let headers = ["ID", "", "When", "Message"];
        let rows = items
            .iter()
            .map(|n| {
                vec![
                    self.paint(&n.id.to_string(), "33"),
                    if n.is_read { String::new() } else { self.paint("*", "36") },
                    format_ago(n.created_at, now),
                    n.message.clone(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_focus(&self, items: &[FocusedTaskDto], now: DateTime<Utc>) -> anyhow::Result<()> {
        let headers = ["ID", "Task", "Project", "Focused", "Timer", "Notes"];
        let rows = items
            .iter()
            .map(|f| {
                let title = if f.task_title.is_empty() {
                    f.task_data.title.clone()
                } else {
                    f.task_title.clone()
                };
                vec![
                    self.paint(&f.id.to_string(), "33"),
                    title,
                    f.project_name.clone(),
                    format_ago(f.focused_at, now),
                    if f.task_data.is_timer_running {
                        self.paint("running", "32")
                    } else {
                        format_minutes(f.task_data.time_spent())
                    },
                    f.notes.lines().next().unwrap_or_default().to_string(),
                ]
            })
            .collect();
        write_table(io::stdout().lock(), &headers, rows)
    }

    pub fn print_comments(&self, comments: &[CommentDto], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if comments.is_empty() {
            writeln!(out, "No comments.")?;
        }
        for comment in comments {
            let edited = if comment.is_edited { " (edited)" } else { "" };
            writeln!(
                out,
                "{} - {}{}",
                self.paint(&comment.author_name, "36"),
                format_ago(comment.created_at, now),
                edited
            )?;
            writeln!(out, "  {}", comment.content)?;
        }
        Ok(())
    }

    pub fn print_dashboard(&self, user: Option<&UserDto>, stats: &DashboardStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if let Some(user) = user {
            writeln!(out, "Welcome back, {}", user.display_name())?;
            writeln!(out)?;
        }
        writeln!(out, "projects         {}", stats.projects)?;
        writeln!(out, "organizations    {}", stats.organizations)?;
        writeln!(out, "tasks            {}", stats.tasks)?;
        writeln!(out, "in progress      {}", stats.in_progress)?;
        writeln!(out, "completed        {}", stats.completed)?;
        writeln!(out, "completion rate  {}%", stats.completion_rate)?;
        writeln!(out, "due today        {}", stats.due_today)?;
        let overdue = stats.overdue.to_string();
        let overdue = if stats.overdue > 0 {
            self.paint(&overdue, "31")
        } else {
            overdue
        };
        writeln!(out, "overdue          {overdue}")?;
        Ok(())
    }

    pub fn print_user(&self, user: &UserDto) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "id        {}", user.id)?;
        writeln!(out, "email     {}", user.email)?;
        writeln!(out, "name      {}", user.display_name())?;
        if let Some(joined) = user.date_joined {
            writeln!(out, "joined    {}", self.zone.format_date(joined))?;
        }
        if let Some(last) = user.last_login {
            writeln!(out, "last seen {}", self.zone.format_datetime(last))?;
        }
        Ok(())
    }

    /// Rewrites the current line on a terminal; plain lines otherwise.
    pub fn print_elapsed(&self, readings: &[Elapsed]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let line = if readings.is_empty() {
            "no timers running".to_string()
        } else {
            readings
                .iter()
                .map(|r| format!("#{} {} {}", r.task_id, r.title, self.paint(&r.clock(), "32")))
                .collect::<Vec<_>>()
                .join("  ")
        };
        if io::stdout().is_terminal() {
            write!(out, "\r\x1b[2K{line}")?;
        } else {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(mut writer: W, headers: &[&str], rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(*header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, width) in widths.iter().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or_default();
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            &["ID", "Title"],
            vec![
                vec!["\x1b[33m1\x1b[0m".to_string(), "日本".to_string()],
                vec!["22".to_string(), "ok".to_string()],
            ],
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID Title ");
        assert_eq!(lines[1], "-- ----- ");
        assert_eq!(strip_ansi(lines[2]), "1  日本  ");
        assert_eq!(lines[3], "22 ok    ");
    }

    #[test]
    fn rejects_unknown_color_setting() {
        let mut cfg = Config::defaults();
        cfg.set("color", "sometimes");
        assert!(Renderer::new(&cfg, Zone::Local).is_err());
    }
}
