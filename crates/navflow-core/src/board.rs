use anyhow::{Context, anyhow, bail};
use navflow_shared::{
    MemberDto, ProjectDto, SectionCreate, SectionDto, SectionPatch, TaskCreate, TaskDto,
    TaskPatch, TaskPosition, TaskReorder,
};
use tracing::{debug, info};

use crate::api::ApiClient;

/// One project's tasks and sections as last confirmed by the server.
#[derive(Debug, Clone)]
pub struct ProjectBoard {
    pub project: ProjectDto,
    pub members: Vec<MemberDto>,
    pub tasks: Vec<TaskDto>,
    pub sections: Vec<SectionDto>,
}

impl ProjectBoard {
    #[tracing::instrument(skip(api))]
    pub async fn load(api: &ApiClient, project_id: u64) -> anyhow::Result<Self> {
        let detail = api
            .get_project(project_id)
            .await
            .context("Failed to load project")?;
        let tasks = api
            .list_tasks(Some(project_id))
            .await
            .context("Failed to load tasks")?;
        let mut sections = api
            .list_sections(project_id)
            .await
            .context("Failed to load sections")?;
        if sections.is_empty() {
            sections = detail.sections;
        }
        sort_sections(&mut sections);

        info!(
            project_id,
            tasks = tasks.len(),
            sections = sections.len(),
            "loaded project board"
        );
        Ok(Self {
            project: detail.summary,
            members: detail.roles,
            tasks,
            sections,
        })
    }

    pub fn task(&self, id: u64) -> Option<&TaskDto> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn section(&self, id: u64) -> Option<&SectionDto> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Replaces the task with the same id, or appends it.
    pub fn upsert_task(&mut self, task: TaskDto) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    pub fn remove_task(&mut self, id: u64) -> Option<TaskDto> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn upsert_section(&mut self, section: SectionDto) {
        match self.sections.iter_mut().find(|s| s.id == section.id) {
            Some(slot) => *slot = section,
            None => self.sections.push(section),
        }
        sort_sections(&mut self.sections);
    }

    /// Drops the section and detaches its tasks locally.
    pub fn remove_section(&mut self, id: u64) -> Option<SectionDto> {
        let idx = self.sections.iter().position(|s| s.id == id)?;
        for task in self.tasks.iter_mut().filter(|t| t.section == Some(id)) {
            task.section = None;
            task.section_name = None;
            task.section_color = None;
        }
        Some(self.sections.remove(idx))
    }

    #[tracing::instrument(skip(self, api), fields(project_id = self.project.id))]
    pub async fn reload(&mut self, api: &ApiClient) -> anyhow::Result<()> {
        *self = Self::load(api, self.project.id).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, api, task), fields(project_id = self.project.id))]
    pub async fn create_task(
        &mut self,
        api: &ApiClient,
        mut task: TaskCreate,
    ) -> anyhow::Result<&TaskDto> {
        task.project_id = self.project.id;
        check_section_membership(&self.sections, task.section)?;

        let created = api
            .create_task(&task)
            .await
            .context("Failed to create task")?;
        let id = created.id;
        self.upsert_task(created);
        self.task(id)
            .ok_or_else(|| anyhow!("task {id} missing after create"))
    }

    #[tracing::instrument(skip(self, api, patch), fields(task_id = id))]
    pub async fn update_task(
        &mut self,
        api: &ApiClient,
        id: u64,
        patch: &TaskPatch,
    ) -> anyhow::Result<&TaskDto> {
        if patch.is_empty() {
            bail!("nothing to update for task {id}");
        }
        if let Some(section) = patch.section {
            check_section_membership(&self.sections, section)?;
        }

        let updated = api
            .update_task(id, patch)
            .await
            .context("Failed to update task")?;
        self.upsert_task(updated);
        self.task(id)
            .ok_or_else(|| anyhow!("task {id} missing after update"))
    }

    #[tracing::instrument(skip(self, api), fields(task_id = id))]
    pub async fn delete_task(&mut self, api: &ApiClient, id: u64) -> anyhow::Result<()> {
        api.delete_task(id)
            .await
            .context("Failed to delete task")?;
        self.remove_task(id);
        Ok(())
    }

    /// Starts or stops the timer depending on the last known state.
    #[tracing::instrument(skip(self, api), fields(task_id = id))]
    pub async fn toggle_timer(&mut self, api: &ApiClient, id: u64) -> anyhow::Result<&TaskDto> {
        let running = self
            .task(id)
            .map(|t| t.is_timer_running)
            .ok_or_else(|| anyhow!("task {id} is not on this board"))?;

        let updated = if running {
            api.stop_timer(id)
                .await
                .context("Failed to stop timer")?
        } else {
            api.start_timer(id)
                .await
                .context("Failed to start timer")?
        };
        debug!(was_running = running, now_running = updated.is_timer_running, "timer toggled");
        self.upsert_task(updated);
        self.task(id)
            .ok_or_else(|| anyhow!("task {id} missing after timer change"))
    }

    /// Persists a new manual order for the given tasks, then re-fetches.
    #[tracing::instrument(skip(self, api, ordered_ids), fields(count = ordered_ids.len()))]
    pub async fn reorder(
        &mut self,
        api: &ApiClient,
        ordered_ids: &[u64],
    ) -> anyhow::Result<()> {
        let mut positions = Vec::with_capacity(ordered_ids.len());
        for (idx, id) in ordered_ids.iter().enumerate() {
            if self.task(*id).is_none() {
                bail!("task {id} is not on this board");
            }
            positions.push(TaskPosition {
                id: *id,
                position: idx as i64,
                status: None,
            });
        }

        api.reorder_tasks(&TaskReorder { tasks: positions })
            .await
            .context("Failed to reorder tasks")?;
        self.reload(api).await
    }

    #[tracing::instrument(skip(self, api, section), fields(project_id = self.project.id))]
    pub async fn create_section(
        &mut self,
        api: &ApiClient,
        mut section: SectionCreate,
    ) -> anyhow::Result<&SectionDto> {
        section.project = self.project.id;
        if section.name.trim().is_empty() {
            bail!("section name cannot be empty");
        }
        let created = api
            .create_section(&section)
            .await
            .context("Failed to create section")?;
        let id = created.id;
        self.upsert_section(created);
        self.section(id)
            .ok_or_else(|| anyhow!("section {id} missing after create"))
    }

    #[tracing::instrument(skip(self, api, patch), fields(section_id = id))]
    pub async fn update_section(
        &mut self,
        api: &ApiClient,
        id: u64,
        patch: &SectionPatch,
    ) -> anyhow::Result<&SectionDto> {
        let updated = api
            .update_section(id, patch)
            .await
            .context("Failed to update section")?;
        self.upsert_section(updated);
        self.section(id)
            .ok_or_else(|| anyhow!("section {id} missing after update"))
    }

    #[tracing::instrument(skip(self, api), fields(section_id = id))]
    pub async fn delete_section(&mut self, api: &ApiClient, id: u64) -> anyhow::Result<()> {
        let section = self
            .section(id)
            .ok_or_else(|| anyhow!("section {id} is not on this board"))?;
        if section.is_default {
            bail!("cannot delete the default section '{}'", section.name);
        }

        api.delete_section(id)
            .await
            .context("Failed to delete section")?;
        self.remove_section(id);
        Ok(())
    }

    /// Another section loses its default flag server-side, so the whole list
    /// is re-fetched.
    #[tracing::instrument(skip(self, api), fields(section_id = id))]
    pub async fn set_default_section(&mut self, api: &ApiClient, id: u64) -> anyhow::Result<()> {
        if self.section(id).is_none() {
            bail!("section {id} is not on this board");
        }
        api.set_default_section(id)
            .await
            .context("Failed to set default section")?;
        let mut sections = api
            .list_sections(self.project.id)
            .await
            .context("Failed to load sections")?;
        sort_sections(&mut sections);
        self.sections = sections;
        Ok(())
    }
}

/// A task may only point at a section of its own project.
pub fn check_section_membership(
    sections: &[SectionDto],
    section: Option<u64>,
) -> anyhow::Result<()> {
    let Some(id) = section else {
        return Ok(());
    };
    if sections.iter().any(|s| s.id == id) {
        Ok(())
    } else {
        Err(anyhow!("section {id} does not belong to this project"))
    }
}

fn sort_sections(sections: &mut [SectionDto]) {
    sections.sort_by_key(|s| (s.position, s.id));
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use navflow_shared::{Priority, TaskStatus};

    use super::*;

    fn section(id: u64, position: i64, is_default: bool) -> SectionDto {
        SectionDto {
            id,
            name: format!("S{id}"),
            slug: format!("s{id}"),
            color: "#888888".to_string(),
            icon: None,
            position,
            project: Some(1),
            is_default,
            task_count: None,
        }
    }

    fn task(id: u64, section: Option<u64>) -> TaskDto {
        TaskDto {
            id,
            title: format!("T{id}"),
            description: None,
            project: Some(1),
            project_name: "Board".to_string(),
            section,
            section_name: section.map(|s| format!("S{s}")),
            section_color: None,
            priority: Priority::Low,
            status: TaskStatus::Todo,
            assigned_to_email: None,
            due_date: None,
            created_at: Utc::now(),
            updated_at: None,
            time_spent_minutes: None,
            time_spent_display: None,
            is_timer_running: false,
            timer_started_at: None,
            position: 0,
        }
    }

    fn board() -> ProjectBoard {
        ProjectBoard {
            project: ProjectDto {
                id: 1,
                name: "Board".to_string(),
                description: None,
                organization_name: "Org".to_string(),
                status: "active".to_string(),
                owner_email: None,
                member_count: 1,
                task_count: 2,
                user_role: None,
                created_at: None,
            },
            members: vec![],
            tasks: vec![task(1, Some(10)), task(2, None)],
            sections: vec![section(10, 0, true), section(11, 1, false)],
        }
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut board = board();
        let mut changed = task(1, Some(11));
        changed.title = "renamed".to_string();
        board.upsert_task(changed);
        board.upsert_task(task(3, None));

        assert_eq!(board.tasks.len(), 3);
        assert_eq!(board.tasks[0].title, "renamed");
        assert_eq!(board.tasks[0].section, Some(11));
    }

    #[test]
    fn removing_section_detaches_tasks() {
        let mut board = board();
        board.remove_section(10);
        assert!(board.section(10).is_none());
        assert_eq!(board.task(1).unwrap().section, None);
        assert_eq!(board.task(1).unwrap().section_name, None);
    }

    #[test]
    fn sections_stay_ordered_by_position() {
        let mut board = board();
        board.upsert_section(section(12, -1, false));
        let ids: Vec<u64> = board.sections.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![12, 10, 11]);
    }

    #[test]
    fn membership_rejects_foreign_sections() {
        let sections = vec![section(10, 0, true)];
        assert!(check_section_membership(&sections, None).is_ok());
        assert!(check_section_membership(&sections, Some(10)).is_ok());
        assert!(check_section_membership(&sections, Some(99)).is_err());
    }
}
