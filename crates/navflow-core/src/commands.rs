use std::io::{self, BufRead, Write};

use anyhow::{Context as _, anyhow, bail};
use chrono::{DateTime, Utc};
use navflow_shared::{
    MemberArgs, OrganizationCreate, OrganizationPatch, ProjectCreate, ProjectPatch,
    RegisterRequest, SectionCreate, SectionPatch, TaskCreate, TaskPatch, UserPatch,
};
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, AuditQuery};
use crate::board::{ProjectBoard, check_section_membership};
use crate::cli::{
    Command, FocusCmd, InvitationsCmd, NotificationsCmd, OrgsCmd, ProjectsCmd, SectionsCmd,
    TaskListArgs, TasksCmd, TimerCmd,
};
use crate::config::Config;
use crate::dashboard::DashboardStats;
use crate::datetime::Zone;
use crate::directory::{MemberQuery, filter_orgs, permission_toggle, role_counts};
use crate::render::Renderer;
use crate::tasklist::{ProjectScope, SectionScope, SortField, SortOrder, TaskQuery};
use crate::ticker::ElapsedTicker;

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Context {
    pub api: ApiClient,
    pub cfg: Config,
    pub renderer: Renderer,
    pub zone: Zone,
}

#[instrument(skip(ctx, command))]
pub async fn dispatch(ctx: &Context, command: Command) -> anyhow::Result<()> {
    let now = Utc::now();
    debug!(?command, "dispatching command");

    match &command {
        Command::Login { .. } | Command::Register { .. } | Command::Config | Command::Logout => {}
        _ => ctx.api.require_session()?,
    }

    match command {
        Command::Login { email, password } => cmd_login(ctx, &email, password).await,
        Command::Register {
            email,
            first_name,
            last_name,
            password,
        } => cmd_register(ctx, email, first_name, last_name, password).await,
        Command::Logout => {
            ctx.api.logout().await.context("Failed to sign out")?;
            ctx.renderer.message("Signed out.")
        }
        Command::Whoami => {
            let user = ctx
                .api
                .current_user()
                .await
                .context("Failed to load profile")?;
            ctx.renderer.print_user(&user)
        }
        Command::Profile {
            first_name,
            last_name,
        } => cmd_profile(ctx, first_name, last_name).await,
        Command::Dashboard => cmd_dashboard(ctx, now).await,
        Command::Projects(cmd) => cmd_projects(ctx, cmd, now).await,
        Command::Tasks(cmd) => cmd_tasks(ctx, cmd, now).await,
        Command::Sections(cmd) => cmd_sections(ctx, cmd).await,
        Command::Timer(cmd) => cmd_timer(ctx, cmd).await,
        Command::Focus(cmd) => cmd_focus(ctx, cmd, now).await,
        Command::Orgs(cmd) => cmd_orgs(ctx, cmd).await,
        Command::Invitations(cmd) => cmd_invitations(ctx, cmd).await,
        Command::Activity {
            org,
            action,
            content_type,
            page,
        } => {
            let query = AuditQuery {
                organization: org,
                action,
                content_type,
                page,
            };
            let entries = ctx
                .api
                .audit_logs(&query)
                .await
                .context("Failed to load activity")?;
            if entries.is_empty() {
                return ctx.renderer.message("No activity.");
            }
            ctx.renderer.print_activity(&entries, now)
        }
        Command::Notifications(cmd) => cmd_notifications(ctx, cmd, now).await,
        Command::Config => cmd_show_config(&ctx.cfg),
    }
}

#[instrument(skip(ctx, password))]
async fn cmd_login(ctx: &Context, email: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_secret("Password: ")?,
    };
    let user = ctx
        .api
        .login(email, &password)
        .await
        .context("Failed to sign in")?;

    let name = user
        .map(|u| u.display_name())
        .unwrap_or_else(|| email.to_string());
    ctx.renderer.message(&format!("Signed in as {name}."))
}

#[instrument(skip(ctx, password))]
async fn cmd_register(
    ctx: &Context,
    email: String,
    first_name: String,
    last_name: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let (password, password_confirm) = match password {
        Some(password) => (password.clone(), password),
        None => (read_secret("Password: ")?, read_secret("Confirm password: ")?),
    };
    if password != password_confirm {
        bail!("passwords do not match");
    }

    let request = RegisterRequest {
        email: email.clone(),
        first_name,
        last_name,
        password,
        password_confirm,
    };
    ctx.api
        .register(&request)
        .await
        .context("Failed to create account")?;
    ctx.renderer
        .message(&format!("Account created; signed in as {email}."))
}

#[instrument(skip(ctx))]
async fn cmd_profile(
    ctx: &Context,
    first_name: Option<String>,
    last_name: Option<String>,
) -> anyhow::Result<()> {
    let user = if first_name.is_none() && last_name.is_none() {
        ctx.api
            .current_user()
            .await
            .context("Failed to load profile")?
    } else {
        let patch = UserPatch {
            first_name,
            last_name,
        };
        ctx.api
            .update_profile(&patch)
            .await
            .context("Failed to update profile")?
    };
    ctx.renderer.print_user(&user)
}

#[instrument(skip(ctx, now))]
async fn cmd_dashboard(ctx: &Context, now: DateTime<Utc>) -> anyhow::Result<()> {
    let (user, projects, orgs, tasks) = tokio::try_join!(
        ctx.api.current_user(),
        ctx.api.list_projects(),
        ctx.api.list_orgs(),
        ctx.api.list_tasks(None),
    )
    .context("Failed to load dashboard")?;

    let stats = DashboardStats::compute(&projects, &orgs, &tasks, &ctx.zone.window(now));
    ctx.renderer.print_dashboard(Some(&user), &stats)
}

#[instrument(skip(ctx, cmd, now))]
async fn cmd_projects(ctx: &Context, cmd: ProjectsCmd, now: DateTime<Utc>) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        ProjectsCmd::List => {
            let projects = api
                .list_projects()
                .await
                .context("Failed to load projects")?;
            if projects.is_empty() {
                return ctx.renderer.message("No projects yet.");
            }
            ctx.renderer.print_projects(&projects)
        }
        ProjectsCmd::Show { id } => {
            let board = ProjectBoard::load(api, id).await?;
            ctx.renderer
                .print_projects(std::slice::from_ref(&board.project))?;
            ctx.renderer.message("")?;

            let query = default_query(&ctx.cfg, ProjectScope::Only(id))?;
            let window = ctx.zone.window(now);
            let counts = query.section_counts(&board.tasks, &board.sections, &window);
            ctx.renderer.print_section_tabs(&board.sections, &counts)?;
            ctx.renderer
                .print_task_table(&query.apply(&board.tasks, &window), &window)
        }
        ProjectsCmd::Add {
            name,
            org,
            description,
        } => {
            let project = api
                .create_project(&ProjectCreate {
                    name,
                    description,
                    organization_id: org,
                })
                .await
                .context("Failed to create project")?;
            info!(project_id = project.id, "project created");
            ctx.renderer
                .message(&format!("Created project {} ({}).", project.id, project.name))
        }
        ProjectsCmd::Modify {
            id,
            name,
            description,
            status,
        } => {
            let patch = ProjectPatch {
                name,
                description,
                status,
            };
            let project = api
                .update_project(id, &patch)
                .await
                .context("Failed to update project")?;
            ctx.renderer
                .message(&format!("Updated project {} ({}).", project.id, project.name))
        }
        ProjectsCmd::Delete { id } => {
            api.delete_project(id)
                .await
                .context("Failed to delete project")?;
            ctx.renderer.message(&format!("Deleted project {id}."))
        }
        ProjectsCmd::Members { id } => {
            let members = api
                .project_members(id)
                .await
                .context("Failed to load members")?;
            let refs: Vec<_> = members.iter().collect();
            ctx.renderer.print_members(&refs, &role_counts(&members))
        }
        ProjectsCmd::AddMember { id, email, role } => {
            api.add_project_member(id, &MemberArgs { email: email.clone(), role })
                .await
                .context("Failed to add member")?;
            ctx.renderer
                .message(&format!("Added {email} to project {id}."))
        }
        ProjectsCmd::RemoveMember { id, email } => {
            api.remove_project_member(id, &email)
                .await
                .context("Failed to remove member")?;
            ctx.renderer
                .message(&format!("Removed {email} from project {id}."))
        }
    }
}

/// Sort choices from config, overridden per invocation.
fn default_query(cfg: &Config, project: ProjectScope) -> anyhow::Result<TaskQuery> {
    let sort: SortField = cfg
        .get("tasks.sort")
        .map(|s| s.parse())
        .transpose()
        .context("invalid tasks.sort")?
        .unwrap_or_default();
    let order: SortOrder = cfg
        .get("tasks.order")
        .map(|s| s.parse())
        .transpose()
        .context("invalid tasks.order")?
        .unwrap_or_default();

    Ok(TaskQuery {
        project,
        sort,
        order,
        ..TaskQuery::default()
    })
}

#[instrument(skip(ctx, args, now))]
async fn cmd_task_list(ctx: &Context, args: TaskListArgs, now: DateTime<Utc>) -> anyhow::Result<()> {
    let mut query = default_query(&ctx.cfg, args.project)?;
    query.search = args.search;
    query.priority = args.priority;
    query.status = args.status;
    query.due = args.due;
    query.section = args.section;
    if let Some(sort) = args.sort {
        query.sort = sort;
    }
    if let Some(order) = args.order {
        query.order = order;
    }

    let project_id = match query.project {
        ProjectScope::Only(id) => Some(id),
        ProjectScope::All => None,
    };
    if project_id.is_none() && query.section != SectionScope::All {
        warn!("section scope without a project only matches tasks that carry that section id");
    }

    let tasks = ctx
        .api
        .list_tasks(project_id)
        .await
        .context("Failed to load tasks")?;
    let window = ctx.zone.window(now);

    if let Some(project_id) = project_id {
        let sections = ctx
            .api
            .list_sections(project_id)
            .await
            .context("Failed to load sections")?;
        let counts = query.section_counts(&tasks, &sections, &window);
        ctx.renderer.print_section_tabs(&sections, &counts)?;
    }

    let visible = query.apply(&tasks, &window);
    if visible.is_empty() {
        return ctx.renderer.message("No matching tasks.");
    }
    ctx.renderer.print_task_table(&visible, &window)
}

#[instrument(skip(ctx, cmd, now))]
async fn cmd_tasks(ctx: &Context, cmd: TasksCmd, now: DateTime<Utc>) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        TasksCmd::List(args) => cmd_task_list(ctx, args, now).await,
        TasksCmd::Show { id } => {
            let task = api.get_task(id).await.context("Failed to load task")?;
            ctx.renderer.print_task_info(&task)
        }
        TasksCmd::Add {
            project,
            title,
            description,
            priority,
            status,
            due,
            section,
        } => {
            if title.trim().is_empty() {
                bail!("task title cannot be empty");
            }
            let due_date = due
                .as_deref()
                .map(|expr| ctx.zone.parse_date_expr(expr, now))
                .transpose()?;

            let mut board = ProjectBoard::load(api, project).await?;
            let task = board
                .create_task(
                    api,
                    TaskCreate {
                        title,
                        description,
                        project_id: project,
                        section,
                        status,
                        priority,
                        due_date,
                    },
                )
                .await?;
            ctx.renderer
                .message(&format!("Created task {} ({}).", task.id, task.title))
        }
        TasksCmd::Modify {
            id,
            title,
            description,
            priority,
            status,
            due,
            no_due,
            section,
            no_section,
        } => {
            let due_date = if no_due {
                Some(None)
            } else {
                due.as_deref()
                    .map(|expr| ctx.zone.parse_date_expr(expr, now).map(Some))
                    .transpose()?
            };
            let patch = TaskPatch {
                title,
                description,
                status,
                priority,
                section: if no_section { Some(None) } else { section.map(Some) },
                due_date,
                position: None,
            };

            let current = api.get_task(id).await.context("Failed to load task")?;
            let task = match current.project {
                Some(project) => {
                    let mut board = ProjectBoard::load(api, project).await?;
                    board.update_task(api, id, &patch).await?.clone()
                }
                None => {
                    if matches!(patch.section, Some(Some(_))) {
                        bail!("task {id} has no project; cannot assign a section");
                    }
                    api.update_task(id, &patch)
                        .await
                        .context("Failed to update task")?
                }
            };
            ctx.renderer
                .message(&format!("Updated task {} ({}).", task.id, task.title))
        }
        TasksCmd::Delete { id } => {
            api.delete_task(id).await.context("Failed to delete task")?;
            ctx.renderer.message(&format!("Deleted task {id}."))
        }
        TasksCmd::Reorder { project, ids } => {
            let mut board = ProjectBoard::load(api, project).await?;
            board.reorder(api, &ids).await?;
            ctx.renderer
                .message(&format!("Reordered {} tasks.", ids.len()))
        }
        TasksCmd::Focus { id, notes } => {
            let focused = api
                .focus_task(id, &notes)
                .await
                .context("Failed to focus task")?;
            ctx.renderer
                .message(&format!("Focused task {} as entry {}.", focused.task, focused.id))
        }
    }
}

#[instrument(skip(ctx, cmd))]
async fn cmd_sections(ctx: &Context, cmd: SectionsCmd) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        SectionsCmd::List { project } => {
            let board = ProjectBoard::load(api, project).await?;
            ctx.renderer.print_sections(&board.sections)
        }
        SectionsCmd::Add {
            project,
            name,
            color,
            icon,
            position,
        } => {
            let mut board = ProjectBoard::load(api, project).await?;
            let section = board
                .create_section(
                    api,
                    SectionCreate {
                        project,
                        name,
                        color,
                        icon,
                        position,
                    },
                )
                .await?;
            ctx.renderer
                .message(&format!("Created section {} ({}).", section.id, section.name))
        }
        SectionsCmd::Modify {
            project,
            id,
            name,
            color,
            position,
        } => {
            let mut board = ProjectBoard::load(api, project).await?;
            check_section_membership(&board.sections, Some(id))?;
            let patch = SectionPatch {
                name,
                color,
                icon: None,
                position,
            };
            let section = board.update_section(api, id, &patch).await?;
            ctx.renderer
                .message(&format!("Updated section {} ({}).", section.id, section.name))
        }
        SectionsCmd::Delete { project, id } => {
            let mut board = ProjectBoard::load(api, project).await?;
            board.delete_section(api, id).await?;
            ctx.renderer.message(&format!("Deleted section {id}."))
        }
        SectionsCmd::Default { project, id } => {
            let mut board = ProjectBoard::load(api, project).await?;
            board.set_default_section(api, id).await?;
            ctx.renderer.print_sections(&board.sections)
        }
    }
}

#[instrument(skip(ctx, cmd))]
async fn cmd_timer(ctx: &Context, cmd: TimerCmd) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        TimerCmd::Start { id } => {
            let task = api.start_timer(id).await.context("Failed to start timer")?;
            ctx.renderer
                .message(&format!("Timer running for task {} ({}).", task.id, task.title))
        }
        TimerCmd::Stop { id } => {
            let task = api.stop_timer(id).await.context("Failed to stop timer")?;
            ctx.renderer.message(&format!(
                "Timer stopped for task {}; tracked {}.",
                task.id,
                crate::datetime::format_minutes(task.time_spent())
            ))
        }
        TimerCmd::Add { id, minutes } => {
            if minutes == 0 {
                bail!("minutes must be positive");
            }
            let task = api
                .add_time(id, minutes)
                .await
                .context("Failed to add time")?;
            ctx.renderer.message(&format!(
                "Task {} now has {} tracked.",
                task.id,
                crate::datetime::format_minutes(task.time_spent())
            ))
        }
        TimerCmd::Watch { project, ticks } => {
            let tasks = api
                .list_tasks(project)
                .await
                .context("Failed to load tasks")?;
            if !tasks.iter().any(|t| t.is_timer_running) {
                return ctx.renderer.message("No timers running.");
            }

            let ticker = ElapsedTicker::new(ctx.cfg.tick_interval()?, ticks);
            let mut render_error = None;
            ticker
                .run(&tasks, |_, readings| {
                    if render_error.is_none()
                        && let Err(err) = ctx.renderer.print_elapsed(readings)
                    {
                        render_error = Some(err);
                    }
                })
                .await?;
            if let Some(err) = render_error {
                return Err(err);
            }
            ctx.renderer.message("")
        }
    }
}

#[instrument(skip(ctx, cmd, now))]
async fn cmd_focus(ctx: &Context, cmd: FocusCmd, now: DateTime<Utc>) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        FocusCmd::List => {
            let items = api.list_focus().await.context("Failed to load focus list")?;
            if items.is_empty() {
                return ctx.renderer.message("Nothing in focus.");
            }
            ctx.renderer.print_focus(&items, now)
        }
        FocusCmd::Remove { id } => {
            api.unfocus(id).await.context("Failed to remove from focus")?;
            ctx.renderer.message(&format!("Removed focus entry {id}."))
        }
        FocusCmd::Notes { id, text } => {
            api.update_focus_notes(id, &text)
                .await
                .context("Failed to save notes")?;
            ctx.renderer.message("Notes saved.")
        }
        FocusCmd::Comments { id } => {
            let entry = find_focus(api, id).await?;
            let comments = api
                .list_comments(entry.task)
                .await
                .context("Failed to load comments")?;
            ctx.renderer.print_comments(&comments, now)
        }
        FocusCmd::Comment { id, text } => {
            if text.trim().is_empty() {
                bail!("comment cannot be empty");
            }
            let entry = find_focus(api, id).await?;
            api.add_comment(entry.task, &text)
                .await
                .context("Failed to add comment")?;
            ctx.renderer.message("Comment added.")
        }
        FocusCmd::Timer { id } => {
            let mut entry = find_focus(api, id).await?;
            if entry.task_data.is_timer_running {
                api.stop_timer(entry.task)
                    .await
                    .context("Failed to stop timer")?;
            } else {
                api.start_timer(entry.task)
                    .await
                    .context("Failed to start timer")?;
            }
            entry.task_data = api
                .get_task(entry.task)
                .await
                .context("Failed to load task")?;
            ctx.renderer.print_focus(std::slice::from_ref(&entry), now)
        }
    }
}

async fn find_focus(api: &ApiClient, id: u64) -> anyhow::Result<navflow_shared::FocusedTaskDto> {
    api.list_focus()
        .await
        .context("Failed to load focus list")?
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| anyhow!("no focus entry {id}"))
}

#[instrument(skip(ctx, cmd))]
async fn cmd_orgs(ctx: &Context, cmd: OrgsCmd) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        OrgsCmd::List { search } => {
            let orgs = api
                .list_orgs()
                .await
                .context("Failed to load organizations")?;
            let visible = filter_orgs(&orgs, &search);
            if visible.is_empty() {
                return ctx.renderer.message("No organizations found.");
            }
            ctx.renderer.print_orgs(&visible)
        }
        OrgsCmd::Show { id } => {
            let org = api
                .get_org(id)
                .await
                .context("Failed to load organization")?;
            ctx.renderer.print_orgs(&[&org])?;
            if !org.members.is_empty() {
                ctx.renderer.message("")?;
                let refs: Vec<_> = org.members.iter().collect();
                ctx.renderer
                    .print_members(&refs, &role_counts(&org.members))?;
            }
            Ok(())
        }
        OrgsCmd::Add { name, description } => {
            if name.trim().is_empty() {
                bail!("organization name cannot be empty");
            }
            let org = api
                .create_org(&OrganizationCreate { name, description })
                .await
                .context("Failed to create organization")?;
            ctx.renderer
                .message(&format!("Created organization {} ({}).", org.id, org.name))
        }
        OrgsCmd::Modify {
            id,
            name,
            description,
        } => {
            let org = api
                .update_org(id, &OrganizationPatch { name, description })
                .await
                .context("Failed to update organization")?;
            ctx.renderer
                .message(&format!("Updated organization {} ({}).", org.id, org.name))
        }
        OrgsCmd::Delete { id } => {
            api.delete_org(id)
                .await
                .context("Failed to delete organization")?;
            ctx.renderer.message(&format!("Deleted organization {id}."))
        }
        OrgsCmd::Members { id, search, role } => {
            let members = api
                .org_members(id)
                .await
                .context("Failed to load members")?;
            let query = MemberQuery { search, role };
            ctx.renderer
                .print_members(&query.apply(&members), &role_counts(&members))
        }
        OrgsCmd::AddMember { id, email, role } => {
            api.add_org_member(id, &MemberArgs { email: email.clone(), role })
                .await
                .context("Failed to add member")?;
            ctx.renderer
                .message(&format!("Added {email} to organization {id}."))
        }
        OrgsCmd::Invite {
            id,
            identifier,
            role,
        } => {
            api.invite(id, &identifier, role)
                .await
                .context("Failed to send invitation")?;
            ctx.renderer
                .message(&format!("Invitation sent to {identifier}."))
        }
        OrgsCmd::Role { id, email, role } => {
            api.update_role(id, &email, role)
                .await
                .context("Failed to update role")?;
            ctx.renderer
                .message(&format!("{email} is now {role}."))
        }
        OrgsCmd::RemoveMember { id, email } => {
            api.remove_org_member(id, &email)
                .await
                .context("Failed to remove member")?;
            ctx.renderer
                .message(&format!("Removed {email} from organization {id}."))
        }
        OrgsCmd::Invitations { id } => {
            let invitations = api
                .org_invitations(id)
                .await
                .context("Failed to load invitations")?;
            ctx.renderer.print_invitations(&invitations)
        }
        OrgsCmd::Permissions { id } => {
            let permissions = api
                .org_permissions(id)
                .await
                .context("Failed to load permissions")?;
            ctx.renderer.print_permissions(&permissions)
        }
        OrgsCmd::Toggle {
            id,
            role,
            capability,
        } => {
            let current = api
                .org_permissions(id)
                .await
                .context("Failed to load permissions")?;
            let update = permission_toggle(&current, role, &capability)?;
            let updated = api
                .update_permission(id, &update)
                .await
                .context("Failed to update permission")?;
            ctx.renderer.print_permissions(&updated)
        }
    }
}

#[instrument(skip(ctx, cmd))]
async fn cmd_invitations(ctx: &Context, cmd: InvitationsCmd) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        InvitationsCmd::List => {
            let invitations = api
                .my_invitations()
                .await
                .context("Failed to load invitations")?;
            if invitations.is_empty() {
                return ctx.renderer.message("No pending invitations.");
            }
            ctx.renderer.print_invitations(&invitations)
        }
        InvitationsCmd::Accept { id } => {
            api.accept_invitation(id)
                .await
                .context("Failed to accept invitation")?;
            ctx.renderer.message("Invitation accepted.")
        }
        InvitationsCmd::Decline { id } => {
            api.decline_invitation(id)
                .await
                .context("Failed to decline invitation")?;
            ctx.renderer.message("Invitation declined.")
        }
    }
}

#[instrument(skip(ctx, cmd, now))]
async fn cmd_notifications(ctx: &Context, cmd: NotificationsCmd, now: DateTime<Utc>) -> anyhow::Result<()> {
    let api = &ctx.api;
    match cmd {
        NotificationsCmd::List => {
            let items = api
                .list_notifications()
                .await
                .context("Failed to load notifications")?;
            if items.is_empty() {
                return ctx.renderer.message("No notifications.");
            }
            ctx.renderer.print_notifications(&items, now)
        }
        NotificationsCmd::Read { id } => {
            api.mark_notification_read(id)
                .await
                .context("Failed to mark notification read")?;
            ctx.renderer.message("Marked as read.")
        }
        NotificationsCmd::ReadAll => {
            api.mark_all_notifications_read()
                .await
                .context("Failed to mark notifications read")?;
            ctx.renderer.message("All notifications marked as read.")
        }
        NotificationsCmd::Accept { id } => {
            api.accept_notification(id)
                .await
                .context("Failed to accept invitation")?;
            ctx.renderer.message("Invitation accepted.")
        }
        NotificationsCmd::Decline { id } => {
            api.decline_notification(id)
                .await
                .context("Failed to decline invitation")?;
            ctx.renderer.message("Invitation declined.")
        }
    }
}

fn cmd_show_config(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();

    let mut out = io::stdout().lock();
    for file in &cfg.loaded_files {
        writeln!(out, "# {}", file.display())?;
    }
    for (key, value) in entries {
        writeln!(out, "{key}={value}")?;
    }
    Ok(())
}

/// Prompts on stderr and reads one line from stdin.
fn read_secret(prompt: &str) -> anyhow::Result<String> {
    let mut err = io::stderr().lock();
    write!(err, "{prompt}")?;
    err.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        bail!("password cannot be empty");
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_reads_sort_config() {
        let mut cfg = Config::defaults();
        cfg.set("tasks.sort", "priority");
        cfg.set("tasks.order", "asc");

        let query = default_query(&cfg, ProjectScope::Only(3)).unwrap();
        assert_eq!(query.sort, SortField::Priority);
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.project, ProjectScope::Only(3));

        cfg.set("tasks.sort", "bogus");
        assert!(default_query(&cfg, ProjectScope::All).is_err());
    }
}
