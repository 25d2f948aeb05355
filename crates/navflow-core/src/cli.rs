use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use navflow_shared::{Priority, Role, TaskStatus};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::directory::RoleFilter;
use crate::tasklist::{
    DueBucket, PriorityScope, ProjectScope, SectionScope, SortField, SortOrder, StatusScope,
};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "navflow",
    version,
    about = "NavFlow: projects, tasks and organizations from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "navflowrc", global = true)]
    pub navflowrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Keep credentials in memory only.
    #[arg(long = "ephemeral", global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in and store tokens.
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long = "first-name", default_value = "")]
        first_name: String,
        #[arg(long = "last-name", default_value = "")]
        last_name: String,
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    Whoami,
    /// Show or update the signed-in user.
    Profile {
        #[arg(long = "first-name")]
        first_name: Option<String>,
        #[arg(long = "last-name")]
        last_name: Option<String>,
    },
    Dashboard,
    #[command(subcommand)]
    Projects(ProjectsCmd),
    #[command(subcommand)]
    Tasks(TasksCmd),
    #[command(subcommand)]
    Sections(SectionsCmd),
    #[command(subcommand)]
    Timer(TimerCmd),
    #[command(subcommand)]
    Focus(FocusCmd),
    #[command(subcommand)]
    Orgs(OrgsCmd),
    #[command(subcommand)]
    Invitations(InvitationsCmd),
    /// Audit log of changes in your organizations.
    Activity {
        #[arg(long)]
        org: Option<u64>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long = "type")]
        content_type: Option<String>,
        #[arg(long)]
        page: Option<u32>,
    },
    #[command(subcommand)]
    Notifications(NotificationsCmd),
    /// Print the effective configuration.
    Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProjectsCmd {
    List,
    Show {
        id: u64,
    },
    Add {
        name: String,
        #[arg(long)]
        org: u64,
        #[arg(long, default_value = "")]
        description: String,
    },
    Modify {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Delete {
        id: u64,
    },
    Members {
        id: u64,
    },
    AddMember {
        id: u64,
        email: String,
        #[arg(long)]
        role: Option<Role>,
    },
    RemoveMember {
        id: u64,
        email: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct TaskListArgs {
    /// Matches title, description or project name.
    #[arg(long, short = 's', default_value = "")]
    pub search: String,
    #[arg(long, default_value = "all")]
    pub project: ProjectScope,
    #[arg(long, default_value = "all")]
    pub priority: PriorityScope,
    /// all, todo, in_progress, review or done.
    #[arg(long, default_value = "all")]
    pub status: StatusScope,
    /// overdue, today, tomorrow, this_week or no_date.
    #[arg(long)]
    pub due: Option<DueBucket>,
    #[arg(long, default_value = "all")]
    pub section: SectionScope,
    #[arg(long)]
    pub sort: Option<SortField>,
    #[arg(long)]
    pub order: Option<SortOrder>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TasksCmd {
    List(TaskListArgs),
    Show {
        id: u64,
    },
    Add {
        #[arg(long)]
        project: u64,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Date expression: today, friday, +3d, 2026-01-31 ...
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        section: Option<u64>,
    },
    Modify {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<String>,
        #[arg(long = "no-due")]
        no_due: bool,
        #[arg(long, conflicts_with = "no_section")]
        section: Option<u64>,
        #[arg(long = "no-section")]
        no_section: bool,
    },
    Delete {
        id: u64,
    },
    /// Persist a manual order; ids listed first come first.
    Reorder {
        #[arg(long)]
        project: u64,
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Add a task to focus mode.
    Focus {
        id: u64,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SectionsCmd {
    List {
        #[arg(long)]
        project: u64,
    },
    Add {
        #[arg(long)]
        project: u64,
        name: String,
        #[arg(long, default_value = "#6B7280")]
        color: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },
    Modify {
        #[arg(long)]
        project: u64,
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        position: Option<i64>,
    },
    Delete {
        #[arg(long)]
        project: u64,
        id: u64,
    },
    Default {
        #[arg(long)]
        project: u64,
        id: u64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TimerCmd {
    Start {
        id: u64,
    },
    Stop {
        id: u64,
    },
    Add {
        id: u64,
        minutes: u64,
    },
    /// Live elapsed time for running timers.
    Watch {
        #[arg(long)]
        project: Option<u64>,
        /// Stop after this many ticks.
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum FocusCmd {
    List,
    Remove {
        id: u64,
    },
    Notes {
        id: u64,
        text: String,
    },
    Comments {
        id: u64,
    },
    Comment {
        id: u64,
        text: String,
    },
    /// Start or stop the focused task's timer.
    Timer {
        id: u64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum OrgsCmd {
    List {
        #[arg(long, short = 's', default_value = "")]
        search: String,
    },
    Show {
        id: u64,
    },
    Add {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Modify {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        id: u64,
    },
    Members {
        id: u64,
        #[arg(long, short = 's', default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        role: RoleFilter,
    },
    AddMember {
        id: u64,
        email: String,
        #[arg(long)]
        role: Option<Role>,
    },
    Invite {
        id: u64,
        /// Email address or username.
        identifier: String,
        #[arg(long, default_value = "member")]
        role: Role,
    },
    Role {
        id: u64,
        email: String,
        role: Role,
    },
    RemoveMember {
        id: u64,
        email: String,
    },
    Invitations {
        id: u64,
    },
    Permissions {
        id: u64,
    },
    /// Flip one capability for one role.
    Toggle {
        id: u64,
        role: Role,
        capability: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum InvitationsCmd {
    List,
    Accept { id: u64 },
    Decline { id: u64 },
}

#[derive(Subcommand, Debug, Clone)]
pub enum NotificationsCmd {
    List,
    Read { id: u64 },
    ReadAll,
    Accept { id: u64 },
    Decline { id: u64 },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_captured() {
        let pre = preprocess_args(&args(&[
            "navflow",
            "rc.color=off",
            "tasks",
            "rc.api.base_url:http://h/api",
            "list",
        ]))
        .unwrap();

        assert_eq!(pre.cleaned_args, args(&["navflow", "tasks", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.api.base_url".to_string(), "http://h/api".to_string()),
            ]
        );
    }

    #[test]
    fn task_list_flags_parse_into_selectors() {
        let cli = GlobalCli::try_parse_from([
            "navflow", "tasks", "list", "--project", "4", "--priority", "high", "--due",
            "overdue", "--status", "review", "--sort", "due_date", "--order", "asc", "-v",
        ])
        .unwrap();

        let Command::Tasks(TasksCmd::List(list)) = cli.command else {
            panic!("expected tasks list");
        };
        assert_eq!(cli.verbose, 1);
        assert_eq!(list.project, ProjectScope::Only(4));
        assert_eq!(list.priority, PriorityScope::Only(Priority::High));
        assert_eq!(list.status, StatusScope::Only(TaskStatus::Review));
        assert_eq!(list.due, Some(DueBucket::Overdue));
        assert_eq!(list.section, SectionScope::All);
        assert_eq!(list.sort, Some(SortField::DueDate));
        assert_eq!(list.order, Some(SortOrder::Asc));
    }

    #[test]
    fn rc_flag_requires_key_value() {
        assert!(GlobalCli::try_parse_from(["navflow", "--rc", "color", "logout"]).is_err());
        let cli = GlobalCli::try_parse_from(["navflow", "--rc", "color=off", "logout"]).unwrap();
        assert_eq!(cli.rc_overrides[0].key, "color");
    }
}
