use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
  Urgent
}

impl Priority {
  pub const ALL: [Priority; 4] = [
    Priority::Urgent,
    Priority::High,
    Priority::Medium,
    Priority::Low
  ];

  /// Sort rank; urgent sorts first.
  pub fn rank(self) -> u8 {
    match self {
      | Priority::Urgent => 0,
      | Priority::High => 1,
      | Priority::Medium => 2,
      | Priority::Low => 3
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Priority::Low => "low",
      | Priority::Medium => "medium",
      | Priority::High => "high",
      | Priority::Urgent => "urgent"
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Priority {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "low" | "l" => Ok(Priority::Low),
      | "medium" | "med" | "m" => {
        Ok(Priority::Medium)
      }
      | "high" | "h" => {
        Ok(Priority::High)
      }
      | "urgent" | "u" => {
        Ok(Priority::Urgent)
      }
      | other => Err(format!(
        "unknown priority: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Todo,
  InProgress,
  Review,
  Done
}

impl TaskStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "todo",
      | TaskStatus::InProgress => {
        "in_progress"
      }
      | TaskStatus::Review => "review",
      | TaskStatus::Done => "done"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "To Do",
      | TaskStatus::InProgress => {
        "In Progress"
      }
      | TaskStatus::Review => {
        "In Review"
      }
      | TaskStatus::Done => "Done"
    }
  }
}

impl FromStr for TaskStatus {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .replace('-', "_")
      .as_str()
    {
      | "todo" => Ok(TaskStatus::Todo),
      | "in_progress" | "doing" => {
        Ok(TaskStatus::InProgress)
      }
      | "review" => {
        Ok(TaskStatus::Review)
      }
      | "done" => Ok(TaskStatus::Done),
      | other => Err(format!(
        "unknown status: {other}"
      ))
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Owner,
  Admin,
  Moderator,
  Member
}

impl Role {
  pub const ALL: [Role; 4] = [
    Role::Owner,
    Role::Admin,
    Role::Moderator,
    Role::Member
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Role::Owner => "owner",
      | Role::Admin => "admin",
      | Role::Moderator => "moderator",
      | Role::Member => "member"
    }
  }
}

impl fmt::Display for Role {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = String;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "owner" => Ok(Role::Owner),
      | "admin" => Ok(Role::Admin),
      | "moderator" | "mod" => {
        Ok(Role::Moderator)
      }
      | "member" => Ok(Role::Member),
      | other => Err(format!(
        "unknown role: {other}"
      ))
    }
  }
}

/// List endpoints answer either with a
/// bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
  Page(Page<T>),
  Items(Vec<T>)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
  #[serde(default)]
  pub count:    Option<u64>,
  #[serde(default)]
  pub next:     Option<String>,
  #[serde(default)]
  pub previous: Option<String>,
  pub results:  Vec<T>
}

impl<T> Listing<T> {
  pub fn into_items(self) -> Vec<T> {
    match self {
      | Listing::Page(page) => {
        page.results
      }
      | Listing::Items(items) => items
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskDto {
  pub id:                 u64,
  #[serde(default)]
  pub title:              String,
  #[serde(default)]
  pub description:        Option<String>,
  #[serde(default)]
  pub project:            Option<u64>,
  #[serde(default)]
  pub project_name:       String,
  #[serde(default)]
  pub section:            Option<u64>,
  #[serde(default)]
  pub section_name:       Option<String>,
  #[serde(default)]
  pub section_color:      Option<String>,
  pub priority:           Priority,
  pub status:             TaskStatus,
  #[serde(default)]
  pub assigned_to_email:  Option<String>,
  #[serde(default)]
  pub due_date: Option<DateTime<Utc>>,
  pub created_at:         DateTime<Utc>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub time_spent_minutes: Option<u64>,
  #[serde(default)]
  pub time_spent_display: Option<String>,
  #[serde(default)]
  pub is_timer_running:   bool,
  #[serde(default)]
  pub timer_started_at:
    Option<DateTime<Utc>>,
  #[serde(default)]
  pub position:           i64
}

impl TaskDto {
  /// Tracked minutes, with a missing
  /// value read as zero.
  pub fn time_spent(&self) -> u64 {
    self.time_spent_minutes.unwrap_or(0)
  }

  pub fn description_text(
    &self
  ) -> &str {
    self
      .description
      .as_deref()
      .unwrap_or_default()
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskCreate {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub project_id:  u64,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub section:     Option<u64>,
  pub status:      TaskStatus,
  pub priority:    Priority,
  pub due_date:    Option<DateTime<Utc>>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct TaskPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub title:       Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<TaskStatus>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub priority:    Option<Priority>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub section:     Option<Option<u64>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date:
    Option<Option<DateTime<Utc>>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub position:    Option<i64>
}

impl TaskPatch {
  pub fn is_empty(&self) -> bool {
    self == &TaskPatch::default()
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct TaskReorder {
  pub tasks: Vec<TaskPosition>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct TaskPosition {
  pub id:       u64,
  pub position: i64,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:   Option<TaskStatus>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct AddTime {
  pub minutes: u64
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct SectionDto {
  pub id:         u64,
  pub name:       String,
  #[serde(default)]
  pub slug:       String,
  #[serde(default)]
  pub color:      String,
  #[serde(default)]
  pub icon:       Option<String>,
  #[serde(default)]
  pub position:   i64,
  #[serde(default)]
  pub project:    Option<u64>,
  #[serde(default)]
  pub is_default: bool,
  #[serde(default)]
  pub task_count: Option<u64>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct SectionCreate {
  pub project:  u64,
  pub name:     String,
  pub color:    String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub icon:     Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub position: Option<i64>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
pub struct SectionPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub name:     Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub color:    Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub icon:     Option<Option<String>>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub position: Option<i64>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct MemberDto {
  #[serde(default)]
  pub id:           Option<u64>,
  pub user_email:   String,
  #[serde(default)]
  pub user_name:    String,
  pub role:         Role,
  #[serde(default)]
  pub role_display: Option<String>,
  #[serde(
    default,
    alias = "assigned_at"
  )]
  pub joined_at: Option<DateTime<Utc>>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ProjectDto {
  pub id:                u64,
  pub name:              String,
  #[serde(default)]
  pub description:       Option<String>,
  #[serde(default)]
  pub organization_name: String,
  #[serde(default)]
  pub status:            String,
  #[serde(default)]
  pub owner_email:       Option<String>,
  #[serde(default)]
  pub member_count:      u64,
  #[serde(default)]
  pub task_count:        u64,
  #[serde(default)]
  pub user_role:         Option<Role>,
  #[serde(default)]
  pub created_at:
    Option<DateTime<Utc>>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ProjectDetail {
  #[serde(flatten)]
  pub summary:  ProjectDto,
  #[serde(default)]
  pub roles:    Vec<MemberDto>,
  #[serde(default)]
  pub tasks:    Vec<TaskDto>,
  #[serde(default)]
  pub sections: Vec<SectionDto>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct ProjectCreate {
  pub name:            String,
  #[serde(default)]
  pub description:     String,
  pub organization_id: u64
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct ProjectPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub name:        Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:      Option<String>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct MemberArgs {
  pub email: String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub role:  Option<Role>
}

/// Invitation target: an email address
/// or a username.
#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct InviteRequest {
  pub identifier: String,
  pub role:       Role
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct RoleUpdate {
  pub user_email: String,
  pub role:       Role
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct OrganizationDto {
  pub id:           u64,
  pub name:         String,
  #[serde(default)]
  pub description:  Option<String>,
  #[serde(default)]
  pub owner_email:  Option<String>,
  #[serde(default)]
  pub member_count: u64,
  #[serde(default)]
  pub user_role:    Option<Role>,
  #[serde(default)]
  pub members:      Vec<MemberDto>,
  #[serde(default)]
  pub created_at:
    Option<DateTime<Utc>>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct OrganizationCreate {
  pub name:        String,
  #[serde(default)]
  pub description: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct OrganizationPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub name:        Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
  Pending,
  Accepted,
  Declined,
  Expired
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct InvitationDto {
  pub id:                u64,
  #[serde(default)]
  pub organization:      Option<u64>,
  #[serde(default)]
  pub organization_name: String,
  pub email:             String,
  pub role:              Role,
  pub status:            InvitationStatus,
  #[serde(default)]
  pub invited_by_email:  Option<String>,
  #[serde(default)]
  pub created_at:
    Option<DateTime<Utc>>
}

/// Capabilities a role can be granted
/// inside an organization.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
  Eq,
)]
#[serde(default)]
pub struct RolePermissions {
  pub create_project:        bool,
  pub delete_project:        bool,
  pub create_task:           bool,
  pub delete_task:           bool,
  pub assign_task:           bool,
  pub view_all_tasks:        bool,
  pub view_unassigned_tasks: bool,
  pub create_label:          bool,
  pub delete_label:          bool,
  pub manage_timer:          bool,
  pub invite_members:        bool,
  pub remove_members:        bool,
  pub change_member_roles:   bool
}

impl RolePermissions {
  pub const CAPABILITIES: [&'static str;
    13] = [
    "create_project",
    "delete_project",
    "create_task",
    "delete_task",
    "assign_task",
    "view_all_tasks",
    "view_unassigned_tasks",
    "create_label",
    "delete_label",
    "manage_timer",
    "invite_members",
    "remove_members",
    "change_member_roles"
  ];

  pub fn get(
    &self,
    capability: &str
  ) -> Option<bool> {
    let value = match capability {
      | "create_project" => {
        self.create_project
      }
      | "delete_project" => {
        self.delete_project
      }
      | "create_task" => self.create_task,
      | "delete_task" => self.delete_task,
      | "assign_task" => self.assign_task,
      | "view_all_tasks" => {
        self.view_all_tasks
      }
      | "view_unassigned_tasks" => {
        self.view_unassigned_tasks
      }
      | "create_label" => {
        self.create_label
      }
      | "delete_label" => {
        self.delete_label
      }
      | "manage_timer" => {
        self.manage_timer
      }
      | "invite_members" => {
        self.invite_members
      }
      | "remove_members" => {
        self.remove_members
      }
      | "change_member_roles" => {
        self.change_member_roles
      }
      | _ => return None
    };
    Some(value)
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
  Eq,
)]
#[serde(default)]
pub struct OrgPermissions {
  pub owner:     RolePermissions,
  pub admin:     RolePermissions,
  pub moderator: RolePermissions,
  pub member:    RolePermissions
}

impl OrgPermissions {
  pub fn for_role(
    &self,
    role: Role
  ) -> &RolePermissions {
    match role {
      | Role::Owner => &self.owner,
      | Role::Admin => &self.admin,
      | Role::Moderator => {
        &self.moderator
      }
      | Role::Member => &self.member
    }
  }
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct PermissionUpdate {
  pub role:       Role,
  pub permission: String,
  pub value:      bool
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct PermissionUpdateResult {
  pub permissions: OrgPermissions
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct AuditLogEntry {
  pub id:             u64,
  #[serde(default)]
  pub user_email:     Option<String>,
  pub action:         String,
  #[serde(default)]
  pub action_display: Option<String>,
  #[serde(default)]
  pub content_type:   String,
  #[serde(default)]
  pub object_name:    String,
  #[serde(default)]
  pub changes:        serde_json::Value,
  pub timestamp:      DateTime<Utc>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct FocusedTaskDto {
  pub id:           u64,
  pub task:         u64,
  pub task_data:    TaskDto,
  #[serde(default)]
  pub task_title:   String,
  #[serde(default)]
  pub project_name: String,
  #[serde(default)]
  pub project_id:   Option<u64>,
  pub focused_at:   DateTime<Utc>,
  #[serde(default)]
  pub notes:        String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct FocusArgs {
  #[serde(default)]
  pub notes: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct CommentDto {
  pub id:          u64,
  #[serde(default)]
  pub task:        Option<u64>,
  #[serde(default)]
  pub author_name: String,
  pub content:     String,
  pub created_at:  DateTime<Utc>,
  #[serde(default)]
  pub is_edited:   bool
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct CommentCreate {
  pub task:    u64,
  pub content: String
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
pub struct NotificationDto {
  pub id:         u64,
  #[serde(default)]
  pub kind:       String,
  pub message:    String,
  #[serde(default)]
  pub is_read:    bool,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub invitation: Option<u64>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct UserDto {
  pub id:          u64,
  pub email:       String,
  #[serde(default)]
  pub first_name:  String,
  #[serde(default)]
  pub last_name:   String,
  #[serde(default)]
  pub date_joined:
    Option<DateTime<Utc>>,
  #[serde(default)]
  pub last_login:
    Option<DateTime<Utc>>
}

impl UserDto {
  pub fn display_name(&self) -> String {
    let full = format!(
      "{} {}",
      self.first_name, self.last_name
    );
    let full = full.trim();
    if full.is_empty() {
      self.email.clone()
    } else {
      full.to_string()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
)]
pub struct UserPatch {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub first_name: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub last_name:  Option<String>
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
  pub email:    String,
  pub password: String
}

impl fmt::Debug for LoginRequest {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.debug_struct("LoginRequest")
      .field("email", &self.email)
      .field("password", &"<redacted>")
      .finish()
  }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
  pub email:            String,
  pub first_name:       String,
  pub last_name:        String,
  pub password:         String,
  pub password_confirm: String
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TokenPair {
  pub access:  String,
  #[serde(default)]
  pub refresh: Option<String>,
  #[serde(default)]
  pub user:    Option<UserDto>
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
  pub refresh: String
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
  #[serde(default)]
  pub access:  Option<String>,
  #[serde(default)]
  pub refresh: Option<String>
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn listing_accepts_page_and_bare_array()
  {
    let page: Listing<u64> =
      serde_json::from_str(
        r#"{"count":2,"next":null,"previous":null,"results":[1,2]}"#
      )
      .unwrap();
    assert_eq!(
      page.into_items(),
      vec![1, 2]
    );

    let bare: Listing<u64> =
      serde_json::from_str("[3]")
        .unwrap();
    assert_eq!(bare.into_items(), vec![3]);
  }

  #[test]
  fn task_tolerates_missing_optional_fields()
  {
    let task: TaskDto =
      serde_json::from_str(
        r#"{
          "id": 7,
          "title": "Ship",
          "priority": "urgent",
          "status": "in_progress",
          "created_at": "2026-02-16T05:00:00Z"
        }"#
      )
      .unwrap();
    assert_eq!(task.time_spent(), 0);
    assert_eq!(task.section, None);
    assert_eq!(task.description_text(), "");
    assert_eq!(
      task.status,
      TaskStatus::InProgress
    );
  }

  #[test]
  fn patch_distinguishes_clear_from_unset()
  {
    let patch = TaskPatch {
      due_date: Some(None),
      ..TaskPatch::default()
    };
    let json =
      serde_json::to_value(&patch)
        .unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "due_date": null })
    );
    assert!(TaskPatch::default().is_empty());
  }

  #[test]
  fn priority_rank_puts_urgent_first() {
    let mut all = vec![
      Priority::Medium,
      Priority::Urgent,
      Priority::Low,
      Priority::High,
    ];
    all.sort_by_key(|p| p.rank());
    assert_eq!(all, Priority::ALL.to_vec());
    assert_eq!(
      "med".parse::<Priority>(),
      Ok(Priority::Medium)
    );
  }

  #[test]
  fn permissions_lookup_by_name() {
    let perms = RolePermissions {
      invite_members: true,
      ..RolePermissions::default()
    };
    assert_eq!(
      perms.get("invite_members"),
      Some(true)
    );
    assert_eq!(
      perms.get("create_task"),
      Some(false)
    );
    assert_eq!(perms.get("nope"), None);
  }
}
