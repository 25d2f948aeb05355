use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::anyhow;
use navflow_shared::{
  MemberDto,
  OrgPermissions,
  OrganizationDto,
  PermissionUpdate,
  Role,
  RolePermissions
};
use tracing::debug;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum RoleFilter {
  #[default]
  All,
  Only(Role)
}

impl FromStr for RoleFilter {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all") {
      return Ok(RoleFilter::All);
    }
    s.parse::<Role>()
      .map(RoleFilter::Only)
      .map_err(|e| anyhow!(e))
  }
}

/// Case-insensitive match on name or
/// description.
pub fn filter_orgs<'a>(
  orgs: &'a [OrganizationDto],
  search: &str
) -> Vec<&'a OrganizationDto> {
  let needle = search.trim().to_lowercase();
  orgs
    .iter()
    .filter(|org| {
      needle.is_empty()
        || org
          .name
          .to_lowercase()
          .contains(&needle)
        || org
          .description
          .as_deref()
          .unwrap_or_default()
          .to_lowercase()
          .contains(&needle)
    })
    .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberQuery {
  pub search: String,
  pub role:   RoleFilter
}

impl MemberQuery {
  pub fn matches(
    &self,
    member: &MemberDto
  ) -> bool {
    let needle =
      self.search.trim().to_lowercase();
    let text = needle.is_empty()
      || member
        .user_name
        .to_lowercase()
        .contains(&needle)
      || member
        .user_email
        .to_lowercase()
        .contains(&needle);
    let role = match self.role {
      | RoleFilter::All => true,
      | RoleFilter::Only(r) => {
        member.role == r
      }
    };
    text && role
  }

  pub fn apply<'a>(
    &self,
    members: &'a [MemberDto]
  ) -> Vec<&'a MemberDto> {
    let out: Vec<&MemberDto> = members
      .iter()
      .filter(|m| self.matches(m))
      .collect();
    debug!(
      total = members.len(),
      visible = out.len(),
      role = ?self.role,
      "filtered members"
    );
    out
  }
}

/// Members per role; every role is
/// present, zero when unused.
pub fn role_counts(
  members: &[MemberDto]
) -> BTreeMap<Role, usize> {
  let mut counts: BTreeMap<Role, usize> =
    Role::ALL
      .iter()
      .map(|role| (*role, 0))
      .collect();
  for member in members {
    *counts.entry(member.role).or_insert(0) +=
      1;
  }
  counts
}

/// Builds the update that flips one
/// capability for one role.
pub fn permission_toggle(
  permissions: &OrgPermissions,
  role: Role,
  capability: &str
) -> anyhow::Result<PermissionUpdate> {
  let current = permissions
    .for_role(role)
    .get(capability)
    .ok_or_else(|| {
      anyhow!(
        "unknown capability '{capability}'; \
         expected one of: {}",
        RolePermissions::CAPABILITIES
          .join(", ")
      )
    })?;

  Ok(PermissionUpdate {
    role,
    permission: capability.to_string(),
    value: !current
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn member(
    name: &str,
    email: &str,
    role: Role
  ) -> MemberDto {
    MemberDto {
      id:           None,
      user_email:   email.to_string(),
      user_name:    name.to_string(),
      role,
      role_display: None,
      joined_at:    None
    }
  }

  #[test]
  fn member_search_and_role_are_anded() {
    let members = vec![
      member(
        "Ada Lovelace",
        "ada@example.test",
        Role::Admin
      ),
      member(
        "Alan Turing",
        "alan@example.test",
        Role::Member
      ),
      member(
        "Grace Hopper",
        "grace@example.test",
        Role::Admin
      ),
    ];

    let query = MemberQuery {
      search: "A".to_string(),
      role:   RoleFilter::Only(Role::Admin)
    };
    let names: Vec<&str> = query
      .apply(&members)
      .into_iter()
      .map(|m| m.user_name.as_str())
      .collect();
    assert_eq!(
      names,
      vec!["Ada Lovelace", "Grace Hopper"]
    );

    let by_email = MemberQuery {
      search: "ALAN@".to_string(),
      ..MemberQuery::default()
    };
    assert_eq!(by_email.apply(&members).len(), 1);

    let counts = role_counts(&members);
    assert_eq!(counts[&Role::Admin], 2);
    assert_eq!(counts[&Role::Owner], 0);
  }

  #[test]
  fn toggle_flips_current_value() {
    let mut permissions =
      OrgPermissions::default();
    permissions.member.create_task = true;

    let update = permission_toggle(
      &permissions,
      Role::Member,
      "create_task"
    )
    .unwrap();
    assert!(!update.value);
    assert_eq!(update.role, Role::Member);

    assert!(
      permission_toggle(
        &permissions,
        Role::Member,
        "fly"
      )
      .is_err()
    );
  }

  #[test]
  fn parses_role_filter() {
    assert_eq!(
      "all".parse::<RoleFilter>().unwrap(),
      RoleFilter::All
    );
    assert_eq!(
      "mod".parse::<RoleFilter>().unwrap(),
      RoleFilter::Only(Role::Moderator)
    );
  }
}
