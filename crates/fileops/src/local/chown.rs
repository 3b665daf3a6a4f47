//! Ownership validation and chown, in the order Pebble does them.
//!
//! Validation happens before anything touches the filesystem; the lookups
//! that Pebble defers until it actually changes ownership happen in
//! [`ChownPlan::apply`].

use std::path::Path;

use fileops_common::{Ownership, PathError, Result};
use nix::errno::Errno;
use nix::unistd::{chown, Gid, Group, Uid, User};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Principal {
    Name(String),
    Id(u32),
}

/// A validated owner request for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChownPlan {
    user: Option<Principal>,
    group: Option<Principal>,
}

impl ChownPlan {
    /// Check an [`Ownership`] request for `path`.
    ///
    /// `method` is the verb used in error messages (`mkdir`, `push`).
    pub fn validate(path: &Path, owner: &Ownership, method: &str) -> Result<Self> {
        let path = path.display();

        let user = match (&owner.user, owner.user_id) {
            (Some(name), Some(id)) => {
                let found = lookup_user(name)
                    .ok_or_else(|| PathError::lookup(&path, method, format!("unknown user {:?}", name)))?;
                if found != id {
                    return Err(PathError::generic(
                        &path,
                        method,
                        format!(
                            "If both user_id and user name are provided, they must match -- \"{}\" has id {} but {} was provided.",
                            name, found, id
                        ),
                    )
                    .into());
                }
                Some(Principal::Name(name.clone()))
            }
            (Some(name), None) => Some(Principal::Name(name.clone())),
            (None, Some(id)) => Some(Principal::Id(id)),
            (None, None) => None,
        };

        let group = match (&owner.group, owner.group_id) {
            (Some(name), Some(id)) => {
                let found = lookup_group(name)
                    .ok_or_else(|| PathError::lookup(&path, method, format!("unknown group {:?}", name)))?;
                if found != id {
                    return Err(PathError::generic(
                        &path,
                        method,
                        format!(
                            "If both group_id and group name are provided, they must match -- \"{}\" has id {} but {} was provided.",
                            name, found, id
                        ),
                    )
                    .into());
                }
                Some(Principal::Name(name.clone()))
            }
            (Some(name), None) => Some(Principal::Name(name.clone())),
            (None, Some(id)) => Some(Principal::Id(id)),
            (None, None) => None,
        };

        if user.is_none() && group.is_some() {
            return Err(PathError::generic(
                &path,
                method,
                "cannot look up user and group: must specify user, not just group",
            )
            .into());
        }
        if matches!(user, Some(Principal::Id(_))) && group.is_none() {
            return Err(PathError::generic(
                &path,
                method,
                "cannot look up user and group: must specify group, not just UID",
            )
            .into());
        }

        Ok(Self { user, group })
    }

    pub fn is_noop(&self) -> bool {
        self.user.is_none() && self.group.is_none()
    }

    /// Resolve the owner and chown `path`.
    pub fn apply(&self, path: &Path, method: &str) -> Result<()> {
        if self.is_noop() {
            return Ok(());
        }
        let shown = path.display();

        let uid = match &self.user {
            Some(Principal::Name(name)) => Some(
                lookup_user(name)
                    .ok_or_else(|| PathError::lookup(&shown, method, format!("unknown user {:?}", name)))?,
            ),
            Some(Principal::Id(id)) => {
                if User::from_uid(Uid::from_raw(*id)).ok().flatten().is_none() {
                    return Err(PathError::permission(&shown, method, format!("unknown uid {}", id)).into());
                }
                Some(*id)
            }
            None => None,
        };

        let gid = match &self.group {
            Some(Principal::Name(name)) => Some(
                lookup_group(name)
                    .ok_or_else(|| PathError::lookup(&shown, method, format!("unknown group {:?}", name)))?,
            ),
            Some(Principal::Id(id)) => {
                if Group::from_gid(Gid::from_raw(*id)).ok().flatten().is_none() {
                    return Err(PathError::permission(&shown, method, format!("unknown gid {}", id)).into());
                }
                Some(*id)
            }
            None => None,
        };

        chown(path, uid.map(Uid::from_raw), gid.map(Gid::from_raw)).map_err(|errno| match errno {
            Errno::EPERM | Errno::EACCES => {
                PathError::permission(&shown, method, errno.desc().to_lowercase())
            }
            other => PathError::generic(&shown, method, other.desc().to_lowercase()),
        })?;
        Ok(())
    }
}

fn lookup_user(name: &str) -> Option<u32> {
    User::from_name(name).ok().flatten().map(|u| u.uid.as_raw())
}

fn lookup_group(name: &str) -> Option<u32> {
    Group::from_name(name).ok().flatten().map(|g| g.gid.as_raw())
}
