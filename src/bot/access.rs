//! Admin and force-sub checks.

use std::collections::HashSet;
use std::fmt;

use tracing::warn;

use crate::platform::{ChatRef, MessagingPlatform};
use crate::store::{SettingKey, SettingsStore, StoreError};

/// User ids allowed to run admin commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    ids: HashSet<i64>,
}

impl AdminList {
    /// Parses a comma-separated id list; blank and non-numeric entries are skipped.
    #[must_use]
    pub fn from_csv(raw: &str) -> Self {
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(entry = %s, "ignoring non-numeric admin id");
                    None
                }
            })
            .collect();
        Self { ids }
    }

    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.ids.contains(&user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Why a user may not use the bot under force-sub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    NotJoined,
    CannotVerify,
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotJoined => "You must join the required channel to use this bot.",
            Self::CannotVerify => {
                "Cannot verify membership: make sure the bot is admin in the force-sub channel."
            }
        })
    }
}

/// Checks the `force_sub` gate for `user_id`.
///
/// Returns `Ok(None)` when no gate is configured or the user is a member.
///
/// # Errors
///
/// Returns [`StoreError`] when the setting cannot be read.
pub async fn ensure_joined(
    platform: &dyn MessagingPlatform,
    settings: &dyn SettingsStore,
    user_id: i64,
) -> Result<Option<AccessDenied>, StoreError> {
    let Some(raw) = settings.get(SettingKey::ForceSub).await? else {
        return Ok(None);
    };
    let Some(channel) = ChatRef::parse(&raw) else {
        warn!(value = %raw, "force-sub setting is not a chat reference");
        return Ok(Some(AccessDenied::CannotVerify));
    };
    match platform.member_status(&channel, user_id).await {
        Ok(status) if status.is_joined() => Ok(None),
        Ok(_) => Ok(Some(AccessDenied::NotJoined)),
        Err(error) => {
            warn!(channel = %channel, error = %error, "force-sub check failed");
            Ok(Some(AccessDenied::CannotVerify))
        }
    }
}
