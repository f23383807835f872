use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// A user account, keyed by the numeric id of the chat account that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Globally unique key of a hosted bot: `(owner, name)`.
///
/// Immutable once assigned. The name is derived from the uploaded filename
/// via [`sanitize_bot_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BotIdentity {
    pub owner: UserId,
    pub name: String,
}

impl BotIdentity {
    pub fn new(owner: UserId, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    /// File name used for the bot's source and log: `{owner}_{name}`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Who is asking for an operation.
///
/// Authentication happens upstream; the supervisor only trusts the user id it
/// is handed and whether that id is the configured administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Resolve a caller against the configured admin id.
    pub fn resolve(user_id: UserId, admin_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: user_id == admin_id,
        }
    }

    /// Whether this caller may act on the given bot.
    pub fn may_access(&self, identity: &BotIdentity) -> bool {
        self.is_admin || identity.owner == self.user_id
    }
}

/// Turn an uploaded filename into a safe bot name.
///
/// Directory components are dropped, every character outside
/// `[A-Za-z0-9._-]` becomes `_`, and leading dots/underscores are trimmed so
/// the result can never escape the bots directory or hide as a dotfile.
/// Returns `None` when nothing usable is left.
///
/// ```
/// use bothost_types::identity::sanitize_bot_name;
///
/// assert_eq!(sanitize_bot_name("echo bot.py").as_deref(), Some("echo_bot.py"));
/// assert_eq!(sanitize_bot_name("../../etc/passwd").as_deref(), Some("passwd"));
/// assert_eq!(sanitize_bot_name("..."), None);
/// ```
pub fn sanitize_bot_name(filename: &str) -> Option<String> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']);
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return None;
    }

    Some(trimmed.to_string())
}
