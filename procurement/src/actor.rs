//! Actor display names.
//!
//! An audit trail must never show an empty actor: a stage without actor is
//! attributed to the system, and a referenced user whose name is unknown or
//! blank is shown as an unknown user.

use crate::labels::Locale;
use crate::types::ActorRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name fields of a user profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Given name
    pub first_name: Option<String>,
    /// Family name
    pub last_name: Option<String>,
}

impl Profile {
    /// Profile with both names set.
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
        }
    }

    /// "first last", trimmed; `None` when nothing is left.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().unwrap_or_default();
        let last = self.last_name.as_deref().unwrap_or_default();
        let name = format!("{first} {last}");
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

/// Resolves actor references to profiles.
pub trait ActorDirectory: Send + Sync {
    /// Profile of `actor`, if known.
    fn profile(&self, actor: &ActorRef) -> Option<Profile>;
}

/// `HashMap`-backed directory.
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    profiles: HashMap<ActorRef, Profile>,
}

impl StaticDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile.
    #[must_use]
    pub fn with_profile(mut self, actor: ActorRef, profile: Profile) -> Self {
        self.insert(actor, profile);
        self
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, actor: ActorRef, profile: Profile) {
        self.profiles.insert(actor, profile);
    }

    /// Number of known profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no profile is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl ActorDirectory for StaticDirectory {
    fn profile(&self, actor: &ActorRef) -> Option<Profile> {
        self.profiles.get(actor).cloned()
    }
}

/// Display name for the actor of a stage.
///
/// - no actor reference: the system label
/// - reference without a non-blank name: the unknown-user label
/// - otherwise first and last name joined and trimmed
#[must_use]
pub fn format_actor_name(
    actor: Option<&ActorRef>,
    directory: &dyn ActorDirectory,
    locale: Locale,
) -> String {
    let Some(actor) = actor else {
        return locale.system_actor().to_string();
    };

    directory
        .profile(actor)
        .and_then(|profile| profile.full_name())
        .unwrap_or_else(|| locale.unknown_actor().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StaticDirectory {
        StaticDirectory::new()
            .with_profile(ActorRef::new("u-1"), Profile::new("  Awa ", "Ndiaye  "))
            .with_profile(ActorRef::new("u-2"), Profile::new("", "   "))
            .with_profile(
                ActorRef::new("u-3"),
                Profile {
                    first_name: None,
                    last_name: Some("Mbarga".into()),
                },
            )
    }

    #[test]
    fn no_actor_is_system() {
        assert_eq!(format_actor_name(None, &directory(), Locale::English), "System");
        assert_eq!(format_actor_name(None, &directory(), Locale::French), "Système");
    }

    #[test]
    fn blank_or_unknown_profile_is_unknown_user() {
        let directory = directory();
        assert_eq!(
            format_actor_name(Some(&ActorRef::new("u-2")), &directory, Locale::English),
            "Unknown user"
        );
        assert_eq!(
            format_actor_name(Some(&ActorRef::new("nobody")), &directory, Locale::French),
            "Utilisateur"
        );
    }

    #[test]
    fn names_are_joined_and_trimmed() {
        let directory = directory();
        assert_eq!(
            format_actor_name(Some(&ActorRef::new("u-1")), &directory, Locale::English),
            "Awa  Ndiaye"
        );
        assert_eq!(
            format_actor_name(Some(&ActorRef::new("u-3")), &directory, Locale::English),
            "Mbarga"
        );
    }
}
