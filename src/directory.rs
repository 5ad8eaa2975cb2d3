//! Participant directory: admin checks and display names

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::ModerationConfig;
use crate::protocol::{ChatId, ParticipantId};

#[async_trait]
pub trait Directory: Send + Sync {
    /// Name used for a participant in announcements
    async fn display_name(&self, room: ChatId, participant: ParticipantId) -> String;

    fn is_admin(&self, participant: ParticipantId) -> bool;

    /// Everyone who receives moderation notices
    fn admins(&self) -> Vec<ParticipantId>;

    /// Remember the platform full name seen on an inbound action
    fn observe(&self, participant: ParticipantId, full_name: &str);
}

/// Directory backed by the moderation configuration
pub struct StaticDirectory {
    admins: Vec<ParticipantId>,
    nicknames: BTreeMap<ParticipantId, String>,
    member_label: String,
    full_names: DashMap<ParticipantId, String>,
}

impl StaticDirectory {
    pub fn new(moderation: &ModerationConfig) -> Self {
        Self {
            admins: moderation.admin_ids(),
            nicknames: moderation.nickname_map(),
            member_label: moderation.member_label.clone(),
            full_names: DashMap::new(),
        }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn display_name(&self, _room: ChatId, participant: ParticipantId) -> String {
        if !self.is_admin(participant) {
            return self.member_label.clone();
        }
        if let Some(nickname) = self.nicknames.get(&participant) {
            return nickname.clone();
        }
        self.full_names
            .get(&participant)
            .map(|name| name.clone())
            .unwrap_or_else(|| format!("User {}", participant))
    }

    fn is_admin(&self, participant: ParticipantId) -> bool {
        self.admins.contains(&participant)
    }

    fn admins(&self) -> Vec<ParticipantId> {
        self.admins.clone()
    }

    fn observe(&self, participant: ParticipantId, full_name: &str) {
        let full_name = full_name.trim();
        if !full_name.is_empty() {
            self.full_names.insert(participant, full_name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Nickname;

    #[tokio::test]
    async fn test_display_names() {
        let moderation = ModerationConfig {
            owner: Some(1),
            admins: vec![2, 3],
            nicknames: vec![Nickname { id: 2, name: "Skipper".to_string() }],
            member_label: "Guest".to_string(),
            ..ModerationConfig::default()
        };
        let directory = StaticDirectory::new(&moderation);
        let room = ChatId(-10);

        directory.observe(ParticipantId(3), "Dana Scully");
        directory.observe(ParticipantId(9), "Someone Else");

        assert_eq!(directory.display_name(room, ParticipantId(2)).await, "Skipper");
        assert_eq!(directory.display_name(room, ParticipantId(3)).await, "Dana Scully");
        assert_eq!(directory.display_name(room, ParticipantId(1)).await, "User 1");
        assert_eq!(directory.display_name(room, ParticipantId(9)).await, "Guest");
        assert!(directory.is_admin(ParticipantId(1)));
        assert!(!directory.is_admin(ParticipantId(9)));
        assert_eq!(directory.admins().len(), 3);
    }
}
