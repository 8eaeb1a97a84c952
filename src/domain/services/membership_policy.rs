//! Chat membership rules.

use crate::domain::entities::Chat;
use crate::shared::error::AppError;

/// Domain service deciding who may change a chat's membership and metadata.
pub struct MembershipPolicy;

impl MembershipPolicy {
    /// The caller must participate in the chat.
    pub fn ensure_participant(chat: &Chat, user_id: i64) -> Result<(), AppError> {
        if chat.is_participant(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not a participant in this chat".into(),
            ))
        }
    }

    /// New traffic is refused once a chat is deactivated.
    pub fn ensure_active(chat: &Chat) -> Result<(), AppError> {
        if chat.is_active {
            Ok(())
        } else {
            Err(AppError::Forbidden("This chat is no longer active".into()))
        }
    }

    /// Membership and metadata operations only apply to groups.
    pub fn ensure_group(chat: &Chat) -> Result<(), AppError> {
        if chat.is_group() {
            Ok(())
        } else {
            Err(AppError::InvalidArgument(
                "Operation only allowed on group chats".into(),
            ))
        }
    }

    /// The caller must hold the admin role in the chat.
    pub fn ensure_admin(chat: &Chat, user_id: i64) -> Result<(), AppError> {
        if chat.is_admin(user_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only group admins can perform this action".into(),
            ))
        }
    }

    /// Admins may remove anyone; anyone may remove themselves.
    pub fn ensure_can_remove(chat: &Chat, acting: i64, target: i64) -> Result<(), AppError> {
        if acting == target || chat.is_admin(acting) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only group admins can remove other participants".into(),
            ))
        }
    }

    /// Groups need an admin to deactivate; either side may close an individual chat.
    pub fn ensure_can_deactivate(chat: &Chat, acting: i64) -> Result<(), AppError> {
        if chat.is_group() {
            Self::ensure_admin(chat, acting)
        } else {
            Self::ensure_participant(chat, acting)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ChatType, Participant, ParticipantRole};
    use chrono::Utc;

    fn group() -> Chat {
        let now = Utc::now();
        let mut chat = Chat::individual(1, 10, 20, now);
        chat.chat_type = ChatType::Group;
        chat.name = Some("Team".into());
        chat.participants = vec![
            Participant::new(10, ParticipantRole::Admin, now),
            Participant::new(20, ParticipantRole::Member, now),
            Participant::new(30, ParticipantRole::Member, now),
        ];
        chat
    }

    #[test]
    fn test_admin_can_remove_anyone() {
        assert!(MembershipPolicy::ensure_can_remove(&group(), 10, 20).is_ok());
    }

    #[test]
    fn test_member_can_only_remove_self() {
        let chat = group();
        assert!(MembershipPolicy::ensure_can_remove(&chat, 20, 20).is_ok());
        assert!(matches!(
            MembershipPolicy::ensure_can_remove(&chat, 20, 30),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_group_only_operations() {
        let chat = Chat::individual(1, 10, 20, Utc::now());
        assert!(matches!(
            MembershipPolicy::ensure_group(&chat),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(MembershipPolicy::ensure_can_deactivate(&chat, 20).is_ok());
        assert!(MembershipPolicy::ensure_can_deactivate(&chat, 99).is_err());
    }

    #[test]
    fn test_inactive_chat_refuses_traffic() {
        let mut chat = group();
        assert!(MembershipPolicy::ensure_active(&chat).is_ok());
        chat.is_active = false;
        assert!(matches!(
            MembershipPolicy::ensure_active(&chat),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_deactivate_group_requires_admin() {
        let chat = group();
        assert!(MembershipPolicy::ensure_can_deactivate(&chat, 10).is_ok());
        assert!(MembershipPolicy::ensure_can_deactivate(&chat, 20).is_err());
    }
}
