//! Pure session state machine.
//!
//! Every transition goes through [`SessionState::reduce`]. Events that answer
//! a user load carry the generation the load was started under; once any other
//! transition has bumped the generation those answers are ignored, so a slow
//! `me` response can never resurrect a session the user already left.

use serde::Serialize;

use crate::auth::dto::PublicUser;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
    ServerUnreachable,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub user: Option<PublicUser>,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// First event of a session, with whatever token was persisted.
    Started { token: Option<String> },
    /// A user load is about to be issued with the held token.
    LoadStarted,
    UserLoaded { generation: u64, user: PublicUser },
    /// The server refused the held token or its user no longer exists.
    LoadRejected { generation: u64 },
    /// The server could not be reached while loading. The token is kept.
    LoadUnreachable { generation: u64 },
    LoggedIn { token: String, user: PublicUser },
    CredentialsRejected,
    LoggedOut,
    /// A guarded call was refused mid-session.
    SessionExpired,
    UserUpdated { user: PublicUser },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Loading
    }

    pub fn reduce(self, event: SessionEvent) -> Self {
        use SessionEvent::*;

        match event {
            Started { token } if self.status == SessionStatus::Uninitialized => match token {
                Some(token) => Self {
                    status: SessionStatus::Loading,
                    token: Some(token),
                    user: None,
                    generation: self.generation + 1,
                },
                None => self.signed_out(),
            },
            Started { .. } => self,

            LoadStarted if self.token.is_some() => Self {
                status: SessionStatus::Loading,
                generation: self.generation + 1,
                ..self
            },
            LoadStarted => self,

            UserLoaded { generation, user } if self.answers(generation) => Self {
                status: SessionStatus::Authenticated,
                user: Some(user),
                ..self
            },
            LoadRejected { generation } if self.answers(generation) => self.signed_out(),
            LoadUnreachable { generation } if self.answers(generation) => Self {
                status: SessionStatus::ServerUnreachable,
                user: None,
                ..self
            },
            UserLoaded { .. } | LoadRejected { .. } | LoadUnreachable { .. } => self,

            LoggedIn { token, user } => Self {
                status: SessionStatus::Authenticated,
                token: Some(token),
                user: Some(user),
                generation: self.generation + 1,
            },

            CredentialsRejected | LoggedOut | SessionExpired => self.signed_out(),

            UserUpdated { user } if self.is_authenticated() => Self {
                user: Some(user),
                ..self
            },
            UserUpdated { .. } => self,
        }
    }

    fn answers(&self, generation: u64) -> bool {
        self.status == SessionStatus::Loading && self.generation == generation
    }

    fn signed_out(self) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            token: None,
            user: None,
            generation: self.generation + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user(name: &str) -> PublicUser {
        let now = OffsetDateTime::now_utc();
        PublicUser {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            fees_paid: false,
            payment_details: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn loading(token: &str) -> SessionState {
        SessionState::default().reduce(SessionEvent::Started {
            token: Some(token.into()),
        })
    }

    #[test]
    fn start_without_token_is_unauthenticated() {
        let s = SessionState::default().reduce(SessionEvent::Started { token: None });
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.token.is_none());
    }

    #[test]
    fn start_with_token_loads_then_authenticates() {
        let s = loading("tok");
        assert!(s.is_loading());
        let generation = s.generation;

        let ada = user("Ada");
        let s = s.reduce(SessionEvent::UserLoaded {
            generation,
            user: ada.clone(),
        });
        assert!(s.is_authenticated());
        assert_eq!(s.user, Some(ada));
        assert_eq!(s.token.as_deref(), Some("tok"));
    }

    #[test]
    fn second_start_is_ignored() {
        let s = loading("tok");
        let again = s.clone().reduce(SessionEvent::Started { token: None });
        assert_eq!(again, s);
    }

    #[test]
    fn rejected_load_clears_token() {
        let s = loading("tok");
        let generation = s.generation;
        let s = s.reduce(SessionEvent::LoadRejected { generation });
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.token.is_none());
        assert!(s.user.is_none());
    }

    #[test]
    fn unreachable_load_keeps_token() {
        let s = loading("tok");
        let generation = s.generation;
        let s = s.reduce(SessionEvent::LoadUnreachable { generation });
        assert_eq!(s.status, SessionStatus::ServerUnreachable);
        assert!(!s.is_authenticated());
        assert_eq!(s.token.as_deref(), Some("tok"));

        // Retry is allowed from here.
        let s = s.reduce(SessionEvent::LoadStarted);
        assert!(s.is_loading());
    }

    #[test]
    fn stale_load_after_logout_is_ignored() {
        let s = loading("tok");
        let generation = s.generation;
        let s = s.reduce(SessionEvent::LoggedOut);

        let s = s.reduce(SessionEvent::UserLoaded {
            generation,
            user: user("Ada"),
        });
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.user.is_none());
        assert!(s.token.is_none());
    }

    #[test]
    fn stale_load_after_login_does_not_override_new_user() {
        let s = loading("old");
        let stale = s.generation;
        let bob = user("Bob");
        let s = s.reduce(SessionEvent::LoggedIn {
            token: "new".into(),
            user: bob.clone(),
        });

        let s = s.reduce(SessionEvent::LoadRejected { generation: stale });
        assert!(s.is_authenticated());
        assert_eq!(s.user, Some(bob));
        assert_eq!(s.token.as_deref(), Some("new"));
    }

    #[test]
    fn load_started_without_token_is_noop() {
        let s = SessionState::default().reduce(SessionEvent::Started { token: None });
        let after = s.clone().reduce(SessionEvent::LoadStarted);
        assert_eq!(after, s);
    }

    #[test]
    fn login_overwrites_token_and_logout_clears() {
        let s = SessionState::default().reduce(SessionEvent::LoggedIn {
            token: "a".into(),
            user: user("Ada"),
        });
        let s = s.reduce(SessionEvent::LoggedIn {
            token: "b".into(),
            user: user("Ada"),
        });
        assert_eq!(s.token.as_deref(), Some("b"));

        let s = s.reduce(SessionEvent::LoggedOut);
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.token.is_none());
    }

    #[test]
    fn credentials_rejected_clears_session() {
        let s = SessionState::default()
            .reduce(SessionEvent::Started { token: None })
            .reduce(SessionEvent::CredentialsRejected);
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.token.is_none());
    }

    #[test]
    fn user_update_only_applies_when_authenticated() {
        let s = SessionState::default().reduce(SessionEvent::Started { token: None });
        let s = s.reduce(SessionEvent::UserUpdated { user: user("Ada") });
        assert!(s.user.is_none());

        let s = s.reduce(SessionEvent::LoggedIn {
            token: "t".into(),
            user: user("Ada"),
        });
        let mut paid = user("Ada");
        paid.fees_paid = true;
        let s = s.reduce(SessionEvent::UserUpdated { user: paid.clone() });
        assert_eq!(s.user, Some(paid));
    }

    #[test]
    fn session_expired_signs_out() {
        let s = SessionState::default()
            .reduce(SessionEvent::LoggedIn {
                token: "t".into(),
                user: user("Ada"),
            })
            .reduce(SessionEvent::SessionExpired);
        assert_eq!(s.status, SessionStatus::Unauthenticated);
        assert!(s.token.is_none());
    }
}
