//! Destination authorization policy.
//!
//! An ordered rule table matched after identity resolution and before
//! dispatch. Rules are evaluated in declared order, first match wins, and a
//! frame whose destination matches no rule is denied: the policy is closed.

use crate::error::{FrameError, FrameResult};
use palaver_auth::AuthenticatedUser;
use palaver_commons::Role;

/// Direction of a destination-bearing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDirection {
    /// SEND to a destination
    Send,
    /// SUBSCRIBE to a destination
    Subscribe,
}

/// Predicate a matching rule requires of the frame's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Any authenticated identity suffices.
    Authenticated,
    /// The identity must hold the given role.
    Role(Role),
}

/// Ant-style destination pattern: `*` matches one path segment, `**` matches
/// any number of segments (including none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    AnyOne,
    AnyTail,
}

impl DestinationPattern {
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .map(|s| match s {
                "*" => Segment::AnyOne,
                "**" => Segment::AnyTail,
                lit => Segment::Literal(lit.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn matches(&self, destination: &str) -> bool {
        let parts: Vec<&str> = destination.split('/').collect();
        Self::match_from(&self.segments, &parts)
    }

    fn match_from(pattern: &[Segment], parts: &[&str]) -> bool {
        match pattern.split_first() {
            None => parts.is_empty(),
            Some((Segment::AnyTail, rest)) => {
                // Greedy is unnecessary; try every split point.
                (0..=parts.len()).any(|skip| Self::match_from(rest, &parts[skip..]))
            }
            Some((head, rest)) => match parts.split_first() {
                None => false,
                Some((part, tail)) => {
                    let head_matches = match head {
                        Segment::Literal(lit) => lit == part,
                        Segment::AnyOne => true,
                        Segment::AnyTail => unreachable!(),
                    };
                    head_matches && Self::match_from(rest, tail)
                }
            },
        }
    }
}

struct Rule {
    pattern: DestinationPattern,
    direction: FrameDirection,
    access: Access,
}

/// Ordered, closed destination rule table.
pub struct DestinationPolicy {
    rules: Vec<Rule>,
}

impl DestinationPolicy {
    pub fn builder() -> DestinationPolicyBuilder {
        DestinationPolicyBuilder { rules: Vec::new() }
    }

    /// Authorize a frame against the table.
    ///
    /// `user` is the identity resolved for the frame, if any. A denial is
    /// [`FrameError::AccessDenied`] when an identity was present (known but
    /// insufficient) and [`FrameError::NotAuthenticated`] when the matching
    /// rule demanded an identity that is absent.
    pub fn authorize(
        &self,
        direction: FrameDirection,
        destination: &str,
        user: Option<&AuthenticatedUser>,
    ) -> FrameResult<()> {
        for rule in &self.rules {
            if rule.direction != direction || !rule.pattern.matches(destination) {
                continue;
            }
            return match (&rule.access, user) {
                (Access::Authenticated, Some(_)) => Ok(()),
                (Access::Role(required), Some(identity)) if identity.role == *required => Ok(()),
                (_, Some(_)) => Err(FrameError::AccessDenied {
                    destination: destination.to_string(),
                }),
                (_, None) => Err(FrameError::NotAuthenticated),
            };
        }

        // Closed policy: unmatched destinations are denied regardless of
        // identity.
        Err(FrameError::AccessDenied {
            destination: destination.to_string(),
        })
    }
}

/// Builder collecting rules in declaration order.
pub struct DestinationPolicyBuilder {
    rules: Vec<Rule>,
}

impl DestinationPolicyBuilder {
    /// Add a rule for SEND frames.
    pub fn send(mut self, pattern: &str, access: Access) -> Self {
        self.rules.push(Rule {
            pattern: DestinationPattern::new(pattern),
            direction: FrameDirection::Send,
            access,
        });
        self
    }

    /// Add a rule for SUBSCRIBE frames.
    pub fn subscribe(mut self, pattern: &str, access: Access) -> Self {
        self.rules.push(Rule {
            pattern: DestinationPattern::new(pattern),
            direction: FrameDirection::Subscribe,
            access,
        });
        self
    }

    pub fn build(self) -> DestinationPolicy {
        DestinationPolicy { rules: self.rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_commons::{UserId, UserName};

    fn alice() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("u_alice"), UserName::new("alice"), Role::User)
    }

    fn admin() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new("u_root"), UserName::new("root"), Role::Admin)
    }

    fn chat_policy() -> DestinationPolicy {
        DestinationPolicy::builder()
            .send("/app/**", Access::Authenticated)
            .subscribe("/topic/**", Access::Authenticated)
            .subscribe("/user/queue/**", Access::Authenticated)
            .build()
    }

    #[test]
    fn pattern_matching() {
        let p = DestinationPattern::new("/app/**");
        assert!(p.matches("/app/chat.send"));
        assert!(p.matches("/app/a/b/c"));
        assert!(p.matches("/app"));
        assert!(!p.matches("/topic/chat"));

        let p = DestinationPattern::new("/topic/*");
        assert!(p.matches("/topic/rooms"));
        assert!(!p.matches("/topic/rooms/1"));
        assert!(!p.matches("/topic"));

        let p = DestinationPattern::new("/user/queue/messages");
        assert!(p.matches("/user/queue/messages"));
        assert!(!p.matches("/user/queue/other"));
    }

    #[test]
    fn authenticated_send_to_app_allowed() {
        let policy = chat_policy();
        let user = alice();
        assert!(policy
            .authorize(FrameDirection::Send, "/app/chat.send", Some(&user))
            .is_ok());
    }

    #[test]
    fn unauthenticated_frames_rejected_as_not_authenticated() {
        let policy = chat_policy();
        let result = policy.authorize(FrameDirection::Subscribe, "/topic/rooms", None);
        assert!(matches!(result, Err(FrameError::NotAuthenticated)));
    }

    /// Unmatched destinations are denied even with a valid identity.
    #[test]
    fn deny_all_fallback_is_closed() {
        let policy = chat_policy();
        let user = alice();

        let result = policy.authorize(FrameDirection::Send, "/queue/direct", Some(&user));
        assert!(matches!(result, Err(FrameError::AccessDenied { .. })));

        // Directions are part of the match: SEND rules do not leak into
        // SUBSCRIBE authorization.
        let result = policy.authorize(FrameDirection::Subscribe, "/app/chat.send", Some(&user));
        assert!(matches!(result, Err(FrameError::AccessDenied { .. })));
    }

    #[test]
    fn first_match_wins_in_declared_order() {
        let policy = DestinationPolicy::builder()
            .send("/app/admin/**", Access::Role(Role::Admin))
            .send("/app/**", Access::Authenticated)
            .build();

        let user = alice();
        let result = policy.authorize(FrameDirection::Send, "/app/admin/purge", Some(&user));
        assert!(matches!(result, Err(FrameError::AccessDenied { .. })));

        assert!(policy
            .authorize(FrameDirection::Send, "/app/admin/purge", Some(&admin()))
            .is_ok());
        assert!(policy
            .authorize(FrameDirection::Send, "/app/chat.send", Some(&user))
            .is_ok());
    }
}
