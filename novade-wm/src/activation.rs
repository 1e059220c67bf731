//! Activation tokens.
//!
//! A token is issued when a helper process is spawned. It remembers the output and
//! tags active at spawn time so the window that eventually appears can be placed
//! where the user launched it. Tokens expire after a timeout and then match nothing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::output::OutputId;
use crate::tags::Tags;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationToken {
    pub token: String,
    pub pid: Option<u32>,
    pub output: Option<OutputId>,
    pub tags: Tags,
    pub expires_at: Instant,
}

impl ActivationToken {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct ActivationTokens {
    tokens: HashMap<String, ActivationToken>,
    timeout: Duration,
    /// Tokens issued since the event loop last armed expiry timers.
    unscheduled: Vec<String>,
}

impl ActivationTokens {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tokens: HashMap::new(),
            timeout,
            unscheduled: Vec::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issues a fresh random token.
    pub fn issue(&mut self, output: Option<OutputId>, tags: Tags, now: Instant) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(
            token.clone(),
            ActivationToken {
                token: token.clone(),
                pid: None,
                output,
                tags,
                expires_at: now + self.timeout,
            },
        );
        self.unscheduled.push(token.clone());
        trace!(%token, "activation token issued");
        token
    }

    /// Associates the spawned process with its token so pid-only clients still match.
    pub fn bind_pid(&mut self, token: &str, pid: u32) {
        if let Some(entry) = self.tokens.get_mut(token) {
            entry.pid = Some(pid);
        }
    }

    /// Removes and returns the live token matching the surface's token string, or else
    /// its pid. Expired tokens never match.
    pub fn take_match(&mut self, token: Option<&str>, pid: Option<u32>, now: Instant) -> Option<ActivationToken> {
        let key = token
            .filter(|t| self.tokens.contains_key(*t))
            .map(str::to_string)
            .or_else(|| {
                let pid = pid?;
                self.tokens
                    .values()
                    .find(|t| t.pid == Some(pid))
                    .map(|t| t.token.clone())
            })?;
        let entry = self.tokens.remove(&key)?;
        if entry.is_expired(now) {
            debug!(token = %key, "activation token expired before use");
            return None;
        }
        debug!(token = %key, "activation token matched");
        Some(entry)
    }

    /// Drops a token when its timer fires. Returns whether it was still pending.
    pub fn expire(&mut self, token: &str) -> bool {
        let removed = self.tokens.remove(token).is_some();
        if removed {
            debug!(%token, "activation token expired");
        }
        removed
    }

    /// Drops every token past its deadline.
    pub fn expire_due(&mut self, now: Instant) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|_, t| !t.is_expired(now));
        before - self.tokens.len()
    }

    /// Tokens that still need an expiry timer.
    pub fn take_unscheduled(&mut self) -> Vec<String> {
        std::mem::take(&mut self.unscheduled)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.unscheduled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches_once() {
        let mut tokens = ActivationTokens::new(Duration::from_secs(20));
        let now = Instant::now();
        let token = tokens.issue(None, Tags::single(3).unwrap(), now);

        let hit = tokens.take_match(Some(&token), None, now).expect("token should match");
        assert_eq!(hit.tags, Tags::single(3).unwrap());
        assert!(tokens.take_match(Some(&token), None, now).is_none(), "tokens are consumed on match");
    }

    #[test]
    fn test_pid_fallback_match() {
        let mut tokens = ActivationTokens::new(Duration::from_secs(20));
        let now = Instant::now();
        let token = tokens.issue(None, Tags::EMPTY, now);
        tokens.bind_pid(&token, 4242);
        assert!(tokens.take_match(None, Some(4242), now).is_some());
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_expired_token_is_inert() {
        let mut tokens = ActivationTokens::new(Duration::from_secs(20));
        let now = Instant::now();
        let token = tokens.issue(None, Tags::EMPTY, now);
        let later = now + Duration::from_secs(21);
        assert!(tokens.take_match(Some(&token), None, later).is_none());

        tokens.issue(None, Tags::EMPTY, now);
        assert_eq!(tokens.expire_due(later), 1);
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_unscheduled_tokens_are_drained() {
        let mut tokens = ActivationTokens::new(Duration::from_secs(1));
        let token = tokens.issue(None, Tags::EMPTY, Instant::now());
        assert_eq!(tokens.take_unscheduled(), vec![token.clone()]);
        assert!(tokens.take_unscheduled().is_empty());
        assert!(tokens.expire(&token));
        assert!(!tokens.expire(&token));
    }
}
