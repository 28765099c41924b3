//! # Ownership Challenges
//!
//! The message a wallet signs to prove control of an address:
//!
//! ```text
//! CodeSync - Verify ownership of wallet: 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf
//! Timestamp: 1700000000000
//! ```
//!
//! Human-readable on purpose: the wallet shows it verbatim, and users should
//! be able to tell what they are agreeing to.
//!
//! ## Replay
//!
//! The millisecond timestamp is the only freshness signal. By default any
//! message is accepted, so a captured `(message, signature)` pair stays valid
//! forever. [`ChallengePolicy::enforced`] closes most of that window by
//! requiring a well-formed, recent challenge that names the signer. It does
//! not make challenges single-use.

use chrono::Utc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{APP_NAME, CHALLENGE_INFIX, CHALLENGE_TIMESTAMP_LABEL, DEFAULT_MAX_FUTURE_SKEW};
use crate::identity::{Address, AddressError};

/// Errors from parsing or checking a challenge message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChallengeError {
    /// The message is not in challenge format at all.
    #[error("malformed challenge: {0}")]
    Malformed(&'static str),

    /// The wallet line does not hold a valid address.
    #[error("malformed challenge address: {0}")]
    BadAddress(#[from] AddressError),

    /// Challenge was issued for a different application.
    #[error("challenge issued for '{got}', expected '{expected}'")]
    WrongApp { expected: String, got: String },

    /// The challenge names a wallet other than the one that signed it.
    #[error("challenge names {named} but was signed by {signer}")]
    IdentityMismatch { named: Address, signer: Address },

    /// Older than the policy allows.
    #[error("challenge is {age_ms}ms old (max {max_ms}ms)")]
    Stale { age_ms: u64, max_ms: u64 },

    /// Stamped further in the future than clock skew explains.
    #[error("challenge is {ahead_ms}ms in the future (max {max_ms}ms)")]
    FromFuture { ahead_ms: u64, max_ms: u64 },
}

/// A parsed challenge message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub app_name: String,
    pub identity: Address,
    pub timestamp_ms: u64,
}

/// Builds and parses challenge messages for one application name.
#[derive(Debug, Clone)]
pub struct ChallengeBuilder {
    app_name: String,
}

impl Default for ChallengeBuilder {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl ChallengeBuilder {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Build a challenge stamped with the current time.
    pub fn build(&self, identity: &Address) -> String {
        self.build_at(identity, now_ms())
    }

    /// Build a challenge with an explicit timestamp.
    pub fn build_at(&self, identity: &Address, timestamp_ms: u64) -> String {
        format!(
            "{}{}{}\n{}{}",
            self.app_name, CHALLENGE_INFIX, identity, CHALLENGE_TIMESTAMP_LABEL, timestamp_ms
        )
    }
}

/// Build a challenge for the default app name, stamped now.
///
/// ```
/// use codesync_core::challenge::build_challenge;
/// use codesync_core::identity::Address;
///
/// let who: Address = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
/// let msg = build_challenge(&who);
/// assert!(msg.starts_with("CodeSync - Verify ownership of wallet: 0x7e5f"));
/// ```
pub fn build_challenge(identity: &Address) -> String {
    ChallengeBuilder::default().build(identity)
}

/// Parse a challenge message back into its parts.
///
/// The wallet line may carry the address in any letter case; the UI has
/// historically embedded the checksummed form.
pub fn parse_challenge(message: &str) -> Result<Challenge, ChallengeError> {
    let (wallet_line, ts_line) = message
        .split_once('\n')
        .ok_or(ChallengeError::Malformed("missing timestamp line"))?;

    let (app_name, identity) = wallet_line
        .split_once(CHALLENGE_INFIX)
        .ok_or(ChallengeError::Malformed("missing wallet line"))?;
    if app_name.is_empty() {
        return Err(ChallengeError::Malformed("missing app name"));
    }

    let timestamp_ms = ts_line
        .strip_prefix(CHALLENGE_TIMESTAMP_LABEL)
        .ok_or(ChallengeError::Malformed("missing timestamp label"))?
        .parse::<u64>()
        .map_err(|_| ChallengeError::Malformed("timestamp is not an integer"))?;

    Ok(Challenge {
        app_name: app_name.to_string(),
        identity: Address::parse(identity)?,
        timestamp_ms,
    })
}

/// How strictly signed messages are checked before a proof is accepted.
#[derive(Debug, Clone)]
pub struct ChallengePolicy {
    app_name: String,
    max_age: Option<Duration>,
    max_future_skew: Duration,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ChallengePolicy {
    /// Accept any signed message.
    pub fn disabled() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            max_age: None,
            max_future_skew: DEFAULT_MAX_FUTURE_SKEW,
        }
    }

    /// Require a recent challenge for [`APP_NAME`] naming the signer.
    pub fn enforced(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..Self::disabled()
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_max_future_skew(mut self, skew: Duration) -> Self {
        self.max_future_skew = skew;
        self
    }

    pub fn is_enforced(&self) -> bool {
        self.max_age.is_some()
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Check `message` against the policy at the current time.
    pub fn check(&self, message: &str, signer: &Address) -> Result<(), ChallengeError> {
        self.check_at(message, signer, now_ms())
    }

    /// Check `message` against the policy at `now_ms`.
    pub fn check_at(&self, message: &str, signer: &Address, now_ms: u64) -> Result<(), ChallengeError> {
        let Some(max_age) = self.max_age else {
            return Ok(());
        };

        let challenge = parse_challenge(message)?;
        if challenge.app_name != self.app_name {
            return Err(ChallengeError::WrongApp {
                expected: self.app_name.clone(),
                got: challenge.app_name,
            });
        }
        if challenge.identity != *signer {
            return Err(ChallengeError::IdentityMismatch {
                named: challenge.identity,
                signer: *signer,
            });
        }

        let max_age_ms = duration_ms(max_age);
        let max_skew_ms = duration_ms(self.max_future_skew);
        if challenge.timestamp_ms > now_ms {
            let ahead_ms = challenge.timestamp_ms - now_ms;
            if ahead_ms > max_skew_ms {
                return Err(ChallengeError::FromFuture {
                    ahead_ms,
                    max_ms: max_skew_ms,
                });
            }
        } else {
            let age_ms = now_ms - challenge.timestamp_ms;
            if age_ms > max_age_ms {
                return Err(ChallengeError::Stale {
                    age_ms,
                    max_ms: max_age_ms,
                });
            }
        }
        Ok(())
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap()
    }

    fn bob() -> Address {
        "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf".parse().unwrap()
    }

    #[test]
    fn test_exact_format() {
        let msg = ChallengeBuilder::default().build_at(&alice(), 1_700_000_000_000);
        assert_eq!(
            msg,
            "CodeSync - Verify ownership of wallet: 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf\nTimestamp: 1700000000000"
        );
    }

    #[test]
    fn test_custom_app_name() {
        let msg = ChallengeBuilder::new("App").build_at(&alice(), 1);
        assert!(msg.starts_with("App - Verify ownership of wallet: "));
    }

    #[test]
    fn test_different_instants_differ() {
        let b = ChallengeBuilder::default();
        assert_ne!(b.build_at(&alice(), 1), b.build_at(&alice(), 2));
    }

    #[test]
    fn test_build_uses_clock() {
        let before = now_ms();
        let parsed = parse_challenge(&build_challenge(&alice())).unwrap();
        let after = now_ms();
        assert!(parsed.timestamp_ms >= before && parsed.timestamp_ms <= after);
    }

    #[test]
    fn test_parse_roundtrip() {
        let msg = ChallengeBuilder::default().build_at(&alice(), 42);
        let parsed = parse_challenge(&msg).unwrap();
        assert_eq!(parsed.app_name, "CodeSync");
        assert_eq!(parsed.identity, alice());
        assert_eq!(parsed.timestamp_ms, 42);
    }

    #[test]
    fn test_parse_accepts_checksummed_wallet_line() {
        let msg = format!(
            "CodeSync - Verify ownership of wallet: {}\nTimestamp: 5",
            alice().to_checksum()
        );
        assert_eq!(parse_challenge(&msg).unwrap().identity, alice());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_challenge("sign here please"),
            Err(ChallengeError::Malformed(_))
        ));
        assert!(matches!(
            parse_challenge("CodeSync - Verify ownership of wallet: 0x12\nTimestamp: 5"),
            Err(ChallengeError::BadAddress(_))
        ));
        assert!(matches!(
            parse_challenge(&format!(
                "CodeSync - Verify ownership of wallet: {}\nTimestamp: soon",
                alice()
            )),
            Err(ChallengeError::Malformed(_))
        ));
    }

    #[test]
    fn test_disabled_policy_accepts_anything() {
        let policy = ChallengePolicy::disabled();
        assert!(!policy.is_enforced());
        assert!(policy.check_at("whatever", &alice(), 0).is_ok());
    }

    #[test]
    fn test_enforced_policy_accepts_fresh_challenge() {
        let policy = ChallengePolicy::enforced(Duration::from_secs(300));
        let msg = ChallengeBuilder::default().build_at(&alice(), 1_000_000);
        assert!(policy.check_at(&msg, &alice(), 1_000_000 + 299_000).is_ok());
    }

    #[test]
    fn test_enforced_policy_rejects_stale() {
        let policy = ChallengePolicy::enforced(Duration::from_secs(300));
        let msg = ChallengeBuilder::default().build_at(&alice(), 1_000_000);
        assert_eq!(
            policy.check_at(&msg, &alice(), 1_000_000 + 300_001),
            Err(ChallengeError::Stale {
                age_ms: 300_001,
                max_ms: 300_000
            })
        );
    }

    #[test]
    fn test_enforced_policy_tolerates_small_skew_only() {
        let policy = ChallengePolicy::enforced(Duration::from_secs(300))
            .with_max_future_skew(Duration::from_secs(10));
        let msg = ChallengeBuilder::default().build_at(&alice(), 1_010_000);
        assert!(policy.check_at(&msg, &alice(), 1_000_000).is_ok());
        assert!(matches!(
            policy.check_at(&msg, &alice(), 999_999),
            Err(ChallengeError::FromFuture { .. })
        ));
    }

    #[test]
    fn test_enforced_policy_rejects_other_signer() {
        let policy = ChallengePolicy::enforced(Duration::from_secs(300));
        let msg = ChallengeBuilder::default().build_at(&alice(), 1_000);
        assert!(matches!(
            policy.check_at(&msg, &bob(), 1_000),
            Err(ChallengeError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn test_enforced_policy_rejects_other_app() {
        let policy = ChallengePolicy::enforced(Duration::from_secs(300));
        let msg = ChallengeBuilder::new("OtherApp").build_at(&alice(), 1_000);
        assert!(matches!(
            policy.check_at(&msg, &alice(), 1_000),
            Err(ChallengeError::WrongApp { .. })
        ));
    }
}
