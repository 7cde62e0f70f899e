use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Key: (command, chat id)
type CooldownKey = (String, i64);

/// Rejected use of a command that is still cooling down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub remaining: Duration,
    /// True on the first rejection within a cooldown period, false on repeats
    pub should_warn: bool,
}

impl Cooldown {
    pub fn message(&self) -> String {
        let secs = self.remaining.as_secs();
        format!(
            "Bu komutu tekrar kullanmak için {} dakika {} saniye beklemelisiniz.",
            secs / 60,
            secs % 60
        )
    }
}

/// Per-(command, chat) cooldowns, longer in groups than in private chats
#[derive(Debug)]
pub struct RateLimiter {
    private_cooldown: Duration,
    group_cooldown: Duration,
    last_used: Mutex<HashMap<CooldownKey, Instant>>,
    // When we last warned about a key, so repeats within one period stay quiet
    warned: Mutex<HashMap<CooldownKey, Instant>>,
}

impl RateLimiter {
    pub fn new(private_cooldown: Duration, group_cooldown: Duration) -> Self {
        Self {
            private_cooldown,
            group_cooldown,
            last_used: Mutex::new(HashMap::new()),
            warned: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown_for(&self, is_private: bool) -> Duration {
        if is_private {
            self.private_cooldown
        } else {
            self.group_cooldown
        }
    }

    /// Returns Ok(()) and records the use if the cooldown has passed
    pub async fn check(&self, command: &str, chat_id: i64, is_private: bool) -> Result<(), Cooldown> {
        self.check_at(command, chat_id, is_private, Instant::now()).await
    }

    pub async fn check_at(
        &self,
        command: &str,
        chat_id: i64,
        is_private: bool,
        now: Instant,
    ) -> Result<(), Cooldown> {
        let key = (command.to_string(), chat_id);
        let cooldown = self.cooldown_for(is_private);

        let mut last_used = self.last_used.lock().await;
        if let Some(&last_time) = last_used.get(&key) {
            let elapsed = now.saturating_duration_since(last_time);
            if elapsed < cooldown {
                let mut warned = self.warned.lock().await;
                let should_warn = warned
                    .get(&key)
                    .map_or(true, |&last_warning| last_warning < last_time);
                if should_warn {
                    warned.insert(key, now);
                }
                return Err(Cooldown {
                    remaining: cooldown - elapsed,
                    should_warn,
                });
            }
        }

        last_used.insert(key, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(900), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_first_use_allowed_second_blocked() {
        let limiter = limiter();
        let start = Instant::now();

        assert!(limiter.check_at("price", -100, false, start).await.is_ok());
        let cooldown = limiter
            .check_at("price", -100, false, start + Duration::from_secs(600))
            .await
            .unwrap_err();
        assert_eq!(cooldown.remaining, Duration::from_secs(3000));
        assert!(cooldown.should_warn);
        assert_eq!(
            cooldown.message(),
            "Bu komutu tekrar kullanmak için 50 dakika 0 saniye beklemelisiniz."
        );
    }

    #[tokio::test]
    async fn test_repeat_rejections_warn_once() {
        let limiter = limiter();
        let start = Instant::now();

        limiter.check_at("volume", 7, true, start).await.unwrap();
        let first = limiter.check_at("volume", 7, true, start + Duration::from_secs(1)).await.unwrap_err();
        let second = limiter.check_at("volume", 7, true, start + Duration::from_secs(2)).await.unwrap_err();
        assert!(first.should_warn);
        assert!(!second.should_warn);

        // A fresh period warns again
        let later = start + Duration::from_secs(901);
        limiter.check_at("volume", 7, true, later).await.unwrap();
        let third = limiter.check_at("volume", 7, true, later + Duration::from_secs(1)).await.unwrap_err();
        assert!(third.should_warn);
    }

    #[tokio::test]
    async fn test_private_cooldown_is_shorter() {
        let limiter = limiter();
        let start = Instant::now();

        limiter.check_at("dollar", 1, true, start).await.unwrap();
        assert!(limiter
            .check_at("dollar", 1, true, start + Duration::from_secs(900))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_keys_are_per_command_and_chat() {
        let limiter = limiter();
        let now = Instant::now();

        limiter.check_at("price", 1, false, now).await.unwrap();
        assert!(limiter.check_at("volume", 1, false, now).await.is_ok());
        assert!(limiter.check_at("price", 2, false, now).await.is_ok());
    }

    #[test]
    fn test_message_splits_minutes_and_seconds() {
        let cooldown = Cooldown {
            remaining: Duration::from_secs(125),
            should_warn: true,
        };
        assert_eq!(
            cooldown.message(),
            "Bu komutu tekrar kullanmak için 2 dakika 5 saniye beklemelisiniz."
        );
    }
}
