use std::collections::HashSet;

use tokio::sync::RwLock;

/// Usernames that the bot ignores entirely
#[derive(Debug, Default)]
pub struct BanList {
    users: RwLock<HashSet<String>>,
}

fn normalize(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the user was already banned
    pub async fn ban(&self, username: &str) -> bool {
        self.users.write().await.insert(normalize(username))
    }

    /// Users without a username cannot be banned
    pub async fn is_banned(&self, username: Option<&str>) -> bool {
        match username {
            Some(name) => self.users.read().await.contains(&normalize(name)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ban_is_idempotent_and_case_insensitive() {
        let bans = BanList::new();
        assert!(bans.ban("@Spammer").await);
        assert!(!bans.ban("spammer").await);
        assert!(bans.is_banned(Some("SPAMMER")).await);
        assert!(!bans.is_banned(Some("someone")).await);
        assert!(!bans.is_banned(None).await);
    }
}
