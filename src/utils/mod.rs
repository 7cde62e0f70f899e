pub mod banlist;
pub mod errors;
pub mod format;
pub mod ratelimit;

pub use banlist::BanList;
pub use errors::BotError;
pub use ratelimit::RateLimiter;
