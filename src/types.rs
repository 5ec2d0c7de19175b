/// Discord guild (server) snowflake.
pub type GuildId = u64;
/// Discord user snowflake, stored as an opaque id only.
pub type UserId = u64;
/// Voice channel snowflake.
pub type ChannelId = u64;
