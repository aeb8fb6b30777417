use dotenvy::dotenv;
use serde::Deserialize;
use serenity::model::id::GuildId;
use std::env;
use std::fs;

const GUILDS_FILE: &str = "guilds.toml";

#[derive(Clone, Deserialize)]
pub struct Config {
    pub discord_token: String,
    pub application_id: u64,
    /// Submit the command schema on ready.
    pub register_commands: bool,
    /// When set, every command is submitted to this guild only.
    pub dev_guild_id: Option<u64>,
    /// When non-empty, commands are submitted per guild instead of globally.
    pub allowed_guilds: Vec<u64>,
    pub status_message: String,
}

/// Where a built schema gets submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildScopes {
    /// Everything goes to one development guild.
    Dev(GuildId),
    /// Each allow-listed guild receives the commands visible in it.
    AllowList(Vec<GuildId>),
    /// Unrestricted commands go global, restricted ones to their guilds.
    Global,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            application_id: env::var("APPLICATION_ID")
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be set"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be a valid u64"))?,
            register_commands: env::var("REGISTER_COMMANDS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            allowed_guilds: Self::load_allowed_guilds()?,
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Ready to route!".to_string()),
        })
    }

    /// Reads `guilds.toml` first, then falls back to `ALLOWED_GUILDS`.
    pub fn load_allowed_guilds() -> anyhow::Result<Vec<u64>> {
        if let Ok(content) = fs::read_to_string(GUILDS_FILE) {
            return parse_guilds_file(&content);
        }

        match env::var("ALLOWED_GUILDS") {
            Ok(raw) => parse_guild_list(&raw),
            Err(_) => Ok(Vec::new()),
        }
    }

    pub fn guild_scopes(&self) -> GuildScopes {
        if let Some(id) = self.dev_guild_id {
            return GuildScopes::Dev(GuildId::new(id));
        }
        if self.allowed_guilds.is_empty() {
            GuildScopes::Global
        } else {
            GuildScopes::AllowList(self.allowed_guilds.iter().copied().map(GuildId::new).collect())
        }
    }
}

fn parse_guilds_file(content: &str) -> anyhow::Result<Vec<u64>> {
    #[derive(Deserialize)]
    struct GuildsWrapper {
        guilds: Vec<u64>,
    }
    let wrapper: GuildsWrapper = toml::from_str(content)
        .map_err(|e| anyhow::anyhow!("{} is malformed: {}", GUILDS_FILE, e))?;
    Ok(wrapper.guilds)
}

fn parse_guild_list(raw: &str) -> anyhow::Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .ok()
                .filter(|id| *id != 0)
                .ok_or_else(|| anyhow::anyhow!("ALLOWED_GUILDS entry `{}` is not a guild id", id))
        })
        .collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("register_commands", &self.register_commands)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("allowed_guilds", &self.allowed_guilds)
            .field("status_message", &self.status_message)
            .finish()
    }
}
