use serde::Deserialize;
use time::UtcOffset;

/// Settings for validating bearer tokens minted by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Settings for the external vision service.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
    pub vision: VisionConfig,
    /// Offset used to turn record timestamps into display dates.
    #[serde(skip, default = "default_offset")]
    pub display_offset: UtcOffset,
}

fn default_offset() -> UtcOffset {
    UtcOffset::UTC
}

impl AppConfig {
    /// Missing required variables fail here, before anything is served.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            secret: std::env::var("AUTH_JWT_SECRET")?,
            issuer: std::env::var("AUTH_ISSUER").unwrap_or_else(|_| "mealsnap".into()),
            audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "mealsnap-users".into()),
        };
        let vision = VisionConfig {
            api_key: std::env::var("ANTHROPIC_API_KEY")?,
            model: std::env::var("VISION_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".into()),
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".into()),
        };
        Ok(Self {
            database_url,
            auth,
            vision,
            display_offset: display_offset_from_env(),
        })
    }
}

/// `DISPLAY_UTC_OFFSET` in whole hours wins; otherwise the machine's local
/// offset, falling back to UTC when it cannot be determined.
fn display_offset_from_env() -> UtcOffset {
    if let Some(hours) = std::env::var("DISPLAY_UTC_OFFSET")
        .ok()
        .and_then(|v| v.parse::<i8>().ok())
    {
        if let Ok(offset) = UtcOffset::from_hms(hours, 0, 0) {
            return offset;
        }
    }
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
