use clap::Parser;

#[derive(Clone, Debug, Parser)]
pub struct CampusArgs {
    /// Database connection string
    #[clap(long, env = "CAMPUS_DATABASE", default_value = "sqlite:campus.db?mode=rwc")]
    pub database: String,

    /// Port
    #[clap(long, env = "CAMPUS_PORT")]
    pub port: u16,

    /// Public base URL of this server
    #[clap(long, env = "CAMPUS_PUBLIC_URL")]
    pub public_url: String,

    /// API key accepted on admin endpoints instead of an admin session
    #[clap(long, env = "CAMPUS_API_KEY")]
    pub api_key: String,

    /// OpenID Connect issuer (the identity server)
    #[clap(long, env = "CAMPUS_ISSUER_URL")]
    pub issuer_url: String,

    /// OAuth Client ID
    #[clap(long, env = "CAMPUS_CLIENT_ID")]
    pub client_id: String,

    /// OAuth Client Secret
    #[clap(long, env = "CAMPUS_CLIENT_SECRET")]
    pub client_secret: String,

    /// Base URL of the git host
    #[clap(long, env = "CAMPUS_GIT_URL")]
    pub git_url: String,

    /// Git host admin user
    #[clap(long, env = "CAMPUS_GIT_USERNAME")]
    pub git_username: String,

    /// Git host admin password
    #[clap(long, env = "CAMPUS_GIT_PASSWORD")]
    pub git_password: String,

    /// Base URL of the chat platform
    #[clap(long, env = "CAMPUS_CHAT_URL")]
    pub chat_url: String,

    /// Chat platform bot user id
    #[clap(long, env = "CAMPUS_CHAT_USER_ID")]
    pub chat_user_id: String,

    /// Chat platform bot token
    #[clap(long, env = "CAMPUS_CHAT_TOKEN")]
    pub chat_token: String,

    /// Base URL of the identity server's API
    #[clap(long, env = "CAMPUS_AUTH_URL")]
    pub auth_url: String,

    /// API key for the identity server
    #[clap(long, env = "CAMPUS_AUTH_API_KEY")]
    pub auth_api_key: String,

    /// Base URL of the build server
    #[clap(long, env = "CAMPUS_BUILD_URL")]
    pub build_url: String,

    /// API key for the build server
    #[clap(long, env = "CAMPUS_BUILD_API_KEY")]
    pub build_api_key: String,
}
