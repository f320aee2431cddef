use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the yatube binary.
#[derive(Debug, Parser)]
#[command(name = "yatube", version, about = "Yatube community blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "YATUBE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
    /// Manage groups.
    Group(GroupArgs),
    /// Manage users known to the blog.
    User(UserArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the home page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override how long the home page stays cached.
    #[arg(long = "cache-index-ttl-seconds", value_name = "SECONDS")]
    pub cache_index_ttl_seconds: Option<u64>,

    /// Override the header carrying the authenticated username.
    #[arg(long = "auth-user-header", value_name = "HEADER")]
    pub auth_user_header: Option<String>,

    /// Override where anonymous users are sent to log in.
    #[arg(long = "auth-login-path", value_name = "PATH")]
    pub auth_login_path: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum GroupCommand {
    /// Create a group; the slug is derived from the title when omitted.
    Create(GroupCreateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct GroupCreateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "TITLE")]
    pub title: String,

    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,
}

#[derive(Debug, Args, Clone)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum UserCommand {
    /// Register a username so the trusted proxy header can resolve it.
    Create(UserCreateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct UserCreateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[arg(long, value_name = "NAME")]
    pub username: String,

    #[arg(long = "first-name", value_name = "NAME", default_value = "")]
    pub first_name: String,

    #[arg(long = "last-name", value_name = "NAME", default_value = "")]
    pub last_name: String,
}
