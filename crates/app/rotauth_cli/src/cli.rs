use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rotauth",
    version,
    about = "Issue signed session tokens and rotate renewal tokens"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print name and version.
    Version,

    /// Print a freshly generated signing secret.
    Secret,

    /// Sign a token for the given principal.
    Issue {
        #[arg(long)]
        email: String,
        /// Display name.
        #[arg(long)]
        name: String,
    },

    /// Validate a (possibly expired) signed token and print its claims.
    Inspect {
        token: String,
    },

    /// Print a freshly generated renewal token.
    Renewal,

    /// Walk through register, login, refresh and a replayed refresh in memory.
    Demo,

    /// Run database migrations.
    Migrate {
        #[command(flatten)]
        db: DbArgs,
    },

    /// Create an account and print its first token pair.
    Register {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        user_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, env = "ROTAUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Authenticate and print a new token pair.
    Login {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        email: String,
        #[arg(long, env = "ROTAUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Exchange an expired signed token and its renewal token.
    Refresh {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        jwt: String,
        #[arg(long)]
        renewal_token: String,
    },
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/rotauth"
    )]
    pub database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,
}
