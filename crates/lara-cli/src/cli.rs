use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI commands
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "lara")]
#[command(version, about = "Lara - a concise, low-cost productivity companion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Database path (defaults to ~/.lara/lara.db)
    #[arg(long, global = true, env = "LARA_DB_PATH")]
    pub db_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat {
        /// Sign in as this user on start
        #[arg(short, long, env = "LARA_USER")]
        user: Option<String>,
    },

    /// Print a user's stored conversation
    History {
        user: String,

        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// List users with a stored conversation
    Users,

    /// Delete a user's stored conversation
    Reset { user: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["lara"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_history_with_format() {
        let cli =
            Cli::try_parse_from(["lara", "--db-path", "/tmp/x.db", "history", "u1", "--format", "json"])
                .unwrap();
        assert_eq!(cli.db_path.as_deref(), Some("/tmp/x.db"));
        assert_eq!(
            cli.command,
            Some(Commands::History {
                user: "u1".to_string(),
                format: OutputFormat::Json,
            })
        );
    }

    #[test]
    fn test_chat_user_flag() {
        let cli = Cli::try_parse_from(["lara", "chat", "--user", "u1"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Chat {
                user: Some("u1".to_string())
            })
        );
    }
}
