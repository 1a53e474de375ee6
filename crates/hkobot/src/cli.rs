use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hkobot")]
#[command(author, version, about = "Telegram bot for Hong Kong Observatory weather bulletins", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling unless a webhook is configured)
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Send a message to every known chat and exit
    Broadcast {
        /// Message text (sent as plain text)
        message: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_no_command() {
        let cli = Cli::try_parse_from(["hkobot"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_run_webhook_flag() {
        let cli = Cli::try_parse_from(["hkobot", "run", "--webhook"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { webhook: true }));
    }

    #[test]
    fn test_broadcast_requires_message() {
        assert!(Cli::try_parse_from(["hkobot", "broadcast"]).is_err());
        let cli = Cli::try_parse_from(["hkobot", "broadcast", "Service resumed"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Broadcast {
                message: "Service resumed".to_string()
            })
        );
    }
}
