use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kiosk_api::types::{Login, Recipients};

#[derive(Parser)]
#[command(version, author, about, long_about = None)]
pub struct Cli {
    /// Optional path to a settings JSON file, used instead of the default one
    #[arg(short, long, value_name = "FILE", global = true)]
    pub credentials: Option<PathBuf>,

    /// Print debug logs on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the CLI, only the given options are changed
    Config(ConfigArgs),

    /// Log in, download the current issue and optionally mail it
    Fetch(FetchArgs),

    /// Mail an issue that was already downloaded
    Send(SendArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Your kiosk login (email address)
    #[arg(short, long)]
    pub login: Option<Login>,

    /// SMTP relay used to deliver issues
    #[arg(long, value_name = "HOST")]
    pub email_server: Option<String>,

    /// SMTP port of the relay (default: 25)
    #[arg(long, value_name = "PORT")]
    pub email_port: Option<u16>,

    /// Sender address of the delivered emails
    #[arg(long, value_name = "ADDRESS")]
    pub email_sender: Option<String>,

    /// Recipients, separated by comma
    #[arg(long, value_name = "LIST")]
    pub emails: Option<Recipients>,

    /// Directory the issues are downloaded to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Directory the issue is downloaded to (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Send the downloaded issue by email
    #[arg(long = "sendemail", visible_alias = "send-email")]
    pub send_email: bool,

    /// List of email recipients, separated by comma
    #[arg(long, value_name = "LIST")]
    pub emails: Option<Recipients>,
}

#[derive(Args)]
pub struct SendArgs {
    /// The issue to send
    #[arg(short, long, value_name = "FILE")]
    pub file: PathBuf,

    /// List of email recipients, separated by comma
    #[arg(long, value_name = "LIST")]
    pub emails: Option<Recipients>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_accepts_legacy_flags() {
        let cli = Cli::try_parse_from([
            "kiosk",
            "fetch",
            "--sendemail",
            "--emails",
            "a@example.org,b@example.org",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert!(args.send_email);
        assert_eq!(args.emails.unwrap().len(), 2);
        assert_eq!(args.output_dir, None);
    }

    #[test]
    fn test_fetch_rejects_bad_recipients() {
        assert!(Cli::try_parse_from(["kiosk", "fetch", "--emails", "nope"]).is_err());
    }

    #[test]
    fn test_global_credentials_after_subcommand() {
        let cli = Cli::try_parse_from(["kiosk", "fetch", "--credentials", "f.json"]).unwrap();
        assert_eq!(cli.credentials, Some(PathBuf::from("f.json")));
        assert!(matches!(cli.command, Commands::Fetch(_)));

        let cli = Cli::try_parse_from(["kiosk", "-c", "g.json", "config"]).unwrap();
        assert_eq!(cli.credentials, Some(PathBuf::from("g.json")));
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let cli = Cli::try_parse_from(["kiosk", "send", "--file", "issue.pdf", "-v"]).unwrap();
        assert!(cli.verbose);
        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.file, PathBuf::from("issue.pdf"));
    }
}
