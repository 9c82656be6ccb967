//! Command line of the lock operator.

use clap::{Args, Parser, Subcommand};

use crate::lockctl_config::parse_ttl;

/// Acquire, release and inspect distributed locks.
///
/// The store is selected through `LOCK_STORE` and its connection variables;
/// commands without `--ttl` use `LOCK_TTL_SECONDS`.
#[derive(Parser, Debug)]
#[command(name = "lockctl")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Acquire a lock and print its owner token and expiry.
    Acquire(LeaseArgs),

    /// Release a lock held by the given owner token.
    Release(OwnerArgs),

    /// Extend a held lock and print the new expiry.
    Refresh {
        #[command(flatten)]
        owner: OwnerArgs,

        /// Lease duration in seconds.
        #[arg(long = "ttl", value_name = "SECONDS", value_parser = parse_ttl_arg)]
        ttl_seconds: Option<u32>,
    },

    /// Report whether a key is currently locked.
    ///
    /// Reclaims an expired lock as a side effect.
    Status {
        /// Key of the locked resource.
        key: String,
    },

    /// Acquire a lock and keep refreshing it until interrupted.
    Hold(LeaseArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LeaseArgs {
    /// Key of the locked resource.
    pub key: String,

    /// Lease duration in seconds.
    #[arg(long = "ttl", value_name = "SECONDS", value_parser = parse_ttl_arg)]
    pub ttl_seconds: Option<u32>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OwnerArgs {
    /// Key of the locked resource.
    pub key: String,

    /// Owner token printed by `acquire`.
    pub owner_token: String,
}

fn parse_ttl_arg(value: &str) -> Result<u32, String> {
    parse_ttl("--ttl", value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, LeaseArgs, OwnerArgs};

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("lockctl").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn acquire_leaves_ttl_to_config() {
        assert_eq!(
            parse(&["acquire", "res1"]).ok(),
            Some(Command::Acquire(LeaseArgs {
                key: "res1".to_owned(),
                ttl_seconds: None,
            }))
        );
    }

    #[test]
    fn refresh_takes_ttl_flag() {
        assert_eq!(
            parse(&["refresh", "res1", "token-a", "--ttl", "120"]).ok(),
            Some(Command::Refresh {
                owner: OwnerArgs {
                    key: "res1".to_owned(),
                    owner_token: "token-a".to_owned(),
                },
                ttl_seconds: Some(120),
            })
        );
        assert_eq!(
            parse(&["acquire", "res1", "--ttl", "5"]).ok(),
            Some(Command::Acquire(LeaseArgs {
                key: "res1".to_owned(),
                ttl_seconds: Some(5),
            }))
        );
    }

    #[test]
    fn help_flag_is_never_a_lock_key() {
        assert!(matches!(
            parse(&["acquire", "--help"]),
            Err(error) if error.kind() == ErrorKind::DisplayHelp
        ));
        assert!(matches!(
            parse(&["--help"]),
            Err(error) if error.kind() == ErrorKind::DisplayHelp
        ));
        assert!(matches!(
            parse(&["--version"]),
            Err(error) if error.kind() == ErrorKind::DisplayVersion
        ));
    }

    #[test]
    fn rejects_missing_arguments_and_bad_ttl() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["release", "res1"]).is_err());
        assert!(matches!(
            parse(&["hold", "res1", "--ttl", "0"]),
            Err(error) if error.kind() == ErrorKind::ValueValidation
        ));
        assert!(parse(&["hold", "res1", "--ttl", "soon"]).is_err());
        assert!(parse(&["status", "res1", "extra"]).is_err());
        assert!(parse(&["acquire", "res1", "--force"]).is_err());
    }
}
