// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cassh::{
    client::{Client, SignOptions},
    config::{load_config, Config},
    model::{Principal, Username},
};
use chrono::TimeDelta;
use clap::Parser;
use ssh_key::PublicKey;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter};

/// A client for the CASSH SSH certificate authority
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// The path to the client's configuration file.
    ///
    /// If no path is provided, the configuration file at $CONFIGURATION_DIRECTORY/cassh/client.toml
    /// is used, if it exists. If it does not exist, the configuration defaults are used. Note
    /// that the defaults include a server address and are useful only as an example.
    ///
    /// To view the client configuration, run the `config` subcommand.
    #[arg(long, short, env = "CASSH_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// A set of one or more comma-separated directives to filter logs.
    ///
    /// The general format is "target_name[span_name{field=value}]=level" where level is
    /// one of TRACE, DEBUG, INFO, WARN, ERROR.
    ///
    /// Details: https://docs.rs/tracing-subscriber/0.3.19/tracing_subscriber/filter/struct.EnvFilter.html#directives
    #[arg(long, env = "CASSH_CLIENT_LOG", default_value = "WARN,cassh=INFO")]
    pub log_filter: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// See the current configuration, or the defaults if no configuration file is supplied.
    Config,
    /// Check that the server is reachable.
    Ping,
    /// Print the server's name and version.
    Health,
    /// Print the certificate authority's public key in the OpenSSH format.
    Ca,
    /// Print a summary of the server's key revocation list.
    Krl {
        /// Also report whether this public key is revoked.
        #[arg(long)]
        public_key: Option<PathBuf>,
    },
    /// Print the configured user's status as JSON.
    Status,
    /// Manage the configured user's key.
    #[command(subcommand)]
    Key(KeyCommand),
    /// Administer users; requires administrator credentials.
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(clap::Subcommand, Debug)]
enum KeyCommand {
    /// Register a public key for the configured user.
    Set {
        /// The path to the OpenSSH public key.
        #[arg(long)]
        public_key: PathBuf,
    },
    /// Have the public key signed and print the certificate.
    Sign {
        /// The path to the OpenSSH public key.
        #[arg(long)]
        public_key: PathBuf,
        /// Request a new certificate even if the current one is still valid.
        #[arg(long)]
        force: bool,
        /// Write the certificate to this path rather than to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum AdminCommand {
    /// Check that the configured credentials have administrator access.
    CheckAuth,
    /// Print a user's status as JSON.
    Status { user: Username },
    /// Activate a user's key.
    Activate { user: Username },
    /// Revoke a user's key.
    Revoke { user: Username },
    /// Delete a user's key.
    Delete { user: Username },
    /// Set how many hours certificates for a user's key are valid.
    Expiry { user: Username, hours: u32 },
    /// Manage a user's principals.
    #[command(subcommand)]
    Principals(PrincipalsCommand),
}

#[derive(clap::Subcommand, Debug)]
enum PrincipalsCommand {
    /// Add principals to the user's list.
    Add {
        user: Username,
        #[arg(required = true)]
        principals: Vec<Principal>,
    },
    /// Remove principals from the user's list.
    Remove {
        user: Username,
        #[arg(required = true)]
        principals: Vec<Principal>,
    },
    /// Replace the user's list of principals.
    Set {
        user: Username,
        #[arg(required = true)]
        principals: Vec<Principal>,
    },
    /// Reset the user's principals to the server's defaults.
    Reset { user: Username },
}

async fn read_public_key(path: &Path) -> anyhow::Result<PublicKey> {
    let key = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read public key from {path:?}"))?;
    PublicKey::from_openssh(key.trim()).with_context(|| format!("{path:?} is not a public key"))
}

fn username(config: &Config) -> anyhow::Result<Username> {
    let name = config
        .username
        .as_deref()
        .context("the configuration must include a username for user commands")?;
    Ok(Username::new(name)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opts = Cli::parse();

    // Unfortunately we can't use clap's value_parser since EnvFilter does not
    // implement Clone.
    let log_filter = EnvFilter::builder().parse(&opts.log_filter).context(
        "CASSH_CLIENT_LOG contains an invalid log directive; refer to \
            https://docs.rs/tracing-subscriber/0.3.19/tracing_subscriber/\
            filter/struct.EnvFilter.html#directives for format details.",
    )?;
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(log_filter);
    tracing::subscriber::set_global_default(registry)
        .context("a global tracing subscriber was already installed")?;

    let config = load_config(opts.config)?;

    if let Command::Config = opts.command {
        println!(
            "# This is the current configuration\n\n{config}\n# This concludes the configuration.\n"
        );
        return Ok(());
    }

    let auth = config.session_auth();
    let client = Client::new(config.clone())?;
    match opts.command {
        Command::Config => unreachable!("Command handled prior to this match"),
        Command::Ping => {
            client.ping().await?;
            println!("The server at {} is reachable", client.base_url());
        }
        Command::Health => {
            let (name, version) = client.health().await?;
            println!("{name} {version}");
        }
        Command::Ca => {
            let key = client.authority_public_key().await?;
            println!("{}", key.to_openssh()?);
        }
        Command::Krl { public_key } => {
            let krl = client.key_revocation_list().await?;
            println!("version: {}", krl.version());
            if let Some(generated) = krl.generated_date() {
                println!("generated: {generated}");
            }
            if !krl.comment().is_empty() {
                println!("comment: {}", krl.comment());
            }
            println!("certificate sections: {}", krl.certificate_sections().len());
            println!("revoked keys: {}", krl.revoked_key_count());
            for key in krl.signing_keys() {
                println!("signed by: {}", key.fingerprint(Default::default()));
            }
            if let Some(path) = public_key {
                let key = read_public_key(&path).await?;
                println!("{} revoked: {}", path.display(), krl.is_key_revoked(&key)?);
            }
        }
        Command::Status => {
            let status = client.user_session(username(&config)?, auth).status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Key(command) => {
            let session = client.user_session(username(&config)?, auth);
            match command {
                KeyCommand::Set { public_key } => {
                    let key = read_public_key(&public_key).await?;
                    session.key(&key)?.set().await?;
                    println!("Key registered; it must be activated by an administrator");
                }
                KeyCommand::Sign {
                    public_key,
                    force,
                    output,
                } => {
                    let key = read_public_key(&public_key).await?;
                    let certificate = session
                        .key(&key)?
                        .sign(SignOptions::default().force(force))
                        .await?;
                    let certificate = format!("{}\n", certificate.to_openssh()?);
                    match output {
                        Some(path) => tokio::fs::write(&path, certificate)
                            .await
                            .with_context(|| format!("failed to write certificate to {path:?}"))?,
                        None => print!("{certificate}"),
                    }
                }
            }
        }
        Command::Admin(command) => {
            let admin = client.admin_session(auth);
            match command {
                AdminCommand::CheckAuth => {
                    admin.check_authentication().await?;
                    println!("You can successfully authenticate as an administrator");
                }
                AdminCommand::Status { user } => {
                    let status = admin.user(user).status().await?;
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
                AdminCommand::Activate { user } => admin.user(user).key().activate().await?,
                AdminCommand::Revoke { user } => admin.user(user).key().revoke().await?,
                AdminCommand::Delete { user } => admin.user(user).key().delete().await?,
                AdminCommand::Expiry { user, hours } => {
                    admin
                        .user(user)
                        .key()
                        .set_expiry(TimeDelta::hours(hours.into()))
                        .await?
                }
                AdminCommand::Principals(command) => match command {
                    PrincipalsCommand::Add { user, principals } => {
                        admin.user(user).principals().add(principals).await?
                    }
                    PrincipalsCommand::Remove { user, principals } => {
                        admin.user(user).principals().remove(principals).await?
                    }
                    PrincipalsCommand::Set { user, principals } => {
                        admin.user(user).principals().set(principals).await?
                    }
                    PrincipalsCommand::Reset { user } => {
                        admin.user(user).principals().reset().await?
                    }
                },
            }
        }
    }

    Ok(())
}
