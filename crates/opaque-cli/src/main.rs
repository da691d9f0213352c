use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use opaque_core::config::{Identities, ProtocolInfo};
use opaque_core::{login, registration};

#[derive(Parser)]
#[command(name = "opaque-cli")]
#[command(about = "Local exerciser for the OPAQUE protocol core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a password against a fresh in-memory user record, then
    /// immediately run a login against it and print the derived session key.
    Demo {
        /// Password to register and log in with.
        #[arg(long)]
        password: Option<String>,

        /// Use the private (server-never-sees-secrets) registration flow
        /// instead of the server-knows-all variant.
        #[arg(long)]
        private: bool,
    },
}

fn read_password(provided: Option<String>) -> Result<String> {
    match provided {
        Some(p) => Ok(p),
        None => rpassword::prompt_password("Password: ").map_err(|e| anyhow!("read password: {e}")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { password, private } => {
            let password = read_password(password)?;
            let password = password.as_bytes();

            let record = if private {
                let (client_state, alpha) =
                    registration::client_start(password).map_err(|e| anyhow!("registration blind step: {e}"))?;
                let (reg_secret, reg_public) = registration::server_respond(&alpha)
                    .map_err(|e| anyhow!("registration server step: {e}"))?;
                let (upload, _export_key) =
                    registration::client_respond(password, client_state, &reg_public, b"", None, b"")
                        .map_err(|e| anyhow!("registration client step: {e}"))?;
                registration::server_finish(upload, reg_secret)
            } else {
                let (record, _export_key) =
                    registration::register_server_knows_all(password, b"", None, b"")
                        .map_err(|e| anyhow!("registration failed: {e}"))?;
                record
            };

            let ids = Identities::default();
            let infos = ProtocolInfo::default();

            let (client_secret, client_public) =
                login::client_start(password).map_err(|e| anyhow!("login blind step: {e}"))?;
            let (response, server_state) = login::server_respond(&client_public, &record, &ids, &infos)
                .map_err(|e| anyhow!("login server step: {e}"))?;
            let client_result = login::client_finish(&response, client_secret, password, None, &ids, &infos)
                .map_err(|e| anyhow!("login client step: {e}"))?;
            let server_sk = login::server_finish_auth(server_state, &client_result.auth_u, &infos)
                .map_err(|e| anyhow!("server authentication failed: {e}"))?;

            if client_result.sk != server_sk {
                return Err(anyhow!("session keys disagree"));
            }

            println!("session key: {}", hex::encode(client_result.sk));
        }
    }

    Ok(())
}
