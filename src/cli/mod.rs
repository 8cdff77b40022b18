// ============================================================================
// File: packages/rerobots/src/cli/mod.rs
// ----------------------------------------------------------------------------
// Command-line interface to the rerobots API.
//
// Subcommands mirror the API client: catalog search and detail, instance
// listing, launch, and termination. Output goes to stdout; diagnostics to
// stderr with exit status 1.
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use rand::seq::SliceRandom;

use crate::api::{ApiClient, DeploymentFilter, LeaseOptions, LeaseTarget};
use crate::config::{ClientConfig, resolve_token};
use crate::platform_utils::write_secret;


/// rerobots API command-line client
#[derive(Debug, Parser)]
#[command(name = "rerobots", version)]
pub struct Cli {
    /// Plaintext file containing API token; with this flag, the
    /// REROBOTS_API_TOKEN environment variable is ignored
    #[arg(short = 't', long = "jwt", value_name = "FILE", global = true)]
    pub jwt: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print summary about instance
    Info {
        /// Instance ID; may be omitted when exactly one instance is active
        id: Option<String>,
    },

    /// List all instances owned by this user
    List,

    /// Search for matching deployments; empty query shows all
    Search {
        query: Option<String>,

        /// Restrict to this workspace type; repeatable
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
    },

    /// Print summary about workspace deployment
    Wdinfo {
        /// Workspace deployment ID
        id: String,
    },

    /// Launch instance from specified workspace deployment; if none is
    /// specified, randomly select from those available
    Launch {
        /// Deployment ID
        id: Option<String>,

        /// Where to write the secret key issued for SSH access
        #[arg(long, value_name = "FILE", default_value = "key.pem")]
        secret_key: PathBuf,

        /// OpenSSH public key to authorize instead of a service-issued key
        #[arg(long, value_name = "FILE")]
        public_key: Option<PathBuf>,
    },

    /// Terminate instance
    Terminate {
        /// Instance ID; may be omitted when exactly one instance is active
        id: Option<String>,
    },

    /// Print version number and exit
    Version,
}

const SUCCESS: u8 = 0;
const FAILURE: u8 = 1;

/// Run a parsed command line against the configured service
pub fn run(cli: Cli) -> anyhow::Result<u8> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(SUCCESS);
    };
    if let Commands::Version = command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let mut config = ClientConfig::from_env();
    if let Some(path) = cli.jwt.as_deref() {
        config.api_token = resolve_token(Some(path))
            .with_context(|| format!("reading API token from {}", path.display()))?;
    }
    let api = ApiClient::new(&config);

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    run_with(&command, &api, &mut stdout.lock(), &mut stderr.lock())
}

/// Run one command, writing results to `out` and diagnostics to `err`
pub fn run_with<O: Write, E: Write>(
    command: &Commands,
    api: &ApiClient,
    out: &mut O,
    err: &mut E,
) -> anyhow::Result<u8> {
    match command {
        Commands::Search { query, types } => {
            let mut filter = DeploymentFilter::all().with_types(types.clone());
            if let Some(query) = query {
                filter = filter.with_query(query.as_str());
            }
            for deployment in api.search(filter).context("searching deployments")? {
                writeln!(out, "{}", deployment.id)?;
            }
        }

        Commands::Wdinfo { id } => {
            let deployment = api
                .describe(id)
                .with_context(|| format!("fetching deployment {id}"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&deployment)?)?;
        }

        Commands::List => {
            for id in api.list_leases().context("listing instances")? {
                writeln!(out, "{id}")?;
            }
        }

        Commands::Info { id } => {
            let Some(id) = sole_instance(api, id.as_deref(), err)? else {
                return Ok(FAILURE);
            };
            let lease = api
                .get_lease(&id)
                .with_context(|| format!("fetching instance {id}"))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&lease)?)?;
        }

        Commands::Terminate { id } => {
            let Some(id) = sole_instance(api, id.as_deref(), err)? else {
                return Ok(FAILURE);
            };
            api.terminate_lease(&id)
                .with_context(|| format!("terminating instance {id}"))?;
        }

        Commands::Launch {
            id,
            secret_key,
            public_key,
        } => {
            let deployment_id = match id {
                Some(id) => id.clone(),
                None => {
                    let available = api.search("").context("searching deployments")?;
                    match available.choose(&mut rand::thread_rng()) {
                        Some(deployment) => deployment.id.clone(),
                        None => {
                            writeln!(err, "no deployments are available")?;
                            return Ok(FAILURE);
                        }
                    }
                }
            };

            let mut options = LeaseOptions::new();
            if let Some(path) = public_key {
                let key = fs::read_to_string(path)
                    .with_context(|| format!("reading public key {}", path.display()))?;
                options = options.with_public_key(key);
            }

            let grant = api
                .create_lease(&LeaseTarget::Deployment(deployment_id), &options)
                .context("launching instance")?;
            writeln!(out, "instance {}", grant.id)?;

            if let Some(key) = &grant.private_key {
                writeln!(
                    out,
                    "writing secret key for ssh access to file {}...",
                    secret_key.display()
                )?;
                write_secret(secret_key, key)
                    .with_context(|| format!("writing {}", secret_key.display()))?;
            }
        }

        Commands::Version => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
        }
    }

    Ok(SUCCESS)
}

/// The given instance, or the only active one
///
/// Returns `None` after reporting on `err` when the choice is empty or
/// ambiguous.
fn sole_instance<E: Write>(
    api: &ApiClient,
    id: Option<&str>,
    err: &mut E,
) -> anyhow::Result<Option<String>> {
    if let Some(id) = id {
        return Ok(Some(id.to_string()));
    }

    let mut active = api.list_leases().context("listing instances")?;
    match active.len() {
        0 => {
            writeln!(err, "no active instances")?;
            Ok(None)
        }
        1 => Ok(active.pop()),
        _ => {
            writeln!(err, "ambiguous command because more than one active instance")?;
            writeln!(err, "specify which instance to use")?;
            Ok(None)
        }
    }
}
