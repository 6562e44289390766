//! Sigil CLI
//!
//! Thin wrapper around sigil-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Create a profile (password from --password or SIGIL_PASSWORD)
//! sigil init --name Alice --url https://a.example
//!
//! # Show the profile
//! sigil show
//!
//! # Ask bob for a relationship; send the printed block to bob
//! sigil request create bob --output request.txt
//!
//! # Bob stores the request, then answers it
//! sigil request receive request.txt
//! sigil request accept <uid> --output response.txt
//!
//! # Alice completes the handshake with bob's answer
//! sigil request complete response.txt
//!
//! # List established accounts
//! sigil account list
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sigil_core::armor::{self, PROFILE_LABEL};
use sigil_core::relation::{self, SignedPayload};
use sigil_core::schema::{KeyPub, ResponseDetails};
use sigil_core::{
    BlobStore, Profile, ProfileMetadata, RedbStore, SharedProfile, VaultConfig, PROFILE_KEY,
};
use tokio::io::AsyncReadExt;

/// Sigil - password-protected identity vault
#[derive(Parser)]
#[command(name = "sigil")]
#[command(version = "0.1.0")]
#[command(about = "Sigil - password-protected identity vault")]
#[command(
    long_about = "Keeps a signing identity and the accounts of peers behind a password, and establishes relationships with signed request/response blocks exchanged out of band."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Data directory (default: ~/.sigil)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Profile password
    #[arg(short, long, global = true, env = "SIGIL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Unlock with the backup password instead of the main one
    #[arg(long, global = true)]
    use_backup: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new profile
    Init {
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Second password that can also unlock the profile
        #[arg(long)]
        backup_password: Option<String>,
        /// PBKDF2 iteration count (at least 100000)
        #[arg(long)]
        iterations: Option<u32>,
        /// Replace an existing profile
        #[arg(long)]
        force: bool,
    },

    /// Show profile information
    Show,

    /// Update profile metadata
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the signing public key as PEM
    ExportKey,

    /// Write the encrypted profile as an armored block
    Backup {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the stored profile with an armored backup
    Restore {
        /// Armored file (stdin if omitted)
        input: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },

    /// Relationship requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },

    /// Pending requests
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },

    /// Established accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum RequestAction {
    /// Create and sign a request for a peer
    Create {
        /// Local label for the peer
        receiver: String,
        /// Name presented to the peer (default: profile name)
        #[arg(long)]
        nickname: Option<String>,
        /// URL presented to the peer (default: profile URL)
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(short, long)]
        message: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify a signed block and print its contents
    Inspect {
        input: Option<PathBuf>,
    },
    /// Store an incoming request as pending
    Receive {
        input: Option<PathBuf>,
        /// Local label (default: the requester's nickname)
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Accept a received request and print the response block
    Accept {
        uid: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(short, long)]
        message: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Complete an outgoing request with the peer's response
    Complete {
        input: Option<PathBuf>,
    },
    /// Drop a pending request
    Decline {
        uid: String,
    },
}

#[derive(Subcommand)]
enum PendingAction {
    /// List pending requests
    List,
    /// Export a pending request, private key included
    Export {
        uid: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import an exported pending request
    Import {
        input: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// List established accounts
    List,
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sigil")
}

fn open_store(data_dir: &Path) -> Result<RedbStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    Ok(RedbStore::open(data_dir.join("vault.redb"))?)
}

fn require_password(password: Option<&str>) -> Result<&str> {
    password.context("a password is required (--password or SIGIL_PASSWORD)")
}

/// Read an armored block from a file, or stdin when no path (or `-`) is given.
async fn read_block(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

async fn write_block(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn fingerprint(key: &KeyPub) -> String {
    let len = key.public_key.len().min(8);
    hex::encode(&key.public_key[..len])
}

fn format_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// An unlocked profile bound to its store.
struct Vault {
    store: RedbStore,
    profile: SharedProfile,
}

impl Vault {
    async fn unlock(
        data_dir: &Path,
        config: VaultConfig,
        password: Option<&str>,
        use_backup: bool,
    ) -> Result<Self> {
        let password = require_password(password)?;
        let store = open_store(data_dir)?;
        let profile = SharedProfile::new(Profile::new(config));
        if !profile.with(|p| p.load_from(&store)).await? {
            bail!("No profile in {}. Run `sigil init` first.", data_dir.display());
        }
        if use_backup {
            profile.open_with_backup(password).await?;
        } else {
            profile.open(password).await?;
        }
        Ok(Self { store, profile })
    }

    async fn save(&self) -> Result<()> {
        self.profile.with(|p| p.save_to(&self.store)).await?;
        tracing::debug!("Profile saved");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let config = match &cli.config {
        Some(path) => VaultConfig::load(path)?,
        None => VaultConfig::default(),
    };
    let password = cli.password.as_deref();
    let use_backup = cli.use_backup;

    match cli.command {
        Commands::Init {
            name,
            email,
            url,
            backup_password,
            iterations,
            force,
        } => {
            let password = require_password(password)?;
            let config = match iterations {
                Some(n) => config.with_iterations(n),
                None => config,
            };
            config.validate()?;

            let store = open_store(&data_dir)?;
            if store.get(PROFILE_KEY)?.is_some() && !force {
                bail!(
                    "A profile already exists in {}. Use --force to replace it.",
                    data_dir.display()
                );
            }

            let profile = SharedProfile::new(Profile::new(config));
            let metadata = ProfileMetadata {
                name: Some(name.clone()),
                email,
                url,
            };
            profile
                .create_new(password, metadata, backup_password)
                .await?;
            profile.with(|p| p.save_to(&store)).await?;

            let key = profile.with(|p| p.key_pub()).await?;
            println!("Profile created.");
            println!("  Name: {}", name);
            println!("  Signing key: {}", fingerprint(&key));
            println!("  Data directory: {}", data_dir.display());
        }

        Commands::Show => {
            let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
            let (metadata, key, accounts, pendings, backup) = vault
                .profile
                .with(|p| {
                    Ok((
                        p.metadata()?,
                        p.key_pub()?,
                        p.account_ids()?.len(),
                        p.pending_ids()?.len(),
                        p.has_backup(),
                    ))
                })
                .await?;

            println!("Profile:");
            println!("  Name: {}", metadata.name.as_deref().unwrap_or("(none)"));
            println!("  Email: {}", metadata.email.as_deref().unwrap_or("(none)"));
            println!("  URL: {}", metadata.url.as_deref().unwrap_or("(none)"));
            println!();
            println!("Signing key:");
            println!("  Id: {}", key.uid);
            println!("  Algorithm: {}", key.alg);
            println!("  Fingerprint: {}", fingerprint(&key));
            println!("  Expires: {}", format_time(key.expires_at));
            println!();
            println!("Accounts: {}", accounts);
            println!("Pending requests: {}", pendings);
            println!("Backup password: {}", if backup { "yes" } else { "no" });
        }

        Commands::Update { name, email, url } => {
            if name.is_none() && email.is_none() && url.is_none() {
                bail!("Nothing to update. Pass --name, --email or --url.");
            }
            let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
            vault
                .profile
                .with(|p| {
                    let mut metadata = p.metadata()?;
                    if name.is_some() {
                        metadata.name = name;
                    }
                    if email.is_some() {
                        metadata.email = email;
                    }
                    if url.is_some() {
                        metadata.url = url;
                    }
                    p.update_metadata(metadata)
                })
                .await?;
            vault.save().await?;
            println!("Profile updated.");
        }

        Commands::ExportKey => {
            let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
            let pem = vault.profile.with(|p| p.export_public_key_pem()).await?;
            print!("{}", pem);
        }

        Commands::Backup { output } => {
            let store = open_store(&data_dir)?;
            let bytes = store
                .get(PROFILE_KEY)?
                .with_context(|| format!("No profile in {}", data_dir.display()))?;
            let text = armor::armor(PROFILE_LABEL, &bytes, config.armor_width);
            write_block(output.as_deref(), &text).await?;
        }

        Commands::Restore { input, force } => {
            let text = read_block(input.as_deref()).await?;
            let bytes = armor::dearmor_expecting(&text, PROFILE_LABEL)?;
            // Reject anything that would not load later
            Profile::new(config).load(&bytes)?;

            let store = open_store(&data_dir)?;
            if store.get(PROFILE_KEY)?.is_some() && !force {
                bail!(
                    "A profile already exists in {}. Use --force to replace it.",
                    data_dir.display()
                );
            }
            store.set(PROFILE_KEY, &bytes)?;
            println!("Profile restored.");
        }

        Commands::Request { action } => match action {
            RequestAction::Create {
                receiver,
                nickname,
                url,
                email,
                message,
                output,
            } => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let (signed, width) = vault
                    .profile
                    .with(|p| {
                        let metadata = p.metadata()?;
                        let nickname = nickname.or(metadata.name).unwrap_or_default();
                        let url = url.or(metadata.url).unwrap_or_default();
                        let email = email.or(metadata.email);
                        let signed = relation::send_request(
                            p,
                            &receiver,
                            &nickname,
                            &url,
                            email.as_deref(),
                            message.as_deref(),
                        )?;
                        Ok((signed, p.config().armor_width))
                    })
                    .await?;
                vault.save().await?;

                let text = relation::armor_signed_message(&signed, width)?;
                write_block(output.as_deref(), &text).await?;
            }

            RequestAction::Inspect { input } => {
                let text = read_block(input.as_deref()).await?;
                let verified = relation::open_armored(&text)?;
                println!("Signature: valid");
                println!("Signer: {}", fingerprint(verified.signer()));
                match &verified.payload {
                    SignedPayload::RelationRequest(request) => {
                        println!("Type: relation request");
                        println!("  Id: {}", request.uid);
                        println!("  Nickname: {}", request.nickname);
                        println!("  URL: {}", request.url);
                        if let Some(email) = &request.email {
                            println!("  Email: {}", email);
                        }
                        if let Some(message) = &request.short_message {
                            println!("  Message: {}", message);
                        }
                        println!("  Created: {}", format_time(request.created_at));
                    }
                    SignedPayload::RelationResponse(response) => {
                        println!("Type: relation response");
                        println!("  Id: {}", response.uid);
                        println!("  Created: {}", format_time(response.created_at));
                    }
                }
            }

            RequestAction::Receive { input, label } => {
                let text = read_block(input.as_deref()).await?;
                let verified = relation::open_armored(&text)?;
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let added = vault
                    .profile
                    .with(|p| relation::receive_request(p, &verified, &label))
                    .await?;
                if !added {
                    bail!("This request is already pending or established.");
                }
                vault.save().await?;

                if let SignedPayload::RelationRequest(request) = &verified.payload {
                    println!("Pending request stored.");
                    println!("  Id: {}", request.uid);
                    println!("  From: {} ({})", request.nickname, request.url);
                    if let Some(message) = &request.short_message {
                        println!("  Message: {}", message);
                    }
                }
            }

            RequestAction::Accept {
                uid,
                nickname,
                url,
                email,
                message,
                output,
            } => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let (signed, width) = vault
                    .profile
                    .with(|p| {
                        let metadata = p.metadata()?;
                        let details = ResponseDetails {
                            nickname: nickname.or(metadata.name).unwrap_or_default(),
                            url: url.or(metadata.url).unwrap_or_default(),
                            email: email.or(metadata.email),
                            short_message: message,
                        };
                        let signed = relation::accept_request(p, &uid, details)?;
                        Ok((signed, p.config().armor_width))
                    })
                    .await?;
                vault.save().await?;

                let text = relation::armor_signed_message(&signed, width)?;
                write_block(output.as_deref(), &text).await?;
            }

            RequestAction::Complete { input } => {
                let text = read_block(input.as_deref()).await?;
                let verified = relation::open_armored(&text)?;
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let (uid, name) = vault
                    .profile
                    .with(|p| {
                        let uid = relation::complete_request(p, &verified)?;
                        let name = p.account(&uid)?.map(|a| a.name.clone()).unwrap_or_default();
                        Ok((uid, name))
                    })
                    .await?;
                vault.save().await?;
                println!("Relation established with {}.", name);
                println!("  Account: {}", uid);
            }

            RequestAction::Decline { uid } => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                if !vault
                    .profile
                    .with(|p| relation::decline_request(p, &uid))
                    .await?
                {
                    bail!("No pending request {}", uid);
                }
                vault.save().await?;
                println!("Request {} declined.", uid);
            }
        },

        Commands::Pending { action } => match action {
            PendingAction::List => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let pendings = vault.profile.with(|p| Ok(p.pendings()?.clone())).await?;
                if pendings.is_empty() {
                    println!("No pending requests.");
                }
                for (uid, pending) in &pendings {
                    let direction = if pending.is_outgoing() { "outgoing" } else { "incoming" };
                    println!("{}  {}  {}", uid, direction, pending.receiver_label);
                    println!(
                        "    {} ({}), created {}",
                        pending.request.nickname,
                        pending.request.url,
                        format_time(pending.request.created_at)
                    );
                }
            }

            PendingAction::Export { uid, output } => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let text = vault
                    .profile
                    .with(|p| relation::export_pending(p, &uid))
                    .await?;
                write_block(output.as_deref(), &text).await?;
            }

            PendingAction::Import { input } => {
                let text = read_block(input.as_deref()).await?;
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                if !vault
                    .profile
                    .with(|p| relation::import_pending(p, &text))
                    .await?
                {
                    bail!("A pending request or account with this id already exists.");
                }
                vault.save().await?;
                println!("Pending request imported.");
            }
        },

        Commands::Account { action } => match action {
            AccountAction::List => {
                let vault = Vault::unlock(&data_dir, config, password, use_backup).await?;
                let accounts = vault.profile.with(|p| Ok(p.accounts()?.clone())).await?;
                if accounts.is_empty() {
                    println!("No accounts.");
                }
                for (id, account) in &accounts {
                    println!("{}  {}", id, account.name);
                    if let Some(url) = &account.url {
                        println!("    URL: {}", url);
                    }
                    if let Some(email) = &account.email {
                        println!("    Email: {}", email);
                    }
                    println!("    Signing key: {}", fingerprint(&account.public_sign_key));
                    println!("    Established: {}", format_time(account.established_at));
                }
            }
        },
    }

    Ok(())
}
