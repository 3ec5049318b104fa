use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
mod auth;
use mastervault::content::ContentCipher;
use mastervault::session::PassphraseSession;
use mastervault::worker::TaskSlot;
use mastervault::{KdfParams, Settings, Vault};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroizing;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> Result<KdfParams> {
        let default = KdfParams::default();

        let kdf = KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?;
        Ok(kdf)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "mastervault")]
#[command(
    version,
    about = "Passphrase-protected master secret with encrypted attachment previews."
)]
struct Cli {
    /// Directory holding the vault record and preferences
    #[arg(long, global = true, value_name = "DIR", env = "MASTERVAULT_DIR")]
    dir: Option<PathBuf>,

    /// Log filter used when MASTERVAULT_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates a new master secret
    Init {
        /// Store the secret without passphrase protection
        #[arg(long)]
        no_passphrase: bool,

        /// Recovery hint shown when asking for the passphrase
        #[arg(long, conflicts_with = "no_passphrase")]
        hint: Option<String>,

        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Checks the passphrase against the stored record
    Unlock,

    /// Re-encrypts the master secret under a new passphrase
    ChangePassphrase {
        /// New recovery hint (2 to 12 UTF-16 units)
        #[arg(long)]
        hint: String,
    },

    /// Removes passphrase protection
    DisablePassphrase,

    /// Prints the recovery hint
    Hint,

    /// Shows information about the vault
    Info,

    /// Encrypts a file under the master secret
    #[command(arg_required_else_help = true)]
    Encrypt { input: PathBuf, output: PathBuf },

    /// Decrypts a file produced by `encrypt`
    #[command(arg_required_else_help = true)]
    Decrypt {
        input: PathBuf,

        /// Write plaintext here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Writes a JPEG preview of an encrypted image
    #[command(arg_required_else_help = true)]
    Thumbnail {
        input: PathBuf,

        #[arg(long, default_value = "image/jpeg")]
        content_type: String,

        /// Longest edge of the preview in pixels
        #[arg(long)]
        max_dimension: Option<u32>,

        #[arg(long)]
        out: PathBuf,
    },
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_env("MASTERVAULT_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn open_vault(dir: Option<PathBuf>, settings: Settings) -> Result<Vault> {
    match dir {
        Some(dir) => Ok(Vault::open_in(&dir, settings)),
        None => Vault::open_default(settings).context("could not open the default vault directory"),
    }
}

/// The current passphrase, or an empty one while protection is disabled.
fn current_password(vault: &Vault) -> Result<Zeroizing<String>> {
    if vault.is_password_disabled()? {
        return Ok(Zeroizing::new(String::new()));
    }
    let hint = vault.hint()?;
    auth::read_password(Some(hint.as_str()))
}

async fn unlocked_session(vault: Vault) -> Result<PassphraseSession> {
    let password = current_password(&vault)?;

    let session = PassphraseSession::new(Arc::new(vault), TaskSlot::current()?);
    session.unlock(password).await?;
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(&args.log, args.log_format);

    match args.command {
        Commands::Init {
            no_passphrase,
            hint,
            argon2,
        } => {
            let settings = Settings::default().with_kdf(argon2.to_kdf_params()?);
            let vault = open_vault(args.dir, settings)?;

            if no_passphrase {
                vault.initialize(None, None)?;
                println!("vault initialized without passphrase");
            } else {
                let password = auth::read_password(None)?;
                vault.initialize(Some(password.as_str()), hint.as_deref())?;
                println!("vault initialized");
            }
        }
        Commands::Unlock => {
            let vault = open_vault(args.dir, Settings::default())?;
            let session = unlocked_session(vault).await?;
            session.invalidate();
            println!("passphrase accepted");
        }
        Commands::ChangePassphrase { hint } => {
            let vault = open_vault(args.dir, Settings::default())?;
            let old = current_password(&vault)?;
            let new = auth::read_new_password_with_confirmation()?;

            let session = PassphraseSession::new(Arc::new(vault), TaskSlot::current()?);
            session
                .change_passphrase(old, new, hint)
                .await
                .context("passphrase was not changed")?;
            println!("passphrase changed");
        }
        Commands::DisablePassphrase => {
            let vault = open_vault(args.dir, Settings::default())?;
            let password = current_password(&vault)?;
            vault.disable_passphrase(&password)?;
            println!("passphrase protection disabled");
        }
        Commands::Hint => {
            let vault = open_vault(args.dir, Settings::default())?;
            let hint = vault.hint()?;
            if hint.is_empty() {
                println!("no hint set");
            } else {
                println!("{hint}");
            }
        }
        Commands::Info => {
            let vault = open_vault(args.dir, Settings::default())?;
            let record = vault.record()?;
            let prefs = vault.preferences()?;
            let kdf = record.kdf();

            println!("Record version:     {}", record.version());
            println!(
                "KDF:                argon2id (mem {} KiB, time {}, parallelism {})",
                kdf.mem_cost_kib(),
                kdf.time_cost(),
                kdf.parallelism()
            );
            println!("Password disabled:  {}", prefs.password_disabled);
            println!(
                "Hint set:           {}",
                if prefs.hint.is_empty() { "no" } else { "yes" }
            );
            match prefs.passphrase_changed_at {
                Some(at) => println!("Passphrase changed: {}", at.to_rfc3339()),
                None => println!("Passphrase changed: never"),
            }
        }
        Commands::Encrypt { input, output } => {
            let vault = open_vault(args.dir, Settings::default())?;
            let cipher = ContentCipher::new(vault.settings().max_content_bytes());
            let mut plaintext = Zeroizing::new(Vec::new());
            std::fs::File::open(&input)
                .and_then(|mut f| f.read_to_end(&mut plaintext))
                .with_context(|| format!("reading {}", input.display()))?;

            let session = unlocked_session(vault).await?;
            let secret = session.secret()?;
            let blob = cipher.encrypt(&secret, &plaintext)?;
            std::fs::write(&output, blob)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("encrypted {} bytes", plaintext.len());
        }
        Commands::Decrypt { input, out } => {
            let vault = open_vault(args.dir, Settings::default())?;
            let cipher = ContentCipher::new(vault.settings().max_content_bytes());
            let session = unlocked_session(vault).await?;
            let secret = session.secret()?;

            let plaintext = cipher
                .decrypt_file(&secret, &input)
                .with_context(|| format!("decrypting {}", input.display()))?;
            match out {
                Some(path) => std::fs::write(&path, &*plaintext)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(&plaintext)?,
            }
        }
        Commands::Thumbnail {
            input,
            content_type,
            max_dimension,
            out,
        } => {
            let vault = open_vault(args.dir, Settings::default())?;
            let session = unlocked_session(vault).await?;

            let Some(thumb) = session
                .thumbnail(input.clone(), content_type.clone(), max_dimension)
                .await
                .with_context(|| format!("thumbnail of {}", input.display()))?
            else {
                println!("no thumbnail for content type {content_type}");
                return Ok(());
            };

            let (width, height) = (thumb.width(), thumb.height());
            let mut jpeg = Vec::new();
            thumb.into_output_stream()?.read_to_end(&mut jpeg)?;
            std::fs::write(&out, jpeg).with_context(|| format!("writing {}", out.display()))?;
            println!("thumbnail {width}x{height} written to {}", out.display());
        }
    }

    Ok(())
}
