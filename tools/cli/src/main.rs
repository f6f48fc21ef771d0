//! gdshare CLI - share files through a single Google Drive folder.
//!
//! Uploads files to the configured folder and prints their view link,
//! lists what the folder holds, and deletes files past the retention limit.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gdshare_common::FolderId;
use gdshare_folder::{FolderFileManager, ShareConfig};
use gdshare_storage::gdrive::{CredentialProvider, DriveClient};

#[derive(Parser)]
#[command(name = "gdshare")]
#[command(about = "gdshare - Upload, list and expire files in a Google Drive folder")]
#[command(version)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["upload", "delete_old", "show", "list", "folders", "get"]),
))]
struct Cli {
    /// Upload a file to the folder and print its view link.
    #[arg(short = 'u', long, value_name = "PATH")]
    upload: Option<PathBuf>,

    /// Delete files in the folder older than the retention limit.
    #[arg(short = 'd', long)]
    delete_old: bool,

    /// Show the files in the folder.
    #[arg(short = 's', long)]
    show: bool,

    /// List files across the whole drive.
    #[arg(
        short = 'l',
        long,
        value_name = "PAGE_SIZE",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    list: Option<Option<u32>>,

    /// List every folder with its ID.
    #[arg(short = 'f', long)]
    folders: bool,

    /// Show a single file by ID.
    #[arg(short = 'g', long, value_name = "FILE_ID")]
    get: Option<String>,

    /// Config file (default: ./gdshare.json, then the user config dir).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Folder ID, overriding the config file.
    #[arg(long)]
    folder_id: Option<String>,

    /// Retention limit in days for --delete-old.
    #[arg(long)]
    max_days: Option<u32>,

    /// Description attached to uploads.
    #[arg(long)]
    description: Option<String>,

    /// Client-secret file.
    #[arg(long, value_name = "PATH")]
    credentials: Option<PathBuf>,

    /// Token file.
    #[arg(long, value_name = "PATH")]
    token: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

/// The single operation a run performs.
#[derive(Debug, PartialEq)]
enum Action {
    Upload(PathBuf),
    DeleteOld,
    Show,
    List(Option<u32>),
    Folders,
    Get(String),
}

impl Cli {
    fn action(&self) -> Action {
        if let Some(path) = &self.upload {
            Action::Upload(path.clone())
        } else if self.delete_old {
            Action::DeleteOld
        } else if let Some(page_size) = self.list {
            Action::List(page_size)
        } else if self.folders {
            Action::Folders
        } else if let Some(id) = &self.get {
            Action::Get(id.clone())
        } else {
            Action::Show
        }
    }

    /// Apply command-line overrides on top of the loaded configuration.
    fn apply_overrides(&self, config: &mut ShareConfig) -> Result<()> {
        if let Some(id) = &self.folder_id {
            config.folder_id = Some(FolderId::new(id.as_str()).context("Invalid --folder-id")?);
        }
        if let Some(days) = self.max_days {
            config.max_days = days;
        }
        if let Some(description) = &self.description {
            config.description = description.clone();
        }
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(path) = &self.token {
            config.token_path = path.clone();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    // Reports go to stdout; keep diagnostics on stderr.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ShareConfig::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config)?;

    let folder_id = config.folder_id()?;
    let manager = connect(&config, folder_id).await?;

    match cli.action() {
        Action::Upload(path) => cmd_upload(&manager, &path, &config.description).await,
        Action::DeleteOld => cmd_delete_old(&manager, &config).await,
        Action::Show => cmd_show(&manager).await,
        Action::List(page_size) => {
            cmd_list(&manager, page_size.unwrap_or(config.list_page_size)).await
        }
        Action::Folders => cmd_folders(&manager).await,
        Action::Get(id) => cmd_get(&manager, &id).await,
    }
}

/// Authorize and build the folder manager.
///
/// Nothing runs unless authorization fully succeeds.
async fn connect(config: &ShareConfig, folder_id: FolderId) -> Result<FolderFileManager> {
    let provider = CredentialProvider::new(&config.credentials_path, config.token_path.clone())
        .context("Unable to load credentials")?;
    let token_manager = provider
        .authorize()
        .await
        .context("Unable to authorise connection")?;
    let client = DriveClient::new(token_manager).context("Failed to create Drive client")?;

    Ok(FolderFileManager::new(Arc::new(client), folder_id))
}

/// Upload a file and print its link.
async fn cmd_upload(manager: &FolderFileManager, path: &PathBuf, description: &str) -> Result<ExitCode> {
    info!("Uploading {} to folder {}", path.display(), manager.folder_id());

    let outcome = manager.upload_file(path, description).await;
    println!("{}", outcome);

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Purge expired files and print the report.
async fn cmd_delete_old(manager: &FolderFileManager, config: &ShareConfig) -> Result<ExitCode> {
    let policy = config.retention()?;
    info!("Deleting files at least {} days old", policy.max_days());

    let report = manager
        .purge_expired_files(policy)
        .await
        .context("Failed to list folder")?;
    print!("{}", report);

    Ok(ExitCode::SUCCESS)
}

/// Show the folder's files.
async fn cmd_show(manager: &FolderFileManager) -> Result<ExitCode> {
    let report = manager
        .list_folder_contents()
        .await
        .context("Failed to list folder")?;
    print!("{}", report);

    Ok(ExitCode::SUCCESS)
}

/// List files drive-wide.
async fn cmd_list(manager: &FolderFileManager, page_size: u32) -> Result<ExitCode> {
    let report = manager
        .list_files(page_size)
        .await
        .context("Failed to list files")?;
    print!("{}", report);

    Ok(ExitCode::SUCCESS)
}

async fn cmd_folders(manager: &FolderFileManager) -> Result<ExitCode> {
    let report = manager
        .list_folders()
        .await
        .context("Failed to list folders")?;
    print!("{}", report);

    Ok(ExitCode::SUCCESS)
}

async fn cmd_get(manager: &FolderFileManager, id: &str) -> Result<ExitCode> {
    let line = manager.get_file(id).await.context("Failed to get file")?;
    println!("{}", line);

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("gdshare").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_single_letter_flags() {
        assert_eq!(
            parse(&["-u", "report.pdf"]).unwrap().action(),
            Action::Upload(PathBuf::from("report.pdf"))
        );
        assert_eq!(parse(&["-d"]).unwrap().action(), Action::DeleteOld);
        assert_eq!(parse(&["-s"]).unwrap().action(), Action::Show);
        assert_eq!(parse(&["-l"]).unwrap().action(), Action::List(None));
        assert_eq!(parse(&["-l", "25"]).unwrap().action(), Action::List(Some(25)));
        assert_eq!(parse(&["-f"]).unwrap().action(), Action::Folders);
        assert_eq!(parse(&["-g", "abc"]).unwrap().action(), Action::Get("abc".to_string()));
    }

    #[test]
    fn test_missing_command_is_an_error() {
        let err = parse(&[]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let err = parse(&["-x"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_commands_are_exclusive() {
        let err = parse(&["-d", "-s"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = parse(&["-l", "0"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_upload_requires_path() {
        assert!(parse(&["-u"]).is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = parse(&[
            "-d",
            "--folder-id",
            "F9",
            "--max-days",
            "14",
            "--token",
            "/tmp/t.json",
        ])
        .unwrap();

        let mut config = ShareConfig::default();
        cli.apply_overrides(&mut config).unwrap();

        assert_eq!(config.folder_id().unwrap().as_str(), "F9");
        assert_eq!(config.max_days, 14);
        assert_eq!(config.token_path, PathBuf::from("/tmp/t.json"));
        assert_eq!(config.credentials_path, PathBuf::from("credentials.json"));
    }

    #[test]
    fn test_blank_folder_override_rejected() {
        let cli = parse(&["-s", "--folder-id", " "]).unwrap();
        let mut config = ShareConfig::default();
        assert!(cli.apply_overrides(&mut config).is_err());
    }
}
