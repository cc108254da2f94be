use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use object_torrent::torrent::{load_torrent_file, DEFAULT_PIECE_LENGTH};
use object_torrent::{
    FileStore, ObjectId, TorrentBuilder, TorrentConfig, TorrentReader, TorrentSettings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

#[derive(Parser)]
#[command(name = "object-torrent")]
#[command(about = "Generate BitTorrent metainfo for stored objects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a local file as an object write and store its torrent metadata
    Seed {
        /// File holding the object's content
        file: PathBuf,

        /// Bucket the object belongs to
        #[arg(short, long, default_value = "local")]
        bucket: String,

        /// Object name (defaults to the file name)
        #[arg(short, long)]
        object: Option<String>,

        /// Directory holding stored torrent metadata
        #[arg(short, long, default_value = "./torrent-store")]
        store: PathBuf,

        /// Size of each simulated write call
        #[arg(long, default_value = "65536")]
        chunk_size: usize,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Produce the .torrent document for a seeded object
    Get {
        /// Bucket the object belongs to
        #[arg(short, long, default_value = "local")]
        bucket: String,

        /// Object name
        #[arg(short, long)]
        object: String,

        /// Directory holding stored torrent metadata
        #[arg(short, long, default_value = "./torrent-store")]
        store: PathBuf,

        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show information about a torrent file
    Show {
        /// Path to the .torrent file
        torrent: PathBuf,
    },
}

/// Torrent settings, as the gateway would read them from its configuration
#[derive(Args)]
struct SettingsArgs {
    /// Bytes per piece
    #[arg(long, default_value_t = DEFAULT_PIECE_LENGTH)]
    piece_length: u64,

    /// Comma-separated tracker URLs
    #[arg(long, default_value = "")]
    tracker: String,

    /// Tracker used when no tracker list is configured
    #[arg(long, default_value = "")]
    origin: String,

    #[arg(long, default_value = "")]
    comment: String,

    #[arg(long, default_value = "")]
    created_by: String,

    #[arg(long, default_value = "")]
    encoding: String,
}

impl SettingsArgs {
    fn to_config(&self) -> Result<TorrentConfig> {
        let settings = TorrentSettings {
            piece_length: self.piece_length,
            tracker: self.tracker.clone(),
            origin: self.origin.clone(),
            comment: self.comment.clone(),
            created_by: self.created_by.clone(),
            encoding: self.encoding.clone(),
        };
        Ok(TorrentConfig::from_settings(&settings)?)
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Seed {
                file,
                bucket,
                object,
                store,
                chunk_size,
                settings,
            } => {
                let name = match object {
                    Some(name) => name.clone(),
                    None => file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .context("cannot derive an object name from the file path")?,
                };
                let object = ObjectId::new(bucket.clone(), name);
                self.seed(file, object, store, *chunk_size, settings).await?;
            }

            Commands::Get {
                bucket,
                object,
                store,
                output,
                settings,
            } => {
                let object = ObjectId::new(bucket.clone(), object.clone());
                self.get(object, store, output.as_deref(), settings).await?;
            }

            Commands::Show { torrent } => {
                self.show_torrent_info(torrent).await?;
            }
        }

        Ok(())
    }

    async fn seed(
        &self,
        path: &Path,
        object: ObjectId,
        store_dir: &Path,
        chunk_size: usize,
        settings: &SettingsArgs,
    ) -> Result<()> {
        anyhow::ensure!(chunk_size > 0, "chunk size must be positive");

        let config = settings.to_config()?;
        let store = Arc::new(FileStore::open(store_dir).await?);
        let mut file = File::open(path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;

        let mut builder = TorrentBuilder::new(config, object.clone(), store);
        builder.start();

        let mut buffer = vec![0u8; chunk_size];
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            builder.accept(Bytes::copy_from_slice(&buffer[..n]))?;
        }

        let fragment = builder.finalize().await?;
        info!(
            "Seeded {}: {} bytes, {} pieces, info hash {}",
            object,
            fragment.length,
            fragment.pieces.len(),
            hex::encode(fragment.info_hash()?)
        );
        Ok(())
    }

    async fn get(
        &self,
        object: ObjectId,
        store_dir: &Path,
        output: Option<&Path>,
        settings: &SettingsArgs,
    ) -> Result<()> {
        let config = settings.to_config()?;
        let store = Arc::new(FileStore::open(store_dir).await?);
        let reader = TorrentReader::new(store);

        let document = match reader.get_torrent(&config, &object).await {
            Err(err) if err.is_not_found() => {
                anyhow::bail!("no torrent available for {}", object)
            }
            other => other?,
        };

        match output {
            Some(path) => {
                tokio::fs::write(path, &document)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                info!("Wrote {} byte torrent to {}", document.len(), path.display());
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&document).await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    async fn show_torrent_info(&self, torrent_path: &Path) -> Result<()> {
        let (document, info_hash) = load_torrent_file(torrent_path).await?;
        let fields = &document.fields;
        let info = &document.info;

        println!("Torrent Information");
        println!("==================");
        println!("Name: {}", info.name);
        if let Some(announce) = &fields.announce {
            println!("Tracker: {}", announce);
        }
        println!("Total Size: {} bytes", info.length);
        println!("Piece Length: {} bytes", info.piece_length);
        println!("Number of Pieces: {}", info.pieces.len());
        println!("Info Hash: {}", hex::encode(info_hash));
        println!("Creation Date: {}", fields.creation_date);
        if let Some(comment) = &fields.comment {
            println!("Comment: {}", comment);
        }
        if let Some(created_by) = &fields.created_by {
            println!("Created By: {}", created_by);
        }
        if let Some(encoding) = &fields.encoding {
            println!("Encoding: {}", encoding);
        }

        if !fields.announce_list.is_empty() {
            println!("\nTrackers:");
            for (tier, trackers) in fields.announce_list.iter().enumerate() {
                println!("  Tier {}:", tier + 1);
                for tracker in trackers {
                    println!("    - {}", tracker);
                }
            }
        }

        Ok(())
    }
}
