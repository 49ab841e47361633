//! thumbkit — generate thumbnails and avatars for local files.
//!
//! Configuration comes from the environment (see `ThumbConfig::from_env`);
//! a `.env` file in the working directory is honoured.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thumbkit_cli::{init_tracing, LocalMetadata, StaticUrlProvider};
use thumbkit_core::{DeploymentMode, SourceFile, ThumbConfig};
use thumbkit_processing::{StrategyRegistry, Thumb, ThumbnailService, TokioProcessRunner};
use thumbkit_storage::LocalStorage;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "thumbkit", about = "Thumbnail generation for stored files")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the thumbnail of a file
    Generate {
        /// Path to the source file
        file: PathBuf,
        /// Directory, relative to the source file, receiving the thumbnail
        #[arg(long, default_value = ".thumbs")]
        thumb_dir: String,
        /// Thumbnail width in pixels
        #[arg(long)]
        width: Option<u32>,
        /// Thumbnail height in pixels
        #[arg(long)]
        height: Option<u32>,
        /// Owner id used in the thumbnail file name
        #[arg(long, default_value = "0")]
        owner: u64,
        /// Public URL of the file, needed by the remote document viewer
        #[arg(long)]
        public_url: Option<String>,
    },
    /// List the extensions this deployment can thumbnail
    Extensions,
    /// Create small, medium and large avatars from an image
    Avatar {
        /// Path to a JPEG, PNG or GIF image
        image: PathBuf,
        /// Owner id used in the avatar file names
        #[arg(long)]
        owner: u64,
        /// Output directory
        #[arg(long, default_value = "avatars")]
        out_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct GenerateOutput {
    source: String,
    thumbnail: Option<PathBuf>,
    picture_info: Option<String>,
}

#[derive(Serialize)]
struct AvatarOutput {
    files: Vec<PathBuf>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Split a path into the directory used as storage root and the file name key.
fn split_source(file: &Path) -> anyhow::Result<(PathBuf, String)> {
    let name = file
        .file_name()
        .context("Source path has no file name")?
        .to_string_lossy()
        .to_string();
    let root = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, name))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            trigger.cancel();
        }
    });
    cancel
}

async fn generate(
    config: ThumbConfig,
    file: PathBuf,
    thumb_dir: String,
    owner: u64,
    public_url: Option<String>,
) -> anyhow::Result<()> {
    let (root, name) = split_source(&file)?;
    let len = tokio::fs::metadata(&file)
        .await
        .with_context(|| format!("Failed to stat {}", file.display()))?
        .len();

    let storage = LocalStorage::new(&root)
        .await
        .with_context(|| format!("Failed to open {}", root.display()))?;

    let runner = Arc::new(TokioProcessRunner::new(config.process_timeout));
    let registry = StrategyRegistry::from_config(&config, runner)
        .context("Failed to build thumbnail strategies")?;

    let service = ThumbnailService::new(
        Arc::new(storage),
        Arc::new(LocalMetadata::new(thumb_dir)),
        Arc::new(StaticUrlProvider::new(public_url)),
        Arc::new(registry),
        config,
    );

    let mut source = SourceFile {
        id: 0,
        owner_id: owner,
        name: name.clone(),
        size: len,
        source_name: name,
        picture_info: None,
    };

    let artifact = service
        .ensure_thumbnail(&mut source, true, &cancel_on_ctrl_c())
        .await;

    print_json(&GenerateOutput {
        source: file.display().to_string(),
        thumbnail: artifact.as_ref().map(|a| root.join(&a.path)),
        picture_info: source.picture_info,
    })?;

    if artifact.is_none() {
        anyhow::bail!("No thumbnail generated for {}", file.display());
    }
    Ok(())
}

async fn avatar(
    config: ThumbConfig,
    image: PathBuf,
    owner: u64,
    out_dir: PathBuf,
) -> anyhow::Result<()> {
    let data = tokio::fs::read(&image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let thumb = Thumb::decode(&data, &image.to_string_lossy())
        .with_context(|| format!("Failed to decode {}", image.display()))?;

    let storage = LocalStorage::new(&out_dir)
        .await
        .with_context(|| format!("Failed to open {}", out_dir.display()))?;

    let keys = thumb
        .create_avatar(&storage, owner, "", config.avatar_sizes)
        .await
        .context("Failed to write avatars")?;

    print_json(&AvatarOutput {
        files: keys.iter().map(|k| out_dir.join(k)).collect(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = ThumbConfig::from_env().context("Invalid thumbnail configuration")?;

    match cli.command {
        Commands::Generate {
            file,
            thumb_dir,
            width,
            height,
            owner,
            public_url,
        } => {
            // There is no settings store for local files; use the static size.
            config.mode = DeploymentMode::Slave;
            match (width, height) {
                (Some(w), Some(h)) => {
                    config.max_width = w;
                    config.max_height = h;
                    config.validate().context("Invalid thumbnail size")?;
                }
                (None, None) => {}
                _ => anyhow::bail!("--width and --height must be given together"),
            }
            generate(config, file, thumb_dir, owner, public_url).await?;
        }
        Commands::Extensions => {
            let runner = Arc::new(TokioProcessRunner::new(config.process_timeout));
            let registry = StrategyRegistry::from_config(&config, runner)
                .context("Failed to build thumbnail strategies")?;
            print_json(&registry.supported_extensions())?;
        }
        Commands::Avatar {
            image,
            owner,
            out_dir,
        } => {
            avatar(config, image, owner, out_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_source() {
        let (root, name) = split_source(Path::new("/data/photos/cat.png")).unwrap();
        assert_eq!(root, PathBuf::from("/data/photos"));
        assert_eq!(name, "cat.png");

        let (root, name) = split_source(Path::new("cat.png")).unwrap();
        assert_eq!(root, PathBuf::from("."));
        assert_eq!(name, "cat.png");
    }

    fn local_config(width: u32, height: u32) -> ThumbConfig {
        ThumbConfig {
            mode: DeploymentMode::Slave,
            max_width: width,
            max_height: height,
            ..ThumbConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_writes_thumbnail_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cat.png");
        image::DynamicImage::new_rgb8(80, 60).save(&file).unwrap();

        generate(local_config(40, 40), file, ".thumbs".to_string(), 7, None)
            .await
            .unwrap();

        let png = std::fs::read(dir.path().join(".thumbs/7_cat.png._thumb")).unwrap();
        let thumb = image::load_from_memory(&png).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (40, 40));
    }

    #[tokio::test]
    async fn test_generate_unsupported_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.xyz");
        std::fs::write(&file, b"plain text").unwrap();

        let err = generate(local_config(40, 40), file, ".thumbs".to_string(), 7, None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("No thumbnail generated"), "{}", err);
        assert!(!dir.path().join(".thumbs").exists());
    }

    #[tokio::test]
    async fn test_avatar_writes_three_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("face.png");
        image::DynamicImage::new_rgb8(300, 200).save(&image_path).unwrap();
        let out_dir = dir.path().join("avatars");

        avatar(ThumbConfig::default(), image_path, 5, out_dir.clone())
            .await
            .unwrap();

        for (index, side) in ThumbConfig::default().avatar_sizes.into_iter().enumerate() {
            let png = std::fs::read(out_dir.join(format!("avatar_5_{}.png", index))).unwrap();
            let avatar = image::load_from_memory(&png).unwrap();
            assert_eq!((avatar.width(), avatar.height()), (side, side));
        }
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "thumbkit", "generate", "a.png", "--width", "64", "--height", "48",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { width, height, .. } => {
                assert_eq!((width, height), (Some(64), Some(48)));
            }
            _ => panic!("expected generate"),
        }
    }
}
