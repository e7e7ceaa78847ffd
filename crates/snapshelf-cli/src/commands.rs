use std::path::Path;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use colored::Colorize;
use snapshelf_store::{has_more, Bucket, PhotoStore, StoreConfig};
use snapshelf_types::{NewPhoto, Photo, PhotoPatch, Principal};
use tracing::debug;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = StoreConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let store = PhotoStore::from_config(&config)?;
    debug!(
        photos = %store.buckets().photos,
        comments = %store.buckets().comments,
        "store configured"
    );
    let result = dispatch(&store, cli.command).await;
    // Uploads leave their index rewrite running; wait for it before exiting.
    store.flush_background().await;
    result
}

async fn dispatch(store: &PhotoStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Blobs(args) => cmd_blobs(store, args).await,
        Command::List(args) => cmd_list(store, args).await,
        Command::Show(args) => cmd_show(store, args).await,
        Command::Upload(args) => cmd_upload(store, args).await,
        Command::Comment(args) => cmd_comment(store, args).await,
        Command::DeletePhoto(args) => cmd_delete_photo(store, args).await,
        Command::DeleteComment(args) => cmd_delete_comment(store, args).await,
        Command::Edit(args) => cmd_edit(store, args).await,
    }
}

async fn cmd_blobs(store: &PhotoStore, args: BlobsArgs) -> anyhow::Result<()> {
    let bucket = match args.bucket {
        BucketArg::Photos => Bucket::Photos,
        BucketArg::Comments => Bucket::Comments,
    };
    let names = store.list_blobs(bucket).await?;
    if names.is_empty() {
        println!("No blobs.");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn cmd_list(store: &PhotoStore, args: ListArgs) -> anyhow::Result<()> {
    let photos = store.list_photos(args.offset, args.limit).await?;
    if photos.is_empty() {
        println!("No photos.");
        return Ok(());
    }
    for photo in &photos {
        println!(
            "{}  {}  {} ({} comments)",
            format!("#{}", photo.id).yellow().bold(),
            photo.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            photo.title.bold(),
            photo.comments.len(),
        );
    }
    if has_more(photos.len(), args.limit) {
        println!(
            "{}",
            format!("more: --offset {}", args.offset + photos.len()).dimmed()
        );
    }
    Ok(())
}

async fn cmd_show(store: &PhotoStore, args: ShowArgs) -> anyhow::Result<()> {
    let photo = store.get_photo(&args.id).await?;
    print_photo(&photo);
    Ok(())
}

async fn cmd_upload(store: &PhotoStore, args: UploadArgs) -> anyhow::Result<()> {
    let image = inline_image(&args.file)?;
    let owner = Principal::new(args.user.user_id, args.user.user_name);
    let mut input = NewPhoto::new(args.title, image);
    if let Some(description) = args.description {
        input = input.with_description(description);
    }
    let photo = store.create_photo(&owner, input).await?;
    println!("{} Uploaded photo {}", "✓".green().bold(), photo.id.yellow());
    println!("  Image: {}", photo.image_url.split('?').next().unwrap_or_default().blue());
    Ok(())
}

async fn cmd_comment(store: &PhotoStore, args: CommentArgs) -> anyhow::Result<()> {
    let author = Principal::new(args.user.user_id, args.user.user_name);
    let comment = store.add_comment(&args.photo_id, &author, &args.text).await?;
    println!(
        "{} Comment {} added to photo {}",
        "✓".green().bold(),
        comment.id.yellow(),
        comment.photo_id.yellow()
    );
    Ok(())
}

async fn cmd_delete_photo(store: &PhotoStore, args: DeletePhotoArgs) -> anyhow::Result<()> {
    let removed = store.delete_photo(&args.id, &caller(&args.owner)).await?;
    println!(
        "{} Deleted photo {} and {} comments",
        "✓".green().bold(),
        removed.id.yellow(),
        removed.comments.len()
    );
    Ok(())
}

async fn cmd_delete_comment(store: &PhotoStore, args: DeleteCommentArgs) -> anyhow::Result<()> {
    let removed = store.delete_comment(&args.id, &caller(&args.owner)).await?;
    println!("{} Deleted comment {}", "✓".green().bold(), removed.id.yellow());
    Ok(())
}

async fn cmd_edit(store: &PhotoStore, args: EditArgs) -> anyhow::Result<()> {
    let patch = PhotoPatch {
        title: args.title,
        description: args.description,
    };
    if patch.is_empty() {
        anyhow::bail!("nothing to change: pass --title and/or --description");
    }
    let photo = store.update_photo(&args.id, &caller(&args.owner), patch).await?;
    println!("{} Updated photo {}", "✓".green().bold(), photo.id.yellow());
    print_photo(&photo);
    Ok(())
}

fn caller(owner: &OwnerArgs) -> Principal {
    Principal::new(owner.user_id.clone(), String::new())
}

fn print_photo(photo: &Photo) {
    println!("{} {}", format!("#{}", photo.id).yellow().bold(), photo.title.bold());
    println!("  Owner: {} ({})", photo.owner_display_name, photo.owner_id.dimmed());
    println!("  Created: {}", photo.created_at.to_rfc3339());
    if let Some(description) = &photo.description {
        println!("  {description}");
    }
    for comment in &photo.comments {
        println!(
            "  {} {}: {}",
            format!("[{}]", comment.id).dimmed(),
            comment.owner_display_name.cyan(),
            comment.content
        );
    }
}

/// Read an image file into the `<media-type>;base64,<body>` form the store
/// accepts.
fn inline_image(path: &Path) -> anyhow::Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(format!(
        "{};base64,{}",
        media_type_for(path),
        BASE64_STANDARD.encode(bytes)
    ))
}

fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for(Path::new("a.PNG")), "image/png");
        assert_eq!(media_type_for(Path::new("a.webp")), "image/webp");
        assert_eq!(media_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type_for(Path::new("noext")), "image/jpeg");
    }

    #[test]
    fn inline_image_wraps_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.gif");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        assert_eq!(inline_image(&path).unwrap(), "image/gif;base64,AQID");
    }

    #[test]
    fn inline_image_missing_file() {
        let err = inline_image(Path::new("/nonexistent/x.png")).unwrap_err();
        assert!(err.to_string().contains("reading image"));
    }
}
