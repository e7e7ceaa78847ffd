use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "snapshelf",
    about = "Photo collection persisted as object store snapshots",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with bucket URLs; SNAPSHELF_* variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BucketArg {
    Photos,
    Comments,
}

#[derive(Subcommand)]
pub enum Command {
    /// List raw blob names in a bucket
    Blobs(BlobsArgs),
    /// List photos, newest first
    List(ListArgs),
    /// Show one photo with its comments
    Show(ShowArgs),
    /// Upload an image file as a new photo
    Upload(UploadArgs),
    /// Comment on a photo
    Comment(CommentArgs),
    /// Delete one of your photos and its comments
    DeletePhoto(DeletePhotoArgs),
    /// Delete one of your comments
    DeleteComment(DeleteCommentArgs),
    /// Change the title or description of one of your photos
    Edit(EditArgs),
}

/// The acting user, as an upstream identity provider would supply it.
#[derive(Args, Clone, Debug)]
pub struct UserArgs {
    #[arg(long)]
    pub user_id: String,
    #[arg(long)]
    pub user_name: String,
}

/// Only the id matters for ownership checks.
#[derive(Args, Clone, Debug)]
pub struct OwnerArgs {
    #[arg(long)]
    pub user_id: String,
}

#[derive(Args)]
pub struct BlobsArgs {
    #[arg(value_enum)]
    pub bucket: BucketArg,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value = "0")]
    pub offset: usize,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct UploadArgs {
    pub file: PathBuf,
    #[arg(short, long)]
    pub title: String,
    #[arg(short, long)]
    pub description: Option<String>,
    #[command(flatten)]
    pub user: UserArgs,
}

#[derive(Args)]
pub struct CommentArgs {
    pub photo_id: String,
    pub text: String,
    #[command(flatten)]
    pub user: UserArgs,
}

#[derive(Args)]
pub struct DeletePhotoArgs {
    pub id: String,
    #[command(flatten)]
    pub owner: OwnerArgs,
}

#[derive(Args)]
pub struct DeleteCommentArgs {
    pub id: String,
    #[command(flatten)]
    pub owner: OwnerArgs,
}

#[derive(Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(short, long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    #[command(flatten)]
    pub owner: OwnerArgs,
}
