use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use spotcollect::{
    cli::{self, Options},
    config,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Print results as JSON on stdout
    #[clap(long, global = true)]
    json: bool,

    /// Abort on the first failed page, chunk or item
    #[clap(long, global = true)]
    fail_fast: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API and cache the refresh token
    Auth(AuthOptions),

    /// Find the best matching track for a title and artist
    Search(SearchOptions),

    /// List the tracks of a playlist
    Playlist(PlaylistOptions),

    /// List the tracks of an album
    Album(AlbumOptions),

    /// List your liked tracks
    Liked(LikedOptions),

    /// List your playlists
    Playlists,

    /// List your saved albums
    Albums,

    /// Show audio features for track ids
    Features(FeaturesOptions),

    /// Collect every track of your library with audio features
    Library,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Drop the cached refresh token and consent again
    #[clap(long)]
    pub fresh: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    pub title: String,
    pub artist: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PlaylistOptions {
    pub id: String,

    /// Stop after this many pages of 100 tracks
    #[clap(long)]
    pub pages: Option<usize>,

    /// Join every track with its audio features
    #[clap(long)]
    pub features: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AlbumOptions {
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct LikedOptions {
    /// Join every track with its audio features
    #[clap(long)]
    pub features: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct FeaturesOptions {
    /// Track ids, separated by spaces or commas
    #[clap(required = true)]
    pub ids: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    config::load_env();

    let cli = Cli::parse();
    let opts = Options {
        json: cli.json,
        fail_fast: cli.fail_fast,
    };

    match cli.command {
        Command::Auth(opt) => cli::auth(opt.fresh, opts).await,
        Command::Search(opt) => cli::search(opt.title, opt.artist, opts).await,
        Command::Playlist(opt) => cli::playlist(opt.id, opt.pages, opt.features, opts).await,
        Command::Album(opt) => cli::album(opt.id, opts).await,
        Command::Liked(opt) => cli::liked(opt.features, opts).await,
        Command::Playlists => cli::playlists(opts).await,
        Command::Albums => cli::albums(opts).await,
        Command::Features(opt) => cli::features(opt.ids, opts).await,
        Command::Library => cli::library(opts).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
