use crate::{
    info,
    paging::Aggregate,
    types::{AlbumTableRow, PlaylistTableRow, TrackRecord},
    utils, warning,
};

use super::{Options, connect, finish, print_json, print_table, spinner, tracks};

pub async fn playlists(opts: Options) {
    let client = connect(&opts, true).await;

    let pb = spinner("Fetching playlists...");
    let playlists = finish(pb, client.get_user_playlists().await, "playlists");

    if opts.json {
        print_json(&playlists.items);
        return;
    }
    print_table(
        playlists
            .items
            .into_iter()
            .map(|p| PlaylistTableRow {
                id: p.id,
                name: p.name,
                tracks: p.total,
            })
            .collect(),
    );
}

pub async fn albums(opts: Options) {
    let client = connect(&opts, true).await;

    let pb = spinner("Fetching saved albums...");
    let albums = finish(pb, client.get_user_albums().await, "saved albums");

    if opts.json {
        print_json(&albums.items);
        return;
    }
    print_table(
        albums
            .items
            .into_iter()
            .map(|a| AlbumTableRow {
                id: a.id,
                name: a.name,
                artists: a.artists.join(", "),
                year: a.year.unwrap_or_default(),
            })
            .collect(),
    );
}

/// Every track of the user's playlists, saved albums and liked tracks,
/// deduplicated by id and joined with audio features.
pub async fn library(opts: Options) {
    let client = connect(&opts, true).await;

    let pb = spinner("Fetching playlists...");
    let playlists = finish(pb, client.get_user_playlists().await, "playlists");
    let pb = spinner("Fetching saved albums...");
    let albums = finish(pb, client.get_user_albums().await, "saved albums");

    let mut all: Aggregate<TrackRecord> = Aggregate::default();

    for playlist in &playlists.items {
        let pb = spinner(&format!("Fetching tracks of {}...", playlist.name));
        all.extend(finish(
            pb,
            client.get_playlist_tracks(&playlist.id, None).await,
            &format!("tracks of playlist {}", playlist.name),
        ));
    }

    for album in &albums.items {
        let pb = spinner(&format!("Fetching tracks of {}...", album.name));
        let mut tracks = finish(
            pb,
            client.get_album_tracks(&album.id).await,
            &format!("tracks of album {}", album.name),
        );
        // album listings carry simplified tracks
        for track in &mut tracks.items {
            if track.album.is_none() {
                track.album = Some(album.name.clone());
            }
            if track.year.is_none() {
                track.year = album.year.clone();
            }
        }
        all.extend(tracks);
    }

    let pb = spinner("Fetching liked tracks...");
    all.extend(finish(pb, client.get_liked_tracks().await, "liked tracks"));

    let before = all.len();
    all.items.retain(|t| !t.is_unavailable());
    utils::dedupe_by_key(&mut all.items, |t| t.id.clone());
    info!(
        "{} unique tracks ({} duplicates or unavailable dropped)",
        all.len(),
        before - all.len()
    );
    if !all.is_complete() {
        warning!("{} failures while collecting the library", all.failures.len());
    }

    let pb = spinner("Fetching audio features...");
    let featured = finish(
        pb,
        client.enrich_tracks(all.into_items()).await,
        "enriched tracks",
    );
    tracks::show_featured(&featured.items, opts);
}
