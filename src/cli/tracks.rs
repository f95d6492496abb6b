use crate::{
    SpotifyClient, error,
    paging::Aggregate,
    success,
    types::{FeatureTableRow, FeaturedTrack, TrackRecord, TrackTableRow},
    warning,
};

use super::{Options, connect, finish, print_json, print_table, spinner};

pub async fn search(title: String, artist: String, opts: Options) {
    let client = connect(&opts, false).await;

    match client.search_track(&title, &artist).await {
        Ok(Some(track)) => {
            if opts.json {
                print_json(&track);
            } else {
                print_table(vec![track_row(&track)]);
            }
        }
        Ok(None) => warning!("No track found for {} by {}", title, artist),
        Err(e) => error!("Search failed. Err: {}", e),
    }
}

pub async fn playlist(id: String, pages: Option<usize>, with_features: bool, opts: Options) {
    let client = connect(&opts, false).await;

    let pb = spinner("Fetching playlist tracks...");
    let tracks = finish(pb, client.get_playlist_tracks(&id, pages).await, "tracks");

    show_tracks(&client, tracks, with_features, opts).await;
}

pub async fn album(id: String, opts: Options) {
    let client = connect(&opts, false).await;

    let pb = spinner("Fetching album tracks...");
    let tracks = finish(pb, client.get_album_tracks(&id).await, "tracks");

    show_tracks(&client, tracks, false, opts).await;
}

pub async fn liked(with_features: bool, opts: Options) {
    let client = connect(&opts, true).await;

    let pb = spinner("Fetching liked tracks...");
    let tracks = finish(pb, client.get_liked_tracks().await, "liked tracks");

    show_tracks(&client, tracks, with_features, opts).await;
}

async fn show_tracks(
    client: &SpotifyClient,
    tracks: Aggregate<TrackRecord>,
    with_features: bool,
    opts: Options,
) {
    if !with_features {
        if opts.json {
            print_json(&tracks.items);
        } else {
            print_table(tracks.items.iter().map(track_row).collect());
        }
        return;
    }

    let pb = spinner("Fetching audio features...");
    let featured = finish(
        pb,
        client.enrich_tracks(tracks.into_items()).await,
        "enriched tracks",
    );
    show_featured(&featured.items, opts);
}

pub(super) fn show_featured(featured: &[FeaturedTrack], opts: Options) {
    if opts.json {
        print_json(featured);
        return;
    }

    print_table(featured.iter().map(|f| track_row(&f.track)).collect());
    let rows: Vec<FeatureTableRow> = featured
        .iter()
        .filter_map(|f| f.features.as_ref())
        .map(super::features::feature_row)
        .collect();
    let missing = featured.len() - rows.len();
    print_table(rows);
    if missing > 0 {
        warning!("{} tracks have no audio features", missing);
    } else {
        success!("Every track has audio features");
    }
}

pub(super) fn track_row(track: &TrackRecord) -> TrackTableRow {
    TrackTableRow {
        title: if track.is_unavailable() {
            "(unavailable)".to_string()
        } else {
            track.title.clone()
        },
        artists: track.artists.join(", "),
        album: track.album.clone().unwrap_or_default(),
        year: track.year.clone().unwrap_or_default(),
    }
}
