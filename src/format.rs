//! Mapping of raw provider items into canonical records.
//!
//! Every function here is pure. Optional nested fields (album, artwork,
//! release date) are navigated without panicking; a raw item whose `id` is
//! null or missing is an unavailable track and maps to the placeholder
//! record without looking at any other field.

use serde_json::Value;

use crate::{
    Error,
    types::{PlaylistSummary, RawTrack, SavedAlbumSummary, TrackRecord},
    utils,
};

/// Height of the artwork picked as cover art.
pub const COVER_ART_HEIGHT: u32 = 640;

/// Formats a track object.
///
/// Returns [`Error::Format`] only when the item is neither null nor a JSON
/// object carrying an id, or when one of its fields has the wrong type.
pub fn format_track(item: &Value) -> Result<TrackRecord, Error> {
    if is_unavailable(item) {
        return Ok(TrackRecord::unavailable());
    }

    let raw: RawTrack = serde_json::from_value(item.clone())
        .map_err(|e| Error::Format(format!("track: {}", e)))?;

    Ok(track_record(raw))
}

/// Formats a playlist or saved-track item, which wraps the track object in a
/// `track` field.
pub fn format_track_item(item: &Value) -> Result<TrackRecord, Error> {
    match item {
        Value::Object(map) => format_track(map.get("track").unwrap_or(&Value::Null)),
        Value::Null => Ok(TrackRecord::unavailable()),
        other => Err(Error::Format(format!(
            "expected a track item object, got {}",
            json_kind(other)
        ))),
    }
}

/// Formats an entry of the user's playlist listing.
pub fn playlist_summary(item: &Value) -> Result<PlaylistSummary, Error> {
    let id = item
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Format("playlist without id".into()))?;

    Ok(PlaylistSummary {
        id: id.to_string(),
        name: str_field(item, "name"),
        total: item
            .pointer("/tracks/total")
            .and_then(Value::as_u64)
            .unwrap_or_default(),
    })
}

/// Formats an entry of the user's saved-album listing (`{added_at, album}`).
pub fn saved_album_summary(item: &Value) -> Result<SavedAlbumSummary, Error> {
    let album = item.get("album").unwrap_or(item);
    let id = album
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Format("saved album without id".into()))?;

    let artists = album
        .get("artists")
        .and_then(Value::as_array)
        .map(|artists| artists.iter().map(|a| str_field(a, "name")).collect())
        .unwrap_or_default();

    Ok(SavedAlbumSummary {
        id: id.to_string(),
        name: str_field(album, "name"),
        artists,
        year: album
            .get("release_date")
            .and_then(Value::as_str)
            .and_then(utils::release_year),
    })
}

fn track_record(raw: RawTrack) -> TrackRecord {
    let artists = raw
        .artists
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.name.unwrap_or_default())
        .collect();

    let (album, cover_art, year) = match raw.album {
        Some(album) => {
            let cover_art = album
                .images
                .unwrap_or_default()
                .into_iter()
                .find(|i| i.height == Some(COVER_ART_HEIGHT))
                .and_then(|i| i.url);
            let year = album.release_date.as_deref().and_then(utils::release_year);
            (album.name, cover_art, year)
        }
        None => (None, None, None),
    };

    TrackRecord {
        id: raw.id,
        title: raw.name.unwrap_or_default(),
        artists,
        album,
        disc_number: raw.disc_number,
        track_number: raw.track_number,
        cover_art,
        year,
    }
}

fn is_unavailable(item: &Value) -> bool {
    match item {
        Value::Null => true,
        Value::Object(map) => matches!(map.get("id"), None | Some(Value::Null)),
        _ => false,
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_track() -> Value {
        json!({
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "artists": [{ "name": "Rick Astley" }],
            "disc_number": 1,
            "track_number": 1,
            "album": {
                "name": "Whenever You Need Somebody",
                "release_date": "1987-11-12",
                "images": [
                    { "url": "https://i.scdn.co/image/300", "height": 300 },
                    { "url": "https://i.scdn.co/image/640", "height": 640 }
                ]
            }
        })
    }

    #[test]
    fn formats_complete_track() {
        let record = format_track(&full_track()).unwrap();

        assert_eq!(record.id.as_deref(), Some("4uLU6hMCjMI75M1A2tKUQC"));
        assert_eq!(record.title, "Never Gonna Give You Up");
        assert_eq!(record.artists, vec!["Rick Astley".to_string()]);
        assert_eq!(record.album.as_deref(), Some("Whenever You Need Somebody"));
        assert_eq!(record.disc_number, Some(1));
        assert_eq!(record.track_number, Some(1));
        assert_eq!(
            record.cover_art.as_deref(),
            Some("https://i.scdn.co/image/640")
        );
        assert_eq!(record.year.as_deref(), Some("1987"));
    }

    #[test]
    fn null_id_yields_placeholder_even_with_malformed_fields() {
        let item = json!({ "id": null, "name": 42, "artists": "nope", "album": [] });
        let record = format_track(&item).unwrap();

        assert_eq!(record, TrackRecord::unavailable());
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "title": "", "artists": [""] })
        );
    }

    #[test]
    fn missing_album_and_artwork_are_tolerated() {
        let simplified = json!({
            "id": "abc",
            "name": "Intro",
            "artists": [{ "name": "A" }, { "name": "B" }],
            "track_number": 3
        });
        let record = format_track(&simplified).unwrap();
        assert_eq!(record.album, None);
        assert_eq!(record.cover_art, None);
        assert_eq!(record.artists, vec!["A".to_string(), "B".to_string()]);

        let mut no_640 = full_track();
        no_640["album"]["images"] = json!([{ "url": "x", "height": 64 }]);
        assert_eq!(format_track(&no_640).unwrap().cover_art, None);
    }

    #[test]
    fn wrongly_typed_field_is_a_format_error() {
        let item = json!({ "id": "abc", "name": ["not", "a", "string"] });
        assert!(matches!(format_track(&item), Err(Error::Format(_))));
        assert!(matches!(format_track(&json!("abc")), Err(Error::Format(_))));
    }

    #[test]
    fn unwraps_playlist_items() {
        let item = json!({ "added_at": "2020-01-01T00:00:00Z", "track": full_track() });
        assert_eq!(
            format_track_item(&item).unwrap().title,
            "Never Gonna Give You Up"
        );

        let removed = json!({ "added_at": "2020-01-01T00:00:00Z", "track": null });
        assert!(format_track_item(&removed).unwrap().is_unavailable());
    }

    #[test]
    fn summarizes_playlists_and_albums() {
        let playlist = json!({ "id": "p1", "name": "Mix", "tracks": { "total": 42 } });
        assert_eq!(
            playlist_summary(&playlist).unwrap(),
            PlaylistSummary {
                id: "p1".into(),
                name: "Mix".into(),
                total: 42
            }
        );

        let saved = json!({
            "added_at": "2021-02-03T00:00:00Z",
            "album": { "id": "a1", "name": "LP", "release_date": "2019", "artists": [{ "name": "X" }] }
        });
        let album = saved_album_summary(&saved).unwrap();
        assert_eq!(album.id, "a1");
        assert_eq!(album.year.as_deref(), Some("2019"));
        assert_eq!(album.artists, vec!["X".to_string()]);
    }
}
