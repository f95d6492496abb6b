use crate::{
    types::{AudioFeatures, FeatureTableRow},
    utils, warning,
};

use super::{Options, connect, finish, print_json, print_table, spinner};

/// Audio features for ids given as separate arguments or comma separated.
pub async fn features(ids: Vec<String>, opts: Options) {
    let ids: Vec<String> = ids.iter().flat_map(|raw| utils::parse_ids(raw)).collect();
    if ids.is_empty() {
        warning!("No track ids given");
        return;
    }

    let client = connect(&opts, false).await;

    let pb = spinner("Fetching audio features...");
    let features = finish(pb, client.get_audio_features(&ids).await, "audio features");

    let unknown = features.items.iter().filter(|f| f.is_none()).count();
    if unknown > 0 {
        warning!("{} ids are unknown to the provider", unknown);
    }

    let found: Vec<AudioFeatures> = features.into_items().into_iter().flatten().collect();
    if opts.json {
        print_json(&found);
    } else {
        print_table(found.iter().map(feature_row).collect());
    }
}

pub(super) fn feature_row(features: &AudioFeatures) -> FeatureTableRow {
    FeatureTableRow {
        id: features.id.clone(),
        tempo: format!("{:.1}", features.tempo),
        energy: format!("{:.2}", features.energy),
        danceability: format!("{:.2}", features.danceability),
        valence: format!("{:.2}", features.valence),
    }
}
