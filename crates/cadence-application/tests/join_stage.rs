// SPDX-License-Identifier: GPL-3.0-or-later
//! Candidate join behaviour against the seeded catalog.

mod test_helpers;

use cadence_application::{IdentityRegistry, JoinStage};
use cadence_domain::{Candidate, EntityKind};
use std::sync::Arc;
use test_helpers::*;

#[tokio::test]
async fn exact_join_short_circuits_on_empty_sets() {
    let store = InstrumentedStore::counting(seeded_store().await);
    let registry = IdentityRegistry::new();
    let stage = JoinStage::new(&store, &registry);

    let some = [Candidate::new(1, 1.0)];
    assert!(stage.exact(&[], &some).await.expect("join").is_none());
    assert!(stage.exact(&some, &[]).await.expect("join").is_none());
    assert_eq!(store.join_calls(), 0);
}

#[tokio::test]
async fn exact_join_returns_rows_for_matching_pairs() {
    let store = InstrumentedStore::counting(seeded_store().await);
    let registry = IdentityRegistry::new();
    let stage = JoinStage::new(&store, &registry);

    let artists = store.candidates(EntityKind::Artist, "Daft Punk").await;
    let tracks = store.candidates(EntityKind::Track, "One More Time").await;
    let rows = stage
        .exact(&artists, &tracks)
        .await
        .expect("join")
        .expect("rows");

    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row.track_name == "One More Time"));
    assert_eq!(store.join_calls(), 1);
}

#[tokio::test]
async fn full_text_join_without_tracks_is_empty() {
    let store = InstrumentedStore::counting(seeded_store().await);
    let registry = IdentityRegistry::new();
    let stage = JoinStage::new(&store, &registry);

    let rows = stage.full_text(&[]).await.expect("join");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn suggestions_skip_unknown_ids_and_share_identities() {
    let store = InstrumentedStore::counting(seeded_store().await);
    let registry = IdentityRegistry::new();
    let stage = JoinStage::new(&store, &registry);

    let mut artists = store.candidates(EntityKind::Artist, "Daft Punk").await;
    artists.push(Candidate::new(9_999, 0.9));
    let suggested = stage.artist_suggestions(&artists).await.expect("artists");
    assert_eq!(suggested.len(), artists.len() - 1);
    assert_eq!(suggested[0].name(), "Daft Punk");

    let albums = store.candidates(EntityKind::Album, "Discovery").await;
    let suggested_albums = stage.album_suggestions(&albums).await.expect("albums");
    assert_eq!(suggested_albums[0].name(), "Discovery");
    assert!(Arc::ptr_eq(suggested_albums[0].artist(), &suggested[0]));
}
