// SPDX-License-Identifier: GPL-3.0-or-later
//! Fixtures shared by the unit tests in this crate.

use cadence_domain::{Source, SourceId};
use cadence_infrastructure::FileRow;
use std::sync::Arc;

use crate::sources::SourceList;

/// A joined row for "Daft Punk - One More Time" on Discovery.
pub fn file_row(source_id: Option<u32>, url: &str) -> FileRow {
    FileRow {
        url: url.to_string(),
        mtime: 1_700_000_000,
        size: 8_000_000,
        md5: None,
        mimetype: Some("audio/mpeg".to_string()),
        duration: 320,
        bitrate: 320,
        artist_id: 1,
        artist_name: "Daft Punk".to_string(),
        album_id: Some(1),
        album_name: Some("Discovery".to_string()),
        track_id: 1,
        track_name: "One More Time".to_string(),
        composer_id: None,
        composer_name: None,
        disc_number: Some(1),
        album_position: Some(1),
        source_id,
    }
}

/// The local source plus alice as source 2.
pub fn sources(alice_online: bool) -> Arc<SourceList> {
    let list = SourceList::new(Source::local("My Collection"));
    let alice = Source::remote(SourceId(2), "alice", "Alice");
    alice.set_online(alice_online);
    list.add(alice);
    Arc::new(list)
}
