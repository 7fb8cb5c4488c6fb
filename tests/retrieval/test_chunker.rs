// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Sliding-window chunking properties: size bound, overlap, round-trip,
// determinism.

use fabstir_doc_chat::{split, ChunkConfig, ConfigError};
use uuid::Uuid;

fn distinct_text(len: usize) -> String {
    // Repeating but position-dependent content, long period so windows differ.
    (0..len)
        .map(|i| char::from(b'a' + ((i * 7 + i / 26) % 26) as u8))
        .collect()
}

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

#[test]
fn test_1200_chars_at_500_50_yield_three_fragments() {
    let config = ChunkConfig {
        chunk_size: 500,
        overlap: 50,
    };
    let text = distinct_text(1200);
    let fragments = split(Uuid::new_v4(), &[text.clone()], &config).unwrap();

    assert_eq!(fragments.len(), 3);
    assert_eq!(fragments[0].content.chars().count(), 500);
    assert_eq!(fragments[1].content.chars().count(), 500);
    // Tail window starts at 900 and runs to the end.
    assert_eq!(fragments[2].content.chars().count(), 300);

    for (position, fragment) in fragments.iter().enumerate() {
        assert_eq!(fragment.index, position);
    }
}

#[test]
fn test_consecutive_fragments_share_the_configured_overlap() {
    let config = ChunkConfig {
        chunk_size: 500,
        overlap: 50,
    };
    let text = distinct_text(1200);
    let fragments = split(Uuid::new_v4(), &[text], &config).unwrap();

    for pair in fragments.windows(2) {
        let previous = chars(&pair[0].content);
        let next = chars(&pair[1].content);
        assert_eq!(previous[previous.len() - 50..], next[..50]);
    }
}

#[test]
fn test_deoverlapped_concatenation_reconstructs_the_original() {
    let config = ChunkConfig {
        chunk_size: 500,
        overlap: 50,
    };
    let text = distinct_text(1200);
    let fragments = split(Uuid::new_v4(), &[text.clone()], &config).unwrap();

    let mut reconstructed = fragments[0].content.clone();
    for fragment in &fragments[1..] {
        reconstructed.extend(fragment.content.chars().skip(config.overlap));
    }
    assert_eq!(reconstructed, text);
}

#[test]
fn test_round_trip_holds_for_awkward_lengths() {
    let config = ChunkConfig {
        chunk_size: 100,
        overlap: 30,
    };
    for len in [1, 99, 100, 101, 170, 171, 349, 1000] {
        let text = distinct_text(len);
        let fragments = split(Uuid::new_v4(), &[text.clone()], &config).unwrap();

        let mut reconstructed = fragments[0].content.clone();
        for fragment in &fragments[1..] {
            reconstructed.extend(fragment.content.chars().skip(config.overlap));
        }
        assert_eq!(reconstructed, text, "round trip failed for length {len}");

        // Every fragment except the last is exactly chunk_size characters.
        for fragment in &fragments[..fragments.len() - 1] {
            assert_eq!(fragment.content.chars().count(), config.chunk_size);
        }
        assert!(fragments.last().unwrap().content.chars().count() <= config.chunk_size);
    }
}

#[test]
fn test_chunking_is_deterministic() {
    let config = ChunkConfig::default();
    let document_id = Uuid::new_v4();
    let pages = vec![distinct_text(730), distinct_text(410)];

    let first = split(document_id, &pages, &config).unwrap();
    let second = split(document_id, &pages, &config).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_invalid_parameters_are_config_errors() {
    let text = vec![distinct_text(100)];

    let zero_size = ChunkConfig {
        chunk_size: 0,
        overlap: 10,
    };
    assert!(matches!(
        split(Uuid::new_v4(), &text, &zero_size),
        Err(ConfigError::ZeroChunkSize)
    ));

    let zero_overlap = ChunkConfig {
        chunk_size: 100,
        overlap: 0,
    };
    assert!(matches!(
        split(Uuid::new_v4(), &text, &zero_overlap),
        Err(ConfigError::InvalidOverlap { .. })
    ));

    let overlap_too_large = ChunkConfig {
        chunk_size: 100,
        overlap: 100,
    };
    assert!(matches!(
        split(Uuid::new_v4(), &text, &overlap_too_large),
        Err(ConfigError::InvalidOverlap { .. })
    ));
}

#[test]
fn test_fragments_carry_the_document_id() {
    let config = ChunkConfig::default();
    let document_id = Uuid::new_v4();
    let fragments = split(document_id, &[distinct_text(1200)], &config).unwrap();

    assert!(fragments.iter().all(|f| f.document_id == document_id));
}
