//! ExtractOptions builder tests.

use framepack::{ExtractOptions, PackStrategy, StorageLayout};

#[test]
fn defaults() {
    let options = ExtractOptions::new();
    assert_eq!(options.layout(), StorageLayout::Container);
    assert_eq!(options.strategy(), PackStrategy::InterVideo);

    let codec = options.codec();
    assert_eq!((codec.width(), codec.height()), (224, 224));
    assert_eq!(codec.quality(), 90);

    let debug = format!("{options:?}");
    assert!(debug.contains("ExtractOptions"));
    assert!(debug.contains("has_cancellation: false"));
}

#[test]
fn builder_settings_flow_into_codec() {
    let options = ExtractOptions::new()
        .with_resolution(160, 120)
        .with_jpeg_quality(75);

    let codec = options.codec();
    assert_eq!((codec.width(), codec.height()), (160, 120));
    assert_eq!(codec.quality(), 75);
}

#[test]
fn quality_and_resolution_clamped() {
    let options = ExtractOptions::new()
        .with_resolution(0, 0)
        .with_jpeg_quality(0);

    let codec = options.codec();
    assert_eq!((codec.width(), codec.height()), (1, 1));
    assert_eq!(codec.quality(), 1);
}

#[test]
fn workers_default_to_available_parallelism() {
    let options = ExtractOptions::new();
    assert!(options.resolved_workers() >= 1);
}

#[test]
fn explicit_workers_override_default() {
    let options = ExtractOptions::new().with_workers(5);
    assert_eq!(options.resolved_workers(), 5);

    // Zero clamps rather than disabling the pipeline.
    let options = ExtractOptions::new().with_workers(0);
    assert_eq!(options.resolved_workers(), 1);
}

#[test]
fn layout_and_strategy_selection() {
    let options = ExtractOptions::new()
        .with_layout(StorageLayout::ImageDirectory)
        .with_strategy(PackStrategy::IntraVideo);
    assert_eq!(options.layout(), StorageLayout::ImageDirectory);
    assert_eq!(options.strategy(), PackStrategy::IntraVideo);
}
