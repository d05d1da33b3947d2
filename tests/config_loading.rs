//! Loading descriptions from disk and resolving them.
//!
//! Run with: cargo test --test config_loading

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_yaml::Value;

use scene_description::config::{wrap_document, ConfigLoader, DESCRIPTION_VERSION};
use scene_description::{Description, DescriptionError};

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

fn write(dir: &Path, name: &str, body: &str) {
    let text = format!("scene_description:\n  version: {DESCRIPTION_VERSION}\n{body}");
    fs::write(dir.join(format!("{name}.yaml")), text).unwrap();
}

#[test]
fn count_blocks_become_indexed_elements() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "crates",
        "  seed: 3\n  crate:\n    count: 3\n    colour: {distribution_type: set, values: [red, green, blue]}\n    label: 'crate_$[index]'\n",
    );
    let loader = ConfigLoader::new(dir.path().to_string_lossy());
    let config = loader.load("crates").unwrap();
    let mut description = Description::build(&config).unwrap();
    let out = description.resolve_frame(0).unwrap().value;

    for i in 0..3 {
        let block = &out[format!("crate_{i}").as_str()];
        assert_eq!(block["index"], Value::from(i));
        assert_eq!(block["label"], Value::from(format!("crate_{i}")));
        assert!(["red", "green", "blue"].contains(&block["colour"].as_str().unwrap()));
    }
    assert!(out.get("crate").is_none());
}

#[test]
fn inherited_values_resolve_against_child_overrides() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "base", "  seed: 1\n  size: 2\n  area: '$[size] * $[size]'\n");
    write(dir.path(), "big", "  parent_config: base\n  size: 5\n");

    let loader = ConfigLoader::new(dir.path().to_string_lossy());
    let mut description = Description::build(&loader.load("big").unwrap()).unwrap();
    assert_eq!(description.resolve_frame(0).unwrap().value["area"], Value::from(25));
}

#[test]
fn loader_accepts_direct_file_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "scene", "  seed: 4\n");
    let path = dir.path().join("scene.yaml");

    let loader = ConfigLoader::new("elsewhere");
    assert_eq!(loader.resolve_path(&path.to_string_lossy()).unwrap(), path);
    assert!(loader.resolve_path("missing").is_err());
}

#[test]
fn wrong_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("old.yaml"),
        "scene_description:\n  version: 0.0.1-legacy\n  seed: 1\n",
    )
    .unwrap();
    let loader = ConfigLoader::new(dir.path().to_string_lossy());
    let err = loader.load("old").unwrap_err();
    assert!(format!("{err:#}").contains("incompatible version number"));
}

#[test]
fn document_round_trip_through_wrapper() {
    let body = yaml("{seed: 7, num_frames: 2, x: 1}");
    let mut description = Description::from_document(&wrap_document(&body)).unwrap();
    assert_eq!(description.num_frames(), 2);
    assert_eq!(description.base_seed(), 7);
    assert_eq!(description.resolve_frame(1).unwrap().value["seed"], Value::from(8));
}

#[test]
fn missing_seed_is_configuration_error() {
    let err = Description::build(&yaml("{x: 1}")).unwrap_err();
    assert!(matches!(err, DescriptionError::Configuration { ref path, .. } if path == "/seed"));
}

#[test]
fn shipped_demo_descriptions_resolve() {
    let loader = ConfigLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/configs"));
    for name in ["demo", "demo_permutate", "demo_bin_pack"] {
        let mut description = Description::build(&loader.load(name).unwrap()).unwrap();
        description.resolve_setup().unwrap();
        for frame in 0..description.num_frames() {
            description
                .resolve_frame(frame)
                .unwrap_or_else(|err| panic!("{name} frame {frame}: {err}"));
        }
    }
}

#[test]
fn permutate_demo_hands_out_every_item_once() {
    let loader = ConfigLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/configs"));
    let mut description = Description::build(&loader.load("demo_permutate").unwrap()).unwrap();
    let scene = description.resolve_frame(0).unwrap();
    assert_eq!(scene.passes, 2);

    let mut products: Vec<String> = (0..4)
        .map(|i| scene.value[format!("slot_{i}").as_str()]["product"].as_str().unwrap().to_string())
        .collect();
    products.sort();
    assert_eq!(products, vec!["item_0", "item_1", "item_2", "item_3"]);
}
