#![cfg(target_arch = "wasm32")]

use crypto_opportunity_app::config::Configuration;
use crypto_opportunity_app::mount::{mount, MountError};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn mounts_exactly_once_to_the_mount_point() {
    let config = Configuration {
        mount_point: "missing".to_string(),
        ..Configuration::default()
    };
    assert_eq!(
        mount(&config).err(),
        Some(MountError::MissingMountPoint("missing".to_string()))
    );

    let document = gloo::utils::document();
    let root = document.create_element("div").unwrap();
    root.set_id("app");
    gloo::utils::body().append_child(&root).unwrap();

    let config = Configuration::default();
    assert!(mount(&config).is_ok());
    assert_eq!(mount(&config).err(), Some(MountError::AlreadyMounted));
}
