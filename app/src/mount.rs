use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use wasm_bindgen::JsValue;
use yew::AppHandle;

use crate::app::Application;
use crate::config::Configuration;

static MOUNTED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("mount point #{0} is missing from the page")]
    MissingMountPoint(String),
    #[error("application is already mounted")]
    AlreadyMounted,
}

impl From<MountError> for JsValue {
    fn from(error: MountError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

/// Renders [`Application`] into the configured mount point. Succeeds once per page.
pub fn mount(config: &Configuration) -> Result<AppHandle<Application>, MountError> {
    let root = gloo::utils::document()
        .get_element_by_id(&config.mount_point)
        .ok_or_else(|| MountError::MissingMountPoint(config.mount_point.clone()))?;

    if MOUNTED.swap(true, Ordering::SeqCst) {
        return Err(MountError::AlreadyMounted);
    }

    log::debug!("mounting application to #{}", config.mount_point);
    Ok(yew::Renderer::<Application>::with_root(root).render())
}
