#![recursion_limit = "1024"]

mod app;
pub mod config;
pub mod mount;
mod page;
pub mod routes;
mod views;

pub use app::Application;

use config::Configuration;
use routes::{path_from_hash, resolve};
use wasm_bindgen::prelude::*;

pub fn run() -> Result<(), JsValue> {
    browser_panic_hook::set_once_default();

    let config = Configuration::default();
    wasm_logger::init(wasm_logger::Config::new(config.log_level));

    let hash = gloo::utils::window().location().hash()?;
    let path = path_from_hash(&hash);
    match resolve(path) {
        Some(view) => log::info!("starting at {path} ({view:?})"),
        None => log::warn!("starting at undeclared route {path}"),
    }

    if let Err(error) = mount::mount(&config) {
        log::error!("failed to start: {error}");
        return Err(error.into());
    }
    Ok(())
}
