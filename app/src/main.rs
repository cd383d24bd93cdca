use wasm_bindgen::prelude::*;

pub fn main() -> Result<(), JsValue> {
    crypto_opportunity_app::run()
}
