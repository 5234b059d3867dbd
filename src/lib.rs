pub mod catalog;
pub mod config;
pub mod control;
pub mod dsp;
pub mod effects;
pub mod engine;
pub mod error;
pub mod graph;
pub mod logging;
pub mod media_session;
pub mod notice;
pub mod player;
#[cfg(feature = "relay")]
pub mod relay;
pub mod settings;
pub mod switcher;
pub mod visualizer;

pub use catalog::{Catalog, EpisodeRecord};
pub use config::PlayerConfig;
pub use error::PlayerError;
pub use player::Player;

use rand::SeedableRng;
use rand::rngs::StdRng;
use wasm_bindgen::prelude::*;

use crate::control::Knob;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the offbeat-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: the built-in archive as a JSON array.
#[wasm_bindgen]
pub fn offbeat_catalog_json() -> String {
    catalog::offbeat_catalog().to_json()
}

/// WASM-exposed: validate a catalog JSON document and return it as JS
/// objects. Duplicate or zero numbers and relative URLs are errors.
#[wasm_bindgen]
pub fn load_catalog(json: &str) -> Result<JsValue, JsValue> {
    let catalog = Catalog::from_json(json).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&catalog).map_err(js_error)
}

/// WASM-exposed: `#episode-<n>` → `n`, or `undefined`.
#[wasm_bindgen]
pub fn parse_episode_hash(hash: &str) -> Option<u32> {
    catalog::parse_episode_hash(hash)
}

/// WASM-exposed: gain for a volume percentage.
#[wasm_bindgen]
pub fn volume_gain(percent: u8) -> f64 {
    effects::volume_gain(percent)
}

/// WASM-exposed: master filter settings for a knob position, as
/// `{ filter_type, frequency, q, ramped }`.
#[wasm_bindgen]
pub fn filter_response(enabled: bool, position: u8, sample_rate: f64) -> Result<JsValue, JsValue> {
    let response = effects::filter_response(enabled, position, sample_rate);
    serde_wasm_bindgen::to_value(&response).map_err(js_error)
}

/// WASM-exposed: reverb send level.
#[wasm_bindgen]
pub fn reverb_send(enabled: bool, amount: u8) -> f64 {
    effects::reverb_send(enabled, amount)
}

/// WASM-exposed: knob value after a drag. `knob` is `"filter"` or `"reverb"`.
#[wasm_bindgen]
pub fn knob_drag_value(knob: &str, start_value: u8, dx: f64, dy: f64, sensitivity: f64) -> Result<u8, JsValue> {
    let knob = match knob {
        "filter" => Knob::Filter,
        "reverb" => Knob::Reverb,
        other => return Err(JsValue::from_str(&format!("unknown knob '{other}'"))),
    };
    Ok(control::knob_drag_value(knob, start_value, dx, dy, sensitivity))
}

/// WASM-exposed: knob indicator angle in degrees.
#[wasm_bindgen]
pub fn knob_rotation(value: u8) -> f64 {
    control::knob_rotation(value)
}

/// WASM-exposed: `MM:SS` for a time in seconds.
#[wasm_bindgen]
pub fn format_time(seconds: f64) -> String {
    engine::format_time(seconds)
}

/// WASM-exposed: synthesize the reverb impulse response as interleaved
/// stereo samples. A seed makes the noise reproducible.
#[wasm_bindgen]
pub fn impulse_response(sample_rate: f64, seed: Option<u32>) -> Result<Vec<f32>, JsValue> {
    impulse_samples(sample_rate, seed).map_err(js_error)
}

fn impulse_samples(sample_rate: f64, seed: Option<u32>) -> Result<Vec<f32>, error::GraphError> {
    if !dsp::graph::valid_sample_rate(sample_rate) {
        return Err(error::GraphError::InvalidSampleRate(sample_rate));
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed as u64),
        None => StdRng::from_entropy(),
    };
    Ok(dsp::impulse::synthesize(sample_rate, &mut rng).interleaved())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_mappings_match_modules() {
        assert_eq!(volume_gain(50), 0.25);
        assert!((reverb_send(true, 100) - 1.5).abs() < 1e-12);
        assert_eq!(knob_drag_value("filter", 50, 20.0, 0.0, 0.15).unwrap(), 50);
        assert_eq!(knob_rotation(100), 135.0);
        assert_eq!(parse_episode_hash("#episode-12"), Some(12));
        assert_eq!(format_time(61.0), "01:01");
    }

    #[test]
    fn catalog_json_is_loadable() {
        let json = offbeat_catalog_json();
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog, catalog::offbeat_catalog());
    }

    #[test]
    fn seeded_impulse_is_reproducible() {
        let a = impulse_response(8000.0, Some(9)).unwrap();
        let b = impulse_response(8000.0, Some(9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2 * 9600);
    }

    #[test]
    fn impulse_rejects_rates_a_graph_cannot_use() {
        for rate in [2999.0, 768_001.0, 1e12, f64::INFINITY, f64::NAN] {
            assert!(impulse_samples(rate, Some(1)).is_err(), "rate {rate} should be rejected");
        }
        assert_eq!(impulse_samples(3000.0, Some(1)).unwrap().len(), 2 * 3600);
    }
}
