use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stochsim_core::{HeatParams, ReactionParams, SimError, Simulation, WaveParams};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct Engine {
    rng: ChaCha8Rng,
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Engine {
        Engine {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    // Each call takes the JSON parameter record; chain by copying the last
    // frame(s) of one payload into the next record.
    pub fn solve_heat(&mut self, params_json: &str) -> Result<RunInfo, JsValue> {
        self.timed::<HeatParams>(params_json)
    }

    pub fn solve_wave(&mut self, params_json: &str) -> Result<RunInfo, JsValue> {
        self.timed::<WaveParams>(params_json)
    }

    pub fn solve_reaction(&mut self, params_json: &str) -> Result<RunInfo, JsValue> {
        self.timed::<ReactionParams>(params_json)
    }
}

impl Engine {
    fn timed<S: Simulation>(&mut self, params_json: &str) -> Result<RunInfo, JsValue> {
        let t0 = now_ms();
        let (frames, payload) =
            solve_json::<S>(params_json, &mut self.rng).map_err(|e| JsValue::from_str(&e))?;
        let t1 = now_ms();
        Ok(RunInfo {
            frames,
            compute_ms: t1 - t0,
            payload,
        })
    }
}

#[wasm_bindgen]
pub struct RunInfo {
    frames: usize,
    compute_ms: f64,
    payload: String,
}

#[wasm_bindgen]
impl RunInfo {
    pub fn frames(&self) -> usize { self.frames }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
    pub fn payload(&self) -> String { self.payload.clone() }
}

/// Parse, solve and serialize one call; errors become display strings.
pub fn solve_json<S: Simulation>(
    params_json: &str,
    rng: &mut ChaCha8Rng,
) -> Result<(usize, String), String> {
    let describe = |e: SimError| format!("{:?} error: {} {e}", e.kind(), S::NAME);
    let params = S::from_json(params_json).map_err(describe)?;
    let output = params.solve(rng).map_err(describe)?;
    let payload = serde_json::to_string(&output).map_err(|e| e.to_string())?;
    Ok((S::frame_count(&output), payload))
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
