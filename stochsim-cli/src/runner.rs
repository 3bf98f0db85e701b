use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stochsim_core::Simulation;
use tracing::info;

/// Inputs of one CLI invocation, independent of the solver.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub params: String,
    pub out: PathBuf,
    pub batches: usize,
    pub resume_from: Option<PathBuf>,
    pub base_seed: u64,
}

#[derive(Serialize)]
pub struct MetaRow {
    pub batch_idx: usize,
    pub solver: &'static str,
    pub setup: String,

    pub base_seed: u64,
    pub batch_seed: u64,

    pub resumed: bool,
    pub frames: usize,
    pub final_diagnostic: Option<f64>,
    pub compute_ms: f64,

    pub response: String,
}

/// Deterministic per-batch seed (stable when a run is regenerated).
pub fn batch_seed(base_seed: u64, batch_idx: usize) -> u64 {
    base_seed ^ (batch_idx as u64).wrapping_mul(0x9E3779B97F4A7C15)
}

pub fn response_name(batch_idx: usize) -> String {
    format!("batch_{batch_idx:04}.json")
}

/// Run `plan.batches` chained calls of solver `S`, each continuing from the
/// previous response.
pub fn run_batches<S: Simulation>(plan: &RunPlan) -> anyhow::Result<()> {
    if plan.batches == 0 {
        bail!("--batches must be >= 1");
    }

    let mut params: S = read_params(&plan.params)?;
    let setup = params.summary();
    info!(solver = S::NAME, %setup, "parameters loaded");
    let mut resumed = false;
    if let Some(path) = &plan.resume_from {
        let previous: S::Output = read_json(path)?;
        resumed = params.resume_from(&previous);
        if !resumed {
            bail!("{} holds no frames to resume from", path.display());
        }
        info!(from = %path.display(), "continuing from earlier response");
    }

    fs::create_dir_all(&plan.out)
        .with_context(|| format!("creating output directory {}", plan.out.display()))?;
    let meta_path = plan.out.join("meta.jsonl");
    let mut meta = BufWriter::new(
        File::create(&meta_path).with_context(|| format!("creating {}", meta_path.display()))?,
    );

    for batch_idx in 0..plan.batches {
        let seed = batch_seed(plan.base_seed, batch_idx);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let started = Instant::now();
        let output = params.solve(&mut rng).map_err(|e| {
            let kind = e.kind();
            anyhow::Error::new(e)
                .context(format!("{} batch {batch_idx} failed ({kind:?} error)", S::NAME))
        })?;
        let compute_ms = started.elapsed().as_secs_f64() * 1e3;

        let name = response_name(batch_idx);
        write_json(&plan.out.join(&name), &output)?;

        let row = MetaRow {
            batch_idx,
            solver: S::NAME,
            setup: setup.clone(),
            base_seed: plan.base_seed,
            batch_seed: seed,
            resumed,
            frames: S::frame_count(&output),
            final_diagnostic: S::final_diagnostic(&output),
            compute_ms,
            response: name,
        };
        serde_json::to_writer(&mut meta, &row)?;
        meta.write_all(b"\n")?;
        info!(
            solver = S::NAME,
            batch = batch_idx,
            frames = row.frames,
            compute_ms,
            "batch written"
        );

        resumed = params.resume_from(&output);
    }

    meta.flush()?;
    Ok(())
}

/// Parameter record from a file, or stdin when `source` is `-`.
fn read_params<S: Simulation>(source: &str) -> anyhow::Result<S> {
    let (text, origin) = if source == "-" {
        let mut text = String::new();
        io::stdin()
            .lock()
            .read_to_string(&mut text)
            .context("reading parameters from stdin")?;
        (text, "stdin".to_string())
    } else {
        let text = fs::read_to_string(source).with_context(|| format!("opening {source}"))?;
        (text, source.to_string())
    };
    S::from_json(&text).map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("parsing {origin} ({kind:?} error)"))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut w = BufWriter::new(
        File::create(path).with_context(|| format!("creating {}", path.display()))?,
    );
    serde_json::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stochsim_core::{HeatOutput, HeatParams, WaveParams};

    fn plan(dir: &Path, params: &Path, batches: usize) -> RunPlan {
        RunPlan {
            params: params.display().to_string(),
            out: dir.join("out"),
            batches,
            resume_from: None,
            base_seed: 123,
        }
    }

    #[test]
    fn batch_seeds_are_stable_and_distinct() {
        assert_eq!(batch_seed(7, 0), 7);
        assert_eq!(batch_seed(7, 3), batch_seed(7, 3));
        assert_ne!(batch_seed(7, 1), batch_seed(7, 2));
    }

    #[test]
    fn heat_batches_chain_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("heat.json");
        fs::write(
            &params,
            r#"{"alpha":0.5,"dt":0.0001,"dx":0.01,"t_steps":10,"snapshot_interval":4}"#,
        )
        .unwrap();

        run_batches::<HeatParams>(&plan(dir.path(), &params, 3)).unwrap();

        let out = dir.path().join("out");
        let b0: HeatOutput = read_json(&out.join(response_name(0))).unwrap();
        let b1: HeatOutput = read_json(&out.join(response_name(1))).unwrap();
        assert_eq!(b1.frames.first(), b0.frames.last());

        let meta = fs::read_to_string(out.join("meta.jsonl")).unwrap();
        let rows: Vec<serde_json::Value> = meta
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["resumed"], false);
        assert_eq!(rows[1]["resumed"], true);
        assert_eq!(rows[2]["solver"], "heat");
        assert_eq!(rows[0]["setup"], "init=pulse bc=dirichlet policy=fallback");
        assert_eq!(rows[0]["frames"], 4);
    }

    #[test]
    fn resume_from_earlier_response() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("wave.json");
        fs::write(&params, r#"{"T":0.5,"domain_len":2.0}"#).unwrap();
        run_batches::<WaveParams>(&plan(dir.path(), &params, 1)).unwrap();

        let mut next = plan(dir.path(), &params, 1);
        next.resume_from = Some(dir.path().join("out").join(response_name(0)));
        next.out = dir.path().join("continued");
        run_batches::<WaveParams>(&next).unwrap();

        let meta = fs::read_to_string(dir.path().join("continued/meta.jsonl")).unwrap();
        assert!(meta.contains(r#""resumed":true"#));
    }

    #[test]
    fn engine_errors_surface_with_their_kind() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("heat.json");
        fs::write(&params, r#"{"alpha":1.0,"dt":0.001,"dx":0.001,"t_steps":10}"#).unwrap();
        let err = run_batches::<HeatParams>(&plan(dir.path(), &params, 1)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Stability"));
        assert!(msg.contains("0.5"));
    }

    #[test]
    fn unknown_selector_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("heat.json");
        fs::write(
            &params,
            r#"{"alpha":0.5,"dt":0.0001,"dx":0.01,"t_steps":10,"init":"square"}"#,
        )
        .unwrap();
        let err = run_batches::<HeatParams>(&plan(dir.path(), &params, 1)).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Configuration"));
        assert!(msg.contains("square"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn unwritable_output_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("heat.json");
        fs::write(&params, r#"{"alpha":0.5,"dt":0.0001,"dx":0.01,"t_steps":2}"#).unwrap();
        let mut p = plan(dir.path(), &params, 1);
        // meta.jsonl cannot be created over an existing directory
        fs::create_dir_all(p.out.join("meta.jsonl")).unwrap();
        let err = run_batches::<HeatParams>(&p).unwrap_err();
        assert!(format!("{err:#}").contains("meta.jsonl"));
    }
}
