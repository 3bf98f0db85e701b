//! Chained calls must behave like one continuous run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stochsim_core::{
    HeatParams, ReactionInit, ReactionParams, ResumePolicy, Simulation, WaveInit, WaveParams,
};

fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[test]
fn heat_batches_match_single_run() {
    let mut whole = HeatParams::new(0.5, 1e-4, 1e-2, 40);
    whole.snapshot_interval = 3;
    let reference = whole.solve(&mut rng(0)).unwrap();

    let mut batch = HeatParams {
        t_steps: 20,
        ..whole.clone()
    };
    let first = batch.solve(&mut rng(0)).unwrap();
    assert!(batch.resume_from(&first));
    let second = batch.solve(&mut rng(0)).unwrap();

    // first frame of the resumed call is the handed-over state
    assert_eq!(second.frames.first(), first.frames.last());
    assert_eq!(second.frames.last(), reference.frames.last());
}

#[test]
fn wave_batches_match_single_run() {
    let whole = WaveParams {
        t_final: 2.0,
        init_type: WaveInit::String,
        damping: 0.3,
        ..WaveParams::default()
    };
    let reference = whole.solve(&mut rng(0)).unwrap();

    let mut batch = WaveParams {
        t_final: 1.0,
        ..whole.clone()
    };
    let first = batch.solve(&mut rng(0)).unwrap();
    assert!(batch.resume_from(&first));
    let second = batch.solve(&mut rng(0)).unwrap();

    let mut stitched = first.frames.clone();
    stitched.extend(second.frames.iter().skip(1).cloned());
    assert_eq!(stitched, reference.frames);

    let mut energy = first.energy.clone();
    energy.extend(second.energy.iter().copied());
    assert_eq!(energy, reference.energy);
}

#[test]
fn reaction_batches_match_single_run() {
    let whole = ReactionParams {
        t_final: 40.0,
        width: 12,
        height: 12,
        init_type: ReactionInit::Spots,
        ..ReactionParams::default()
    };
    // sigma = 0: the stream is only used for the initial condition
    let reference = whole.solve(&mut rng(3)).unwrap();

    let mut batch = ReactionParams {
        t_final: 20.0,
        ..whole.clone()
    };
    let first = batch.solve(&mut rng(3)).unwrap();
    assert!(batch.resume_from(&first));
    let second = batch.solve(&mut rng(999)).unwrap();

    assert_eq!(second.u.last(), reference.u.last());
    assert_eq!(second.v.last(), reference.v.last());
}

#[test]
fn reaction_mismatch_falls_back_to_catalogue() {
    let base = ReactionParams {
        t_final: 5.0,
        width: 10,
        height: 10,
        ..ReactionParams::default()
    };
    let fresh = base.solve(&mut rng(6)).unwrap();

    let resized = ReactionParams {
        current_u: Some(vec![vec![1.0; 20]; 20]),
        current_v: Some(vec![vec![0.0; 20]; 20]),
        ..base.clone()
    };
    assert_eq!(resized.solve(&mut rng(6)).unwrap(), fresh);

    let strict = ReactionParams {
        resume_policy: ResumePolicy::Strict,
        ..resized
    };
    assert!(strict.solve(&mut rng(6)).is_err());
}

#[test]
fn caller_state_is_not_mutated() {
    let state: Vec<f64> = (0..101).map(|i| (i as f64 / 100.0).sin()).collect();
    let mut p = HeatParams::new(0.5, 1e-4, 1e-2, 5);
    p.current_state = Some(state.clone());
    let _ = p.solve(&mut rng(0)).unwrap();
    assert_eq!(p.current_state, Some(state));
}
