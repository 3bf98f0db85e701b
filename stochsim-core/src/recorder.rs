//! Frame decimation shared by the three solvers.
//!
//! A recorder decides which step indices are kept, captures a snapshot
//! (and optionally a scalar diagnostic) for those steps, and always keeps the
//! last step so the final frame is the exact state a resumed call needs.

/// How densely frames are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decimation {
    /// Keep every `n`-th step.
    Every(usize),
    /// Keep roughly `n` frames whatever the step count.
    TargetFrames(usize),
}

impl Decimation {
    pub fn stride(&self, total_steps: usize) -> usize {
        match *self {
            Decimation::Every(n) => n.max(1),
            Decimation::TargetFrames(n) => (total_steps / n.max(1)).max(1),
        }
    }
}

#[derive(Debug)]
pub struct FrameRecorder<F> {
    stride: usize,
    anchor: usize,
    total_steps: usize,
    dt: f64,
    frames: Vec<F>,
    steps: Vec<usize>,
    diagnostics: Vec<f64>,
}

/// Everything a recorder kept, in step order.
#[derive(Debug)]
pub struct Recording<F> {
    pub frames: Vec<F>,
    pub steps: Vec<usize>,
    pub t: Vec<f64>,
    pub diagnostics: Vec<f64>,
}

/// Frames reserved up front; longer runs grow the buffers as they record.
const RESERVED_FRAMES: usize = 1024;

impl<F> FrameRecorder<F> {
    pub fn new(policy: Decimation, total_steps: usize, dt: f64) -> FrameRecorder<F> {
        let stride = policy.stride(total_steps);
        let reserve = max_frames(total_steps, stride).min(RESERVED_FRAMES);
        FrameRecorder {
            stride,
            anchor: 0,
            total_steps,
            dt,
            frames: Vec::with_capacity(reserve),
            steps: Vec::with_capacity(reserve),
            diagnostics: Vec::new(),
        }
    }

    /// First step on the schedule (0 records the initial state).
    pub fn starting_at(mut self, anchor: usize) -> FrameRecorder<F> {
        self.anchor = anchor;
        self
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_due(&self, step: usize) -> bool {
        step == self.total_steps
            || (step >= self.anchor && (step - self.anchor) % self.stride == 0)
    }

    /// Capture `frame` when `step` is on the schedule.
    ///
    /// Snapshot and diagnostic are only evaluated for recorded steps.
    pub fn offer(
        &mut self,
        step: usize,
        frame: impl FnOnce() -> F,
        diagnostic: impl FnOnce() -> Option<f64>,
    ) -> bool {
        if !self.is_due(step) {
            return false;
        }
        self.record(step, frame(), diagnostic());
        true
    }

    pub fn record(&mut self, step: usize, frame: F, diagnostic: Option<f64>) {
        self.frames.push(frame);
        self.steps.push(step);
        if let Some(d) = diagnostic {
            self.diagnostics.push(d);
        }
    }

    pub fn finish(self) -> Recording<F> {
        let dt = self.dt;
        let t = self.steps.iter().map(|&s| s as f64 * dt).collect();
        Recording {
            frames: self.frames,
            steps: self.steps,
            t,
            diagnostics: self.diagnostics,
        }
    }
}

/// Upper bound on recorded frames for a run: `ceil(total / stride) + 1`.
pub fn max_frames(total_steps: usize, stride: usize) -> usize {
    total_steps.div_ceil(stride.max(1)).saturating_add(1)
}
