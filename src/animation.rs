use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use strum::Display;

use crate::error::{Error, Result};
use crate::icon::Bitmap;

/// Receives every frame the animation shows.
pub type FrameSink = Arc<dyn Fn(&Bitmap) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AnimationStatus {
    Stopped,
    Playing,
    Paused,
}

/// Cyclic, never empty, sequence of frames.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: VecDeque<Bitmap>,
}

impl FrameSet {
    pub fn new(frames: impl IntoIterator<Item = Bitmap>) -> Result<Self> {
        let frames: VecDeque<Bitmap> = frames.into_iter().collect();
        if frames.is_empty() {
            return Err(Error::EmptyAnimation);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Takes the head frame, moves it to the tail and returns it.
    pub fn advance(&mut self) -> &Bitmap {
        self.frames.rotate_left(1);
        &self.frames[self.frames.len() - 1]
    }

    pub fn frames(&self) -> impl Iterator<Item = &Bitmap> {
        self.frames.iter()
    }
}

struct AnimatorState {
    frames: FrameSet,
    status: AnimationStatus,
    // dropping the sender ends the timer thread
    timer: Option<Sender<()>>,
}

/// Plays a [`FrameSet`] at a fixed rate.
///
/// The frame sink is called with the animator's lock held, so a frame sink must never call back
/// into the animator.
#[derive(Clone)]
pub struct Animator {
    state: Arc<Mutex<AnimatorState>>,
    interval: Duration,
    apply: FrameSink,
}

impl Animator {
    pub fn new(frames: FrameSet, interval: Duration, apply: FrameSink) -> Self {
        let state = AnimatorState {
            frames,
            status: AnimationStatus::Stopped,
            timer: None,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            interval,
            apply,
        }
    }

    fn state(&self) -> MutexGuard<'_, AnimatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> AnimationStatus {
        self.state().status
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn frame_count(&self) -> usize {
        self.state().frames.len()
    }

    pub fn play(&self) {
        let mut state = self.state();
        match state.status {
            AnimationStatus::Playing => return,
            AnimationStatus::Paused => {}
            AnimationStatus::Stopped => match self.spawn_timer() {
                Ok(timer) => state.timer = Some(timer),
                Err(e) => {
                    tracing::error!("Failed to start animation timer: {e}");
                    return;
                }
            },
        }

        state.status = AnimationStatus::Playing;
        tracing::trace!("Animation playing every {:?}", self.interval);
    }

    pub fn pause(&self) {
        let mut state = self.state();
        if state.status == AnimationStatus::Playing {
            state.status = AnimationStatus::Paused;
            tracing::trace!("Animation paused");
        }
    }

    pub fn pause_resume(&self) {
        if self.status() == AnimationStatus::Playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn stop(&self) {
        let mut state = self.state();
        state.status = AnimationStatus::Stopped;
        state.timer = None;
        tracing::trace!("Animation stopped");
    }

    pub fn play_from_start(&self) {
        self.stop();
        self.play();
    }

    /// Shows the next frame right away, regardless of the status.
    pub fn step(&self) {
        let mut state = self.state();
        let frame = state.frames.advance();
        (self.apply)(frame);
    }

    fn spawn_timer(&self) -> std::io::Result<Sender<()>> {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let state = Arc::downgrade(&self.state);
        let apply = self.apply.clone();
        let interval = self.interval;

        std::thread::Builder::new()
            .name("tray-animation".into())
            .spawn(move || run_timer(state, apply, interval, rx))?;

        Ok(tx)
    }
}

fn run_timer(
    state: Weak<Mutex<AnimatorState>>,
    apply: FrameSink,
    interval: Duration,
    control: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(interval);

    loop {
        select! {
            recv(control) -> _ => break,
            recv(ticker) -> _ => {
                let Some(state) = state.upgrade() else {
                    break;
                };

                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.status == AnimationStatus::Playing {
                    let frame = state.frames.advance();
                    apply(frame);
                }
            }
        }
    }
}
