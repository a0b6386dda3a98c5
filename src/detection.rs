//! The real-time detection loop.
//!
//! Each cycle samples a frame, awaits the pose source (the only suspension
//! point), then synchronously redraws the overlay and updates the target's
//! collision status. Cycles never overlap: the next frame is sampled only
//! after the previous one has been fully evaluated.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::{VideoFrame, VideoSource};
use crate::config::{Config, DetectionConfig, EstimationConfig};
use crate::error::{FrameError, RenderError};
use crate::geometry::{Circle, CollisionStatus, Target};
use crate::pose::{Pose, PoseSource};
use crate::render::Overlay;

/// Label of the probe circle placed on the tracked keypoint
pub const TRACKED_POINT_LABEL: &str = "tracked_point";

/// Everything the loop mutates between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    target: Target,
    config: DetectionConfig,
}

impl SessionState {
    pub fn new(target: Target, config: DetectionConfig) -> Self {
        Self { target, config }
    }

    pub fn from_config(config: &Config) -> Self {
        let t = &config.target;
        Self::new(
            Target::new(Circle::new(t.label.clone(), t.x, t.y, t.radius)),
            config.detection.clone(),
        )
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn status(&self) -> CollisionStatus {
        self.target.status()
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Probe circle on the tracked keypoint of `pose`
    pub fn tracked_point(&self, pose: &Pose) -> Circle {
        let kp = pose.get(self.config.tracked_part);
        Circle::new(
            TRACKED_POINT_LABEL,
            kp.position.x,
            kp.position.y,
            self.config.tracked_radius,
        )
    }

    /// Redraw `overlay` for one pose batch and update the target.
    ///
    /// Every pose is tested in order and the last one decides the status. An
    /// empty batch leaves the status as it was. Poses under
    /// `min_pose_confidence` are not drawn but still take part in the test.
    pub fn evaluate<O: Overlay + ?Sized>(&mut self, poses: &[Pose], overlay: &mut O) -> CollisionStatus {
        overlay.clear();
        for pose in poses {
            if pose.score >= self.config.min_pose_confidence {
                overlay.draw_keypoints(pose.keypoints(), self.config.min_part_confidence);
                overlay.draw_skeleton(pose.keypoints(), self.config.min_part_confidence);
            }
            let probe = self.tracked_point(pose);
            self.target.observe(&probe);
        }
        overlay.draw_circle(self.target.circle(), self.target.color());
        self.target.status()
    }
}

/// Counters collected while the loop runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames_evaluated: u64,
    /// Frames dropped because sampling failed
    pub frames_skipped: u64,
    /// Results that arrived after cancellation and were ignored
    pub stale_discarded: u64,
    /// Transitions into `Touched`
    pub touches: u64,
    /// Highest number of concurrent sampling calls observed
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    SurfaceClosed,
    FrameLimit,
}

/// What a finished loop hands back.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub state: SessionState,
    pub stats: LoopStats,
    pub reason: StopReason,
}

/// Result of a single cycle
#[derive(Debug)]
pub enum Cycle {
    Evaluated(CollisionStatus),
    Skipped(FrameError),
    Closed,
}

/// Sampling calls currently pending, and the peak
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) -> FlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        FlightGuard { counter: self }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

struct FlightGuard<'a> {
    counter: &'a InFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.current.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct DetectionLoop<O> {
    video: Box<dyn VideoSource>,
    source: Box<dyn PoseSource>,
    overlay: O,
    state: SessionState,
    estimation: EstimationConfig,
    frame_limit: Option<u64>,
    status_tx: watch::Sender<CollisionStatus>,
    in_flight: Arc<InFlight>,
    stats: LoopStats,
}

impl<O: Overlay> DetectionLoop<O> {
    pub fn new(
        video: Box<dyn VideoSource>,
        source: Box<dyn PoseSource>,
        overlay: O,
        state: SessionState,
        estimation: EstimationConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(state.status());
        Self {
            video,
            source,
            overlay,
            state,
            estimation,
            frame_limit: None,
            status_tx,
            in_flight: Arc::new(InFlight::default()),
            stats: LoopStats::default(),
        }
    }

    /// Stop on its own after `limit` evaluated frames
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Status feed for the rendering side; updated only on change
    pub fn subscribe(&self) -> watch::Receiver<CollisionStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    pub fn in_flight(&self) -> Arc<InFlight> {
        Arc::clone(&self.in_flight)
    }

    async fn sample(&mut self) -> Result<(VideoFrame, Vec<Pose>), FrameError> {
        let in_flight = Arc::clone(&self.in_flight);
        let _guard = in_flight.enter();
        let frame = self.video.next_frame().await?;
        let poses = self.source.estimate(&frame, &self.estimation).await?;
        Ok((frame, poses))
    }

    fn finish(&mut self, sampled: Result<(VideoFrame, Vec<Pose>), FrameError>) -> Cycle {
        let (frame, poses) = match sampled {
            Ok(sampled) => sampled,
            Err(e) => {
                log::warn!("frame skipped: {e}");
                self.stats.frames_skipped += 1;
                return Cycle::Skipped(e);
            }
        };

        let status = self.state.evaluate(&poses, &mut self.overlay);
        self.stats.frames_evaluated += 1;
        self.publish(status);

        match self.overlay.present(&frame) {
            Ok(()) => Cycle::Evaluated(status),
            Err(RenderError::Closed) => Cycle::Closed,
            Err(e) => {
                log::warn!("frame {}: {e}", frame.frame_id);
                Cycle::Evaluated(status)
            }
        }
    }

    fn publish(&mut self, status: CollisionStatus) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            log::debug!("target status: {status:?}");
            if status.is_touched() {
                self.stats.touches += 1;
            }
        }
    }

    /// Run exactly one sampling + evaluation cycle.
    pub async fn run_once(&mut self) -> Cycle {
        let sampled = self.sample().await;
        self.finish(sampled)
    }

    /// Loop until `cancel` fires, the surface closes or the frame limit is
    /// reached. The token is checked before every re-arm; a result that lands
    /// after cancellation is dropped without touching the state.
    pub async fn run(mut self, cancel: CancellationToken) -> LoopOutcome {
        let mut pacing = match self.state.config().frame_interval_ms {
            0 => None,
            ms => {
                let mut ticker = interval(Duration::from_millis(ms));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            }
        };
        log::info!(
            "detection loop started (target {:?} at ({}, {}) r={})",
            self.state.target().circle().label,
            self.state.target().circle().center_x,
            self.state.target().circle().center_y,
            self.state.target().circle().radius
        );

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.frame_limit.is_some_and(|limit| self.stats.frames_evaluated >= limit) {
                break StopReason::FrameLimit;
            }

            match pacing.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break StopReason::Cancelled,
                        _ = ticker.tick() => {}
                    }
                }
                None => tokio::task::yield_now().await,
            }

            let sampled = self.sample().await;
            if cancel.is_cancelled() {
                if sampled.is_ok() {
                    self.stats.stale_discarded += 1;
                    log::debug!("discarded a pose batch that arrived after stop");
                }
                break StopReason::Cancelled;
            }

            if let Cycle::Closed = self.finish(sampled) {
                break StopReason::SurfaceClosed;
            }
        };

        self.stats.max_in_flight = self.in_flight.peak();
        log::info!(
            "detection loop stopped ({reason:?}): {} evaluated, {} skipped, {} touches",
            self.stats.frames_evaluated,
            self.stats.frames_skipped,
            self.stats.touches
        );
        LoopOutcome {
            state: self.state,
            stats: self.stats,
            reason,
        }
    }
}

impl<O: Overlay + Send + 'static> DetectionLoop<O> {
    /// Run the loop as a background task.
    pub fn spawn(self) -> DetectionHandle {
        let cancel = CancellationToken::new();
        let status = self.subscribe();
        let in_flight = self.in_flight();
        let task = tokio::spawn(self.run(cancel.clone()));
        DetectionHandle {
            cancel,
            status,
            in_flight,
            task,
        }
    }
}

/// Handle to a spawned loop. A stopped loop cannot be restarted.
pub struct DetectionHandle {
    cancel: CancellationToken,
    status: watch::Receiver<CollisionStatus>,
    in_flight: Arc<InFlight>,
    task: JoinHandle<LoopOutcome>,
}

impl DetectionHandle {
    /// Latest published status
    pub fn status(&self) -> CollisionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<CollisionStatus> {
        self.status.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop and wait for it; an estimate already in flight is
    /// awaited, then ignored.
    pub async fn stop(self) -> Result<LoopOutcome, JoinError> {
        self.cancel.cancel();
        self.task.await
    }

    /// Wait for the loop to end on its own
    pub async fn join(self) -> Result<LoopOutcome, JoinError> {
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::SyntheticVideo;
    use crate::pose::{Keypoint, KeypointIndex, ReplayPoseSource};
    use crate::render::{NullOverlay, PixelBuffer};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    fn pose_with_wrist(score: f32, x: f32, y: f32) -> Pose {
        let mut kps = KeypointIndex::ALL.map(|part| Keypoint::new(part, 0.0, 0.0, 0.5));
        kps[KeypointIndex::RightWrist.index()] = Keypoint::new(KeypointIndex::RightWrist, x, y, 0.9);
        Pose::from_keypoints(score, kps).unwrap()
    }

    fn inside() -> Pose {
        pose_with_wrist(0.9, 300.0, 300.0)
    }

    fn outside() -> Pose {
        pose_with_wrist(0.9, 400.0, 400.0)
    }

    fn state() -> SessionState {
        SessionState::new(
            Target::new(Circle::new("target", 300.0, 300.0, 50.0)),
            DetectionConfig {
                frame_interval_ms: 0,
                ..DetectionConfig::default()
            },
        )
    }

    fn unfiltered() -> EstimationConfig {
        EstimationConfig {
            flip_horizontal: false,
            max_detections: 10,
            score_threshold: 0.0,
            ..EstimationConfig::default()
        }
    }

    fn replay_loop(batches: Vec<Vec<Pose>>) -> DetectionLoop<NullOverlay> {
        DetectionLoop::new(
            Box::new(SyntheticVideo::new(640, 480)),
            Box::new(ReplayPoseSource::new(batches, false)),
            NullOverlay,
            state(),
            unfiltered(),
        )
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Clear,
        Keypoints,
        Skeleton,
        Circle(u32),
    }

    #[derive(Default)]
    struct RecordingOverlay {
        calls: Vec<Call>,
        presents: usize,
        close_after: Option<usize>,
    }

    impl Overlay for RecordingOverlay {
        fn clear(&mut self) {
            self.calls.push(Call::Clear);
        }
        fn draw_keypoints(&mut self, _keypoints: &[Keypoint], _min_confidence: f32) {
            self.calls.push(Call::Keypoints);
        }
        fn draw_skeleton(&mut self, _keypoints: &[Keypoint], _min_confidence: f32) {
            self.calls.push(Call::Skeleton);
        }
        fn draw_circle(&mut self, _circle: &Circle, color: u32) {
            self.calls.push(Call::Circle(color));
        }
        fn present(&mut self, _frame: &VideoFrame) -> Result<(), RenderError> {
            self.presents += 1;
            match self.close_after {
                Some(n) if self.presents >= n => Err(RenderError::Closed),
                _ => Ok(()),
            }
        }
    }

    /// Pose source scripted per call; `None` entries fail.
    struct ScriptedSource {
        script: VecDeque<Option<Vec<Pose>>>,
        delay: Duration,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<Vec<Pose>>>) -> Self {
            Self {
                script: script.into(),
                delay: Duration::ZERO,
                active: Arc::default(),
                peak: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl PoseSource for ScriptedSource {
        async fn estimate(
            &mut self,
            _frame: &VideoFrame,
            _config: &EstimationConfig,
        ) -> Result<Vec<Pose>, FrameError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            match self.script.pop_front() {
                Some(Some(batch)) => Ok(batch),
                Some(None) => Err(FrameError::Estimation("scripted failure".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Video that fails on the listed frame ids
    struct FlakyVideo {
        inner: SyntheticVideo,
        fail_on: Vec<u64>,
        calls: u64,
    }

    #[async_trait]
    impl VideoSource for FlakyVideo {
        async fn next_frame(&mut self) -> Result<VideoFrame, FrameError> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                return Err(FrameError::Unavailable("camera hiccup".to_string()));
            }
            self.inner.next_frame().await
        }

        fn resolution(&self) -> (u32, u32) {
            self.inner.resolution()
        }
    }

    /// Blocks inside `estimate` until released
    struct GatedSource {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        batch: Vec<Pose>,
    }

    #[async_trait]
    impl PoseSource for GatedSource {
        async fn estimate(
            &mut self,
            _frame: &VideoFrame,
            _config: &EstimationConfig,
        ) -> Result<Vec<Pose>, FrameError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(self.batch.clone())
        }
    }

    #[test]
    fn test_evaluate_wrist_on_target() {
        let mut state = state();
        let status = state.evaluate(&[inside()], &mut NullOverlay);
        assert_eq!(status, CollisionStatus::Touched);
        assert_eq!(state.status(), CollisionStatus::Touched);
    }

    #[test]
    fn test_evaluate_wrist_off_target() {
        let mut state = state();
        state.evaluate(&[inside()], &mut NullOverlay);
        let status = state.evaluate(&[outside()], &mut NullOverlay);
        assert_eq!(status, CollisionStatus::Untouched);
    }

    #[test]
    fn test_evaluate_last_pose_wins() {
        let mut state = state();
        assert_eq!(
            state.evaluate(&[inside(), outside()], &mut NullOverlay),
            CollisionStatus::Untouched
        );
        assert_eq!(
            state.evaluate(&[outside(), inside()], &mut NullOverlay),
            CollisionStatus::Touched
        );
    }

    #[test]
    fn test_evaluate_empty_batch_keeps_status() {
        let mut state = state();
        state.evaluate(&[inside()], &mut NullOverlay);
        assert_eq!(state.evaluate(&[], &mut NullOverlay), CollisionStatus::Touched);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let batches = [vec![inside()], vec![outside()], vec![inside(), outside()], vec![]];
        for batch in &batches {
            let mut first = state();
            let mut second = state();
            let a = first.evaluate(batch, &mut NullOverlay);
            let b = first.evaluate(batch, &mut NullOverlay);
            let c = second.evaluate(batch, &mut NullOverlay);
            assert_eq!(a, b);
            assert_eq!(a, c);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_evaluate_uses_configured_part_and_radius() {
        let mut state = SessionState::new(
            Target::new(Circle::new("target", 300.0, 300.0, 50.0)),
            DetectionConfig {
                tracked_part: KeypointIndex::Nose,
                tracked_radius: 60.0,
                ..DetectionConfig::default()
            },
        );
        // nose sits at the origin, 424 px away: still out of reach
        assert_eq!(state.evaluate(&[inside()], &mut NullOverlay), CollisionStatus::Untouched);

        let near = pose_with_wrist(0.9, 0.0, 0.0);
        let probe = state.tracked_point(&near);
        assert_eq!(probe.label, TRACKED_POINT_LABEL);
        assert_eq!(probe.radius, 60.0);
    }

    #[test]
    fn test_evaluate_draw_order() {
        let mut state = state();
        let mut overlay = RecordingOverlay::default();
        state.evaluate(&[inside()], &mut overlay);
        assert_eq!(
            overlay.calls,
            vec![
                Call::Clear,
                Call::Keypoints,
                Call::Skeleton,
                Call::Circle(crate::geometry::TOUCHED_COLOR)
            ]
        );
    }

    #[test]
    fn test_evaluate_low_score_pose_not_drawn_but_counts() {
        let mut state = state();
        let mut overlay = RecordingOverlay::default();
        let faint = pose_with_wrist(0.1, 300.0, 300.0);
        let status = state.evaluate(&[faint], &mut overlay);
        assert_eq!(status, CollisionStatus::Touched);
        assert_eq!(
            overlay.calls,
            vec![Call::Clear, Call::Circle(crate::geometry::TOUCHED_COLOR)]
        );
    }

    #[test]
    fn test_evaluate_paints_pixel_buffer() {
        let mut state = state();
        let mut overlay = PixelBuffer::new(640, 480);
        state.evaluate(&[inside()], &mut overlay);
        assert_eq!(overlay.pixel(300, 300), Some(crate::geometry::TOUCHED_COLOR));
        state.evaluate(&[outside()], &mut overlay);
        assert_eq!(overlay.pixel(300, 300), Some(crate::geometry::UNTOUCHED_COLOR));
    }

    #[test]
    fn test_evaluate_with_oversized_target() {
        let mut state = SessionState::new(
            Target::new(Circle::new("target", 300.0, 300.0, 50_000.0)),
            DetectionConfig::default(),
        );
        let mut overlay = PixelBuffer::new(64, 64);
        assert_eq!(state.evaluate(&[], &mut overlay), CollisionStatus::Untouched);
        assert_eq!(state.evaluate(&[outside()], &mut overlay), CollisionStatus::Touched);
        assert_eq!(overlay.pixel(63, 63), Some(crate::geometry::TOUCHED_COLOR));
    }

    #[tokio::test]
    async fn test_run_once_cycles() {
        let mut detection = replay_loop(vec![vec![inside()], vec![outside()]]);
        assert!(matches!(detection.run_once().await, Cycle::Evaluated(CollisionStatus::Touched)));
        assert!(matches!(detection.run_once().await, Cycle::Evaluated(CollisionStatus::Untouched)));
        assert_eq!(detection.stats().frames_evaluated, 2);
        assert_eq!(detection.stats().touches, 1);
    }

    #[tokio::test]
    async fn test_run_until_frame_limit() {
        let batches = vec![vec![outside()], vec![inside()], vec![inside()], vec![outside()], vec![inside()]];
        let detection = replay_loop(batches).with_frame_limit(4);
        let mut status = detection.subscribe();
        assert_eq!(*status.borrow_and_update(), CollisionStatus::Untouched);

        let outcome = detection.run(CancellationToken::new()).await;
        assert_eq!(outcome.reason, StopReason::FrameLimit);
        assert_eq!(outcome.stats.frames_evaluated, 4);
        assert_eq!(outcome.stats.touches, 1);
        assert_eq!(outcome.stats.max_in_flight, 1);
        assert_eq!(outcome.state.status(), CollisionStatus::Untouched);
    }

    #[tokio::test]
    async fn test_sampling_errors_are_skipped() {
        let video = FlakyVideo {
            inner: SyntheticVideo::new(640, 480),
            fail_on: vec![1],
            calls: 0,
        };
        // the third call fails inside the model
        let source = ScriptedSource::new(vec![
            Some(vec![outside()]),
            None,
            Some(vec![inside()]),
            Some(vec![inside()]),
        ]);
        let detection = DetectionLoop::new(Box::new(video), Box::new(source), NullOverlay, state(), unfiltered())
            .with_frame_limit(3);

        let outcome = detection.run(CancellationToken::new()).await;
        assert_eq!(outcome.reason, StopReason::FrameLimit);
        assert_eq!(outcome.stats.frames_skipped, 2);
        assert_eq!(outcome.stats.frames_evaluated, 3);
        assert_eq!(outcome.state.status(), CollisionStatus::Touched);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let mut source = ScriptedSource::new(vec![Some(vec![inside()]); 8]);
        source.delay = Duration::from_millis(2);
        let peak = Arc::clone(&source.peak);
        let detection = DetectionLoop::new(
            Box::new(SyntheticVideo::new(64, 64)),
            Box::new(source),
            NullOverlay,
            state(),
            unfiltered(),
        )
        .with_frame_limit(8);

        let handle = detection.spawn();
        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.stats.frames_evaluated, 8);
        assert_eq!(outcome.stats.max_in_flight, 1);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_discards_stale_result() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let source = GatedSource {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
            batch: vec![inside()],
        };
        let detection = DetectionLoop::new(
            Box::new(SyntheticVideo::new(64, 64)),
            Box::new(source),
            NullOverlay,
            state(),
            unfiltered(),
        );
        let handle = detection.spawn();

        entered.notified().await;
        assert_eq!(handle.in_flight().current(), 1);
        let cancel = handle.cancel_token();
        cancel.cancel();
        release.notify_one();

        let outcome = handle.join().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.stats.stale_discarded, 1);
        assert_eq!(outcome.stats.frames_evaluated, 0);
        assert_eq!(outcome.state.status(), CollisionStatus::Untouched);
    }

    #[tokio::test]
    async fn test_stop_before_first_frame() {
        let detection = replay_loop(vec![vec![inside()]]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = detection.run(cancel).await;
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.stats.frames_evaluated, 0);
    }

    #[tokio::test]
    async fn test_spawned_loop_publishes_and_stops() {
        let mut session = state();
        session.config.frame_interval_ms = 1;
        let detection = DetectionLoop::new(
            Box::new(SyntheticVideo::new(640, 480)),
            Box::new(ReplayPoseSource::new(vec![vec![inside()]], true)),
            NullOverlay,
            session,
            unfiltered(),
        );
        let handle = detection.spawn();
        let mut status = handle.subscribe();
        status
            .wait_for(|s| s.is_touched())
            .await
            .expect("loop publishes a touch");
        assert_eq!(handle.status(), CollisionStatus::Touched);

        let outcome = handle.stop().await.unwrap();
        assert_eq!(outcome.reason, StopReason::Cancelled);
        assert_eq!(outcome.stats.touches, 1);
        assert!(outcome.stats.frames_evaluated >= 1);
    }

    #[tokio::test]
    async fn test_closed_surface_ends_session() {
        let overlay = RecordingOverlay {
            close_after: Some(2),
            ..RecordingOverlay::default()
        };
        let detection = DetectionLoop::new(
            Box::new(SyntheticVideo::new(64, 64)),
            Box::new(ReplayPoseSource::new(vec![vec![outside()]], true)),
            overlay,
            state(),
            unfiltered(),
        );
        let outcome = detection.run(CancellationToken::new()).await;
        assert_eq!(outcome.reason, StopReason::SurfaceClosed);
        assert_eq!(outcome.stats.frames_evaluated, 2);
    }

    #[test]
    fn test_state_from_config() {
        let state = SessionState::from_config(&Config::default());
        assert_eq!(state.target().circle(), &Circle::new("target", 300.0, 300.0, 50.0));
        assert_eq!(state.status(), CollisionStatus::Untouched);
        assert_eq!(state.config().tracked_part, KeypointIndex::RightWrist);
    }

    #[test]
    fn test_in_flight_guard_counts() {
        let counter = InFlight::default();
        {
            let _a = counter.enter();
            assert_eq!(counter.current(), 1);
        }
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.peak(), 1);
    }
}
