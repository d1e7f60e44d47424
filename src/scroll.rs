use tracing::debug;

use crate::ease::Ease;
use crate::error::{PinreelError, PinreelResult};

/// Default tween duration for the smoothed strategy, in seconds.
pub const DEFAULT_SMOOTH_DURATION: f64 = 1.2;

/// Handle for a registered scroll subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type ScrollCallback = Box<dyn FnMut(f64)>;

/// Ordered fan-out of authoritative scroll offsets.
///
/// Each discrete update is delivered to every subscriber exactly once, in
/// subscription order. Callbacks receive the offset alone and must not feed
/// scroll input back into the page; ownership makes overlapping notification
/// impossible.
#[derive(Default)]
pub struct ScrollHub {
    subscribers: Vec<(SubscriberId, ScrollCallback)>,
    next_id: u64,
}

impl ScrollHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(f64) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber; returns `false` when the id was already gone.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `offset` to every subscriber, once each.
    pub fn notify(&mut self, offset: f64) {
        for (_, callback) in &mut self.subscribers {
            callback(offset);
        }
    }
}

impl std::fmt::Debug for ScrollHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollHub")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Raw document scroll state, the browser-native strategy.
///
/// Progress consumers read the offset directly; there is no lag between
/// input and the reported position.
#[derive(Clone, Copy, Debug)]
pub struct NativeScroll {
    offset: f64,
    limit: f64,
}

impl NativeScroll {
    pub fn new(limit: f64) -> PinreelResult<Self> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(PinreelError::scroll("scroll limit must be finite and >= 0"));
        }
        Ok(Self { offset: 0.0, limit })
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn set_limit(&mut self, limit: f64) {
        self.limit = limit.max(0.0);
        self.offset = self.offset.clamp(0.0, self.limit);
    }

    /// Jump to an absolute offset; returns `true` when the offset changed.
    pub fn scroll_to(&mut self, offset: f64) -> bool {
        let next = if offset.is_nan() {
            self.offset
        } else {
            offset.clamp(0.0, self.limit)
        };
        let changed = next != self.offset;
        self.offset = next;
        changed
    }

    /// Apply a wheel/touch delta; returns `true` when the offset changed.
    pub fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_to(self.offset + delta)
    }
}

/// One in-flight eased movement of the smoothed offset.
#[derive(Clone, Copy, Debug)]
struct Tween {
    from: f64,
    to: f64,
    start: f64,
    duration: f64,
}

impl Tween {
    fn sample(&self, now: f64, ease: Ease) -> f64 {
        let t = ((now - self.start) / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * ease.apply(t)
    }

    fn is_done(&self, now: f64) -> bool {
        now - self.start >= self.duration
    }
}

/// Momentum-smoothed scroll engine, the inertial strategy.
///
/// Raw wheel/touch input moves the `target`; the published `offset` is a
/// smoothed value that lags the target through an eased tween, advanced once
/// per display refresh by `tick`. Page-wide singleton: while installed it is
/// the single source of truth for scroll position, and `destroy` must stop
/// the loop before the page goes away.
#[derive(Clone, Debug)]
pub struct SmoothScroll {
    current: f64,
    target: f64,
    limit: f64,
    tween: Option<Tween>,
    ease: Ease,
    duration: f64,
    active: bool,
}

impl SmoothScroll {
    pub fn new(limit: f64) -> PinreelResult<Self> {
        Self::with_easing(limit, Ease::OutExpo, DEFAULT_SMOOTH_DURATION)
    }

    pub fn with_easing(limit: f64, ease: Ease, duration: f64) -> PinreelResult<Self> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(PinreelError::scroll("scroll limit must be finite and >= 0"));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(PinreelError::scroll(
                "smooth scroll duration must be finite and > 0",
            ));
        }
        Ok(Self {
            current: 0.0,
            target: 0.0,
            limit,
            tween: None,
            ease,
            duration,
            active: true,
        })
    }

    /// The smoothed offset that consumers observe.
    pub fn offset(&self) -> f64 {
        self.current
    }

    /// The raw target the smoothed offset is converging on.
    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `true` while a tween is still converging on the target.
    pub fn is_animating(&self) -> bool {
        self.active && self.tween.is_some()
    }

    pub fn set_limit(&mut self, limit: f64) {
        self.limit = limit.max(0.0);
        self.target = self.target.clamp(0.0, self.limit);
        self.current = self.current.clamp(0.0, self.limit);
    }

    /// Feed raw wheel/touch input. The in-flight tween is retargeted from
    /// the current sampled position, never restarted from the raw target.
    pub fn wheel(&mut self, delta: f64, now: f64) {
        self.retarget(self.target + delta, now);
    }

    /// Animate toward an absolute offset.
    pub fn scroll_to(&mut self, offset: f64, now: f64) {
        self.retarget(offset, now);
    }

    /// Move both the smoothed offset and the target instantly, dropping any
    /// in-flight tween. No-op after destruction.
    pub fn jump_to(&mut self, offset: f64) {
        if !self.active || offset.is_nan() {
            return;
        }
        let clamped = offset.clamp(0.0, self.limit);
        self.current = clamped;
        self.target = clamped;
        self.tween = None;
    }

    fn retarget(&mut self, raw_target: f64, now: f64) {
        if !self.active || raw_target.is_nan() {
            return;
        }
        self.target = raw_target.clamp(0.0, self.limit);
        self.tween = Some(Tween {
            from: self.current,
            to: self.target,
            start: now,
            duration: self.duration,
        });
    }

    /// Advance the smoothed offset. Call once per display refresh; returns
    /// `true` while the animation should keep rescheduling itself.
    pub fn tick(&mut self, now: f64) -> bool {
        if !self.active {
            return false;
        }
        let Some(tween) = self.tween else {
            return false;
        };

        self.current = tween.sample(now, self.ease);
        if tween.is_done(now) {
            self.current = tween.to;
            self.tween = None;
            return false;
        }
        true
    }

    /// Stop the loop and drop pending motion. Safe to call more than once;
    /// after destruction no callback may advance the offset again.
    pub fn destroy(&mut self) {
        if self.active {
            debug!("smooth scroll destroyed");
        }
        self.active = false;
        self.tween = None;
    }
}
