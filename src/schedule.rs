//! Rate limiting for input events.
//!
//! Both helpers are driven by caller-supplied millisecond timestamps (on
//! wasm32 that is `performance.now()`), so they hold no clock of their own.

/// Lets an event through at most once per `interval_ms`. The latest value
/// seen while closed is kept so the caller can flush it later.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval_ms: f64,
    last_fire: Option<f64>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_fire: None,
            pending: None,
        }
    }

    /// Offer a value at `now_ms`. Returns it back when the window is open,
    /// otherwise stores it as pending and returns `None`.
    pub fn offer(&mut self, value: T, now_ms: f64) -> Option<T> {
        let open = self
            .last_fire
            .map_or(true, |last| now_ms - last >= self.interval_ms);
        if open {
            self.last_fire = Some(now_ms);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// The pending value, once its window has opened.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        let open = self
            .last_fire
            .map_or(true, |last| now_ms - last >= self.interval_ms);
        if open && self.pending.is_some() {
            self.last_fire = Some(now_ms);
            return self.pending.take();
        }
        None
    }

    /// The pending value regardless of timing.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Fires once input has been quiet for `delay_ms`; every new value restarts
/// the wait.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay_ms: f64,
    pending: Option<(T, f64)>,
}

impl<T> Debounce<T> {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T, now_ms: f64) {
        self.pending = Some((value, now_ms));
    }

    /// The settled value, if the quiet period has elapsed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now_ms - at >= self.delay_ms => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }

    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
