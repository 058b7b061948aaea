//! # Logging Utilities
//!
//! Rate limiting for warnings that repeat once per receive cycle (CRC
//! failures, timeouts on a quiet channel) and a hex dump helper for
//! payloads.
//!
//! ## Usage
//!
//! ```rust
//! use sx127x_rs::util::logging::{log_payload_hex, LogThrottle};
//!
//! // at most 5 CRC warnings per second
//! let mut throttle = LogThrottle::new(1000, 5);
//! if throttle.allow() {
//!     log::warn!("Payload CRC error");
//! }
//!
//! log_payload_hex("RX", &[0x40, 0x11, 0x22]);
//! ```

use std::time::Instant;

/// Longest payload prefix written by [`log_payload_hex`]
const MAX_LOG_BYTES: usize = 64;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Messages refused since the throttle was created
    suppressed: u64,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    ///
    /// # Arguments
    /// * `window_ms` - Time window in milliseconds
    /// * `cap` - Maximum messages allowed per window
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            window_ms: self.window_ms,
            cap: self.cap,
            count: self.count,
            suppressed: self.suppressed,
            window_remaining_ms: self
                .window_ms
                .saturating_sub(self.t0.elapsed().as_millis() as u64),
        }
    }

    /// Reset the throttle (start new window immediately)
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Statistics about a log throttle instance
#[derive(Debug, Clone, Copy)]
pub struct ThrottleStats {
    pub window_ms: u64,
    pub cap: u32,
    pub count: u32,
    pub suppressed: u64,
    pub window_remaining_ms: u64,
}

/// Log a payload in hex at debug level, truncated to 64 bytes
pub fn log_payload_hex(prefix: &str, data: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };
    log::debug!(
        "{}: {}{}",
        prefix,
        crate::util::hex::format_hex_compact(shown),
        suffix
    );
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

/// Log an error with throttling
#[macro_export]
macro_rules! log_error_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::error!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_basic() {
        let mut throttle = LogThrottle::new(1000, 3);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());

        // 4th message should be throttled
        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.stats().suppressed, 2);
    }

    #[test]
    fn test_log_throttle_reset() {
        let mut throttle = LogThrottle::new(1000, 2);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());

        throttle.reset();
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());
    }

    #[test]
    fn test_log_throttle_window_expiry() {
        let mut throttle = LogThrottle::new(10, 1);
        assert!(throttle.allow());
        assert!(!throttle.allow());

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(throttle.allow());
    }

    #[test]
    fn test_throttled_macro() {
        let mut throttle = LogThrottle::new(1000, 1);
        crate::log_warn_throttled!(throttle, "first {}", 1);
        crate::log_warn_throttled!(throttle, "second {}", 2);
        assert_eq!(throttle.stats().count, 2);
        assert_eq!(throttle.stats().suppressed, 1);
    }

    #[test]
    fn test_log_payload_hex_long_payload() {
        // exercises the truncation path without a logger installed
        log_payload_hex("RX", &[0xAA; 200]);
    }
}
