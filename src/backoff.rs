//! Deterministic retry interval generators.
//!
//! A [`BackoffScheduler`] owns the attempt counter of exactly one retry loop. Every
//! [`next_interval`](BackoffScheduler::next_interval) call advances the counter and returns
//! the delay in milliseconds before the next attempt, or [`STOP`] when the loop should give
//! up. [`reset`](BackoffScheduler::reset) rewinds the sequence so it repeats identically.
//!
//! Incremental and exponential strategies open with a one-unit bootstrap delay before their
//! progression starts; the progression then restarts from its first term on call #2.

// self
use crate::_prelude::*;

/// Interval returned when retrying should stop.
pub const STOP: i64 = -1;

/// Unit in which strategy parameters are expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
	/// Milliseconds (`ms`).
	#[default]
	#[serde(rename = "ms")]
	Milliseconds,
	/// Seconds (`s`).
	#[serde(rename = "s")]
	Seconds,
	/// Minutes (`m`).
	#[serde(rename = "m")]
	Minutes,
}
impl TimeUnit {
	/// Milliseconds in one unit.
	pub const fn millis(self) -> i64 {
		match self {
			TimeUnit::Milliseconds => 1,
			TimeUnit::Seconds => 1_000,
			TimeUnit::Minutes => 60_000,
		}
	}

	/// Bootstrap delay in milliseconds; millisecond schedules bootstrap at one second.
	pub const fn bootstrap_millis(self) -> i64 {
		match self {
			TimeUnit::Milliseconds | TimeUnit::Seconds => 1_000,
			TimeUnit::Minutes => 60_000,
		}
	}

	/// Converts `value` units to milliseconds, saturating on overflow.
	pub fn to_millis(self, value: u64) -> i64 {
		i64::try_from(value).unwrap_or(i64::MAX).saturating_mul(self.millis())
	}

	/// Returns the short label used in configuration files.
	pub const fn as_str(self) -> &'static str {
		match self {
			TimeUnit::Milliseconds => "ms",
			TimeUnit::Seconds => "s",
			TimeUnit::Minutes => "m",
		}
	}
}
impl Display for TimeUnit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for TimeUnit {
	type Err = UnknownTimeUnit;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"ms" => Ok(TimeUnit::Milliseconds),
			"s" => Ok(TimeUnit::Seconds),
			"m" => Ok(TimeUnit::Minutes),
			other => Err(UnknownTimeUnit(other.to_owned())),
		}
	}
}

/// Error returned when parsing an unsupported [`TimeUnit`] label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown time unit `{0}`; expected ms, s, or m.")]
pub struct UnknownTimeUnit(pub String);

/// Retry strategy and its parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BackoffStrategy {
	/// Never retry.
	#[default]
	Off,
	/// Constant interval after an initial delay.
	FixedInterval {
		/// Unit of `interval` and `initial_delay`.
		#[serde(default)]
		unit: TimeUnit,
		/// Delay returned from call #2 onwards.
		interval: u64,
		/// Delay returned by call #1; one unit when absent.
		#[serde(default)]
		initial_delay: Option<u64>,
	},
	/// Arithmetic progression capped at `max_interval`.
	IncrementalBackoff {
		/// Unit of `increment` and `max_interval`.
		#[serde(default)]
		unit: TimeUnit,
		/// Step added per attempt.
		increment: u64,
		/// Upper bound for any returned interval.
		max_interval: u64,
	},
	/// Doubling progression capped at `max_interval`.
	ExponentialBackoff {
		/// Unit of the bootstrap delay and `max_interval`.
		#[serde(default)]
		unit: TimeUnit,
		/// Upper bound for any returned interval.
		max_interval: u64,
	},
}
impl BackoffStrategy {
	/// Fixed interval with a one-unit initial delay.
	pub const fn fixed(unit: TimeUnit, interval: u64) -> Self {
		Self::FixedInterval { unit, interval, initial_delay: None }
	}

	/// Returns the stable strategy label.
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Off => "off",
			Self::FixedInterval { .. } => "fixed-interval",
			Self::IncrementalBackoff { .. } => "incremental-backoff",
			Self::ExponentialBackoff { .. } => "exponential-backoff",
		}
	}

	/// Computes the interval for the 1-based call number `call`.
	fn interval_for(&self, call: u32) -> i64 {
		match *self {
			Self::Off => STOP,
			Self::FixedInterval { unit, interval, initial_delay } =>
				if call <= 1 {
					initial_delay.map_or(unit.bootstrap_millis(), |delay| unit.to_millis(delay))
				} else {
					unit.to_millis(interval)
				},
			Self::IncrementalBackoff { unit, increment, max_interval } => {
				if call <= 1 {
					return unit.bootstrap_millis();
				}

				let step = unit.to_millis(increment).saturating_mul(i64::from(call - 1));

				step.min(unit.to_millis(max_interval))
			},
			Self::ExponentialBackoff { unit, max_interval } => {
				let cap = unit.to_millis(max_interval);

				if call <= 1 {
					return unit.bootstrap_millis();
				}

				2_i64
					.checked_pow(call - 1)
					.and_then(|factor| factor.checked_mul(unit.bootstrap_millis()))
					.map_or(cap, |interval| interval.min(cap))
			},
		}
	}
}

/// Stateful generator of retry delays for one logical retry loop.
///
/// Sharing one scheduler across unrelated retry loops interleaves their sequences; give
/// each loop its own instance or [`reset`](Self::reset) it between loops.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffScheduler {
	strategy: BackoffStrategy,
	attempts: u32,
}
impl BackoffScheduler {
	/// Creates a scheduler positioned before call #1.
	pub fn new(strategy: BackoffStrategy) -> Self {
		Self { strategy, attempts: 0 }
	}

	/// Scheduler that never retries.
	pub fn off() -> Self {
		Self::new(BackoffStrategy::Off)
	}

	/// Advances the sequence and returns the next delay in milliseconds, or [`STOP`].
	pub fn next_interval(&mut self) -> i64 {
		self.attempts = self.attempts.saturating_add(1);

		self.strategy.interval_for(self.attempts)
	}

	/// Advances the sequence and returns the next delay, or `None` when retrying should stop.
	pub fn next_delay(&mut self) -> Option<std::time::Duration> {
		u64::try_from(self.next_interval()).ok().map(std::time::Duration::from_millis)
	}

	/// Rewinds the sequence so the next call reproduces call #1.
	pub fn reset(&mut self) {
		self.attempts = 0;
	}

	/// Number of intervals produced since creation or the last reset.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Strategy driving this scheduler.
	pub fn strategy(&self) -> &BackoffStrategy {
		&self.strategy
	}
}
impl From<BackoffStrategy> for BackoffScheduler {
	fn from(strategy: BackoffStrategy) -> Self {
		Self::new(strategy)
	}
}
