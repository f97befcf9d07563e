//! `Date` header values shared between the signing string and the outbound request.

// crates.io
use time::UtcOffset;
// self
use crate::_prelude::*;

/// Formats `instant` as `YYYY-MM-DDTHH:mm:ss.fffffffZ` in UTC.
///
/// The partner expects seven fractional digits but the value is derived from millisecond
/// precision: the milliseconds are scaled by 10 000, so the low four digits are always
/// `0000`.
pub fn signature_date(instant: OffsetDateTime) -> String {
	let utc = instant.to_offset(UtcOffset::UTC);

	format!(
		"{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:07}Z",
		utc.year(),
		u8::from(utc.month()),
		utc.day(),
		utc.hour(),
		utc.minute(),
		utc.second(),
		u32::from(utc.millisecond()) * 10_000,
	)
}

/// Formats the current clock with [`signature_date`].
pub fn signature_date_now() -> String {
	signature_date(OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn assert_wire_shape(value: &str) {
		let bytes = value.as_bytes();

		assert_eq!(bytes.len(), 28, "{value}");

		for (idx, byte) in bytes.iter().enumerate() {
			match idx {
				4 | 7 => assert_eq!(*byte, b'-', "{value}"),
				10 => assert_eq!(*byte, b'T', "{value}"),
				13 | 16 => assert_eq!(*byte, b':', "{value}"),
				19 => assert_eq!(*byte, b'.', "{value}"),
				27 => assert_eq!(*byte, b'Z', "{value}"),
				_ => assert!(byte.is_ascii_digit(), "{value}"),
			}
		}

		assert_eq!(&value[23..27], "0000", "{value}");
	}

	#[test]
	fn milliseconds_expand_to_seven_digits() {
		let instant = macros::datetime!(2024-01-02 03:04:05.678 UTC);

		assert_eq!(signature_date(instant), "2024-01-02T03:04:05.6780000Z");
	}

	#[test]
	fn sub_millisecond_precision_is_dropped() {
		let instant = macros::datetime!(2024-12-31 23:59:59.9999999 UTC);

		assert_eq!(signature_date(instant), "2024-12-31T23:59:59.9990000Z");

		let whole = macros::datetime!(2024-06-01 00:00:00.007 UTC);

		assert_eq!(signature_date(whole), "2024-06-01T00:00:00.0070000Z");
	}

	#[test]
	fn offsets_are_normalized_to_utc() {
		let instant = macros::datetime!(2024-01-02 05:04:05.250 +02:00);

		assert_eq!(signature_date(instant), "2024-01-02T03:04:05.2500000Z");
	}

	#[test]
	fn current_clock_matches_wire_shape() {
		for _ in 0..16 {
			assert_wire_shape(&signature_date_now());
		}
	}
}
