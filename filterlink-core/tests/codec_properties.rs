//! Property tests for the wire codec
//!
//! - decode(encode(x)) == x for every valid x
//! - anything validate rejects, decode and from_options reject too
//! - magnitude is accepted iff it equals 2, for any integer

mod common;

use common::{invalid_temporal, raw_bytes, valid_decimation, valid_temporal};
use filterlink_core::codec::{
    self, Decimation, DecimationParams, FilterParams, ParameterCodec, Temporal, TemporalParams,
};
use filterlink_core::constants::{MAGNITUDE, TOGGLE};
use filterlink_core::options::NamedValue;
use filterlink_core::{FilterError, FilterType};
use proptest::prelude::*;

fn write_unchecked(params: &TemporalParams) -> Vec<u8> {
    let mut raw = vec![params.enabled as u8];
    raw.extend_from_slice(&params.alpha.to_le_bytes());
    raw.extend_from_slice(&params.delta.to_le_bytes());
    raw.extend_from_slice(&params.persistency.to_le_bytes());
    raw
}

proptest! {
    #[test]
    fn decimation_round_trips(params in valid_decimation()) {
        let bytes = Decimation::encode(&params).unwrap();
        prop_assert_eq!(Decimation::decode(&bytes).unwrap(), params);
        prop_assert_eq!(Decimation::from_options(&Decimation::to_options(&params)).unwrap(), params);
    }

    #[test]
    fn temporal_round_trips(params in valid_temporal()) {
        let bytes = Temporal::encode(&params).unwrap();
        prop_assert_eq!(bytes.len(), 13);
        prop_assert_eq!(Temporal::decode(&bytes).unwrap(), params);
        prop_assert_eq!(Temporal::from_options(&Temporal::to_options(&params)).unwrap(), params);
    }

    #[test]
    fn invalid_temporal_rejected_on_every_path(params in invalid_temporal()) {
        prop_assert!(Temporal::validate(&params).is_err());
        prop_assert!(Temporal::encode(&params).is_err());
        prop_assert!(Temporal::decode(&write_unchecked(&params)).is_err());
        prop_assert!(Temporal::from_options(&Temporal::to_options(&params)).is_err());
    }

    #[test]
    fn decode_and_validate_agree(bytes in raw_bytes()) {
        for filter in FilterType::ALL {
            let decoded = codec::decode(filter, &bytes);
            prop_assert_eq!(decoded.is_ok(), codec::validate(filter, &bytes).is_ok());
            if let Ok(params) = decoded {
                // Anything decode accepts re-encodes to the same bytes.
                let reencoded = codec::encode(&params).unwrap();
                prop_assert_eq!(reencoded.as_slice(), bytes.as_slice());
            }
        }
    }

    #[test]
    fn wrong_length_is_always_a_size_error(bytes in raw_bytes()) {
        for filter in FilterType::ALL {
            if bytes.len() != filter.buffer_len() {
                let is_size_error = matches!(
                    codec::decode(filter, &bytes),
                    Err(FilterError::BufferSize { .. })
                );
                prop_assert!(is_size_error);
            }
        }
    }

    #[test]
    fn magnitude_accepted_iff_two(magnitude in any::<i64>(), enabled in any::<bool>()) {
        let values = vec![NamedValue::new(TOGGLE, enabled), NamedValue::new(MAGNITUDE, magnitude)];
        let parsed = Decimation::from_options(&values);
        prop_assert_eq!(parsed.is_ok(), magnitude == 2);
    }

    #[test]
    fn magnitude_byte_accepted_iff_two(magnitude in any::<u8>()) {
        let params = DecimationParams { enabled: true, magnitude };
        prop_assert_eq!(Decimation::encode(&params).is_ok(), magnitude == 2);
        prop_assert_eq!(Decimation::decode(&[1, magnitude]).is_ok(), magnitude == 2);
    }
}

#[test]
fn persistency_boundary_uses_bytes_nine_to_twelve() {
    // Offset 13 is one past the end; the field is the 4 bytes before it.
    let params = TemporalParams {
        enabled: true,
        alpha: 0.4,
        delta: 20,
        persistency: 8,
    };
    let bytes = Temporal::encode(&params).unwrap();
    assert_eq!(bytes.get(13), None);
    assert_eq!(&bytes[9..13], &[8, 0, 0, 0]);

    let mut widened = bytes.to_vec();
    widened[9] = 9;
    assert!(Temporal::decode(&widened).is_err());
}

#[test]
fn dispatching_functions_match_typed_codecs() {
    let params = FilterParams::from(DecimationParams {
        enabled: true,
        magnitude: 2,
    });
    assert_eq!(codec::encode(&params).unwrap(), [1, 2]);
    assert_eq!(codec::decode(FilterType::Decimation, &[1, 2]).unwrap(), params);
    assert!(codec::decode(FilterType::Temporal, &[1, 2]).is_err());
}
