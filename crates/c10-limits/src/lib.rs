mod error;

pub use error::LimitsError;

/// Smallest node packet: header, CSDW, file length and one 20-byte entry.
pub const MIN_NODE_PACKET_BYTES: usize = 24 + 4 + 8 + 20;
/// Smallest root packet: header, CSDW, file length, one 16-byte record and the back-pointer.
pub const MIN_ROOT_PACKET_BYTES: usize = 24 + 4 + 8 + 16 + 8;

/// Shared, validated size budgets for index emission and source scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLimits {
    pub max_index_packet_bytes: usize,
    pub max_source_packet_bytes: usize,
}

impl IndexLimits {
    pub const DEFAULT_MAX_INDEX_PACKET_BYTES: usize = 524_000;
    pub const DEFAULT_MAX_SOURCE_PACKET_BYTES: usize = 16 * 1024 * 1024;

    #[must_use]
    pub const fn conservative_defaults() -> Self {
        Self {
            max_index_packet_bytes: Self::DEFAULT_MAX_INDEX_PACKET_BYTES,
            max_source_packet_bytes: Self::DEFAULT_MAX_SOURCE_PACKET_BYTES,
        }
    }

    /// Validate internal invariants before handing limits to the reader or builder.
    pub fn validate(&self) -> Result<(), LimitsError> {
        ensure_non_zero("max_index_packet_bytes", self.max_index_packet_bytes)?;
        ensure_non_zero("max_source_packet_bytes", self.max_source_packet_bytes)?;

        let minimum = MIN_NODE_PACKET_BYTES.max(MIN_ROOT_PACKET_BYTES);
        if self.max_index_packet_bytes < minimum {
            return Err(LimitsError::IndexPacketBelowMinimum {
                max_index_packet_bytes: self.max_index_packet_bytes,
                minimum,
            });
        }

        ensure_fits_u32("max_index_packet_bytes", self.max_index_packet_bytes)?;
        ensure_fits_u32("max_source_packet_bytes", self.max_source_packet_bytes)?;
        Ok(())
    }
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self::conservative_defaults()
    }
}

fn ensure_non_zero(field: &'static str, value: usize) -> Result<(), LimitsError> {
    if value == 0 {
        return Err(LimitsError::Zero { field });
    }

    Ok(())
}

fn ensure_fits_u32(field: &'static str, value: usize) -> Result<(), LimitsError> {
    if u32::try_from(value).is_err() {
        return Err(LimitsError::ExceedsPacketLengthField { field, value });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IndexLimits, LimitsError, MIN_ROOT_PACKET_BYTES};

    #[test]
    fn conservative_defaults_validate() {
        let limits = IndexLimits::conservative_defaults();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.max_index_packet_bytes, 524_000);
    }

    #[test]
    fn rejects_zero_values() {
        let mut limits = IndexLimits::conservative_defaults();
        limits.max_source_packet_bytes = 0;

        assert_eq!(
            limits.validate(),
            Err(LimitsError::Zero {
                field: "max_source_packet_bytes"
            })
        );
    }

    #[test]
    fn rejects_index_ceiling_below_single_record_packet() {
        let limits = IndexLimits {
            max_index_packet_bytes: 40,
            ..IndexLimits::conservative_defaults()
        };

        assert_eq!(
            limits.validate(),
            Err(LimitsError::IndexPacketBelowMinimum {
                max_index_packet_bytes: 40,
                minimum: MIN_ROOT_PACKET_BYTES,
            })
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn rejects_values_wider_than_packet_length_field() {
        let limits = IndexLimits {
            max_index_packet_bytes: u32::MAX as usize + 1,
            ..IndexLimits::conservative_defaults()
        };

        assert!(matches!(
            limits.validate(),
            Err(LimitsError::ExceedsPacketLengthField {
                field: "max_index_packet_bytes",
                ..
            })
        ));
    }
}
