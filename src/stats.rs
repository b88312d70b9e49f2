const KILO: u64 = 1_000;
const MEGA: u64 = 1_000 * 1_000;
const GIGA: u64 = 1_000 * 1_000 * 1_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
}

impl TrafficStats {
    pub fn tx_label(&self) -> String {
        format_bytes(self.tx_bytes)
    }

    pub fn rx_label(&self) -> String {
        format_bytes(self.rx_bytes)
    }
}

/// Decimal prefixes, truncating.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GIGA {
        format!("{} GB", bytes / GIGA)
    } else if bytes >= MEGA {
        format!("{} MB", bytes / MEGA)
    } else if bytes >= KILO {
        format!("{} KB", bytes / KILO)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(999), "999 bytes");
        assert_eq!(format_bytes(1000), "1 KB");
        assert_eq!(format_bytes(999_999), "999 KB");
        assert_eq!(format_bytes(1_000_000), "1 MB");
        assert_eq!(format_bytes(999_999_999), "999 MB");
        assert_eq!(format_bytes(1_000_000_000), "1 GB");
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        assert_eq!(format_bytes(1_999), "1 KB");
        assert_eq!(format_bytes(2_999_999), "2 MB");
        assert_eq!(format_bytes(u64::MAX), "18446744073 GB");
    }

    #[test]
    fn test_labels() {
        let stats = TrafficStats {
            tx_bytes: 1_500,
            rx_bytes: 42,
        };
        assert_eq!(stats.tx_label(), "1 KB");
        assert_eq!(stats.rx_label(), "42 bytes");
    }
}
