//! Capability model and channel/frequency mapping
//!
//! Every radio backend reports what it can do as a fixed set of boolean
//! flags, populated once while the session opens and read-only afterwards.
//! Every driver operation checks the relevant flag before touching the
//! hardware; operations fail with [`Error::MissingCapability`] rather than
//! silently degrading.

use crate::{Error, Result};

/// Feature flags a radio backend may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Receive frames promiscuously
    Sniff,
    /// Tune to a channel/page
    SetChannel,
    /// Transmit arbitrary frames
    Inject,
    /// Constant physical-layer jamming
    PhyJam,
    /// Reactive (preamble-triggered) jamming
    PhyJamReflexive,
    /// Firmware acknowledges frames addressed to it on its own
    SelfAck,
    /// Hardware sync-word / preamble configuration
    SetSync,
    /// Device exposes a bootloader entry command
    Boot,
    /// 2.4 GHz band (channels 11-26, page 0)
    Freq2400,
    /// 900 MHz legacy band
    Freq900,
    /// 863 MHz sub-GHz band (page 28)
    Freq863,
    /// 868 MHz sub-GHz band (page 29)
    Freq868,
    /// 870 MHz sub-GHz band (page 30)
    Freq870,
    /// 915 MHz sub-GHz band (page 31)
    Freq915,
}

impl Capability {
    /// All defined capability flags, in declaration order
    pub const ALL: [Capability; 14] = [
        Capability::Sniff,
        Capability::SetChannel,
        Capability::Inject,
        Capability::PhyJam,
        Capability::PhyJamReflexive,
        Capability::SelfAck,
        Capability::SetSync,
        Capability::Boot,
        Capability::Freq2400,
        Capability::Freq900,
        Capability::Freq863,
        Capability::Freq868,
        Capability::Freq870,
        Capability::Freq915,
    ];

    fn index(self) -> usize {
        Capability::ALL.iter().position(|&c| c == self).unwrap()
    }
}

/// One sub-GHz band (or the 2.4 GHz band on page 0)
struct Band {
    page: u8,
    capability: Capability,
    base_khz: u32,
    step_khz: u32,
    first_channel: u8,
    last_channel: u8,
}

/// Channel pages and their piecewise-linear frequency mappings
static BANDS: [Band; 5] = [
    Band {
        page: 0,
        capability: Capability::Freq2400,
        base_khz: 2_405_000,
        step_khz: 5_000,
        first_channel: 11,
        last_channel: 26,
    },
    Band {
        page: 28,
        capability: Capability::Freq863,
        base_khz: 863_250,
        step_khz: 200,
        first_channel: 0,
        last_channel: 26,
    },
    Band {
        page: 29,
        capability: Capability::Freq868,
        base_khz: 868_650,
        step_khz: 200,
        first_channel: 0,
        last_channel: 8,
    },
    Band {
        page: 30,
        capability: Capability::Freq870,
        base_khz: 870_250,
        step_khz: 200,
        first_channel: 0,
        last_channel: 26,
    },
    Band {
        page: 31,
        capability: Capability::Freq915,
        base_khz: 915_350,
        step_khz: 200,
        first_channel: 0,
        last_channel: 26,
    },
];

fn band_for_page(page: u8) -> Option<&'static Band> {
    BANDS.iter().find(|b| b.page == page)
}

/// Center frequency in kHz for a channel/page pair.
///
/// Total function: returns 0 for any channel/page combination outside the
/// defined bands instead of failing.
pub fn frequency(channel: u8, page: u8) -> u32 {
    match band_for_page(page) {
        Some(band) if (band.first_channel..=band.last_channel).contains(&channel) => {
            band.base_khz + u32::from(channel - band.first_channel) * band.step_khz
        }
        _ => 0,
    }
}

/// The set of feature flags one open device reports
///
/// Owned by the session, populated exactly once by the backend that bound
/// the device, and read-only from then on.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    flags: [bool; Capability::ALL.len()],
}

impl CapabilitySet {
    /// Create a capability set with every flag cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Query a single flag
    pub fn check(&self, capability: Capability) -> bool {
        self.flags[capability.index()]
    }

    /// Fail with [`Error::MissingCapability`] unless the flag is set
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.check(capability) {
            Ok(())
        } else {
            Err(Error::MissingCapability(capability))
        }
    }

    /// Set or clear a flag
    ///
    /// Called by backends while populating the set at session-open time.
    pub fn set(&mut self, capability: Capability, enabled: bool) {
        self.flags[capability.index()] = enabled;
    }

    /// Whether this device may tune to `channel` on `page`
    ///
    /// Requires both a defined band for the page (with the channel inside
    /// the band's range) and the matching frequency capability flag.
    pub fn is_valid_channel(&self, channel: u8, page: u8) -> bool {
        match band_for_page(page) {
            Some(band) => {
                self.check(band.capability)
                    && (band.first_channel..=band.last_channel).contains(&channel)
            }
            None => false,
        }
    }

    /// Iterator over the flags that are set
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .iter()
            .copied()
            .filter(move |&c| self.check(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_set_requires_nothing() {
        let caps = CapabilitySet::new();
        for cap in Capability::ALL {
            assert!(!caps.check(cap));
            assert!(matches!(
                caps.require(cap),
                Err(Error::MissingCapability(c)) if c == cap
            ));
        }
    }

    #[test]
    fn set_flag_is_isolated() {
        let mut caps = CapabilitySet::new();
        caps.set(Capability::Inject, true);
        assert!(caps.require(Capability::Inject).is_ok());
        for cap in Capability::ALL {
            if cap != Capability::Inject {
                assert!(caps.require(cap).is_err());
            }
        }
        caps.set(Capability::Inject, false);
        assert!(caps.require(Capability::Inject).is_err());
    }

    #[test]
    fn channel_validity_2400() {
        let mut caps = CapabilitySet::new();
        caps.set(Capability::Freq2400, true);
        assert!(caps.is_valid_channel(11, 0));
        assert!(caps.is_valid_channel(26, 0));
        assert!(!caps.is_valid_channel(10, 0));
        assert!(!caps.is_valid_channel(27, 0));
        // Flag present but page not defined
        assert!(!caps.is_valid_channel(11, 1));
    }

    #[test]
    fn channel_validity_subghz() {
        let mut caps = CapabilitySet::new();
        caps.set(Capability::Freq863, true);
        assert!(caps.is_valid_channel(0, 28));
        assert!(caps.is_valid_channel(26, 28));
        assert!(!caps.is_valid_channel(27, 28));
        // 868 band flag is not set, so page 29 stays invalid
        assert!(!caps.is_valid_channel(0, 29));

        let mut caps = CapabilitySet::new();
        caps.set(Capability::Freq868, true);
        assert!(caps.is_valid_channel(8, 29));
        assert!(!caps.is_valid_channel(9, 29));
    }

    #[test]
    fn channel_validity_without_band_flag() {
        let caps = CapabilitySet::new();
        assert!(!caps.is_valid_channel(11, 0));
        assert!(!caps.is_valid_channel(0, 28));
    }

    #[test]
    fn frequency_mapping() {
        assert_eq!(frequency(11, 0), 2_405_000);
        assert_eq!(frequency(26, 0), 2_480_000);
        assert_eq!(frequency(0, 28), 863_250);
        assert_eq!(frequency(26, 28), 868_450);
        assert_eq!(frequency(0, 29), 868_650);
        assert_eq!(frequency(8, 29), 870_250);
        assert_eq!(frequency(0, 30), 870_250);
        assert_eq!(frequency(0, 31), 915_350);
    }

    #[test]
    fn frequency_invalid_pairs_are_zero() {
        assert_eq!(frequency(10, 0), 0);
        assert_eq!(frequency(27, 0), 0);
        assert_eq!(frequency(9, 29), 0);
        assert_eq!(frequency(11, 1), 0);
        assert_eq!(frequency(0, 27), 0);
    }

    #[test]
    fn enabled_iterator() {
        let mut caps = CapabilitySet::new();
        caps.set(Capability::Sniff, true);
        caps.set(Capability::Freq2400, true);
        let enabled: Vec<_> = caps.enabled().collect();
        assert_eq!(enabled, vec![Capability::Sniff, Capability::Freq2400]);
    }
}
