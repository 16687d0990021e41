// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Turns pad hits into engine triggers.
//!
//! The controller owns the kit selection and a per-pad debounce. It never
//! aborts on a failed trigger; a hit that cannot play is logged and
//! dropped so the next hit still lands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::{KitConfig, PADS_PER_KIT};
use crate::sampler::PadEngine;

/// Hits on the same pad closer together than this are treated as contact
/// bounce from a single touch and dropped. Distinct pads are unaffected.
pub const MIN_TRIGGER_INTERVAL: Duration = Duration::from_millis(100);

/// Routes pad hits through the active kit to the engine.
pub struct PadController {
    /// The engine that renders triggers.
    engine: Arc<PadEngine>,
    /// All configured kits.
    kits: Vec<KitConfig>,
    /// Index of the active kit.
    active_kit: usize,
    /// Time of the last accepted hit, per pad.
    last_hit: Vec<Option<Instant>>,
}

impl PadController {
    /// Creates a controller over the given kits. The first kit starts
    /// active.
    pub fn new(engine: Arc<PadEngine>, kits: Vec<KitConfig>) -> PadController {
        PadController {
            engine,
            kits,
            active_kit: 0,
            last_hit: vec![None; PADS_PER_KIT],
        }
    }

    /// Handles a hit on the given pad: debounces it and triggers the
    /// pad's sample in the active kit. Returns true if a voice was
    /// started.
    pub fn hit(&mut self, pad_index: usize) -> bool {
        let Some(kit) = self.kits.get(self.active_kit) else {
            warn!(pad = pad_index, "Pad hit with no kit configured");
            return false;
        };
        let Some(pad) = kit.pads().get(pad_index) else {
            warn!(pad = pad_index, "Pad hit out of range");
            return false;
        };

        let now = Instant::now();
        if let Some(last) = self.last_hit[pad_index] {
            if now.duration_since(last) < MIN_TRIGGER_INTERVAL {
                return false;
            }
        }
        self.last_hit[pad_index] = Some(now);

        if let Err(e) = self.engine.trigger(pad.sample()) {
            warn!(pad = pad.name(), sample = pad.sample(), err = %e, "Dropping pad hit");
            return false;
        }
        true
    }

    /// Switches to the kit with the given name. Playing voices are
    /// unaffected; only future hits resolve through the new kit.
    pub fn select_kit(&mut self, name: &str) -> bool {
        match self.kits.iter().position(|kit| kit.name() == name) {
            Some(index) => {
                self.active_kit = index;
                info!(kit = name, "Kit selected");
                true
            }
            None => {
                warn!(kit = name, "Unknown kit");
                false
            }
        }
    }

    /// Gets the active kit, if any kit is configured.
    pub fn active_kit(&self) -> Option<&KitConfig> {
        self.kits.get(self.active_kit)
    }

    /// Gets all configured kits.
    pub fn kits(&self) -> &[KitConfig] {
        &self.kits
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::audio::mock;
    use crate::config::PadConfig;
    use crate::sampler::DEFAULT_GAIN;
    use crate::store::SampleStore;
    use crate::testutil::{sine_wave, wav_bytes};

    fn test_kit(name: &str, sample: &str) -> KitConfig {
        let pads = (0..PADS_PER_KIT)
            .map(|i| PadConfig::new(format!("Pad {}", i + 1), sample.to_string()))
            .collect();
        KitConfig::new(name.to_string(), pads)
    }

    fn test_controller(kits: Vec<KitConfig>) -> (PadController, Arc<mock::Device>) {
        let mut store = SampleStore::new();
        for id in ["kick", "snare"] {
            let samples = sine_wave(220.0, 44100, 2205);
            store.register(id, wav_bytes(&samples, 1, 44100)).unwrap();
        }

        let mock = Arc::new(mock::Device::get("mock"));
        let engine = Arc::new(PadEngine::new(mock.clone(), 44100, 2, DEFAULT_GAIN));
        engine.initialize(&store).unwrap();

        (PadController::new(engine, kits), mock)
    }

    #[test]
    fn test_hit_triggers_pad_sample() {
        let (mut controller, mock) = test_controller(vec![test_kit("Kit", "kick")]);

        assert!(controller.hit(0));
        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 1);
    }

    #[test]
    fn test_rapid_same_pad_hits_are_debounced() {
        let (mut controller, mock) = test_controller(vec![test_kit("Kit", "kick")]);

        assert!(controller.hit(0));
        assert!(!controller.hit(0));
        assert!(!controller.hit(0));

        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 1);
    }

    #[test]
    fn test_same_pad_retriggers_after_interval() {
        let (mut controller, mock) = test_controller(vec![test_kit("Kit", "kick")]);

        assert!(controller.hit(0));
        thread::sleep(MIN_TRIGGER_INTERVAL + Duration::from_millis(10));
        assert!(controller.hit(0));

        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 2);
    }

    #[test]
    fn test_distinct_pads_are_not_debounced_together() {
        let (mut controller, mock) = test_controller(vec![test_kit("Kit", "kick")]);

        assert!(controller.hit(0));
        assert!(controller.hit(1));
        assert!(controller.hit(2));

        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 3);
    }

    #[test]
    fn test_out_of_range_pad_is_dropped() {
        let (mut controller, mock) = test_controller(vec![test_kit("Kit", "kick")]);

        assert!(!controller.hit(PADS_PER_KIT));
        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 0);
    }

    #[test]
    fn test_hit_with_no_kits_is_dropped() {
        let (mut controller, mock) = test_controller(vec![]);

        assert!(!controller.hit(0));
        assert_eq!(mock.voices_started(), 0);
    }

    #[test]
    fn test_select_kit_changes_routing() {
        let (mut controller, mock) = test_controller(vec![
            test_kit("First", "kick"),
            test_kit("Second", "snare"),
        ]);

        assert!(controller.select_kit("Second"));
        assert_eq!(controller.active_kit().unwrap().name(), "Second");

        assert!(controller.hit(0));
        mock.mix_frames(64);
        let mixer = mock.mixer().unwrap();
        mixer.with_active_voices(|voices| {
            assert_eq!(voices[0].sample_id(), "snare");
        });
    }

    #[test]
    fn test_select_unknown_kit_keeps_current() {
        let (mut controller, _mock) = test_controller(vec![test_kit("Only", "kick")]);

        assert!(!controller.select_kit("Nope"));
        assert_eq!(controller.active_kit().unwrap().name(), "Only");
    }

    #[test]
    fn test_failed_trigger_does_not_poison_later_hits() {
        let mut kit_pads: Vec<PadConfig> = (0..PADS_PER_KIT)
            .map(|i| PadConfig::new(format!("Pad {}", i + 1), "kick".to_string()))
            .collect();
        kit_pads[0] = PadConfig::new("Pad 1".to_string(), "missing".to_string());
        let kit = KitConfig::new("Kit".to_string(), kit_pads);

        let (mut controller, mock) = test_controller(vec![kit]);

        // Pad 1 references a sample the engine never decoded.
        assert!(!controller.hit(0));
        assert!(controller.hit(1));

        mock.mix_frames(64);
        assert_eq!(mock.voices_started(), 1);
    }
}
