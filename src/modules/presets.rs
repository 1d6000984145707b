use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{LocalizedLabel, Preset, PresetCategory};

const EXTERIOR: &[Preset] = &[
    Preset {
        id: "tropical-resort",
        label: LocalizedLabel {
            en: "Tropical Resort",
            vi: "Khu nghỉ dưỡng nhiệt đới",
        },
        template: "Photorealistic architectural render of a tropical beach resort, \
                   thatched roofs, infinity pool facing the ocean, palm trees, \
                   golden hour lighting, wide angle",
    },
    Preset {
        id: "modern-villa",
        label: LocalizedLabel {
            en: "Modern Villa",
            vi: "Biệt thự hiện đại",
        },
        template: "Photorealistic exterior of a minimalist modern villa, \
                   white concrete and floor-to-ceiling glass, landscaped garden, \
                   soft daylight, eye-level perspective",
    },
    Preset {
        id: "indochine-townhouse",
        label: LocalizedLabel {
            en: "Indochine Townhouse",
            vi: "Nhà phố Đông Dương",
        },
        template: "Street view of an Indochine style townhouse, yellow ochre walls, \
                   green wooden shutters, wrought iron balconies, bougainvillea, \
                   warm afternoon light",
    },
];

const INTERIOR: &[Preset] = &[
    Preset {
        id: "scandinavian-living",
        label: LocalizedLabel {
            en: "Scandinavian Living Room",
            vi: "Phòng khách Bắc Âu",
        },
        template: "Interior render of a Scandinavian living room, light oak floor, \
                   linen sofa, white walls, indoor plants, diffuse natural light",
    },
    Preset {
        id: "japandi-bedroom",
        label: LocalizedLabel {
            en: "Japandi Bedroom",
            vi: "Phòng ngủ Japandi",
        },
        template: "Interior render of a Japandi bedroom, low platform bed, \
                   neutral earth tones, paper lamp, calm minimal composition",
    },
    Preset {
        id: "luxury-kitchen",
        label: LocalizedLabel {
            en: "Luxury Kitchen",
            vi: "Bếp sang trọng",
        },
        template: "Interior render of a luxury kitchen, marble island, \
                   brass fixtures, dark walnut cabinetry, pendant lighting",
    },
];

const LANDSCAPE: &[Preset] = &[
    Preset {
        id: "zen-garden",
        label: LocalizedLabel {
            en: "Zen Garden",
            vi: "Vườn thiền",
        },
        template: "Japanese zen garden, raked gravel, moss covered stones, \
                   maple tree, stone lantern, misty morning",
    },
    Preset {
        id: "rooftop-terrace",
        label: LocalizedLabel {
            en: "Rooftop Terrace",
            vi: "Sân thượng",
        },
        template: "Urban rooftop terrace garden, timber decking, planters with \
                   grasses, string lights, city skyline at dusk",
    },
];

static CATEGORIES: &[PresetCategory] = &[
    PresetCategory {
        id: "exterior",
        label: LocalizedLabel {
            en: "Exterior",
            vi: "Ngoại thất",
        },
        presets: EXTERIOR,
    },
    PresetCategory {
        id: "interior",
        label: LocalizedLabel {
            en: "Interior",
            vi: "Nội thất",
        },
        presets: INTERIOR,
    },
    PresetCategory {
        id: "landscape",
        label: LocalizedLabel {
            en: "Landscape",
            vi: "Cảnh quan",
        },
        presets: LANDSCAPE,
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static Preset>> = Lazy::new(|| {
    CATEGORIES
        .iter()
        .flat_map(|c| c.presets.iter())
        .map(|p| (p.id, p))
        .collect()
});

/// Ordered categories, for listing
pub fn categories() -> &'static [PresetCategory] {
    CATEGORIES
}

/// Unknown ids mean "no preset selected"
pub fn lookup(id: &str) -> Option<&'static Preset> {
    INDEX.get(id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let preset = lookup("tropical-resort").unwrap();
        assert_eq!(preset.label("en"), "Tropical Resort");
        assert!(lookup("does-not-exist").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let total: usize = categories().iter().map(|c| c.presets.len()).sum();
        assert_eq!(INDEX.len(), total);
    }

    #[test]
    fn test_labels_by_language() {
        let preset = lookup("zen-garden").unwrap();
        assert_eq!(preset.label("vi-VN"), "Vườn thiền");
        assert_eq!(preset.label("fr"), "Zen Garden");
    }
}
