use serde::Serialize;

/// Label in the two supported UI languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalizedLabel {
    pub en: &'static str,
    pub vi: &'static str,
}

impl LocalizedLabel {
    /// Pick the label for a language code, English otherwise
    pub fn get(&self, lang: &str) -> &'static str {
        if lang.starts_with("vi") {
            self.vi
        } else {
            self.en
        }
    }
}

/// Named prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub label: LocalizedLabel,
    pub template: &'static str,
}

impl Preset {
    pub fn label(&self, lang: &str) -> &'static str {
        self.label.get(lang)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetCategory {
    pub id: &'static str,
    pub label: LocalizedLabel,
    pub presets: &'static [Preset],
}
