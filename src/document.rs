use crate::{form::FormData, util::sha256_hex};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Number of probe slots on the form.
pub const PROBE_SLOTS: usize = 4;

const PROBES_KEY: &str = "probes";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEntry {
    pub angle: String,
    pub frequency: String,
    pub serial: String,
    pub diameter: String,
}

impl ProbeEntry {
    pub fn is_empty(&self) -> bool {
        self.angle.is_empty()
            && self.frequency.is_empty()
            && self.serial.is_empty()
            && self.diameter.is_empty()
    }
}

/// The JSON body sent to the rendering service: flat string fields plus `probes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    pub probes: Vec<ProbeEntry>,
}

impl ReportDocument {
    pub fn from_form(form: &FormData) -> Self {
        let mut fields = form.to_map();
        // The probe list replaces any plain field of the same name.
        fields.remove(PROBES_KEY);

        let mut probes = Vec::with_capacity(PROBE_SLOTS);
        for i in 1..=PROBE_SLOTS {
            let mut take = |part: &str| {
                fields
                    .remove(&format!("probe_{part}_{i}"))
                    .unwrap_or_default()
            };
            let probe = ProbeEntry {
                angle: take("angle"),
                frequency: take("frequency"),
                serial: take("serial"),
                diameter: take("diameter"),
            };
            if !probe.is_empty() {
                probes.push(probe);
            }
        }

        Self { fields, probes }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).with_context(|| "serializing report document")
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "serializing report document")
    }

    /// Content digest of the serialized document, used to tag log lines.
    pub fn report_id(&self) -> Result<String> {
        Ok(sha256_hex(&self.to_json()?))
    }

    /// `<prefix><date>.pdf`, falling back to `<prefix><fallback>.pdf` when the date is empty.
    pub fn download_filename(&self, date_field: &str, prefix: &str, fallback: &str) -> String {
        let stem = self
            .get(date_field)
            .map(sanitize_stem)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        format!("{prefix}{stem}.pdf")
    }
}

fn sanitize_stem(raw: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));
    let cleaned = re.replace_all(raw.trim(), "_");
    // A stem made only of dots would resolve to a parent directory.
    if cleaned.chars().all(|c| c == '.') {
        return cleaned.replace('.', "_");
    }
    cleaned.into_owned()
}
