pub const DEFAULT_BLOCKED_LABEL: &str = "blocked";
pub const DEFAULT_BLOCKING_LABEL: &str = "blocking";

/// Normalize label names for case-insensitive matching.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The two status labels toggled by the bot.
pub struct StatusLabels {
    pub blocked: String,
    pub blocking: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            blocked: DEFAULT_BLOCKED_LABEL.to_string(),
            blocking: DEFAULT_BLOCKING_LABEL.to_string(),
        }
    }
}

impl StatusLabels {
    pub fn new(blocked: &str, blocking: &str) -> Self {
        Self {
            blocked: blocked.trim().to_string(),
            blocking: blocking.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl LabelPlan {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// Label changes for an entity: `blocked` follows open dependencies and
/// `blocking` follows open dependents. Labels already in the wanted state are
/// left alone, a blank configured label is never touched, and a name shared
/// by both labels is wanted when either condition holds.
pub fn plan_status_labels<'a>(
    labels: &StatusLabels,
    has_dependencies: bool,
    has_dependents: bool,
    current: impl IntoIterator<Item = &'a str>,
) -> LabelPlan {
    let current = current
        .into_iter()
        .map(normalize_label)
        .collect::<Vec<_>>();
    let mut wanted_labels: Vec<(String, &str, bool)> = Vec::new();
    for (label, wanted) in [
        (labels.blocked.as_str(), has_dependencies),
        (labels.blocking.as_str(), has_dependents),
    ] {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            continue;
        }
        match wanted_labels
            .iter_mut()
            .find(|(existing, _, _)| *existing == normalized)
        {
            Some(entry) => entry.2 |= wanted,
            None => wanted_labels.push((normalized, label, wanted)),
        }
    }

    let mut plan = LabelPlan::default();
    for (normalized, label, wanted) in wanted_labels {
        let present = current.contains(&normalized);
        if wanted && !present {
            plan.add.push(label.to_string());
        } else if !wanted && present {
            plan.remove.push(label.to_string());
        }
    }
    plan
}
