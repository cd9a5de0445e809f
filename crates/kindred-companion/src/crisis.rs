//! Keyword-based crisis screening.
//!
//! Deliberately high-recall: any configured phrase appearing anywhere in the
//! text, in any case, counts. There is no negation or context handling.

use kindred_types::api::CrisisResource;

/// Shown alongside the resource list when a turn is halted.
pub const CRISIS_NOTICE: &str = "Crisis detected. Please seek immediate help.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screening {
    pub detected: bool,
    /// Matched phrases, in keyword-list order.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CrisisScreener {
    // (as configured, lowercased)
    keywords: Vec<(String, String)>,
}

impl CrisisScreener {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| {
                let k = k.into();
                let lower = k.to_lowercase();
                (k, lower)
            })
            .collect();
        Self { keywords }
    }

    pub fn screen(&self, text: &str) -> Screening {
        let lower = text.to_lowercase();
        let keywords: Vec<String> = self
            .keywords
            .iter()
            .filter(|(_, needle)| lower.contains(needle.as_str()))
            .map(|(original, _)| original.clone())
            .collect();

        Screening {
            detected: !keywords.is_empty(),
            keywords,
        }
    }
}

/// Support lines offered with every crisis halt.
pub fn crisis_resources() -> Vec<CrisisResource> {
    vec![
        CrisisResource {
            name: "988 Suicide & Crisis Lifeline".into(),
            contact: "Call or text 988".into(),
            website: Some("https://988lifeline.org".into()),
        },
        CrisisResource {
            name: "Crisis Text Line".into(),
            contact: "Text HOME to 741741".into(),
            website: Some("https://www.crisistextline.org".into()),
        },
        CrisisResource {
            name: "Emergency Services".into(),
            contact: "Call 911".into(),
            website: None,
        },
    ]
}
