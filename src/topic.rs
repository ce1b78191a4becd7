use core::fmt::{self, Display, Formatter};

/// Coarse category attached to a question before it is sent to the model.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Watering,
    Pests,
    Soil,
    Planting,
    General,
}

impl Topic {
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Watering => "watering",
            Self::Pests => "pests",
            Self::Soil => "soil",
            Self::Planting => "planting",
            Self::General => "general",
        }
    }
}

impl Display for Topic {
    #[inline]
    #[expect(
        clippy::min_ident_chars,
        reason = r#"
            `f` is the default parameter name for `Display` trait
            implementation.
        "#
    )]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const DEFAULT_KEYWORDS: [(Topic, &[&str]); 4] = [
    (Topic::Watering, &["water", "irrigation", "drought", "moisture"]),
    (Topic::Pests, &["insects", "bugs", "aphids", "mites", "disease"]),
    (Topic::Soil, &["dirt", "compost", "fertilizer", "nutrients"]),
    (Topic::Planting, &["seed", "plant", "transplant", "sapling"]),
];

/// Ordered keyword lists used to classify questions.
///
/// Entries are checked in the order they were declared and the first topic
/// with a matching keyword wins. With the default table, "water my plant"
/// is `watering` even though "plant" is a `planting` keyword. The ordering
/// carries no meaning beyond that and is kept for compatibility.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    entries: Vec<(Topic, Vec<String>)>,
}

impl KeywordTable {
    /// Builds a table from `(topic, keywords)` pairs, keeping their order.
    ///
    /// Keywords are stored lowercase. Entries for [`Topic::General`] are
    /// dropped since it is the fallback and never matched directly.
    #[inline]
    #[must_use]
    pub fn new<I, K, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Topic, K)>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter(|&(topic, _)| topic != Topic::General)
            .map(|(topic, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|keyword| keyword.as_ref().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect();
                (topic, keywords)
            })
            .collect();

        Self { entries }
    }

    #[cfg(test)]
    fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.entries.iter().map(|&(topic, _)| topic)
    }

    #[cfg(test)]
    fn keywords(&self, topic: Topic) -> &[String] {
        self.entries
            .iter()
            .find(|&&(entry_topic, _)| entry_topic == topic)
            .map(|(_, keywords)| keywords.as_slice())
            .unwrap_or_default()
    }

    /// Returns the first topic whose keywords occur anywhere in `input`,
    /// ignoring case, or [`Topic::General`] when none do.
    #[inline]
    #[must_use]
    pub fn classify(&self, input: &str) -> Topic {
        let input = input.to_lowercase();

        self.entries
            .iter()
            .find(|(_, keywords)| {
                keywords.iter().any(|keyword| input.contains(keyword.as_str()))
            })
            .map_or(Topic::General, |&(topic, _)| topic)
    }
}

impl Default for KeywordTable {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}
