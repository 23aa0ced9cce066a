//! Section classification: real article or noise.
//!
//! The classifier is a two-state machine. Seeing a weekly-digest marker
//! section moves it into [`ClassifierState::SuppressingFollowUps`], where
//! sections matching the follow-on keywords (politics, business, cartoon) are
//! also skipped. The first section that does not match drops back to
//! [`ClassifierState::Normal`]. The state is owned by the caller and passed in
//! explicitly, so a verdict depends only on the current section and the state
//! left by the previous one.

use super::config::{KeywordConfig, KeywordSet, SegmenterConfig};
use super::markup::truncate_chars;

/// Sticky classifier state carried across consecutive sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierState {
    #[default]
    Normal,
    SuppressingFollowUps,
}

/// Why a section was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The weekly-digest marker section itself.
    Marker,
    /// A politics/business/cartoon section right after the marker.
    FollowOn,
    /// Reader letters.
    Letters,
    /// Roundup, cartoon or other noise keyword.
    Noise,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Marker => "marker",
            SkipReason::FollowOn => "follow_on",
            SkipReason::Letters => "letters",
            SkipReason::Noise => "noise",
        }
    }
}

/// Classification outcome for one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip(SkipReason),
}

impl Verdict {
    pub fn is_skip(&self) -> bool {
        matches!(self, Verdict::Skip(_))
    }
}

/// Lowercased title and leading lines, cut to the inspected window.
struct Probe {
    title: String,
    lines: Vec<String>,
}

impl Probe {
    fn matches(&self, set: &KeywordSet) -> bool {
        set.matches(&self.title) || self.lines.iter().any(|line| set.matches(line))
    }
}

/// Decides whether a section is an article or must be discarded.
#[derive(Debug, Clone)]
pub struct SectionClassifier {
    noise: KeywordSet,
    marker: KeywordSet,
    follow_on: KeywordSet,
    letters: KeywordSet,
    leading_lines: usize,
    line_probe_chars: usize,
}

impl SectionClassifier {
    pub fn new(keywords: &KeywordConfig, config: &SegmenterConfig) -> Self {
        Self {
            noise: KeywordSet::new(&keywords.noise),
            marker: KeywordSet::new(&keywords.marker),
            follow_on: KeywordSet::new(&keywords.follow_on),
            letters: KeywordSet::new(&keywords.letters),
            leading_lines: config.leading_lines,
            line_probe_chars: config.line_probe_chars,
        }
    }

    fn probe<S: AsRef<str>>(&self, title: &str, leading_lines: &[S]) -> Probe {
        Probe {
            title: title.trim().to_lowercase(),
            lines: leading_lines
                .iter()
                .take(self.leading_lines)
                .map(|line| truncate_chars(line.as_ref().trim(), self.line_probe_chars).to_lowercase())
                .collect(),
        }
    }

    /// Classify one section given the state left by the previous one.
    ///
    /// Returns the verdict and the state to carry into the next section.
    pub fn classify<S: AsRef<str>>(
        &self,
        state: ClassifierState,
        title: &str,
        leading_lines: &[S],
    ) -> (Verdict, ClassifierState) {
        let probe = self.probe(title, leading_lines);

        if probe.matches(&self.marker) {
            return (
                Verdict::Skip(SkipReason::Marker),
                ClassifierState::SuppressingFollowUps,
            );
        }

        if state == ClassifierState::SuppressingFollowUps && probe.matches(&self.follow_on) {
            return (
                Verdict::Skip(SkipReason::FollowOn),
                ClassifierState::SuppressingFollowUps,
            );
        }

        let next = ClassifierState::Normal;

        if !probe.title.is_empty() && self.letters.matches_prefix(&probe.title) {
            return (Verdict::Skip(SkipReason::Letters), next);
        }

        if probe.matches(&self.noise) {
            return (Verdict::Skip(SkipReason::Noise), next);
        }

        (Verdict::Keep, next)
    }

    /// Boolean form of [`classify`](Self::classify) that updates `state` in place.
    pub fn is_skippable<S: AsRef<str>>(
        &self,
        state: &mut ClassifierState,
        title: &str,
        leading_lines: &[S],
    ) -> bool {
        let (verdict, next) = self.classify(*state, title, leading_lines);
        *state = next;
        verdict.is_skip()
    }

    /// True if a single line contains a noise keyword.
    pub fn is_noise_line(&self, line: &str) -> bool {
        self.noise.matches(&truncate_chars(line.trim(), self.line_probe_chars).to_lowercase())
    }
}
