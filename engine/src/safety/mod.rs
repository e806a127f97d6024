//! Content gate
//!
//! Rejects user messages that mention a denylisted term before they reach
//! the session history or the completion service. Matching is a plain
//! case-insensitive substring test.
//!
//! # Example
//!
//! ```
//! use confidant_engine::safety::SafetyGate;
//!
//! let gate = SafetyGate::new(["суицид", "наркотики"]);
//! assert!(gate.is_allowed("Привет, как дела?"));
//! assert!(!gate.is_allowed("Хочу поговорить про НАРКОТИКИ"));
//! ```

/// Substring denylist filter
#[derive(Debug, Clone)]
pub struct SafetyGate {
    terms: Vec<String>,
}

impl SafetyGate {
    /// Build a gate from denylist terms
    ///
    /// Terms are lower-cased once here. Blank terms are dropped, since an
    /// empty needle would match every message.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self { terms }
    }

    /// Returns the first denylisted term found in `text`, if any
    pub fn find_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| lowered.contains(term.as_str()))
            .map(String::as_str)
    }

    /// `false` when `text` contains any denylisted term, `true` otherwise
    pub fn is_allowed(&self, text: &str) -> bool {
        match self.find_match(text) {
            Some(term) => {
                tracing::info!(term, "Message rejected by content gate");
                false
            }
            None => true,
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}
