//! Keyword-driven sub-task templates

use tracing::debug;

use crate::domain::{SubTaskDraft, Task};

/// Keyword family a title falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    Document,
    Meeting,
    Communication,
    Generic,
}

const MEETING_WORDS: &[&str] = &[
    "meeting", "meet", "call", "interview", "standup", "sync", "appointment", "1on1", "zoom",
];
const COMMUNICATION_WORDS: &[&str] = &[
    "email", "mail", "message", "reply", "respond", "text", "contact", "invite", "letter", "follow",
];
const DOCUMENT_WORDS: &[&str] = &[
    "report", "document", "doc", "docs", "essay", "paper", "proposal", "presentation", "slides", "draft",
    "write", "article", "thesis", "summary", "memo", "review",
];

impl TemplateFamily {
    /// Preset steps with per-step minute estimates
    fn steps(self) -> &'static [(&'static str, u32)] {
        match self {
            Self::Document => &[
                ("Gather sources and data", 15),
                ("Outline the main sections", 10),
                ("Write the first draft", 25),
                ("Review and revise", 15),
                ("Format and finalize", 10),
            ],
            Self::Meeting => &[
                ("Review the agenda and background", 10),
                ("Write down your talking points", 10),
                ("Prepare questions to ask", 5),
                ("Attend and take notes", 30),
                ("Send follow-up actions", 10),
            ],
            Self::Communication => &[
                ("Clarify what the message must achieve", 5),
                ("Draft the message", 10),
                ("Check tone and clarity", 5),
                ("Send it", 2),
            ],
            Self::Generic => &[
                ("Define what done looks like", 5),
                ("Gather what you need", 10),
                ("Do the core work", 25),
                ("Review the result", 10),
            ],
        }
    }

    /// Why the steps are ordered the way they are
    pub fn rationale(self) -> &'static str {
        match self {
            Self::Document => {
                "Research before drafting keeps the writing focused, and a complete draft is faster to revise than polishing as you go."
            }
            Self::Meeting => "Preparation up front makes the meeting shorter; capturing actions at the end makes it count.",
            Self::Communication => "Knowing the goal first keeps the message short; a tone check before sending avoids a second round.",
            Self::Generic => "A clear finish line and the right materials make the core work go uninterrupted.",
        }
    }

    pub fn key_points(self) -> &'static [&'static str] {
        match self {
            Self::Document => &["Structure before prose", "Separate writing from editing"],
            Self::Meeting => &["Know what you want out of it", "Leave with clear next steps"],
            Self::Communication => &["One message, one purpose", "Keep it short"],
            Self::Generic => &["Start with the smallest step", "Check your work before calling it done"],
        }
    }
}

/// Classify a title by keyword family
pub fn classify(title: &str) -> TemplateFamily {
    let lower = title.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    let has_any = |list: &[&str]| words.iter().any(|w| list.contains(w));

    let family = if has_any(MEETING_WORDS) {
        TemplateFamily::Meeting
    } else if has_any(COMMUNICATION_WORDS) {
        TemplateFamily::Communication
    } else if has_any(DOCUMENT_WORDS) {
        TemplateFamily::Document
    } else {
        TemplateFamily::Generic
    };
    debug!(%title, ?family, "classify: done");
    family
}

/// Offline sub-task checklist for a task
///
/// Every step carries the family's single rationale.
pub fn decompose(task: &Task) -> Vec<SubTaskDraft> {
    let family = classify(&task.title);
    debug!(task_id = %task.id, ?family, "decompose: called");
    family
        .steps()
        .iter()
        .map(|(title, minutes)| SubTaskDraft {
            title: title.to_string(),
            estimated_minutes: Some(*minutes),
            rationale: Some(family.rationale().to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_families() {
        assert_eq!(classify("Prepare quarterly report"), TemplateFamily::Document);
        assert_eq!(classify("Call the insurance company"), TemplateFamily::Meeting);
        assert_eq!(classify("Reply to Sam's e-mail"), TemplateFamily::Communication);
        assert_eq!(classify("Clean the garage"), TemplateFamily::Generic);
    }

    #[test]
    fn test_classify_matches_whole_words_only() {
        // "recall" must not match "call"
        assert_eq!(classify("Recall the plan"), TemplateFamily::Generic);
    }

    #[test]
    fn test_document_template() {
        let task = Task::new("t1", "Prepare quarterly report");
        let drafts = decompose(&task);
        let minutes: Vec<_> = drafts.iter().map(|d| d.estimated_minutes.unwrap()).collect();
        assert_eq!(minutes, vec![15, 10, 25, 15, 10]);
        assert!(drafts.iter().all(|d| d.rationale.as_deref() == Some(TemplateFamily::Document.rationale())));
    }

    #[test]
    fn test_every_family_has_steps() {
        for family in [
            TemplateFamily::Document,
            TemplateFamily::Meeting,
            TemplateFamily::Communication,
            TemplateFamily::Generic,
        ] {
            assert!(family.steps().len() >= 4);
            assert!(!family.rationale().is_empty());
        }
    }
}
