//! Emotional check-in
//!
//! A fixed set of feelings, each mapped to one canned supportive response.
//! Selection is synchronous and never touches the network.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Anxious,
    Overwhelmed,
    Unmotivated,
    Ready,
}

impl Emotion {
    pub const ALL: [Emotion; 4] = [Self::Anxious, Self::Overwhelmed, Self::Unmotivated, Self::Ready];

    /// Supportive response shown after the user picks this feeling
    pub fn response(self) -> &'static str {
        match self {
            Self::Anxious => {
                "It's okay to feel anxious. You don't have to do all of it right now. \
                 Pick the smallest possible first step and give it just two minutes."
            }
            Self::Overwhelmed => {
                "When everything feels like too much, shrink the task. \
                 Look at only the first item on the checklist and ignore the rest for now."
            }
            Self::Unmotivated => {
                "Motivation often follows action, not the other way around. \
                 Start a short timer and see how far you get. Stopping afterwards is allowed."
            }
            Self::Ready => "Great energy! Ride the momentum and tackle the hardest part first.",
        }
    }

    /// A first tiny action that pairs with the micro-challenge
    pub fn tiny_action(self) -> &'static str {
        match self {
            Self::Anxious => "Write one sentence about what the task needs",
            Self::Overwhelmed => "Open the first sub-task and read it",
            Self::Unmotivated => "Set everything up so you could start",
            Self::Ready => "Start the first sub-task right now",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anxious => write!(f, "anxious"),
            Self::Overwhelmed => write!(f, "overwhelmed"),
            Self::Unmotivated => write!(f, "unmotivated"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

impl std::str::FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anxious" => Ok(Self::Anxious),
            "overwhelmed" => Ok(Self::Overwhelmed),
            "unmotivated" => Ok(Self::Unmotivated),
            "ready" => Ok(Self::Ready),
            _ => Err(format!("Unknown emotion: {}", s)),
        }
    }
}

/// A recorded check-in: the feeling and the response it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckIn {
    pub emotion: Emotion,
    pub response: &'static str,
}

impl From<Emotion> for CheckIn {
    fn from(emotion: Emotion) -> Self {
        Self {
            emotion,
            response: emotion.response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_emotion_has_distinct_response() {
        let responses: std::collections::HashSet<_> = Emotion::ALL.iter().map(|e| e.response()).collect();
        assert_eq!(responses.len(), Emotion::ALL.len());
    }

    #[test]
    fn test_emotion_parse() {
        assert_eq!("Anxious".parse::<Emotion>().unwrap(), Emotion::Anxious);
        assert!("sleepy".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_check_in_from_emotion() {
        let check_in = CheckIn::from(Emotion::Ready);
        assert_eq!(check_in.emotion, Emotion::Ready);
        assert_eq!(check_in.response, Emotion::Ready.response());
    }
}
