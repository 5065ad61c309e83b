//! Textual exclusion rules.
//!
//! Rules run in order and the first match rejects:
//! 1. agency, sublet or shared-flat signature;
//! 2. an elevator is mentioned but neither the ground nor the first floor is;
//! 3. an explicit floor of 2 or higher.

use regex::Regex;

use crate::error::Result;
use crate::models::ExclusionRules;

/// Why a text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Agency,
    ElevatorWithoutLowFloor,
    HighFloor,
}

/// Pure classifier over an offer's title and description.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    agency: Regex,
    elevator: Regex,
    negation: Regex,
    low_floor: Regex,
    numeral_floor: Regex,
    ordinal_floor: Regex,
}

impl TextClassifier {
    /// Compile the rule set. Fails on an invalid pattern.
    pub fn new(rules: &ExclusionRules) -> Result<Self> {
        let floors = alternation(&escaped(&rules.floor_terms));

        Ok(Self {
            agency: Regex::new(&format!("(?i){}", alternation(&rules.agency_patterns)))?,
            elevator: Regex::new(&format!(
                r"(?i)\b{}\b",
                alternation(&escaped(&rules.elevator_terms))
            ))?,
            negation: Regex::new(&format!(
                r"(?i)(?:^|\W){}(?:\s+(?:an?|any|un))?\W*$",
                alternation(&escaped(&rules.negation_terms))
            ))?,
            low_floor: Regex::new(&format!(
                r"(?i)\b{}\b",
                alternation(&rules.low_floor_patterns)
            ))?,
            numeral_floor: Regex::new(&format!(
                r"(?i)\b(\d{{1,2}})\s*(?:st|nd|rd|th|er|ère|re|e|ème|eme|è)?\s*{floors}\b"
            ))?,
            ordinal_floor: Regex::new(&format!(
                r"(?i)\b{}\s+{floors}\b",
                alternation(&rules.high_floor_ordinals)
            ))?,
        })
    }

    /// Join a title and a description the way they are classified.
    pub fn combine(title: &str, description: &str) -> String {
        format!("{title}    {description}")
    }

    /// Whether an offer is worth a manual look.
    pub fn is_interesting(&self, text: &str) -> bool {
        self.rejection(text).is_none()
    }

    /// First rule rejecting `text`, if any.
    pub fn rejection(&self, text: &str) -> Option<Rejection> {
        if self.agency.is_match(text) {
            return Some(Rejection::Agency);
        }
        if self.mentions_elevator(text) && !self.low_floor.is_match(text) {
            return Some(Rejection::ElevatorWithoutLowFloor);
        }
        if self.mentions_high_floor(text) {
            return Some(Rejection::HighFloor);
        }
        None
    }

    /// "no elevator", "sans ascenseur" and friends do not count.
    fn mentions_elevator(&self, text: &str) -> bool {
        self.elevator
            .find_iter(text)
            .any(|m| !self.negation.is_match(&text[..m.start()]))
    }

    fn mentions_high_floor(&self, text: &str) -> bool {
        let numeral = self
            .numeral_floor
            .captures_iter(text)
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .any(|floor| floor >= 2);
        numeral || self.ordinal_floor.is_match(text)
    }
}

fn escaped(terms: &[String]) -> Vec<String> {
    terms.iter().map(|t| regex::escape(t)).collect()
}

/// `(?:a|b|c)`, or a pattern that never matches for an empty list.
fn alternation(parts: &[String]) -> String {
    if parts.is_empty() {
        return r"(?:\b\B)".to_string();
    }
    format!("(?:{})", parts.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TextClassifier {
        TextClassifier::new(&ExclusionRules::default()).unwrap()
    }

    #[test]
    fn test_agency_rejected() {
        let c = classifier();
        assert!(!c.is_interesting("Nice flat, agence Foncia"));
        assert_eq!(c.rejection("Chambre en colocation"), Some(Rejection::Agency));
        assert_eq!(c.rejection("Sous-location été"), Some(Rejection::Agency));
    }

    #[test]
    fn test_elevator_with_first_floor_accepted() {
        assert!(classifier().is_interesting("Studio with elevator, 1st floor"));
    }

    #[test]
    fn test_elevator_with_high_floor_rejected() {
        let c = classifier();
        assert!(!c.is_interesting("Studio with elevator, 3rd floor"));
        assert_eq!(
            c.rejection("Studio with elevator, 3rd floor"),
            Some(Rejection::ElevatorWithoutLowFloor)
        );
    }

    #[test]
    fn test_no_rule_triggers() {
        assert!(classifier().is_interesting("Cozy studio, no elevator mentioned"));
    }

    #[test]
    fn test_negated_elevator_still_checks_floor() {
        let c = classifier();
        assert_eq!(
            c.rejection("Studio sans ascenseur au 3e étage"),
            Some(Rejection::HighFloor)
        );
        assert!(c.is_interesting("Studio sans ascenseur au rez-de-chaussée"));
    }

    #[test]
    fn test_high_floor_phrasings() {
        let c = classifier();
        assert_eq!(c.rejection("Bright studio on the 4th floor"), Some(Rejection::HighFloor));
        assert_eq!(c.rejection("Situé au 2ème étage"), Some(Rejection::HighFloor));
        assert_eq!(c.rejection("On the second floor"), Some(Rejection::HighFloor));
        assert_eq!(c.rejection("Au troisième étage"), Some(Rejection::HighFloor));
        assert!(c.is_interesting("Au 1er étage, calme"));
    }

    #[test]
    fn test_private_owner_phrasing_accepted() {
        let c = classifier();
        assert_eq!(c.rejection("Studio meublé, pas de frais d'agence"), None);
        assert_eq!(c.rejection("Location entre particuliers, sans agence"), None);
        assert!(c.is_interesting("No agency fees, direct from owner"));
    }

    #[test]
    fn test_word_boundaries() {
        let c = classifier();
        // "agencement" is layout, "uplifting" is not a lift.
        assert!(c.is_interesting("Bel agencement, quartier uplifting"));
    }

    #[test]
    fn test_agency_checked_before_elevator() {
        assert_eq!(
            classifier().rejection("Foncia: ascenseur, 5e étage"),
            Some(Rejection::Agency)
        );
    }

    #[test]
    fn test_combine() {
        let c = classifier();
        let text = TextClassifier::combine("Studio Foncia", "Calme et lumineux");
        assert_eq!(text, "Studio Foncia    Calme et lumineux");
        assert!(!c.is_interesting(&text));
    }

    #[test]
    fn test_empty_text_accepted() {
        assert!(classifier().is_interesting(""));
    }

    #[test]
    fn test_invalid_pattern_fails() {
        let rules = ExclusionRules {
            agency_patterns: vec!["(unclosed".to_string()],
            ..ExclusionRules::default()
        };
        assert!(TextClassifier::new(&rules).is_err());
    }

    #[test]
    fn test_empty_rule_lists_never_match() {
        let rules = ExclusionRules {
            agency_patterns: Vec::new(),
            ..ExclusionRules::default()
        };
        assert!(TextClassifier::new(&rules).unwrap().is_interesting("agence Foncia"));
    }
}
