//! Metacharacter escaper: rewrites template delimiters inside code lines.
//!
//! All rules are compiled into one alternation and applied in a single
//! left-to-right pass, so the result does not depend on rule order. Replacements
//! never contain a character that starts or ends a raw pattern, which is what
//! makes a second pass a no-op.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use regex::Regex;

use crate::classifier::ScanState;
use crate::errors::ScrubError;

/// A raw pattern and the text it is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeRule {
    pub name: String,
    pub raw: String,
    pub escaped: String,
    pub applies_in: ScanState,
}

impl EscapeRule {
    pub fn code(name: &str, raw: &str, escaped: &str) -> Self {
        Self {
            name: name.to_string(),
            raw: raw.to_string(),
            escaped: escaped.to_string(),
            applies_in: ScanState::Code,
        }
    }

    pub fn applies_to(&self, state: ScanState) -> bool {
        self.applies_in == state
    }
}

/// `{{` and `}}`.
pub fn brace_rules() -> Vec<EscapeRule> {
    vec![
        EscapeRule::code("open_output", "{{", "&#123;&#123;"),
        EscapeRule::code("close_output", "}}", "&#125;&#125;"),
    ]
}

/// `{%` and `%}`. The percent sign is escaped too so that no replacement can
/// pair up with a neighbouring raw character on a later pass.
pub fn tag_rules() -> Vec<EscapeRule> {
    vec![
        EscapeRule::code("open_tag", "{%", "&#123;&#37;"),
        EscapeRule::code("close_tag", "%}", "&#37;&#125;"),
    ]
}

/// A validated, compiled set of escape rules.
#[derive(Debug, Clone)]
pub struct EscapeRuleSet {
    rules: Vec<EscapeRule>,
    matcher: Regex,
}

impl EscapeRuleSet {
    /// Compiles `rules`, rejecting any rule whose replacement would be matched again.
    pub fn new(rules: Vec<EscapeRule>) -> Result<Self, ScrubError> {
        if rules.is_empty() {
            return Err(ScrubError::Config("at least one escape rule is required".to_string()));
        }

        // Characters that can start or end a raw pattern.
        let edge_chars: Vec<char> = rules
            .iter()
            .flat_map(|r| r.raw.chars().next().into_iter().chain(r.raw.chars().last()))
            .collect();

        for rule in &rules {
            if rule.raw.is_empty() {
                return Err(ScrubError::Config(format!("rule '{}' has an empty pattern", rule.name)));
            }
            for other in &rules {
                if rule.escaped.contains(other.raw.as_str()) {
                    return Err(ScrubError::RuleConflict {
                        rule: rule.name.clone(),
                        other: other.name.clone(),
                    });
                }
            }
            if let Some(c) = rule.escaped.chars().find(|c| edge_chars.contains(c)) {
                debug!("Rule '{}' replacement contains pattern character '{}'.", rule.name, c);
                return Err(ScrubError::RuleConflict {
                    rule: rule.name.clone(),
                    other: rules
                        .iter()
                        .find(|o| o.raw.contains(c))
                        .map(|o| o.name.clone())
                        .unwrap_or_default(),
                });
            }
        }

        let alternation = rules
            .iter()
            .map(|r| regex::escape(&r.raw))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&alternation)
            .map_err(|e| ScrubError::Config(format!("failed to compile escape rules: {}", e)))?;

        Ok(Self { rules, matcher })
    }

    /// Rule set selected by the configuration flag.
    pub fn for_config(escape_tag_delimiters: bool) -> Result<Self, ScrubError> {
        let mut rules = brace_rules();
        if escape_tag_delimiters {
            rules.extend(tag_rules());
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[EscapeRule] {
        &self.rules
    }

    /// Escapes one line if its state is covered by the rules.
    /// Returns the new text (if changed) and the number of replacements.
    pub fn escape_line(&self, text: &str, state: ScanState) -> (Option<String>, usize) {
        let mut count = 0;
        let out = self.matcher.replace_all(text, |caps: &regex::Captures| {
            let m = &caps[0];
            match self.rules.iter().find(|r| r.raw == m && r.applies_to(state)) {
                Some(rule) => {
                    count += 1;
                    rule.escaped.clone()
                }
                None => m.to_string(),
            }
        });
        if count == 0 {
            (None, 0)
        } else {
            (Some(out.into_owned()), count)
        }
    }

    /// True if a line in `state` still holds a raw pattern this set would escape.
    pub fn has_raw(&self, text: &str, state: ScanState) -> bool {
        self.matcher
            .find_iter(text)
            .any(|m| self.rules.iter().any(|r| r.raw == m.as_str() && r.applies_to(state)))
    }
}
