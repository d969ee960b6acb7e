use crate::asr::TType;
use crate::ast::LetterRange;
use crate::errors::Span;

/// Implicit typing state of one scoping unit.
#[derive(Debug, Clone, Default)]
pub struct ImplicitTyping {
    pub disabled: bool,
    pub rules: Vec<ImplicitRule>,
}

#[derive(Debug, Clone)]
pub struct ImplicitRule {
    pub ty: TType,
    pub letter_ranges: Vec<LetterRange>,
    pub span: Span,
}

impl ImplicitTyping {
    pub fn new() -> Self {
        Self::default()
    }

    /// `implicit none`
    pub fn apply_implicit_none(&mut self) {
        self.disabled = true;
    }

    pub fn add_rule(&mut self, ty: TType, letter_ranges: Vec<LetterRange>, span: Span) {
        self.rules.push(ImplicitRule {
            ty,
            letter_ranges,
            span,
        });
    }

    /// Explicit rules first, then the i-n integer / otherwise real default.
    pub fn get_implicit_type(&self, var_name: &str) -> Option<TType> {
        if self.disabled {
            return None;
        }

        let first_char = var_name.chars().next()?.to_ascii_lowercase();

        for rule in &self.rules {
            for range in &rule.letter_ranges {
                let start = range.start.to_ascii_lowercase();
                let matches = if let Some(end_char) = range.end {
                    first_char >= start && first_char <= end_char.to_ascii_lowercase()
                } else {
                    first_char == start
                };

                if matches {
                    return Some(rule.ty.clone());
                }
            }
        }

        if matches!(first_char, 'i'..='n') {
            Some(TType::Integer(4))
        } else {
            Some(TType::Real(4))
        }
    }
}
