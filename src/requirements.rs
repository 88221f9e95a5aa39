//! Post-parse checks: needs, excludes, required options and subcommands,
//! and leftover tokens.

use crate::app::App;
use crate::error::ParseError;

impl App {
    pub(crate) fn check_requirements(&self) -> Result<(), ParseError> {
        for opt in self.options().filter(|o| o.count() > 0) {
            for other in opt.needs.iter().filter_map(|id| self.option(*id)) {
                if other.count() == 0 {
                    return Err(ParseError::Requires {
                        option: opt.name(),
                        requires: other.name(),
                    });
                }
            }
            for other in opt.excludes.iter().filter_map(|id| self.option(*id)) {
                if other.count() > 0 {
                    return Err(ParseError::Excludes {
                        option: opt.name(),
                        excludes: other.name(),
                    });
                }
            }
        }

        if let Some(missing) = self.options().find(|o| o.required && o.count() == 0) {
            return Err(ParseError::Required { name: missing.name() });
        }

        if self.require_subcommand && self.invoked.is_none() {
            return Err(ParseError::Required {
                name: "A subcommand".to_string(),
            });
        }

        match self.invoked_subcommand() {
            Some(sub) => sub.check_requirements(),
            None => Ok(()),
        }
    }

    /// Leftovers fail unless this App allows them; allowed ones stay
    /// visible through [`App::remaining`].
    pub(crate) fn check_extras(&self) -> Result<(), ParseError> {
        if !self.extras.is_empty() {
            if !self.allow_extras {
                return Err(ParseError::Extras {
                    extras: self.extras.clone(),
                });
            }
            tracing::warn!(app = %self.name(), extras = ?self.extras, "Passing unexpected arguments through");
        }

        match self.invoked_subcommand() {
            Some(sub) => sub.check_extras(),
            None => Ok(()),
        }
    }
}
