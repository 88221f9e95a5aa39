//! Value processing after matching: environment fallback, delimiter
//! splitting, transforms, validators, per-item hooks and binding.

use crate::app::App;
use crate::error::ParseError;
use crate::option::{Captured, Occurrence, Opt};
use crate::validate::CheckKind;
use crate::value::BindInput;

impl App {
    /// Run every option's pipeline in declaration order, then the invoked
    /// subcommand's. The first error or early exit stops everything.
    pub(crate) fn process_values(&mut self) -> Result<(), ParseError> {
        self.inject_env();
        for opt in self.options.iter_mut().flatten() {
            opt.run_pipeline()?;
        }
        if let Some(index) = self.invoked {
            self.subcommands[index].process_values()?;
        }
        Ok(())
    }

    /// Options not given on the command line read their environment
    /// variable, if one is declared and set.
    fn inject_env(&mut self) {
        for opt in self.options.iter_mut().flatten() {
            if opt.count() > 0 {
                continue;
            }
            let Some(var) = opt.envname.as_deref() else {
                continue;
            };
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            tracing::debug!(option = %opt.name(), env = %var, "Value taken from environment");
            opt.occurrences.push(Occurrence {
                position: (usize::MAX, 0),
                tokens: vec![Captured { value, index: None }],
                greedy: false,
                floor: 1,
            });
        }
    }
}

impl Opt {
    /// The values this option feeds into its pipeline, one group per
    /// occurrence, if any.
    fn pipeline_input(&self) -> Option<Vec<Vec<String>>> {
        if self.count() > 0 {
            let groups = self
                .occurrences
                .iter()
                .map(|occ| occ.values().map(str::to_string).collect())
                .collect();
            return Some(groups);
        }
        match &self.default_str {
            Some(default) if !self.required && !self.is_flag() => Some(vec![vec![default.clone()]]),
            _ => None,
        }
    }

    pub(crate) fn run_pipeline(&mut self) -> Result<(), ParseError> {
        let Some(mut groups) = self.pipeline_input() else {
            return Ok(());
        };
        let name = self.name();

        if !self.is_flag() {
            if let Some(delimiter) = self.delimiter {
                for group in groups.iter_mut() {
                    *group = group
                        .iter()
                        .flat_map(|v| v.split(delimiter))
                        .map(str::trim)
                        .filter(|piece| !piece.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }

            for value in groups.iter_mut().flatten() {
                for transform in &self.transforms {
                    transform.apply(value).map_err(|message| ParseError::Validation {
                        option: name.clone(),
                        message,
                    })?;
                }
                for validator in &self.validators {
                    validator.apply(value).map_err(|message| match validator.kind() {
                        CheckKind::Membership => ParseError::conversion(name.as_str(), message),
                        CheckKind::Check => ParseError::Validation {
                            option: name.clone(),
                            message,
                        },
                    })?;
                }
            }

            for value in groups.iter().flatten() {
                for hook in self.each.iter_mut() {
                    hook(value);
                }
            }
        }

        let input = BindInput {
            name: &name,
            groups: &groups,
            policy: self.policy,
            keep: self.keep(),
            cap: self.greedy_fixed().then(|| self.keep()),
        };
        match self.binder.as_mut() {
            Some(binder) => binder.bind(&input),
            None => Ok(()),
        }
    }
}
