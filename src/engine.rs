//! Token matching: classify each token, let options consume their values,
//! give greedy tokens back to starving positionals, then fill positionals.

use std::collections::VecDeque;

use crate::app::App;
use crate::classifier::{
    is_option_shaped, split_long, split_short, split_windows, valid_first_char, Classifier,
};
use crate::error::ParseError;
use crate::option::{Arity, Captured, Occurrence, Opt, OptionId};
use crate::registry::NameKind;

/// Working state of one App's matching pass.
#[derive(Debug, Default)]
pub(crate) struct Pass {
    /// Tokens waiting for a positional, with their index.
    candidates: Vec<(usize, String)>,
    /// Option-shaped tokens nothing declared.
    unknown: Vec<(usize, String)>,
    /// Set by `--` or by `positionals_at_end`.
    literal: bool,
}

fn internal(token: &str, kind: Classifier) -> ParseError {
    ParseError::Internal(format!("token '{token}' cannot be handled as {kind:?}"))
}

/// Slots a positional still wants: fixed ones always, unlimited ones only
/// while required.
fn unfilled(opt: &Opt) -> usize {
    match opt.arity {
        Arity::Fixed(n) => n.saturating_sub(opt.count()),
        Arity::AtLeast(n) if opt.required => n.saturating_sub(opt.count()),
        Arity::AtLeast(_) => 0,
    }
}

impl App {
    /// Classify one token against this App's declarations.
    pub fn classify(&self, token: &str) -> Classifier {
        if token == "--" {
            return Classifier::Separator;
        }
        if self.allow_windows_style_options {
            if let Some((name, _)) = split_windows(token) {
                if self.names.find_windows(name, self.matcher()).is_some() {
                    return Classifier::Windows;
                }
            }
        }
        if split_long(token).is_some() {
            Classifier::Long
        } else if split_short(token).is_some() {
            Classifier::Short
        } else if self.find_subcommand(token).is_some() {
            Classifier::Subcommand
        } else {
            Classifier::Positional
        }
    }

    fn has_positionals(&self) -> bool {
        self.options().any(Opt::is_positional)
    }

    pub(crate) fn match_tokens(&mut self, tokens: &[String]) -> Result<(), ParseError> {
        let mut pass = Pass::default();
        let mut subcommand = None;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            if pass.literal {
                pass.candidates.push((i, token.clone()));
                i += 1;
                continue;
            }

            let kind = self.classify(token);
            tracing::trace!(token = %token, kind = ?kind, "Classified token");
            match kind {
                Classifier::Separator => {
                    pass.literal = true;
                    i += 1;
                }
                Classifier::Subcommand => {
                    subcommand = Some(i);
                    break;
                }
                Classifier::Positional => {
                    if self.positionals_at_end && self.has_positionals() {
                        pass.literal = true;
                    }
                    pass.candidates.push((i, token.clone()));
                    i += 1;
                }
                Classifier::Long | Classifier::Short | Classifier::Windows => {
                    i = self.consume_option(tokens, i, kind, &mut pass)?;
                }
            }
        }

        self.reallocate(&mut pass);
        self.assign_positionals(&mut pass);
        self.check_arity()?;
        self.finish(pass);

        match subcommand {
            Some(at) => self.enter_subcommand(&tokens[at], &tokens[at + 1..]),
            None => Ok(()),
        }
    }

    /// Hand the rest of the tokens to the named child.
    pub(crate) fn enter_subcommand(&mut self, name: &str, rest: &[String]) -> Result<(), ParseError> {
        let index = self
            .find_subcommand(name)
            .ok_or_else(|| internal(name, Classifier::Subcommand))?;
        self.invoked = Some(index);
        let child = &mut self.subcommands[index];
        tracing::debug!(subcommand = %child.name(), tokens = rest.len(), "Entering subcommand");
        child.match_tokens(rest)
    }

    /// Match the option token at `i`; returns the index of the next token.
    pub(crate) fn consume_option(
        &mut self,
        tokens: &[String],
        i: usize,
        kind: Classifier,
        pass: &mut Pass,
    ) -> Result<usize, ParseError> {
        let token = &tokens[i];
        let matcher = self.matcher();

        match kind {
            Classifier::Long => {
                let (name, attached) = split_long(token).ok_or_else(|| internal(token, kind))?;
                match self.names.find(NameKind::Long, name, matcher) {
                    Some((id, slot)) => self.record(id, slot, attached, tokens, i, (i, 0)),
                    None => {
                        pass.unknown.push((i, token.clone()));
                        Ok(i + 1)
                    }
                }
            }
            Classifier::Windows => {
                let (name, attached) = split_windows(token).ok_or_else(|| internal(token, kind))?;
                let (id, slot) = self
                    .names
                    .find_windows(name, matcher)
                    .ok_or_else(|| internal(token, kind))?;
                self.record(id, slot, attached, tokens, i, (i, 0))
            }
            Classifier::Short => {
                split_short(token).ok_or_else(|| internal(token, kind))?;
                let body = &token[1..];

                for (offset, c) in body.char_indices() {
                    let end = offset + c.len_utf8();
                    let found = if valid_first_char(c) {
                        self.names.find(NameKind::Short, &body[offset..end], matcher)
                    } else {
                        None
                    };
                    let Some((id, slot)) = found else {
                        pass.unknown.push((i, format!("-{}", &body[offset..])));
                        return Ok(i + 1);
                    };

                    if self.option(id).is_some_and(Opt::is_flag) {
                        self.record(id, slot, None, tokens, i, (i, offset))?;
                        continue;
                    }
                    let rest = &body[end..];
                    let attached = if rest.is_empty() {
                        None
                    } else {
                        Some(rest.strip_prefix('=').unwrap_or(rest))
                    };
                    return self.record(id, slot, attached, tokens, i, (i, offset));
                }
                Ok(i + 1)
            }
            Classifier::Separator | Classifier::Subcommand | Classifier::Positional => {
                Err(internal(token, kind))
            }
        }
    }

    fn record(
        &mut self,
        id: OptionId,
        slot: usize,
        attached: Option<&str>,
        tokens: &[String],
        i: usize,
        position: (usize, usize),
    ) -> Result<usize, ParseError> {
        let opt = self
            .option(id)
            .ok_or_else(|| ParseError::Internal(format!("option slot {} is empty", id.0)))?;

        let (occurrence, next) = if opt.is_flag() {
            let value = opt.flag_result(slot, attached);
            let occurrence = Occurrence {
                position,
                tokens: vec![Captured { value, index: None }],
                greedy: false,
                floor: 1,
            };
            (occurrence, i + 1)
        } else {
            self.consume_for(opt, attached, tokens, i, position)?
        };

        tracing::debug!(
            option = %opt.name(),
            values = occurrence.len(),
            "Matched option"
        );
        if let Some(opt) = self.option_mut(id) {
            opt.occurrences.push(occurrence);
        }
        Ok(next)
    }

    fn consume_for(
        &self,
        opt: &Opt,
        attached: Option<&str>,
        tokens: &[String],
        i: usize,
        position: (usize, usize),
    ) -> Result<(Occurrence, usize), ParseError> {
        let greedy = opt.arity.is_unlimited() || opt.greedy_fixed();
        let target = opt.arity.min();

        let mut captured: Vec<Captured> = attached
            .map(|value| Captured {
                value: value.to_string(),
                index: None,
            })
            .into_iter()
            .collect();
        let mut next = i + 1;

        while greedy || captured.len() < target {
            let Some(token) = tokens.get(next) else {
                break;
            };
            if !self.takes_as_value(token, greedy) {
                break;
            }
            captured.push(Captured {
                value: token.clone(),
                index: Some(next),
            });
            next += 1;
        }

        if captured.is_empty() || (captured.len() < target && !opt.arity.is_unlimited()) {
            return Err(ParseError::mismatch(
                opt.name(),
                format!("expected {target} argument(s), got {}", captured.len()),
            ));
        }

        let floor = if opt.arity.is_unlimited() { opt.group } else { target };
        let occurrence = Occurrence {
            position,
            tokens: captured,
            greedy,
            floor,
        };
        Ok((occurrence, next))
    }

    /// Whether `token` can be taken as a value of the option being matched.
    fn takes_as_value(&self, token: &str, greedy: bool) -> bool {
        if token == "--" || is_option_shaped(token) {
            return false;
        }
        if self.allow_windows_style_options && self.classify(token) == Classifier::Windows {
            return false;
        }
        !(greedy && self.find_subcommand(token).is_some())
    }

    fn positional_demand(&self, available: usize) -> usize {
        let need: usize = self
            .options()
            .filter(|o| o.is_positional())
            .map(unfilled)
            .sum();
        need.saturating_sub(available)
    }

    /// Take trailing groups back from greedy occurrences, most recent
    /// first, until positionals have enough candidates.
    fn reallocate(&mut self, pass: &mut Pass) {
        let mut demand = self.positional_demand(pass.candidates.len());
        if demand == 0 {
            return;
        }

        let mut greedy: Vec<((usize, usize), OptionId, usize)> = self
            .options()
            .flat_map(|o| {
                o.occurrences
                    .iter()
                    .enumerate()
                    .filter(|(_, occ)| occ.greedy)
                    .map(move |(k, occ)| (occ.position, o.id, k))
            })
            .collect();
        greedy.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, id, k) in greedy {
            if demand == 0 {
                break;
            }
            let Some(opt) = self.option_mut(id) else {
                continue;
            };
            let group = opt.group.max(1);
            let min_total = opt.arity.min();
            let mut returned = 0;

            while demand > 0 {
                let total = opt.count();
                let occ = &mut opt.occurrences[k];
                let len = occ.tokens.len();
                if len < occ.floor + group || total < min_total + group {
                    break;
                }
                if occ.tokens[len - group..].iter().any(|t| t.index.is_none()) {
                    break;
                }
                for token in occ.tokens.drain(len - group..) {
                    if let Some(index) = token.index {
                        pass.candidates.push((index, token.value));
                    }
                }
                returned += group;
                demand = demand.saturating_sub(group);
            }

            if returned > 0 {
                tracing::debug!(option = %opt.name(), returned, "Returned tokens to positionals");
            }
        }

        pass.candidates.sort_by_key(|(index, _)| *index);
    }

    /// Fill positionals in declaration order from the candidate pool.
    fn assign_positionals(&mut self, pass: &mut Pass) {
        let ids: Vec<OptionId> = self
            .options()
            .filter(|o| o.is_positional())
            .map(Opt::id)
            .collect();
        let mut pool: VecDeque<(usize, String)> = std::mem::take(&mut pass.candidates).into();

        for (k, id) in ids.iter().enumerate() {
            let Some(&(first, _)) = pool.front() else {
                break;
            };
            let reserved: usize = ids[k + 1..]
                .iter()
                .filter_map(|later| self.option(*later))
                .map(unfilled)
                .sum();
            let Some(opt) = self.option_mut(*id) else {
                continue;
            };

            let wanted = match opt.arity {
                Arity::Fixed(n) => n.saturating_sub(opt.count()),
                Arity::AtLeast(_) => {
                    let available = pool.len().saturating_sub(reserved);
                    available - available % opt.group.max(1)
                }
            };
            let take = wanted.min(pool.len());
            if take == 0 {
                continue;
            }

            let tokens: Vec<Captured> = pool
                .drain(..take)
                .map(|(index, value)| Captured {
                    value,
                    index: Some(index),
                })
                .collect();
            tracing::debug!(positional = %opt.name(), values = tokens.len(), "Filled positional");
            opt.occurrences.push(Occurrence {
                position: (first, 0),
                tokens,
                greedy: false,
                floor: take,
            });
        }

        pass.candidates = pool.into();
    }

    /// Every matched option holds a count its arity allows.
    fn check_arity(&self) -> Result<(), ParseError> {
        for opt in self.options() {
            if opt.is_flag() || opt.occurrences.is_empty() {
                continue;
            }
            let total = opt.count();
            let group = opt.group.max(1);

            match opt.arity {
                Arity::Fixed(n) if !opt.greedy_fixed() => {
                    if let Some(occ) = opt.occurrences.iter().find(|o| o.len() != n) {
                        return Err(ParseError::mismatch(
                            opt.name(),
                            format!("expected {n} argument(s), got {}", occ.len()),
                        ));
                    }
                }
                Arity::Fixed(n) => {
                    if total < n {
                        return Err(ParseError::mismatch(
                            opt.name(),
                            format!("expected {n} argument(s), got {total}"),
                        ));
                    }
                }
                Arity::AtLeast(n) => {
                    if total < n || total % group != 0 {
                        return Err(ParseError::mismatch(
                            opt.name(),
                            format!("expected at least {n} argument(s) in groups of {group}, got {total}"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Record extras and the parse order.
    fn finish(&mut self, pass: Pass) {
        let mut extras = pass.candidates;
        extras.extend(pass.unknown);
        extras.sort_by_key(|(index, _)| *index);
        self.extras = extras.into_iter().map(|(_, token)| token).collect();

        let mut order: Vec<((usize, usize), OptionId)> = self
            .options()
            .flat_map(|o| o.occurrences.iter().map(move |occ| (occ.position, o.id)))
            .collect();
        order.sort_by_key(|(position, _)| *position);
        self.parse_order = order.into_iter().map(|(_, id)| id).collect();

        if !self.extras.is_empty() {
            tracing::debug!(app = %self.name(), extras = ?self.extras, "Unmatched tokens");
        }
    }
}
