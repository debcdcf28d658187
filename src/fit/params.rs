//! Parameter resolution: hold masks and manual overrides.
//!
//! Named overrides are resolved once into index-aligned vectors:
//!
//! - [`ParamLayout`] records which parameters are held and at what value
//! - [`apply_overrides`] merges manual guesses / bounds / scales into a [`Guess`]
//!
//! Nothing here fails. Every rejected override is dropped, logged with
//! `log::warn!`, and recorded in the caller's diagnostics list.

use std::collections::BTreeMap;

use log::warn;
use nalgebra::DMatrix;

use crate::domain::FitOptions;
use crate::models::Guess;

/// Log a recovered condition and keep it for the fit result.
pub fn note(diagnostics: &mut Vec<String>, message: String) {
    warn!("{message}");
    diagnostics.push(message);
}

/// Hold mask over a family's ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    names: Vec<String>,
    held: Vec<Option<f64>>,
}

impl ParamLayout {
    /// Build the mask from `names()` and a hold map, discarding diagnostics.
    pub fn resolve(names: &[&str], hold: &BTreeMap<String, f64>) -> Self {
        Self::resolve_with(names, hold, &mut Vec::new())
    }

    /// Unknown names and non-finite hold values are ignored with a warning.
    pub fn resolve_with(
        names: &[&str],
        hold: &BTreeMap<String, f64>,
        diagnostics: &mut Vec<String>,
    ) -> Self {
        let mut held = vec![None; names.len()];
        for (key, &value) in hold {
            match names.iter().position(|n| n == key) {
                None => note(
                    diagnostics,
                    format!("hold: '{key}' is not a parameter of this model; ignored"),
                ),
                Some(_) if !value.is_finite() => note(
                    diagnostics,
                    format!("hold: non-finite value {value} for '{key}'; ignored"),
                ),
                Some(i) => held[i] = Some(value),
            }
        }
        Self {
            names: names.iter().map(|s| s.to_string()).collect(),
            held,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn held_value(&self, i: usize) -> Option<f64> {
        self.held[i]
    }

    pub fn is_held(&self, i: usize) -> bool {
        self.held[i].is_some()
    }

    pub fn any_held(&self) -> bool {
        self.held.iter().any(Option::is_some)
    }

    pub fn n_free(&self) -> usize {
        self.held.iter().filter(|h| h.is_none()).count()
    }

    pub fn free_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| !self.is_held(i)).collect()
    }

    pub fn held_names(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.held)
            .filter(|(_, h)| h.is_some())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// The free sub-vector of a full-length vector.
    pub fn select_free<T: Copy>(&self, full: &[T]) -> Vec<T> {
        full.iter()
            .zip(&self.held)
            .filter(|(_, h)| h.is_none())
            .map(|(v, _)| *v)
            .collect()
    }

    /// Re-insert held values into a free-parameter vector.
    pub fn expand(&self, free: &[f64]) -> Vec<f64> {
        let mut it = free.iter();
        self.held
            .iter()
            .map(|h| match h {
                Some(v) => *v,
                None => it.next().copied().unwrap_or(f64::NAN),
            })
            .collect()
    }

    /// Full covariance with a zero row and column at every held index.
    pub fn expand_covariance(&self, free: &DMatrix<f64>) -> DMatrix<f64> {
        let n = self.len();
        let idx = self.free_indices();
        let mut full = DMatrix::<f64>::zeros(n, n);
        for (a, &i) in idx.iter().enumerate() {
            for (b, &j) in idx.iter().enumerate() {
                full[(i, j)] = free[(a, b)];
            }
        }
        full
    }
}

/// Merge manual overrides into a family's default guess.
///
/// Held parameters take their held value, keep their default bounds and may
/// sit outside them. For free parameters:
///
/// - `manual_guess` replaces the autoguess (unknown / held / non-finite ignored)
/// - `manual_bounds` replaces the default bounds unless it is malformed,
///   targets a held parameter, or excludes the current guess
/// - a guess still outside its bounds is clamped into them
/// - `manual_scale` must be positive and finite
pub fn apply_overrides(
    names: &[&str],
    guess: Guess,
    layout: &ParamLayout,
    options: &FitOptions,
) -> Guess {
    apply_overrides_with(names, guess, layout, options, &mut Vec::new())
}

pub fn apply_overrides_with(
    names: &[&str],
    mut guess: Guess,
    layout: &ParamLayout,
    options: &FitOptions,
    diagnostics: &mut Vec<String>,
) -> Guess {
    let index_of = |key: &str| names.iter().position(|n| *n == key);

    for (i, value) in guess.values.iter_mut().enumerate() {
        if let Some(h) = layout.held_value(i) {
            *value = h;
        }
    }

    let mut manual = vec![false; names.len()];
    for (key, &value) in &options.manual_guess {
        match index_of(key.as_str()) {
            None => note(diagnostics, format!("manual_guess: unknown parameter '{key}'; ignored")),
            Some(i) if layout.is_held(i) => note(
                diagnostics,
                format!("manual_guess: '{key}' is held; guess ignored"),
            ),
            Some(_) if !value.is_finite() => note(
                diagnostics,
                format!("manual_guess: non-finite value {value} for '{key}'; ignored"),
            ),
            Some(i) => {
                guess.values[i] = value;
                manual[i] = true;
            }
        }
    }

    for (key, &(lower, upper)) in &options.manual_bounds {
        let Some(i) = index_of(key.as_str()) else {
            note(diagnostics, format!("manual_bounds: unknown parameter '{key}'; ignored"));
            continue;
        };
        if layout.is_held(i) {
            note(
                diagnostics,
                format!("manual_bounds: '{key}' is held at {}; bounds ignored", guess.values[i]),
            );
        } else if lower.is_nan() || upper.is_nan() || lower >= upper {
            note(
                diagnostics,
                format!("manual_bounds: invalid interval [{lower}, {upper}] for '{key}'; ignored"),
            );
        } else if guess.values[i] < lower || guess.values[i] > upper {
            note(
                diagnostics,
                format!(
                    "manual_bounds: guess {} for '{key}' lies outside [{lower}, {upper}]; ignored",
                    guess.values[i]
                ),
            );
        } else {
            guess.bounds[i] = (lower, upper);
        }
    }

    for i in layout.free_indices() {
        let (lower, upper) = guess.bounds[i];
        let value = guess.values[i];
        if value < lower || value > upper {
            let clamped = value.clamp(lower, upper);
            if manual[i] {
                note(
                    diagnostics,
                    format!(
                        "manual_guess: {value} for '{}' outside [{lower}, {upper}]; clamped to {clamped}",
                        names[i]
                    ),
                );
            }
            guess.values[i] = clamped;
        }
    }

    for (key, &value) in &options.manual_scale {
        match index_of(key.as_str()) {
            None => note(diagnostics, format!("manual_scale: unknown parameter '{key}'; ignored")),
            Some(_) if !(value.is_finite() && value > 0.0) => note(
                diagnostics,
                format!("manual_scale: '{key}' needs a positive finite scale, got {value}; ignored"),
            ),
            Some(i) => guess.scale[i] = value,
        }
    }

    guess
}
