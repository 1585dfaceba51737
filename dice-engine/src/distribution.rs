/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Finite probability distributions with rational outcomes and rational
//! probabilities.
//!
//! A [`Rational`] does not work as a map key (structural equality of
//! unnormalized fractions is meaningless), so outcomes are keyed by their
//! canonical string form. The entry holds the outcome itself next to its
//! probability.

use std::collections::HashMap;

use crate::rational::{Rational, Style};

#[derive(Clone, Debug)]
struct Entry {
    outcome: Rational,
    probability: Rational,
}

#[derive(Clone, Debug)]
pub struct Distribution {
    map: HashMap<String, Entry>,
    // Whether every probability in the map is normalized. Outcomes are
    // normalized by construction.
    normalized: bool,
}

impl Distribution {
    /// The distribution that yields `outcome` with certainty.
    pub fn constant(outcome: Rational) -> Distribution {
        let mut outcome = outcome;
        outcome.ensure_normalized();
        let mut map = HashMap::new();
        map.insert(
            outcome.to_string(),
            Entry {
                outcome,
                probability: Rational::one(),
            },
        );
        Distribution {
            map,
            normalized: true,
        }
    }

    /// The `{NaN -> NaN}` sentinel returned for undefined queries.
    pub fn error() -> Distribution {
        let mut map = HashMap::new();
        map.insert(
            "NaN".to_string(),
            Entry {
                outcome: Rational::nan(),
                probability: Rational::nan(),
            },
        );
        Distribution {
            map,
            normalized: true,
        }
    }

    pub(crate) fn ensure_normalized(&mut self) {
        if !self.normalized {
            for entry in self.map.values_mut() {
                entry.probability.ensure_normalized();
            }
            self.normalized = true;
        }
    }

    /// The probability of `outcome`, or zero if it is not in the support.
    pub fn get(&self, outcome: &Rational) -> Rational {
        self.get_str(&outcome.to_string())
    }

    fn get_str(&self, key: &str) -> Rational {
        match self.map.get(key) {
            Some(entry) => entry.probability.clone(),
            None => Rational::zero(),
        }
    }

    fn constant_outcome(&self) -> Option<Rational> {
        if self.map.len() == 1 {
            self.map.values().next().map(|e| e.outcome.clone())
        } else {
            None
        }
    }

    /// Map every outcome through `f`, keeping its probability. `f` must be
    /// a bijection on the support.
    fn map_outcome1(self, f: impl Fn(&Rational) -> Rational) -> Distribution {
        let mut map = HashMap::with_capacity(self.map.len());
        for entry in self.map.into_values() {
            let mut outcome = f(&entry.outcome);
            outcome.ensure_normalized();
            map.insert(
                outcome.to_string(),
                Entry {
                    outcome,
                    probability: entry.probability,
                },
            );
        }
        Distribution {
            map,
            normalized: self.normalized,
        }
    }

    /// Distribution of `f(a, b)` for independent draws from the two inputs.
    fn convolve(
        mut self,
        mut other: Distribution,
        f: impl Fn(&Rational, &Rational) -> Rational,
    ) -> Distribution {
        // Many small products follow; normalizing up front pays off.
        self.ensure_normalized();
        other.ensure_normalized();
        let mut ret = Distribution {
            map: HashMap::new(),
            normalized: false,
        };
        for v1 in self.map.values() {
            for v2 in other.map.values() {
                let mut outcome = f(&v1.outcome, &v2.outcome);
                let p = v1.probability.times(&v2.probability);
                outcome.ensure_normalized();
                let key = outcome.to_string();
                let probability = ret.get_str(&key).plus(&p);
                ret.map.insert(
                    key,
                    Entry {
                        outcome,
                        probability,
                    },
                );
            }
        }
        ret
    }

    pub fn plus(self, other: Distribution) -> Distribution {
        if let Some(a) = self.constant_outcome() {
            if a == Rational::zero() {
                return other;
            }
            return other.map_outcome1(|b| a.plus(b));
        }
        if let Some(b) = other.constant_outcome() {
            if b == Rational::zero() {
                return self;
            }
            return self.map_outcome1(|a| a.plus(&b));
        }
        self.convolve(other, |a, b| a.plus(b))
    }

    pub fn minus(self, other: Distribution) -> Distribution {
        if let Some(a) = self.constant_outcome() {
            return other.map_outcome1(|b| a.minus(b));
        }
        if let Some(b) = other.constant_outcome() {
            if b == Rational::zero() {
                return self;
            }
            return self.map_outcome1(|a| a.minus(&b));
        }
        self.convolve(other, |a, b| a.minus(b))
    }

    pub fn times(self, other: Distribution) -> Distribution {
        if let Some(a) = self.constant_outcome() {
            if a == Rational::one() {
                return other;
            }
            return other.map_outcome1(|b| a.times(b));
        }
        if let Some(b) = other.constant_outcome() {
            if b == Rational::one() {
                return self;
            }
            return self.map_outcome1(|a| a.times(&b));
        }
        self.convolve(other, |a, b| a.times(b))
    }

    pub fn div(self, other: Distribution) -> Distribution {
        if let Some(a) = self.constant_outcome() {
            return other.map_outcome1(|b| a.div(b));
        }
        if let Some(b) = other.constant_outcome() {
            if b == Rational::one() {
                return self;
            }
            return self.map_outcome1(|a| a.div(&b));
        }
        self.convolve(other, |a, b| a.div(b))
    }

    pub fn div_trunc(self, other: Distribution) -> Distribution {
        // Truncation is not a bijection, so there is no shortcut path.
        self.convolve(other, |a, b| a.div_trunc(b))
    }

    pub fn expected_value(&self) -> Rational {
        let mut ret = Rational::zero();
        for entry in self.map.values() {
            ret = ret.plus(&entry.outcome.times(&entry.probability));
        }
        ret
    }

    /// Weighted sum of distributions. The coefficients are not required to
    /// add up to one; callers that want a probability distribution have to
    /// maintain that themselves.
    pub fn linear_combination(
        terms: impl IntoIterator<Item = (Rational, Distribution)>,
    ) -> Distribution {
        let mut ret = Distribution {
            map: HashMap::new(),
            normalized: false,
        };
        for (coeff, dist) in terms {
            for (key, entry) in dist.map {
                let probability = ret
                    .get_str(&key)
                    .plus(&coeff.times(&entry.probability));
                ret.map.insert(
                    key,
                    Entry {
                        outcome: entry.outcome,
                        probability,
                    },
                );
            }
        }
        ret
    }

    /// Render the average and a table of outcome probabilities, one row per
    /// outcome in ascending order. The third column is the probability of
    /// rolling at least the outcome; if the probabilities do not account for
    /// everything, a final error row reports the remainder.
    pub fn render(&self, latex: bool) -> String {
        let mut outcomes: Vec<&Rational> =
            self.map.values().map(|e| &e.outcome).collect();
        outcomes.sort();
        let mut table = String::new();
        let mut cumulative = Rational::one();
        for outcome in outcomes {
            let p = self.get(outcome);
            if p == Rational::zero() {
                continue;
            }
            table.push_str(&format!(
                "\n|{}|{}|{}|",
                outcome.render(Style::new(latex).bold()),
                p.render(Style::new(latex).percent()),
                cumulative.render(Style::new(latex).percent()),
            ));
            cumulative = cumulative.minus(&p);
        }
        if cumulative != Rational::zero() {
            table.push_str(&format!(
                "\n|Probability unaccounted for|{}|**ERROR**|",
                cumulative.render(Style::new(latex).percent())
            ));
        }
        format!(
            "Average: {}\n\n|Outcome|Chance to get|Chance to get at least|\n|-|-|-|{}",
            self.expected_value().render(Style::new(latex).bold()),
            table
        )
    }
}

impl PartialEq for Distribution {
    fn eq(&self, other: &Distribution) -> bool {
        self.map
            .iter()
            .all(|(k, v)| v.probability == other.get_str(k))
            && other
                .map
                .iter()
                .all(|(k, v)| v.probability == self.get_str(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> Rational {
        Rational::from_int(v)
    }

    fn uniform(sides: i64) -> Distribution {
        Distribution::linear_combination((1..=sides).map(|v| {
            (n(1).div(&n(sides)), Distribution::constant(n(v)))
        }))
    }

    #[test]
    fn test_constant() {
        let c = Distribution::constant(n(7));
        assert_eq!(n(1), c.get(&n(7)));
        assert_eq!(n(0), c.get(&n(8)));
        assert_eq!(n(7), c.expected_value());
    }

    #[test]
    fn test_error_equals_itself() {
        assert_eq!(Distribution::error(), Distribution::error());
        assert_ne!(Distribution::error(), Distribution::constant(n(0)));
        assert!(Distribution::error().expected_value().is_nan());
    }

    #[test]
    fn test_plus_convolution() {
        let sum = uniform(2).plus(uniform(2));
        assert_eq!(Rational::from_string("1/4"), sum.get(&n(2)));
        assert_eq!(Rational::from_string("1/2"), sum.get(&n(3)));
        assert_eq!(Rational::from_string("1/4"), sum.get(&n(4)));
        assert_eq!(n(3), sum.expected_value());
    }

    #[test]
    fn test_constant_shortcuts() {
        let d = uniform(6);
        let shifted = d.clone().plus(Distribution::constant(n(2)));
        assert_eq!(Rational::from_string("1/6"), shifted.get(&n(3)));
        assert_eq!(Rational::from_string("1/6"), shifted.get(&n(8)));
        assert_eq!(d.clone(), d.clone().plus(Distribution::constant(n(0))));
        assert_eq!(d.clone(), d.clone().times(Distribution::constant(n(1))));
        assert_eq!(d.clone(), d.clone().minus(Distribution::constant(n(0))));
        assert_eq!(d.clone(), d.clone().div(Distribution::constant(n(1))));
        let negated = Distribution::constant(n(0)).minus(d.clone());
        assert_eq!(Rational::from_string("1/6"), negated.get(&n(-6)));
        assert_eq!(n(0), negated.get(&n(6)));
    }

    #[test]
    fn test_div_trunc() {
        let d = uniform(3).div_trunc(Distribution::constant(n(2)));
        // 1/2 -> 0, 2/2 -> 1, 3/2 -> 1
        assert_eq!(Rational::from_string("1/3"), d.get(&n(0)));
        assert_eq!(Rational::from_string("2/3"), d.get(&n(1)));
    }

    #[test]
    fn test_division_by_zero_outcome() {
        let d = uniform(2).div(Distribution::constant(n(0)));
        assert_eq!(Rational::from_string("1/2"), d.get(&Rational::nan()));
    }

    #[test]
    fn test_render_table() {
        let expected = "Average: **1.5**\n\n\
            |Outcome|Chance to get|Chance to get at least|\n\
            |-|-|-|\n\
            |**1**|50 %|100 %|\n\
            |**2**|50 %|50 %|";
        assert_eq!(expected, uniform(2).render(false));
    }

    #[test]
    fn test_render_error_table() {
        let expected = "Average: **NaN**\n\n\
            |Outcome|Chance to get|Chance to get at least|\n\
            |-|-|-|\n\
            |**NaN**|NaN|100 %|\n\
            |Probability unaccounted for|NaN|**ERROR**|";
        assert_eq!(expected, Distribution::error().render(false));
    }

    #[test]
    fn test_linear_combination_unaccounted() {
        let half = Rational::from_string("1/2");
        let partial = Distribution::linear_combination(vec![(
            half,
            Distribution::constant(n(1)),
        )]);
        let rendered = partial.render(false);
        assert!(rendered.contains("|Probability unaccounted for|50 %|**ERROR**|"));
    }
}
