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

//! Exact probability distributions for dice sums with optional keep/drop.
//!
//! Two solver paths: a closed-form combinatorial loop when no dice are
//! dropped, and a decomposition over the count of above-median dice when
//! they are. Both are memoized in process-wide caches.

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

#[cfg(feature = "logging")]
use log::debug;

use crate::distribution::Distribution;
use crate::rational::Rational;

const CACHE_CLEAR_THRESHOLD: usize = 10000;

type DiceKey = (i64, i64, i64, i64);

static DICE_CACHE: Lazy<Mutex<HashMap<DiceKey, Distribution>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static BINOMIAL_CACHE: Lazy<Mutex<BinomialCache>> =
    Lazy::new(|| Mutex::new(BinomialCache::new()));

/// Distribution of the sum of `number_of_dice` dice with `sides` sides each,
/// after dropping the `drop_low` lowest and `drop_high` highest rolls.
/// Returns the error distribution when the arguments do not describe a
/// valid roll.
pub fn dice(number_of_dice: i64, sides: i64, drop_low: i64, drop_high: i64) -> Distribution {
    if number_of_dice < 0
        || sides < 0
        || drop_low < 0
        || drop_high < 0
        || number_of_dice < drop_low + drop_high
    {
        return Distribution::error();
    }
    if number_of_dice == 0 || sides == 0 || number_of_dice == drop_low + drop_high {
        return Distribution::constant(Rational::zero());
    }
    // When not dropping any dice, cache if
    // A) the number of dice and sides are small, since these are common; or
    // B) the number of dice is a multiple of or less than 4, to use as
    //    starting points when calculating the others; or
    // C) the number of sides or dice is 1, since these will be frequently
    //    used as starting points for other calculations.
    //
    // Never cache when dropping low dice, since the solver routes those
    // through a symmetry to reduce the number of cache entries.
    //
    // When dropping dice, cache only if dropping an even number of high dice
    // and no low dice. Odd-numbered cases depend only on the cacheable
    // even-numbered ones, and caching less than this would be wasteful since
    // the sub-problems begin overlapping at the second level of recursion.
    let cacheable = (drop_low == 0
        && drop_high == 0
        && ((number_of_dice <= 5 && sides <= 20)
            || number_of_dice % 4 == 0
            || number_of_dice < 4
            || sides == 1
            || number_of_dice == 1))
        || (drop_low == 0 && drop_high % 2 == 0);
    let key = (number_of_dice, sides, drop_low, drop_high);
    if cacheable {
        if let Some(cached) = DICE_CACHE.lock().get_mut(&key) {
            // A cache hit means the entry is needed a second time; popular
            // entries should be normalized.
            cached.ensure_normalized();
            return cached.clone();
        }
    }
    let ret = solve(number_of_dice, sides, drop_low, drop_high);
    if cacheable {
        let mut cache = DICE_CACHE.lock();
        if cache.len() > CACHE_CLEAR_THRESHOLD {
            #[cfg(feature = "logging")]
            debug!("dice cache exceeded {} entries, clearing", CACHE_CLEAR_THRESHOLD);
            cache.clear();
        }
        cache.insert(key, ret.clone());
    }
    ret
}

fn solve(number_of_dice: i64, sides: i64, drop_low: i64, drop_high: i64) -> Distribution {
    if number_of_dice == 0 {
        return Distribution::constant(Rational::zero());
    }
    // With only one side, the sum of the kept dice is fixed.
    if sides == 1 {
        return Distribution::constant(Rational::from_int(
            sides * (number_of_dice - drop_low - drop_high),
        ));
    }
    if drop_low == 0 && drop_high == 0 {
        return combinatorial(number_of_dice, sides);
    }
    recursive_with_drops(number_of_dice, sides, drop_low, drop_high)
}

// Binomial coefficients memoized for the access pattern of the
// combinatorial solver, which by construction asks for neighbours of
// already-computed values.
struct BinomialCache {
    map: HashMap<(i64, i64), BigInt>,
}

impl BinomialCache {
    fn new() -> BinomialCache {
        BinomialCache {
            map: HashMap::new(),
        }
    }

    fn available(&self, n: i64, k: i64) -> bool {
        let k = if k > n >> 1 { n - k } else { k };
        if n < 0 {
            return false;
        }
        if k <= 2 || n - k <= 2 {
            return true;
        }
        self.map.contains_key(&(n, k))
    }

    /// `n` choose `k`, derived from cached neighbours where possible.
    fn binomial(&mut self, n: i64, k: i64) -> BigInt {
        let k = if k > n >> 1 { n - k } else { k };
        if k < 0 {
            return BigInt::zero();
        }
        if k == 0 {
            return BigInt::one();
        }
        if k == 1 {
            return BigInt::from(n);
        }
        if k == 2 {
            return BigInt::from(n) * BigInt::from(n - 1) / BigInt::from(2);
        }
        if let Some(cached) = self.map.get(&(n, k)) {
            return cached.clone();
        }
        let result = if self.available(n - 1, k - 1) && self.available(n - 1, k) {
            // (n choose k) = (n-1 choose k-1) + (n-1 choose k)
            let a = self.binomial(n - 1, k - 1);
            let b = self.binomial(n - 1, k);
            a + b
        } else if self.available(n - 1, k) {
            // (n choose k) = (n-1 choose k) * n / (n-k)
            // The most common case when computing large binomials.
            self.binomial(n - 1, k) * BigInt::from(n) / BigInt::from(n - k)
        } else if self.available(n + 1, k) && self.available(n, k - 1) {
            // (n choose k) = (n+1 choose k) - (n choose k-1)
            let a = self.binomial(n + 1, k);
            let b = self.binomial(n, k - 1);
            a - b
        } else if self.available(n + 1, k + 1) && self.available(n, k + 1) {
            // (n choose k) = (n+1 choose k+1) - (n choose k+1)
            let a = self.binomial(n + 1, k + 1);
            let b = self.binomial(n, k + 1);
            a - b
        } else if self.available(n, k - 1) {
            // (n choose k) = (n choose k-1) * (n-k+1) / k
            self.binomial(n, k - 1) * BigInt::from(n - k + 1) / BigInt::from(k)
        } else if self.available(n - 1, k - 1) {
            // (n choose k) = (n-1 choose k-1) * n / k
            self.binomial(n - 1, k - 1) * BigInt::from(n) / BigInt::from(k)
        } else {
            // The invocation pattern of the combinatorial loop should always
            // leave a neighbour available; fall back to the product formula
            // in case it ever does not.
            product_binomial(n, k)
        };
        self.map.insert((n, k), result.clone());
        result
    }
}

fn product_binomial(n: i64, k: i64) -> BigInt {
    let mut result = BigInt::one();
    for i in 0..k {
        result = result * BigInt::from(n - i) / BigInt::from(i + 1);
    }
    result
}

/// Closed form for the sum of `n` dice with `s` sides. The probability of
/// rolling a total of T is
///
///   P(T) = 1/s^n * sum_{k=0}^{floor((T-n)/s)}
///            (-1)^k * C(n, k) * C(T - s*k - 1, n - 1)
///
/// Totals are filled from both ends at once, exploiting the reflective
/// symmetry P(T) = P(n*(s+1) - T).
fn combinatorial(n: i64, s: i64) -> Distribution {
    let s_pow_n = BigInt::from(s).pow(n as u32);
    if !s_pow_n.is_positive() {
        return Distribution::error();
    }
    let mut cache = BINOMIAL_CACHE.lock();
    if cache.map.len() > CACHE_CLEAR_THRESHOLD {
        #[cfg(feature = "logging")]
        debug!("binomial cache exceeded {} entries, clearing", CACHE_CLEAR_THRESHOLD);
        cache.map.clear();
    }
    let mut terms: Vec<(Rational, Distribution)> = Vec::new();
    let mut low = n;
    let mut high = n * s;
    loop {
        let t = low;
        let limit = (t - n) / s;
        let mut sum = BigInt::zero();
        for k in 0..=limit {
            let mut a = cache.binomial(n, k);
            a *= cache.binomial(t - s * k - 1, n - 1);
            if k % 2 == 1 {
                a = -a;
            }
            sum += a;
        }
        let prob = Rational::from_fraction(sum, s_pow_n.clone());
        terms.push((prob.clone(), Distribution::constant(Rational::from_int(low))));
        if high != low {
            terms.push((prob, Distribution::constant(Rational::from_int(high))));
        }
        if high - low <= 1 {
            break;
        }
        low += 1;
        high -= 1;
    }
    Distribution::linear_combination(terms)
}

/// Keep/drop solver. The problem is decomposed over the count k of dice
/// that roll above the median threshold L = floor((s+1)/2): given k, the
/// high group is k dice on the upper s-L faces (shifted by L) and the low
/// group is n-k dice on the lower L faces, each with the drops that apply
/// to it.
fn recursive_with_drops(
    number_of_dice: i64,
    sides: i64,
    drop_low: i64,
    drop_high: i64,
) -> Distribution {
    // Dropping more low than high dice mirrors to the transposed problem:
    // D(n,s,dl,dh) = (s+1)*(n-dl-dh) - D(n,s,dh,dl). Only the
    // drop_high >= drop_low branch is computed and cached.
    if drop_high < drop_low {
        let mirrored = dice(number_of_dice, sides, drop_high, drop_low);
        return Distribution::constant(Rational::from_int(
            (sides + 1) * (number_of_dice - drop_low - drop_high),
        ))
        .minus(mirrored);
    }
    let limit = (sides + 1) / 2;
    let p_low = Rational::from_int(limit).div(&Rational::from_int(sides));
    let p_high = Rational::one().minus(&p_low);
    let n_br = Rational::from_int(number_of_dice);
    let mut terms: Vec<(Rational, Distribution)> =
        Vec::with_capacity(number_of_dice as usize + 1);
    let mut total = Rational::zero();
    for k in 0..=number_of_dice {
        let rest = number_of_dice - k;
        let coeff = p_high
            .pow(&Rational::from_int(k))
            .times(&p_low.pow(&Rational::from_int(rest)))
            .times(&n_br.binomial(&Rational::from_int(k)));
        let eff_drop_low = (drop_low - rest).max(0);
        let eff_drop_high = k.min(drop_high);
        let prob_higher = dice(k, sides - limit, eff_drop_low, eff_drop_high).plus(
            Distribution::constant(Rational::from_int(
                limit * (k - eff_drop_low - eff_drop_high),
            )),
        );
        let prob_lower = dice(
            rest,
            limit,
            rest.min(drop_low),
            (drop_high - k).max(0),
        );
        total = total.plus(&coeff);
        terms.push((coeff, prob_higher.plus(prob_lower)));
    }
    assert!(
        total == Rational::one(),
        "decomposition coefficients must sum to 1"
    );
    Distribution::linear_combination(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::Style;

    fn n(v: i64) -> Rational {
        Rational::from_int(v)
    }

    // A very explicit and inefficient reference implementation: enumerate
    // all s^n outcomes, sort each, sum the kept dice.
    fn brute_force(number_of_dice: usize, sides: i64, drop_low: usize, drop_high: usize) -> Distribution {
        if number_of_dice == 0 || sides == 0 || drop_low + drop_high >= number_of_dice {
            return Distribution::constant(Rational::zero());
        }
        let mut counts: HashMap<i64, i64> = HashMap::new();
        let mut total = 0i64;
        let mut outcome = vec![1i64; number_of_dice];
        loop {
            let mut sorted = outcome.clone();
            sorted.sort_unstable();
            let sum: i64 = sorted[drop_low..number_of_dice - drop_high]
                .iter()
                .sum();
            *counts.entry(sum).or_insert(0) += 1;
            total += 1;
            let mut done = true;
            for i in (0..number_of_dice).rev() {
                if outcome[i] < sides {
                    outcome[i] += 1;
                    done = false;
                    break;
                }
                outcome[i] = 1;
            }
            if done {
                break;
            }
        }
        let den = n(total);
        Distribution::linear_combination(counts.into_iter().map(|(sum, count)| {
            (n(count).div(&den), Distribution::constant(n(sum)))
        }))
    }

    #[test]
    fn test_model_checking() {
        for number_of_dice in 0..=4usize {
            for sides in 0..=4i64 {
                for drop_low in 0..=number_of_dice {
                    for drop_high in 0..=(number_of_dice - drop_low) {
                        let expected =
                            brute_force(number_of_dice, sides, drop_low, drop_high);
                        let actual = dice(
                            number_of_dice as i64,
                            sides,
                            drop_low as i64,
                            drop_high as i64,
                        );
                        let msg = format!(
                            "n={}, s={}, dl={}, dh={}",
                            number_of_dice, sides, drop_low, drop_high
                        );
                        assert_eq!(expected, actual, "{}", msg);
                        assert_eq!(
                            expected.render(false),
                            actual.render(false),
                            "{}",
                            msg
                        );
                        assert_eq!(
                            expected.expected_value(),
                            actual.expected_value(),
                            "{}",
                            msg
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(Distribution::error(), dice(-1, 6, 0, 0));
        assert_eq!(Distribution::error(), dice(2, -1, 0, 0));
        assert_eq!(Distribution::error(), dice(2, 6, -1, 0));
        assert_eq!(Distribution::error(), dice(2, 6, 0, -1));
        assert_eq!(Distribution::error(), dice(2, 6, 2, 1));
    }

    #[test]
    fn test_trivial_cases() {
        let zero = Distribution::constant(n(0));
        assert_eq!(zero, dice(0, 6, 0, 0));
        assert_eq!(zero, dice(3, 0, 0, 0));
        assert_eq!(zero, dice(3, 6, 1, 2));
        assert_eq!(Distribution::constant(n(5)), dice(5, 1, 0, 0));
        assert_eq!(Distribution::constant(n(3)), dice(5, 1, 2, 0));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        for number_of_dice in 1..=6i64 {
            for sides in 1..=8i64 {
                let d = dice(number_of_dice, sides, 0, 0);
                let mut total = Rational::zero();
                for outcome in number_of_dice..=number_of_dice * sides {
                    total = total.plus(&d.get(&n(outcome)));
                }
                assert_eq!(
                    Rational::one(),
                    total,
                    "n={}, s={}",
                    number_of_dice,
                    sides
                );
            }
        }
    }

    #[test]
    fn test_high_dice_counts() {
        for number_of_dice in 0..=20 {
            for sides in 0..=20 {
                dice(number_of_dice, sides, 0, 0);
            }
        }
        assert_eq!("5050", dice(100, 100, 0, 0).expected_value().to_string());
        assert_eq!("2001", dice(2, 2000, 0, 0).expected_value().to_string());
        assert_eq!("1500", dice(1000, 2, 0, 0).expected_value().to_string());
        assert_eq!("1002", dice(4, 500, 0, 0).expected_value().to_string());
        assert_eq!("1250", dice(500, 4, 0, 0).expected_value().to_string());
        assert_eq!(
            "5000.5",
            dice(1, 10000, 0, 0).expected_value().render(Style::new(false))
        );
        assert_eq!("1000", dice(1000, 1, 0, 0).expected_value().to_string());
    }

    #[test]
    fn test_complex_expressions() {
        let mut res = dice(30, 30, 0, 0);
        let one = Distribution::constant(n(1));
        for _ in 0..30 {
            res = res.plus(one.clone());
            res = res.times(one.clone());
            res = res.minus(one.clone());
            res = res.div(one.clone());
        }
        assert_eq!("465", res.expected_value().to_string());

        let a = dice(20, 12, 0, 0);
        let b = dice(30, 6, 2, 0);
        let c = Distribution::constant(n(7));
        let d = Distribution::constant(n(2));
        let res2 = a.plus(b).plus(c).div(d);
        assert_eq!(
            "119 1697959580431178797867/1727139997818229358592",
            res2.expected_value().render(Style::new(false))
        );
    }

    #[test]
    fn test_dropped_dice() {
        let dl = dice(12, 12, 5, 0);
        let dh = dice(12, 12, 0, 5);
        let both = dice(12, 12, 3, 3);
        assert_eq!(
            "61 423896133343/743008370688",
            dl.expected_value().render(Style::new(false))
        );
        assert_eq!(
            "29 319112237345/743008370688",
            dh.expected_value().render(Style::new(false))
        );
        assert_eq!(
            "39",
            both.expected_value().render(Style::new(false))
        );
    }
}
