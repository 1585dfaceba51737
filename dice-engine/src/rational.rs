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

//! Immutable arbitrary-precision rationals with a dedicated NaN value.
//!
//! Compared to a plain `num`-style rational, this type
//! - defers normalization until a comparison, rendering or integer test
//!   needs it,
//! - renders in mixed-numeral Markdown or LaTeX form,
//! - propagates NaN through every operation. NaN is produced by arithmetic
//!   on NaN operands, division by zero, exponentiation with an exponent
//!   outside of ℕ₀ and parsing of malformed strings. NaN equals only itself
//!   and sorts before every other value.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Pow, Signed, ToPrimitive, Zero};

// Operands whose numerator and denominator both exceed this many bits are
// reduced before they are multiplied again.
const NORM_BIT_LIMIT: u64 = 1200;

#[derive(Clone, Debug)]
enum Repr {
    NaN,
    // den is always positive. `normalized` additionally guarantees
    // gcd(|num|, den) == 1.
    Frac {
        num: BigInt,
        den: BigInt,
        normalized: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Rational(Repr);

impl Rational {
    pub fn nan() -> Rational {
        Rational(Repr::NaN)
    }

    pub fn zero() -> Rational {
        Rational::from_int(0)
    }

    pub fn one() -> Rational {
        Rational::from_int(1)
    }

    pub fn from_int(n: i64) -> Rational {
        Rational(Repr::Frac {
            num: BigInt::from(n),
            den: BigInt::one(),
            normalized: true,
        })
    }

    /// `num / den` as an unnormalized rational, or NaN if `den` is zero.
    pub fn from_fraction(num: BigInt, den: BigInt) -> Rational {
        if den.is_zero() {
            return Rational::nan();
        }
        let (num, den) = if den.is_negative() {
            (-num, -den)
        } else {
            (num, den)
        };
        Rational(Repr::Frac {
            num,
            den,
            normalized: false,
        })
    }

    /// Parse `-123` or `-123/456` (denominator unsigned and non-zero).
    /// Anything else yields NaN. Intended as the inverse of [`Display`].
    ///
    /// The digits are scanned by hand instead of handing the whole string to
    /// a stock fraction parser, so adversarial inputs cannot reach a slow
    /// path.
    pub fn from_string(s: &str) -> Rational {
        fn digits(s: &str) -> Option<BigInt> {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            BigInt::parse_bytes(s.as_bytes(), 10)
        }
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (num_str, den_str) = match rest.split_once('/') {
            Some((n, d)) => (n, Some(d)),
            None => (rest, None),
        };
        let num = match digits(num_str) {
            Some(n) if negative => -n,
            Some(n) => n,
            None => return Rational::nan(),
        };
        match den_str {
            None => Rational(Repr::Frac {
                num,
                den: BigInt::one(),
                normalized: true,
            }),
            Some(d) => match digits(d) {
                Some(den) if !den.is_zero() => Rational(Repr::Frac {
                    num,
                    den,
                    normalized: false,
                }),
                _ => Rational::nan(),
            },
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self.0, Repr::NaN)
    }

    pub fn is_int(&self) -> bool {
        match &self.0 {
            Repr::NaN => false,
            Repr::Frac {
                num,
                den,
                normalized,
            } => {
                if *normalized {
                    den.is_one()
                } else {
                    (num % den).is_zero()
                }
            }
        }
    }

    /// Whether the value is a non-negative integer.
    pub fn in_n0(&self) -> bool {
        match &self.0 {
            Repr::NaN => false,
            Repr::Frac { num, .. } => self.is_int() && !num.is_negative(),
        }
    }

    pub(crate) fn ensure_normalized(&mut self) {
        if let Repr::Frac {
            num,
            den,
            normalized,
        } = &mut self.0
        {
            if !*normalized {
                let gcd = num.gcd(den);
                *num /= &gcd;
                *den /= &gcd;
                *normalized = true;
            }
        }
    }

    fn maybe_normalize(&mut self) {
        let worth_reducing = match &self.0 {
            Repr::Frac {
                num,
                den,
                normalized: false,
            } => num.bits() > NORM_BIT_LIMIT && den.bits() > NORM_BIT_LIMIT,
            _ => false,
        };
        if worth_reducing {
            self.ensure_normalized();
        }
    }

    fn parts(&self) -> Option<(&BigInt, &BigInt)> {
        match &self.0 {
            Repr::NaN => None,
            Repr::Frac { num, den, .. } => Some((num, den)),
        }
    }

    pub fn plus(&self, other: &Rational) -> Rational {
        self.combine(other, |n1, d1, n2, d2| {
            (n1 * d2 + d1 * n2, d1 * d2)
        })
    }

    pub fn minus(&self, other: &Rational) -> Rational {
        self.combine(other, |n1, d1, n2, d2| {
            (n1 * d2 - d1 * n2, d1 * d2)
        })
    }

    pub fn times(&self, other: &Rational) -> Rational {
        self.combine(other, |n1, d1, n2, d2| (n1 * n2, d1 * d2))
    }

    pub fn div(&self, other: &Rational) -> Rational {
        match other.parts() {
            Some((num, _)) if num.is_zero() => return Rational::nan(),
            Some(_) => {}
            None => return Rational::nan(),
        }
        self.combine(other, |n1, d1, n2, d2| {
            let num = n1 * d2;
            let den = d1 * n2;
            if den.is_negative() {
                (-num, -den)
            } else {
                (num, den)
            }
        })
    }

    fn combine(
        &self,
        other: &Rational,
        f: impl FnOnce(&BigInt, &BigInt, &BigInt, &BigInt) -> (BigInt, BigInt),
    ) -> Rational {
        if self.is_nan() || other.is_nan() {
            return Rational::nan();
        }
        let mut a = self.clone();
        let mut b = other.clone();
        a.maybe_normalize();
        b.maybe_normalize();
        let (n1, d1) = a.parts().expect("checked non-NaN");
        let (n2, d2) = b.parts().expect("checked non-NaN");
        let (num, den) = f(n1, d1, n2, d2);
        Rational(Repr::Frac {
            num,
            den,
            normalized: false,
        })
    }

    /// Division rounded towards zero; integer result. NaN-propagating and
    /// safe against division by zero.
    pub fn div_trunc(&self, other: &Rational) -> Rational {
        let r = self.div(other);
        if r.is_nan() {
            return r;
        }
        let (num, den) = r.parts().expect("checked non-NaN");
        let (quot, rem) = num.div_mod_floor(den);
        let quot = if rem.is_zero() {
            quot
        } else if quot.is_negative() {
            quot + 1
        } else {
            quot
        };
        Rational(Repr::Frac {
            num: quot,
            den: BigInt::one(),
            normalized: true,
        })
    }

    /// `self` raised to `exp`. The exponent must be in ℕ₀, anything else
    /// gives NaN. `pow(0, 0)` is 1.
    pub fn pow(&self, exp: &Rational) -> Rational {
        if self.is_nan() || !exp.in_n0() {
            return Rational::nan();
        }
        // The result can grow large, so it is worth reducing the base first.
        let mut base = self.clone();
        base.ensure_normalized();
        let mut exp = exp.clone();
        exp.ensure_normalized();
        let e = match exp.parts().and_then(|(num, _)| num.to_u64()) {
            Some(e) => e,
            None => return Rational::nan(),
        };
        let (num, den) = base.parts().expect("checked non-NaN");
        Rational(Repr::Frac {
            // num and den are relatively prime, so their powers are too.
            num: Pow::pow(num, e),
            den: Pow::pow(den, e),
            normalized: true,
        })
    }

    /// Binomial coefficient `self` choose `other`. Defined only when both
    /// values are in ℕ₀, `self >= other` and `self <= 10000`; NaN otherwise.
    pub fn binomial(&self, other: &Rational) -> Rational {
        if !self.in_n0() || !other.in_n0() || self < other {
            return Rational::nan();
        }
        if *self > Rational::from_int(10000) {
            return Rational::nan();
        }
        let mut n = self.clone();
        n.ensure_normalized();
        let mut k = other.clone();
        k.ensure_normalized();
        let n = n
            .parts()
            .and_then(|(num, _)| num.to_u64())
            .expect("in ℕ₀ and bounded");
        let k = k
            .parts()
            .and_then(|(num, _)| num.to_u64())
            .expect("in ℕ₀ and bounded");
        let mut result = BigInt::one();
        for i in 0..k.min(n - k) {
            result = result * BigInt::from(n - i) / BigInt::from(i + 1);
        }
        Rational(Repr::Frac {
            num: result,
            den: BigInt::one(),
            normalized: true,
        })
    }

    /// Traditional rendering: integer, terminating decimal, proper fraction
    /// or mixed numeral, with optional percent scaling and bold/italic
    /// markup in either Markdown or LaTeX.
    pub fn render(&self, style: Style) -> String {
        if self.is_nan() {
            return render_nan(style);
        }
        let mut r = self.clone();
        r.ensure_normalized();
        if style.percent {
            r = r.times(&Rational::from_int(100));
        }
        let negative = matches!(r.parts(), Some((num, _)) if num.is_negative());
        if negative {
            r = Rational::zero().minus(&r);
        }
        r.ensure_normalized();
        let (num, den) = r.parts().expect("non-NaN throughout");
        let (int_part, rem) = num.div_mod_floor(den);
        let mut has_frac = !rem.is_zero();
        let mut decimal = String::new();
        if has_frac {
            // A fraction terminates in decimal iff repeated scaling by ten
            // eventually reaches an integer.
            let mut scaled = Rational(Repr::Frac {
                num: rem.clone(),
                den: den.clone(),
                normalized: true,
            });
            let mut decimals = 0usize;
            let ten = BigInt::from(10);
            loop {
                let d = match scaled.parts() {
                    Some((_, d)) => d,
                    None => break,
                };
                if d.gcd(&ten).is_one() {
                    break;
                }
                decimals += 1;
                scaled = scaled.times(&Rational::from_int(10));
                scaled.ensure_normalized();
            }
            if scaled.is_int() {
                has_frac = false;
                let (digits, _) = scaled.parts().expect("non-NaN");
                let mut digits = digits.to_string();
                while digits.len() < decimals {
                    digits.insert(0, '0');
                }
                decimal = format!(".{}", digits);
            }
        }
        let has_int = !int_part.is_zero() || !has_frac;

        let mut ret = String::new();
        if negative {
            if style.latex {
                if style.bold {
                    ret.push_str("\\textrm{\\textbf-}");
                } else {
                    ret.push_str("\\textrm{-}");
                }
            } else {
                ret.push('-');
            }
        }
        if has_int {
            ret.push_str(&int_part.to_string());
            if has_frac && !style.latex {
                ret.push(' ');
            }
        }
        if has_frac {
            if style.latex {
                ret.push_str(&format!("\\frac{{{}}}{{{}}}", rem, den));
            } else {
                ret.push_str(&format!("{}/{}", rem, den));
            }
        }
        ret.push_str(&decimal);
        if style.percent {
            ret.push_str(if style.latex { "\\%" } else { " %" });
        }
        if style.latex {
            ret = match (style.bold, style.italic) {
                (true, true) => format!("\\pmb{{\\mathit{{{}}}}}", ret),
                (true, false) => format!("\\mathbf{{{}}}", ret),
                (false, true) => format!("\\mathit{{{}}}", ret),
                (false, false) => ret,
            };
            format!("${}$", ret)
        } else {
            if style.bold {
                ret = format!("**{}**", ret);
            }
            if style.italic {
                ret = format!("*{}*", ret);
            }
            ret
        }
    }
}

fn render_nan(style: Style) -> String {
    if style.latex {
        match (style.bold, style.italic) {
            (true, true) => "$\\pmb{\\mathit{NaN}}$".to_string(),
            (true, false) => "$\\mathbf{NaN}$".to_string(),
            (false, true) => "$\\mathit{NaN}$".to_string(),
            (false, false) => "$NaN$".to_string(),
        }
    } else {
        let mut ret = "NaN".to_string();
        if style.bold {
            ret = format!("**{}**", ret);
        }
        if style.italic {
            ret = format!("*{}*", ret);
        }
        ret
    }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Rational) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Rational) -> Ordering {
        match (self.parts(), other.parts()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some((n1, d1)), Some((n2, d2))) => {
                // Denominators are positive, so cross-multiplying preserves
                // the ordering.
                (n1 * d2).cmp(&(n2 * d1))
            }
        }
    }
}

/// Canonical form: `NaN`, `-123` or `-123/456` (normalized, denominator
/// greater than one). This is the key form used by distributions.
impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut r = self.clone();
        r.ensure_normalized();
        match r.parts() {
            None => write!(f, "NaN"),
            Some((num, den)) => {
                if den.is_one() {
                    write!(f, "{}", num)
                } else {
                    write!(f, "{}/{}", num, den)
                }
            }
        }
    }
}

/// Rendering flags for [`Rational::render`] and the distribution table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Style {
    pub latex: bool,
    pub percent: bool,
    pub bold: bool,
    pub italic: bool,
}

impl Style {
    pub const fn new(latex: bool) -> Style {
        Style {
            latex,
            percent: false,
            bold: false,
            italic: false,
        }
    }

    pub const fn percent(mut self) -> Style {
        self.percent = true;
        self
    }

    pub const fn bold(mut self) -> Style {
        self.bold = true;
        self
    }

    pub const fn italic(mut self) -> Style {
        self.italic = true;
        self
    }
}
