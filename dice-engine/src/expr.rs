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

//! The expression tree and its roll, value and probability traversals.
//! Rendering lives in [`crate::render`].

#[cfg(feature = "logging")]
use log::debug;

use crate::config::Config;
use crate::distribution::Distribution;
use crate::rational::Rational;
use crate::solver;

/// One die of a dice-term roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollResult {
    /// The value delivered by the roller.
    pub value: i64,
    /// Whether the die counts towards the sum.
    pub kept: bool,
    /// The position in which the die was rolled.
    pub order: usize,
    /// The index of the die when sorted by (value, order).
    pub rank: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SumOp {
    Add,
    Sub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProdOp {
    /// `*` or `×`; rendered as `×`.
    Mul,
    /// `/`: division rounded towards zero.
    TruncDiv,
    /// `//` or `÷`: exact division; rendered as `÷`.
    ExactDiv,
}

/// What a node contributes to the roll annotation of its ancestors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RollComment {
    Nothing,
    /// No sum or product (grand)parent may render a roll comment.
    BlockParent,
    /// Rendered at most once, by the outermost node that owns it.
    Text(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Natural(i64),
    Dice {
        count: i64,
        sides: i64,
        /// Index in the rank order of the first die to keep.
        keep_low: i64,
        /// Index in the rank order of the first die after the kept range.
        keep_high: i64,
        /// Empty until the roll traversal fills it.
        rolls: Vec<RollResult>,
    },
    /// `ops` holds the operator between child i and child i+1.
    Sum {
        ops: Vec<SumOp>,
    },
    Prod {
        ops: Vec<ProdOp>,
    },
    /// Parenthesized child; the parentheses survive rendering.
    Group,
    /// Child with a trailing textual tag.
    Labeled {
        label: String,
    },
    CommaList,
    /// Six ability scores, each the top three of four d6.
    Stats,
    /// A single d20 rendered as narrative.
    DeathSave,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) token: String,
    pub(crate) children: Vec<Node>,
    pub(crate) kind: NodeKind,
    pub(crate) roll_comment: RollComment,
}

impl Node {
    pub(crate) fn new(token: String, children: Vec<Node>, kind: NodeKind) -> Node {
        Node {
            token,
            children,
            kind,
            roll_comment: RollComment::Nothing,
        }
    }

    /// The slice of the input this node was parsed from.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Roll every dice term in the tree, depth first. The roller is called
    /// once per die with the number of sides and must return a value in
    /// `[1, sides]`; it is never called with a non-positive side count.
    pub fn roll<F: FnMut(i64) -> i64>(self, roller: &mut F, config: &Config) -> Node {
        let children: Vec<Node> = self
            .children
            .into_iter()
            .map(|c| c.roll(roller, config))
            .collect();
        let kind = match self.kind {
            NodeKind::Dice {
                count,
                sides,
                keep_low,
                keep_high,
                ..
            } => {
                let mut rolls: Vec<RollResult> = (0..count)
                    .map(|order| RollResult {
                        value: roller(sides),
                        kept: false,
                        order: order as usize,
                        rank: 0,
                    })
                    .collect();
                rolls.sort_by_key(|r| (r.value, r.order));
                for (rank, roll) in rolls.iter_mut().enumerate() {
                    roll.rank = rank;
                    roll.kept =
                        keep_low <= rank as i64 && (rank as i64) < keep_high;
                }
                rolls.sort_by_key(|r| r.order);
                #[cfg(feature = "logging")]
                debug!("dice roll result for {} is {:?}", self.token, rolls);
                NodeKind::Dice {
                    count,
                    sides,
                    keep_low,
                    keep_high,
                    rolls,
                }
            }
            kind => kind,
        };
        let mut node = Node {
            token: self.token,
            children,
            kind,
            roll_comment: RollComment::Nothing,
        };
        node.roll_comment = node.compute_roll_comment(config);
        node
    }

    fn compute_roll_comment(&self, config: &Config) -> RollComment {
        match &self.kind {
            NodeKind::Natural(_) | NodeKind::Stats | NodeKind::DeathSave => {
                RollComment::Nothing
            }
            NodeKind::Dice {
                sides,
                keep_low,
                keep_high,
                ..
            } => {
                if config.enable_dnd5e && *sides == 20 && keep_high - keep_low == 1 {
                    let value = self.value();
                    if value == Rational::from_int(20) {
                        return RollComment::Text(
                            " (NAT20! :star-struck:)".to_string(),
                        );
                    }
                    if value == Rational::one() {
                        return RollComment::Text(" (NAT1! :grimacing:)".to_string());
                    }
                }
                RollComment::BlockParent
            }
            NodeKind::Sum { .. } | NodeKind::Prod { .. } => {
                if self.children.len() == 1 {
                    return self.children[0].compute_roll_comment(config);
                }
                let mut comment = RollComment::Nothing;
                let mut count = 0;
                for child in &self.children {
                    match child.compute_roll_comment(config) {
                        RollComment::BlockParent => return RollComment::BlockParent,
                        RollComment::Nothing => {}
                        text => {
                            count += 1;
                            comment = text;
                        }
                    }
                }
                if count == 1 {
                    comment
                } else {
                    RollComment::Nothing
                }
            }
            NodeKind::Group | NodeKind::Labeled { .. } => {
                self.children[0].compute_roll_comment(config)
            }
            NodeKind::CommaList => {
                if self.children.len() == 1 {
                    self.children[0].compute_roll_comment(config)
                } else {
                    RollComment::Nothing
                }
            }
        }
    }

    /// The exact value of the (rolled) expression.
    pub fn value(&self) -> Rational {
        match &self.kind {
            NodeKind::Natural(n) => Rational::from_int(*n),
            NodeKind::Dice { rolls, .. } => {
                let mut ret = Rational::zero();
                for roll in rolls {
                    if roll.kept {
                        ret = ret.plus(&Rational::from_int(roll.value));
                    }
                }
                ret
            }
            NodeKind::Sum { ops } => {
                let mut ret = Rational::zero();
                for (i, child) in self.children.iter().enumerate() {
                    let v = child.value();
                    ret = match edge_op(ops, i) {
                        None | Some(SumOp::Add) => ret.plus(&v),
                        Some(SumOp::Sub) => ret.minus(&v),
                    };
                }
                ret
            }
            NodeKind::Prod { ops } => {
                let mut ret = Rational::one();
                for (i, child) in self.children.iter().enumerate() {
                    let v = child.value();
                    ret = match edge_op(ops, i) {
                        None | Some(ProdOp::Mul) => ret.times(&v),
                        Some(ProdOp::TruncDiv) => ret.div_trunc(&v),
                        Some(ProdOp::ExactDiv) => ret.div(&v),
                    };
                }
                ret
            }
            NodeKind::Group | NodeKind::Labeled { .. } | NodeKind::DeathSave => {
                self.children[0].value()
            }
            NodeKind::CommaList => {
                if self.children.len() == 1 {
                    self.children[0].value()
                } else {
                    Rational::zero()
                }
            }
            NodeKind::Stats => Rational::zero(),
        }
    }

    /// The exact probability distribution of the expression's value.
    /// `Stats`, `DeathSave` and comma lists with more than one entry have
    /// no single value to analyze and yield the error distribution.
    pub fn prob(&self) -> Distribution {
        match &self.kind {
            NodeKind::Natural(_) => Distribution::constant(self.value()),
            NodeKind::Dice {
                count,
                sides,
                keep_low,
                keep_high,
                ..
            } => solver::dice(*count, *sides, *keep_low, *count - *keep_high),
            NodeKind::Sum { ops } => {
                let mut ret = Distribution::constant(Rational::zero());
                for (i, child) in self.children.iter().enumerate() {
                    let d = child.prob();
                    ret = match edge_op(ops, i) {
                        None | Some(SumOp::Add) => ret.plus(d),
                        Some(SumOp::Sub) => ret.minus(d),
                    };
                }
                ret
            }
            NodeKind::Prod { ops } => {
                let mut ret = Distribution::constant(Rational::one());
                for (i, child) in self.children.iter().enumerate() {
                    let d = child.prob();
                    ret = match edge_op(ops, i) {
                        None | Some(ProdOp::Mul) => ret.times(d),
                        Some(ProdOp::TruncDiv) => ret.div_trunc(d),
                        Some(ProdOp::ExactDiv) => ret.div(d),
                    };
                }
                ret
            }
            NodeKind::Group | NodeKind::Labeled { .. } => self.children[0].prob(),
            NodeKind::CommaList => {
                if self.children.len() == 1 {
                    self.children[0].prob()
                } else {
                    Distribution::error()
                }
            }
            NodeKind::Stats | NodeKind::DeathSave => Distribution::error(),
        }
    }
}

/// The operator on the edge leading into child `i`; the first child has
/// none.
fn edge_op<T: Copy>(ops: &[T], i: usize) -> Option<T> {
    if i == 0 {
        None
    } else {
        ops.get(i - 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn roller_from(rolls: Vec<i64>) -> impl FnMut(i64) -> i64 {
        let mut iter = rolls.into_iter();
        move |_sides| iter.next().expect("ran out of mocked rolls")
    }

    #[test]
    fn test_dice_value_sums_kept() {
        let config = Config::default();
        let node = parse("4d6k2", &config).unwrap();
        let rolled = node.roll(&mut roller_from(vec![3, 6, 1, 4]), &config);
        assert_eq!(Rational::from_int(10), rolled.value());
    }

    #[test]
    fn test_rank_breaks_ties_by_order() {
        let config = Config::default();
        let node = parse("3d6k1", &config).unwrap();
        let rolled = node.roll(&mut roller_from(vec![2, 2, 2]), &config);
        // All values equal: the last-rolled die has the highest rank.
        assert_eq!(Rational::from_int(2), rolled.value());
    }

    #[test]
    fn test_prod_division_variants() {
        let config = Config::default();
        let truncated = parse("7/2", &config).unwrap();
        assert_eq!(Rational::from_int(3), truncated.value());
        let exact = parse("7//2", &config).unwrap();
        assert_eq!(Rational::from_string("7/2"), exact.value());
        let exact_unicode = parse("7÷2", &config).unwrap();
        assert_eq!(Rational::from_string("7/2"), exact_unicode.value());
    }

    #[test]
    fn test_division_by_zero_is_nan() {
        let config = Config::default();
        // The parser has no zero literal, but groups can evaluate to zero.
        let node = parse("7/(1-1)", &config).unwrap();
        assert!(node.value().is_nan());
        let exact = parse("7//(1-1)", &config).unwrap();
        assert!(exact.value().is_nan());
    }

    #[test]
    fn test_prob_matches_solver() {
        let config = Config::default();
        let node = parse("2d6", &config).unwrap();
        assert_eq!(solver::dice(2, 6, 0, 0), node.prob());
        let kept = parse("4d6k3", &config).unwrap();
        assert_eq!(solver::dice(4, 6, 1, 0), kept.prob());
        let dropped = parse("4d6dh1", &config).unwrap();
        assert_eq!(solver::dice(4, 6, 0, 1), dropped.prob());
    }

    #[test]
    fn test_prob_error_cases() {
        let config = Config::default();
        assert_eq!(
            Distribution::error(),
            parse("stats", &config).unwrap().prob()
        );
        assert_eq!(
            Distribution::error(),
            parse("death save", &config).unwrap().prob()
        );
        assert_eq!(
            Distribution::error(),
            parse("1d6, 2d8", &config).unwrap().prob()
        );
    }

    #[test]
    fn test_prob_arithmetic() {
        let config = Config::default();
        let node = parse("1d4+3", &config).unwrap();
        let d = node.prob();
        assert_eq!(Rational::from_string("1/4"), d.get(&Rational::from_int(4)));
        assert_eq!(Rational::from_string("1/4"), d.get(&Rational::from_int(7)));
        assert_eq!(Rational::zero(), d.get(&Rational::from_int(3)));
        let halved = parse("1d4/2", &config).unwrap().prob();
        // 1/2 -> 0, 2/2 -> 1, 3/2 -> 1, 4/2 -> 2
        assert_eq!(
            Rational::from_string("1/2"),
            halved.get(&Rational::from_int(1))
        );
        assert_eq!(
            Rational::from_string("1/4"),
            halved.get(&Rational::from_int(0))
        );
        assert_eq!(
            Rational::from_string("1/4"),
            halved.get(&Rational::from_int(2))
        );
    }

    #[test]
    fn test_comma_list_value() {
        let config = Config::default();
        assert_eq!(
            Rational::from_int(8),
            parse("5+3", &config).unwrap().value()
        );
        assert_eq!(
            Rational::zero(),
            parse("5, 3", &config).unwrap().value()
        );
    }
}
