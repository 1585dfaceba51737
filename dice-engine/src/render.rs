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

//! Markdown/LaTeX rendering of rolled expression trees.

use std::fmt;

use crate::expr::{Node, NodeKind, ProdOp, RollComment, SumOp};
use crate::rational::{Rational, Style};

/// How the result part of a render call will be used by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResultRole {
    /// The result is discarded; the node should emit a detail line instead.
    None,
    /// The result ends up right of the top-level equals sign.
    Top,
    /// The result is embedded in a detail line.
    Detail,
}

impl fmt::Display for SumOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SumOp::Add => write!(f, "+"),
            SumOp::Sub => write!(f, "-"),
        }
    }
}

impl fmt::Display for ProdOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProdOp::Mul => write!(f, "×"),
            ProdOp::TruncDiv => write!(f, "/"),
            ProdOp::ExactDiv => write!(f, "÷"),
        }
    }
}

fn render_number(value: &Rational, rr: ResultRole, latex: bool) -> String {
    if rr == ResultRole::Top {
        value.render(Style::new(latex).bold())
    } else {
        value.render(Style::new(latex).bold().italic())
    }
}

impl Node {
    /// Assemble the full roll report: the expression, its value and one
    /// detail line per multi-dice term.
    pub fn render_toplevel(&self, latex: bool) -> String {
        let (expr, result, details) =
            self.render("- ", ResultRole::Top, true, latex);
        if result.is_empty() {
            format!("{}{}", expr, details)
        } else {
            format!("{} = {}{}", expr, result, details)
        }
    }

    /// Returns the comment to attach here and whether descendants may still
    /// render theirs.
    fn render_roll_comment(&self, rr: ResultRole, rcok: bool) -> (String, bool) {
        if rcok && rr != ResultRole::None {
            if let RollComment::Text(text) = &self.roll_comment {
                return (text.clone(), false);
            }
        }
        (String::new(), rcok)
    }

    /// Returns (expression, result, details). The expression is the
    /// unformatted left side of the equals sign; the result is the formatted
    /// right side, or empty if there should be no equals sign; the details
    /// are the subsequent indented lines, each starting with a newline.
    pub(crate) fn render(
        &self,
        ind: &str,
        rr: ResultRole,
        rcok: bool,
        latex: bool,
    ) -> (String, String, String) {
        match &self.kind {
            NodeKind::Natural(n) => (
                format!("{}", n),
                render_number(&self.value(), rr, latex),
                String::new(),
            ),
            NodeKind::Sum { ops } => {
                self.render_sum_prod(&op_strings(ops), ind, rr, rcok, latex)
            }
            NodeKind::Prod { ops } => {
                self.render_sum_prod(&op_strings(ops), ind, rr, rcok, latex)
            }
            NodeKind::Dice { count, rolls, .. } => {
                let needs_roll_str =
                    !(*count == 1 && rolls.len() == 1 && rolls[0].kept);
                let needs_detail = rr == ResultRole::None
                    || (rr != ResultRole::Detail && needs_roll_str);
                let roll_str = if needs_roll_str {
                    let dice: Vec<String> = rolls
                        .iter()
                        .map(|r| {
                            if r.kept {
                                r.value.to_string()
                            } else {
                                format!("~~{}~~", r.value)
                            }
                        })
                        .collect();
                    format!(" ({})", dice.join(" "))
                } else {
                    String::new()
                };
                let mut detail = String::new();
                if needs_detail {
                    detail = format!(
                        "\n{}*{}{} =* {}",
                        ind,
                        self.token,
                        roll_str,
                        self.value().render(Style::new(latex).italic().bold()),
                    );
                }
                let mut expr = self.token.clone();
                if needs_roll_str && !needs_detail {
                    expr.push_str(&roll_str);
                }
                let mut result = render_number(&self.value(), rr, latex);
                let (comment, _) =
                    self.render_roll_comment(ResultRole::Detail, rcok);
                if rr == ResultRole::None {
                    detail.push_str(&comment);
                } else {
                    result.push_str(&comment);
                }
                (expr, result, detail)
            }
            NodeKind::Group => {
                let (expr, result, details) =
                    self.children[0].render(ind, rr, rcok, latex);
                (format!("({})", expr), result, details)
            }
            NodeKind::Labeled { label } => {
                if label.is_empty() {
                    return self.children[0].render(ind, rr, rcok, latex);
                }
                let (comment, child_rcok) = self.render_roll_comment(rr, rcok);
                match rr {
                    ResultRole::Top => {
                        let (expr, result, details) =
                            self.children[0].render(ind, rr, child_rcok, latex);
                        (
                            expr,
                            format!("{} {}{}", result, label, comment),
                            details,
                        )
                    }
                    ResultRole::None => {
                        let inner_ind = format!("  {}", ind);
                        let (inline_expr, _, _) = self.children[0].render(
                            &inner_ind,
                            ResultRole::None,
                            false,
                            latex,
                        );
                        let (expr, result, details) = self.children[0].render(
                            &inner_ind,
                            ResultRole::Detail,
                            false,
                            latex,
                        );
                        let detail = format!(
                            "\n{}*{} =* {} *{}*{}{}",
                            ind, expr, result, label, comment, details
                        );
                        (inline_expr, result, detail)
                    }
                    ResultRole::Detail => {
                        let (expr, result, details) = self.children[0].render(
                            &format!("  {}", ind),
                            rr,
                            false,
                            latex,
                        );
                        (
                            expr,
                            format!("{} *{}*{}", result, label, comment),
                            details,
                        )
                    }
                }
            }
            NodeKind::CommaList => {
                let mut expr = String::new();
                let mut result = String::new();
                let mut details = String::new();
                for (i, child) in self.children.iter().enumerate() {
                    let (child_expr, child_result, child_details) =
                        child.render(ind, rr, rcok, latex);
                    if i > 0 {
                        expr.push_str(", ");
                        result.push_str(", ");
                    }
                    expr.push_str(&child_expr);
                    result.push_str(&child_result);
                    details.push_str(&child_details);
                }
                (expr, result, details)
            }
            NodeKind::Stats => {
                let intro = "up a new character! Adventure awaits. \
                    In the meanwhile, here are your ability scores:";
                let mut values: Vec<Rational> =
                    self.children.iter().map(|c| c.value()).collect();
                values.sort_by(|a, b| b.cmp(a));
                let scores: Vec<String> = values
                    .iter()
                    .map(|v| v.render(Style::new(latex).bold()))
                    .collect();
                let mut details = String::new();
                for child in &self.children {
                    details.push_str(
                        &child.render(ind, ResultRole::None, false, latex).2,
                    );
                }
                (
                    format!("{}\n{}", intro, scores.join(", ")),
                    String::new(),
                    details,
                )
            }
            NodeKind::DeathSave => {
                let value = self.value();
                let event = if value == Rational::one() {
                    "suffers **A CRITICAL FAIL!** :coffin:"
                } else if value <= Rational::from_int(9) {
                    "**FAILS** :skull:"
                } else if value <= Rational::from_int(19) {
                    "**SUCCEEDS** :thumbsup:"
                } else {
                    "**REGAINS 1 HP!** :star-struck:"
                };
                let details = self.children[0]
                    .render(ind, ResultRole::None, false, latex)
                    .2;
                (
                    format!("a death saving throw, and {}", event),
                    String::new(),
                    details,
                )
            }
        }
    }

    fn render_sum_prod(
        &self,
        ops: &[String],
        ind: &str,
        rr: ResultRole,
        rcok: bool,
        latex: bool,
    ) -> (String, String, String) {
        if self.children.len() == 1 {
            return self.children[0].render(ind, rr, rcok, latex);
        }
        let (comment, child_rcok) = self.render_roll_comment(rr, rcok);
        let mut result = render_number(&self.value(), rr, latex);
        result.push_str(&comment);
        let mut expr = String::new();
        let mut details = String::new();
        for (i, child) in self.children.iter().enumerate() {
            let (child_expr, _, child_details) =
                child.render(ind, ResultRole::None, child_rcok, latex);
            if i > 0 {
                expr.push_str(&ops[i - 1]);
            }
            expr.push_str(&child_expr);
            details.push_str(&child_details);
        }
        (expr, result, details)
    }
}

fn op_strings<T: fmt::Display + Copy>(ops: &[T]) -> Vec<String> {
    ops.iter().map(|op| op.to_string()).collect()
}
