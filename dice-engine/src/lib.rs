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

//! Dice expression engine.
//!
//! Parses expressions such as `3d20k1+4` or
//! `1d20+4 to hit, 2d6+2 slashing damage`, simulates rolls against a
//! caller-supplied random source and renders a Markdown (or LaTeX) trace of
//! the result. Independently of any rolling, the exact probability
//! distribution of an expression can be computed as arbitrary-precision
//! rationals.
//!
//! ```
//! use dice_engine::{parse, Config};
//!
//! let config = Config { enable_dnd5e: true, enable_latex: false };
//! let tree = parse("3d6k2+1", &config).unwrap();
//! let average = tree.prob().expected_value();
//! let mut roller = |sides: i64| sides; // always rolls the maximum
//! let rolled = tree.clone().roll(&mut roller, &config);
//! assert_eq!("3d6k2+1 = **13**\n- *3d6k2 (~~6~~ 6 6) =* ***12***",
//!     rolled.render_toplevel(config.enable_latex));
//! # let _ = average;
//! ```

pub mod config;
pub mod distribution;
pub mod expr;
pub mod parser;
pub mod rational;
mod render;
pub mod solver;

pub use config::Config;
pub use distribution::Distribution;
pub use expr::{Node, NodeKind, ProdOp, RollResult, SumOp};
pub use parser::{parse, ParseError};
pub use rational::{Rational, Style};
