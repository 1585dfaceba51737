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

use dice_engine::{parse, Config};
use rand::{distributions::Uniform, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn main() {
    pretty_env_logger::init();
    let mut expression: Option<String> = None;
    let mut show_prob = false;
    let mut config = Config {
        enable_dnd5e: true,
        enable_latex: false,
    };
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--prob" => show_prob = true,
            "--latex" => config.enable_latex = true,
            "--no-dnd5e" => config.enable_dnd5e = false,
            _ => expression = Some(arg),
        }
    }
    let expression = expression
        .expect("usage: roll-cmd [--prob] [--latex] [--no-dnd5e] <expression>");

    let tree = match parse(&expression, &config) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };
    log::debug!("parsed {} into {:?}", expression, tree);

    let mut master_rng = ChaCha20Rng::from_entropy();
    let mut seed: <Xoshiro256PlusPlus as SeedableRng>::Seed = Default::default();
    master_rng.fill(&mut seed);
    let mut rng = Xoshiro256PlusPlus::from_seed(seed);
    let mut roller = |sides: i64| rng.sample(Uniform::new_inclusive(1, sides));

    let rolled = tree.clone().roll(&mut roller, &config);
    println!("{}", rolled.render_toplevel(config.enable_latex));
    if show_prob {
        println!();
        println!("{}", tree.prob().render(config.enable_latex));
    }
}
