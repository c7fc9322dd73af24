use clap::Parser;

use flowc::error::NiceError;
use flowc::tools::check::main_check;
use flowc::tools::gen_autocompletion::main_get_autocompletion;
use flowc::tools::runtime::main_runtime;
use flowc::tools::transpile::main_transpile;
use flowc::{Opt, Tool};

fn main() {
    let base_opt = Opt::parse();
    base_opt.logger.enable_log();

    let config = base_opt
        .load_config()
        .nice_expect("Cannot load the transpiler configuration");
    match base_opt.tool {
        Tool::Transpile(opt) => main_transpile(opt, config),
        Tool::Check(opt) => main_check(opt, config),
        Tool::Runtime => main_runtime(),
        Tool::GenAutocompletion(opt) => main_get_autocompletion(opt),
    }
    .nice_unwrap()
}
