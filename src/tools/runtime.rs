use anyhow::Error;

use flowc_transpiler::RUNTIME_SUPPORT;

pub fn main_runtime() -> Result<(), Error> {
    print!("{}", RUNTIME_SUPPORT);
    Ok(())
}
