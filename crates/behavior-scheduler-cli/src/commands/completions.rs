use clap_complete::Shell;

use super::CmdResult;

pub fn run(shell: Shell, command: &mut clap::Command) -> CmdResult {
    let name = command.get_name().to_string();
    clap_complete::generate(shell, command, name, &mut std::io::stdout());
    Ok(())
}
